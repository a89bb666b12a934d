// +----------------------------------------------------------------------+
// | Address decoding                                                     |
// +----------------------------------------------------------------------+
// | Each cpu owns four ordered tables: memory read, memory write, port   |
// | read and port write. A lookup walks the table front to back and the  |
// | first range containing the address wins, so declaration order is     |
// | the board's decode priority. Overlaps are legal and shadowed ranges  |
// | keep their slot.                                                     |
// +----------------------------------------------------------------------+
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{cpu::CpuRole, io::DeviceHandle, registers::Register, store::StoreHandle};

/// Value seen on a floating data bus.
pub const OPEN_BUS: u8 = 0xFF;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressSpace {
    Memory,
    Io,
}

impl AddressSpace {
    pub fn max_address(self) -> u16 {
        match self {
            AddressSpace::Memory => 0xFFFF,
            AddressSpace::Io => 0x00FF,
        }
    }

    pub fn width(self) -> u8 {
        match self {
            AddressSpace::Memory => 16,
            AddressSpace::Io => 8,
        }
    }
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressSpace::Memory => write!(f, "memory"),
            AddressSpace::Io => write!(f, "io"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Read,
    Write,
    PortRead,
    PortWrite,
}

impl TableKind {
    pub const ALL: [TableKind; 4] = [
        TableKind::Read,
        TableKind::Write,
        TableKind::PortRead,
        TableKind::PortWrite,
    ];

    pub fn space(self) -> AddressSpace {
        match self {
            TableKind::Read | TableKind::Write => AddressSpace::Memory,
            TableKind::PortRead | TableKind::PortWrite => AddressSpace::Io,
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Read => write!(f, "read"),
            TableKind::Write => write!(f, "write"),
            TableKind::PortRead => write!(f, "port read"),
            TableKind::PortWrite => write!(f, "port write"),
        }
    }
}

/// Where a range lives: which cpu, which of its tables, which addresses.
/// Used in diagnostics and in the shared window report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRef {
    pub cpu: CpuRole,
    pub table: TableKind,
    pub low: u16,
    pub high: u16,
}

impl fmt::Display for WindowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cpu {} table 0x{:04X}-0x{:04X}",
            self.cpu, self.table, self.low, self.high
        )
    }
}

/// Classification of a range, independent of what it points at.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RangeKind {
    RawStorage,
    ReadOnlyConstant,
    Handler,
    Unmapped,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Target {
    /// Read/write storage. `tiles` marks written offsets dirty in the tile cache.
    Ram {
        store: StoreHandle,
        base: u16,
        tiles: bool,
    },
    Rom {
        store: StoreHandle,
        base: u16,
    },
    Register(Register),
    Device(DeviceHandle),
    Unmapped,
}

impl Target {
    pub fn kind(&self) -> RangeKind {
        match self {
            Target::Ram { .. } => RangeKind::RawStorage,
            Target::Rom { .. } => RangeKind::ReadOnlyConstant,
            Target::Register(_) | Target::Device(_) => RangeKind::Handler,
            Target::Unmapped => RangeKind::Unmapped,
        }
    }

    fn base(&self) -> u16 {
        match self {
            Target::Ram { base, .. } | Target::Rom { base, .. } => *base,
            _ => 0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AddressRange {
    pub low: u16,
    pub high: u16,
    pub target: Target,
}

impl AddressRange {
    pub fn new(low: u16, high: u16, target: Target) -> Self {
        Self { low, high, target }
    }

    pub fn contains(&self, address: u16) -> bool {
        self.low <= address && address <= self.high
    }

    pub fn len(&self) -> usize {
        (self.high as usize).saturating_sub(self.low as usize) + 1
    }
}

/// Outcome of a lookup. `index` is the position of the matching range, or
/// `None` when nothing in the table covers the address.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub target: Target,
    pub offset: usize,
    pub index: Option<usize>,
}

impl Resolved {
    pub const UNMAPPED: Resolved = Resolved {
        target: Target::Unmapped,
        offset: 0,
        index: None,
    };

    pub fn kind(&self) -> RangeKind {
        self.target.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRangeTable {
    space: AddressSpace,
    ranges: Vec<AddressRange>,
}

impl AddressRangeTable {
    pub fn new(space: AddressSpace) -> Self {
        Self {
            space,
            ranges: Vec::new(),
        }
    }

    pub fn space(&self) -> AddressSpace {
        self.space
    }

    /// Appends a range at the lowest decode priority.
    pub fn push(&mut self, range: AddressRange) {
        self.ranges.push(range);
    }

    pub fn ranges(&self) -> &[AddressRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn resolve(&self, address: u16) -> Resolved {
        let address = address & self.space.max_address();
        for (index, range) in self.ranges.iter().enumerate() {
            if range.contains(address) {
                return Resolved {
                    target: range.target,
                    offset: range.target.base() as usize + (address - range.low) as usize,
                    index: Some(index),
                };
            }
        }

        Resolved::UNMAPPED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ram(store: usize, base: u16) -> Target {
        Target::Ram {
            store: StoreHandle::new(store),
            base,
            tiles: false,
        }
    }

    #[test]
    fn test_first_match_wins() {
        let mut table = AddressRangeTable::new(AddressSpace::Memory);
        table.push(AddressRange::new(0x8000, 0x87FF, ram(0, 0)));
        table.push(AddressRange::new(0x8400, 0x8FFF, ram(1, 0)));

        for address in 0x8400..=0x87FF {
            let resolved = table.resolve(address);
            assert_eq!(resolved.target, ram(0, 0));
            assert_eq!(resolved.index, Some(0));
            assert_eq!(resolved.offset, (address - 0x8000) as usize);
        }

        let resolved = table.resolve(0x8800);
        assert_eq!(resolved.target, ram(1, 0));
        assert_eq!(resolved.offset, 0x400);
    }

    #[test]
    fn test_unmapped_address() {
        let mut table = AddressRangeTable::new(AddressSpace::Memory);
        table.push(AddressRange::new(0x0000, 0x3FFF, ram(0, 0)));

        assert_eq!(table.resolve(0x4000), Resolved::UNMAPPED);
        assert_eq!(table.resolve(0xFFFF).kind(), RangeKind::Unmapped);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let mut table = AddressRangeTable::new(AddressSpace::Memory);
        table.push(AddressRange::new(0xC000, 0xC3FF, ram(0, 0)));
        table.push(AddressRange::new(0xF800, 0xF800, Target::Register(Register::VideoInterrupt)));

        for address in [0x0000, 0xC000, 0xC123, 0xF800, 0xF801] {
            assert_eq!(table.resolve(address), table.resolve(address));
        }
    }

    #[test]
    fn test_mirror_and_base_offsets() {
        let mut table = AddressRangeTable::new(AddressSpace::Memory);
        table.push(AddressRange::new(0x8800, 0x8BFF, ram(2, 0)));
        table.push(AddressRange::new(0x8C00, 0x8FFF, ram(2, 0)));
        table.push(AddressRange::new(0x9840, 0x985F, ram(3, 0x40)));

        assert_eq!(table.resolve(0x8810).offset, table.resolve(0x8C10).offset);
        assert_eq!(table.resolve(0x9841).offset, 0x41);
    }

    #[test]
    fn test_io_space_decodes_low_byte() {
        let mut table = AddressRangeTable::new(AddressSpace::Io);
        table.push(AddressRange::new(0x08, 0x08, Target::Register(Register::SoundLatch)));

        assert_eq!(table.resolve(0x1208).index, Some(0));
        assert_eq!(table.resolve(0x0009), Resolved::UNMAPPED);
    }
}
