use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    clock::Rate,
    range::{AddressRangeTable, AddressSpace, TableKind},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuRole {
    Main,
    Video,
    Sprite,
    Sound,
}

impl CpuRole {
    pub const ALL: [CpuRole; 4] = [CpuRole::Main, CpuRole::Video, CpuRole::Sprite, CpuRole::Sound];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CpuRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuRole::Main => write!(f, "main"),
            CpuRole::Video => write!(f, "video"),
            CpuRole::Sprite => write!(f, "sprite"),
            CpuRole::Sound => write!(f, "sound"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptKind {
    Nmi,
    /// Maskable interrupt with the vector placed on the data bus.
    Irq(u8),
}

/// Which interrupts depend on the board's NMI enable latch. A blocked
/// request is dropped, not held.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptGate {
    #[default]
    Open,
    Periodic,
    All,
}

impl InterruptGate {
    pub fn admits_periodic(self, nmi_enable: bool) -> bool {
        self == InterruptGate::Open || nmi_enable
    }

    pub fn admits_strobe(self, nmi_enable: bool) -> bool {
        self != InterruptGate::All || nmi_enable
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicInterrupt {
    pub kind: InterruptKind,
    pub rate: Rate,
}

/// Bus interface a cpu core uses for every access its program performs.
pub trait CpuIo {
    fn read_byte(&mut self, address: u16) -> u8;
    fn write_byte(&mut self, address: u16, value: u8);
    fn port_in(&mut self, port: u16) -> u8;
    fn port_out(&mut self, port: u16, value: u8);

    fn read_word(&mut self, address: u16) -> u16 {
        let low_byte = self.read_byte(address) as u16;
        let high_byte = self.read_byte(address.wrapping_add(1)) as u16;
        (high_byte << 8) | low_byte
    }

    fn write_word(&mut self, address: u16, value: u16) {
        self.write_byte(address, (value & 0x00FF) as u8);
        self.write_byte(address.wrapping_add(1), (value >> 8) as u8);
    }
}

/// Instruction-level cpu emulation, supplied by the host.
pub trait CpuCore {
    /// Power-on reset.
    fn reset(&mut self);

    /// Runs for at least `cycles` cycles and returns how many were used.
    fn execute_cycles(&mut self, io: &mut dyn CpuIo, cycles: u32) -> u32;

    fn deliver_interrupt(&mut self, io: &mut dyn CpuIo, kind: InterruptKind);

    fn pc(&self) -> u16;
}

#[derive(Debug, Clone)]
pub struct AddressMap {
    pub read: AddressRangeTable,
    pub write: AddressRangeTable,
    pub port_read: AddressRangeTable,
    pub port_write: AddressRangeTable,
}

impl Default for AddressMap {
    fn default() -> Self {
        Self {
            read: AddressRangeTable::new(AddressSpace::Memory),
            write: AddressRangeTable::new(AddressSpace::Memory),
            port_read: AddressRangeTable::new(AddressSpace::Io),
            port_write: AddressRangeTable::new(AddressSpace::Io),
        }
    }
}

impl AddressMap {
    pub fn table(&self, kind: TableKind) -> &AddressRangeTable {
        match kind {
            TableKind::Read => &self.read,
            TableKind::Write => &self.write,
            TableKind::PortRead => &self.port_read,
            TableKind::PortWrite => &self.port_write,
        }
    }

    pub fn table_mut(&mut self, kind: TableKind) -> &mut AddressRangeTable {
        match kind {
            TableKind::Read => &mut self.read,
            TableKind::Write => &mut self.write,
            TableKind::PortRead => &mut self.port_read,
            TableKind::PortWrite => &mut self.port_write,
        }
    }
}

/// Per-cpu scheduling and decoding state. The registers live in the core.
#[derive(Debug, Clone)]
pub struct CpuContext {
    pub role: CpuRole,
    pub clock_hz: u32,
    pub map: AddressMap,
    pub strobe: InterruptKind,
    pub gate: InterruptGate,
    pub periodic: Vec<PeriodicInterrupt>,

    pub(crate) pending: bool,
    /// Cycles the core overran its last slice by
    pub(crate) debt: u32,
    pub(crate) cycles: u64,
}

impl CpuContext {
    pub fn new(role: CpuRole, clock_hz: u32) -> Self {
        Self {
            role,
            clock_hz,
            map: AddressMap::default(),
            strobe: InterruptKind::Irq(0xFF),
            gate: InterruptGate::Open,
            periodic: Vec::new(),
            pending: false,
            debt: 0,
            cycles: 0,
        }
    }

    pub fn interrupt_pending(&self) -> bool {
        self.pending
    }

    pub fn raise(&mut self) {
        self.pending = true;
    }

    pub fn total_cycles(&self) -> u64 {
        self.cycles
    }

    /// Cycles to run this slice given the slice's share, paying off debt first.
    pub(crate) fn budget(&mut self, share: u32) -> u32 {
        if self.debt >= share {
            self.debt -= share;
            0
        } else {
            let budget = share - self.debt;
            self.debt = 0;
            budget
        }
    }

    pub(crate) fn account(&mut self, budget: u32, used: u32) {
        self.cycles += used as u64;
        self.debt += used.saturating_sub(budget);
    }
}

/// Cpu index by role.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RoleMap([Option<usize>; 4]);

impl RoleMap {
    pub fn insert(&mut self, role: CpuRole, index: usize) -> Option<usize> {
        self.0[role.index()].replace(index)
    }

    pub fn get(&self, role: CpuRole) -> Option<usize> {
        self.0[role.index()]
    }

    pub fn contains(&self, role: CpuRole) -> bool {
        self.get(role).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gates() {
        assert!(InterruptGate::Open.admits_periodic(false));
        assert!(InterruptGate::Open.admits_strobe(false));

        assert!(!InterruptGate::Periodic.admits_periodic(false));
        assert!(InterruptGate::Periodic.admits_strobe(false));
        assert!(InterruptGate::Periodic.admits_periodic(true));

        assert!(!InterruptGate::All.admits_periodic(false));
        assert!(!InterruptGate::All.admits_strobe(false));
        assert!(InterruptGate::All.admits_strobe(true));
    }

    #[test]
    fn test_budget_carries_overshoot() {
        let mut ctx = CpuContext::new(CpuRole::Main, 4_000_000);

        let budget = ctx.budget(666);
        assert_eq!(budget, 666);
        ctx.account(budget, 670);

        assert_eq!(ctx.budget(667), 663);
        ctx.account(663, 663);
        assert_eq!(ctx.total_cycles(), 1333);

        ctx.account(0, 1000);
        assert_eq!(ctx.budget(667), 0);
        assert_eq!(ctx.budget(667), 334);
    }
}
