use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{cpu::CpuRole, state::MachineState};

/// Memory-mapped latches and strobes with behaviour beyond plain storage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Register {
    /// Bit 5 enables NMI, bits 3-4 select the palette bank.
    NmiEnableAndPalette,
    /// Bit 0 enables NMI.
    InterruptEnable,
    /// Vertical scroll latch. On some boards the same write also pulses the
    /// sprite cpu's interrupt line.
    ScrollY {
        #[serde(default)]
        strobe_sprite: bool,
    },
    VideoInterrupt,
    SpriteInterrupt,
    /// Stores the command byte and interrupts the sound cpu.
    SoundCommand,
    /// Readable latch; writes store without interrupting anyone.
    SoundLatch,
    SoundLatchClear,
    SoundEnable,
    FlipX,
    FlipY,
    InputPort(u8),
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Register {
    /// The cpu a write to this register interrupts, if any.
    pub fn signals(&self) -> Option<CpuRole> {
        match self {
            Register::VideoInterrupt => Some(CpuRole::Video),
            Register::SpriteInterrupt => Some(CpuRole::Sprite),
            Register::ScrollY {
                strobe_sprite: true,
            } => Some(CpuRole::Sprite),
            Register::SoundCommand => Some(CpuRole::Sound),
            _ => None,
        }
    }

    /// Returns the value seen by a read, or `None` for write-only registers.
    pub fn read(&self, state: &MachineState) -> Option<u8> {
        match self {
            Register::SoundLatch => Some(state.sound_latch),
            Register::InputPort(port) => state.input_ports.get(*port as usize).copied(),
            _ => None,
        }
    }

    /// Applies a write and returns the cpu to interrupt, if any.
    pub fn write(&self, value: u8, state: &mut MachineState) -> Option<CpuRole> {
        match self {
            Register::NmiEnableAndPalette => {
                state.nmi_enable = value & 0x20 != 0;
                let bank = (value >> 3) & 0x03;
                if bank != state.palette_bank {
                    trace!("[REG] palette bank {} -> {}", state.palette_bank, bank);
                    state.palette_bank = bank;
                    state.tiles.invalidate_all();
                }
            }
            Register::InterruptEnable => state.nmi_enable = value & 0x01 != 0,
            Register::ScrollY { .. } => state.scroll_y = value,
            Register::VideoInterrupt | Register::SpriteInterrupt => {}
            Register::SoundCommand | Register::SoundLatch => state.sound_latch = value,
            Register::SoundLatchClear => state.sound_latch = 0,
            Register::SoundEnable => state.sound_enable = value & 0x01 != 0,
            Register::FlipX => state.flip_x = value & 0x01 != 0,
            Register::FlipY => state.flip_y = value & 0x01 != 0,
            Register::InputPort(port) => {
                trace!("[REG] Ignored write to input port {} = {:02X}", port, value);
            }
        }

        self.signals()
    }
}
