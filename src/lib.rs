pub mod bus;
pub mod clock;
pub mod config;
pub mod cpu;
pub mod drivers;
pub mod error;
pub mod io;
pub mod machine;
pub mod range;
pub mod registers;
pub mod state;
pub mod store;
pub mod utils;
pub mod video;

pub use clock::Rate;
pub use config::{CpuConfig, MachineConfig, RangeConfig, TargetConfig};
pub use cpu::{CpuCore, CpuIo, CpuRole, InterruptGate, InterruptKind};
pub use error::ConfigError;
pub use io::Peripheral;
pub use machine::{FrameOutcome, Machine, MachineBuilder, MachineStatus, StopHandle};
pub use range::{RangeKind, TableKind, OPEN_BUS};
pub use registers::Register;
pub use state::MachineState;
pub use utils::{hexdump, init_tracing};
pub use video::{FrameView, VideoRefresh};
