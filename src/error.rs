use thiserror::Error;

use crate::{cpu::CpuRole, range::WindowRef};

/// Static configuration mistakes. These are reported while building a
/// machine and never once it is running.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{window}: low address is above high address")]
    InvertedRange { window: WindowRef },

    #[error("{window}: range exceeds the {width}-bit address space")]
    OutsideAddressSpace { window: WindowRef, width: u8 },

    #[error(
        "store `{store}` is {size:#06X} bytes as declared by {first}, \
         but {second} needs {needed:#06X} bytes of it"
    )]
    SharedStoreConflict {
        store: String,
        size: usize,
        needed: usize,
        first: WindowRef,
        second: WindowRef,
    },

    #[error("store `{store}` is declared as ROM and as RAM, by {first} and by {second}")]
    StoreKindConflict {
        store: String,
        first: WindowRef,
        second: WindowRef,
    },

    #[error("cpu `{0}` is declared more than once")]
    DuplicateCpu(CpuRole),

    #[error("{window}: register {register} signals the {role} cpu, which this machine lacks")]
    MissingSignalTarget {
        window: WindowRef,
        register: String,
        role: CpuRole,
    },

    #[error("no core attached for cpu `{0}`")]
    MissingCore(CpuRole),

    #[error("a core was attached for cpu `{0}`, which this machine lacks")]
    UnknownCpu(CpuRole),

    #[error("device `{0}` is not referenced by any port or memory table")]
    UnknownDevice(String),

    #[error("store `{0}` is not declared by any table")]
    UnknownStore(String),

    #[error("machine `{machine}` needs non-zero frames per second and slices per frame")]
    InvalidTiming { machine: String },

    #[error("malformed machine configuration: {0}")]
    Json(#[from] serde_json::Error),
}
