// +-----------+---------+------+-------------------------------------------+
// | Driver    | Cpus    | Fps  | Notes                                     |
// +-----------+---------+------+-------------------------------------------+
// | kingofb   | 4 x Z80 | 60   | main/video/sprite/sound, 100 slices       |
// | ringking  | 4 x Z80 | 60   | kingofb engine, different map             |
// | thepit    | 2 x Z80 | 60   | main/sound, mirrored tile RAM             |
// +-----------+---------+------+-------------------------------------------+
pub mod kingofb;
pub mod thepit;

use crate::config::MachineConfig;

pub use kingofb::{kingofb, ringking};
pub use thepit::thepit;

/// Looks a board up by its short name.
pub fn by_name(name: &str) -> Option<MachineConfig> {
    match name {
        "kingofb" => Some(kingofb()),
        "ringking" => Some(ringking()),
        "thepit" => Some(thepit()),
        _ => None,
    }
}

pub const NAMES: [&str; 3] = ["kingofb", "ringking", "thepit"];
