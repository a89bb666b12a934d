use serde::{Deserialize, Serialize};

pub const INPUT_PORTS: usize = 8;

/// Board latches shared by every cpu of one machine. Only register writes
/// mutate it; the scheduler and the video collaborator read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    pub nmi_enable: bool,
    pub palette_bank: u8,
    pub scroll_y: u8,
    pub sound_latch: u8,
    pub sound_enable: bool,
    pub flip_x: bool,
    pub flip_y: bool,
    /// Host-driven input latches (DIP switches, controls). Active low.
    pub input_ports: [u8; INPUT_PORTS],
    pub tiles: TileCache,
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MachineState {
    pub fn new(tile_count: usize) -> Self {
        Self {
            nmi_enable: false,
            palette_bank: 0,
            scroll_y: 0,
            sound_latch: 0,
            sound_enable: false,
            flip_x: false,
            flip_y: false,
            input_ports: [0xFF; INPUT_PORTS],
            tiles: TileCache::new(tile_count),
        }
    }
}

/// Which background tiles need redrawing. Writes through tile-tracked RAM
/// mark one tile, a palette bank change marks all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCache {
    dirty: Vec<bool>,
    full_redraw: bool,
    invalidations: u64,
}

impl TileCache {
    pub fn new(len: usize) -> Self {
        Self {
            dirty: vec![true; len],
            full_redraw: true,
            invalidations: 0,
        }
    }

    pub fn mark(&mut self, offset: usize) {
        if let Some(tile) = self.dirty.get_mut(offset) {
            *tile = true;
        }
    }

    pub fn invalidate_all(&mut self) {
        self.dirty.fill(true);
        self.full_redraw = true;
        self.invalidations += 1;
    }

    pub fn is_dirty(&self, offset: usize) -> bool {
        self.dirty.get(offset).copied().unwrap_or(false)
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.iter().filter(|d| **d).count()
    }

    pub fn full_redraw(&self) -> bool {
        self.full_redraw
    }

    /// Number of full invalidations since power-on.
    pub fn invalidations(&self) -> u64 {
        self.invalidations
    }

    pub fn len(&self) -> usize {
        self.dirty.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }

    pub(crate) fn clean(&mut self) {
        self.dirty.fill(false);
        self.full_redraw = false;
    }
}
