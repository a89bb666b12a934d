use crate::{
    state::MachineState,
    store::{SharedWindowRegistry, StoreBank},
};

/// Screen refresh, supplied by the host. Called once per frame after every
/// cpu slice of that frame has run.
pub trait VideoRefresh {
    fn refresh(&mut self, frame: &FrameView<'_>);
}

/// Read-only snapshot handed to [`VideoRefresh::refresh`].
pub struct FrameView<'a> {
    pub frame: u64,
    pub total_colors: u16,
    pub full_redraw: bool,
    pub state: &'a MachineState,
    stores: &'a StoreBank,
    registry: &'a SharedWindowRegistry,
}

impl<'a> FrameView<'a> {
    pub(crate) fn new(
        frame: u64,
        total_colors: u16,
        state: &'a MachineState,
        stores: &'a StoreBank,
        registry: &'a SharedWindowRegistry,
    ) -> Self {
        Self {
            frame,
            total_colors,
            full_redraw: state.tiles.full_redraw(),
            state,
            stores,
            registry,
        }
    }

    /// Contents of the named store, e.g. `"videoram"` or `"spriteram"`.
    pub fn store(&self, id: &str) -> Option<&'a [u8]> {
        let handle = self.registry.handle(id)?;
        self.stores.get(handle).map(|s| s.as_slice())
    }

    pub fn tile_dirty(&self, offset: usize) -> bool {
        self.full_redraw || self.state.tiles.is_dirty(offset)
    }
}
