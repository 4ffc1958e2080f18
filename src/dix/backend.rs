//! Device backend interface
//!
//! The window core keeps the geometry and clip bookkeeping; anything that
//! touches pixels or hardware goes through this trait. Every hook has a
//! default so a backend only implements what it cares about.

use area_region::Region;

use crate::dix::window::Window;
use crate::shared::WindowId;

/// Why a tree is being revalidated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidateKind {
    Map,
    Unmap,
    Move,
    Stack,
    Other,
}

/// Per-screen device hooks
pub trait Backend {
    /// Allocate device state for a new window. Returning false aborts the
    /// create with an allocation failure.
    fn create_window(&mut self, _win: &Window) -> bool {
        true
    }

    fn destroy_window(&mut self, _win: &Window) {}

    /// The window's absolute position changed.
    fn position_window(&mut self, _win: &Window) {}

    /// The window is becoming realized. Returning false fails the map with
    /// an allocation failure and unrealizes the subtree again.
    fn realize_window(&mut self, _win: &Window) -> bool {
        true
    }

    fn unrealize_window(&mut self, _win: &Window) {}

    /// The window moved in its sibling list; `old_next` was below it before.
    fn restack_window(&mut self, _win: &Window, _old_next: Option<WindowId>) {}

    /// The window's clip list was recomputed and moved by `dx`, `dy`.
    fn clip_notify(&mut self, _win: &Window, _dx: i32, _dy: i32) {}

    /// Copy the contents of `old_region` to the window's new position.
    fn copy_window(&mut self, _win: &Window, _dx: i32, _dy: i32, _old_region: &Region) {}

    /// Paint the background of newly exposed window area.
    fn window_exposures(&mut self, _win: &Window, _exposed: &Region) {}

    /// Paint newly exposed border area.
    fn paint_border(&mut self, _win: &Window, _exposed: &Region) {}

    /// A realized window was unmapped, other than by its parent's resize.
    /// Input layers drop focus, grabs and pointer state that referenced it.
    fn window_gone(&mut self, _win: &Window) {}

    /// Called once a revalidation pass and its exposures are complete.
    fn post_validate_tree(&mut self, _parent: Option<WindowId>, _child: Option<WindowId>, _kind: ValidateKind) {}

    /// Hardware screen blanking. Returning false falls back to a saver window.
    fn save_screen(&mut self, _on: bool) -> bool {
        false
    }
}

/// Backend that accepts everything and draws nothing
#[derive(Debug, Default)]
pub struct NullBackend;

impl Backend for NullBackend {}
