//! Window node
//!
//! One entry of the screen's window arena. Links to the parent, children and
//! siblings are stored as ids; `first_child` is the top of the stacking
//! order and `last_child` the bottom.

use std::rc::Rc;

use area_region::{Rect, Region};

use crate::dix::flags::EventMask;
use crate::dix::optional::OptionalAttrs;
use crate::dix::stacking::OppositeMemo;
use crate::shared::{
    BackingStore, ClientId, Geometry, Gravity, MapState, Visibility, WindowClass, WindowId,
};

/// Server-side pixmap reference held by backgrounds and borders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    pub id: u32,
    pub depth: u8,
}

/// Cursor shared between windows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub id: u32,
}

/// Window background
#[derive(Debug, Clone)]
pub enum Background {
    None,
    ParentRelative,
    Pixel(u32),
    Pixmap(Rc<Pixmap>),
}

/// Window border
#[derive(Debug, Clone)]
pub enum Border {
    Pixel(u32),
    Pixmap(Rc<Pixmap>),
}

/// Pending-transition marker
///
/// Set on a window before an unmap, restack, move or resize starts and
/// consumed by the clip engine: it remembers where the window was and
/// collects the area that became exposed.
#[derive(Debug, Clone, Default)]
pub struct ValidateMark {
    /// Absolute inside corner before the change
    pub old_corner: (i32, i32),
    /// Size changed, so old contents can't be reused
    pub resized: bool,
    /// Border area that was visible before a border-only change
    pub border_visible: Option<Region>,
    /// Newly exposed window area
    pub exposed: Region,
    /// Newly exposed border area
    pub border_exposed: Region,
}

/// A window in the tree
#[derive(Debug, Clone)]
pub struct Window {
    pub id: WindowId,
    /// Client that created the window
    pub owner: ClientId,

    pub parent: Option<WindowId>,
    pub first_child: Option<WindowId>,
    pub last_child: Option<WindowId>,
    pub prev_sib: Option<WindowId>,
    pub next_sib: Option<WindowId>,

    /// Inside corner relative to the parent's inside corner
    pub origin: (i32, i32),
    /// Absolute inside geometry
    pub drawable: Geometry,
    pub depth: u8,
    pub class: WindowClass,
    pub border_width: u32,

    pub bit_gravity: Gravity,
    pub win_gravity: Gravity,
    pub backing_store: BackingStore,
    pub background: Background,
    pub border: Border,

    pub mapped: bool,
    pub realized: bool,
    pub viewable: bool,
    pub override_redirect: bool,
    pub save_under: bool,
    /// Contents are redirected off-screen; clips ignore ancestors
    pub redirect_draw: bool,
    pub visibility: Visibility,

    /// Selection of the owning client
    pub event_mask: EventMask,
    /// Events that can reach this window, including propagation from below
    pub deliverable_events: EventMask,

    /// Inside area clipped by ancestors and shapes
    pub win_size: Region,
    /// Area including the border, clipped by ancestors and shapes
    pub border_size: Region,
    /// Visible inside area
    pub clip_list: Region,
    /// Visible area including the border
    pub border_clip: Region,

    pub optional: Option<Box<OptionalAttrs>>,
    pub(crate) mark: Option<ValidateMark>,
    /// Arrangement left by the last Opposite restack of this window
    pub(crate) opposite: Option<OppositeMemo>,
}

impl Window {
    /// A window with protocol default attributes, not yet linked anywhere.
    pub fn new(id: WindowId, owner: ClientId, class: WindowClass, depth: u8) -> Self {
        Self {
            id,
            owner,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sib: None,
            next_sib: None,
            origin: (0, 0),
            drawable: Geometry::default(),
            depth,
            class,
            border_width: 0,
            bit_gravity: Gravity::Forget,
            win_gravity: Gravity::NorthWest,
            backing_store: BackingStore::NotUseful,
            background: Background::None,
            border: Border::Pixel(0),
            mapped: false,
            realized: false,
            viewable: false,
            override_redirect: false,
            save_under: false,
            redirect_draw: false,
            visibility: Visibility::NotViewable,
            event_mask: EventMask::empty(),
            deliverable_events: EventMask::empty(),
            win_size: Region::new(),
            border_size: Region::new(),
            clip_list: Region::new(),
            border_clip: Region::new(),
            optional: None,
            mark: None,
            opposite: None,
        }
    }

    pub fn has_border(&self) -> bool {
        self.border_width > 0
    }

    /// Outer box including the border, in absolute coordinates.
    pub fn extents(&self) -> Rect {
        self.outer_box(self.drawable.x, self.drawable.y, self.drawable.width, self.drawable.height)
    }

    /// Outer box of the window if its inside corner were at `x`, `y`.
    pub fn outer_box(&self, x: i32, y: i32, width: u32, height: u32) -> Rect {
        Rect::from_xywh(x, y, width, height).expand(self.border_width as i32)
    }

    /// Outer corner relative to the parent, as reported to clients.
    pub fn position(&self) -> (i32, i32) {
        let bw = self.border_width as i32;
        (self.origin.0 - bw, self.origin.1 - bw)
    }

    pub fn map_state(&self) -> MapState {
        if !self.mapped {
            MapState::Unmapped
        } else if self.realized {
            MapState::Viewable
        } else {
            MapState::Unviewable
        }
    }

    pub fn other_event_masks(&self) -> EventMask {
        self.optional
            .as_ref()
            .map(|opt| opt.other_event_masks)
            .unwrap_or_default()
    }

    pub fn dont_propagate_mask(&self) -> EventMask {
        self.optional
            .as_ref()
            .map(|opt| opt.dont_propagate_mask)
            .unwrap_or_default()
    }

    pub fn bounding_shape(&self) -> Option<&Region> {
        self.optional.as_ref()?.bounding_shape.as_deref()
    }

    pub fn clip_shape(&self) -> Option<&Region> {
        self.optional.as_ref()?.clip_shape.as_deref()
    }

    pub fn input_shape(&self) -> Option<&Region> {
        self.optional.as_ref()?.input_shape.as_deref()
    }

    pub fn is_shaped(&self) -> bool {
        self.bounding_shape().is_some()
    }

    /// Outer box cut to the bounding shape, without clipping to the parent.
    pub fn bounding_region(&self) -> Region {
        let outer = Region::from_rect(self.extents());
        match self.bounding_shape() {
            Some(shape) => outer.intersect(&shape.translated(self.drawable.x, self.drawable.y)),
            None => outer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_extents() {
        let mut win = Window::new(0x200001, 1, WindowClass::InputOutput, 24);
        win.border_width = 2;
        win.origin = (12, 12);
        win.drawable = Geometry::new(12, 12, 100, 50);

        assert_eq!(win.map_state(), MapState::Unmapped);
        assert_eq!(win.visibility, Visibility::NotViewable);
        assert_eq!(win.win_gravity, Gravity::NorthWest);
        assert_eq!(win.extents(), Rect::new(10, 10, 114, 64));
        assert_eq!(win.position(), (10, 10));
        assert!(!win.is_shaped());
    }
}
