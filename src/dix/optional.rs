//! Optional attribute store
//!
//! Attributes most windows inherit unchanged from their parent live in a
//! separately allocated record. A window gets its own record only once one
//! of these fields diverges, and loses it again when nothing diverges.

use std::rc::Rc;

use area_region::Region;
use tracing::trace;

use crate::dix::flags::EventMask;
use crate::dix::window::Cursor;
use crate::dix::Screen;
use crate::error::{Result, WindowError};
use crate::shared::{Atom, ClientId, ColormapId, VisualId, WindowId};

/// Selection held by a client other than the window's owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherClient {
    pub client: ClientId,
    pub mask: EventMask,
}

/// Passive button or key grab registered on a window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassiveGrab {
    pub client: ClientId,
    pub device: u32,
    pub modifiers: u16,
    /// Button or keycode, 0 for any
    pub detail: u32,
    pub event_mask: EventMask,
}

/// Window property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: Atom,
    pub type_: Atom,
    pub format: u8,
    pub data: Vec<u8>,
}

/// Per-device cursor override
#[derive(Debug, Clone)]
pub struct DeviceCursor {
    pub device: u32,
    pub cursor: Option<Rc<Cursor>>,
}

#[derive(Debug, Clone)]
pub struct OptionalAttrs {
    pub visual: VisualId,
    pub colormap: ColormapId,
    pub cursor: Option<Rc<Cursor>>,
    pub dont_propagate_mask: EventMask,
    /// Union of `other_clients` masks
    pub other_event_masks: EventMask,
    pub other_clients: Vec<OtherClient>,
    pub passive_grabs: Vec<PassiveGrab>,
    pub user_props: Vec<Property>,
    pub backing_bit_planes: u32,
    pub backing_pixel: u32,
    pub bounding_shape: Option<Rc<Region>>,
    pub clip_shape: Option<Rc<Region>>,
    pub input_shape: Option<Rc<Region>>,
    pub device_cursors: Vec<DeviceCursor>,
}

impl OptionalAttrs {
    /// Record inheriting `visual`, `colormap` and `cursor`, with every other
    /// field at its default.
    pub fn inheriting(visual: VisualId, colormap: ColormapId, cursor: Option<Rc<Cursor>>) -> Self {
        Self {
            visual,
            colormap,
            cursor,
            dont_propagate_mask: EventMask::empty(),
            other_event_masks: EventMask::empty(),
            other_clients: Vec::new(),
            passive_grabs: Vec::new(),
            user_props: Vec::new(),
            backing_bit_planes: !0,
            backing_pixel: 0,
            bounding_shape: None,
            clip_shape: None,
            input_shape: None,
            device_cursors: Vec::new(),
        }
    }

    /// Anything the window owns outright, independent of inheritance.
    fn owns_content(&self) -> bool {
        !self.dont_propagate_mask.is_empty()
            || !self.other_event_masks.is_empty()
            || !self.other_clients.is_empty()
            || !self.passive_grabs.is_empty()
            || !self.user_props.is_empty()
            || self.backing_bit_planes != !0
            || self.backing_pixel != 0
            || self.bounding_shape.is_some()
            || self.clip_shape.is_some()
            || self.input_shape.is_some()
            || !self.device_cursors.is_empty()
    }

    pub(crate) fn recompute_other_masks(&mut self) {
        self.other_event_masks = self
            .other_clients
            .iter()
            .fold(EventMask::empty(), |acc, oc| acc | oc.mask);
    }
}

impl Screen {
    /// Nearest window at or above `id` that has its own record.
    pub(crate) fn find_window_with_optional(&self, id: WindowId) -> Option<WindowId> {
        let mut cur = Some(id);
        while let Some(wid) = cur {
            let win = self.windows.get(&wid)?;
            if win.optional.is_some() {
                return Some(wid);
            }
            cur = win.parent;
        }
        None
    }

    /// Record that applies to the window, its own or inherited.
    pub(crate) fn effective_optional(&self, id: WindowId) -> Option<&OptionalAttrs> {
        let holder = self.find_window_with_optional(id)?;
        self.windows.get(&holder)?.optional.as_deref()
    }

    /// Record the window would inherit from its ancestors.
    fn inherited_optional(&self, id: WindowId) -> Option<&OptionalAttrs> {
        let parent = self.windows.get(&id)?.parent?;
        self.effective_optional(parent)
    }

    pub fn w_visual(&self, id: WindowId) -> VisualId {
        self.effective_optional(id)
            .map(|opt| opt.visual)
            .unwrap_or(self.info.root_visual)
    }

    pub fn w_colormap(&self, id: WindowId) -> ColormapId {
        self.effective_optional(id).map(|opt| opt.colormap).unwrap_or(0)
    }

    /// Cursor shown in the window: its own, else the nearest ancestor's.
    pub fn w_cursor(&self, id: WindowId) -> Option<Rc<Cursor>> {
        let mut cur = Some(id);
        while let Some(wid) = cur {
            let win = self.windows.get(&wid)?;
            if let Some(cursor) = win.optional.as_ref().and_then(|opt| opt.cursor.clone()) {
                return Some(cursor);
            }
            cur = win.parent;
        }
        None
    }

    /// Give the window its own record, seeded from the inherited one.
    pub fn ensure_optional(&mut self, id: WindowId) -> Result<&mut OptionalAttrs> {
        let win = self.windows.get(&id).ok_or(WindowError::InvalidReference(id))?;
        if win.optional.is_none() {
            let (visual, colormap) = self
                .inherited_optional(id)
                .map(|opt| (opt.visual, opt.colormap))
                .unwrap_or((self.info.root_visual, self.info.default_colormap));
            trace!("Materializing optional attributes for 0x{:x}", id);
            let win = self.windows.get_mut(&id).ok_or(WindowError::InvalidReference(id))?;
            win.optional = Some(Box::new(OptionalAttrs::inheriting(visual, colormap, None)));
        }
        let win = self.windows.get_mut(&id).ok_or(WindowError::InvalidReference(id))?;
        win.optional
            .as_deref_mut()
            .ok_or(WindowError::AllocationFailure)
    }

    /// Drop the window's record if it matches what it would inherit anyway.
    pub fn collect_optional(&mut self, id: WindowId) {
        let Some(win) = self.windows.get(&id) else {
            return;
        };
        if win.parent.is_none() {
            return;
        }
        let Some(opt) = win.optional.as_deref() else {
            return;
        };
        if opt.owns_content() {
            return;
        }
        let Some(parent) = win.parent else {
            return;
        };
        let Some(inherited) = self.effective_optional(parent) else {
            return;
        };
        if opt.visual != inherited.visual || opt.colormap != inherited.colormap {
            return;
        }
        if opt.cursor.is_some() {
            return;
        }
        trace!("Releasing optional attributes for 0x{:x}", id);
        if let Some(win) = self.windows.get_mut(&id) {
            win.optional = None;
        }
    }

    /// Set or clear the cursor override for one device.
    pub fn change_device_cursor(
        &mut self,
        id: WindowId,
        device: u32,
        cursor: Option<Rc<Cursor>>,
    ) -> Result<()> {
        let opt = self.ensure_optional(id)?;
        match opt.device_cursors.iter().position(|dc| dc.device == device) {
            Some(idx) if cursor.is_none() => {
                opt.device_cursors.remove(idx);
            }
            Some(idx) => opt.device_cursors[idx].cursor = cursor,
            None if cursor.is_none() => {}
            None => opt.device_cursors.push(DeviceCursor { device, cursor }),
        }
        self.collect_optional(id);
        Ok(())
    }

    /// Cursor shown for `device` in the window: the nearest override on the
    /// window or its ancestors, else the core cursor.
    pub fn device_cursor(&self, id: WindowId, device: u32) -> Result<Option<Rc<Cursor>>> {
        if !self.windows.contains_key(&id) {
            return Err(WindowError::InvalidReference(id));
        }
        let mut cur = Some(id);
        while let Some(wid) = cur {
            let Some(win) = self.windows.get(&wid) else {
                break;
            };
            if let Some(dc) = win
                .optional
                .as_ref()
                .and_then(|opt| opt.device_cursors.iter().find(|dc| dc.device == device))
            {
                return Ok(dc.cursor.clone());
            }
            cur = win.parent;
        }
        Ok(self.w_cursor(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dix::test_support::{screen, simple_window};

    #[test]
    fn test_ensure_then_collect_is_idempotent() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let a = simple_window(&mut scr, root, 0x100, 0, 0, 10, 10);

        assert!(scr.window(a).unwrap().optional.is_none());
        scr.ensure_optional(a).unwrap();
        assert_eq!(scr.w_visual(a), scr.w_visual(root));
        scr.collect_optional(a);
        assert!(scr.window(a).unwrap().optional.is_none());
        scr.collect_optional(a);
        assert!(scr.window(a).unwrap().optional.is_none());
    }

    #[test]
    fn test_owned_content_keeps_record() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let a = simple_window(&mut scr, root, 0x100, 0, 0, 10, 10);

        scr.ensure_optional(a).unwrap().dont_propagate_mask = EventMask::KEY_PRESS;
        scr.collect_optional(a);
        assert!(scr.window(a).unwrap().optional.is_some());
    }

    #[test]
    fn test_device_cursor_resolves_through_ancestors() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let a = simple_window(&mut scr, root, 0x100, 0, 0, 10, 10);
        let b = simple_window(&mut scr, a, 0x101, 0, 0, 5, 5);
        let arrow = Rc::new(Cursor { id: 7 });

        scr.change_device_cursor(a, 2, Some(arrow.clone())).unwrap();
        let shown = scr.device_cursor(b, 2).unwrap().unwrap();
        assert!(Rc::ptr_eq(&shown, &arrow));
        assert_eq!(scr.device_cursor(b, 3).unwrap(), scr.w_cursor(b));

        scr.change_device_cursor(a, 2, None).unwrap();
        assert!(scr.window(a).unwrap().optional.is_none());
    }
}
