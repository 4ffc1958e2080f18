//! Window attributes
//!
//! Change and query requests for the per-window attribute set, event
//! selection, deliverable-event propagation, shapes, properties and passive
//! grabs.

use std::rc::Rc;

use area_region::Region;
use serde::Serialize;
use tracing::{debug, trace};

use crate::dix::backend::ValidateKind;
use crate::dix::events::Event;
use crate::dix::flags::EventMask;
use crate::dix::optional::{OtherClient, PassiveGrab, Property};
use crate::dix::window::{Background, Border, Cursor};
use crate::dix::Screen;
use crate::error::{Result, WindowError};
use crate::shared::{
    Atom, BackingStore, ClientId, ColormapId, Gravity, MapState, PropMode, ShapeKind, VisualId,
    WindowClass, WindowId,
};

/// Attribute values carried by create and change requests; absent fields
/// are left alone.
#[derive(Debug, Clone, Default)]
pub struct WindowAttributes {
    pub background: Option<Background>,
    pub border: Option<Border>,
    pub bit_gravity: Option<Gravity>,
    pub win_gravity: Option<Gravity>,
    pub backing_store: Option<BackingStore>,
    pub backing_planes: Option<u32>,
    pub backing_pixel: Option<u32>,
    pub override_redirect: Option<bool>,
    pub save_under: Option<bool>,
    pub event_mask: Option<EventMask>,
    pub do_not_propagate_mask: Option<EventMask>,
    /// 0 copies the parent's colormap
    pub colormap: Option<ColormapId>,
    /// `Some(None)` makes the window inherit its parent's cursor
    pub cursor: Option<Option<Rc<Cursor>>>,
}

impl WindowAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn background(mut self, background: Background) -> Self {
        self.background = Some(background);
        self
    }

    pub fn background_pixel(self, pixel: u32) -> Self {
        self.background(Background::Pixel(pixel))
    }

    pub fn border(mut self, border: Border) -> Self {
        self.border = Some(border);
        self
    }

    pub fn border_pixel(self, pixel: u32) -> Self {
        self.border(Border::Pixel(pixel))
    }

    pub fn bit_gravity(mut self, gravity: Gravity) -> Self {
        self.bit_gravity = Some(gravity);
        self
    }

    pub fn win_gravity(mut self, gravity: Gravity) -> Self {
        self.win_gravity = Some(gravity);
        self
    }

    pub fn backing_store(mut self, backing_store: BackingStore) -> Self {
        self.backing_store = Some(backing_store);
        self
    }

    pub fn backing_planes(mut self, planes: u32) -> Self {
        self.backing_planes = Some(planes);
        self
    }

    pub fn backing_pixel(mut self, pixel: u32) -> Self {
        self.backing_pixel = Some(pixel);
        self
    }

    pub fn override_redirect(mut self, value: bool) -> Self {
        self.override_redirect = Some(value);
        self
    }

    pub fn save_under(mut self, value: bool) -> Self {
        self.save_under = Some(value);
        self
    }

    pub fn event_mask(mut self, mask: EventMask) -> Self {
        self.event_mask = Some(mask);
        self
    }

    pub fn do_not_propagate_mask(mut self, mask: EventMask) -> Self {
        self.do_not_propagate_mask = Some(mask);
        self
    }

    pub fn colormap(mut self, colormap: ColormapId) -> Self {
        self.colormap = Some(colormap);
        self
    }

    pub fn cursor(mut self, cursor: Option<Rc<Cursor>>) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Fields an InputOnly window can't have.
    fn has_output_fields(&self) -> bool {
        self.background.is_some()
            || self.border.is_some()
            || self.colormap.is_some()
            || self.bit_gravity.is_some()
            || self.backing_store.is_some()
            || self.backing_planes.is_some()
            || self.backing_pixel.is_some()
            || self.save_under.is_some()
    }
}

/// Reply to an attribute query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowAttributesReply {
    pub class: WindowClass,
    pub visual: VisualId,
    pub colormap: ColormapId,
    pub bit_gravity: Gravity,
    pub win_gravity: Gravity,
    pub backing_store: BackingStore,
    pub backing_planes: u32,
    pub backing_pixel: u32,
    pub save_under: bool,
    pub override_redirect: bool,
    pub map_state: MapState,
    /// Union of every client's selection
    pub all_event_masks: u32,
    /// Selection of the asking client
    pub your_event_mask: u32,
    pub do_not_propagate_mask: u32,
}

impl Screen {
    /// Check an attribute set against the window it will land on. `id` is
    /// None while the window is being created.
    pub(crate) fn validate_attributes(
        &self,
        id: Option<WindowId>,
        parent: WindowId,
        class: WindowClass,
        depth: u8,
        attrs: &WindowAttributes,
        client: ClientId,
    ) -> Result<()> {
        if class == WindowClass::InputOnly && attrs.has_output_fields() {
            return Err(WindowError::InvalidMatch("InputOnly windows have no output attributes"));
        }
        let parent_depth = self.get(parent)?.depth;

        match &attrs.background {
            Some(Background::ParentRelative) if depth != parent_depth => {
                return Err(WindowError::InvalidMatch("ParentRelative background needs the parent's depth"));
            }
            Some(Background::Pixmap(pixmap)) if pixmap.depth != depth => {
                return Err(WindowError::InvalidMatch("background pixmap depth differs from the window"));
            }
            _ => {}
        }
        if let Some(Border::Pixmap(pixmap)) = &attrs.border {
            if pixmap.depth != depth {
                return Err(WindowError::InvalidMatch("border pixmap depth differs from the window"));
            }
        }
        if let Some(mask) = attrs.do_not_propagate_mask {
            if !EventMask::propagate().contains(mask) {
                return Err(WindowError::InvalidValue(mask.bits()));
            }
        }
        if let (Some(id), Some(mask)) = (id, attrs.event_mask) {
            self.check_exclusive(id, client, mask)?;
        }
        Ok(())
    }

    /// Refuse a selection of an exclusive event another client holds.
    fn check_exclusive(&self, id: WindowId, client: ClientId, mask: EventMask) -> Result<()> {
        for bit in (mask & EventMask::exclusive()).iter() {
            if self
                .selecting_client(id, bit)
                .is_some_and(|holder| holder != client)
            {
                return Err(WindowError::AccessDenied("event selection is held by another client"));
            }
        }
        Ok(())
    }

    /// Store a validated attribute set.
    pub(crate) fn apply_attributes(
        &mut self,
        id: WindowId,
        attrs: &WindowAttributes,
        client: ClientId,
    ) -> Result<()> {
        let parent = self.get(id)?.parent;
        {
            let win = self.get_mut(id)?;
            if let Some(background) = &attrs.background {
                win.background = background.clone();
            }
            if let Some(border) = &attrs.border {
                win.border = border.clone();
            }
            if let Some(gravity) = attrs.bit_gravity {
                win.bit_gravity = gravity;
            }
            if let Some(gravity) = attrs.win_gravity {
                win.win_gravity = gravity;
            }
            if let Some(backing_store) = attrs.backing_store {
                win.backing_store = backing_store;
            }
            if let Some(value) = attrs.override_redirect {
                win.override_redirect = value;
            }
            if let Some(value) = attrs.save_under {
                win.save_under = value;
            }
        }

        let touches_optional = attrs.backing_planes.is_some()
            || attrs.backing_pixel.is_some()
            || attrs.do_not_propagate_mask.is_some()
            || attrs.colormap.is_some()
            || attrs.cursor.is_some();
        if touches_optional {
            let parent_colormap = parent.map(|p| self.w_colormap(p)).unwrap_or(0);
            let opt = self.ensure_optional(id)?;
            if let Some(planes) = attrs.backing_planes {
                opt.backing_bit_planes = planes;
            }
            if let Some(pixel) = attrs.backing_pixel {
                opt.backing_pixel = pixel;
            }
            if let Some(mask) = attrs.do_not_propagate_mask {
                opt.dont_propagate_mask = mask;
            }
            if let Some(colormap) = attrs.colormap {
                opt.colormap = if colormap == 0 { parent_colormap } else { colormap };
            }
            if let Some(cursor) = &attrs.cursor {
                opt.cursor = cursor.clone();
            }
        }

        if let Some(mask) = attrs.event_mask {
            self.set_event_mask(id, client, mask)?;
        }
        if attrs.event_mask.is_some() || attrs.do_not_propagate_mask.is_some() {
            self.recalculate_deliverable_events(id);
        }
        self.collect_optional(id);

        if attrs.border.is_some() {
            if let Some(win) = self.windows.get(&id) {
                if win.viewable && win.has_border() {
                    let visible = win.border_clip.subtract(&win.win_size);
                    self.backend.paint_border(win, &visible);
                }
            }
        }
        Ok(())
    }

    /// Change attributes of an existing window on behalf of `client`.
    pub fn change_attributes(&mut self, id: WindowId, client: ClientId, attrs: &WindowAttributes) -> Result<()> {
        let win = self.get(id)?;
        let (class, depth) = (win.class, win.depth);
        // The root's own attributes are validated against itself.
        let parent = win.parent.unwrap_or(id);
        self.validate_attributes(Some(id), parent, class, depth, attrs, client)?;
        debug!("Changing attributes of 0x{:x}", id);
        self.apply_attributes(id, attrs, client)
    }

    pub fn get_attributes(&self, id: WindowId, client: ClientId) -> Result<WindowAttributesReply> {
        let win = self.get(id)?;
        let your_event_mask = if client == win.owner {
            win.event_mask
        } else {
            win.optional
                .as_ref()
                .and_then(|opt| opt.other_clients.iter().find(|oc| oc.client == client))
                .map(|oc| oc.mask)
                .unwrap_or_default()
        };
        let (backing_planes, backing_pixel) = win
            .optional
            .as_ref()
            .map(|opt| (opt.backing_bit_planes, opt.backing_pixel))
            .unwrap_or((!0, 0));

        Ok(WindowAttributesReply {
            class: win.class,
            visual: self.w_visual(id),
            colormap: self.w_colormap(id),
            bit_gravity: win.bit_gravity,
            win_gravity: win.win_gravity,
            backing_store: win.backing_store,
            backing_planes,
            backing_pixel,
            save_under: win.save_under,
            override_redirect: win.override_redirect,
            map_state: win.map_state(),
            all_event_masks: self.event_masks(id).bits(),
            your_event_mask: your_event_mask.bits(),
            do_not_propagate_mask: win.dont_propagate_mask().bits(),
        })
    }

    /// Replace `client`'s event selection on the window.
    pub fn select_input(&mut self, id: WindowId, client: ClientId, mask: EventMask) -> Result<()> {
        self.get(id)?;
        self.check_exclusive(id, client, mask)?;
        self.set_event_mask(id, client, mask)?;
        self.recalculate_deliverable_events(id);
        self.collect_optional(id);
        Ok(())
    }

    fn set_event_mask(&mut self, id: WindowId, client: ClientId, mask: EventMask) -> Result<()> {
        let win = self.get_mut(id)?;
        if win.owner == client {
            win.event_mask = mask;
            return Ok(());
        }
        trace!("Client {} selects {:?} on 0x{:x}", client, mask, id);
        let opt = self.ensure_optional(id)?;
        match opt.other_clients.iter().position(|oc| oc.client == client) {
            Some(idx) if mask.is_empty() => {
                opt.other_clients.remove(idx);
            }
            Some(idx) => opt.other_clients[idx].mask = mask,
            None if mask.is_empty() => {}
            None => opt.other_clients.push(OtherClient { client, mask }),
        }
        opt.recompute_other_masks();
        Ok(())
    }

    /// Recompute what can reach each window of the subtree: its own
    /// selections plus whatever its parent lets propagate.
    pub(crate) fn recalculate_deliverable_events(&mut self, id: WindowId) {
        for wid in self.pre_order(id) {
            let Some(win) = self.windows.get(&wid) else {
                continue;
            };
            let inherited = win
                .parent
                .and_then(|p| self.windows.get(&p))
                .map(|p| p.deliverable_events & EventMask::propagate() & !win.dont_propagate_mask())
                .unwrap_or_default();
            let deliverable = win.event_mask | win.other_event_masks() | inherited;
            if let Some(win) = self.windows.get_mut(&wid) {
                win.deliverable_events = deliverable;
            }
        }
    }

    /// Set or clear a shape, relative to the window's inside corner.
    pub fn set_shape(&mut self, id: WindowId, kind: ShapeKind, shape: Option<Region>) -> Result<()> {
        let win = self.get(id)?;
        let parent = win.parent;
        let was_viewable = win.viewable;

        let shape = shape.map(Rc::new);
        let opt = self.ensure_optional(id)?;
        match kind {
            ShapeKind::Bounding => opt.bounding_shape = shape,
            ShapeKind::Clip => opt.clip_shape = shape,
            ShapeKind::Input => opt.input_shape = shape,
        }
        self.collect_optional(id);
        debug!("Set {:?} shape on 0x{:x}", kind, id);
        if kind == ShapeKind::Input {
            return Ok(());
        }

        if was_viewable {
            self.mark_subtree(id);
        }
        self.set_win_size(id);
        self.set_border_size(id);
        self.resize_children_win_size(id, 0, 0, 0, 0);

        if let (true, Some(parent)) = (was_viewable, parent) {
            self.mark_window(parent);
            self.validate_tree(parent, Some(id), ValidateKind::Other);
            self.handle_exposures(parent);
            self.backend.post_validate_tree(Some(parent), Some(id), ValidateKind::Other);
        }
        Ok(())
    }

    /// Redirect the window's contents off-screen (or back). A redirected
    /// window's areas ignore its ancestors.
    pub fn set_redirect_draw(&mut self, id: WindowId, redirect: bool) -> Result<()> {
        let win = self.get(id)?;
        if win.redirect_draw == redirect {
            return Ok(());
        }
        let parent = win.parent;
        let was_viewable = win.viewable;
        debug!("Redirect drawing of 0x{:x}: {}", id, redirect);

        if was_viewable {
            self.mark_subtree(id);
        }
        self.get_mut(id)?.redirect_draw = redirect;
        self.set_win_size(id);
        self.set_border_size(id);
        self.resize_children_win_size(id, 0, 0, 0, 0);

        if let (true, Some(parent)) = (was_viewable, parent) {
            self.mark_window(parent);
            self.validate_tree(parent, Some(id), ValidateKind::Other);
            self.handle_exposures(parent);
            self.backend.post_validate_tree(Some(parent), Some(id), ValidateKind::Other);
        }
        Ok(())
    }

    pub fn change_property(
        &mut self,
        id: WindowId,
        name: Atom,
        type_: Atom,
        format: u8,
        mode: PropMode,
        data: &[u8],
    ) -> Result<()> {
        self.get(id)?;
        if !matches!(format, 8 | 16 | 32) {
            return Err(WindowError::InvalidValue(format as u32));
        }
        if data.len() % (format as usize / 8) != 0 {
            return Err(WindowError::InvalidMatch("property data is not a whole number of units"));
        }
        let existing = self
            .windows
            .get(&id)
            .and_then(|w| w.optional.as_ref())
            .and_then(|opt| opt.user_props.iter().find(|p| p.name == name))
            .map(|p| (p.type_, p.format));
        if let (Some((old_type, old_format)), PropMode::Prepend | PropMode::Append) = (existing, mode) {
            if old_type != type_ || old_format != format {
                return Err(WindowError::InvalidMatch("property type or format differs"));
            }
        }

        let opt = self.ensure_optional(id)?;
        match opt.user_props.iter_mut().find(|p| p.name == name) {
            Some(prop) => match mode {
                PropMode::Replace => {
                    prop.type_ = type_;
                    prop.format = format;
                    prop.data = data.to_vec();
                }
                PropMode::Prepend => {
                    let mut merged = data.to_vec();
                    merged.extend_from_slice(&prop.data);
                    prop.data = merged;
                }
                PropMode::Append => prop.data.extend_from_slice(data),
            },
            None => opt.user_props.push(Property {
                name,
                type_,
                format,
                data: data.to_vec(),
            }),
        }
        trace!("Property {} changed on 0x{:x}", name, id);
        let event = Event::PropertyNotify { window: id, atom: name, deleted: false };
        self.deliver_to(id, &event, EventMask::PROPERTY_CHANGE);
        Ok(())
    }

    /// Remove a property. Deleting one that doesn't exist is not an error.
    pub fn delete_property(&mut self, id: WindowId, name: Atom) -> Result<()> {
        let removed = match self.get_mut(id)?.optional.as_deref_mut() {
            Some(opt) => {
                let before = opt.user_props.len();
                opt.user_props.retain(|p| p.name != name);
                opt.user_props.len() != before
            }
            None => false,
        };
        if removed {
            self.collect_optional(id);
            let event = Event::PropertyNotify { window: id, atom: name, deleted: true };
            self.deliver_to(id, &event, EventMask::PROPERTY_CHANGE);
        }
        Ok(())
    }

    pub fn get_property(&self, id: WindowId, name: Atom) -> Result<Option<&Property>> {
        Ok(self
            .get(id)?
            .optional
            .as_ref()
            .and_then(|opt| opt.user_props.iter().find(|p| p.name == name)))
    }

    /// Register a passive grab. A grab with the same client, device,
    /// modifiers and detail replaces the old one.
    pub fn add_passive_grab(&mut self, id: WindowId, grab: PassiveGrab) -> Result<()> {
        let opt = self.ensure_optional(id)?;
        opt.passive_grabs.retain(|g| {
            !(g.client == grab.client
                && g.device == grab.device
                && g.modifiers == grab.modifiers
                && g.detail == grab.detail)
        });
        opt.passive_grabs.push(grab);
        Ok(())
    }

    /// Drop every passive grab `client` holds on the window.
    pub fn remove_passive_grabs(&mut self, id: WindowId, client: ClientId) -> Result<()> {
        if let Some(opt) = self.get_mut(id)?.optional.as_deref_mut() {
            opt.passive_grabs.retain(|g| g.client != client);
        }
        self.collect_optional(id);
        Ok(())
    }

    /// A client disconnected: drop its selections and grabs everywhere and
    /// destroy the top-level windows of every tree it created.
    pub fn client_gone(&mut self, client: ClientId) -> Result<()> {
        let ids: Vec<WindowId> = self.windows.keys().copied().collect();
        for &id in &ids {
            let Some(win) = self.windows.get_mut(&id) else {
                continue;
            };
            if win.owner == client {
                win.event_mask = EventMask::empty();
            }
            if let Some(opt) = win.optional.as_deref_mut() {
                opt.other_clients.retain(|oc| oc.client != client);
                opt.passive_grabs.retain(|g| g.client != client);
                opt.recompute_other_masks();
            }
        }
        if let Some(root) = self.root {
            self.recalculate_deliverable_events(root);
        }
        for &id in &ids {
            self.collect_optional(id);
        }

        // Destroying a window takes its inferiors with it, so only windows
        // whose parent belongs to someone else are destroyed directly.
        let owned: Vec<WindowId> = self
            .windows
            .values()
            .filter(|w| w.owner == client && w.parent.is_some())
            .filter(|w| {
                w.parent
                    .and_then(|p| self.windows.get(&p))
                    .is_none_or(|p| p.owner != client)
            })
            .map(|w| w.id)
            .collect();
        debug!("Client {} gone, destroying {} windows", client, owned.len());
        for id in owned {
            if self.windows.contains_key(&id) {
                self.destroy_window(id)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dix::test_support::{mapped_window, screen, simple_window, CLIENT, WM};
    use crate::dix::window::Pixmap;
    use area_region::Rect;

    #[test]
    fn test_input_only_rejects_output_attributes() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let io = scr
            .create_window(CLIENT, 0, 0x100, root, 0, 0, 10, 10, 0, WindowClass::InputOnly, 0, &WindowAttributes::new())
            .unwrap();

        for attrs in [
            WindowAttributes::new().background_pixel(1),
            WindowAttributes::new().border_pixel(1),
            WindowAttributes::new().colormap(0x20),
        ] {
            assert!(matches!(scr.change_attributes(io, CLIENT, &attrs), Err(WindowError::InvalidMatch(_))));
        }
        scr.change_attributes(io, CLIENT, &WindowAttributes::new().override_redirect(true))
            .unwrap();
        assert!(scr.get(io).unwrap().override_redirect);
    }

    #[test]
    fn test_parent_relative_needs_parent_depth() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let attrs = WindowAttributes::new().border_pixel(0).colormap(0x40);
        let argb = scr
            .create_window(CLIENT, 32, 0x100, root, 0, 0, 5, 5, 0, WindowClass::InputOutput, 0x23, &attrs)
            .unwrap();

        let relative = WindowAttributes::new().background(Background::ParentRelative);
        assert!(matches!(scr.change_attributes(argb, CLIENT, &relative), Err(WindowError::InvalidMatch(_))));

        let shallow = WindowAttributes::new().background(Background::Pixmap(Rc::new(Pixmap { id: 9, depth: 24 })));
        assert!(matches!(scr.change_attributes(argb, CLIENT, &shallow), Err(WindowError::InvalidMatch(_))));
    }

    #[test]
    fn test_exclusive_selection() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();

        scr.select_input(root, WM, EventMask::SUBSTRUCTURE_REDIRECT).unwrap();
        assert_eq!(
            scr.select_input(root, CLIENT, EventMask::SUBSTRUCTURE_REDIRECT | EventMask::EXPOSURE),
            Err(WindowError::AccessDenied("event selection is held by another client"))
        );
        scr.select_input(root, CLIENT, EventMask::SUBSTRUCTURE_NOTIFY).unwrap();
        scr.select_input(root, WM, EventMask::SUBSTRUCTURE_REDIRECT).unwrap();

        let reply = scr.get_attributes(root, CLIENT).unwrap();
        assert_eq!(reply.your_event_mask, EventMask::SUBSTRUCTURE_NOTIFY.bits());
        assert_eq!(
            reply.all_event_masks,
            (EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT).bits()
        );
    }

    #[test]
    fn test_deliverable_events_propagate() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let a = simple_window(&mut scr, root, 0x100, 0, 0, 10, 10);
        let b = simple_window(&mut scr, a, 0x101, 0, 0, 5, 5);

        scr.select_input(a, CLIENT, EventMask::KEY_PRESS | EventMask::EXPOSURE).unwrap();
        assert!(scr.get(b).unwrap().deliverable_events.contains(EventMask::KEY_PRESS));
        assert!(!scr.get(b).unwrap().deliverable_events.contains(EventMask::EXPOSURE));

        scr.change_attributes(b, CLIENT, &WindowAttributes::new().do_not_propagate_mask(EventMask::KEY_PRESS))
            .unwrap();
        assert!(!scr.get(b).unwrap().deliverable_events.contains(EventMask::KEY_PRESS));

        let bad = WindowAttributes::new().do_not_propagate_mask(EventMask::EXPOSURE);
        assert!(matches!(scr.change_attributes(b, CLIENT, &bad), Err(WindowError::InvalidValue(_))));
    }

    #[test]
    fn test_get_attributes_map_state() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let a = simple_window(&mut scr, root, 0x100, 0, 0, 10, 10);
        let b = simple_window(&mut scr, a, 0x101, 0, 0, 5, 5);

        assert_eq!(scr.get_attributes(b, CLIENT).unwrap().map_state, MapState::Unmapped);
        scr.map_window(b, CLIENT).unwrap();
        assert_eq!(scr.get_attributes(b, CLIENT).unwrap().map_state, MapState::Unviewable);
        scr.map_window(a, CLIENT).unwrap();
        let reply = scr.get_attributes(b, CLIENT).unwrap();
        assert_eq!(reply.map_state, MapState::Viewable);
        assert_eq!(reply.visual, scr.info().root_visual);
        assert_eq!(reply.backing_planes, !0);
    }

    #[test]
    fn test_bounding_shape_reveals_sibling_below() {
        let (mut scr, log) = screen();
        let root = scr.root().unwrap();
        let below = mapped_window(&mut scr, root, 0x100, 0, 0, 100, 100);
        let above = mapped_window(&mut scr, root, 0x101, 0, 0, 100, 100);
        scr.select_input(below, CLIENT, EventMask::EXPOSURE).unwrap();
        assert!(scr.get(below).unwrap().clip_list.is_empty());
        log.clear();

        scr.set_shape(above, ShapeKind::Bounding, Some(Region::from_rect(Rect::new(0, 0, 50, 100))))
            .unwrap();

        assert_eq!(scr.get(above).unwrap().win_size, Region::from_rect(Rect::new(0, 0, 50, 100)));
        assert_eq!(scr.get(below).unwrap().clip_list, Region::from_rect(Rect::new(50, 0, 100, 100)));
        assert_eq!(
            log.events(),
            vec![Event::Expose { window: below, x: 50, y: 0, width: 50, height: 100, count: 0 }]
        );

        scr.set_shape(above, ShapeKind::Bounding, None).unwrap();
        assert!(scr.get(below).unwrap().clip_list.is_empty());
        assert!(scr.get(above).unwrap().optional.is_none());
    }

    #[test]
    fn test_properties() {
        let (mut scr, log) = screen();
        let root = scr.root().unwrap();
        let a = simple_window(&mut scr, root, 0x100, 0, 0, 10, 10);
        scr.select_input(a, CLIENT, EventMask::PROPERTY_CHANGE).unwrap();
        log.clear();

        scr.change_property(a, 39, 31, 8, PropMode::Replace, b"term").unwrap();
        scr.change_property(a, 39, 31, 8, PropMode::Append, b"inal").unwrap();
        scr.change_property(a, 39, 31, 8, PropMode::Prepend, b"x-").unwrap();
        assert_eq!(scr.get_property(a, 39).unwrap().unwrap().data, b"x-terminal");

        assert!(matches!(
            scr.change_property(a, 39, 4, 32, PropMode::Append, &[0; 4]),
            Err(WindowError::InvalidMatch(_))
        ));
        assert_eq!(scr.change_property(a, 40, 4, 7, PropMode::Replace, &[]), Err(WindowError::InvalidValue(7)));

        scr.delete_property(a, 39).unwrap();
        scr.delete_property(a, 39).unwrap();
        assert!(scr.get_property(a, 39).unwrap().is_none());
        let events = log.events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[3], Event::PropertyNotify { window: a, atom: 39, deleted: true });
    }

    #[test]
    fn test_client_gone_cleans_up() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let a = mapped_window(&mut scr, root, 0x100, 0, 0, 10, 10);
        let b = mapped_window(&mut scr, a, 0x101, 0, 0, 5, 5);
        scr.select_input(root, CLIENT, EventMask::SUBSTRUCTURE_NOTIFY).unwrap();
        let grab = PassiveGrab {
            client: CLIENT,
            device: 2,
            modifiers: 0,
            detail: 1,
            event_mask: EventMask::BUTTON_PRESS,
        };
        scr.add_passive_grab(root, grab).unwrap();

        scr.client_gone(CLIENT).unwrap();

        assert!(!scr.contains(a) && !scr.contains(b));
        assert!(scr.event_masks(root).is_empty());
        assert!(scr.get(root).unwrap().optional.as_ref().unwrap().passive_grabs.is_empty());
        assert!(scr.get(root).unwrap().clip_list.contains_point(2, 2));
    }
}
