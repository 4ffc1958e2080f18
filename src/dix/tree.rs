//! Window tree
//!
//! Creation, destruction and reparenting of windows, and the sibling-list
//! plumbing everything else is built on.

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::dix::attributes::WindowAttributes;
use crate::dix::events::Event;
use crate::dix::flags::EventMask;
use crate::dix::window::{Background, Window};
use crate::dix::Screen;
use crate::error::{Result, WindowError};
use crate::shared::{ClientId, Geometry, VisualId, WindowClass, WindowId};

/// What a tree walk does after visiting a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Continue into the window's children
    Children,
    /// Skip the window's children
    Skip,
    /// End the walk
    Stop,
}

/// Reply to a tree query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryTreeReply {
    pub root: Option<WindowId>,
    pub parent: Option<WindowId>,
    /// Bottom of the stack first
    pub children: Vec<WindowId>,
}

impl Screen {
    /// Create a window as the topmost real child of `parent`.
    ///
    /// `depth` 0 and `visual` 0 copy the parent's; `class` may be
    /// CopyFromParent.
    #[allow(clippy::too_many_arguments)]
    pub fn create_window(
        &mut self,
        client: ClientId,
        depth: u8,
        wid: WindowId,
        parent: WindowId,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        border_width: u32,
        class: WindowClass,
        visual: VisualId,
        attrs: &WindowAttributes,
    ) -> Result<WindowId> {
        if self.windows.contains_key(&wid) {
            return Err(WindowError::IdInUse(wid));
        }
        let pwin = self.get(parent)?;
        if width == 0 || height == 0 {
            return Err(WindowError::InvalidValue(0));
        }

        let class = match class {
            WindowClass::CopyFromParent => pwin.class,
            class => class,
        };
        if class != WindowClass::InputOnly && pwin.class == WindowClass::InputOnly {
            return Err(WindowError::InvalidMatch("InputOnly parent cannot hold InputOutput children"));
        }
        if class == WindowClass::InputOnly && (border_width != 0 || depth != 0) {
            return Err(WindowError::InvalidMatch("InputOnly windows take no border or depth"));
        }

        let depth = if class == WindowClass::InputOutput && depth == 0 {
            pwin.depth
        } else {
            depth
        };
        let parent_depth = pwin.depth;
        let parent_origin = (pwin.drawable.x, pwin.drawable.y);
        let parent_border = pwin.border.clone();
        let parent_visual = self.w_visual(parent);
        let parent_colormap = self.w_colormap(parent);
        let visual = if visual == 0 { parent_visual } else { visual };

        if class != WindowClass::InputOnly
            && (visual != parent_visual || depth != parent_depth)
            && !self.info.allows(depth, visual)
        {
            return Err(WindowError::InvalidMatch("depth and visual are not supported together"));
        }
        if class != WindowClass::InputOnly && depth != parent_depth && attrs.border.is_none() {
            return Err(WindowError::InvalidMatch("a window deeper or shallower than its parent needs a border"));
        }
        if class != WindowClass::InputOnly
            && attrs.colormap.is_none()
            && (visual != parent_visual || parent_colormap == 0)
        {
            return Err(WindowError::InvalidMatch("a window with its own visual needs a colormap"));
        }
        self.validate_attributes(None, parent, class, depth, attrs, client)?;

        let bw = border_width as i32;
        let mut win = Window::new(wid, client, class, depth);
        win.parent = Some(parent);
        win.border_width = border_width;
        win.border = parent_border;
        win.origin = (x + bw, y + bw);
        win.drawable = Geometry::new(parent_origin.0 + x + bw, parent_origin.1 + y + bw, width, height);
        self.windows.insert(wid, win);

        if visual != parent_visual {
            let opt = self.ensure_optional(wid)?;
            opt.visual = visual;
            opt.colormap = 0;
        }

        self.link_at_head(wid, parent);
        self.set_win_size(wid);
        self.set_border_size(wid);

        let created = match self.windows.get(&wid) {
            Some(win) => self.backend.create_window(win),
            None => false,
        };
        if !created {
            self.unlink(wid);
            self.windows.remove(&wid);
            return Err(WindowError::AllocationFailure);
        }
        if let Some(win) = self.windows.get(&wid) {
            self.backend.position_window(win);
        }

        if attrs.event_mask.is_none() {
            self.recalculate_deliverable_events(wid);
        }
        self.apply_attributes(wid, attrs, client)?;

        let override_redirect = self.get(wid)?.override_redirect;
        let event = Event::CreateNotify {
            parent,
            window: wid,
            x,
            y,
            width,
            height,
            border_width,
            override_redirect,
        };
        self.deliver_to(parent, &event, EventMask::SUBSTRUCTURE_NOTIFY);

        debug!("Created window 0x{:x} ({}x{}+{}+{}) under 0x{:x}", wid, width, height, x, y, parent);
        Ok(wid)
    }

    /// Destroy a window and everything below it. Requests against the root
    /// are ignored.
    pub fn destroy_window(&mut self, id: WindowId) -> Result<()> {
        if self.get(id)?.parent.is_none() {
            return Ok(());
        }
        self.delete_window(id)
    }

    /// Resource-free entry point. Unlike `destroy_window` this also tears
    /// down the root.
    pub fn free_window(&mut self, id: WindowId) -> Result<()> {
        self.get(id)?;
        self.delete_window(id)
    }

    /// Unmap the children, then destroy them from the bottom up.
    pub fn destroy_subwindows(&mut self, id: WindowId) -> Result<()> {
        self.unmap_subwindows(id)?;
        while let Some(last) = self.get(id)?.last_child {
            self.delete_window(last)?;
        }
        Ok(())
    }

    fn delete_window(&mut self, id: WindowId) -> Result<()> {
        debug!("Destroying window 0x{:x}", id);
        self.unmap(id, false)?;
        self.crush_tree(id);

        let parent = self.get(id)?.parent;
        if parent.is_some() {
            self.deliver_structure(id, &Event::DestroyNotify { window: id }, None);
        }
        self.release_window(id);

        if parent.is_none() {
            self.root = None;
            info!("Root window 0x{:x} destroyed", id);
        }
        Ok(())
    }

    /// Destroy every inferior of `id`, children before their parent.
    fn crush_tree(&mut self, id: WindowId) {
        for child in self.post_order(id) {
            self.deliver_structure(child, &Event::DestroyNotify { window: child }, None);
            if let Some(win) = self.windows.get_mut(&child) {
                win.viewable = false;
                if win.realized {
                    win.realized = false;
                    self.backend.unrealize_window(win);
                }
            }
            self.release_window(child);
        }
    }

    /// Unlink the window and drop it with everything it owns.
    fn release_window(&mut self, id: WindowId) {
        self.unlink(id);
        if let Some(win) = self.windows.remove(&id) {
            self.backend.destroy_window(&win);
            trace!("Released window 0x{:x}", id);
        }
        if self.saver.window == Some(id) {
            self.saver.window = None;
        }
    }

    /// Move `id` under `new_parent` with its outer corner at `x`, `y`.
    pub fn reparent_window(
        &mut self,
        id: WindowId,
        new_parent: WindowId,
        x: i32,
        y: i32,
        client: ClientId,
    ) -> Result<()> {
        let win = self.get(id)?;
        let np = self.get(new_parent)?;
        if win.parent.is_none() {
            return Err(WindowError::InvalidMatch("the root cannot be reparented"));
        }
        if id == new_parent || self.is_ancestor(id, new_parent) {
            return Err(WindowError::InvalidMatch("new parent is the window or one of its inferiors"));
        }
        if win.class == WindowClass::InputOutput && np.class == WindowClass::InputOnly {
            return Err(WindowError::InvalidMatch("InputOnly parent cannot hold InputOutput children"));
        }
        if matches!(win.background, Background::ParentRelative) && win.depth != np.depth {
            return Err(WindowError::InvalidMatch("ParentRelative background needs the parent's depth"));
        }

        debug!("Reparenting window 0x{:x} into 0x{:x} at {},{}", id, new_parent, x, y);
        let was_mapped = win.mapped;
        let override_redirect = win.override_redirect;
        let bw = win.border_width as i32;
        let np_origin = (np.drawable.x, np.drawable.y);

        if was_mapped {
            self.unmap(id, false)?;
        }

        let event = Event::ReparentNotify {
            window: id,
            parent: new_parent,
            x,
            y,
            override_redirect,
        };
        self.deliver_structure(id, &event, Some(new_parent));

        // Pin inherited attributes before the ancestry changes.
        self.ensure_optional(id)?;

        self.unlink(id);
        {
            let win = self.get_mut(id)?;
            win.parent = Some(new_parent);
            win.origin = (x + bw, y + bw);
            win.drawable.x = np_origin.0 + x + bw;
            win.drawable.y = np_origin.1 + y + bw;
        }
        self.link_at_head(id, new_parent);

        self.set_win_size(id);
        self.set_border_size(id);
        if let Some(win) = self.windows.get(&id) {
            self.backend.position_window(win);
        }
        self.resize_children_win_size(id, 0, 0, 0, 0);

        self.collect_optional(id);
        self.recalculate_deliverable_events(id);

        if was_mapped {
            self.map_window(id, client)?;
        }
        Ok(())
    }

    /// Root, parent and children (bottom first) of a window.
    pub fn query_tree(&self, id: WindowId) -> Result<QueryTreeReply> {
        let win = self.get(id)?;
        let mut children = self.children(id);
        children.reverse();
        Ok(QueryTreeReply {
            root: self.root,
            parent: win.parent,
            children,
        })
    }

    /// True if `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: WindowId, id: WindowId) -> bool {
        let mut cur = self.windows.get(&id).and_then(|w| w.parent);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.windows.get(&p).and_then(|w| w.parent);
        }
        false
    }

    /// Last system child of `parent`: the saver window on the root while
    /// the saver is active. Real children start below it.
    pub(crate) fn real_child_head(&self, parent: WindowId) -> Option<WindowId> {
        if Some(parent) == self.root && self.saver.is_on() && self.saver.window.is_some() {
            self.windows.get(&parent).and_then(|w| w.first_child)
        } else {
            None
        }
    }

    /// Topmost real child of `parent`.
    pub(crate) fn first_real_child(&self, parent: WindowId) -> Option<WindowId> {
        match self.real_child_head(parent) {
            Some(head) => self.windows.get(&head).and_then(|w| w.next_sib),
            None => self.windows.get(&parent).and_then(|w| w.first_child),
        }
    }

    fn link_at_head(&mut self, id: WindowId, parent: WindowId) {
        let next = self.first_real_child(parent);
        self.link_above(id, parent, next);
    }

    /// Insert `id` into `parent`'s sibling list directly above `next`, or at
    /// the bottom when `next` is None.
    pub(crate) fn link_above(&mut self, id: WindowId, parent: WindowId, next: Option<WindowId>) {
        let prev = match next {
            Some(n) => self.windows.get(&n).and_then(|w| w.prev_sib),
            None => self.windows.get(&parent).and_then(|w| w.last_child),
        };

        if let Some(win) = self.windows.get_mut(&id) {
            win.prev_sib = prev;
            win.next_sib = next;
        }
        match prev {
            Some(p) => {
                if let Some(w) = self.windows.get_mut(&p) {
                    w.next_sib = Some(id);
                }
            }
            None => {
                if let Some(w) = self.windows.get_mut(&parent) {
                    w.first_child = Some(id);
                }
            }
        }
        match next {
            Some(n) => {
                if let Some(w) = self.windows.get_mut(&n) {
                    w.prev_sib = Some(id);
                }
            }
            None => {
                if let Some(w) = self.windows.get_mut(&parent) {
                    w.last_child = Some(id);
                }
            }
        }
    }

    /// Remove `id` from its parent's sibling list. The window keeps its
    /// parent pointer.
    pub(crate) fn unlink(&mut self, id: WindowId) {
        let Some((parent, prev, next)) = self
            .windows
            .get(&id)
            .map(|w| (w.parent, w.prev_sib, w.next_sib))
        else {
            return;
        };
        let Some(parent) = parent else {
            return;
        };

        match prev {
            Some(p) => {
                if let Some(w) = self.windows.get_mut(&p) {
                    w.next_sib = next;
                }
            }
            None => {
                if let Some(w) = self.windows.get_mut(&parent) {
                    w.first_child = next;
                }
            }
        }
        match next {
            Some(n) => {
                if let Some(w) = self.windows.get_mut(&n) {
                    w.prev_sib = prev;
                }
            }
            None => {
                if let Some(w) = self.windows.get_mut(&parent) {
                    w.last_child = prev;
                }
            }
        }
        if let Some(win) = self.windows.get_mut(&id) {
            win.prev_sib = None;
            win.next_sib = None;
        }
    }

    /// Pre-order walk from `start`: a window before its children, the top
    /// sibling first. Children are read after the visit, so the visitor may
    /// change the window it is handed. Returns false if stopped.
    pub(crate) fn walk_tree<F>(&mut self, start: WindowId, mut visit: F) -> bool
    where
        F: FnMut(&mut Screen, WindowId) -> Walk,
    {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            match visit(self, id) {
                Walk::Stop => return false,
                Walk::Skip => {}
                Walk::Children => stack.extend(self.children(id).into_iter().rev()),
            }
        }
        true
    }

    /// `start` and its inferiors in walk order.
    pub(crate) fn pre_order(&self, start: WindowId) -> Vec<WindowId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).into_iter().rev());
        }
        out
    }

    /// Inferiors of `start`, each before its parent, top sibling first.
    pub(crate) fn post_order(&self, start: WindowId) -> Vec<WindowId> {
        let mut out = Vec::new();
        let mut stack: Vec<(WindowId, bool)> =
            self.children(start).into_iter().rev().map(|c| (c, false)).collect();
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                out.push(id);
            } else {
                stack.push((id, true));
                stack.extend(self.children(id).into_iter().rev().map(|c| (c, false)));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dix::test_support::{mapped_window, screen, simple_window, CLIENT};

    #[test]
    fn test_create_inserts_on_top() {
        let (mut scr, log) = screen();
        let root = scr.root().unwrap();
        scr.select_input(root, CLIENT, EventMask::SUBSTRUCTURE_NOTIFY).unwrap();

        let a = simple_window(&mut scr, root, 0x100, 10, 10, 100, 100);
        let b = simple_window(&mut scr, root, 0x101, 50, 50, 100, 100);

        assert_eq!(scr.children(root), vec![b, a]);
        assert_eq!(scr.query_tree(root).unwrap().children, vec![a, b]);
        let events = log.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::CreateNotify { window: 0x100, parent, .. } if parent == root));
    }

    #[test]
    fn test_create_validation() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let attrs = WindowAttributes::new();

        let zero = scr.create_window(CLIENT, 0, 0x100, root, 0, 0, 0, 10, 0, WindowClass::InputOutput, 0, &attrs);
        assert_eq!(zero, Err(WindowError::InvalidValue(0)));

        let bordered_input_only =
            scr.create_window(CLIENT, 0, 0x100, root, 0, 0, 10, 10, 1, WindowClass::InputOnly, 0, &attrs);
        assert!(matches!(bordered_input_only, Err(WindowError::InvalidMatch(_))));

        let io = scr.create_window(CLIENT, 0, 0x101, root, 0, 0, 10, 10, 0, WindowClass::InputOnly, 0, &attrs).unwrap();
        let child = scr.create_window(CLIENT, 0, 0x102, io, 0, 0, 5, 5, 0, WindowClass::InputOutput, 0, &attrs);
        assert!(matches!(child, Err(WindowError::InvalidMatch(_))));

        let deep = scr.create_window(CLIENT, 32, 0x103, root, 0, 0, 5, 5, 0, WindowClass::InputOutput, 0x23, &attrs);
        assert!(matches!(deep, Err(WindowError::InvalidMatch(_))));

        let dup = scr.create_window(CLIENT, 0, 0x101, root, 0, 0, 5, 5, 0, WindowClass::InputOutput, 0, &attrs);
        assert_eq!(dup, Err(WindowError::IdInUse(0x101)));
        assert_eq!(scr.children(root), vec![io]);
    }

    #[test]
    fn test_create_with_own_visual() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let attrs = WindowAttributes::new().border_pixel(0).colormap(0x40);

        let argb = scr
            .create_window(CLIENT, 32, 0x100, root, 0, 0, 5, 5, 0, WindowClass::InputOutput, 0x23, &attrs)
            .unwrap();
        assert_eq!(scr.w_visual(argb), 0x23);
        assert_eq!(scr.w_colormap(argb), 0x40);
        assert_eq!(scr.get(argb).unwrap().depth, 32);
    }

    #[test]
    fn test_create_then_destroy_restores_children() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let a = simple_window(&mut scr, root, 0x100, 0, 0, 10, 10);
        let b = simple_window(&mut scr, root, 0x101, 0, 0, 10, 10);
        let before = scr.children(root);

        let c = simple_window(&mut scr, root, 0x102, 0, 0, 10, 10);
        scr.destroy_window(c).unwrap();

        assert_eq!(scr.children(root), before);
        assert_eq!(before, vec![b, a]);
        assert!(!scr.contains(c));
    }

    #[test]
    fn test_destroy_notifies_children_first() {
        let (mut scr, log) = screen();
        let root = scr.root().unwrap();
        let a = mapped_window(&mut scr, root, 0x100, 0, 0, 100, 100);
        let c1 = mapped_window(&mut scr, a, 0x101, 0, 0, 10, 10);
        let c2 = mapped_window(&mut scr, a, 0x102, 20, 0, 10, 10);
        let g = mapped_window(&mut scr, c1, 0x103, 0, 0, 5, 5);
        scr.select_input(root, CLIENT, EventMask::SUBSTRUCTURE_NOTIFY).unwrap();
        for w in [a, c1, c2, g] {
            scr.select_input(w, CLIENT, EventMask::STRUCTURE_NOTIFY).unwrap();
        }
        log.clear();

        scr.destroy_window(a).unwrap();

        let destroyed: Vec<WindowId> = log
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::DestroyNotify { window } => Some(window),
                _ => None,
            })
            .collect();
        let mut unique = destroyed.clone();
        unique.dedup();
        assert_eq!(unique, vec![c2, g, c1, a]);
        assert_eq!(scr.window_count(), 1);
        assert!(scr.children(root).is_empty());
    }

    #[test]
    fn test_destroying_root_is_ignored_but_free_tears_down() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        simple_window(&mut scr, root, 0x100, 0, 0, 10, 10);

        scr.destroy_window(root).unwrap();
        assert_eq!(scr.root(), Some(root));

        scr.free_window(root).unwrap();
        assert_eq!(scr.root(), None);
        assert_eq!(scr.window_count(), 0);
    }

    #[test]
    fn test_reparent_into_descendant_is_rejected() {
        let (mut scr, log) = screen();
        let root = scr.root().unwrap();
        let a = mapped_window(&mut scr, root, 0x100, 0, 0, 100, 100);
        let b = mapped_window(&mut scr, a, 0x101, 0, 0, 50, 50);
        let c = mapped_window(&mut scr, b, 0x102, 0, 0, 10, 10);
        log.clear();

        assert!(matches!(scr.reparent_window(a, c, 0, 0, CLIENT), Err(WindowError::InvalidMatch(_))));
        assert!(matches!(scr.reparent_window(a, a, 0, 0, CLIENT), Err(WindowError::InvalidMatch(_))));
        assert!(matches!(scr.reparent_window(root, a, 0, 0, CLIENT), Err(WindowError::InvalidMatch(_))));
        assert_eq!(scr.children(a), vec![b]);
        assert_eq!(scr.get(c).unwrap().parent, Some(b));
        assert!(log.is_empty());
    }

    #[test]
    fn test_reparent_moves_subtree_and_remaps() {
        let (mut scr, log) = screen();
        let root = scr.root().unwrap();
        let a = mapped_window(&mut scr, root, 0x100, 100, 100, 200, 200);
        let b = mapped_window(&mut scr, root, 0x101, 400, 400, 100, 100);
        let g = mapped_window(&mut scr, b, 0x102, 10, 10, 20, 20);
        scr.select_input(b, CLIENT, EventMask::STRUCTURE_NOTIFY).unwrap();
        scr.select_input(root, CLIENT, EventMask::SUBSTRUCTURE_NOTIFY).unwrap();
        scr.select_input(a, CLIENT, EventMask::SUBSTRUCTURE_NOTIFY).unwrap();
        log.clear();

        scr.reparent_window(b, a, 5, 5, CLIENT).unwrap();

        assert_eq!(scr.get(b).unwrap().parent, Some(a));
        assert_eq!(scr.children(a), vec![b]);
        let bw = scr.get(b).unwrap();
        assert_eq!((bw.drawable.x, bw.drawable.y), (105, 105));
        assert!(bw.viewable);
        let gw = scr.get(g).unwrap();
        assert_eq!((gw.drawable.x, gw.drawable.y), (115, 115));
        assert!(gw.viewable);

        let reparents = log
            .take()
            .into_iter()
            .filter(|d| matches!(d.event, Event::ReparentNotify { .. }))
            .map(|d| d.window)
            .collect::<Vec<_>>();
        assert_eq!(reparents, vec![b, root, a]);
    }

    #[test]
    fn test_walk_orders() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let a = simple_window(&mut scr, root, 0x100, 0, 0, 10, 10);
        let a1 = simple_window(&mut scr, a, 0x101, 0, 0, 5, 5);
        let b = simple_window(&mut scr, root, 0x102, 0, 0, 10, 10);

        assert_eq!(scr.pre_order(root), vec![root, b, a, a1]);
        assert_eq!(scr.post_order(root), vec![b, a1, a]);

        let mut seen = Vec::new();
        let finished = scr.walk_tree(root, |_, id| {
            seen.push(id);
            if id == a { Walk::Stop } else { Walk::Children }
        });
        assert!(!finished);
        assert_eq!(seen, vec![root, b, a]);
    }
}
