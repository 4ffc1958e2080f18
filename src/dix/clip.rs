//! Clip engine
//!
//! Derives each window's declared area (`win_size`, `border_size`) from its
//! geometry, ancestors and shapes, and recomputes visible areas
//! (`clip_list`, `border_clip`) after the tree changes. Newly exposed area is
//! collected in the pending-transition marks and handed out afterwards by
//! `handle_exposures`.

use area_region::{RectIn, Region};
use tracing::trace;

use crate::dix::backend::ValidateKind;
use crate::dix::events::Event;
use crate::dix::flags::EventMask;
use crate::dix::window::ValidateMark;
use crate::dix::Screen;
use crate::shared::{Gravity, Visibility, WindowClass, WindowId};

/// Where a corner ends up when its parent grows by `dw`, `dh`.
///
/// `old_x`, `old_y` is the corner before the parent moved and is what
/// Static gravity keeps.
pub fn gravity_translate(
    x: i32,
    y: i32,
    old_x: i32,
    old_y: i32,
    dw: i32,
    dh: i32,
    gravity: Gravity,
) -> (i32, i32) {
    match gravity {
        Gravity::North => (x + dw / 2, y),
        Gravity::NorthEast => (x + dw, y),
        Gravity::West => (x, y + dh / 2),
        Gravity::Center => (x + dw / 2, y + dh / 2),
        Gravity::East => (x + dw, y + dh / 2),
        Gravity::SouthWest => (x, y + dh),
        Gravity::South => (x + dw / 2, y + dh),
        Gravity::SouthEast => (x + dw, y + dh),
        Gravity::Static => (old_x, old_y),
        Gravity::Forget | Gravity::NorthWest => (x, y),
    }
}

impl Screen {
    /// Recompute the inside area: the window box clipped to the parent's
    /// inside area and to the bounding and clip shapes.
    pub(crate) fn set_win_size(&mut self, id: WindowId) {
        let Some(win) = self.windows.get(&id) else {
            return;
        };
        let rect = win.drawable.to_rect();
        let parent_size = win
            .parent
            .filter(|_| !win.redirect_draw)
            .and_then(|p| self.windows.get(&p))
            .map(|p| &p.win_size);

        let mut size = match parent_size {
            Some(parent_size) => parent_size.intersect_rect(&rect),
            None => Region::from_rect(rect),
        };
        let (x, y) = (win.drawable.x, win.drawable.y);
        if let Some(shape) = win.bounding_shape() {
            size = size.intersect(&shape.translated(x, y));
        }
        if let Some(shape) = win.clip_shape() {
            size = size.intersect(&shape.translated(x, y));
        }

        if let Some(win) = self.windows.get_mut(&id) {
            win.win_size = size;
        }
    }

    /// Recompute the area including the border. Without a border it is the
    /// inside area.
    pub(crate) fn set_border_size(&mut self, id: WindowId) {
        let Some(win) = self.windows.get(&id) else {
            return;
        };
        let size = if win.has_border() {
            let rect = win.extents();
            let parent_size = win
                .parent
                .filter(|_| !win.redirect_draw)
                .and_then(|p| self.windows.get(&p))
                .map(|p| &p.win_size);
            let mut size = match parent_size {
                Some(parent_size) => parent_size.intersect_rect(&rect),
                None => Region::from_rect(rect),
            };
            if let Some(shape) = win.bounding_shape() {
                size = size
                    .intersect(&shape.translated(win.drawable.x, win.drawable.y))
                    .union(&win.win_size);
            }
            size
        } else {
            win.win_size.clone()
        };

        if let Some(win) = self.windows.get_mut(&id) {
            win.border_size = size;
        }
    }

    /// Children follow a parent that moved by `dx`, `dy` and grew by `dw`,
    /// `dh`: gravity is applied to the direct children, and absolute
    /// positions and areas are recomputed for every inferior.
    pub(crate) fn resize_children_win_size(&mut self, id: WindowId, dx: i32, dy: i32, dw: i32, dh: i32) {
        let Some((px, py)) = self.windows.get(&id).map(|w| (w.drawable.x, w.drawable.y)) else {
            return;
        };
        let resized = dw != 0 || dh != 0;

        for child in self.children(id) {
            let Some(cwin) = self.windows.get(&child) else {
                continue;
            };
            let (ox, oy) = cwin.origin;
            let gravity = cwin.win_gravity;
            let bw = cwin.border_width as i32;

            if resized && gravity > Gravity::NorthWest {
                let (nx, ny) = gravity_translate(ox, oy, ox - dx, oy - dy, dw, dh, gravity);
                if (nx, ny) != (ox, oy) {
                    let event = Event::GravityNotify {
                        window: child,
                        x: nx - bw,
                        y: ny - bw,
                    };
                    self.deliver_structure(child, &event, None);
                    if let Some(cwin) = self.windows.get_mut(&child) {
                        cwin.origin = (nx, ny);
                    }
                }
            }
            self.reposition(child, px, py);
        }
    }

    /// Recompute the absolute position and areas of `id` and its inferiors
    /// from their origins, below a parent whose inside corner is `px`, `py`.
    fn reposition(&mut self, id: WindowId, px: i32, py: i32) {
        let mut stack = vec![(id, px, py)];
        while let Some((wid, px, py)) = stack.pop() {
            let Some(win) = self.windows.get_mut(&wid) else {
                continue;
            };
            win.drawable.x = px + win.origin.0;
            win.drawable.y = py + win.origin.1;
            let corner = (win.drawable.x, win.drawable.y);

            self.set_win_size(wid);
            self.set_border_size(wid);
            if let Some(win) = self.windows.get(&wid) {
                self.backend.position_window(win);
            }
            stack.extend(
                self.children(wid)
                    .into_iter()
                    .rev()
                    .map(|c| (c, corner.0, corner.1)),
            );
        }
    }

    /// Attach a pending-transition mark recording the current corner.
    pub(crate) fn mark_window(&mut self, id: WindowId) {
        if let Some(win) = self.windows.get_mut(&id) {
            if win.mark.is_none() {
                win.mark = Some(ValidateMark {
                    old_corner: (win.drawable.x, win.drawable.y),
                    ..ValidateMark::default()
                });
            }
        }
    }

    /// Mark the window and its viewable inferiors before a change that
    /// moves them.
    pub(crate) fn mark_subtree(&mut self, id: WindowId) {
        self.mark_window(id);
        for wid in self.pre_order(id) {
            if self.windows.get(&wid).is_some_and(|w| w.viewable) {
                self.mark_window(wid);
            }
        }
    }

    pub(crate) fn mark_mut(&mut self, id: WindowId) -> Option<&mut ValidateMark> {
        self.mark_window(id);
        self.windows.get_mut(&id)?.mark.as_mut()
    }

    /// Recompute clips below `parent` for `first` and every sibling under
    /// it, then the parent's own clip list.
    ///
    /// Windows above `first` keep their clips. The space redistributed is
    /// the parent's current clip plus the old border clips of the changed
    /// siblings.
    pub(crate) fn validate_tree(&mut self, parent: WindowId, first: Option<WindowId>, kind: ValidateKind) {
        let Some(pwin) = self.windows.get(&parent) else {
            return;
        };
        let old_parent_clip = pwin.clip_list.clone();
        let mut cur = first.or(pwin.first_child);
        let mut changed = Vec::new();
        while let Some(id) = cur {
            changed.push(id);
            cur = self.windows.get(&id).and_then(|w| w.next_sib);
        }
        trace!("Validating 0x{:x} from {:?} ({:?})", parent, first, kind);

        let mut total = old_parent_clip.clone();
        for &id in &changed {
            if let Some(win) = self.windows.get(&id) {
                total = total.union(&win.border_clip);
            }
        }
        self.mark_window(parent);

        for &id in &changed {
            let Some(win) = self.windows.get(&id) else {
                continue;
            };
            if win.viewable {
                let border_size = win.border_size.clone();
                self.mark_window(id);
                self.compute_clips(id, total.intersect(&border_size), kind);
                total = total.subtract(&border_size);
            } else {
                self.clear_clips(id);
            }
        }

        let exposed = total.subtract(&old_parent_clip);
        if let Some(pwin) = self.windows.get_mut(&parent) {
            pwin.clip_list = total;
            if let Some(mark) = pwin.mark.as_mut() {
                mark.exposed = mark.exposed.union(&exposed);
            }
            self.backend.clip_notify(pwin, 0, 0);
        }
    }

    fn clear_clips(&mut self, id: WindowId) {
        if let Some(win) = self.windows.get_mut(&id) {
            win.mark = None;
            if !win.clip_list.is_empty() || !win.border_clip.is_empty() {
                win.clip_list.clear();
                win.border_clip.clear();
                self.backend.clip_notify(win, 0, 0);
            }
        }
    }

    /// Visible areas of `id` and its viewable inferiors, given that
    /// `universe` is what the window may occupy.
    fn compute_clips(&mut self, id: WindowId, mut universe: Region, kind: ValidateKind) {
        let Some(win) = self.windows.get(&id) else {
            return;
        };
        if win.redirect_draw {
            universe = win.border_size.clone();
        }

        let old_vis = win.visibility;
        let new_vis = match universe.contains_rect(&win.extents()) {
            RectIn::In => Visibility::Unobscured,
            RectIn::Partial if win.is_shaped() => {
                let bounding = win.bounding_region();
                if bounding.is_subset_of(&universe) {
                    Visibility::Unobscured
                } else if !universe.intersects(&bounding) {
                    Visibility::FullyObscured
                } else {
                    Visibility::PartiallyObscured
                }
            }
            RectIn::Partial => Visibility::PartiallyObscured,
            RectIn::Out => Visibility::FullyObscured,
        };
        let (dx, dy) = win
            .mark
            .as_ref()
            .map(|m| (win.drawable.x - m.old_corner.0, win.drawable.y - m.old_corner.1))
            .unwrap_or((0, 0));
        self.set_visibility(id, new_vis);

        if kind == ValidateKind::Move
            && old_vis == new_vis
            && matches!(old_vis, Visibility::Unobscured | Visibility::FullyObscured)
        {
            self.translate_clips(id, dx, dy);
            return;
        }

        let Some(win) = self.windows.get_mut(&id) else {
            return;
        };
        win.border_clip.translate(dx, dy);
        win.clip_list.translate(dx, dy);
        let mark = win.mark.take().unwrap_or_default();

        let mut border_exposed = Region::new();
        if win.has_border() {
            let old_visible = mark.border_visible.clone().unwrap_or_else(|| win.border_clip.clone());
            border_exposed = universe.subtract(&old_visible).subtract(&win.win_size);
            win.border_clip = universe.clone();
            universe = universe.intersect(&win.win_size);
        } else {
            win.border_clip = universe.clone();
        }
        let mapped = win.mapped;
        win.mark = Some(mark);

        if mapped {
            for child in self.children(id) {
                let Some(cwin) = self.windows.get(&child) else {
                    continue;
                };
                if !cwin.viewable {
                    continue;
                }
                let border_size = cwin.border_size.clone();
                self.mark_window(child);
                self.compute_clips(child, universe.intersect(&border_size), kind);
                universe = universe.subtract(&border_size);
            }
        }

        let Some(win) = self.windows.get_mut(&id) else {
            return;
        };
        let resized = win.mark.as_ref().is_some_and(|m| m.resized);
        let exposed = if matches!(old_vis, Visibility::FullyObscured | Visibility::NotViewable)
            || (resized && win.bit_gravity == Gravity::Forget)
        {
            universe.clone()
        } else if !matches!(new_vis, Visibility::FullyObscured | Visibility::NotViewable) {
            universe.subtract(&win.clip_list)
        } else {
            Region::new()
        };
        win.clip_list = universe;
        if let Some(mark) = win.mark.as_mut() {
            mark.exposed = exposed;
            mark.border_exposed = border_exposed;
            mark.border_visible = None;
        }
        self.backend.clip_notify(win, dx, dy);
    }

    /// Move fast path: the window kept its visibility, so its clips and
    /// those of its inferiors only shift.
    fn translate_clips(&mut self, id: WindowId, dx: i32, dy: i32) {
        let mut stack = vec![id];
        while let Some(wid) = stack.pop() {
            let Some(win) = self.windows.get_mut(&wid) else {
                continue;
            };
            if !win.viewable {
                continue;
            }
            if win.visibility != Visibility::FullyObscured {
                win.border_clip.translate(dx, dy);
                win.clip_list.translate(dx, dy);
                self.backend.clip_notify(win, dx, dy);
            }
            if let Some(mark) = win.mark.as_mut() {
                mark.exposed.clear();
                mark.border_exposed.clear();
                mark.border_visible = None;
            }
            stack.extend(self.children(wid));
        }
    }

    pub(crate) fn set_visibility(&mut self, id: WindowId, state: Visibility) {
        let Some(win) = self.windows.get_mut(&id) else {
            return;
        };
        if win.visibility == state {
            return;
        }
        win.visibility = state;
        if state != Visibility::NotViewable {
            self.deliver_to(id, &Event::VisibilityNotify { window: id, state }, EventMask::VISIBILITY_CHANGE);
        }
    }

    /// Hand collected exposures to the backend and to Expose subscribers,
    /// clearing every mark under `start`.
    pub(crate) fn handle_exposures(&mut self, start: WindowId) {
        for id in self.pre_order(start) {
            let Some(win) = self.windows.get_mut(&id) else {
                continue;
            };
            let Some(mark) = win.mark.take() else {
                continue;
            };
            if !mark.border_exposed.is_empty() {
                self.backend.paint_border(win, &mark.border_exposed);
            }
            if !mark.exposed.is_empty() {
                let exposed = mark.exposed.intersect(&win.clip_list);
                if !exposed.is_empty() {
                    self.backend.window_exposures(win, &exposed);
                    self.send_exposures(id, &exposed);
                }
            }
        }
    }

    /// One Expose per box, relative to the inside corner; `count` is the
    /// number of boxes still to come.
    fn send_exposures(&mut self, id: WindowId, exposed: &Region) {
        let Some(win) = self.windows.get(&id) else {
            return;
        };
        if win.class != WindowClass::InputOutput
            || !self.event_masks(id).contains(EventMask::EXPOSURE)
        {
            return;
        }
        let (ox, oy) = (win.drawable.x, win.drawable.y);
        let rects = exposed.rects().to_vec();
        let total = rects.len() as u32;
        for (i, r) in rects.iter().enumerate() {
            let event = Event::Expose {
                window: id,
                x: r.x1 - ox,
                y: r.y1 - oy,
                width: r.width() as u32,
                height: r.height() as u32,
                count: total - 1 - i as u32,
            };
            self.deliver_to(id, &event, EventMask::EXPOSURE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dix::attributes::WindowAttributes;
    use crate::dix::test_support::{mapped_window, screen, simple_window, CLIENT};
    use crate::dix::ConfigureValues;
    use crate::shared::ShapeKind;
    use area_region::Rect;

    #[test]
    fn test_gravity_translate() {
        assert_eq!(gravity_translate(10, 10, 0, 0, 20, 40, Gravity::SouthEast), (30, 50));
        assert_eq!(gravity_translate(10, 10, 0, 0, 20, 40, Gravity::Center), (20, 30));
        assert_eq!(gravity_translate(10, 10, 3, 4, 20, 40, Gravity::Static), (3, 4));
        assert_eq!(gravity_translate(10, 10, 3, 4, 20, 40, Gravity::NorthWest), (10, 10));
    }

    #[test]
    fn test_win_size_clipped_by_parent() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let a = simple_window(&mut scr, root, 0x100, 0, 0, 100, 100);
        let attrs = WindowAttributes::new();
        let b = scr
            .create_window(CLIENT, 0, 0x101, a, 80, 80, 50, 50, 2, WindowClass::InputOutput, 0, &attrs)
            .unwrap();

        let bw = scr.get(b).unwrap();
        assert_eq!(bw.win_size, Region::from_rect(Rect::new(82, 82, 100, 100)));
        assert_eq!(bw.border_size, Region::from_rect(Rect::new(80, 80, 100, 100)));
    }

    #[test]
    fn test_border_size_with_border() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let attrs = WindowAttributes::new();
        let a = scr
            .create_window(CLIENT, 0, 0x100, root, 10, 10, 100, 50, 3, WindowClass::InputOutput, 0, &attrs)
            .unwrap();

        let w = scr.get(a).unwrap();
        assert_eq!(w.win_size.extents(), Rect::new(13, 13, 113, 63));
        assert_eq!(w.border_size.extents(), Rect::new(10, 10, 116, 66));
        assert!(w.win_size.is_subset_of(&w.border_size));
    }

    #[test]
    fn test_overlapping_siblings_clip() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let a = mapped_window(&mut scr, root, 0x100, 10, 10, 100, 100);
        let b = mapped_window(&mut scr, root, 0x101, 50, 50, 100, 100);

        let aw = scr.get(a).unwrap();
        let expected = Region::from_rect(Rect::new(10, 10, 110, 110)).subtract_rect(&Rect::new(50, 50, 110, 110));
        assert_eq!(aw.clip_list, expected);
        assert_eq!(aw.visibility, Visibility::PartiallyObscured);
        let bw = scr.get(b).unwrap();
        assert_eq!(bw.clip_list, Region::from_rect(Rect::new(50, 50, 150, 150)));
        assert_eq!(bw.visibility, Visibility::Unobscured);

        let rw = scr.get(root).unwrap();
        assert!(!rw.clip_list.contains_point(60, 60));
        assert!(rw.clip_list.contains_point(5, 5));
        assert_eq!(rw.clip_list.area(), 1024 * 768 - aw.border_size.union(&bw.border_size).area());
    }

    #[test]
    fn test_map_sends_expose() {
        let (mut scr, log) = screen();
        let root = scr.root().unwrap();
        let a = simple_window(&mut scr, root, 0x100, 10, 10, 100, 100);
        scr.select_input(a, CLIENT, EventMask::EXPOSURE | EventMask::VISIBILITY_CHANGE).unwrap();
        log.clear();

        scr.map_window(a, CLIENT).unwrap();

        let events = log.events();
        assert!(events.contains(&Event::VisibilityNotify { window: a, state: Visibility::Unobscured }));
        assert!(events.contains(&Event::Expose { window: a, x: 0, y: 0, width: 100, height: 100, count: 0 }));
        assert!(scr.windows.values().all(|w| w.mark.is_none()));
    }

    #[test]
    fn test_unmap_exposes_window_below() {
        let (mut scr, log) = screen();
        let root = scr.root().unwrap();
        let a = mapped_window(&mut scr, root, 0x100, 10, 10, 100, 100);
        let b = mapped_window(&mut scr, root, 0x101, 50, 50, 100, 100);
        scr.select_input(a, CLIENT, EventMask::EXPOSURE).unwrap();
        log.clear();

        scr.unmap_window(b).unwrap();

        let exposed: Vec<Event> = log
            .events()
            .into_iter()
            .filter(|e| matches!(e, Event::Expose { .. }))
            .collect();
        let area: u32 = exposed
            .iter()
            .map(|e| match e {
                Event::Expose { width, height, .. } => width * height,
                _ => 0,
            })
            .sum();
        assert_eq!(area, 60 * 60);
        assert!(matches!(exposed.last(), Some(Event::Expose { count: 0, .. })));
        assert_eq!(scr.get(a).unwrap().clip_list, Region::from_rect(Rect::new(10, 10, 110, 110)));
        assert!(scr.get(b).unwrap().clip_list.is_empty());
    }

    #[test]
    fn test_clip_lists_stay_inside_border_size() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let a = mapped_window(&mut scr, root, 0x100, 0, 0, 300, 300);
        mapped_window(&mut scr, a, 0x101, 250, 250, 100, 100);
        mapped_window(&mut scr, a, 0x102, -20, 40, 100, 100);
        mapped_window(&mut scr, root, 0x103, 100, 100, 300, 300);

        for win in scr.windows.values() {
            assert!(win.clip_list.is_subset_of(&win.border_size), "0x{:x}", win.id);
            assert!(win.border_clip.is_subset_of(&win.border_size), "0x{:x}", win.id);
        }
    }

    /// Shaped window at `x`, `y` on the root with one mapped child.
    fn shaped_on_root(scr: &mut Screen, x: i32, y: i32) -> (WindowId, WindowId) {
        let root = scr.root().unwrap();
        let w = simple_window(scr, root, 0x100, x, y, 100, 100);
        let shape = Region::from_rects([Rect::new(0, 0, 60, 100), Rect::new(60, 20, 100, 60)]);
        scr.set_shape(w, ShapeKind::Bounding, Some(shape)).unwrap();
        let c = mapped_window(scr, w, 0x101, 10, 5, 30, 30);
        scr.map_window(w, CLIENT).unwrap();
        (w, c)
    }

    #[test]
    fn test_move_shaped_window_hanging_off_parent() {
        let (mut scr, _log) = screen();
        let root = scr.root().unwrap();
        let (w, c) = shaped_on_root(&mut scr, 100, -20);
        assert_eq!(scr.get(w).unwrap().visibility, Visibility::PartiallyObscured);
        assert_eq!(scr.get(c).unwrap().clip_list, Region::from_rect(Rect::new(110, 0, 140, 15)));

        scr.configure_window(w, &ConfigureValues::new().x(150).y(-10), CLIENT).unwrap();

        let (mut fresh, _log) = screen();
        shaped_on_root(&mut fresh, 150, -10);
        for id in [root, w, c] {
            let (moved, built) = (scr.get(id).unwrap(), fresh.get(id).unwrap());
            assert_eq!(moved.border_clip, built.border_clip, "0x{:x}", id);
            assert_eq!(moved.clip_list, built.clip_list, "0x{:x}", id);
        }
        assert_eq!(scr.get(c).unwrap().border_clip, Region::from_rect(Rect::new(160, 0, 190, 25)));
    }
}
