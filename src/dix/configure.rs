//! Configure and circulate
//!
//! Geometry and stacking changes. A request is validated, offered to the
//! redirecting client, checked for being a no-op, announced with
//! ConfigureNotify and then applied as a move, resize, border change or
//! plain restack.

use area_region::Rect;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dix::backend::ValidateKind;
use crate::dix::events::Event;
use crate::dix::flags::{ConfigMask, EventMask};
use crate::dix::Screen;
use crate::error::{Result, WindowError};
use crate::shared::{Circulate, ClientId, Gravity, Place, StackMode, WindowClass, WindowId};

/// Values of a configure request; absent fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigureValues {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub border_width: Option<u32>,
    pub sibling: Option<WindowId>,
    pub stack_mode: Option<StackMode>,
}

impl ConfigureValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x(mut self, x: i32) -> Self {
        self.x = Some(x);
        self
    }

    pub fn y(mut self, y: i32) -> Self {
        self.y = Some(y);
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn border_width(mut self, border_width: u32) -> Self {
        self.border_width = Some(border_width);
        self
    }

    pub fn sibling(mut self, sibling: WindowId) -> Self {
        self.sibling = Some(sibling);
        self
    }

    pub fn stack_mode(mut self, stack_mode: StackMode) -> Self {
        self.stack_mode = Some(stack_mode);
        self
    }

    pub fn value_mask(&self) -> ConfigMask {
        let mut mask = ConfigMask::empty();
        mask.set(ConfigMask::X, self.x.is_some());
        mask.set(ConfigMask::Y, self.y.is_some());
        mask.set(ConfigMask::WIDTH, self.width.is_some());
        mask.set(ConfigMask::HEIGHT, self.height.is_some());
        mask.set(ConfigMask::BORDER_WIDTH, self.border_width.is_some());
        mask.set(ConfigMask::SIBLING, self.sibling.is_some());
        mask.set(ConfigMask::STACK_MODE, self.stack_mode.is_some());
        mask
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Restack,
    Move,
    Resize,
    Reborder,
}

impl Screen {
    /// Configure a window on behalf of `client`.
    pub fn configure_window(&mut self, id: WindowId, values: &ConfigureValues, client: ClientId) -> Result<()> {
        let win = self.get(id)?;
        let mask = values.value_mask();

        if win.class == WindowClass::InputOnly && mask.contains(ConfigMask::BORDER_WIDTH) {
            return Err(WindowError::InvalidMatch("InputOnly windows have no border"));
        }
        if mask.contains(ConfigMask::SIBLING) && !mask.contains(ConfigMask::STACK_MODE) {
            return Err(WindowError::InvalidMatch("sibling given without a stack mode"));
        }

        let parent = win.parent;
        let old_bw = win.border_width;
        let (cur_w, cur_h) = (win.drawable.width, win.drawable.height);
        let (before_x, before_y) = win.position();
        let override_redirect = win.override_redirect;
        let old_next = win.next_sib;

        let (mut x, mut y, mut w, mut h) = (before_x, before_y, cur_w, cur_h);
        let mut action = Action::Restack;
        if mask.intersects(ConfigMask::position()) && !mask.intersects(ConfigMask::size()) {
            x = values.x.unwrap_or(x);
            y = values.y.unwrap_or(y);
            action = Action::Move;
        } else if mask.intersects(ConfigMask::position() | ConfigMask::size()) {
            x = values.x.unwrap_or(x);
            y = values.y.unwrap_or(y);
            w = values.width.unwrap_or(w);
            h = values.height.unwrap_or(h);
            if w == 0 || h == 0 {
                return Err(WindowError::InvalidValue(0));
            }
            action = Action::Resize;
        }
        let bw = values.border_width.unwrap_or(old_bw);

        if let Some(sib) = values.sibling {
            let swin = self.get(sib)?;
            if swin.parent != parent || sib == id {
                return Err(WindowError::InvalidMatch("stacking sibling is not a sibling"));
            }
        }
        let mode = values.stack_mode.unwrap_or(StackMode::Above);

        // The root can't be reconfigured.
        let Some(parent) = parent else {
            return Ok(());
        };
        let (px, py) = {
            let pwin = self.get(parent)?;
            (pwin.drawable.x, pwin.drawable.y)
        };

        let next = if mask.contains(ConfigMask::STACK_MODE) {
            let outer = Rect::from_xywh(px + x, py + y, w + 2 * bw, h + 2 * bw);
            self.place(id, values.sibling, mode, outer)
        } else {
            old_next
        };

        if !override_redirect && !mask.is_empty() {
            let request = Event::ConfigureRequest {
                parent,
                window: id,
                sibling: values.sibling,
                x,
                y,
                width: w,
                height: h,
                border_width: bw,
                stack_mode: mode,
                value_mask: mask.bits(),
            };
            if self.maybe_redirect(parent, &request, client) {
                debug!("Configure of 0x{:x} redirected to the manager of 0x{:x}", id, parent);
                return Ok(());
            }
        }

        if action == Action::Resize {
            let mut size_change = w != cur_w || h != cur_h;
            if size_change
                && self
                    .selecting_client(id, EventMask::RESIZE_REDIRECT)
                    .is_some_and(|holder| holder != client)
            {
                let request = Event::ResizeRequest { window: id, width: w, height: h };
                self.sink.deliver(id, &request, EventMask::RESIZE_REDIRECT);
                debug!("Resize of 0x{:x} redirected", id);
                w = cur_w;
                h = cur_h;
                size_change = false;
            }
            if !size_change {
                if mask.intersects(ConfigMask::position()) {
                    action = Action::Move;
                } else if mask.intersects(ConfigMask::STACK_MODE | ConfigMask::BORDER_WIDTH) {
                    action = Action::Restack;
                } else {
                    return Ok(());
                }
            }
        }

        let changed = action == Action::Resize
            || (mask.contains(ConfigMask::X) && x != before_x)
            || (mask.contains(ConfigMask::Y) && y != before_y)
            || (mask.contains(ConfigMask::BORDER_WIDTH) && bw != old_bw)
            || (mask.contains(ConfigMask::STACK_MODE) && next != old_next);
        if !changed {
            return Ok(());
        }

        let notify = Event::ConfigureNotify {
            window: id,
            above_sibling: next,
            x,
            y,
            width: w,
            height: h,
            border_width: bw,
            override_redirect,
        };
        self.deliver_structure(id, &notify, None);

        if mask.contains(ConfigMask::BORDER_WIDTH) {
            let keeps_inside = before_x + old_bw as i32 == x + bw as i32
                && before_y + old_bw as i32 == y + bw as i32;
            if action == Action::Restack {
                action = Action::Move;
                self.get_mut(id)?.border_width = bw;
            } else if action == Action::Move && keeps_inside {
                action = Action::Reborder;
                self.change_border_width(id, bw);
            } else {
                self.get_mut(id)?.border_width = bw;
            }
        }

        match action {
            Action::Move => {
                let kind = if mask.contains(ConfigMask::BORDER_WIDTH) {
                    ValidateKind::Other
                } else {
                    ValidateKind::Move
                };
                self.move_window(id, x, y, next, kind);
            }
            Action::Resize => self.resize_window(id, x, y, w, h, next)?,
            Action::Restack | Action::Reborder => {
                if mask.contains(ConfigMask::STACK_MODE) {
                    self.reflect_stack_change(id, next, ValidateKind::Other);
                }
            }
        }
        if mask.contains(ConfigMask::STACK_MODE) && matches!(mode, StackMode::Opposite) {
            self.remember_opposite(id, values.sibling);
        }
        Ok(())
    }

    /// Move the window's outer corner to `x`, `y` relative to its parent and
    /// restack it above `next`.
    fn move_window(&mut self, id: WindowId, x: i32, y: i32, next: Option<WindowId>, kind: ValidateKind) {
        let Some(win) = self.windows.get(&id) else {
            return;
        };
        let Some(parent) = win.parent else {
            return;
        };
        let was_viewable = win.viewable;
        let bw = win.border_width as i32;
        let old_corner = (win.drawable.x, win.drawable.y);
        let old_region = win.border_clip.clone();
        let Some((px, py)) = self.windows.get(&parent).map(|p| (p.drawable.x, p.drawable.y)) else {
            return;
        };
        debug!("Moving window 0x{:x} to {},{}", id, x, y);

        if was_viewable {
            self.mark_subtree(id);
            self.mark_window(parent);
        }
        if let Some(win) = self.windows.get_mut(&id) {
            win.origin = (x + bw, y + bw);
            win.drawable.x = px + x + bw;
            win.drawable.y = py + y + bw;
        }
        self.set_win_size(id);
        self.set_border_size(id);
        let (dx, dy) = match self.windows.get(&id) {
            Some(win) => (win.drawable.x - old_corner.0, win.drawable.y - old_corner.1),
            None => (0, 0),
        };
        self.resize_children_win_size(id, dx, dy, 0, 0);
        if let Some(win) = self.windows.get(&id) {
            self.backend.position_window(win);
        }
        self.move_in_stack(id, next);

        if was_viewable {
            self.validate_tree(parent, None, kind);
            if kind == ValidateKind::Move {
                if let Some(win) = self.windows.get(&id) {
                    self.backend.copy_window(win, dx, dy, &old_region);
                }
            }
            self.handle_exposures(parent);
            self.backend.post_validate_tree(Some(parent), Some(id), kind);
        }
    }

    /// Move and resize the window, apply gravity to its children and
    /// restack it above `next`.
    fn resize_window(
        &mut self,
        id: WindowId,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        next: Option<WindowId>,
    ) -> Result<()> {
        let win = self.get(id)?;
        let Some(parent) = win.parent else {
            return Ok(());
        };
        let was_viewable = win.viewable;
        let bw = win.border_width as i32;
        let (old_w, old_h) = (win.drawable.width, win.drawable.height);
        let old_corner = (win.drawable.x, win.drawable.y);
        let (px, py) = self.get(parent).map(|p| (p.drawable.x, p.drawable.y))?;
        let new_corner = (px + x + bw, py + y + bw);
        let dw = width as i32 - old_w as i32;
        let dh = height as i32 - old_h as i32;
        debug!("Resizing window 0x{:x} to {}x{}+{}+{}", id, width, height, x, y);

        if dw != 0 || dh != 0 {
            for child in self.children(id) {
                let unmap_gravity = self
                    .windows
                    .get(&child)
                    .is_some_and(|c| c.mapped && c.win_gravity == Gravity::UNMAP);
                if unmap_gravity {
                    self.unmap(child, true)?;
                }
            }
        }

        if was_viewable {
            self.mark_subtree(id);
            self.mark_window(parent);
            let border_visible = self.windows.get(&id).and_then(|win| {
                if !win.has_border() {
                    return None;
                }
                let shrunk = width < old_w || height < old_h;
                let moved = new_corner != old_corner;
                Some(if shrunk || moved {
                    win.border_clip.subtract(&win.win_size)
                } else {
                    win.border_clip.clone()
                })
            });
            if let Some(mark) = self.mark_mut(id) {
                mark.resized = true;
                mark.border_visible = border_visible;
            }
        }

        if let Some(win) = self.windows.get_mut(&id) {
            win.origin = (x + bw, y + bw);
            win.drawable.x = new_corner.0;
            win.drawable.y = new_corner.1;
            win.drawable.width = width;
            win.drawable.height = height;
        }
        self.set_win_size(id);
        self.set_border_size(id);
        self.resize_children_win_size(id, new_corner.0 - old_corner.0, new_corner.1 - old_corner.1, dw, dh);
        if let Some(win) = self.windows.get(&id) {
            self.backend.position_window(win);
        }
        self.move_in_stack(id, next);

        if was_viewable {
            self.validate_tree(parent, None, ValidateKind::Other);
            self.handle_exposures(parent);
            self.backend.post_validate_tree(Some(parent), Some(id), ValidateKind::Other);
        }
        Ok(())
    }

    /// Change only the border width; the inside corner stays put.
    fn change_border_width(&mut self, id: WindowId, bw: u32) {
        let Some(win) = self.windows.get(&id) else {
            return;
        };
        if win.border_width == bw {
            return;
        }
        let Some(parent) = win.parent else {
            return;
        };
        let was_viewable = win.viewable;
        let border_visible = win.has_border().then(|| win.border_clip.subtract(&win.win_size));
        debug!("Changing border of 0x{:x} to {}", id, bw);

        if was_viewable {
            self.mark_window(parent);
            if let Some(mark) = self.mark_mut(id) {
                mark.border_visible = border_visible;
            }
        }
        if let Some(win) = self.windows.get_mut(&id) {
            win.border_width = bw;
        }
        self.set_border_size(id);

        if was_viewable {
            self.validate_tree(parent, Some(id), ValidateKind::Other);
            self.handle_exposures(parent);
            self.backend.post_validate_tree(Some(parent), Some(id), ValidateKind::Other);
        }
    }

    /// Raise the lowest mapped child that is obscured by a sibling, or lower
    /// the highest mapped child that obscures one.
    pub fn circulate_window(&mut self, parent: WindowId, direction: Circulate, client: ClientId) -> Result<()> {
        self.get(parent)?;
        let head = self.real_child_head(parent);
        let first = self.first_real_child(parent);

        let target = match direction {
            Circulate::RaiseLowest => {
                let mut cur = self.get(parent)?.last_child;
                let mut found = None;
                while let Some(wid) = cur {
                    if Some(wid) == head {
                        break;
                    }
                    let win = self.get(wid)?;
                    if win.mapped && self.any_window_overlaps_me(wid, head, win.extents()) {
                        found = Some(wid);
                        break;
                    }
                    cur = win.prev_sib;
                }
                found
            }
            Circulate::LowerHighest => {
                let mut cur = first;
                let mut found = None;
                while let Some(wid) = cur {
                    let win = self.get(wid)?;
                    if win.mapped && self.i_overlap_any_window(wid, win.extents()) {
                        found = Some(wid);
                        break;
                    }
                    cur = win.next_sib;
                }
                found
            }
        };
        let Some(window) = target else {
            return Ok(());
        };

        let place = match direction {
            Circulate::RaiseLowest => Place::OnTop,
            Circulate::LowerHighest => Place::OnBottom,
        };
        let request = Event::CirculateRequest { window, parent, place };
        if self.maybe_redirect(parent, &request, client) {
            debug!("Circulate of 0x{:x} redirected", parent);
            return Ok(());
        }

        debug!("Circulating 0x{:x} {:?}", window, place);
        self.deliver_structure(window, &Event::CirculateNotify { window, parent, place }, None);
        let next = match direction {
            Circulate::RaiseLowest => first,
            Circulate::LowerHighest => None,
        };
        self.reflect_stack_change(window, next, ValidateKind::Stack);
        Ok(())
    }
}
