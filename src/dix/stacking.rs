//! Stacking Module
//!
//! Sibling order within a parent: where a restack request puts a window,
//! relinking it, and revalidating what the move uncovered. Only the real
//! children are ever reordered; the saver window on the root stays above
//! them while the saver is active.

use area_region::{Rect, Region};
use tracing::{debug, trace};

use crate::dix::backend::ValidateKind;
use crate::dix::Screen;
use crate::shared::{StackMode, WindowId};

/// Sibling arrangement an Opposite restack left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OppositeMemo {
    sibling: Option<WindowId>,
    arrangement: Vec<(WindowId, Rect, bool)>,
}

impl Screen {
    /// True if `sib` is above `id` in their parent's stacking order.
    pub fn is_sibling_above(&self, id: WindowId, sib: WindowId) -> bool {
        let mut cur = self
            .windows
            .get(&id)
            .and_then(|w| w.parent)
            .and_then(|p| self.windows.get(&p))
            .and_then(|p| p.first_child);
        while let Some(wid) = cur {
            if wid == sib {
                return true;
            }
            if wid == id {
                return false;
            }
            cur = self.windows.get(&wid).and_then(|w| w.next_sib);
        }
        false
    }

    /// Outline of `id` if its outer box were `outer`, bounding shape applied.
    fn bounding_region_at(&self, id: WindowId, outer: Rect) -> Region {
        let mut region = Region::from_rect(outer);
        if let Some(win) = self.windows.get(&id) {
            if let Some(shape) = win.bounding_shape() {
                let bw = win.border_width as i32;
                region = region.intersect(&shape.translated(outer.x1 + bw, outer.y1 + bw));
            }
        }
        region
    }

    /// Would `id`, with outer box `outer`, share a pixel with `sib` where it
    /// is now? Boxes first, then bounding shapes if either has one.
    pub(crate) fn overlaps_sibling(&self, id: WindowId, outer: Rect, sib: WindowId) -> bool {
        let (Some(win), Some(swin)) = (self.windows.get(&id), self.windows.get(&sib)) else {
            return false;
        };
        let sbox = swin.extents();
        if !sbox.overlaps(&outer) {
            return false;
        }
        if !win.is_shaped() && !swin.is_shaped() {
            return true;
        }
        self.bounding_region_at(id, outer)
            .intersects(&self.bounding_region_at(sib, sbox))
    }

    /// Some mapped sibling between `head` and `id` overlaps `id`.
    pub(crate) fn any_window_overlaps_me(&self, id: WindowId, head: Option<WindowId>, outer: Rect) -> bool {
        let mut cur = self.windows.get(&id).and_then(|w| w.prev_sib);
        while let Some(sib) = cur {
            if Some(sib) == head {
                break;
            }
            let Some(swin) = self.windows.get(&sib) else {
                break;
            };
            if swin.mapped && self.overlaps_sibling(id, outer, sib) {
                return true;
            }
            cur = swin.prev_sib;
        }
        false
    }

    /// `id` overlaps some mapped sibling below it.
    pub(crate) fn i_overlap_any_window(&self, id: WindowId, outer: Rect) -> bool {
        let mut cur = self.windows.get(&id).and_then(|w| w.next_sib);
        while let Some(sib) = cur {
            let Some(swin) = self.windows.get(&sib) else {
                break;
            };
            if swin.mapped && self.overlaps_sibling(id, outer, sib) {
                return true;
            }
            cur = swin.next_sib;
        }
        false
    }

    /// Where a restack request leaves `id`: the sibling it will sit directly
    /// above, or None for the bottom. `outer` is the window's outer box
    /// after the request. An unchanged position returns the current next
    /// sibling.
    pub fn place(&self, id: WindowId, sibling: Option<WindowId>, mode: StackMode, outer: Rect) -> Option<WindowId> {
        let win = self.windows.get(&id)?;
        let parent = win.parent?;
        let head = self.real_child_head(parent);
        let first = self.first_real_child(parent);
        let last = self.windows.get(&parent).and_then(|p| p.last_child);
        let here = win.next_sib;

        if first == Some(id) && last == Some(id) {
            return None;
        }

        let sibling_mapped = sibling
            .and_then(|s| self.windows.get(&s))
            .is_none_or(|s| s.mapped);
        let conditional = matches!(mode, StackMode::TopIf | StackMode::BottomIf | StackMode::Opposite);
        if conditional && (!win.mapped || !sibling_mapped) {
            return here;
        }

        if matches!(mode, StackMode::Opposite) && self.opposite_settled(id, sibling, outer) {
            trace!("Opposite restack of 0x{:x} already applied", id);
            return here;
        }

        match (mode, sibling) {
            (StackMode::Above, Some(sib)) => Some(sib),
            (StackMode::Above, None) if first == Some(id) => here,
            (StackMode::Above, None) => first,
            (StackMode::Below, Some(sib)) => {
                let below_sib = self.windows.get(&sib).and_then(|s| s.next_sib);
                if below_sib == Some(id) { here } else { below_sib }
            }
            (StackMode::Below, None) => None,
            (StackMode::TopIf, Some(sib)) => {
                if self.is_sibling_above(id, sib) && self.overlaps_sibling(id, outer, sib) {
                    first
                } else {
                    here
                }
            }
            (StackMode::TopIf, None) => {
                if self.any_window_overlaps_me(id, head, outer) { first } else { here }
            }
            (StackMode::BottomIf, Some(sib)) => {
                if !self.is_sibling_above(id, sib) && self.overlaps_sibling(id, outer, sib) {
                    None
                } else {
                    here
                }
            }
            (StackMode::BottomIf, None) => {
                if self.i_overlap_any_window(id, outer) { None } else { here }
            }
            (StackMode::Opposite, Some(sib)) => {
                if !self.overlaps_sibling(id, outer, sib) {
                    here
                } else if self.is_sibling_above(id, sib) {
                    first
                } else {
                    None
                }
            }
            (StackMode::Opposite, None) => {
                if self.any_window_overlaps_me(id, head, outer) {
                    first
                } else if self.i_overlap_any_window(id, outer) {
                    None
                } else {
                    here
                }
            }
        }
    }

    /// Order, outer boxes and map state of the children of `parent`.
    fn arrangement(&self, parent: WindowId) -> Vec<(WindowId, Rect, bool)> {
        self.children(parent)
            .into_iter()
            .filter_map(|c| self.windows.get(&c))
            .map(|w| (w.id, w.extents(), w.mapped))
            .collect()
    }

    /// Record the arrangement an applied Opposite restack of `id` produced.
    pub(crate) fn remember_opposite(&mut self, id: WindowId, sibling: Option<WindowId>) {
        let Some(parent) = self.windows.get(&id).and_then(|w| w.parent) else {
            return;
        };
        let memo = OppositeMemo { sibling, arrangement: self.arrangement(parent) };
        if let Some(win) = self.windows.get_mut(&id) {
            win.opposite = Some(memo);
        }
    }

    /// True if the same Opposite request already produced the current
    /// arrangement and nothing moved since.
    fn opposite_settled(&self, id: WindowId, sibling: Option<WindowId>, outer: Rect) -> bool {
        let Some(win) = self.windows.get(&id) else {
            return false;
        };
        let Some(parent) = win.parent else {
            return false;
        };
        win.extents() == outer
            && win
                .opposite
                .as_ref()
                .is_some_and(|memo| memo.sibling == sibling && memo.arrangement == self.arrangement(parent))
    }

    /// Relink `id` directly above `next` (None: bottom) and return the
    /// highest window whose relative order changed.
    pub(crate) fn move_in_stack(&mut self, id: WindowId, next: Option<WindowId>) -> Option<WindowId> {
        let win = self.windows.get(&id)?;
        let parent = win.parent?;
        let old_next = win.next_sib;
        if old_next == next {
            return Some(id);
        }
        let was_first = self.windows.get(&parent).and_then(|p| p.first_child) == Some(id);

        self.unlink(id);
        self.link_above(id, parent, next);

        let now_first = self.windows.get(&parent).and_then(|p| p.first_child) == Some(id);
        let first_change = if next.is_none() || (was_first && !now_first) {
            old_next
        } else if now_first {
            Some(id)
        } else {
            // Mid-list move: whichever of the window and its old neighbour
            // comes first from the top.
            let mut cur = self.windows.get(&parent).and_then(|p| p.first_child);
            while let Some(wid) = cur {
                if wid == id || Some(wid) == old_next {
                    break;
                }
                cur = self.windows.get(&wid).and_then(|w| w.next_sib);
            }
            cur
        };

        if let Some(win) = self.windows.get(&id) {
            self.backend.restack_window(win, old_next);
        }
        trace!("Restacked 0x{:x} above {:?}, first change {:?}", id, next, first_change);
        first_change
    }

    /// Restack `id` above `next` and revalidate what changed.
    pub(crate) fn reflect_stack_change(&mut self, id: WindowId, next: Option<WindowId>, kind: ValidateKind) {
        let Some((parent, was_viewable)) = self.windows.get(&id).and_then(|w| Some((w.parent?, w.viewable)))
        else {
            return;
        };
        let first_change = self.move_in_stack(id, next);
        debug!("Restacking window 0x{:x}", id);

        if was_viewable {
            if let Some(first) = first_change {
                self.mark_window(parent);
                self.validate_tree(parent, Some(first), kind);
                self.handle_exposures(parent);
                self.backend.post_validate_tree(Some(parent), Some(first), kind);
            }
        }
    }
}
