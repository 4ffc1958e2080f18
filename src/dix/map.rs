//! Map state machine
//!
//! Unmapped → mapped → realized → viewable. Mapping a window realizes its
//! mapped subtree when the parent is realized; unmapping unrealizes it. Map
//! requests for non-override-redirect windows are diverted to the client
//! holding SubstructureRedirect on the parent.

use tracing::{debug, warn};

use crate::dix::backend::ValidateKind;
use crate::dix::events::Event;
use crate::dix::tree::Walk;
use crate::dix::Screen;
use crate::error::{Result, WindowError};
use crate::shared::{ClientId, Visibility, WindowClass, WindowId};

impl Screen {
    /// Map a window on behalf of `client`.
    pub fn map_window(&mut self, id: WindowId, client: ClientId) -> Result<()> {
        let win = self.get(id)?;
        if win.mapped {
            return Ok(());
        }
        let Some(parent) = win.parent else {
            return Ok(());
        };
        let override_redirect = win.override_redirect;

        if !override_redirect
            && self.maybe_redirect(parent, &Event::MapRequest { parent, window: id }, client)
        {
            debug!("Map of 0x{:x} redirected to the manager of 0x{:x}", id, parent);
            return Ok(());
        }

        debug!("Mapping window 0x{:x}", id);
        self.get_mut(id)?.mapped = true;
        let parent_realized = self.get(parent)?.realized;
        if parent_realized {
            if let Err(err) = self.realize_tree(id) {
                self.get_mut(id)?.mapped = false;
                return Err(err);
            }
        }
        self.deliver_structure(id, &Event::MapNotify { window: id, override_redirect }, None);

        if !parent_realized {
            return Ok(());
        }
        if self.get(id)?.viewable {
            self.mark_subtree(id);
            self.validate_tree(parent, Some(id), ValidateKind::Map);
            self.handle_exposures(parent);
            self.backend.post_validate_tree(Some(parent), Some(id), ValidateKind::Map);
        }
        Ok(())
    }

    /// Map every unmapped child, top to bottom, with a single revalidation.
    pub fn map_subwindows(&mut self, id: WindowId, client: ClientId) -> Result<()> {
        let parent_realized = self.get(id)?.realized;
        let mut first_mapped = None;
        let mut failure = None;

        for child in self.children(id) {
            let cwin = self.get(child)?;
            if cwin.mapped {
                continue;
            }
            let override_redirect = cwin.override_redirect;
            if !override_redirect
                && self.maybe_redirect(id, &Event::MapRequest { parent: id, window: child }, client)
            {
                continue;
            }

            debug!("Mapping subwindow 0x{:x}", child);
            self.get_mut(child)?.mapped = true;
            if parent_realized {
                if let Err(err) = self.realize_tree(child) {
                    self.get_mut(child)?.mapped = false;
                    failure = Some(err);
                    continue;
                }
            }
            self.deliver_structure(child, &Event::MapNotify { window: child, override_redirect }, None);

            if parent_realized {
                if self.get(child)?.viewable {
                    self.mark_subtree(child);
                    first_mapped.get_or_insert(child);
                }
            }
        }

        if let Some(first) = first_mapped {
            self.validate_tree(id, Some(first), ValidateKind::Map);
            self.handle_exposures(id);
            self.backend.post_validate_tree(Some(id), Some(first), ValidateKind::Map);
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Unmap a window. Unmapping the root or an unmapped window does nothing.
    pub fn unmap_window(&mut self, id: WindowId) -> Result<()> {
        self.unmap(id, false)
    }

    /// Unmap with the UnmapNotify `from_configure` flag. When set, the caller
    /// is in the middle of resizing the parent and revalidates afterwards.
    pub(crate) fn unmap(&mut self, id: WindowId, from_configure: bool) -> Result<()> {
        let win = self.get(id)?;
        if !win.mapped {
            return Ok(());
        }
        let Some(parent) = win.parent else {
            return Ok(());
        };
        let was_realized = win.realized;
        let was_viewable = win.viewable;

        debug!("Unmapping window 0x{:x}", id);
        self.deliver_structure(id, &Event::UnmapNotify { window: id, from_configure }, None);

        let validate = was_viewable && !from_configure;
        if validate {
            self.mark_window(id);
            self.mark_window(parent);
        }
        self.get_mut(id)?.mapped = false;
        if was_realized {
            self.unrealize_tree(id, from_configure);
        }
        if validate {
            self.validate_tree(parent, Some(id), ValidateKind::Unmap);
            self.handle_exposures(parent);
            self.backend.post_validate_tree(Some(parent), Some(id), ValidateKind::Unmap);
        }
        if was_realized && !from_configure {
            if let Some(win) = self.windows.get(&id) {
                self.backend.window_gone(win);
            }
        }
        Ok(())
    }

    /// Unmap mapped children bottom to top with a single revalidation.
    pub fn unmap_subwindows(&mut self, id: WindowId) -> Result<()> {
        let win = self.get(id)?;
        let was_realized = win.realized;
        let was_viewable = win.viewable;
        let mut cur = win.last_child;
        let head = self.real_child_head(id);
        let mut topmost = None;
        let mut any_viewable = false;

        while let Some(child) = cur {
            if Some(child) == head {
                break;
            }
            let cwin = self.get(child)?;
            cur = cwin.prev_sib;
            if !cwin.mapped {
                continue;
            }
            let child_viewable = cwin.viewable;

            debug!("Unmapping subwindow 0x{:x}", child);
            self.deliver_structure(child, &Event::UnmapNotify { window: child, from_configure: false }, None);
            if child_viewable {
                self.mark_window(child);
                any_viewable = true;
            }
            self.get_mut(child)?.mapped = false;
            if was_realized {
                self.unrealize_tree(child, false);
            }
            topmost = Some(child);
        }

        if any_viewable && was_viewable {
            self.mark_window(id);
            self.validate_tree(id, topmost, ValidateKind::Unmap);
            self.handle_exposures(id);
            self.backend.post_validate_tree(Some(id), topmost, ValidateKind::Unmap);
        }
        Ok(())
    }

    /// Realize the mapped part of the subtree at `id`. Only InputOutput
    /// windows become viewable. If the backend refuses a window, everything
    /// realized so far is unrealized again.
    pub(crate) fn realize_tree(&mut self, id: WindowId) -> Result<()> {
        let completed = self.walk_tree(id, |scr, wid| {
            let Some(win) = scr.windows.get_mut(&wid) else {
                return Walk::Skip;
            };
            if !win.mapped {
                return Walk::Skip;
            }
            win.realized = true;
            win.viewable = win.class == WindowClass::InputOutput;
            if !scr.backend.realize_window(win) {
                win.realized = false;
                win.viewable = false;
                return Walk::Stop;
            }
            Walk::Children
        });
        if completed {
            return Ok(());
        }
        warn!("Backend refused to realize the subtree at 0x{:x}", id);
        self.unrealize_tree(id, true);
        Err(WindowError::AllocationFailure)
    }

    /// Unrealize the realized part of the subtree at `id`. Inferiors lose
    /// their clips here; the window itself loses them when its parent is
    /// revalidated, unless the unmap comes from a configure.
    pub(crate) fn unrealize_tree(&mut self, id: WindowId, from_configure: bool) {
        self.walk_tree(id, |scr, wid| {
            let Some(win) = scr.windows.get_mut(&wid) else {
                return Walk::Skip;
            };
            if !win.realized {
                return Walk::Skip;
            }
            win.realized = false;
            win.viewable = false;
            win.visibility = Visibility::NotViewable;
            scr.backend.unrealize_window(win);
            if wid != id || from_configure {
                win.mark = None;
                win.clip_list.clear();
                win.border_clip.clear();
                scr.backend.clip_notify(win, 0, 0);
            }
            Walk::Children
        });
    }
}
