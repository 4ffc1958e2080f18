//! Events Module
//!
//! Structural events produced by the window core and the sink they are
//! delivered through. The core decides which windows an event goes to from
//! the event selections it tracks; the sink only transports them.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use tracing::trace;

use crate::dix::flags::EventMask;
use crate::dix::Screen;
use crate::shared::{Atom, ClientId, Place, StackMode, Visibility, WindowId};

/// Events emitted by tree, map and configure operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    CreateNotify {
        parent: WindowId,
        window: WindowId,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        border_width: u32,
        override_redirect: bool,
    },
    DestroyNotify {
        window: WindowId,
    },
    UnmapNotify {
        window: WindowId,
        from_configure: bool,
    },
    MapNotify {
        window: WindowId,
        override_redirect: bool,
    },
    MapRequest {
        parent: WindowId,
        window: WindowId,
    },
    ReparentNotify {
        window: WindowId,
        parent: WindowId,
        x: i32,
        y: i32,
        override_redirect: bool,
    },
    ConfigureNotify {
        window: WindowId,
        above_sibling: Option<WindowId>,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        border_width: u32,
        override_redirect: bool,
    },
    ConfigureRequest {
        parent: WindowId,
        window: WindowId,
        sibling: Option<WindowId>,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        border_width: u32,
        stack_mode: StackMode,
        value_mask: u16,
    },
    GravityNotify {
        window: WindowId,
        x: i32,
        y: i32,
    },
    ResizeRequest {
        window: WindowId,
        width: u32,
        height: u32,
    },
    CirculateNotify {
        window: WindowId,
        parent: WindowId,
        place: Place,
    },
    CirculateRequest {
        window: WindowId,
        parent: WindowId,
        place: Place,
    },
    VisibilityNotify {
        window: WindowId,
        state: Visibility,
    },
    Expose {
        window: WindowId,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        count: u32,
    },
    PropertyNotify {
        window: WindowId,
        atom: Atom,
        deleted: bool,
    },
}

/// Transport for events leaving the core
pub trait EventSink {
    /// Deliver `event` to the clients that selected `mask` on `window`.
    fn deliver(&mut self, window: WindowId, event: &Event, mask: EventMask);
}

/// Sink that drops everything
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn deliver(&mut self, _window: WindowId, _event: &Event, _mask: EventMask) {}
}

/// One delivered event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivered {
    /// Window the event was delivered on
    pub window: WindowId,
    /// Selection mask it was delivered under
    pub mask: u32,
    pub event: Event,
}

/// Recording sink with a shared handle, so the log can be read while the
/// screen owns the sink.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Rc<RefCell<Vec<Delivered>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<Delivered> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }

    /// Copy of the events recorded so far, without delivery details.
    pub fn events(&self) -> Vec<Event> {
        self.entries.borrow().iter().map(|d| d.event.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl EventSink for EventLog {
    fn deliver(&mut self, window: WindowId, event: &Event, mask: EventMask) {
        self.entries.borrow_mut().push(Delivered {
            window,
            mask: mask.bits(),
            event: event.clone(),
        });
    }
}

impl Screen {
    /// Union of every client's selection on the window.
    pub(crate) fn event_masks(&self, id: WindowId) -> EventMask {
        self.windows
            .get(&id)
            .map(|w| w.event_mask | w.other_event_masks())
            .unwrap_or_default()
    }

    /// Client holding `mask` on the window, if any.
    pub(crate) fn selecting_client(&self, id: WindowId, mask: EventMask) -> Option<ClientId> {
        let win = self.windows.get(&id)?;
        if win.event_mask.intersects(mask) {
            return Some(win.owner);
        }
        win.optional.as_ref().and_then(|opt| {
            opt.other_clients
                .iter()
                .find(|oc| oc.mask.intersects(mask))
                .map(|oc| oc.client)
        })
    }

    /// True if a redirect request on `parent` would be intercepted for
    /// `client`. The redirecting client's own requests are never redirected.
    pub(crate) fn redirect_send(&self, parent: WindowId, client: ClientId) -> bool {
        self.selecting_client(parent, EventMask::SUBSTRUCTURE_REDIRECT)
            .is_some_and(|holder| holder != client)
    }

    /// Deliver on `window` if anybody selected `mask` there.
    pub(crate) fn deliver_to(&mut self, window: WindowId, event: &Event, mask: EventMask) -> bool {
        if !self.event_masks(window).intersects(mask) {
            return false;
        }
        trace!("Delivering {:?} to 0x{:x}", event, window);
        self.sink.deliver(window, event, mask);
        true
    }

    /// Structure event: StructureNotify on the window, SubstructureNotify on
    /// its parent and on `other_parent` (reparent).
    pub(crate) fn deliver_structure(
        &mut self,
        window: WindowId,
        event: &Event,
        other_parent: Option<WindowId>,
    ) {
        self.deliver_to(window, event, EventMask::STRUCTURE_NOTIFY);
        if let Some(parent) = self.windows.get(&window).and_then(|w| w.parent) {
            self.deliver_to(parent, event, EventMask::SUBSTRUCTURE_NOTIFY);
        }
        let parent = self.windows.get(&window).and_then(|w| w.parent);
        if let Some(other) = other_parent.filter(|&other| Some(other) != parent) {
            self.deliver_to(other, event, EventMask::SUBSTRUCTURE_NOTIFY);
        }
    }

    /// Offer a request to the redirecting client of `parent`. Returns true if
    /// the request was diverted and must not be performed.
    pub(crate) fn maybe_redirect(&mut self, parent: WindowId, event: &Event, client: ClientId) -> bool {
        if !self.redirect_send(parent, client) {
            return false;
        }
        self.sink
            .deliver(parent, event, EventMask::SUBSTRUCTURE_REDIRECT);
        true
    }
}
