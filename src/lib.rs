//! Area DIX - device-independent X11 window core
//!
//! The window tree, stacking order and clip regions of an X server screen,
//! with the map/unmap/configure state machine that keeps them consistent and
//! the structural events it emits. Pixels and hardware live behind the
//! [`dix::Backend`] trait; event transport behind [`dix::EventSink`].

pub mod config;
pub mod dix;
pub mod error;
pub mod script;
pub mod shared;

pub use dix::{Backend, Event, EventSink, Screen, ScreenInfo};
pub use error::{Result, WindowError};
