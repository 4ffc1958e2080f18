//! Device-independent window core
//!
//! The window tree, its stacking order and the clip regions derived from
//! them, together with the map/unmap/configure state machine that keeps
//! them consistent and the structural events it emits.

pub mod attributes;
pub mod backend;
pub mod clip;
pub mod configure;
pub mod events;
pub mod flags;
pub mod map;
pub mod optional;
pub mod saver;
pub mod screen;
pub mod stacking;
pub mod tree;
pub mod window;

pub use attributes::{WindowAttributes, WindowAttributesReply};
pub use backend::{Backend, NullBackend, ValidateKind};
pub use configure::ConfigureValues;
pub use events::{Delivered, Event, EventLog, EventSink, NullSink};
pub use flags::{ConfigMask, EventMask};
pub use optional::{PassiveGrab, Property};
pub use saver::{SaverMode, SaverSettings};
pub use screen::{Depth, Screen, ScreenInfo, WindowSummary, SERVER_CLIENT};
pub use window::{Background, Border, Cursor, Pixmap, Window};
