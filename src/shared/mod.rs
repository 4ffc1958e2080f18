//! Value types shared by the window core, the event layer and the replay tool.

pub mod window_state;

pub use window_state::*;
