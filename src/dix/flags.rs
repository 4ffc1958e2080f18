//! Event and configure masks
//!
//! Bitfields with the protocol's bit assignments, so they can be reported
//! back to clients unchanged.

use bitflags::bitflags;

bitflags! {
    /// Event selection mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventMask: u32 {
        const KEY_PRESS             = 1 << 0;
        const KEY_RELEASE           = 1 << 1;
        const BUTTON_PRESS          = 1 << 2;
        const BUTTON_RELEASE        = 1 << 3;
        const ENTER_WINDOW          = 1 << 4;
        const LEAVE_WINDOW          = 1 << 5;
        const POINTER_MOTION        = 1 << 6;
        const POINTER_MOTION_HINT   = 1 << 7;
        const BUTTON1_MOTION        = 1 << 8;
        const BUTTON2_MOTION        = 1 << 9;
        const BUTTON3_MOTION        = 1 << 10;
        const BUTTON4_MOTION        = 1 << 11;
        const BUTTON5_MOTION        = 1 << 12;
        const BUTTON_MOTION         = 1 << 13;
        const KEYMAP_STATE          = 1 << 14;
        const EXPOSURE              = 1 << 15;
        const VISIBILITY_CHANGE     = 1 << 16;
        const STRUCTURE_NOTIFY      = 1 << 17;
        const RESIZE_REDIRECT       = 1 << 18;
        const SUBSTRUCTURE_NOTIFY   = 1 << 19;
        const SUBSTRUCTURE_REDIRECT = 1 << 20;
        const FOCUS_CHANGE          = 1 << 21;
        const PROPERTY_CHANGE       = 1 << 22;
        const COLORMAP_CHANGE       = 1 << 23;
        const OWNER_GRAB_BUTTON     = 1 << 24;
    }
}

impl EventMask {
    /// Device events that propagate to ancestors unless blocked by a
    /// do-not-propagate mask.
    pub fn propagate() -> Self {
        Self::KEY_PRESS
            | Self::KEY_RELEASE
            | Self::BUTTON_PRESS
            | Self::BUTTON_RELEASE
            | Self::POINTER_MOTION
            | Self::BUTTON1_MOTION
            | Self::BUTTON2_MOTION
            | Self::BUTTON3_MOTION
            | Self::BUTTON4_MOTION
            | Self::BUTTON5_MOTION
            | Self::BUTTON_MOTION
    }

    /// Selections only one client may hold on a window at a time.
    pub fn exclusive() -> Self {
        Self::SUBSTRUCTURE_REDIRECT | Self::RESIZE_REDIRECT | Self::BUTTON_PRESS
    }
}

bitflags! {
    /// Fields present in a configure request
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConfigMask: u16 {
        const X            = 1 << 0;
        const Y            = 1 << 1;
        const WIDTH        = 1 << 2;
        const HEIGHT       = 1 << 3;
        const BORDER_WIDTH = 1 << 4;
        const SIBLING      = 1 << 5;
        const STACK_MODE   = 1 << 6;
    }
}

impl ConfigMask {
    pub fn position() -> Self {
        Self::X | Self::Y
    }

    pub fn size() -> Self {
        Self::WIDTH | Self::HEIGHT
    }
}
