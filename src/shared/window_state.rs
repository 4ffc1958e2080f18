//! Shared window state types
//!
//! Protocol-level values that describe a window: geometry, class, gravity,
//! stacking modes and visibility. Raw request values are converted with
//! `TryFrom<u32>`, which is where out-of-range enumerations become
//! `WindowError::InvalidValue`.

use area_region::Rect;
use serde::{Deserialize, Serialize};

use crate::error::WindowError;

/// X resource id of a window.
pub type WindowId = u32;
/// Connection index of a client.
pub type ClientId = u32;
/// Visual id.
pub type VisualId = u32;
/// Colormap id; 0 means None.
pub type ColormapId = u32;
/// Interned atom.
pub type Atom = u32;

/// Window geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn to_rect(&self) -> Rect {
        Rect::from_xywh(self.x, self.y, self.width, self.height)
    }
}

macro_rules! raw_enum {
    ($name:ident { $($variant:ident = $value:expr),+ $(,)? }) => {
        impl TryFrom<u32> for $name {
            type Error = WindowError;

            fn try_from(raw: u32) -> Result<Self, Self::Error> {
                match raw {
                    $($value => Ok($name::$variant),)+
                    other => Err(WindowError::InvalidValue(other)),
                }
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                match value {
                    $($name::$variant => $value,)+
                }
            }
        }
    };
}

/// Window class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowClass {
    CopyFromParent,
    InputOutput,
    InputOnly,
}

raw_enum!(WindowClass {
    CopyFromParent = 0,
    InputOutput = 1,
    InputOnly = 2,
});

/// Bit and window gravity.
///
/// Value 0 is `Forget` for bit gravity and `Unmap` for window gravity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gravity {
    Forget,
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
    Static,
}

impl Gravity {
    /// Window gravity that unmaps the child when its parent is resized.
    pub const UNMAP: Gravity = Gravity::Forget;
}

raw_enum!(Gravity {
    Forget = 0,
    NorthWest = 1,
    North = 2,
    NorthEast = 3,
    West = 4,
    Center = 5,
    East = 6,
    SouthWest = 7,
    South = 8,
    SouthEast = 9,
    Static = 10,
});

/// Backing-store hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackingStore {
    NotUseful,
    WhenMapped,
    Always,
}

raw_enum!(BackingStore {
    NotUseful = 0,
    WhenMapped = 1,
    Always = 2,
});

/// Stack mode of a configure request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackMode {
    Above,
    Below,
    TopIf,
    BottomIf,
    Opposite,
}

raw_enum!(StackMode {
    Above = 0,
    Below = 1,
    TopIf = 2,
    BottomIf = 3,
    Opposite = 4,
});

/// Circulate direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Circulate {
    RaiseLowest,
    LowerHighest,
}

raw_enum!(Circulate {
    RaiseLowest = 0,
    LowerHighest = 1,
});

/// Where a circulated window ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Place {
    OnTop,
    OnBottom,
}

/// Visibility state reported in VisibilityNotify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Unobscured,
    PartiallyObscured,
    FullyObscured,
    NotViewable,
}

/// Map state reported by GetWindowAttributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapState {
    Unmapped,
    Unviewable,
    Viewable,
}

/// Property change mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropMode {
    Replace,
    Prepend,
    Append,
}

raw_enum!(PropMode {
    Replace = 0,
    Prepend = 1,
    Append = 2,
});

/// Which shape of a window a SHAPE request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Bounding,
    Clip,
    Input,
}
