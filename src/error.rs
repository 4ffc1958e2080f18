//! Request status taxonomy for the window core.

use thiserror::Error;

use crate::shared::WindowId;

/// Why a window request failed.
///
/// Validation happens before any mutation, so a returned error means the tree
/// is exactly as it was before the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// An enumerated or numeric field is outside its legal set.
    #[error("value {0} is out of range")]
    InvalidValue(u32),

    /// The request is structurally inconsistent.
    #[error("request does not match: {0}")]
    InvalidMatch(&'static str),

    /// The window id does not resolve to a live window.
    #[error("no such window 0x{0:x}")]
    InvalidReference(WindowId),

    /// The backend could not allocate resources for the window.
    #[error("resource allocation failed")]
    AllocationFailure,

    /// Another client already holds an exclusive selection.
    #[error("access denied: {0}")]
    AccessDenied(&'static str),

    /// The id is already registered to another window.
    #[error("window id 0x{0:x} is already in use")]
    IdInUse(WindowId),
}

/// Result alias used by every window request.
pub type Result<T> = std::result::Result<T, WindowError>;
