use std::fmt::Display;

use serde::Serialize;

use crate::platform::Direction;

pub mod controller;
pub mod directory;
pub mod session;

/// Shown in place of a friendly name Windows wouldn't give us.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown Device";

/// Snapshot of one active endpoint, taken at enumeration time.
///
/// Not a live handle, goes stale as soon as anything about the device changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub id: String,
    pub name: String,
    pub direction: Direction,
    /// Default for the Multimedia role at enumeration time
    pub is_system_default: bool,
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.id.is_empty(), self.name.is_empty()) {
            (_, false) => write!(f, "{}", self.name),
            (false, true) => write!(f, "By ID: \"{}\"", self.id),
            (true, true) => write!(f, "Empty device?"),
        }
    }
}
