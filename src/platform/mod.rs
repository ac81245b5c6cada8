//! The narrow capability surface the rest of the crate drives audio endpoints through.
//!
//! Everything that knows about COM identities, vtable layouts, or HRESULTs lives
//! behind these traits in the platform-specific module. Endpoint sessions, the
//! directory, the controller and the reconciliation loop only ever see
//! [`AudioPlatform`] and friends.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use self::windows::CoreAudio;

#[cfg(test)]
pub mod fake;

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Result of bringing up the object-model runtime on the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeInit {
    /// This call initialized the runtime.
    Initialized,
    /// The runtime was already initialized on this thread, in the same mode.
    ///
    /// Still counts as a reference that must be balanced by `uninitialize`.
    AlreadyInitialized,
}

/// Failure of a single native call, with the operation it came from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed ({code:#010X}): {message}")]
pub struct PlatformError {
    pub operation: &'static str,
    /// Raw status code (an HRESULT on Windows), kept as the unsigned bit pattern.
    pub code: u32,
    pub message: String,
}

impl PlatformError {
    pub fn new(operation: &'static str, code: u32, message: impl Into<String>) -> Self {
        Self {
            operation,
            code,
            message: message.into(),
        }
    }
}

/// Data-flow direction of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Output (speakers, headphones)
    Render,
    /// Input (microphones)
    Capture,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Render, Direction::Capture];
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let direction_str = match self {
            Self::Render => "Output",
            Self::Capture => "Input",
        };
        write!(f, "{direction_str}")
    }
}

/// The OS keeps a separate default endpoint per role and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Console,
    Multimedia,
    Communications,
}

impl Role {
    /// Every role, in the order defaults are assigned.
    pub const ALL: [Role; 3] = [Role::Console, Role::Multimedia, Role::Communications];
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role_str = match self {
            Self::Console => "Console",
            Self::Multimedia => "Multimedia",
            Self::Communications => "Communications",
        };
        write!(f, "{role_str}")
    }
}

// https://learn.microsoft.com/en-us/windows/win32/coreaudio/device-state-xxx-constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Active,
    Disabled,
    NotPresent,
    Unplugged,
}

impl DeviceState {
    pub const fn bits(self) -> u32 {
        match self {
            Self::Active => 0x1,
            Self::Disabled => 0x2,
            Self::NotPresent => 0x4,
            Self::Unplugged => 0x8,
        }
    }
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0x1 => Some(Self::Active),
            0x2 => Some(Self::Disabled),
            0x4 => Some(Self::NotPresent),
            0x8 => Some(Self::Unplugged),
            _ => None,
        }
    }
}

/// Bitwise OR of [`DeviceState`] values, as accepted by endpoint enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateMask(pub u32);

impl StateMask {
    pub const ACTIVE: StateMask = StateMask(DeviceState::Active.bits());
    pub const ALL: StateMask = StateMask(0xF);

    pub fn contains(self, state: DeviceState) -> bool {
        self.0 & state.bits() != 0
    }
}

/// Owns the per-thread runtime and hands out the root objects.
///
/// Implementations are cheap handles; everything they create is bound to the
/// thread that called [`AudioPlatform::initialize`].
pub trait AudioPlatform {
    type Enumerator: EndpointEnumerator;
    type PolicyConfig: DefaultEndpointWriter;

    fn initialize(&self) -> PlatformResult<RuntimeInit>;
    fn create_enumerator(&self) -> PlatformResult<Self::Enumerator>;
    /// Creates the (undocumented) object used to change default endpoints.
    fn create_policy_config(&self) -> PlatformResult<Self::PolicyConfig>;
    /// Balances one successful `initialize`. Every object created since must already be dropped.
    fn uninitialize(&self);
}

pub trait EndpointEnumerator {
    type Device: EndpointDevice;
    type Collection: EndpointCollection<Device = Self::Device>;

    fn enum_endpoints(&self, direction: Direction, mask: StateMask)
        -> PlatformResult<Self::Collection>;
    fn default_endpoint(&self, direction: Direction, role: Role) -> PlatformResult<Self::Device>;
}

pub trait EndpointCollection {
    type Device: EndpointDevice;

    fn count(&self) -> PlatformResult<u32>;
    fn item(&self, index: u32) -> PlatformResult<Self::Device>;
}

pub trait EndpointDevice {
    fn id(&self) -> PlatformResult<String>;
    fn state(&self) -> PlatformResult<DeviceState>;
    fn friendly_name(&self) -> PlatformResult<String>;
}

pub trait DefaultEndpointWriter {
    fn set_default_endpoint(&self, endpoint_id: &str, role: Role) -> PlatformResult<()>;
}
