use crate::platform::{Direction, PlatformError, Role};

pub type AppResult<T> = Result<T, AutoSoundError>;

#[derive(Debug, thiserror::Error)]
pub enum AutoSoundError {
    // Endpoint control
    #[error("Failed to initialize the audio runtime: {0}")]
    SessionInit(PlatformError),
    #[error("Failed to create {object}: {source}")]
    ObjectCreation {
        object: &'static str,
        source: PlatformError,
    },
    #[error("Audio session is not open")]
    InvalidSession,
    #[error("Failed to enumerate {direction} devices: {source}")]
    Enumeration {
        direction: Direction,
        source: PlatformError,
    },
    #[error("Failed to set \"{endpoint_id}\" as default for the {role} role: {source}")]
    DefaultAssignment {
        role: Role,
        endpoint_id: String,
        source: PlatformError,
    },
    // Library errors
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML Serialization Error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("TOML Deserialization Error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("Autostart Error: {0}")]
    AutoLaunch(#[from] auto_launch::Error),
    #[error("Failed to persist settings: {0}")]
    Persist(#[from] tempfile::PersistError),
    // My errors
    #[error("Endpoint worker is no longer running")]
    WorkerGone,
    #[error("Reconciliation loop is no longer running")]
    ReconcilerGone,
    #[error("Failed to determine a config directory")]
    ConfigDir,
    #[error("Executable path is not valid UTF-8")]
    ExePath,
}
