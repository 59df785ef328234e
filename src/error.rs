//! Error types and Result aliases for vzremote

use std::fmt;
use std::path::PathBuf;

/// Result type alias for vzremote operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vzremote
#[derive(Debug)]
pub enum Error {
    // === Transport errors ===
    /// No authenticated session is available
    NotConnected,

    /// Connection attempt to the host failed
    ConnectFailed {
        host: String,
        reason: String,
    },

    /// Authentication was rejected by the host
    AuthenticationFailed {
        user: String,
        reason: String,
    },

    /// The remote refused to open a shell or exec channel
    ChannelOpenFailed {
        reason: String,
    },

    /// Read/write failure on an open channel
    TransportIo {
        reason: String,
    },

    /// Key file pair could not be resolved
    KeyFilesNotFound {
        private_key: PathBuf,
        public_key: PathBuf,
    },

    // === Command protocol errors ===
    /// No completion marker appeared within the configured timeout
    CommandTimeout {
        seconds: u64,
    },

    // === Lifecycle errors ===
    /// Container identifier is not a positive integer
    InvalidIdentifier {
        veid: String,
    },

    /// Container does not exist on the host
    ContainerNotFound {
        veid: u32,
        host: String,
    },

    /// IP address failed validation
    InvalidAddress {
        address: String,
    },

    /// Remote output did not match the expected shape
    ParseError {
        context: &'static str,
        output: String,
    },

    /// A classified operation reported failure; carries the raw remote text
    CommandFailed {
        operation: &'static str,
        output: String,
    },

    /// OS template is absent and could not be fetched
    TemplateUnavailable {
        template: String,
    },

    /// Container creation command did not report success
    CreationFailed {
        veid: u32,
        output: String,
    },

    /// Destroy was called without the confirmation flag
    Unconfirmed,

    /// Privilege elevation did not yield the requested identity
    ElevationFailed {
        requested: String,
        actual: String,
    },

    // === File transfer errors ===
    /// Local file missing or unreadable
    LocalFileUnreadable {
        path: PathBuf,
    },

    /// SCP conversation was rejected by the remote side
    ScpRejected {
        reason: String,
    },

    // === Configuration errors ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    // === I/O and serialization errors (kept for compatibility) ===
    /// I/O errors
    Io(std::io::Error),

    /// Serialization errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    /// Regex compilation errors
    Regex(regex::Error),

    // === Generic fallback (use sparingly) ===
    /// Generic errors (for cases not yet categorized)
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Transport errors
            Error::NotConnected => {
                write!(f, "No SSH connection")
            }
            Error::ConnectFailed { host, reason } => {
                write!(f, "Unable to establish a connection to '{}': {}", host, reason)
            }
            Error::AuthenticationFailed { user, reason } => {
                write!(f, "Unable to authenticate as '{}': {}", user, reason)
            }
            Error::ChannelOpenFailed { reason } => {
                write!(f, "Unable to create a stream to the remote shell: {}", reason)
            }
            Error::TransportIo { reason } => {
                write!(f, "Transport I/O failure: {}", reason)
            }
            Error::KeyFilesNotFound {
                private_key,
                public_key,
            } => {
                write!(
                    f,
                    "Unable to find key files '{}' / '{}'",
                    private_key.display(),
                    public_key.display()
                )
            }

            // Command protocol errors
            Error::CommandTimeout { seconds } => {
                write!(
                    f,
                    "The request took too long to process or the connection timed out at {} seconds",
                    seconds
                )
            }

            // Lifecycle errors
            Error::InvalidIdentifier { veid } => {
                write!(f, "Invalid veid '{}': expected a positive integer", veid)
            }
            Error::ContainerNotFound { veid, host } => {
                write!(f, "veid '{}' not found on server '{}'", veid, host)
            }
            Error::InvalidAddress { address } => {
                write!(f, "Invalid IP address '{}'", address)
            }
            Error::ParseError { context, output } => {
                write!(f, "Unable to parse {} from remote output: {}", context, output)
            }
            Error::CommandFailed { operation, output } => {
                write!(f, "Remote '{}' reported failure: {}", operation, output)
            }
            Error::TemplateUnavailable { template } => {
                write!(f, "Unable to find OS template '{}'", template)
            }
            Error::CreationFailed { veid, output } => {
                write!(f, "Failed to create virtual server '{}': {}", veid, output)
            }
            Error::Unconfirmed => {
                write!(f, "Unconfirmed destroy")
            }
            Error::ElevationFailed { requested, actual } => {
                write!(
                    f,
                    "Unable to login as '{}' (identity reported '{}')",
                    requested, actual
                )
            }

            // File transfer errors
            Error::LocalFileUnreadable { path } => {
                write!(
                    f,
                    "The local file '{}' does not exist or is not readable",
                    path.display()
                )
            }
            Error::ScpRejected { reason } => {
                write!(f, "SCP transfer rejected: {}", reason)
            }

            // Configuration errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),
            Error::Regex(err) => write!(f, "Regex compilation error: {}", err),

            // Generic fallback
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Regex(err)
    }
}

impl From<russh::Error> for Error {
    fn from(err: russh::Error) -> Self {
        Error::TransportIo {
            reason: err.to_string(),
        }
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
