//! Error taxonomy shared by every crate in the workspace.

use thiserror::Error;

/// Result alias used throughout the SM4 crates.
pub type Result<T> = core::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad key, IV, tag or buffer parameters. Nothing was processed.
    Configuration,
    /// Tag verification failed.
    Authentication,
    /// Two engine tiers disagreed. Indicates an implementation bug.
    Consistency,
}

/// Errors reported by the SM4 engines, the batch scheduler and SM4-GCM.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The master key is not 16 bytes.
    #[error("SM4 key must be 16 bytes, got {len}")]
    InvalidKeyLength {
        /// Supplied length in bytes.
        len: usize,
    },
    /// Only 96-bit IVs are supported.
    #[error("IV must be 12 bytes, got {len}")]
    InvalidIvLength {
        /// Supplied length in bytes.
        len: usize,
    },
    /// The tag length is outside `4..=16` or does not match the configured length.
    #[error("invalid authentication tag length {len}")]
    InvalidTagLength {
        /// Requested or supplied length in bytes.
        len: usize,
    },
    /// A raw block buffer is not a whole number of blocks.
    #[error("buffer length {len} is not a multiple of the 16-byte block size")]
    InvalidBufferLength {
        /// Supplied length in bytes.
        len: usize,
    },
    /// Plaintext or associated data exceeds the GCM length limits.
    #[error("message exceeds the GCM length limit")]
    MessageTooLong,
    /// A sealed container carries a version this build does not read.
    #[error("unsupported sealed message version {version}")]
    UnsupportedVersion {
        /// Version found in the container.
        version: u32,
    },
    /// The worker pool could not be created.
    #[error("failed to build worker pool: {reason}")]
    WorkerPool {
        /// Message from the pool builder.
        reason: String,
    },
    /// The recomputed tag does not match the supplied tag.
    #[error("authentication failed")]
    AuthenticationFailed,
    /// An optimized engine disagreed with the scalar reference.
    #[error("engine {engine} diverged from the scalar reference")]
    Consistency {
        /// Name of the diverging engine.
        engine: &'static str,
    },
}

impl Error {
    /// Returns the class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AuthenticationFailed => ErrorKind::Authentication,
            Error::Consistency { .. } => ErrorKind::Consistency,
            _ => ErrorKind::Configuration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            Error::InvalidIvLength { len: 16 }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(Error::AuthenticationFailed.kind(), ErrorKind::Authentication);
        assert_eq!(
            Error::Consistency { engine: "table" }.kind(),
            ErrorKind::Consistency
        );
    }

    #[test]
    fn authentication_message_has_no_detail() {
        assert_eq!(Error::AuthenticationFailed.to_string(), "authentication failed");
    }
}
