/// Convenience result type used across Notefall.
pub type NotefallResult<T> = Result<T, NotefallError>;

/// Top-level error taxonomy used by engine APIs.
///
/// None of these are retried automatically; re-running a render from scratch
/// is the only meaningful retry and is left to the caller.
#[derive(thiserror::Error, Debug)]
pub enum NotefallError {
    /// Invalid render parameters, surfaced before any surface work begins.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Surface, program or buffer allocation failed; fatal before frame one.
    #[error("resource init error: {0}")]
    ResourceInit(String),

    /// A frame with unexpected dimensions reached the encoder (programmer
    /// error, not retried).
    #[error("frame shape error: {0}")]
    FrameShape(String),

    /// The encoder pipe broke mid-stream; carries captured diagnostics.
    #[error("stream write error: {msg}\nencoder output: {diagnostics}")]
    StreamWrite {
        /// What failed at the write boundary.
        msg: String,
        /// Last captured stderr output from the encoder process.
        diagnostics: String,
    },

    /// The encoder exited non-zero or timed out; carries captured diagnostics.
    #[error("encoder exit error: {msg}\nencoder output: {diagnostics}")]
    EncoderExit {
        /// What the encoder reported (exit status or timeout).
        msg: String,
        /// Last captured stderr output from the encoder process.
        diagnostics: String,
    },

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NotefallError {
    /// Build a [`NotefallError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`NotefallError::ResourceInit`] value.
    pub fn resource_init(msg: impl Into<String>) -> Self {
        Self::ResourceInit(msg.into())
    }

    /// Build a [`NotefallError::FrameShape`] value.
    pub fn frame_shape(msg: impl Into<String>) -> Self {
        Self::FrameShape(msg.into())
    }

    /// Build a [`NotefallError::StreamWrite`] value.
    pub fn stream_write(msg: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        Self::StreamWrite {
            msg: msg.into(),
            diagnostics: diagnostics.into(),
        }
    }

    /// Build a [`NotefallError::EncoderExit`] value.
    pub fn encoder_exit(msg: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        Self::EncoderExit {
            msg: msg.into(),
            diagnostics: diagnostics.into(),
        }
    }

    /// Build a [`NotefallError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
