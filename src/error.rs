use crate::keys::{ModifierState, PhysicalKey};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeymapError {
    #[error("Keyboard source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Cannot translate {key} with modifiers '{modifiers}'")]
    TranslationUnresolved {
        key: PhysicalKey,
        modifiers: ModifierState,
    },

    #[error("Keyboard query did not complete within {0:?}")]
    Timeout(Duration),

    #[error("Scan-code table inconsistency: {0}")]
    Consistency(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KeymapError {
    /// Runtime conditions are absorbed into empty/absent results.
    /// Everything else is a defect or a setup problem and must surface.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable(_) | Self::TranslationUnresolved { .. } | Self::Timeout(_)
        )
    }

    pub(crate) fn unavailable(reason: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable(reason.to_string())
    }
}

pub type KmResult<T> = Result<T, KeymapError>;

/// Observer for errors the query service swallowed on the caller's behalf.
pub type ErrorHook = Arc<dyn Fn(&KeymapError) + Send + Sync>;
