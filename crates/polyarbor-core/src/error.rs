use thiserror::Error;

use crate::layer::LayerId;

/// Failures while bringing an audio clock online.
///
/// These are never fatal: the engine stays logically playing and anchors the
/// cycle once a later activation succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("audio activation denied by host: {0}")]
    ActivationDenied(String),
    #[error("audio backend unavailable: {0}")]
    Unavailable(String),
}

/// Rejected layer edits.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayerError {
    #[error("beats must be at least 1 (got {0})")]
    InvalidBeats(u32),
    #[error("speed must be positive and finite (got {0})")]
    InvalidSpeed(f64),
    #[error("frequency must be positive and finite (got {0})")]
    InvalidFrequency(f32),
    #[error("layer limit of {0} reached")]
    LimitReached(usize),
    #[error("no layer with id {0}")]
    UnknownLayer(LayerId),
}
