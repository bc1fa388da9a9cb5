// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

use thiserror::Error;

/// Errors that can be returned by brainscan.
///
/// Load-time errors are contained per model and inference-time errors
/// per model and round; only [`ScanError::NoModelsAvailable`] and
/// [`ScanError::NoImageSelected`] are meant for the whole application.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("unsupported image type {0:?}, please upload a JPG or PNG image")]
    UnsupportedMediaType(String),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("model {model} is misconfigured: {reason}")]
    ConfigMismatch { model: String, reason: String },

    #[error("model {0} has no input or output names defined")]
    MissingIoNames(String),

    #[error("failed to load {model}: {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("no models are currently loaded successfully, cannot run inference")]
    NoModelsAvailable,

    #[error("please select an image first")]
    NoImageSelected,

    #[error("inference with {model} failed: {reason}")]
    Inference { model: String, reason: String },

    #[error("{operation} of {model} timed out after {seconds:.1} s")]
    Timeout {
        operation: &'static str,
        model: String,
        seconds: f32,
    },

    #[error("an inference round is already in progress")]
    RoundInProgress,

    #[error("a newer image replaced this one before it ran")]
    Superseded,

    #[error("the inference round stopped before producing results")]
    RoundAborted,

    #[error("unknown model with id {0:?}")]
    UnknownModel(String),
}

impl ScanError {
    pub fn config(model: &str, reason: impl Into<String>) -> Self {
        Self::ConfigMismatch {
            model: model.to_owned(),
            reason: reason.into(),
        }
    }

    pub fn inference(model: &str, reason: impl std::fmt::Display) -> Self {
        Self::Inference {
            model: model.to_owned(),
            reason: reason.to_string(),
        }
    }
}
