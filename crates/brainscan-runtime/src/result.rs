// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

use brainscan_core::prelude::{ModelDescriptor, Prediction, TumorClass};
use serde::{Serialize, Serializer};
use std::{fmt, time::Duration};

/// What a single inference attempt produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Classified { label: TumorClass, confidence: f32 },
    Failed { error: String },
}

fn as_millis<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) => s.serialize_some(&(d.as_secs_f64() * 1000.0)),
        None => s.serialize_none(),
    }
}

/// The result of running one model on one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceResult {
    pub model_id: String,
    pub model_name: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(rename = "processing_time_ms", serialize_with = "as_millis")]
    pub processing_time: Option<Duration>,
}

impl InferenceResult {
    pub fn classified(
        descriptor: &ModelDescriptor,
        prediction: Prediction,
        processing_time: Duration,
    ) -> Self {
        Self {
            model_id: descriptor.id.clone(),
            model_name: descriptor.name.clone(),
            outcome: Outcome::Classified {
                label: prediction.label,
                confidence: prediction.confidence,
            },
            processing_time: Some(processing_time),
        }
    }

    pub fn failed(
        descriptor: &ModelDescriptor,
        error: impl fmt::Display,
        processing_time: Option<Duration>,
    ) -> Self {
        Self {
            model_id: descriptor.id.clone(),
            model_name: descriptor.name.clone(),
            outcome: Outcome::Failed {
                error: error.to_string(),
            },
            processing_time,
        }
    }

    pub fn is_classified(&self) -> bool {
        matches!(self.outcome, Outcome::Classified { .. })
    }

    pub fn label(&self) -> Option<TumorClass> {
        match self.outcome {
            Outcome::Classified { label, .. } => Some(label),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn confidence(&self) -> Option<f32> {
        match self.outcome {
            Outcome::Classified { confidence, .. } => Some(confidence),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failed { error } => Some(error),
            Outcome::Classified { .. } => None,
        }
    }

    /// Confidence as a percentage with two decimals, e.g. `97.12%`.
    pub fn confidence_percent(&self) -> Option<String> {
        self.confidence().map(|c| format!("{:.2}%", c * 100.0))
    }

    /// Processing time in milliseconds with two decimals, e.g. `12.34 ms`.
    pub fn processing_time_ms(&self) -> Option<String> {
        self.processing_time
            .map(|d| format!("{:.2} ms", d.as_secs_f64() * 1000.0))
    }
}

impl fmt::Display for InferenceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Classified { label, .. } => write!(
                f,
                "{}: {} ({})",
                self.model_name,
                label,
                self.confidence_percent().unwrap_or_default()
            )?,
            Outcome::Failed { error } => write!(f, "{}: error: {}", self.model_name, error)?,
        }

        if let Some(time) = self.processing_time_ms() {
            write!(f, " in {}", time)?;
        }

        Ok(())
    }
}

/// One result slot per configured model, in configuration order.
///
/// A slot is empty while its model has no result for the current image.
#[derive(Debug, Clone, Default)]
pub struct ResultSlots {
    slots: Vec<(String, Option<InferenceResult>)>,
}

impl ResultSlots {
    pub fn new(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            slots: ids.into_iter().map(|id| (id, None)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&InferenceResult> {
        self.slots
            .iter()
            .find(|(k, _)| k == id)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&InferenceResult>)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// The filled slots, in configuration order.
    pub fn completed(&self) -> Vec<InferenceResult> {
        self.slots.iter().filter_map(|(_, v)| v.clone()).collect()
    }

    pub fn clear_all(&mut self) {
        for (_, slot) in &mut self.slots {
            *slot = None;
        }
    }

    /// Empty the slots of `ids`, leaving every other slot untouched.
    pub fn clear<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            if let Some((_, slot)) = self.slots.iter_mut().find(|(k, _)| k == id) {
                *slot = None;
            }
        }
    }

    /// Store `result` in its model's slot. Returns false for an unknown model.
    pub fn set(&mut self, result: InferenceResult) -> bool {
        match self.slots.iter_mut().find(|(k, _)| *k == result.model_id) {
            Some((_, slot)) => {
                *slot = Some(result);
                true
            }
            None => false,
        }
    }
}
