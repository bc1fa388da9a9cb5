/*!
The label vocabulary and score classification.
 */

use crate::error::ScanError;
use serde::{Deserialize, Serialize};

/// The tumor classes every model predicts, in output-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TumorClass {
    Glioma,
    Meningioma,
    NoTumor,
    Pituitary,
}

impl TumorClass {
    pub const ALL: [TumorClass; 4] = [
        TumorClass::Glioma,
        TumorClass::Meningioma,
        TumorClass::NoTumor,
        TumorClass::Pituitary,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TumorClass::Glioma => "glioma",
            TumorClass::Meningioma => "meningioma",
            TumorClass::NoTumor => "notumor",
            TumorClass::Pituitary => "pituitary",
        }
    }
}

impl std::fmt::Display for TumorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// The winning class and its raw score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub index: usize,
    pub label: TumorClass,
    pub confidence: f32,
}

/// Index and value of the first maximum in `scores`.
///
/// The scan only moves on a strictly greater value, so ties keep the
/// earliest index.
pub fn first_argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }

        if best.map_or(true, |(_, max)| score > max) {
            best = Some((idx, score));
        }
    }

    best
}

/// Classify the output scores of `model`.
///
/// The confidence is the raw maximum, no re-normalization is applied.
pub fn classify(model: &str, scores: &[f32]) -> Result<Prediction, ScanError> {
    let (index, confidence) = first_argmax(scores)
        .ok_or_else(|| ScanError::inference(model, "the output tensor holds no scores"))?;

    let label = TumorClass::from_index(index).ok_or_else(|| {
        ScanError::inference(
            model,
            format!(
                "predicted index {} is out of bounds for {} class labels",
                index,
                TumorClass::ALL.len()
            ),
        )
    })?;

    Ok(Prediction {
        index,
        label,
        confidence,
    })
}
