// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

/*!
Static model configuration.

A [`ModelDescriptor`] is fixed for the lifetime of the process: where
the model artifact lives, which NHWC input shape it takes, and how an
image must be sized and converted before it is fed to it.
 */

use crate::error::ScanError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

/// The pixel layout a model expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    /// One luma channel per pixel.
    Grayscale,
    /// Interleaved R, G, B channels per pixel.
    Rgb,
}

impl ChannelMode {
    pub fn channels(self) -> usize {
        match self {
            ChannelMode::Grayscale => 1,
            ChannelMode::Rgb => 3,
        }
    }
}

impl std::fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelMode::Grayscale => f.pad("grayscale"),
            ChannelMode::Rgb => f.pad("rgb"),
        }
    }
}

/// The spatial size an image is resampled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Static description of one configured model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Unique identifier, used to key runtime records and results.
    pub id: String,

    /// Human readable name.
    pub name: String,

    /// Location of the model artifact.
    pub path: PathBuf,

    /// Input tensor shape as `[batch, height, width, channels]`.
    pub input_shape: Vec<usize>,

    /// Whether the model takes single-channel luma input instead of RGB.
    pub grayscale: bool,

    /// Size the image is resampled to before conversion.
    pub target_size: TargetSize,
}

impl ModelDescriptor {
    pub fn channel_mode(&self) -> ChannelMode {
        if self.grayscale {
            ChannelMode::Grayscale
        } else {
            ChannelMode::Rgb
        }
    }

    /// Check that the declared input shape agrees with the channel mode and target size.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ConfigMismatch`] describing the first disagreement found.
    pub fn validate(&self) -> Result<(), ScanError> {
        let &[batch, height, width, channels] = self.input_shape.as_slice() else {
            return Err(ScanError::config(
                &self.id,
                format!(
                    "input shape {:?} is not [batch, height, width, channels]",
                    self.input_shape
                ),
            ));
        };

        if batch != 1 {
            return Err(ScanError::config(
                &self.id,
                format!("expected a batch size of 1, found {}", batch),
            ));
        }

        let mode = self.channel_mode();
        if channels != mode.channels() {
            return Err(ScanError::config(
                &self.id,
                format!(
                    "{} input needs {} channel(s) but the input shape declares {}",
                    mode,
                    mode.channels(),
                    channels
                ),
            ));
        }

        if height != self.target_size.height as usize || width != self.target_size.width as usize
        {
            return Err(ScanError::config(
                &self.id,
                format!(
                    "input shape is {}x{} (HxW) but the target size is {}x{}",
                    height, width, self.target_size.height, self.target_size.width
                ),
            ));
        }

        Ok(())
    }

    /// Check a shape reported by the engine for the first model input against this descriptor.
    ///
    /// Shapes where the engine left the batch symbolic are compared
    /// without it. Shapes of any other rank carry too little information
    /// and are accepted.
    pub fn check_reported_shape(&self, reported: &[usize]) -> Result<(), ScanError> {
        let expected = match reported.len() {
            4 => &self.input_shape[..],
            3 if self.input_shape.len() == 4 => &self.input_shape[1..],
            _ => return Ok(()),
        };

        if reported != expected {
            return Err(ScanError::config(
                &self.id,
                format!(
                    "model reports input shape {:?} but {:?} is configured",
                    reported, self.input_shape
                ),
            ));
        }

        Ok(())
    }

    /// Resolve a relative model path against `base`.
    pub fn resolve_path(mut self, base: &Path) -> Self {
        if self.path.is_relative() {
            self.path = base.join(&self.path);
        }
        self
    }
}

fn descriptor(id: &str, name: &str, side: u32, grayscale: bool) -> ModelDescriptor {
    let channels = if grayscale { 1 } else { 3 };
    ModelDescriptor {
        id: id.to_owned(),
        name: name.to_owned(),
        path: PathBuf::from(format!("model_{}.onnx", id)),
        input_shape: vec![1, side as usize, side as usize, channels],
        grayscale,
        target_size: TargetSize::new(side, side),
    }
}

/// The six brain-MRI classifiers of the reference deployment.
///
/// Only the CNN and MobileNetV2 shapes are known to match their
/// artifacts; the remaining four assume the MobileNetV2 layout, which
/// the load-time shape check will catch if wrong.
pub fn reference_models() -> Vec<ModelDescriptor> {
    vec![
        descriptor("cnn", "CNN Model", 150, true),
        descriptor("mobilenet", "MobileNetV2 Model", 224, false),
        descriptor("densenet169", "DenseNet169 Model", 224, false),
        descriptor("mobilenetv3", "MobileNetV3 Model", 224, false),
        descriptor("resnet152", "ResNet152 Model", 224, false),
        descriptor("vgg19", "VGG19 Model", 224, false),
    ]
}

/// Ensure no two descriptors share an id.
pub fn check_unique_ids(descriptors: &[ModelDescriptor]) -> Result<(), ScanError> {
    let mut seen = HashSet::with_capacity(descriptors.len());
    for descriptor in descriptors {
        if !seen.insert(descriptor.id.as_str()) {
            return Err(ScanError::config(
                &descriptor.id,
                "the id is configured more than once",
            ));
        }
    }

    Ok(())
}

/// Load a JSON manifest holding a list of descriptors.
///
/// Relative model paths are resolved against the manifest's directory.
pub fn load_manifest(path: &Path) -> Result<Vec<ModelDescriptor>> {
    let file =
        File::open(path).with_context(|| format!("failed opening manifest {:?}", path))?;
    let descriptors: Vec<ModelDescriptor> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed parsing manifest {:?}", path))?;

    check_unique_ids(&descriptors)?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(descriptors
        .into_iter()
        .map(|d| d.resolve_path(base))
        .collect())
}
