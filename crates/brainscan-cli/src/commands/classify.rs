// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

use super::{ModelSource, OutputFormat};
use anyhow::{Context, Result};
use brainscan::core::prelude::{MediaType, ScanError};
use brainscan::onnx::OnnxEngine;
use brainscan::runtime::{
    InferenceResult, LoadStatus, Orchestrator, OrchestratorConfig, Submission, Upload,
};
use clap::Parser;
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

/// Classify images with every configured model.
#[derive(Parser, Debug)]
#[clap()]
pub(crate) struct Args {
    /// The images to classify, JPEG or PNG.
    #[clap(required = true)]
    images: Vec<PathBuf>,

    #[clap(flatten)]
    source: ModelSource,

    /// Seconds to wait for a single model to load.
    #[clap(long, default_value = "120")]
    load_timeout_secs: u64,

    /// Seconds to wait for a single model to classify an image.
    #[clap(long, default_value = "30")]
    inference_timeout_secs: u64,

    /// Output format: text or json.
    #[clap(long, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Serialize)]
struct ModelRecord {
    id: String,
    name: String,
    status: LoadStatus,
    error: Option<String>,
    mean_processing_time_ms: Option<f64>,
}

#[derive(Serialize)]
struct ImageRecord {
    image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    results: Vec<InferenceResult>,
}

#[derive(Serialize)]
struct Report {
    models: Vec<ModelRecord>,
    images: Vec<ImageRecord>,
}

fn as_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Build an upload, taking the media type from the file extension.
fn upload_for(path: &Path) -> Result<Upload> {
    let mime = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(MediaType::from_extension)
        .map(MediaType::mime)
        .ok_or_else(|| ScanError::UnsupportedMediaType(path.display().to_string()))?;

    let bytes = std::fs::read(path).with_context(|| format!("failed reading {:?}", path))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(Upload::new(name, mime, bytes)?)
}

fn skipped(path: &Path, error: &anyhow::Error) -> ImageRecord {
    log::warn!("skipping {}: {:#}", path.display(), error);
    ImageRecord {
        image: path.display().to_string(),
        error: Some(format!("{:#}", error)),
        results: vec![],
    }
}

pub(super) fn classify(config: Args) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

async fn run(config: Args) -> Result<()> {
    let text = config.output == OutputFormat::Text;
    let orchestrator = Orchestrator::new(
        Arc::new(OnnxEngine),
        config.source.descriptors()?,
        OrchestratorConfig {
            load_timeout: Duration::from_secs(config.load_timeout_secs),
            inference_timeout: Duration::from_secs(config.inference_timeout_secs),
        },
    )?;

    log::debug!(
        "classifying {} image(s) with {} model(s)",
        config.images.len(),
        orchestrator.registry().len()
    );
    orchestrator.load_all().await;

    if text {
        for record in orchestrator.registry().snapshot() {
            match record.error() {
                Some(error) => println!("{:20} {:8} {}", record.name(), record.status(), error),
                None => println!("{:20} {}", record.name(), record.status()),
            }
        }
    }

    if !orchestrator.registry().any_loaded() {
        log::error!("none of the {} model(s) loaded", orchestrator.registry().len());
        return Err(ScanError::NoModelsAvailable.into());
    }

    let mut images = Vec::with_capacity(config.images.len());
    for path in &config.images {
        let upload = match upload_for(path) {
            Ok(upload) => upload,
            Err(e) => {
                if text {
                    println!("\n{}: {:#}", path.display(), e);
                }

                images.push(skipped(path, &e));
                continue;
            }
        };

        let results = match orchestrator.submit(upload).await? {
            Submission::Completed(results) => results,
            Submission::Queued(pending) | Submission::Deferred(pending) => pending.wait().await?,
        };

        if text {
            println!("\n{}:", path.display());
            for result in &results {
                println!("  {}", result);
            }
        }

        images.push(ImageRecord {
            image: path.display().to_string(),
            error: None,
            results,
        });
    }

    let models = orchestrator
        .registry()
        .snapshot()
        .into_iter()
        .map(|record| ModelRecord {
            id: record.id().to_owned(),
            name: record.name().to_owned(),
            status: record.status(),
            error: record.error().map(str::to_owned),
            mean_processing_time_ms: orchestrator.mean_processing_time(record.id()).map(as_ms),
        })
        .collect::<Vec<_>>();

    match config.output {
        OutputFormat::Text if config.images.len() > 1 => {
            println!("\nMean processing time:");
            for model in &models {
                if let Some(stats) = orchestrator.timing_stats(&model.id) {
                    println!(
                        "  {:20} {:.2} ms ± {:.2} over {} image(s)",
                        model.name,
                        as_ms(stats.mean()),
                        as_ms(stats.std_dev()),
                        stats.count()
                    );
                }
            }
        }
        OutputFormat::Text => {}
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&Report { models, images })?;
            println!("{}", json);
        }
    }

    Ok(())
}
