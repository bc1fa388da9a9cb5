// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

use anyhow::Result;
use brainscan::core::prelude::{load_manifest, reference_models, ModelDescriptor};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

mod classify;
mod describe;
mod models;

/// The command to run.
#[derive(Parser, Debug)]
pub(crate) enum Command {
    Models(models::Args),
    Describe(describe::DescribeArgs),
    Classify(classify::Args),
}

pub(crate) fn run(command: Command) -> Result<()> {
    match command {
        Command::Models(config) => models::list(config),
        Command::Describe(config) => describe::describe(config),
        Command::Classify(config) => classify::classify(config),
    }
}

/// Where the model descriptors come from.
#[derive(clap::Args, Debug)]
pub(crate) struct ModelSource {
    /// A JSON manifest listing the models. Defaults to the reference models.
    #[clap(long)]
    manifest: Option<PathBuf>,

    /// Directory holding the reference model files. Ignored with --manifest.
    #[clap(long, default_value = "models")]
    model_dir: PathBuf,
}

impl ModelSource {
    pub(crate) fn descriptors(&self) -> Result<Vec<ModelDescriptor>> {
        match &self.manifest {
            Some(manifest) => load_manifest(manifest),
            None => Ok(reference_models()
                .into_iter()
                .map(|d| d.resolve_path(&self.model_dir))
                .collect()),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}
