// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

use anyhow::{bail, Result};
use brainscan::core::prelude::Engine;
use brainscan::onnx::OnnxEngine;
use clap::Parser;
use std::path::PathBuf;

/// Print the inputs and outputs of a model file.
#[derive(Parser, Debug)]
#[clap()]
pub(crate) struct DescribeArgs {
    /// The model file to inspect, in ONNX format.
    file: PathBuf,
}

pub(super) fn describe(config: DescribeArgs) -> Result<()> {
    let session = match config.file.extension().and_then(|ext| ext.to_str()) {
        Some("onnx") => OnnxEngine.load(&config.file)?,
        Some(other) => bail!("unknown file type {:?}", other),
        None => bail!("missing file extension {:?}", config.file),
    };

    println!("Inputs:");
    for (name, shape) in session.input_shapes() {
        println!("\t{:40}: {:?}", name, shape);
    }

    println!("\nOutputs:");
    for (name, shape) in session.output_shapes() {
        println!("\t{:40}: {:?}", name, shape);
    }
    Ok(())
}
