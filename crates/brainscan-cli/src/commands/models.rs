// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

use super::{ModelSource, OutputFormat};
use anyhow::Result;
use clap::Parser;

/// List the configured models.
#[derive(Parser, Debug)]
#[clap()]
pub(crate) struct Args {
    #[clap(flatten)]
    source: ModelSource,

    /// Output format: text or json.
    #[clap(long, value_enum, default_value = "text")]
    output: OutputFormat,
}

pub(super) fn list(config: Args) -> Result<()> {
    let descriptors = config.source.descriptors()?;

    match config.output {
        OutputFormat::Text => {
            for d in &descriptors {
                println!(
                    "{:12} {:20} {:10} {:?} {}",
                    d.id,
                    d.name,
                    d.channel_mode(),
                    d.input_shape,
                    d.path.display()
                );
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&descriptors)?;
            println!("{}", json);
        }
    }

    Ok(())
}
