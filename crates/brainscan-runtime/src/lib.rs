// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

/*!
The brainscan runtime loads a set of classification models side by side
and runs every loaded model on each submitted image.

Each model moves through its own lifecycle: idle, loading, then loaded
or failed. A model that fails to load, or fails on an image, only
affects its own result; the remaining models carry on.

```no_run
use brainscan_core::prelude::reference_models;
use brainscan_onnx::OnnxEngine;
use brainscan_runtime::{Orchestrator, OrchestratorConfig, Submission, Upload};
use std::sync::Arc;

# async fn scan() -> anyhow::Result<()> {
let orchestrator = Orchestrator::new(
    Arc::new(OnnxEngine),
    reference_models(),
    OrchestratorConfig::default(),
)?;
orchestrator.load_all().await;

let bytes = std::fs::read("scan.png")?;
let upload = Upload::new("scan.png", "image/png", bytes)?;

if let Submission::Completed(results) = orchestrator.submit(upload).await? {
    for result in results {
        println!("{}", result);
    }
}
# Ok(())
# }
```

## Rounds

Only one inference round runs at a time. Submitting while a round runs
queues the image; if several arrive, only the latest is kept and the
older ones resolve to [`ScanError::Superseded`]. Each round works on
the models that were loaded when it started, so a model finishing its
load mid-round joins from the next round on.

Rounds run on their own tasks: a submitter that gives up waiting does
not stop its round or the images queued behind it.

[`ScanError::Superseded`]: brainscan_core::prelude::ScanError::Superseded
 */

#![warn(rust_2018_idioms)]

mod gate;
mod orchestrator;
mod registry;
mod result;
mod state;
mod timing;

pub use gate::RoundState;
pub use orchestrator::{Orchestrator, OrchestratorConfig, PendingRound, Submission, Upload};
pub use registry::Registry;
pub use result::{InferenceResult, Outcome, ResultSlots};
pub use state::{LoadStatus, ModelRuntime};
pub use timing::TimingStats;
