/*!

# Brainscan

Brainscan classifies brain MRI slices into one of four classes
(glioma, meningioma, no tumor, pituitary) with several models side by
side, so their verdicts can be compared on the same image.

## Brainscan Core

The core crate holds the model descriptors and the pure parts of the
pipeline: decoding an upload, resampling it to a model's input size,
packing the pixels into a tensor and picking the winning class.

```no_run
# fn load_bytes(s: &str) -> Vec<u8> { vec![] }
use brainscan_core::prelude::{decode, prepare, reference_models};

let image = decode(&load_bytes("scan.png"))?;
for model in reference_models() {
    let tensor = prepare(&model, &image)?;
    println!("{}: {:?}", model.name, tensor.shape());
}
# Ok::<(), Box<dyn std::error::Error>>(())
```

## Brainscan ONNX

Loads ONNX models through tract and exposes them as sessions.

```no_run
use brainscan_core::prelude::{Engine, SessionExt};
use brainscan_onnx::OnnxEngine;
use std::path::Path;

let session = OnnxEngine.load(Path::new("models/cnn_model.onnx"))?;
println!("{:?} -> {:?}", session.input_names(), session.output_names());
# Ok::<(), Box<dyn std::error::Error>>(())
```

## Brainscan Runtime

Loads every configured model concurrently and runs each submitted
image through all of the models that loaded, isolating failures per
model.

```no_run
# async fn scan() -> anyhow::Result<()> {
use brainscan_core::prelude::reference_models;
use brainscan_onnx::OnnxEngine;
use brainscan_runtime::{Orchestrator, OrchestratorConfig, Upload};
use std::sync::Arc;

let orchestrator = Orchestrator::new(
    Arc::new(OnnxEngine),
    reference_models(),
    OrchestratorConfig::default(),
)?;
orchestrator.load_all().await;

let upload = Upload::new("scan.jpg", "image/jpeg", std::fs::read("scan.jpg")?)?;
orchestrator.submit(upload).await?;

for (id, result) in orchestrator.results().iter() {
    match result {
        Some(result) => println!("{}", result),
        None => println!("{}: no result", id),
    }
}
# Ok(())
# }
```

*/

#![warn(rust_2018_idioms)]

pub use brainscan_core as core;
pub use brainscan_onnx as onnx;
pub use brainscan_runtime as runtime;
