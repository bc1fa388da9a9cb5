// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

#![allow(dead_code)]

use std::{
    collections::HashMap,
    io::Cursor,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use brainscan_core::prelude::{
    Engine, Feeds, ModelDescriptor, Outputs, Session, TargetSize, Tensor,
};
use image::{ImageBuffer, ImageFormat, Rgb};

/// What a fake session answers with.
#[derive(Clone, Debug)]
pub enum Reply {
    Scores(Vec<f32>),
    Fail(String),
    /// Returns scores under a name the session never declared.
    WrongOutput,
}

/// The behaviour of one fake model file.
#[derive(Clone, Debug)]
pub struct FakeModel {
    pub inputs: Vec<(String, Vec<usize>)>,
    pub outputs: Vec<(String, Vec<usize>)>,
    pub load_delay: Duration,
    pub load_error: Option<String>,
    pub infer_delay: Duration,
    pub reply: Reply,
}

impl FakeModel {
    /// A model answering `scores` for a 4x4 input with `channels` channels.
    pub fn scoring(channels: usize, scores: &[f32]) -> Self {
        Self {
            inputs: vec![("input_1".to_owned(), vec![4, 4, channels])],
            outputs: vec![("dense".to_owned(), vec![scores.len()])],
            load_delay: Duration::ZERO,
            load_error: None,
            infer_delay: Duration::ZERO,
            reply: Reply::Scores(scores.to_vec()),
        }
    }

    pub fn load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn infer_delay(mut self, delay: Duration) -> Self {
        self.infer_delay = delay;
        self
    }

    pub fn load_error(mut self, error: &str) -> Self {
        self.load_error = Some(error.to_owned());
        self
    }

    pub fn reply(mut self, reply: Reply) -> Self {
        self.reply = reply;
        self
    }
}

struct FakeSession {
    model: FakeModel,
}

impl Session for FakeSession {
    fn input_shapes(&self) -> &[(String, Vec<usize>)] {
        &self.model.inputs
    }

    fn output_shapes(&self) -> &[(String, Vec<usize>)] {
        &self.model.outputs
    }

    fn run(&self, feeds: Feeds) -> anyhow::Result<Outputs> {
        std::thread::sleep(self.model.infer_delay);

        let (name, _) = &self.model.inputs[0];
        let input = feeds
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("missing input {:?}", name))?;
        anyhow::ensure!(
            input.data().iter().all(|v| (0.0..=1.0).contains(v)),
            "input is not normalized"
        );

        let mut outputs = Outputs::new();
        match &self.model.reply {
            Reply::Scores(scores) => {
                let (name, _) = &self.model.outputs[0];
                outputs.insert(name.clone(), Tensor::new([1, scores.len()], scores.clone())?);
            }
            Reply::Fail(error) => anyhow::bail!("{}", error),
            Reply::WrongOutput => {
                outputs.insert("unexpected".to_owned(), Tensor::new([1, 1], vec![1.0])?);
            }
        }

        Ok(outputs)
    }
}

/// An engine serving [`FakeModel`]s by path.
#[derive(Default)]
pub struct FakeEngine {
    models: HashMap<PathBuf, FakeModel>,
    loads: AtomicUsize,
}

impl FakeEngine {
    pub fn with(mut self, path: &str, model: FakeModel) -> Self {
        self.models.insert(path.into(), model);
        self
    }

    /// How many times any model was handed to the engine.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl Engine for FakeEngine {
    fn load(&self, path: &Path) -> anyhow::Result<Box<dyn Session>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let model = self
            .models
            .get(path)
            .ok_or_else(|| anyhow::anyhow!("no such model file: {:?}", path))?
            .clone();

        std::thread::sleep(model.load_delay);
        if let Some(error) = &model.load_error {
            anyhow::bail!("{}", error);
        }

        Ok(Box::new(FakeSession { model }))
    }
}

/// A descriptor for a 4x4 model stored at `{id}.onnx`.
pub fn descriptor(id: &str, grayscale: bool) -> ModelDescriptor {
    ModelDescriptor {
        id: id.to_owned(),
        name: id.to_uppercase(),
        path: format!("{}.onnx", id).into(),
        input_shape: vec![1, 4, 4, if grayscale { 1 } else { 3 }],
        grayscale,
        target_size: TargetSize::new(4, 4),
    }
}

/// An 8x8 PNG with a horizontal gradient.
pub fn png_bytes() -> Vec<u8> {
    let image = ImageBuffer::from_fn(8, 8, |x, y| Rgb([(x * 30) as u8, (y * 30) as u8, 128]));

    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

pub fn engine(engine: FakeEngine) -> Arc<dyn Engine> {
    Arc::new(engine)
}
