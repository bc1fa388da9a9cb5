//! Contains the ONNX engine for brainscan, backed by tract-onnx.

#![warn(rust_2018_idioms)]

mod model_api;

pub use model_api::ModelApi;
pub use tract_onnx;

use anyhow::{bail, Context, Result};
use brainscan_core::{
    session::{Engine, Feeds, Outputs, Session},
    tensor::Tensor,
};
use std::{io::Read, path::Path};
use tract_onnx::prelude::{
    tvec, Datum, Framework, InferenceFact, InferenceModel, InferenceModelExt, TDim, TVec, TValue,
    Tensor as TractTensor, ToDim, TypedModel, TypedSimplePlan,
};

fn model_for_reader(reader: &mut dyn Read) -> Result<InferenceModel> {
    let onnx = tract_onnx::onnx();
    onnx.model_for_read(reader)
}

fn build_plan(mut model: InferenceModel, api: &ModelApi) -> Result<TypedSimplePlan<TypedModel>> {
    let outlets = model.output_outlets()?.len();
    for output in 0..outlets {
        model.set_output_fact(output, Default::default())?;
    }

    for (idx, shape) in api.planned_inputs.iter().enumerate() {
        if shape.is_empty() {
            continue;
        }

        let full_shape: TVec<TDim> = shape.iter().map(|v| v.to_dim()).collect();
        model.set_input_fact(idx, InferenceFact::dt_shape(f32::datum_type(), full_shape))?;
    }

    model
        .into_typed()?
        .into_decluttered()?
        .into_optimized()?
        .into_runnable()
}

/// A planned ONNX model with the batch dimension pinned to 1.
pub struct OnnxSession {
    plan: TypedSimplePlan<TypedModel>,
    api: ModelApi,
}

impl OnnxSession {
    /// Parse and plan an ONNX model from `reader`.
    pub fn from_reader(reader: &mut dyn Read) -> Result<Self> {
        let model = model_for_reader(reader)?;
        let api = ModelApi::for_model(&model)?;
        let plan = build_plan(model, &api)?;

        Ok(Self { plan, api })
    }

    fn build_inputs(&self, mut feeds: Feeds) -> Result<TVec<TValue>> {
        let mut inputs = tvec![];

        for ((name, _), shape) in self.api.inputs.iter().zip(&self.api.planned_inputs) {
            let tensor = match feeds.remove(name) {
                Some(tensor) => tensor,
                None => bail!("missing input tensor {:?}", name),
            };

            if !shape.is_empty() && tensor.shape() != shape.as_slice() {
                bail!(
                    "input {:?} has shape {:?} but the model expects {:?}",
                    name,
                    tensor.shape(),
                    shape
                );
            }

            let tensor = TractTensor::from_shape(tensor.shape(), tensor.data())?;
            inputs.push(tensor.into());
        }

        Ok(inputs)
    }
}

impl Session for OnnxSession {
    fn input_shapes(&self) -> &[(String, Vec<usize>)] {
        &self.api.inputs
    }

    fn output_shapes(&self) -> &[(String, Vec<usize>)] {
        &self.api.outputs
    }

    fn run(&self, feeds: Feeds) -> Result<Outputs> {
        let inputs = self.build_inputs(feeds)?;
        let result = self.plan.run(inputs)?;

        let mut outputs = Outputs::with_capacity(result.len());
        for ((name, _), value) in self.api.outputs.iter().zip(result.iter()) {
            let data = value
                .cast_to::<f32>()
                .with_context(|| format!("output {:?} is not numeric", name))?;
            let tensor = Tensor::new(value.shape(), data.as_slice::<f32>()?.to_vec())?;
            outputs.insert(name.clone(), tensor);
        }

        Ok(outputs)
    }
}

/// The tract-backed [`Engine`].
#[derive(Debug, Default, Clone, Copy)]
pub struct OnnxEngine;

impl Engine for OnnxEngine {
    fn load(&self, path: &Path) -> Result<Box<dyn Session>> {
        let mut reader = std::fs::File::open(path)
            .with_context(|| format!("failed opening model file {:?}", path))?;
        let session = OnnxSession::from_reader(&mut reader)?;

        log::debug!(
            "planned {:?}: inputs {:?}, outputs {:?}",
            path,
            session.api.inputs,
            session.api.outputs
        );

        Ok(Box::new(session))
    }
}
