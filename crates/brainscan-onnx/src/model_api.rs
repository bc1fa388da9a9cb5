// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

use anyhow::Result;
use tract_onnx::{
    prelude::{InferenceModel, OutletId},
    tract_hir::infer::Factoid,
};

/// The `ModelApi` describes the inputs and outputs for a model.
#[derive(Debug)]
pub struct ModelApi {
    /// The named model inputs, with symbolic dimensions dropped.
    pub inputs: Vec<(String, Vec<usize>)>,

    /// The named model outputs, with symbolic dimensions dropped.
    pub outputs: Vec<(String, Vec<usize>)>,

    /// The full input shapes used for planning, with symbolic dimensions pinned to 1.
    pub(crate) planned_inputs: Vec<Vec<usize>>,
}

fn clean_name(raw: &str) -> String {
    raw.split(':').next().unwrap_or(raw).to_owned()
}

fn dims(model: &InferenceModel, outlet: OutletId) -> Result<Vec<Option<usize>>> {
    let fact = model.outlet_fact(outlet)?;
    Ok(fact
        .shape
        .dims()
        .map(|value| {
            value
                .concretize()
                .and_then(|v| v.to_i64().ok())
                .map(|v| v as usize)
        })
        .collect())
}

impl ModelApi {
    /// Extract the model API from the provided inference model.
    pub fn for_model(model: &InferenceModel) -> Result<Self> {
        let mut inputs = vec![];
        let mut planned_inputs = vec![];

        for input_outlet in model.input_outlets()? {
            let name = clean_name(&model.node(input_outlet.node).name);
            let dims = dims(model, *input_outlet)?;

            inputs.push((name, dims.iter().flatten().copied().collect()));
            planned_inputs.push(dims.iter().map(|d| d.unwrap_or(1)).collect());
        }

        let mut outputs = vec![];
        for output_outlet in model.output_outlets()? {
            let name = match model.outlet_label(*output_outlet) {
                Some(label) => clean_name(label),
                None => clean_name(&model.node(output_outlet.node).name),
            };

            let dims = dims(model, *output_outlet)?;
            outputs.push((name, dims.into_iter().flatten().collect()));
        }

        Ok(Self {
            inputs,
            outputs,
            planned_inputs,
        })
    }
}
