// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

/*!
The boundary to the numeric engine.

Brainscan never does tensor math itself. An [`Engine`] parses a model
artifact into a [`Session`], and a session maps named input tensors to
named output tensors. This keeps the orchestration testable with a fake
engine that returns canned tensors.
 */

use crate::tensor::Tensor;
use anyhow::Result;
use std::{collections::HashMap, path::Path};

/// Named input tensors for a single run.
pub type Feeds = HashMap<String, Tensor>;

/// Named output tensors produced by a single run.
pub type Outputs = HashMap<String, Tensor>;

/// A model that has been parsed and planned by an [`Engine`] and is ready to execute.
pub trait Session: Send + Sync {
    /// Retrieve the name and shapes of the model inputs, in declaration order.
    ///
    /// Dimensions the model leaves symbolic (typically the batch) are omitted.
    fn input_shapes(&self) -> &[(String, Vec<usize>)];

    /// Retrieve the name and shapes of the model outputs, in declaration order.
    fn output_shapes(&self) -> &[(String, Vec<usize>)];

    /// Execute the model on the provided named inputs.
    fn run(&self, feeds: Feeds) -> Result<Outputs>;
}

/// Creates sessions from model artifacts.
pub trait Engine: Send + Sync {
    /// Parse and plan the model stored at `path`.
    fn load(&self, path: &Path) -> Result<Box<dyn Session>>;
}

/// Extension trait for [`Session`].
pub trait SessionExt: Session {
    /// The declared input names, in order.
    fn input_names(&self) -> Vec<&str> {
        self.input_shapes().iter().map(|(k, _)| k.as_str()).collect()
    }

    /// The declared output names, in order.
    fn output_names(&self) -> Vec<&str> {
        self.output_shapes()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

impl<T> SessionExt for T where T: Session + ?Sized {}
