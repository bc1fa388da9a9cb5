// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

/*!
The per-model lifecycle record.

Records are immutable; a transition builds a new record which the
registry swaps in whole. The lifecycle enum carries the session and the
resolved tensor names only when loaded and the error only when failed,
so the invariants hold by construction.
 */

use brainscan_core::prelude::{ModelDescriptor, ScanError, Session, SessionExt};
use serde::Serialize;
use std::{fmt, sync::Arc};

/// The load state of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Idle,
    Loading,
    Loaded,
    Failed,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Idle => f.pad("idle"),
            LoadStatus::Loading => f.pad("loading"),
            LoadStatus::Loaded => f.pad("loaded"),
            LoadStatus::Failed => f.pad("failed"),
        }
    }
}

#[derive(Clone)]
enum Lifecycle {
    Idle,
    Loading,
    Loaded {
        session: Arc<dyn Session>,
        input_name: String,
        output_name: String,
    },
    Failed {
        error: String,
    },
}

/// The lifecycle record of one configured model.
#[derive(Clone)]
pub struct ModelRuntime {
    descriptor: Arc<ModelDescriptor>,
    lifecycle: Lifecycle,
}

impl ModelRuntime {
    /// A fresh record in [`LoadStatus::Idle`].
    pub fn new(descriptor: Arc<ModelDescriptor>) -> Self {
        Self {
            descriptor,
            lifecycle: Lifecycle::Idle,
        }
    }

    pub fn descriptor(&self) -> &Arc<ModelDescriptor> {
        &self.descriptor
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn status(&self) -> LoadStatus {
        match self.lifecycle {
            Lifecycle::Idle => LoadStatus::Idle,
            Lifecycle::Loading => LoadStatus::Loading,
            Lifecycle::Loaded { .. } => LoadStatus::Loaded,
            Lifecycle::Failed { .. } => LoadStatus::Failed,
        }
    }

    pub fn session(&self) -> Option<&Arc<dyn Session>> {
        match &self.lifecycle {
            Lifecycle::Loaded { session, .. } => Some(session),
            _ => None,
        }
    }

    /// The input tensor name adopted at load time.
    pub fn input_name(&self) -> Option<&str> {
        match &self.lifecycle {
            Lifecycle::Loaded { input_name, .. } => Some(input_name),
            _ => None,
        }
    }

    /// The output tensor name adopted at load time.
    pub fn output_name(&self) -> Option<&str> {
        match &self.lifecycle {
            Lifecycle::Loaded { output_name, .. } => Some(output_name),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.lifecycle {
            Lifecycle::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub(crate) fn loading(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            lifecycle: Lifecycle::Loading,
        }
    }

    /// Adopt `session`, taking its first input and output names.
    ///
    /// # Errors
    ///
    /// [`ScanError::MissingIoNames`] if either name list is empty, and
    /// [`ScanError::ConfigMismatch`] if the session reports a concrete
    /// input shape that disagrees with the descriptor.
    pub(crate) fn loaded(&self, session: Arc<dyn Session>) -> Result<Self, ScanError> {
        let (input_name, output_name) =
            match (session.input_names().first(), session.output_names().first()) {
                (Some(input), Some(output)) => ((*input).to_owned(), (*output).to_owned()),
                _ => return Err(ScanError::MissingIoNames(self.descriptor.name.clone())),
            };

        if let Some((_, shape)) = session.input_shapes().first() {
            self.descriptor.check_reported_shape(shape)?;
        }

        Ok(Self {
            descriptor: self.descriptor.clone(),
            lifecycle: Lifecycle::Loaded {
                session,
                input_name,
                output_name,
            },
        })
    }

    pub(crate) fn failed(&self, error: impl fmt::Display) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            lifecycle: Lifecycle::Failed {
                error: error.to_string(),
            },
        }
    }
}

impl fmt::Debug for ModelRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRuntime")
            .field("id", &self.descriptor.id)
            .field("status", &self.status())
            .field("input_name", &self.input_name())
            .field("output_name", &self.output_name())
            .field("error", &self.error())
            .finish()
    }
}
