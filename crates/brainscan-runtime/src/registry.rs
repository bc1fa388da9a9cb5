// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

use crate::state::{LoadStatus, ModelRuntime};
use brainscan_core::prelude::{check_unique_ids, ModelDescriptor, ScanError};
use parking_lot::RwLock;
use std::sync::Arc;

/// The shared table of model lifecycle records, in configuration order.
///
/// Writes replace a whole record by id, so readers only ever observe a
/// record from before or after a transition.
pub struct Registry {
    records: RwLock<Vec<Arc<ModelRuntime>>>,
}

impl Registry {
    /// Create a registry with every descriptor in [`LoadStatus::Idle`].
    pub fn new(descriptors: Vec<ModelDescriptor>) -> Result<Self, ScanError> {
        check_unique_ids(&descriptors)?;

        let records = descriptors
            .into_iter()
            .map(|d| Arc::new(ModelRuntime::new(Arc::new(d))))
            .collect();

        Ok(Self {
            records: RwLock::new(records),
        })
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Arc<ModelRuntime>> {
        self.records.read().iter().find(|r| r.id() == id).cloned()
    }

    /// All records as of now.
    pub fn snapshot(&self) -> Vec<Arc<ModelRuntime>> {
        self.records.read().clone()
    }

    /// The records currently in [`LoadStatus::Loaded`].
    pub fn loaded(&self) -> Vec<Arc<ModelRuntime>> {
        self.with_status(LoadStatus::Loaded)
    }

    pub fn with_status(&self, status: LoadStatus) -> Vec<Arc<ModelRuntime>> {
        self.records
            .read()
            .iter()
            .filter(|r| r.status() == status)
            .cloned()
            .collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.records
            .read()
            .iter()
            .map(|r| r.id().to_owned())
            .collect()
    }

    pub fn any_loaded(&self) -> bool {
        self.records
            .read()
            .iter()
            .any(|r| r.status() == LoadStatus::Loaded)
    }

    /// Whether some model has not settled yet.
    pub fn any_pending(&self) -> bool {
        self.records
            .read()
            .iter()
            .any(|r| matches!(r.status(), LoadStatus::Idle | LoadStatus::Loading))
    }

    /// Whether every model failed to load. False for an empty registry.
    pub fn all_failed(&self) -> bool {
        let records = self.records.read();
        !records.is_empty() && records.iter().all(|r| r.status() == LoadStatus::Failed)
    }

    /// Move the model `id` from [`LoadStatus::Idle`] to
    /// [`LoadStatus::Loading`], returning the new record.
    ///
    /// Returns `None` if the model already left idle, so only one
    /// caller ever loads a given model.
    pub(crate) fn begin_loading(&self, id: &str) -> Result<Option<Arc<ModelRuntime>>, ScanError> {
        let mut records = self.records.write();
        let slot = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| ScanError::UnknownModel(id.to_owned()))?;

        if slot.status() != LoadStatus::Idle {
            return Ok(None);
        }

        let loading = Arc::new(slot.loading());
        *slot = loading.clone();
        Ok(Some(loading))
    }

    /// Swap in `record` for the entry with the same id.
    pub(crate) fn replace(&self, record: ModelRuntime) -> Result<Arc<ModelRuntime>, ScanError> {
        let mut records = self.records.write();
        let slot = records
            .iter_mut()
            .find(|r| r.id() == record.id())
            .ok_or_else(|| ScanError::UnknownModel(record.id().to_owned()))?;

        let record = Arc::new(record);
        *slot = record.clone();
        Ok(record)
    }
}
