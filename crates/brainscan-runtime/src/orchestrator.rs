// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

/*!
Concurrent loading and inference across all configured models.

Engine calls are blocking, so each one runs on tokio's blocking pool
under its own timeout. A timeout settles the slot but cannot stop the
engine call itself, which finishes in the background and is dropped.
 */

use crate::{
    gate::{Admission, RoundGate, RoundPermit, RoundState},
    registry::Registry,
    result::{InferenceResult, ResultSlots},
    state::ModelRuntime,
    timing::TimingStats,
};
use brainscan_core::prelude::{
    classify, decode, prepare, Engine, Feeds, MediaType, ModelDescriptor, Prediction, ScanError,
};
use futures::future::join_all;
use image::DynamicImage;
use parking_lot::{Mutex, RwLock};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{sync::oneshot, task::JoinError, time::timeout};

/// Timeouts applied at the engine boundary.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub load_timeout: Duration,
    pub inference_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            load_timeout: Duration::from_secs(120),
            inference_timeout: Duration::from_secs(30),
        }
    }
}

/// An accepted image upload.
#[derive(Debug, Clone)]
pub struct Upload {
    name: String,
    media_type: MediaType,
    bytes: Arc<[u8]>,
}

impl Upload {
    /// Accept an upload, rejecting anything but JPEG and PNG.
    pub fn new(
        name: impl Into<String>,
        mime: &str,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<Self, ScanError> {
        Ok(Self {
            name: name.into(),
            media_type: MediaType::from_mime(mime)?,
            bytes: bytes.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

type RoundResult = Result<Vec<InferenceResult>, ScanError>;

/// What happened to a submitted image.
#[derive(Debug)]
pub enum Submission {
    /// The image ran immediately; these are its results.
    Completed(Vec<InferenceResult>),
    /// A round was running; the image runs right after it unless replaced by a newer one.
    Queued(PendingRound),
    /// No model has loaded yet; the image runs once loading settles.
    Deferred(PendingRound),
}

/// The outcome of a queued or deferred image, delivered once it has run.
#[derive(Debug)]
pub struct PendingRound {
    reply: oneshot::Receiver<RoundResult>,
}

impl PendingRound {
    /// Wait for the image's round to finish.
    ///
    /// # Errors
    ///
    /// [`ScanError::Superseded`] if a newer image took its place,
    /// [`ScanError::NoModelsAvailable`] if loading settled without any
    /// model, and [`ScanError::RoundAborted`] if the round stopped
    /// without producing results.
    pub async fn wait(self) -> Result<Vec<InferenceResult>, ScanError> {
        self.reply.await.unwrap_or(Err(ScanError::RoundAborted))
    }
}

/// An upload waiting for, or running in, a round.
struct Request {
    upload: Upload,
    reply: oneshot::Sender<RoundResult>,
}

impl Request {
    fn new(upload: Upload) -> (Self, PendingRound) {
        let (reply, receiver) = oneshot::channel();
        (Self { upload, reply }, PendingRound { reply: receiver })
    }

    fn finish(self, outcome: RoundResult) {
        // the submitter may have stopped listening
        let _ = self.reply.send(outcome);
    }

    fn supersede(self) {
        log::debug!("{} replaced by a newer image", self.upload.name());
        self.finish(Err(ScanError::Superseded));
    }
}

/// Drives model loading and inference rounds over a shared [`Registry`].
///
/// Loads and rounds run on spawned tasks, so dropping a future returned
/// here never leaves a model half loaded or a queued image stranded.
/// Cloning is cheap and every clone drives the same models.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    engine: Arc<dyn Engine>,
    registry: Arc<Registry>,
    results: RwLock<ResultSlots>,
    gate: Arc<RoundGate<Request>>,
    selected: Mutex<Option<Upload>>,
    timings: Mutex<HashMap<String, TimingStats>>,
    config: OrchestratorConfig,
}

fn settle<T>(
    outcome: Result<Result<Result<T, ScanError>, JoinError>, tokio::time::error::Elapsed>,
    on_panic: impl FnOnce(JoinError) -> ScanError,
    on_timeout: impl FnOnce() -> ScanError,
) -> Result<T, ScanError> {
    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(on_panic(join)),
        Err(_) => Err(on_timeout()),
    }
}

async fn blocking<T, F>(
    limit: Duration,
    f: F,
) -> Result<Result<Result<T, ScanError>, JoinError>, tokio::time::error::Elapsed>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ScanError> + Send + 'static,
{
    timeout(limit, tokio::task::spawn_blocking(f)).await
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn Engine>,
        descriptors: Vec<ModelDescriptor>,
        config: OrchestratorConfig,
    ) -> Result<Self, ScanError> {
        let registry = Arc::new(Registry::new(descriptors)?);
        let results = RwLock::new(ResultSlots::new(registry.ids()));

        Ok(Self {
            inner: Arc::new(Inner {
                engine,
                registry,
                results,
                gate: Arc::new(RoundGate::new()),
                selected: Mutex::new(None),
                timings: Mutex::new(HashMap::new()),
                config,
            }),
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    /// A copy of the current result slots.
    pub fn results(&self) -> ResultSlots {
        self.inner.results.read().clone()
    }

    pub fn round_state(&self) -> RoundState {
        self.inner.gate.state()
    }

    /// Whether an image is waiting for the running round or for models to load.
    pub fn has_queued(&self) -> bool {
        self.inner.gate.has_pending()
    }

    /// The image the current or last round ran on.
    pub fn selected(&self) -> Option<Upload> {
        self.inner.selected.lock().clone()
    }

    /// Mean processing time of a model's successful inferences.
    pub fn mean_processing_time(&self, id: &str) -> Option<Duration> {
        self.timing_stats(id).map(|t| t.mean())
    }

    pub fn timing_stats(&self, id: &str) -> Option<TimingStats> {
        self.inner.timings.lock().get(id).copied()
    }

    /// Load every idle model concurrently and wait for all of them to settle.
    ///
    /// A failing model only fails its own record. Models that already
    /// left [`LoadStatus::Idle`](crate::LoadStatus::Idle) are not loaded
    /// again. Once the last model settles, an image submitted while
    /// loading starts its round.
    pub async fn load_all(&self) {
        let registry = &self.inner.registry;
        let started = registry
            .ids()
            .iter()
            .filter_map(|id| registry.begin_loading(id).ok().flatten())
            .collect::<Vec<_>>();
        log::info!("loading {} model(s)", started.len());

        join_all(started.into_iter().map(|loading| self.inner.spawn_load(loading))).await;

        log::info!(
            "{} of {} model(s) loaded",
            registry.loaded().len(),
            registry.len()
        );
    }

    /// Load a single model by id.
    ///
    /// A model that already left [`LoadStatus::Idle`](crate::LoadStatus::Idle)
    /// is returned as it is, without waiting for a load in progress.
    ///
    /// # Errors
    ///
    /// [`ScanError::UnknownModel`] if no model has that id. Load
    /// failures are recorded on the model, not returned.
    pub async fn load(&self, id: &str) -> Result<Arc<ModelRuntime>, ScanError> {
        let registry = &self.inner.registry;
        match registry.begin_loading(id)? {
            Some(loading) => Ok(self.inner.spawn_load(loading).await),
            None => registry
                .get(id)
                .ok_or_else(|| ScanError::UnknownModel(id.to_owned())),
        }
    }

    /// Accept a new image and run it on every loaded model.
    ///
    /// If a round is already running the image waits for it, and if
    /// models are still loading it waits for them; see [`Submission`].
    ///
    /// # Errors
    ///
    /// [`ScanError::NoModelsAvailable`] when no model loaded and none is
    /// still loading.
    pub async fn submit(&self, upload: Upload) -> Result<Submission, ScanError> {
        let inner = &self.inner;
        if !inner.registry.any_loaded() {
            if !inner.registry.any_pending() {
                return Err(ScanError::NoModelsAvailable);
            }

            log::debug!("deferring {} until models have loaded", upload.name());
            let (request, pending) = Request::new(upload);
            if let Some(older) = inner.gate.park(request) {
                older.supersede();
            }

            // loading may have settled after the check above
            if !inner.registry.any_pending() {
                inner.start_parked();
            }

            return Ok(Submission::Deferred(pending));
        }

        let (request, pending) = Request::new(upload);
        match inner.gate.admit(request) {
            Admission::Begin(permit, request) => {
                inner.drive(permit, request);
                pending.wait().await.map(Submission::Completed)
            }
            Admission::Queued(older) => {
                if let Some(older) = older {
                    older.supersede();
                }
                Ok(Submission::Queued(pending))
            }
        }
    }

    /// Run a round on `upload` right away, making it the current image.
    ///
    /// # Errors
    ///
    /// [`ScanError::RoundInProgress`] if a round is running and
    /// [`ScanError::NoModelsAvailable`] if no model is loaded.
    pub async fn run_round(&self, upload: Upload) -> Result<Vec<InferenceResult>, ScanError> {
        let permit = self
            .inner
            .gate
            .try_begin()
            .ok_or(ScanError::RoundInProgress)?;

        let (request, pending) = Request::new(upload);
        self.inner.drive(permit, request);
        pending.wait().await
    }

    /// Run another round on the current image.
    ///
    /// # Errors
    ///
    /// [`ScanError::NoImageSelected`] without a previous submission,
    /// otherwise as [`Orchestrator::run_round`].
    pub async fn rerun(&self) -> Result<Vec<InferenceResult>, ScanError> {
        let upload = self.selected().ok_or(ScanError::NoImageSelected)?;
        self.run_round(upload).await
    }
}

impl Inner {
    /// Settle `loading` on its own task, then start a parked image if it was the last one.
    async fn spawn_load(self: &Arc<Self>, loading: Arc<ModelRuntime>) -> Arc<ModelRuntime> {
        let inner = self.clone();
        let fallback = loading.clone();
        let task = tokio::spawn(async move {
            let settled = inner.load_one(loading).await;
            if !inner.registry.any_pending() {
                inner.start_parked();
            }
            settled
        });

        match task.await {
            Ok(settled) => settled,
            Err(e) => {
                log::error!("loading {} stopped: {}", fallback.id(), e);
                self.registry
                    .replace(fallback.failed(e))
                    .unwrap_or(fallback)
            }
        }
    }

    async fn load_one(&self, loading: Arc<ModelRuntime>) -> Arc<ModelRuntime> {
        let settled = self.try_load(&loading).await.unwrap_or_else(|e| {
            log::warn!("{}", e);
            loading.failed(e)
        });

        match self.registry.replace(settled) {
            Ok(record) => record,
            Err(e) => {
                log::error!("lost track of {}: {}", loading.id(), e);
                loading
            }
        }
    }

    async fn try_load(&self, loading: &ModelRuntime) -> Result<ModelRuntime, ScanError> {
        let descriptor = loading.descriptor().clone();
        descriptor.validate()?;

        let engine = self.engine.clone();
        let path = descriptor.path.clone();
        let name = descriptor.name.clone();

        let session = settle(
            blocking(self.config.load_timeout, move || {
                engine.load(&path).map_err(|e| ScanError::ModelLoad {
                    model: name,
                    reason: format!("{:#}", e),
                })
            })
            .await,
            |join| ScanError::ModelLoad {
                model: descriptor.name.clone(),
                reason: join.to_string(),
            },
            || ScanError::Timeout {
                operation: "loading",
                model: descriptor.name.clone(),
                seconds: self.config.load_timeout.as_secs_f32(),
            },
        )?;

        let loaded = loading.loaded(Arc::from(session))?;
        log::info!(
            "model {} loaded, input {:?}, output {:?}",
            descriptor.name,
            loaded.input_name().unwrap_or_default(),
            loaded.output_name().unwrap_or_default()
        );

        Ok(loaded)
    }

    fn start_parked(self: &Arc<Self>) {
        if let Some((permit, request)) = self.gate.try_begin_pending() {
            self.drive(permit, request);
        }
    }

    /// Run `first`, then every image queued behind it, on a task of its own.
    ///
    /// Each request hears back only after the gate has moved on, so a
    /// caller seeing its results can start the next round right away.
    fn drive(self: &Arc<Self>, mut permit: RoundPermit<Request>, first: Request) {
        let inner = self.clone();
        tokio::spawn(async move {
            let mut next = Some(first);
            while let Some(request) = next {
                let outcome = inner.run_image(&request.upload).await;
                if let Err(e) = &outcome {
                    log::warn!("{} was not processed: {}", request.upload.name(), e);
                }

                next = permit.next_pending();
                request.finish(outcome);
            }
        });
    }

    async fn run_image(&self, upload: &Upload) -> Result<Vec<InferenceResult>, ScanError> {
        let active = self.registry.loaded();
        if active.is_empty() {
            return Err(ScanError::NoModelsAvailable);
        }

        self.activate(upload);
        self.round(upload, active).await
    }

    fn activate(&self, upload: &Upload) {
        *self.selected.lock() = Some(upload.clone());
        self.results.write().clear_all();
    }

    /// Run `upload` on the `active` models and commit their results.
    async fn round(
        &self,
        upload: &Upload,
        active: Vec<Arc<ModelRuntime>>,
    ) -> Result<Vec<InferenceResult>, ScanError> {
        log::debug!(
            "inference round on {} with {} model(s)",
            upload.name(),
            active.len()
        );

        self.results
            .write()
            .clear(active.iter().map(|record| record.id()));

        let start = Instant::now();
        let bytes = upload.bytes.clone();
        let decoded = settle(
            blocking(self.config.inference_timeout, move || {
                decode(&bytes).map(Arc::new)
            })
            .await,
            |join| ScanError::Decode(join.to_string()),
            || ScanError::Decode("timed out decoding the image".to_owned()),
        );

        let results = match decoded {
            Ok(image) => {
                join_all(
                    active
                        .iter()
                        .map(|record| self.infer_one(record, image.clone())),
                )
                .await
            }
            Err(e) => {
                log::warn!("{}", e);
                let elapsed = start.elapsed();
                active
                    .iter()
                    .map(|record| InferenceResult::failed(record.descriptor(), &e, Some(elapsed)))
                    .collect()
            }
        };

        {
            let mut slots = self.results.write();
            let mut timings = self.timings.lock();
            for result in &results {
                if let (true, Some(elapsed)) = (result.is_classified(), result.processing_time) {
                    timings
                        .entry(result.model_id.clone())
                        .and_modify(|t| t.add(elapsed))
                        .or_insert_with(|| TimingStats::new(elapsed));
                }

                slots.set(result.clone());
            }
        }

        Ok(results)
    }

    async fn infer_one(
        &self,
        record: &ModelRuntime,
        image: Arc<DynamicImage>,
    ) -> InferenceResult {
        let descriptor = record.descriptor().clone();
        let (session, input_name, output_name) =
            match (record.session(), record.input_name(), record.output_name()) {
                (Some(session), Some(input), Some(output)) => {
                    (session.clone(), input.to_owned(), output.to_owned())
                }
                _ => {
                    return InferenceResult::failed(
                        &descriptor,
                        ScanError::inference(&descriptor.name, "model is not loaded"),
                        None,
                    )
                }
            };

        let start = Instant::now();
        let task_descriptor = descriptor.clone();
        let outcome: Result<Prediction, ScanError> = settle(
            blocking(self.config.inference_timeout, move || {
                let descriptor = task_descriptor;
                let tensor = prepare(&descriptor, &image)?;

                let mut feeds = Feeds::with_capacity(1);
                feeds.insert(input_name, tensor);

                let mut outputs = session
                    .run(feeds)
                    .map_err(|e| ScanError::inference(&descriptor.name, format!("{:#}", e)))?;

                let output = outputs.remove(&output_name).ok_or_else(|| {
                    ScanError::inference(
                        &descriptor.name,
                        format!("output tensor {:?} not found in model results", output_name),
                    )
                })?;

                classify(&descriptor.name, output.data())
            })
            .await,
            |join| ScanError::inference(&descriptor.name, join),
            || ScanError::Timeout {
                operation: "inference",
                model: descriptor.name.clone(),
                seconds: self.config.inference_timeout.as_secs_f32(),
            },
        );
        let elapsed = start.elapsed();

        match outcome {
            Ok(prediction) => {
                log::debug!(
                    "{}: {} ({:.4}) in {:?}",
                    descriptor.name,
                    prediction.label,
                    prediction.confidence,
                    elapsed
                );
                InferenceResult::classified(&descriptor, prediction, elapsed)
            }
            Err(e) => {
                log::warn!("{}", e);
                InferenceResult::failed(&descriptor, e, Some(elapsed))
            }
        }
    }
}
