// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

use std::{sync::Arc, time::Duration};

use brainscan_core::prelude::{ScanError, TumorClass};
use brainscan_runtime::{
    InferenceResult, LoadStatus, Orchestrator, OrchestratorConfig, PendingRound, RoundState,
    Submission, Upload,
};

#[path = "./helpers.rs"]
mod helpers;

use helpers::{descriptor, engine, png_bytes, FakeEngine, FakeModel, Reply};

fn upload(name: &str) -> Upload {
    Upload::new(name, "image/png", png_bytes()).unwrap()
}

fn completed(submission: Submission) -> Vec<InferenceResult> {
    match submission {
        Submission::Completed(results) => results,
        other => panic!("expected a completed round, got {:?}", other),
    }
}

fn assert_record_invariants(orchestrator: &Orchestrator) {
    for record in orchestrator.registry().snapshot() {
        let loaded = record.status() == LoadStatus::Loaded;
        assert_eq!(loaded, record.input_name().is_some());
        assert_eq!(loaded, record.output_name().is_some());
        assert_eq!(record.status() == LoadStatus::Failed, record.error().is_some());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_classify_with_two_models() {
    let orchestrator = Orchestrator::new(
        engine(
            FakeEngine::default()
                .with("cnn.onnx", FakeModel::scoring(1, &[0.1, 0.7, 0.1, 0.1]))
                .with("vgg.onnx", FakeModel::scoring(3, &[0.05, 0.05, 0.8, 0.1])),
        ),
        vec![descriptor("cnn", true), descriptor("vgg", false)],
        OrchestratorConfig::default(),
    )
    .unwrap();

    orchestrator.load_all().await;
    assert_record_invariants(&orchestrator);
    assert_eq!(orchestrator.registry().loaded().len(), 2);

    let cnn = orchestrator.registry().get("cnn").unwrap();
    assert_eq!(cnn.input_name(), Some("input_1"));
    assert_eq!(cnn.output_name(), Some("dense"));

    let results = completed(orchestrator.submit(upload("scan.png")).await.unwrap());
    assert_eq!(results.len(), 2);

    assert_eq!(results[0].model_id, "cnn");
    assert_eq!(results[0].label(), Some(TumorClass::Meningioma));
    assert_eq!(results[0].confidence(), Some(0.7));
    assert!(results[0].processing_time.is_some());

    assert_eq!(results[1].model_id, "vgg");
    assert_eq!(results[1].label(), Some(TumorClass::NoTumor));

    let slots = orchestrator.results();
    assert_eq!(slots.completed(), results);
    assert_eq!(orchestrator.selected().unwrap().name(), "scan.png");
    assert_eq!(orchestrator.round_state(), RoundState::Idle);
    assert!(orchestrator.mean_processing_time("cnn").is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_inference_failure_is_isolated() {
    let orchestrator = Orchestrator::new(
        engine(
            FakeEngine::default()
                .with("good.onnx", FakeModel::scoring(1, &[0.9, 0.05, 0.03, 0.02]))
                .with(
                    "bad.onnx",
                    FakeModel::scoring(1, &[]).reply(Reply::Fail("kaput".to_owned())),
                ),
        ),
        vec![descriptor("good", true), descriptor("bad", true)],
        OrchestratorConfig::default(),
    )
    .unwrap();

    orchestrator.load_all().await;
    let results = completed(orchestrator.submit(upload("scan.png")).await.unwrap());

    assert_eq!(results[0].label(), Some(TumorClass::Glioma));
    assert!(results[1].error().unwrap().contains("kaput"));
    assert!(results[1].processing_time.is_some());

    // a failed inference does not unload the model
    assert_eq!(
        orchestrator.registry().get("bad").unwrap().status(),
        LoadStatus::Loaded
    );
    assert!(orchestrator.timing_stats("bad").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_load_failures_are_isolated() {
    let mut mismatched = descriptor("mismatched", true);
    mismatched.input_shape = vec![1, 4, 4, 3];

    let orchestrator = Orchestrator::new(
        engine(
            FakeEngine::default()
                .with("good.onnx", FakeModel::scoring(1, &[0.1, 0.1, 0.1, 0.7]))
                .with("corrupt.onnx", FakeModel::scoring(1, &[]).load_error("corrupt file"))
                .with("unnamed.onnx", {
                    let mut model = FakeModel::scoring(1, &[0.25; 4]);
                    model.inputs.clear();
                    model
                })
                .with("shape.onnx", FakeModel::scoring(3, &[0.25; 4]))
                .with("mismatched.onnx", FakeModel::scoring(3, &[0.25; 4])),
        ),
        vec![
            descriptor("good", true),
            descriptor("corrupt", true),
            descriptor("missing", true),
            descriptor("unnamed", true),
            descriptor("shape", true),
            mismatched,
        ],
        OrchestratorConfig::default(),
    )
    .unwrap();

    orchestrator.load_all().await;
    assert_record_invariants(&orchestrator);

    let registry = orchestrator.registry();
    let error = |id: &str| registry.get(id).unwrap().error().unwrap().to_owned();

    assert_eq!(registry.get("good").unwrap().status(), LoadStatus::Loaded);
    assert!(error("corrupt").contains("corrupt file"));
    assert!(error("missing").contains("no such model file"));
    assert!(error("unnamed").contains("no input or output names"));
    assert!(error("shape").contains("reports input shape"));
    assert!(error("mismatched").contains("channel"));

    assert!(!registry.any_pending());
    assert!(!registry.all_failed());

    let results = completed(orchestrator.submit(upload("scan.png")).await.unwrap());
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].label(), Some(TumorClass::Pituitary));

    let slots = orchestrator.results();
    assert!(slots.get("corrupt").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_models_available() {
    let orchestrator = Orchestrator::new(
        engine(FakeEngine::default()),
        vec![descriptor("a", true), descriptor("b", false)],
        OrchestratorConfig::default(),
    )
    .unwrap();

    orchestrator.load_all().await;
    assert!(orchestrator.registry().all_failed());

    let result = orchestrator.submit(upload("scan.png")).await;
    assert!(matches!(result, Err(ScanError::NoModelsAvailable)));
    assert!(!orchestrator.has_queued());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_and_undecodable_uploads() {
    let gif = Upload::new("scan.gif", "image/gif", vec![0u8; 4]);
    assert!(matches!(gif, Err(ScanError::UnsupportedMediaType(_))));
    assert!(Upload::new("scan.jpg", "image/jpg", vec![0u8; 4]).is_ok());

    let orchestrator = Orchestrator::new(
        engine(
            FakeEngine::default()
                .with("a.onnx", FakeModel::scoring(1, &[0.1, 0.7, 0.1, 0.1]))
                .with("b.onnx", FakeModel::scoring(3, &[0.1, 0.7, 0.1, 0.1])),
        ),
        vec![descriptor("a", true), descriptor("b", false)],
        OrchestratorConfig::default(),
    )
    .unwrap();
    orchestrator.load_all().await;

    let garbage = Upload::new("scan.png", "image/png", b"definitely not a png".to_vec()).unwrap();
    let results = completed(orchestrator.submit(garbage).await.unwrap());

    assert_eq!(results.len(), 2);
    for result in &results {
        assert!(result.error().unwrap().contains("decode"));
    }

    // the models are still usable
    let results = completed(orchestrator.submit(upload("scan.png")).await.unwrap());
    assert!(results.iter().all(|r| r.is_classified()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_classification_edge_cases() {
    let orchestrator = Orchestrator::new(
        engine(
            FakeEngine::default()
                .with("tie.onnx", FakeModel::scoring(1, &[0.2, 0.9, 0.9, 0.1]))
                .with(
                    "wide.onnx",
                    FakeModel::scoring(1, &[0.0, 0.1, 0.0, 0.1, 0.0, 0.8]),
                )
                .with("empty.onnx", FakeModel::scoring(1, &[]))
                .with(
                    "renamed.onnx",
                    FakeModel::scoring(1, &[0.25; 4]).reply(Reply::WrongOutput),
                ),
        ),
        vec![
            descriptor("tie", true),
            descriptor("wide", true),
            descriptor("empty", true),
            descriptor("renamed", true),
        ],
        OrchestratorConfig::default(),
    )
    .unwrap();
    orchestrator.load_all().await;

    let results = completed(orchestrator.submit(upload("scan.png")).await.unwrap());

    assert_eq!(results[0].label(), Some(TumorClass::Meningioma));
    assert_eq!(results[0].confidence(), Some(0.9));
    assert!(results[1].error().unwrap().contains("out of bounds"));
    assert!(results[2].error().unwrap().contains("no scores"));
    assert!(results[3].error().unwrap().contains("not found"));
}

fn slow_orchestrator(delay: Duration) -> Arc<Orchestrator> {
    Arc::new(
        Orchestrator::new(
            engine(FakeEngine::default().with(
                "slow.onnx",
                FakeModel::scoring(1, &[0.1, 0.7, 0.1, 0.1]).infer_delay(delay),
            )),
            vec![descriptor("slow", true)],
            OrchestratorConfig::default(),
        )
        .unwrap(),
    )
}

fn pending(submission: Result<Submission, ScanError>) -> PendingRound {
    match submission {
        Ok(Submission::Queued(pending)) | Ok(Submission::Deferred(pending)) => pending,
        other => panic!("expected a waiting submission, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_submissions_queue_behind_running_round() {
    let orchestrator = slow_orchestrator(Duration::from_millis(300));
    orchestrator.load_all().await;

    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.submit(upload("first.png")).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(orchestrator.round_state(), RoundState::Running);
    assert!(matches!(
        orchestrator.rerun().await,
        Err(ScanError::RoundInProgress)
    ));

    let second = orchestrator.submit(upload("second.png")).await;
    assert!(matches!(second, Ok(Submission::Queued(_))));
    let third = pending(orchestrator.submit(upload("third.png")).await);
    assert!(orchestrator.has_queued());

    // only the latest queued image runs after the first one
    assert!(matches!(
        pending(second).wait().await,
        Err(ScanError::Superseded)
    ));

    let results = completed(first.await.unwrap().unwrap());
    assert_eq!(results.len(), 1);

    let results = third.wait().await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(orchestrator.selected().unwrap().name(), "third.png");
    assert_eq!(orchestrator.timing_stats("slow").unwrap().count(), 2);
    assert!(!orchestrator.has_queued());
    assert_eq!(orchestrator.round_state(), RoundState::Idle);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_queue_survives_cancelled_submitter() {
    let orchestrator = slow_orchestrator(Duration::from_millis(300));
    orchestrator.load_all().await;

    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.submit(upload("first.png")).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = pending(orchestrator.submit(upload("second.png")).await);

    // the submitter of the running round goes away
    first.abort();
    assert!(first.await.unwrap_err().is_cancelled());

    let results = second.wait().await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(orchestrator.selected().unwrap().name(), "second.png");
    assert!(!orchestrator.has_queued());
    assert_eq!(orchestrator.round_state(), RoundState::Idle);

    // a later image becomes the current one; nothing stale runs after it
    completed(orchestrator.submit(upload("third.png")).await.unwrap());
    assert_eq!(orchestrator.selected().unwrap().name(), "third.png");
    assert_eq!(orchestrator.timing_stats("slow").unwrap().count(), 3);
    assert_eq!(orchestrator.round_state(), RoundState::Idle);

    // a cancelled caller does not cancel its own round either
    let fourth = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.submit(upload("fourth.png")).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    fourth.abort();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(orchestrator.round_state(), RoundState::Idle);
    assert_eq!(orchestrator.selected().unwrap().name(), "fourth.png");
    assert_eq!(orchestrator.results().completed().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_round_uses_models_loaded_at_start() {
    let orchestrator = Arc::new(
        Orchestrator::new(
            engine(
                FakeEngine::default()
                    .with("fast.onnx", FakeModel::scoring(1, &[0.7, 0.1, 0.1, 0.1]))
                    .with(
                        "late.onnx",
                        FakeModel::scoring(3, &[0.1, 0.1, 0.1, 0.7])
                            .load_delay(Duration::from_millis(400)),
                    ),
            ),
            vec![descriptor("fast", true), descriptor("late", false)],
            OrchestratorConfig::default(),
        )
        .unwrap(),
    );

    orchestrator.load("fast").await.unwrap();
    let late = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.load("late").await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        orchestrator.registry().get("late").unwrap().status(),
        LoadStatus::Loading
    );
    assert!(orchestrator.registry().any_pending());

    let results = completed(orchestrator.submit(upload("scan.png")).await.unwrap());
    assert_eq!(results.len(), 1);
    assert!(orchestrator.results().get("late").is_none());

    let late = late.await.unwrap().unwrap();
    assert_eq!(late.status(), LoadStatus::Loaded);

    let results = orchestrator.rerun().await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[1].label(), Some(TumorClass::Pituitary));
    assert_eq!(orchestrator.results().completed().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_submission_deferred_until_loaded() {
    let orchestrator = Arc::new(
        Orchestrator::new(
            engine(FakeEngine::default().with(
                "a.onnx",
                FakeModel::scoring(1, &[0.1, 0.7, 0.1, 0.1]).load_delay(Duration::from_millis(300)),
            )),
            vec![descriptor("a", true)],
            OrchestratorConfig::default(),
        )
        .unwrap(),
    );

    let loading = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.load_all().await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let superseded = pending(orchestrator.submit(upload("earliest.png")).await);
    let early = orchestrator.submit(upload("early.png")).await;
    assert!(matches!(early, Ok(Submission::Deferred(_))));
    assert!(orchestrator.has_queued());
    assert!(matches!(
        superseded.wait().await,
        Err(ScanError::Superseded)
    ));

    let results = pending(early).wait().await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].label(), Some(TumorClass::Meningioma));

    loading.await.unwrap();
    assert!(!orchestrator.has_queued());
    assert_eq!(orchestrator.selected().unwrap().name(), "early.png");
    assert_eq!(orchestrator.results().completed(), results);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deferred_submission_when_every_load_fails() {
    let orchestrator = Arc::new(
        Orchestrator::new(
            engine(FakeEngine::default().with(
                "a.onnx",
                FakeModel::scoring(1, &[0.25; 4])
                    .load_delay(Duration::from_millis(300))
                    .load_error("corrupt file"),
            )),
            vec![descriptor("a", true)],
            OrchestratorConfig::default(),
        )
        .unwrap(),
    );

    let loading = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.load_all().await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let deferred = pending(orchestrator.submit(upload("x.png")).await);

    assert!(matches!(
        deferred.wait().await,
        Err(ScanError::NoModelsAvailable)
    ));

    loading.await.unwrap();
    assert!(orchestrator.registry().all_failed());
    assert!(orchestrator.selected().is_none());
    assert!(orchestrator.results().completed().is_empty());
    assert!(!orchestrator.has_queued());
    assert_eq!(orchestrator.round_state(), RoundState::Idle);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_loads_hit_the_engine_once() {
    let fake = Arc::new(FakeEngine::default().with(
        "a.onnx",
        FakeModel::scoring(1, &[0.25; 4]).load_delay(Duration::from_millis(200)),
    ));
    let orchestrator = Orchestrator::new(
        fake.clone(),
        vec![descriptor("a", true)],
        OrchestratorConfig::default(),
    )
    .unwrap();

    let (first, (), second) = tokio::join!(
        orchestrator.load("a"),
        orchestrator.load_all(),
        orchestrator.load("a")
    );
    first.unwrap();
    second.unwrap();

    assert_eq!(fake.load_count(), 1);
    assert_eq!(
        orchestrator.registry().get("a").unwrap().status(),
        LoadStatus::Loaded
    );

    orchestrator.load_all().await;
    orchestrator.load("a").await.unwrap();
    assert_eq!(fake.load_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rerun() {
    let orchestrator = Orchestrator::new(
        engine(FakeEngine::default().with("a.onnx", FakeModel::scoring(1, &[0.1, 0.7, 0.1, 0.1]))),
        vec![descriptor("a", true)],
        OrchestratorConfig::default(),
    )
    .unwrap();
    orchestrator.load_all().await;

    assert!(matches!(
        orchestrator.rerun().await,
        Err(ScanError::NoImageSelected)
    ));

    orchestrator.submit(upload("scan.png")).await.unwrap();
    let results = orchestrator.rerun().await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(orchestrator.timing_stats("a").unwrap().count(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_timeouts() {
    let orchestrator = Orchestrator::new(
        engine(
            FakeEngine::default()
                .with(
                    "stuck.onnx",
                    FakeModel::scoring(1, &[0.25; 4]).load_delay(Duration::from_millis(600)),
                )
                .with(
                    "slow.onnx",
                    FakeModel::scoring(1, &[0.25; 4]).infer_delay(Duration::from_millis(600)),
                ),
        ),
        vec![descriptor("stuck", true), descriptor("slow", true)],
        OrchestratorConfig {
            load_timeout: Duration::from_millis(100),
            inference_timeout: Duration::from_millis(100),
        },
    )
    .unwrap();

    orchestrator.load_all().await;

    let stuck = orchestrator.registry().get("stuck").unwrap();
    assert_eq!(stuck.status(), LoadStatus::Failed);
    assert!(stuck.error().unwrap().contains("timed out"));

    let results = completed(orchestrator.submit(upload("scan.png")).await.unwrap());
    assert_eq!(results.len(), 1);
    assert!(results[0].error().unwrap().contains("timed out"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_and_duplicate_models() {
    let orchestrator = Orchestrator::new(
        engine(FakeEngine::default()),
        vec![descriptor("a", true)],
        OrchestratorConfig::default(),
    )
    .unwrap();
    assert!(matches!(
        orchestrator.load("zzz").await,
        Err(ScanError::UnknownModel(_))
    ));

    let duplicate = Orchestrator::new(
        engine(FakeEngine::default()),
        vec![descriptor("a", true), descriptor("a", false)],
        OrchestratorConfig::default(),
    );
    assert!(matches!(duplicate, Err(ScanError::ConfigMismatch { .. })));
}
