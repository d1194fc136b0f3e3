//! End-to-end runs of the iteration loop against simulated backends.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cg_core::{Algorithm, AlgorithmCatalog, CompletionBackend, DeterministicRng, PromptTemplates};
use cg_dst::{get_or_generate_seed, FaultConfig, FaultInjector, FaultyBackend, Reply, ScriptedBackend};
use cg_generator::{
    ConsoleMode, ControllerConfig, IterationController, IterationPipeline, IterationState,
    OutputWriter, RunSummary,
};

const CLASS_RESPONSE: &str =
    "Here is the class:\n// Cleaner.swift\n```swift\nclass Cleaner {\n    func run() {}\n}\n```";
const MODULE_RESPONSE: &str =
    "// Cleaner.m\n```objc\n#import <React/RCTBridgeModule.h>\n@interface RCT_EXTERN_MODULE(Cleaner, NSObject)\n@end\n```";

fn templates() -> PromptTemplates {
    PromptTemplates {
        class: "Write a Swift class using {{.Algorithm1Name}} and {{ .Algorithm2Name }}.".to_string(),
        class_filename: "{{.Algorithm1Name}}.swift".to_string(),
        module: "Write the bridge module for:".to_string(),
        module_filename: "{{.Algorithm1Name}}.m".to_string(),
    }
}

fn catalog() -> AlgorithmCatalog {
    AlgorithmCatalog::new(
        vec![
            Algorithm::new("LRU Cache", "Evicts the least recently used entry"),
            Algorithm::new("Dijkstra", "Shortest paths"),
            Algorithm::new("Bloom Filter", "Probabilistic set membership"),
        ],
        "test catalog",
    )
    .unwrap()
}

async fn run_loop(
    primary: Arc<dyn CompletionBackend>,
    secondary: Arc<dyn CompletionBackend>,
    root: &Path,
    limit: u32,
    seed: u64,
) -> RunSummary {
    let pipeline = IterationPipeline::new(primary, secondary, templates(), OutputWriter::new(root))
        .unwrap()
        .with_console(ConsoleMode::Quiet);
    let config = ControllerConfig::default()
        .with_limit(limit)
        .with_pause(Duration::ZERO)
        .with_seed(seed);

    IterationController::new(Arc::new(pipeline), catalog(), config)
        .run()
        .await
}

fn assert_counts_consistent(summary: &RunSummary) {
    assert_eq!(
        summary.attempts,
        summary.completed + summary.failures + summary.faults
    );
    assert_eq!(summary.history.len(), summary.attempts as usize);
    assert!(summary
        .history
        .iter()
        .all(|record| record.state.is_terminal()));
}

#[tokio::test]
async fn test_all_iterations_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let primary = Arc::new(ScriptedBackend::new("primary", [Reply::text(CLASS_RESPONSE)]));
    let secondary = Arc::new(ScriptedBackend::new("secondary", [Reply::text(MODULE_RESPONSE)]));

    let summary = run_loop(primary.clone(), secondary.clone(), dir.path(), 3, 7).await;

    assert_eq!(summary.completed, 3);
    assert_eq!(summary.attempts, 3);
    assert_eq!(summary.retries(), 0);
    assert_eq!(primary.calls_count(), 3);
    assert_eq!(secondary.calls_count(), 3);
    assert!(summary
        .history
        .iter()
        .all(|record| record.state == IterationState::Succeeded && record.files_written == 2));

    let swift = std::fs::read_to_string(dir.path().join("Cleaner.swift")).unwrap();
    assert!(swift.contains("@objc(Cleaner)\nclass Cleaner"));
    assert!(!swift.contains("Here is the class"));

    let objc = std::fs::read_to_string(dir.path().join("Cleaner.m")).unwrap();
    assert!(!objc.contains("@objc"));
    assert!(!objc.contains("```"));
}

#[tokio::test]
async fn test_failure_then_success_retries_once() {
    let dir = tempfile::tempdir().unwrap();
    let primary = Arc::new(ScriptedBackend::new("primary", [Reply::text(CLASS_RESPONSE)]));
    let secondary = Arc::new(ScriptedBackend::new(
        "secondary",
        [Reply::fail("connection reset"), Reply::text(MODULE_RESPONSE)],
    ));

    let summary = run_loop(primary.clone(), secondary, dir.path(), 1, 7).await;

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.attempts, 2);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.retries(), 1);
    assert_eq!(primary.calls_count(), 2);

    let failed = &summary.history[0];
    assert_eq!(failed.state, IterationState::Failed);
    assert_eq!(failed.iteration, 1);
    assert!(failed.error.as_deref().unwrap().contains("connection reset"));

    let retried = &summary.history[1];
    assert_eq!(retried.state, IterationState::Succeeded);
    assert_eq!(retried.iteration, 1);
    assert_eq!(retried.attempt, 2);

    assert!(dir.path().join("Cleaner.swift").exists());
    assert!(dir.path().join("Cleaner.m").exists());
}

#[tokio::test]
async fn test_failed_attempt_keeps_partial_files() {
    let dir = tempfile::tempdir().unwrap();
    let primary = Arc::new(ScriptedBackend::new("primary", [Reply::text(CLASS_RESPONSE)]));
    let secondary = Arc::new(ScriptedBackend::new(
        "secondary",
        [Reply::text("no marker here"), Reply::text(MODULE_RESPONSE)],
    ));
    let pipeline = IterationPipeline::new(
        primary,
        secondary,
        templates(),
        OutputWriter::new(dir.path()),
    )
    .unwrap()
    .with_console(ConsoleMode::Quiet);

    let pair = catalog().sample_pair(&mut DeterministicRng::new(1));
    assert!(pipeline.run(1, &pair).await.is_err());

    assert!(dir.path().join("Cleaner.swift").exists());
    assert!(!dir.path().join("Cleaner.m").exists());
}

#[tokio::test]
async fn test_panic_is_recovered() {
    let dir = tempfile::tempdir().unwrap();
    let primary = Arc::new(ScriptedBackend::new(
        "primary",
        [
            Reply::text(CLASS_RESPONSE),
            Reply::panic("stream decoder blew up"),
            Reply::text(CLASS_RESPONSE),
        ],
    ));
    let secondary = Arc::new(ScriptedBackend::new("secondary", [Reply::text(MODULE_RESPONSE)]));

    let summary = run_loop(primary, secondary, dir.path(), 2, 7).await;

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.faults, 1);
    assert_eq!(summary.attempts, 3);
    assert_counts_consistent(&summary);

    let faulted = &summary.history[1];
    assert_eq!(faulted.state, IterationState::Faulted);
    assert_eq!(faulted.iteration, 2);
    assert!(faulted
        .error
        .as_deref()
        .unwrap()
        .contains("stream decoder blew up"));
}

#[tokio::test]
async fn test_many_failures_before_success() {
    let dir = tempfile::tempdir().unwrap();
    let mut script: Vec<Reply> = (0..25).map(|_| Reply::fail("model not loaded")).collect();
    script.push(Reply::text(CLASS_RESPONSE));
    let primary = Arc::new(ScriptedBackend::new("primary", script));
    let secondary = Arc::new(ScriptedBackend::new("secondary", [Reply::text(MODULE_RESPONSE)]));

    let summary = run_loop(primary, secondary.clone(), dir.path(), 1, 7).await;

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failures, 25);
    assert_eq!(summary.attempts, 26);
    assert_eq!(secondary.calls_count(), 1);
    assert_counts_consistent(&summary);
}

#[tokio::test]
async fn test_unnamed_output_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let primary = Arc::new(ScriptedBackend::new(
        "primary",
        [Reply::text("class Cleaner {}"), Reply::text(CLASS_RESPONSE)],
    ));
    let secondary = Arc::new(ScriptedBackend::new("secondary", [Reply::text(MODULE_RESPONSE)]));

    let summary = run_loop(primary, secondary, dir.path(), 1, 7).await;

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failures, 1);
    assert!(summary.history[0]
        .error
        .as_deref()
        .unwrap()
        .starts_with("No file name found in class output"));
}

#[tokio::test]
async fn test_zero_limit_does_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let primary = Arc::new(ScriptedBackend::new("primary", [Reply::text(CLASS_RESPONSE)]));
    let secondary = Arc::new(ScriptedBackend::new("secondary", [Reply::text(MODULE_RESPONSE)]));

    let summary = run_loop(primary.clone(), secondary, dir.path(), 0, 7).await;

    assert_eq!(summary.completed, 0);
    assert_eq!(summary.attempts, 0);
    assert_eq!(primary.calls_count(), 0);
}

#[tokio::test]
async fn test_same_seed_same_prompts() {
    let mut runs = Vec::new();
    for _ in 0..2 {
        let dir = tempfile::tempdir().unwrap();
        let primary = Arc::new(ScriptedBackend::new("primary", [Reply::text(CLASS_RESPONSE)]));
        let secondary = Arc::new(ScriptedBackend::new("secondary", [Reply::text(MODULE_RESPONSE)]));

        run_loop(primary.clone(), secondary, dir.path(), 5, 1234).await;
        runs.push(primary.prompts());
    }

    assert_eq!(runs[0].len(), 5);
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn test_stress_with_injected_faults() {
    let seed = get_or_generate_seed();
    let dir = tempfile::tempdir().unwrap();

    let primary = Arc::new(FaultyBackend::new(
        "primary",
        CLASS_RESPONSE,
        FaultInjector::new(DeterministicRng::new(seed), FaultConfig::aggressive()),
    ));
    let secondary = Arc::new(FaultyBackend::new(
        "secondary",
        MODULE_RESPONSE,
        FaultInjector::new(DeterministicRng::new(seed).fork(), FaultConfig::aggressive()),
    ));

    let summary = run_loop(primary.clone(), secondary.clone(), dir.path(), 5, seed).await;

    assert_eq!(summary.completed, 5, "seed {}", seed);
    assert_counts_consistent(&summary);

    let primary_stats = primary.stats();
    let secondary_stats = secondary.stats();
    assert_eq!(
        summary.faults,
        (primary_stats.panics_count + secondary_stats.panics_count) as u32,
        "seed {}",
        seed
    );
    assert_eq!(
        summary.failures,
        (primary_stats.failures_count + secondary_stats.failures_count) as u32,
        "seed {}",
        seed
    );
}

#[tokio::test]
async fn test_class_in_two_blocks_written_whole() {
    let dir = tempfile::tempdir().unwrap();
    let class_response = "// Cleaner.swift\n```swift\nimport Foundation\n```\n```swift\nclass Cleaner {\n    func run() {}\n}\n```";
    let primary = Arc::new(ScriptedBackend::new("primary", [Reply::text(class_response)]));
    let secondary = Arc::new(ScriptedBackend::new("secondary", [Reply::text(MODULE_RESPONSE)]));

    let summary = run_loop(primary, secondary, dir.path(), 1, 7).await;
    assert_eq!(summary.completed, 1);

    let swift = std::fs::read_to_string(dir.path().join("Cleaner.swift")).unwrap();
    assert_eq!(
        swift,
        "// Cleaner.swift\nimport Foundation\n@objc(Cleaner)\nclass Cleaner {\n    @objc\n    @ReactMethod\n    func run() {}\n}"
    );
}
