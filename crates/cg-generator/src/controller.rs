//! Iteration loop with retry and crash isolation.
//!
//! One iteration:
//!
//! ```text
//! algorithm pair ──> prompts ──> primary model ──> split ──┐
//!                                                          │ per class file
//!        ┌─────────────────────────────────────────────────┘
//!        ▼
//!   annotate ──> write ──> secondary model ──> split ──> write
//! ```
//!
//! Every attempt runs in its own tokio task. A failed attempt (error) or a
//! crashed one (panic) is replaced by a new attempt, so `limit` counts
//! completed iterations. Attempts never overlap; the controller waits for
//! each task before starting the next. Files written by a failed attempt
//! stay on disk.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cg_core::{
    ensure_named, AlgorithmCatalog, AlgorithmPair, AnnotationInjector, AnnotationRules,
    BackendError, CompletionBackend, ConfigError, DeterministicRng, FileSplitter, ParseError,
    PromptTemplates,
};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::collector::{collect, Completion, ConsoleMode};
use crate::writer::{OutputWriter, WriteError};

/// Stage name of the primary (Swift class) call.
pub const CLASS_STAGE: &str = "class";

/// Stage name of the secondary (bridge module) call.
pub const MODULE_STAGE: &str = "module";

/// Default sampling temperature for both models.
pub const DEFAULT_TEMPERATURE: f32 = 0.9;

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Number of iterations that must complete
    pub limit: u32,
    /// Pause between attempts
    pub pause: Duration,
    /// Seed for algorithm sampling
    pub seed: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            pause: Duration::from_secs(1),
            seed: DeterministicRng::from_entropy().seed(),
        }
    }
}

impl ControllerConfig {
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Everything one iteration needs, shared read-only by all attempts.
pub struct IterationPipeline {
    primary: Arc<dyn CompletionBackend>,
    secondary: Arc<dyn CompletionBackend>,
    templates: PromptTemplates,
    writer: OutputWriter,
    splitter: FileSplitter,
    annotator: AnnotationInjector,
    temperature: f32,
    console: ConsoleMode,
}

impl IterationPipeline {
    /// Create a pipeline with the default splitter and Swift annotations.
    pub fn new(
        primary: Arc<dyn CompletionBackend>,
        secondary: Arc<dyn CompletionBackend>,
        templates: PromptTemplates,
        writer: OutputWriter,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            primary,
            secondary,
            templates,
            writer,
            splitter: FileSplitter::default(),
            annotator: AnnotationInjector::new(AnnotationRules::default())?,
            temperature: DEFAULT_TEMPERATURE,
            console: ConsoleMode::default(),
        })
    }

    pub fn with_splitter(mut self, splitter: FileSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_annotator(mut self, annotator: AnnotationInjector) -> Self {
        self.annotator = annotator;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        debug_assert!(temperature >= 0.0, "Temperature must not be negative");
        self.temperature = temperature;
        self
    }

    pub fn with_console(mut self, console: ConsoleMode) -> Self {
        self.console = console;
        self
    }

    /// Run one iteration to completion or first error.
    pub async fn run(
        &self,
        iteration: u32,
        pair: &AlgorithmPair,
    ) -> Result<IterationReport, IterationError> {
        let prompts = self.templates.render(pair)?;

        let class = self
            .call(self.primary.as_ref(), &prompts.class)
            .await
            .map_err(|source| IterationError::Backend {
                stage: CLASS_STAGE,
                source,
            })?;
        if let Some(hint) = &class.filename_hint {
            debug!(iteration, hint = %hint, "Primary response names a file");
        }

        let files = self.splitter.split(&class.text);
        ensure_named(&files, CLASS_STAGE)?;

        let mut files_written = Vec::new();
        for file in files {
            let annotated = self.annotator.annotate(&file.source);
            files_written.push(self.writer.write(&file.name, &annotated).await?);

            let module_prompt = format!("{}\n\n{}", prompts.module, annotated);
            let module = self
                .call(self.secondary.as_ref(), &module_prompt)
                .await
                .map_err(|source| IterationError::Backend {
                    stage: MODULE_STAGE,
                    source,
                })?;

            let module_files = self.splitter.split(&module.text);
            ensure_named(&module_files, MODULE_STAGE)?;
            for module_file in module_files {
                files_written.push(
                    self.writer
                        .write(&module_file.name, &module_file.source)
                        .await?,
                );
            }
        }

        Ok(IterationReport { files_written })
    }

    async fn call(
        &self,
        backend: &dyn CompletionBackend,
        prompt: &str,
    ) -> Result<Completion, BackendError> {
        let out: Box<dyn Write + Send> = match self.console {
            ConsoleMode::Quiet => Box::new(std::io::sink()),
            ConsoleMode::Scroll | ConsoleMode::Append => Box::new(std::io::stdout()),
        };
        collect(backend, prompt, self.temperature, out, self.console).await
    }
}

/// What a successful iteration produced.
#[derive(Debug, Clone, Default)]
pub struct IterationReport {
    /// Paths written, in order
    pub files_written: Vec<PathBuf>,
}

/// How an attempt that did not crash ended.
#[derive(Debug)]
pub enum IterationOutcome {
    Succeeded(IterationReport),
    Failed(IterationError),
}

/// An attempt that panicked.
#[derive(Debug, thiserror::Error)]
#[error("Iteration unit crashed: {detail}")]
pub struct Fault {
    pub detail: String,
}

impl Fault {
    fn from_join_error(err: JoinError) -> Self {
        if !err.is_panic() {
            return Self {
                detail: "iteration task was cancelled".to_string(),
            };
        }

        let payload = err.into_panic();
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self { detail }
    }
}

/// Run one attempt in its own task and wait for it.
///
/// A panic inside the attempt comes back as `Err(Fault)`.
pub async fn run_unit(
    pipeline: Arc<IterationPipeline>,
    iteration: u32,
    pair: AlgorithmPair,
) -> Result<IterationOutcome, Fault> {
    let handle = tokio::spawn(async move {
        match pipeline.run(iteration, &pair).await {
            Ok(report) => IterationOutcome::Succeeded(report),
            Err(err) => IterationOutcome::Failed(err),
        }
    });

    handle.await.map_err(Fault::from_join_error)
}

/// Lifecycle of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Faulted,
}

impl IterationState {
    /// Whether the attempt has ended.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            IterationState::Succeeded | IterationState::Failed | IterationState::Faulted
        )
    }
}

/// Record of a single attempt.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// Iteration number being attempted (1-indexed)
    pub iteration: u32,
    /// Attempt number across the whole run (1-indexed)
    pub attempt: u32,
    /// Current state; terminal once the attempt is in the history
    pub state: IterationState,
    /// Files written by a successful attempt
    pub files_written: usize,
    /// Failure or crash description
    pub error: Option<String>,
    /// Duration of this attempt
    pub duration: Duration,
}

impl AttemptRecord {
    /// A scheduled attempt that has not started.
    pub fn new(iteration: u32, attempt: u32) -> Self {
        Self {
            iteration,
            attempt,
            state: IterationState::Pending,
            files_written: 0,
            error: None,
            duration: Duration::ZERO,
        }
    }

    /// Mark the attempt as dispatched.
    pub fn start(&mut self) {
        debug_assert_eq!(self.state, IterationState::Pending, "Attempt started twice");
        self.state = IterationState::Running;
    }

    /// Record how the unit ended.
    pub fn finish(&mut self, result: &Result<IterationOutcome, Fault>, duration: Duration) {
        debug_assert_eq!(self.state, IterationState::Running, "Attempt was not running");
        self.duration = duration;
        match result {
            Ok(IterationOutcome::Succeeded(report)) => {
                self.state = IterationState::Succeeded;
                self.files_written = report.files_written.len();
            }
            Ok(IterationOutcome::Failed(err)) => {
                self.state = IterationState::Failed;
                self.error = Some(err.to_string());
            }
            Err(fault) => {
                self.state = IterationState::Faulted;
                self.error = Some(fault.to_string());
            }
        }
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Iterations completed
    pub completed: u32,
    /// Attempts started
    pub attempts: u32,
    /// Attempts that returned an error
    pub failures: u32,
    /// Attempts that panicked
    pub faults: u32,
    /// Total duration
    pub duration: Duration,
    /// History of all attempts
    pub history: Vec<AttemptRecord>,
}

impl RunSummary {
    /// Attempts that had to be repeated.
    pub fn retries(&self) -> u32 {
        self.failures + self.faults
    }

    /// Format as a summary string.
    pub fn format_summary(&self) -> String {
        let mut summary = format!(
            "Iterations done: {}; Execution time: {}s\n",
            self.completed,
            self.duration.as_secs()
        );
        summary.push_str(&format!(
            "  Attempts: {} ({} failed, {} crashed)\n",
            self.attempts, self.failures, self.faults
        ));

        for record in &self.history {
            if let Some(ref error) = record.error {
                summary.push_str(&format!(
                    "  Iteration {} attempt #{}: {:?} - {}\n",
                    record.iteration, record.attempt, record.state, error
                ));
            }
        }

        summary
    }
}

/// Runs iterations until `limit` have completed.
pub struct IterationController {
    pipeline: Arc<IterationPipeline>,
    catalog: AlgorithmCatalog,
    config: ControllerConfig,
    rng: DeterministicRng,
}

impl IterationController {
    pub fn new(
        pipeline: Arc<IterationPipeline>,
        catalog: AlgorithmCatalog,
        config: ControllerConfig,
    ) -> Self {
        let rng = DeterministicRng::new(config.seed);
        Self {
            pipeline,
            catalog,
            config,
            rng,
        }
    }

    /// Run the loop.
    ///
    /// There is no retry cap: an iteration that keeps failing is retried
    /// forever.
    pub async fn run(&mut self) -> RunSummary {
        let start = Instant::now();
        let mut summary = RunSummary::default();

        info!(
            limit = self.config.limit,
            seed = self.config.seed,
            "Starting generation loop"
        );

        while summary.completed < self.config.limit {
            let iteration = summary.completed + 1;
            summary.attempts += 1;
            let attempt = summary.attempts;

            let mut record = AttemptRecord::new(iteration, attempt);
            debug!(iteration, attempt, state = ?record.state, "Attempt scheduled");

            let pair = self.catalog.sample_pair(&mut self.rng);
            info!(
                iteration,
                attempt,
                limit = self.config.limit,
                first = %pair.first.name,
                second = %pair.second.name,
                "Starting iteration"
            );

            let attempt_start = Instant::now();
            record.start();
            debug!(iteration, attempt, state = ?record.state, "Dispatching unit");
            let result = run_unit(Arc::clone(&self.pipeline), iteration, pair).await;
            record.finish(&result, attempt_start.elapsed());

            match result {
                Ok(IterationOutcome::Succeeded(report)) => {
                    summary.completed += 1;
                    info!(
                        iteration,
                        attempt,
                        files = report.files_written.len(),
                        "Iteration succeeded"
                    );
                }
                Ok(IterationOutcome::Failed(err)) => {
                    summary.failures += 1;
                    warn!(iteration, attempt, error = %err, "Iteration failed, restarting");
                }
                Err(fault) => {
                    summary.faults += 1;
                    error!(iteration, attempt, error = %fault, "Iteration crashed, restarting");
                }
            }
            summary.history.push(record);

            if summary.completed < self.config.limit && !self.config.pause.is_zero() {
                tokio::time::sleep(self.config.pause).await;
            }
        }

        summary.duration = start.elapsed();
        info!(
            completed = summary.completed,
            attempts = summary.attempts,
            elapsed_secs = summary.duration.as_secs(),
            "Generation loop finished"
        );
        summary
    }
}

/// Errors that fail one iteration.
#[derive(Debug, thiserror::Error)]
pub enum IterationError {
    #[error("Prompt rendering failed: {0}")]
    Config(#[from] ConfigError),

    #[error("{stage} generation failed: {source}")]
    Backend {
        stage: &'static str,
        #[source]
        source: BackendError,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Write(#[from] WriteError),
}
