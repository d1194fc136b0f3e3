//! CLI for generating React Native bridge modules with local models.
//!
//! # Usage
//!
//! ```bash
//! # Ten iterations with the default models and files
//! cargo run -p cg-generator --bin cg-generate
//!
//! # Remote Ollama server, custom prompt file
//! cargo run -p cg-generator --bin cg-generate -- --host http://gpu-box:11434 --prompts prompts.yaml
//!
//! # More logging
//! RUST_LOG=debug cargo run -p cg-generator --bin cg-generate -- --quiet
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use cg_core::{
    AlgorithmCatalog, BackendError, ConfigError, DeterministicRng, PromptTemplates,
};
use cg_generator::client::{DEFAULT_HOST, DEFAULT_PRIMARY_MODEL, DEFAULT_SECONDARY_MODEL};
use cg_generator::controller::DEFAULT_TEMPERATURE;
use cg_generator::{
    ConsoleMode, ControllerConfig, IterationController, IterationPipeline, OllamaClient,
    OllamaConfig, OutputWriter, WriteError,
};
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Generate Swift classes and React Native bridge modules in a loop.
#[derive(Parser, Debug)]
#[command(name = "cg-generate", version, about)]
struct Args {
    /// Ollama server URL
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Number of iterations to complete
    #[arg(long, default_value_t = 10)]
    limit: u32,

    /// Output directory
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Project name used for the bridging header
    #[arg(long, default_value = "CleanerApp")]
    project: String,

    /// Algorithm catalog (JSON)
    #[arg(long, default_value = "algorithms.json")]
    algorithms: PathBuf,

    /// Prompt templates (YAML)
    #[arg(long, default_value = "prompts.yaml")]
    prompts: PathBuf,

    /// Model for the Swift class stage
    #[arg(long, default_value = DEFAULT_PRIMARY_MODEL)]
    primary_model: String,

    /// Model for the bridge module stage
    #[arg(long, default_value = DEFAULT_SECONDARY_MODEL)]
    secondary_model: String,

    /// Sampling temperature for both models
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Pause between attempts in milliseconds
    #[arg(long, default_value_t = 1000)]
    pause_ms: u64,

    /// Seed for algorithm sampling (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Do not echo model output
    #[arg(long)]
    quiet: bool,
}

/// Errors that stop the program before the loop starts.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create model client: {0}")]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut controller = match build_controller(&args).await {
        Ok(controller) => controller,
        Err(e) => {
            error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let summary = controller.run().await;
    println!();
    println!("{}", summary.format_summary());
    ExitCode::SUCCESS
}

async fn build_controller(args: &Args) -> Result<IterationController, StartupError> {
    let catalog = AlgorithmCatalog::load(&args.algorithms)?;
    let templates = PromptTemplates::load(&args.prompts)?;

    // Catch template typos before the first model call.
    let mut probe_rng = DeterministicRng::new(0);
    templates.validate(&catalog.sample_pair(&mut probe_rng))?;

    info!(
        algorithms = catalog.len(),
        catalog = %args.algorithms.display(),
        prompts = %args.prompts.display(),
        "Configuration loaded"
    );

    let writer = OutputWriter::new(&args.output);
    if let Some(header) = writer.bootstrap(&args.project).await? {
        debug!(header = %header.display(), "Seeded bridging header");
    }
    info!(output = %writer.root().display(), "Writing generated files");

    let primary = OllamaClient::new(
        OllamaConfig::default()
            .with_host(&args.host)
            .with_model(&args.primary_model),
    )?;
    let secondary = OllamaClient::new(
        OllamaConfig::default()
            .with_host(&args.host)
            .with_model(&args.secondary_model),
    )?;
    info!(
        url = %primary.config().generate_url(),
        primary = %primary.config().model,
        secondary = %secondary.config().model,
        "Model clients ready"
    );

    let console = if args.quiet {
        ConsoleMode::Quiet
    } else {
        ConsoleMode::detect()
    };
    let pipeline = IterationPipeline::new(Arc::new(primary), Arc::new(secondary), templates, writer)?
        .with_temperature(args.temperature)
        .with_console(console);

    let mut config = ControllerConfig::default()
        .with_limit(args.limit)
        .with_pause(Duration::from_millis(args.pause_ms));
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    Ok(IterationController::new(Arc::new(pipeline), catalog, config))
}
