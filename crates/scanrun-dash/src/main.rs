//! ScanRun dashboard.
//!
//! Submits one scan run to the simulated engine or a REST backend and follows
//! it to completion, interactively or as plain text.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scanrun_client::{HttpRunApi, RunApi};
use scanrun_core::{LlmProvider, RunPayload};
use scanrun_dash::app::{self, App, UiState};
use scanrun_dash::{PollConfig, RunOrchestrator};
use scanrun_sim::{SimConfig, SimulatedEngine};

/// Which backend serves the runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ApiMode {
    /// In-process simulated engine.
    Mock,
    /// REST backend at `--backend-url`.
    Http,
}

#[derive(Parser)]
#[command(name = "scanrun")]
#[command(about = "Submit a GraphQL scan run and follow it live")]
#[command(version)]
struct Cli {
    /// Backend to use
    #[arg(long, value_enum, env = "SCANRUN_API_MODE", default_value = "mock")]
    mode: ApiMode,

    /// REST backend base URL (http mode)
    #[arg(long, env = "SCANRUN_BACKEND_URL", default_value = "http://localhost:8000")]
    backend_url: String,

    /// Use shortened simulated timings (mock mode)
    #[arg(long)]
    fast: bool,

    /// GraphQL endpoint to scan
    #[arg(short, long, default_value = "https://api.example.com/graphql")]
    endpoint: String,

    /// LLM provider (ollama, openai_compatible, gemini, other)
    #[arg(long, default_value = "ollama")]
    provider: LlmProvider,

    /// Model name
    #[arg(short, long, default_value = "llama3")]
    model: String,

    /// API key for the LLM provider
    #[arg(long, env = "SCANRUN_LLM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Extra GraphQL headers as a JSON object
    #[arg(long)]
    headers: Option<String>,

    /// Number of scan rounds
    #[arg(long, default_value = "2")]
    rounds: u32,

    /// Requests per schema node
    #[arg(long, default_value = "2")]
    requests_per_node: u32,

    /// Free-text notes attached to the run
    #[arg(long)]
    notes: Option<String>,

    /// Cancel the run after this many seconds
    #[arg(long)]
    cancel_after: Option<f64>,

    /// Print plain text instead of the interactive dashboard
    #[arg(long)]
    plain: bool,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn payload(&self) -> RunPayload {
        let mut payload = RunPayload::new(&self.endpoint)
            .with_model(self.provider, &self.model)
            .with_budget(self.rounds, self.requests_per_node);
        if let Some(key) = &self.api_key {
            payload = payload.with_api_key(key);
        }
        if let Some(headers) = &self.headers {
            payload = payload.with_headers_json(headers);
        }
        if let Some(notes) = &self.notes {
            payload = payload.with_notes(notes);
        }
        payload
    }

    fn api(&self) -> (Arc<dyn RunApi>, String) {
        match self.mode {
            ApiMode::Mock => {
                let config = if self.fast {
                    SimConfig::fast()
                } else {
                    SimConfig::default()
                };
                let engine: Arc<dyn RunApi> = Arc::new(SimulatedEngine::new(config));
                (engine, "mock".to_string())
            }
            ApiMode::Http => {
                let client: Arc<dyn RunApi> = Arc::new(HttpRunApi::new(&self.backend_url));
                (client, self.backend_url.clone())
            }
        }
    }
}

fn init_tracing(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("scanrun_dash=info,scanrun_sim=info,scanrun_client=info")
        })
    };

    // The interactive dashboard owns the terminal, so it only ever logs to a file.
    if let Some(path) = &cli.log_file {
        let file = std::fs::File::create(path)?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_env_filter(filter())
            .with_ansi(false)
            .init();
    } else if cli.plain {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter())
            .init();
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let payload = cli.payload();
    payload.validate()?;
    let cancel_after = cli
        .cancel_after
        .map(Duration::try_from_secs_f64)
        .transpose()?;

    let runtime = tokio::runtime::Runtime::new()?;
    let (api, backend_label) = cli.api();
    let can_cancel = api.capabilities().cancel;
    let orchestrator = Arc::new(RunOrchestrator::new(api, PollConfig::default()));

    info!(mode = ?cli.mode, endpoint = %payload.endpoint_url, "Starting scanrun");
    let run_id = runtime.block_on(orchestrator.start_run(&payload))?;

    let cancel_timer = cancel_after.map(|after| {
        let _guard = runtime.enter();
        app::schedule_cancel(orchestrator.clone(), after)
    });

    if cli.plain {
        println!("Submitted run {}", run_id);
        runtime.block_on(app::run_plain(orchestrator.clone()));
    } else {
        let terminal = ratatui::init();
        let mut dashboard = App::new(
            orchestrator.clone(),
            payload,
            runtime.handle().clone(),
            UiState::new(backend_label, can_cancel),
        );
        let result = dashboard.run(terminal);
        ratatui::restore();
        result?;
    }

    if let Some(timer) = cancel_timer {
        timer.abort();
    }
    orchestrator.stop();
    info!("scanrun shutdown complete");
    Ok(())
}
