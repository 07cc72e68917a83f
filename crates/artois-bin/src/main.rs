//! Artois entrypoint.
use anyhow::{Context, Result};
use clap::Parser;
use core_client::InferenceClient;
use core_config::{Config, ConfigOverrides, load_from};
use core_events::{EVENT_CHANNEL_CAP, Event, EventSourceRegistry};
use core_generate::{ContextBuffer, GenerationController, GenerationParams, GenerationSettings};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tokio::sync::mpsc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

mod page;
mod runtime;

use page::PageWriter;
use runtime::Runtime;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "artois",
    version,
    about = "Generate text and highlight where the model paid attention"
)]
struct Args {
    /// Initial buffer text.
    pub context: Option<String>,
    /// Optional configuration file path (overrides discovery of `artois.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Inference endpoint URL.
    #[arg(long = "server")]
    pub server: Option<String>,
    /// Generations per `:generate` without an explicit count.
    #[arg(long = "count")]
    pub count: Option<u32>,
    /// Batch size per request (clamped to 1..=8192).
    #[arg(long = "batch-size", conflicts_with = "batch_step")]
    pub batch_size: Option<u32>,
    /// Batch-size control step (1..=26).
    #[arg(long = "batch-step")]
    pub batch_step: Option<u32>,
    /// Extra generation parameter, `key=value`. Repeatable.
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
    /// HTML output path.
    #[arg(long = "out")]
    pub out: Option<PathBuf>,
    /// Start generating immediately.
    #[arg(long = "start")]
    pub start: bool,
}

fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    GenerationParams::parse_pair(raw).ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn run(&mut self, args: &Args) -> Result<Config> {
        self.configure_logging()?;
        Self::install_panic_hook();
        info!(target: "runtime", "startup");

        let mut config = load_from(args.config.clone())?;
        let batch_size = args
            .batch_step
            .map(core_generate::slider_to_batch_size)
            .or(args.batch_size);
        config.apply_overrides(ConfigOverrides {
            server_url: args.server.clone(),
            batch_size,
            count: args.count,
            output: args.out.clone(),
            params: args.params.clone(),
        });
        info!(
            target: "runtime.startup",
            config_override = args.config.is_some(),
            config_file = config.raw.is_some(),
            batch_size = config.effective_batch_size,
            batch_step = core_generate::batch_size_to_slider(config.effective_batch_size),
            count = config.file.generation.count,
            params = config.file.generation.params.len(),
            initial_len = args.context.as_deref().map_or(0, str::len),
            "bootstrap_complete"
        );
        Ok(config)
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("artois.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "artois.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .with_ansi(false)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_err) => {
                // Global subscriber already installed; dropping the guard shuts the writer down.
            }
        }

        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

fn build_controller(
    config: &Config,
    initial: Option<String>,
    tx: mpsc::Sender<Event>,
) -> Result<GenerationController> {
    let client = InferenceClient::builder()
        .endpoint(config.server_url())
        .timeout(config.request_timeout())
        .build()
        .context("building inference client")?;
    let settings = GenerationSettings {
        batch_size: config.effective_batch_size,
        params: config
            .file
            .generation
            .params_as_strings()
            .into_iter()
            .collect(),
    };
    Ok(GenerationController::new(
        client,
        ContextBuffer::new(initial.unwrap_or_default()),
        settings,
        tx,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut startup = AppStartup::new();
    let config = startup.run(&args)?;

    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let controller = build_controller(&config, args.context.clone(), tx.clone())?;
    let page = PageWriter::new(config.file.output.path.clone());
    eprintln!("artois: writing {}", page.path().display());

    let mut runtime = Runtime::new(
        controller,
        page,
        config.file.generation.count,
        rx,
        tx.clone(),
    );

    let (input, input_shutdown) = core_input::stdin_source().context("starting stdin reader")?;
    let mut registry = EventSourceRegistry::new();
    registry.register(input);
    let handles = registry.spawn_all(&tx);
    drop(tx);
    runtime.attach_sources(handles, Some(input_shutdown));

    if args.start {
        runtime
            .controller_mut()
            .generate(config.file.generation.count);
    }

    let reason = runtime.run().await?;
    info!(target: "runtime", %reason, "exit");
    drop(startup);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_params_and_overrides() {
        let args = Args::try_parse_from([
            "artois",
            "Once upon a time",
            "--server",
            "http://127.0.0.1:9/",
            "--batch-step",
            "4",
            "--param",
            "max_tokens=20",
            "--param",
            "stop=a=b",
            "--start",
        ])
        .unwrap();
        assert_eq!(args.context.as_deref(), Some("Once upon a time"));
        assert_eq!(args.batch_step, Some(4));
        assert_eq!(
            args.params,
            vec![
                ("max_tokens".to_string(), "20".to_string()),
                ("stop".to_string(), "a=b".to_string())
            ]
        );
        assert!(args.start);
    }

    #[test]
    fn malformed_param_is_rejected() {
        assert!(Args::try_parse_from(["artois", "--param", "novalue"]).is_err());
    }

    #[test]
    fn batch_size_and_step_conflict() {
        assert!(
            Args::try_parse_from(["artois", "--batch-size", "4", "--batch-step", "4"]).is_err()
        );
    }

    #[test]
    fn controller_inherits_config() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            batch_size: Some(12),
            params: vec![("top_k".into(), "5".into())],
            ..Default::default()
        });
        let (tx, _rx) = mpsc::channel(1);
        let controller = build_controller(&config, Some("seed".into()), tx).unwrap();
        let settings = controller.settings();
        assert_eq!(settings.batch_size, 12);
        assert_eq!(settings.params.get("top_k"), Some("5"));
        assert_eq!(controller.buffer().get(), "seed");
    }
}
