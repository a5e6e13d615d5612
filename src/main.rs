mod dispatcher;
mod engine;
mod notify;
mod source;

use clap::{Parser, Subcommand};
use quill_core::{
    config,
    event::TypingEvent,
    traits::{EventSource, InsightSink, NotificationSink, Oracle},
};
use quill_memory::Store;
use quill_oracle::{Fingerprinter, GeminiOracle};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "quill",
    version,
    about = "Quill — typing-intent context engine and insight scheduler"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the engine and dispatcher, reading events from stdin.
    Start,
    /// Check configuration and oracle availability.
    Status,
    /// Ingest a single text event and print the resulting fragments.
    Ingest {
        /// User the event belongs to.
        #[arg(long)]
        user: String,
        /// Source app context tag.
        #[arg(long, default_value = "manual")]
        context: String,
        /// Treat the text as a full-window snapshot (analysis only).
        #[arg(long)]
        full_snapshot: bool,
        /// The text to ingest.
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Start => {
            let cfg = config::load(&cli.config)?;
            let oracle = build_oracle(&cfg);

            if !oracle.is_available().await {
                warn!(
                    "oracle '{}' is not reachable — fingerprinting will use the local fallback",
                    oracle.name()
                );
            }

            let store = Store::new(&cfg.memory).await?;
            let sink: Arc<dyn InsightSink> = Arc::new(store.clone());
            let fingerprinter = Arc::new(Fingerprinter::new(oracle.clone()));
            let engine = Arc::new(engine::IngestEngine::new(
                store.clone(),
                fingerprinter,
                sink.clone(),
                cfg.ingest.clone(),
            ));

            if cfg.dispatcher.enabled {
                let notifier: Arc<dyn NotificationSink> = Arc::new(notify::LogNotifier);
                let dispatcher = Arc::new(dispatcher::Dispatcher::new(
                    store.clone(),
                    oracle.clone(),
                    notifier,
                    sink.clone(),
                    cfg.dispatcher.clone(),
                    cfg.memory.clone(),
                ));
                tokio::spawn(dispatcher.run());
            }

            println!("Quill — reading typing events from stdin (JSON lines)...");
            let source = source::StdinSource;
            let mut rx = source
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start event source: {e}"))?;

            while let Some(event) = rx.recv().await {
                engine.submit(event).await;
            }

            // Keep the dispatcher alive after the event source ends
            // (e.g. daemonized with a closed stdin).
            if cfg.dispatcher.enabled {
                info!("event source ended; dispatcher keeps running");
                std::future::pending::<()>().await;
            }
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("Quill — Status Check\n");
            println!("Config: {}", cli.config);
            println!("Database: {}", cfg.memory.db_path);
            println!(
                "Dispatcher: {} (tick every {}s)",
                if cfg.dispatcher.enabled {
                    "enabled"
                } else {
                    "disabled"
                },
                cfg.dispatcher.tick_secs
            );
            println!("Absorption window: {}s", cfg.ingest.absorption_window_secs);
            println!();

            let oracle = build_oracle(&cfg);
            let available = oracle.is_available().await;
            println!(
                "  {}: {}",
                oracle.name(),
                if available { "available" } else { "not reachable" }
            );
        }
        Commands::Ingest {
            user,
            context,
            full_snapshot,
            text,
        } => {
            if text.is_empty() {
                anyhow::bail!("no text provided. Usage: quill ingest --user <id> <text>");
            }

            let cfg = config::load(&cli.config)?;
            let oracle = build_oracle(&cfg);
            let store = Store::new(&cfg.memory).await?;
            let sink: Arc<dyn InsightSink> = Arc::new(store.clone());
            let engine = engine::IngestEngine::new(
                store.clone(),
                Arc::new(Fingerprinter::new(oracle)),
                sink,
                cfg.ingest.clone(),
            );

            let mut event = TypingEvent::new(&user, &context, &text.join(" "));
            event.is_full_snapshot = full_snapshot;
            engine.process_event(&event).await;

            let fragments = store.fragments_for_context(&user, &context).await?;
            println!("{} fragment(s) for {user}/{context}:", fragments.len());
            for f in fragments {
                println!("  [x{}] {}", f.frequency, f.content);
            }
        }
    }

    Ok(())
}

/// Build the configured oracle. The API key falls back to the
/// GEMINI_API_KEY environment variable.
fn build_oracle(cfg: &config::Config) -> Arc<dyn Oracle> {
    let api_key = if cfg.oracle.api_key.is_empty() {
        std::env::var("GEMINI_API_KEY").unwrap_or_default()
    } else {
        cfg.oracle.api_key.clone()
    };
    Arc::new(GeminiOracle::from_config(api_key, cfg.oracle.model.clone()))
}
