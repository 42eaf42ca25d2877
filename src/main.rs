use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{error, info};

use morningbot::config::SinkKind;
use morningbot::{BriefingContext, MorningBotConfig, MorningBotError, Sources, compose, logging, sink_from_config};

/// Assemble today's morning briefing and deliver it
#[derive(Debug, Parser)]
#[command(name = "morningbot", version, about)]
struct Cli {
    /// Configuration file (default: <config dir>/morningbot/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Briefing language, overrides the configured one
    #[arg(short, long, value_name = "TAG")]
    lang: Option<String>,

    /// Print the briefing instead of using the configured sink
    #[arg(long)]
    stdout: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            match e.downcast_ref::<MorningBotError>() {
                Some(err) => eprintln!("{}", err.user_message()),
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config =
        MorningBotConfig::load_from_path(cli.config.clone()).context("Failed to load configuration")?;
    if let Some(lang) = cli.lang {
        config.language = lang;
    }
    if cli.stdout {
        config.delivery.sink = SinkKind::Console;
    }

    logging::init(&config.logging, cli.verbose);
    info!("MorningBot {} starting", morningbot::VERSION);

    let context = BriefingContext::new(Local::now().date_naive(), config.language.clone());
    let sink = sink_from_config(&config.delivery, context.today, config.http.timeout_seconds)
        .context("Failed to set up delivery")?;
    let sources = Sources::connect(&config).context("Failed to set up data sources")?;

    let message = compose(&config, &context, &sources)
        .await
        .context("Failed to assemble briefing")?;

    sink.deliver(&message)
        .await
        .with_context(|| format!("Failed to deliver briefing via {}", sink.name()))?;
    info!("Briefing delivered via {}", sink.name());
    Ok(())
}
