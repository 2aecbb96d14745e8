mod cli;
mod color;
mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use commands::export::ExportTarget;
use config::Config;
use confluence_backend::ConfluenceClient;
use export_core::{ContentSource, Exporter, HtmlToMarkdown};
use export_mock::MockSource;
use output::{output_error, output_summary};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let colors = color::init(cli.color);
    init_tracing(cli.verbose, colors.logs);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            output_error(&e, cli.format);
            ExitCode::from(1)
        }
    }
}

/// Logs go to stderr so stdout stays parseable with `-o json`
fn init_tracing(verbose: u8, ansi: bool) {
    let default = match verbose {
        0 => "warn",
        1 => "cfexport=info,export_core=info,confluence_backend=info,export_mock=info",
        _ => "cfexport=debug,export_core=debug,confluence_backend=debug,export_mock=debug",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(ansi),
        )
        .init();
}

/// Returns whether every requested item was exported
fn run(cli: &Cli) -> Result<bool> {
    if let Commands::Completions { shell } = &cli.command {
        Cli::generate_completions(*shell);
        return Ok(true);
    }

    let mut config = Config::load(cli.config.as_deref())?;
    config.merge_with_cli(cli);

    let target = match &cli.command {
        Commands::Config { action } => {
            commands::config::handle_config(action, &config, cli.config.as_deref(), cli.format)?;
            return Ok(true);
        }
        Commands::Space { keys } => ExportTarget::Spaces(keys),
        Commands::Page { ids } => ExportTarget::Pages(ids),
        Commands::PageTree { ids } => ExportTarget::PageTrees(ids),
        Commands::Completions { .. } => return Ok(true),
    };

    // Template errors surface here, before any request is made
    let options = config
        .export
        .compile()
        .context("Invalid export settings")?;
    let output_path = options.output_path.clone();

    let source = open_source(&config)?;
    let converter = HtmlToMarkdown::new();
    let mut exporter = Exporter::new(source.as_ref(), &converter, options);
    if let Some(secs) = cli.timeout {
        exporter = exporter.with_deadline(Instant::now() + Duration::from_secs(secs));
    }

    let summary = commands::export::handle_export(&exporter, target)?;
    output_summary(&summary, &output_path, cli.format);
    Ok(summary.is_success())
}

/// The fixture-backed mock when CFEXPORT_MOCK_DIR is set, Confluence otherwise
fn open_source(config: &Config) -> Result<Box<dyn ContentSource>> {
    if let Some(dir) = export_mock::get_mock_dir() {
        debug!(dir = %dir.display(), "using mock content source");
        let mut source = MockSource::load(&dir)?;
        if let Some(log) = export_mock::get_mock_log() {
            source = source.with_call_log(log);
        }
        return Ok(Box::new(source));
    }

    config.validate()?;
    let settings = &config.confluence;
    let (Some(url), Some(token)) = (settings.url.as_deref(), settings.token.as_deref()) else {
        anyhow::bail!("Confluence URL and token are required");
    };

    let mut client = ConfluenceClient::new(url, settings.username.as_deref(), token);
    if let Some(secs) = settings.request_timeout {
        client = client.with_timeout(Duration::from_secs(secs));
    }
    if let Some(size) = settings.page_size {
        client = client.with_page_size(size);
    }
    Ok(Box::new(client))
}
