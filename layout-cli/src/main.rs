//! # Saorsa Layout Engine
//!
//! Command line entry point.

use anyhow::Context;
use clap::Parser;
use layout_cli::{apply_file, render_tree, CliArgs, Command};
use layout_core::{DocumentHandle, EngineConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,layout_core=debug,layout_cli=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    // Use JSON format when RUST_LOG_FORMAT=json
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = EngineConfig::from(&args);
    tracing::info!(
        runtime_version = %config.schema_version,
        history_limit = config.history_limit,
        "Starting layout engine"
    );

    let mut handle = DocumentHandle::new(config);
    match args.command {
        Command::Check { file } => {
            handle
                .load_from_path(&file)
                .with_context(|| format!("{} is not a valid document", file.display()))?;
            let doc = handle.document();
            println!(
                "{}: ok (v{}, {} widgets, {} groups)",
                file.display(),
                doc.schema_version,
                doc.widgets.len(),
                doc.groups.len()
            );
        }
        Command::Inspect { file } => {
            handle
                .load_from_path(&file)
                .with_context(|| format!("failed to load {}", file.display()))?;
            print!("{}", render_tree(&handle.document()));
        }
        Command::Apply { file, script, out } => {
            let (report, target) = apply_file(&mut handle, &file, &script, out.as_deref())?;
            tracing::info!(
                applied = report.applied,
                skipped = report.skipped,
                path = %target.display(),
                "Script applied"
            );
        }
    }
    Ok(())
}
