//! Instant JSON checker
//!
//! Validates annotation documents (a bare array or `{"annotations": [...]}`)
//! and reports every rejected record with its field path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use book_reader_bridge::instant::{self, DocumentError};
use book_reader_bridge::Config;

#[derive(Parser, Debug)]
#[command(name = "book-reader-bridge", version, about = "Validate Instant JSON annotation documents", long_about = None)]
struct Args {
    /// Documents to check: a bare array or `{"annotations": [...]}`
    #[arg(value_name = "FILE", required = true, num_args = 1..)]
    paths: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut failed = 0usize;
    for path in &args.paths {
        match check_file(path).await {
            Ok(true) => {}
            Ok(false) => failed += 1,
            Err(e) => {
                failed += 1;
                tracing::error!(path = %path.display(), "{:#}", e);
            }
        }
    }

    tracing::info!(checked = args.paths.len(), failed, "Check finished");
    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Returns whether the document is valid
async fn check_file(path: &Path) -> anyhow::Result<bool> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_slice(&raw).with_context(|| format!("parsing {}", path.display()))?;

    match instant::decode_document(&value) {
        Ok(annotations) => {
            let mut by_kind: BTreeMap<&'static str, usize> = BTreeMap::new();
            for annotation in &annotations {
                *by_kind.entry(annotation.discriminant()).or_default() += 1;
            }
            println!("{}: ok, {} annotation(s)", path.display(), annotations.len());
            for (discriminant, count) in by_kind {
                println!("  {:<24} {}", discriminant, count);
            }
            Ok(true)
        }
        Err(DocumentError::NotADocument) => {
            println!("{}: {}", path.display(), DocumentError::NotADocument);
            Ok(false)
        }
        Err(e) => {
            println!("{}: {} rejected", path.display(), e.violations().len());
            for violation in e.violations() {
                println!("  {}", violation);
            }
            Ok(false)
        }
    }
}
