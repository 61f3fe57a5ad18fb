// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk: page overlay editing and redaction for PDF documents
//
// Entry point. Initialises logging, parses the command line, and runs one
// command against a document.

mod commands;
mod config_dir;

use std::path::PathBuf;
use std::process::ExitCode;

use blattwerk_core::error::BlattwerkError;
use blattwerk_core::human_errors::humanize_error;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "blattwerk", version, about)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show page count and page sizes.
    Info(InfoArgs),
    /// Apply an edit script and export the edited document.
    Apply(ApplyArgs),
    /// Write one page, with edits applied, as a PNG.
    Preview(PreviewArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input PDF.
    pdf: PathBuf,

    /// Configuration JSON (render scale is used for pixel sizes).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ApplyArgs {
    /// Input PDF.
    pdf: PathBuf,

    /// Edit script JSON.
    #[arg(long)]
    edits: PathBuf,

    /// Output PDF path. Defaults to the configured export file name.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Input PDF.
    pdf: PathBuf,

    /// Page to render (1-based).
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Edit script JSON applied before rendering.
    #[arg(long)]
    edits: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    output: PathBuf,

    /// Configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Info(args) => commands::info(&args.pdf, args.config.as_deref()),
        Command::Apply(args) => commands::apply(
            &args.pdf,
            &args.edits,
            args.output.as_deref(),
            args.config.as_deref(),
        ),
        Command::Preview(args) => commands::preview(
            &args.pdf,
            args.page,
            args.edits.as_deref(),
            &args.output,
            args.config.as_deref(),
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

/// Print a failure for a person: the plain-language form when the cause is a
/// Blattwerk error, the full chain otherwise.
fn report(err: &anyhow::Error) {
    tracing::error!(error = %format!("{err:#}"), "Command failed");
    match err.downcast_ref::<BlattwerkError>() {
        Some(cause) => {
            let human = humanize_error(cause);
            eprintln!("{}", human.message);
            eprintln!("{}", human.suggestion);
        }
        None => eprintln!("error: {err:#}"),
    }
}
