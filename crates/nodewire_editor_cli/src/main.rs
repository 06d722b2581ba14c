// SPDX-License-Identifier: MIT OR Apache-2.0
//! NodeWire document tool.
//!
//! Thin driver around the model and merge crates, meant to be wired into a
//! version-control workflow: `validate` and `fix` for single documents,
//! `merge` as a three-way merge driver. Exit codes: 0 clean, 1 validation
//! errors or unresolved conflicts, 2 I/O or parse failure.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// NodeWire project document tool
#[derive(Parser, Debug)]
#[command(name = "nodewire")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a type library JSON file; without it, port-name checks
    /// against node type schemas are skipped
    #[arg(long, global = true)]
    types: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Report structural errors in a project document
    Validate {
        /// Path to the project document
        document: PathBuf,
    },

    /// Remove dangling connections from a project document
    Fix {
        /// Path to the project document
        document: PathBuf,

        /// Write the repaired document here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Three-way merge of two edited documents against their ancestor
    Merge {
        /// The common ancestor document
        ancestor: PathBuf,

        /// The local edit
        mine: PathBuf,

        /// The remote edit
        theirs: PathBuf,

        /// Where to write the merged document
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "nodewire_editor_model=info,nodewire_editor_merge=info,nodewire_editor_cli=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Validate { document } => commands::validate(document, cli.types.as_deref()),
        Commands::Fix { document, output } => {
            commands::fix(document, output.as_deref(), cli.types.as_deref())
        }
        Commands::Merge {
            ancestor,
            mine,
            theirs,
            output,
        } => commands::merge(ancestor, mine, theirs, output, cli.types.as_deref()),
    };

    match result {
        Ok(commands::Outcome::Clean) => ExitCode::SUCCESS,
        Ok(commands::Outcome::Findings) => ExitCode::from(1),
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(2)
        }
    }
}
