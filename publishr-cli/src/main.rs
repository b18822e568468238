//! # publishr CLI
//!
//! Command-line interface for rendering a book project to e-book HTML and
//! print LaTeX.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "publishr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project directory holding the page sources
    #[arg(long, short = 'C', global = true, default_value = ".")]
    project: PathBuf,

    /// Language tag of the edition to build (e.g. "en")
    #[arg(long, short, global = true, env = "PUBLISHR_LANGUAGE")]
    language: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the e-book HTML into <project>/epub
    Ebook {
        /// Prefix for image URLs; also enables stylesheet inlining
        #[arg(long)]
        resources_url: Option<String>,

        /// Directory holding the stock epub.css and preview.css
        #[arg(long)]
        skeleton: Option<PathBuf>,
    },

    /// Render the print LaTeX into <project>/latex
    Latex,

    /// Concatenate the bibliography fragments of the language
    MergeBib,

    /// List the cited keys that the bibliography defines
    UsedKeys {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let language = cli.language.as_deref();
    match cli.command {
        Commands::Ebook {
            resources_url,
            skeleton,
        } => commands::build_ebook(&cli.project, language, resources_url, skeleton),
        Commands::Latex => commands::build_latex(&cli.project, language),
        Commands::MergeBib => commands::merge_bib(&cli.project, language),
        Commands::UsedKeys { json } => commands::used_keys(&cli.project, language, json),
    }
}
