//! lg-coordinator - headless state coordinator for listing-generator
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use lg_coordinator::headless::runner::resolve_project_path;
use lg_coordinator::headless::HeadlessEvent;
use lg_coordinator::{run_headless, HeadlessOptions};
use lgc_core::prelude::*;

/// lg-coordinator - drive listing-generator selections from the command line
#[derive(Parser, Debug)]
#[command(name = "lgc", version)]
#[command(about = "Command-rule state coordinator for listing-generator", long_about = None)]
struct Args {
    /// Project root (defaults to the current directory)
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Context template to select
    #[arg(long, value_name = "NAME")]
    template: Option<String>,

    /// Section to select
    #[arg(long, value_name = "NAME")]
    section: Option<String>,

    /// Activate a tag (repeatable)
    #[arg(long = "tag", value_name = "SET:TAG", value_parser = parse_pair)]
    tags: Vec<(String, String)>,

    /// Select a mode (repeatable)
    #[arg(long = "mode", value_name = "SET:MODE", value_parser = parse_pair)]
    modes: Vec<(String, String)>,

    /// Free-form task text passed to the listing tool
    #[arg(long, value_name = "TEXT")]
    task: Option<String>,

    /// Integration provider to send listings to
    #[arg(long, value_name = "ID")]
    provider: Option<String>,

    #[arg(long = "lib", value_name = "LIB")]
    tokenizer_lib: Option<String>,

    #[arg(long, value_name = "NAME")]
    encoder: Option<String>,

    /// Token budget for the listing
    #[arg(long, value_name = "TOKENS")]
    ctx_limit: Option<u64>,

    /// Branch to diff against
    #[arg(long = "branch", value_name = "NAME")]
    target_branch: Option<String>,

    /// Render the listing after applying selections
    #[arg(long)]
    generate: bool,

    /// Render and send the listing to the selected provider
    #[arg(long, conflicts_with = "generate")]
    send: bool,

    /// Keep reading commands from stdin (one per line)
    #[arg(long, short = 'i')]
    interactive: bool,

    /// Only print the final snapshot
    #[arg(long)]
    final_only: bool,

    /// Ignore saved selections
    #[arg(long)]
    fresh: bool,

    /// Save selections to .lgc/state.local.toml on exit
    #[arg(long)]
    save: bool,

    /// Write a commented .lgc/config.toml and exit
    #[arg(long)]
    init: bool,
}

fn parse_pair(value: &str) -> std::result::Result<(String, String), String> {
    match value.split_once(':') {
        Some((a, b)) if !a.is_empty() && !b.is_empty() => Ok((a.to_string(), b.to_string())),
        _ => Err(format!("expected SET:VALUE, got '{value}'")),
    }
}

impl From<Args> for HeadlessOptions {
    fn from(args: Args) -> Self {
        Self {
            template: args.template,
            section: args.section,
            tags: args.tags,
            modes: args.modes,
            task: args.task,
            provider: args.provider,
            tokenizer_lib: args.tokenizer_lib,
            encoder: args.encoder,
            ctx_limit: args.ctx_limit,
            target_branch: args.target_branch,
            generate: args.generate,
            send: args.send,
            interactive: args.interactive,
            final_only: args.final_only,
            fresh: args.fresh,
            save: args.save,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = Args::parse();

    color_eyre::install().map_err(|e| Error::config(e.to_string()))?;

    // Stdout carries NDJSON, so a logging failure is reported on stderr only
    if let Err(e) = lgc_core::logging::init() {
        eprintln!("warning: logging disabled: {e}");
    }

    let project_path = match resolve_project_path(args.path.take()) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("❌ Invalid project path: {e}");
            std::process::exit(1);
        }
    };

    if args.init {
        let path = lgc_app::config::init_config_dir(&project_path)?;
        eprintln!("✅ Wrote {}", path.display());
        return Ok(());
    }

    let result = run_headless(&project_path, args.into()).await;
    if let Err(ref e) = result {
        error!("Application error: {:?}", e);
        HeadlessEvent::error(e.to_string(), e.is_fatal()).emit();
    }
    result
}
