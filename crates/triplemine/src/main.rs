mod cli;
mod config;
mod logging;
mod miner;
mod model;
mod questions;
mod retry;
mod run;
mod triples;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Command};
use crate::config::PipelineConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = if cli.verbose {
        true
    } else {
        logging::env_flag()
    };
    logging::init(verbose);
    // Configuration problems must surface before any processing starts.
    let config = PipelineConfig::from_env()?;
    match cli.command {
        Command::Questions { input, output } => {
            run::questions_phase(&PathBuf::from(input), &PathBuf::from(output), &config)
                .map(|_| ())
        }
        Command::Mine {
            questions,
            db,
            output,
        } => run::mine_phase(
            &PathBuf::from(questions),
            &PathBuf::from(db),
            &PathBuf::from(output),
            &config,
        )
        .map(|_| ()),
        Command::Run { input, output, db } => {
            let output = PathBuf::from(output);
            let db = db
                .map(PathBuf::from)
                .unwrap_or_else(|| output.join("embeddings.db"));
            run::full_pipeline(&PathBuf::from(input), &db, &output, &config)
        }
    }
}
