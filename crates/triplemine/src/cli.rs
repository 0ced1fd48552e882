use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "triplemine",
    about = "Build contrastive training triples from parsed PDF sections"
)]
pub struct Cli {
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Chunk parsed sections and generate questions per chunk.
    Questions {
        input: String,
        #[arg(long, default_value = "dataset")]
        output: String,
    },
    /// Upload chunk embeddings, mine hard negatives, and assemble triples.
    Mine {
        questions: String,
        #[arg(long, default_value = "dataset/embeddings.db")]
        db: String,
        #[arg(long, default_value = "dataset")]
        output: String,
    },
    /// Run both phases in sequence.
    Run {
        input: String,
        #[arg(long, default_value = "dataset")]
        output: String,
        #[arg(long)]
        db: Option<String>,
    },
}
