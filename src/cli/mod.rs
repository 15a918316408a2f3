//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "iaris",
    version,
    author = "ECOA",
    about = "Retrieval-augmented assistant for socio-environmental impact consulting",
    long_about = "IARIS answers questions from organisation managers about impact management \
                  (theory of change, impact measurement, sustainability reporting, stakeholder \
                  engagement) by retrieving passages from a curated document corpus and grounding \
                  a language model's answer on them, with page-level citations."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/iaris/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Configuration profile to apply
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question
    Ask {
        /// Question to ask
        question: String,

        /// Number of passages to retrieve (overrides retrieval.retriever_k)
        #[arg(short = 'k', long)]
        retriever_k: Option<usize>,

        /// Restrict retrieval to a subject; repeat for several
        #[arg(short, long = "topic", value_name = "TOPIC")]
        topics: Vec<String>,

        /// Print the complete answer at once instead of streaming it
        #[arg(long)]
        no_stream: bool,

        /// Record the exchange in this session (ID or name)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Interactive conversation; an empty line or /exit quits
    Chat {
        /// Session to resume or create (ID or name)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// List the subjects available for filtering
    Topics,

    /// List saved chat sessions
    Sessions,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file and API credentials
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration and prompt template
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
