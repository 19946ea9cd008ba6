use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use clausemap::search::{DEFAULT_LIMIT, DEFAULT_PER_CORPUS_LIMIT};

#[derive(Debug, Parser)]
#[command(
    name = "clausemap",
    about = "Fuzzy search across structured regulatory and standards documents"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Do not record served queries
    #[arg(long, global = true)]
    pub no_telemetry: bool,

    /// Print cache, timing and telemetry statistics to stderr on exit
    #[arg(long, global = true)]
    pub stats: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search a single corpus
    Search(SearchArgs),
    /// Search every corpus and group the results
    Map(MapArgs),
    /// Return the single best match across all corpora
    Ask(AskArgs),
    /// List loaded corpora
    Corpora(JsonArgs),
    /// Show data locations, settings and logged query counts
    Status(JsonArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Corpus name (case-insensitive)
    pub corpus: String,

    /// The search query
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Number of results to return
    #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
    pub count: usize,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Map --

#[derive(Debug, Parser)]
pub struct MapArgs {
    /// The search query
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Number of results per corpus
    #[arg(short = 'n', long, default_value_t = DEFAULT_PER_CORPUS_LIMIT)]
    pub count: usize,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Ask --

#[derive(Debug, Parser)]
pub struct AskArgs {
    /// Free-text question
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct JsonArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Join positional words back into one query string.
pub fn join_query(words: &[String]) -> String {
    words.join(" ")
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "clausemap",
            &mut std::io::stdout(),
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_search_defaults() {
        let cli = Cli::parse_from(["clausemap", "search", "ESRS", "scope", "3"]);
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.corpus, "ESRS");
                assert_eq!(join_query(&args.query), "scope 3");
                assert_eq!(args.count, 3);
                assert!(!args.json);
            }
            _ => panic!("expected search command"),
        }
        assert!(!cli.no_telemetry);
    }

    #[test]
    fn parse_map_with_globals() {
        let cli = Cli::parse_from([
            "clausemap",
            "map",
            "water",
            "-n",
            "4",
            "--json",
            "--no-telemetry",
            "-vv",
        ]);
        assert!(cli.no_telemetry);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Map(args) => {
                assert_eq!(args.count, 4);
                assert!(args.json);
            }
            _ => panic!("expected map command"),
        }
    }

    #[test]
    fn search_requires_a_query() {
        assert!(Cli::try_parse_from(["clausemap", "search", "ESRS"]).is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(
            Cli::try_parse_from(["clausemap", "-q", "-v", "corpora"]).is_err()
        );
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
