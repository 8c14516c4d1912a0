use clap::{Parser as ClapParser, Subcommand};
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;
use vaultql::cli::{self, CheckOptions, CheckResult, CliError};

#[derive(ClapParser)]
#[command(name = "vaultql")]
#[command(about = "vaultql - A query language for notes, tags, folders and frontmatter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and execute a query against a JSON document list
    Run {
        /// The query to execute
        query: String,

        /// JSON file with the documents (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't execute
        #[arg(long)]
        syntax_only: bool,

        /// Resolve FROM by scanning documents instead of building indexes
        #[arg(long)]
        no_index: bool,
    },

    /// Print the tokens of a query
    Tokens {
        /// The query to tokenize
        query: String,
    },

    /// List documentation categories
    Docs,

    /// Show documentation for a specific category
    Doc {
        /// Category name (use 'vaultql docs' to list categories)
        category: String,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("VAULTQL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            query,
            input,
            pretty,
            syntax_only,
            no_index,
        } => run(query, input, pretty, syntax_only, no_index),
        Commands::Tokens { query } => {
            for line in cli::token_listing(&query) {
                println!("{}", line);
            }
            Ok(())
        }
        Commands::Docs => {
            print!("{}", cli::get_docs_overview());
            Ok(())
        }
        Commands::Doc { category } => cli::get_doc_category(&category).map(|content| {
            print!("{}", content);
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(
    query: String,
    input: Option<String>,
    pretty: bool,
    syntax_only: bool,
    no_index: bool,
) -> Result<(), CliError> {
    let input = match input {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None if !syntax_only && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = CheckOptions {
        query,
        input,
        pretty,
        syntax_only,
        no_index,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Success(output) => {
            let json = if pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }?;
            println!("{}", json);
        }
    }
    Ok(())
}
