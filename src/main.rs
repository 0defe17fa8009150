use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use codeq::changeset::parse_text_search;
use codeq::output;
use codeq::query::transformer::Step;
use codeq::query::types::to_string;
use codeq::query::{
    ParserOptions, QueryError, SearchType, init_with, pipeline, pretty_json, string_human,
    substitute_search_contexts,
};
use codeq::utils::{AppConfig, get_config_path};

#[derive(Parser)]
#[command(name = "codeq", version)]
#[command(about = "Parse, normalize and plan code search queries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Search type (literal, regexp, structural, standard, lucky, keyword)
    #[arg(short = 't', long, global = true, value_parser = parse_search_type)]
    search_type: Option<SearchType>,

    /// Read repo:, file: and repohasfile: values as globs
    #[arg(long, global = true)]
    glob: bool,

    /// Disable coloured output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the parse tree as an S-expression
    Parse {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,
    },
    /// Print the plan, one basic query per line
    Plan {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,
    },
    /// Print the planned query in canonical form
    Fmt {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,
    },
    /// Print the parse tree as JSON
    Json {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,
    },
    /// Parse a changeset text search
    Changeset {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,
    },
    /// Show the configuration file location and contents
    Config {
        /// Write the current settings to the configuration file
        #[arg(long)]
        init: bool,
    },
}

fn parse_search_type(s: &str) -> Result<SearchType, String> {
    s.parse().map_err(|e: QueryError| e.to_string())
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let color = !cli.no_color;
    if let Err(err) = run(cli) {
        // Nothing more to report if stderr itself is gone.
        let _ = output::print_error(&err, color);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load()?;
    let options = ParserOptions {
        search_type: cli.search_type.unwrap_or(config.search_type),
        globbing: cli.glob || config.globbing,
    };
    let color = !cli.no_color;

    match cli.command {
        Commands::Parse { query } => {
            let nodes = init_with(&query.join(" "), options)(Vec::new())?;
            output::print_line(&to_string(&nodes))?;
        }
        Commands::Json { query } => {
            let nodes = init_with(&query.join(" "), options)(Vec::new())?;
            output::print_line(&pretty_json(&nodes))?;
        }
        Commands::Plan { query } => {
            let plan = pipeline(steps(&query.join(" "), options, config))?;
            output::print_plan(&plan, color)?;
        }
        Commands::Fmt { query } => {
            let plan = pipeline(steps(&query.join(" "), options, config))?;
            output::print_line(&string_human(&plan.to_parse_tree()))?;
        }
        Commands::Changeset { query } => {
            let terms = parse_text_search(&query.join(" "))?;
            output::print_terms(&terms, color)?;
        }
        Commands::Config { init } => {
            let path = get_config_path()?;
            if init {
                config.save()?;
                log::info!("wrote config to {}", path.display());
            }
            println!("{}", path.display());
            let content =
                serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
            println!("{content}");
        }
    }

    Ok(())
}

/// Parsing followed by search context expansion from the user's config.
fn steps(input: &str, options: ParserOptions, config: AppConfig) -> Vec<Step> {
    let search_type = options.search_type;
    let contexts: Step = Box::new(move |nodes| {
        let lookup = |name: &str| Ok(config.context(name).map(str::to_string));
        Ok(substitute_search_contexts(lookup, nodes, search_type)?.to_parse_tree())
    });
    vec![init_with(input, options), contexts]
}
