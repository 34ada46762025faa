mod config;
mod expr_input;
mod filter_cmd;
mod output;
mod tags_cmd;

use clap::{Parser, Subcommand};
use output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sessiondeck",
    about = "sessiondeck CLI - tag AI coding sessions and filter them by tag expressions"
)]
struct Cli {
    /// Database file (overrides `database.path` from the config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a tag filter expression to SQL without touching the database
    Compile {
        /// Expression JSON, `@file` to read a file, or `-` for stdin
        expr: String,

        /// Refuse malformed nodes instead of dropping them
        #[arg(long)]
        strict: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Check that every tag referenced by an expression exists
    Validate {
        /// Expression JSON, `@file` to read a file, or `-` for stdin
        expr: String,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List ids of sessions matching a tag filter expression
    Filter {
        /// Expression JSON, `@file` to read a file, or `-` for stdin
        expr: String,

        /// Refuse malformed nodes instead of dropping them
        #[arg(long)]
        strict: bool,

        /// Skip the tag catalog check before querying
        #[arg(long)]
        no_validate: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage the tag catalog and session tags
    Tags {
        #[command(subcommand)]
        action: TagsAction,
    },

    /// Manage sessions in the local catalog
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },

    /// Show the effective configuration
    Config,
}

#[derive(Subcommand)]
pub enum TagsAction {
    /// List all tags
    List {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Create a tag
    Add {
        name: String,
        /// Display color, e.g. `#3b82f6`
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a tag and detach it from every session
    Rm { id: i64 },
    /// Rename a tag
    Rename { id: i64, name: String },
    /// Attach a tag to a session
    Assign { session: String, tag_id: i64 },
    /// Detach a tag from a session
    Unassign { session: String, tag_id: i64 },
}

#[derive(Subcommand)]
pub enum SessionsAction {
    /// Add or update a session
    Add {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        project: Option<String>,
    },
    /// List sessions, newest first, with their tags
    List {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Delete a session
    Rm { id: String },
}

fn main() {
    let cli = Cli::parse();

    let loaded = config::load_config();
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "warn".to_string());
    init_tracing(&level);

    let result = loaded.and_then(|app_config| {
        let db_path = || config::resolve_db_path(cli.db.clone(), &app_config);
        match cli.command {
            Commands::Compile {
                expr,
                strict,
                format,
            } => filter_cmd::run_compile(&expr, strict || app_config.filter.strict, &format),
            Commands::Validate { expr, format } => {
                filter_cmd::run_validate(&db_path()?, &expr, &format)
            }
            Commands::Filter {
                expr,
                strict,
                no_validate,
                format,
            } => filter_cmd::run_filter(
                &db_path()?,
                &expr,
                filter_cmd::FilterOptions {
                    strict: strict || app_config.filter.strict,
                    validate: !no_validate && app_config.filter.validate_before_query,
                },
                &format,
            ),
            Commands::Tags { action } => tags_cmd::run_tags(&db_path()?, action),
            Commands::Sessions { action } => tags_cmd::run_sessions(&db_path()?, action),
            Commands::Config => config::show_config(&app_config, &db_path()?),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(default_directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
