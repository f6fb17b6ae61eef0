//! Pieces CLI application entry point
//!
//! Runs piece routes against a local sled database as the local
//! administrator.
//!
//! # Usage
//!
//! ```bash
//! # Create and publish an article
//! pieces insert article title="Hello World" tags=news,rust
//! pieces publish article <id>
//!
//! # Page through drafts and published articles, newest first
//! pieces list article --all --page 2
//!
//! # Search and sort
//! pieces list article -s hello --sort title
//!
//! # Trash and rescue
//! pieces trash article <id>
//! pieces rescue article <id>
//!
//! # Quiet mode (only output results)
//! pieces -q list article
//! ```
//!
//! # Configuration
//!
//! Settings live in the user's config directory
//! (`~/.config/pieces/config.toml` on Linux) and may be overridden with
//! `PIECES_*` environment variables.

use pieces::{
    Piece, PiecesError,
    api::{ApiResponse, ModuleBuilder, PieceModule, Reply, RequestContext},
    cli::{Cli, Commands},
    config::PiecesConfig,
    db::Database,
    output,
    pipeline::Status,
    store::PageInfo,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, PiecesError>;

/// List envelope data as it comes back from the list route
#[derive(Deserialize)]
struct ListData {
    pieces: Vec<Piece>,
    #[serde(flatten)]
    page_info: PageInfo,
}

fn init_logging(cli: &Cli, config: &PiecesConfig) {
    let fallback = cli
        .log_level()
        .map(str::to_string)
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "warn".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_module(config: &PiecesConfig, type_name: &str, db: &Arc<Database>) -> PieceModule {
    ModuleBuilder::from_config(type_name, &config.type_config(type_name), config.per_page).build(db.clone())
}

/// Print a route's reply and turn failure statuses into an error
fn handle_reply(command: &Commands, reply: Reply, quiet: bool) -> Result<()> {
    let status = reply.status();
    match (command, reply) {
        (Commands::Show { .. }, Reply::Json(ApiResponse { status: Status::Ok, data: Some(data) })) => {
            let piece: Piece = serde_json::from_value(data)?;
            println!("{}", if quiet { piece.id.clone() } else { output::piece_detail(&piece) });
        }
        (Commands::List { .. }, Reply::Json(ApiResponse { status: Status::Ok, data: Some(data) })) => {
            print_list(data, quiet)?;
        }
        (_, reply) => {
            if quiet && status == Status::Ok {
                if let Some(ApiResponse { data: Some(data), .. }) = reply.into_json() {
                    println!("{}", data.get("_id").and_then(Value::as_str).unwrap_or_default());
                }
            } else {
                println!("{}", reply.body());
            }
        }
    }

    if status == Status::Ok {
        Ok(())
    } else {
        if !quiet {
            eprintln!("Request failed: {}", output::colorize_status(status));
        }
        Err(PiecesError::RequestFailed(status))
    }
}

fn print_list(data: Value, quiet: bool) -> Result<()> {
    let ListData { pieces, page_info } = serde_json::from_value(data)?;
    if pieces.is_empty() && !quiet {
        println!("No pieces found.");
    }
    for piece in &pieces {
        println!("{}", output::piece_line(piece, quiet));
    }
    if !quiet {
        println!("{}", output::page_footer(&page_info));
    }
    Ok(())
}

fn handle_types_command(config: &PiecesConfig, db: &Database, quiet: bool) -> Result<()> {
    let stored = db.list_types()?;
    let names: BTreeSet<&str> = config
        .types
        .keys()
        .map(String::as_str)
        .chain(stored.iter().map(String::as_str))
        .collect();

    if names.is_empty() && !quiet {
        println!("No types configured or stored.");
    }
    for name in names {
        let count = db.list_type(name)?.len();
        println!("{}", output::type_with_count(name, count, quiet));
    }
    Ok(())
}

/// Main entry point for the pieces application
///
/// Loads configuration, parses command-line arguments, and dispatches the
/// command to its route.
///
/// # Errors
///
/// Returns `PiecesError` if configuration loading fails, the database
/// cannot be opened, arguments are malformed, or the route fails.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let config = match &cli.config {
        Some(path) => PiecesConfig::load_from(path)?,
        None => PiecesConfig::load()?,
    };
    init_logging(&cli, &config);

    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => config.database_path()?,
    };
    debug!(path = %db_path.display(), "opening database");
    let db = Arc::new(Database::open(&db_path)?);

    let result = match (cli.command.type_name(), cli.command.route()) {
        (Some(type_name), Some(route)) => {
            let module = build_module(&config, type_name, &db);
            let body = cli.command.body().map_err(PiecesError::InvalidInput)?;
            let reply = module.dispatch(route, &RequestContext::local_admin(), body).await;
            handle_reply(&cli.command, reply, cli.quiet)
        }
        _ => handle_types_command(&config, &db, cli.quiet),
    };

    db.flush()?;
    result
}
