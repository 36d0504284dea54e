//! Bodega CLI - terminal front end for the inventory backend.
//!
//! # Usage
//!
//! ```bash
//! # Log in and keep the token in .bodega-token
//! bodega login -u bodeguero
//!
//! # Browse the catalog
//! bodega products --search mesa --sort stock --desc
//!
//! # Audit history for one product
//! bodega history --product 7
//!
//! # Record a stock movement
//! bodega stock --product 7 --type out --quantity 2 --reason "Venta"
//! ```
//!
//! # Commands
//!
//! - `login` / `logout` - Manage the stored token
//! - `products` - Filtered, sorted, paginated catalog
//! - `history` - Product change history with field diffs
//! - `stock` - Submit a stock movement

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod token_file;

use commands::Context;
use commands::products::ProductsArgs;
use commands::stock::StockArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "bodega")]
#[command(author, version, about = "Bodega inventory CLI")]
struct Cli {
    /// Backend base URL
    #[arg(long, global = true, env = "BODEGA_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// File holding the access token between invocations
    #[arg(long, global = true, env = "BODEGA_TOKEN_FILE", default_value = ".bodega-token")]
    token_file: PathBuf,

    /// Hours east of UTC used when printing dates
    #[arg(
        long,
        global = true,
        env = "BODEGA_TIMEZONE_OFFSET_HOURS",
        default_value_t = -3,
        allow_negative_numbers = true
    )]
    tz_offset: i32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange username and password for a token
    Login {
        /// Username
        #[arg(short, long)]
        username: String,

        /// Password; read from stdin when omitted
        #[arg(short, long, env = "BODEGA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored token
    Logout,
    /// List the catalog
    Products(ProductsArgs),
    /// Show the product change history
    History {
        /// Only this product
        #[arg(long)]
        product: Option<i32>,
    },
    /// Record a stock movement
    Stock(StockArgs),
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bodega=info,bodega_core=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = Context::new(&cli.api_url, cli.token_file, cli.tz_offset)?;
    let mut out = std::io::stdout();

    match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&ctx, &username, password, &mut out).await?;
        }
        Commands::Logout => commands::auth::logout(&ctx, &mut out)?,
        Commands::Products(args) => {
            commands::products::list(&ctx, &args.to_query(), &mut out).await?;
        }
        Commands::History { product } => {
            commands::history::show(&ctx, product.map(Into::into), &mut out).await?;
        }
        Commands::Stock(args) => commands::stock::record(&ctx, &args.into_draft(), &mut out).await?,
    }
    Ok(())
}
