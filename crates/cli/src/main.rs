//! Product Optimizer CLI - Database migrations and token management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! po-cli migrate
//!
//! # Show a shop's plan and token balance
//! po-cli tokens show --shop demo.myshopify.com
//!
//! # Add tokens to a shop (creates the shop record if needed)
//! po-cli tokens grant --shop demo.myshopify.com --amount 10
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `tokens show` - Print plan and balance
//! - `tokens grant` - Add tokens

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "po-cli")]
#[command(author, version, about = "Product optimizer CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect and adjust token balances
    Tokens {
        #[command(subcommand)]
        action: TokensAction,
    },
}

#[derive(Subcommand)]
enum TokensAction {
    /// Show a shop's plan and token balance
    Show {
        /// Shop domain (e.g. demo.myshopify.com)
        #[arg(short, long)]
        shop: String,
    },
    /// Add tokens to a shop
    Grant {
        /// Shop domain (e.g. demo.myshopify.com)
        #[arg(short, long)]
        shop: String,

        /// Number of tokens to add
        #[arg(short, long)]
        amount: i32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Tokens { action } => match action {
            TokensAction::Show { shop } => commands::tokens::show(&shop).await?,
            TokensAction::Grant { shop, amount } => {
                commands::tokens::grant(&shop, amount).await?;
            }
        },
    }
    Ok(())
}
