//! Orebi CLI - Browse the catalog, manage the cart and check out from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in with a token issued by the backend
//! orebi login --token "$TOKEN" --user-id 42 --username ada
//!
//! # Browse
//! orebi products new-arrivals
//! orebi products filter --category 3 --price 50-150
//!
//! # Cart
//! orebi cart add 17 --quantity 2
//! orebi cart coupon SAVE10
//!
//! # Check out, then type `completed <order-id>`, `dismissed` or `error <message>`
//! orebi checkout --first-name Ada --last-name Lovelace --email ada@example.com \
//!     --phone +94771234567 --address "1 Main St" --city Colombo
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use orebi_storefront::{ClientConfig, Storefront};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

/// Result type returned by every command.
pub type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "orebi")]
#[command(author, version, about = "Orebi storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with a backend-issued bearer token
    Login {
        /// Bearer token
        #[arg(short, long)]
        token: String,

        /// Backend user id
        #[arg(short, long)]
        user_id: String,

        /// Display name
        #[arg(short = 'n', long)]
        username: String,

        /// Role granted to the user (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,

        /// Permission granted to the session (repeatable)
        #[arg(long = "permission")]
        permissions: Vec<String>,
    },
    /// Sign out and forget the local cart
    Logout,
    /// Browse products
    Products {
        #[command(subcommand)]
        action: commands::catalog::ProductsAction,
    },
    /// List product categories
    Categories,
    /// List product tags
    Tags,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: commands::cart::CartAction,
    },
    /// Order history
    Orders {
        #[command(subcommand)]
        action: commands::orders::OrdersAction,
    },
    /// Place an order for the cart and pay for it
    Checkout(commands::checkout::CheckoutArgs),
    /// Show the payment status of an order
    PaymentStatus {
        /// Order id
        order_id: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Invalid configuration: {e}");
            }
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "orebi_storefront=info,orebi_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        sentry::capture_error(e.as_ref());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> CliResult {
    let shop = Storefront::connect(config)?;

    match cli.command {
        Commands::Login {
            token,
            user_id,
            username,
            roles,
            permissions,
        } => {
            commands::auth::login(&shop, token, user_id, username, roles, permissions).await?;
        }
        Commands::Logout => commands::auth::logout(&shop)?,
        Commands::Products { action } => commands::catalog::products(&shop, action).await?,
        Commands::Categories => commands::catalog::categories(&shop).await?,
        Commands::Tags => commands::catalog::tags(&shop).await?,
        Commands::Cart { action } => commands::cart::run(&shop, action).await?,
        Commands::Orders { action } => commands::orders::run(&shop, action).await?,
        Commands::Checkout(args) => commands::checkout::run(&shop, args).await?,
        Commands::PaymentStatus { order_id } => {
            commands::orders::payment_status(&shop, &order_id).await?;
        }
    }
    Ok(())
}
