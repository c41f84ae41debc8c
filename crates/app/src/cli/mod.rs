use clap::{Args, Parser, Subcommand};
use fulfil_app::{
    context::AppContext,
    domain::users::{Actor, UserUuid},
};
use serde::Serialize;
use uuid::Uuid;

use crate::observability::LoggingConfig;

mod cart;
mod invoice;
mod migrate;
mod order;
mod product;

#[derive(Debug, Parser)]
#[command(name = "fulfil", about = "Order fulfilment CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate(migrate::MigrateArgs),
    Product(product::ProductCommand),
    Cart(cart::CartCommand),
    Order(order::OrderCommand),
    Invoice(invoice::InvoiceCommand),
}

impl Cli {
    /// Loads `.env` then parses the command line.
    pub(crate) fn load() -> Result<Self, clap::Error> {
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Migrate(args) => migrate::run(args).await,
            Commands::Product(command) => product::run(command).await,
            Commands::Cart(command) => cart::run(command).await,
            Commands::Order(command) => order::run(command).await,
            Commands::Invoice(command) => invoice::run(command).await,
        }
    }
}

/// Connection settings shared by every subcommand.
#[derive(Debug, Args)]
pub(crate) struct ConnectionArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,
}

impl ConnectionArgs {
    pub(crate) async fn context(&self) -> Result<AppContext, String> {
        AppContext::from_database_url(&self.database_url)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))
    }
}

/// The CLI runs with admin rights on behalf of the operator.
pub(crate) const fn operator() -> Actor {
    Actor::admin(UserUuid::from_uuid(Uuid::nil()))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|error| format!("failed to render output: {error}"))?;

    println!("{json}");

    Ok(())
}
