use clap::{Args, Subcommand};
use fulfil_app::domain::orders::records::OrderUuid;
use uuid::Uuid;

use crate::cli::{ConnectionArgs, operator, print_json};

#[derive(Debug, Args)]
pub(crate) struct InvoiceCommand {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: InvoiceSubcommand,
}

#[derive(Debug, Subcommand)]
enum InvoiceSubcommand {
    /// Show the invoice of a paid order, issuing it if needed
    Show(ShowInvoiceArgs),
}

#[derive(Debug, Args)]
struct ShowInvoiceArgs {
    #[arg(long)]
    order_uuid: Uuid,
}

pub(crate) async fn run(command: InvoiceCommand) -> Result<(), String> {
    let context = command.connection.context().await?;

    match command.command {
        InvoiceSubcommand::Show(args) => {
            let invoice = context
                .lifecycle
                .invoice(operator(), OrderUuid::from_uuid(args.order_uuid))
                .await
                .map_err(|error| format!("failed to load invoice: {error}"))?;

            print_json(&invoice)
        }
    }
}
