use clap::{Args, Subcommand};
use fulfil_app::{
    domain::{
        orders::records::OrderUuid,
        users::{Actor, UserUuid},
    },
    payments::PaymentDetails,
};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::cli::{ConnectionArgs, operator, print_json};

#[derive(Debug, Args)]
pub(crate) struct OrderCommand {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: OrderSubcommand,
}

#[derive(Debug, Subcommand)]
enum OrderSubcommand {
    /// Turn a user's cart into an order
    Checkout(UserArgs),

    /// Pay for an order on behalf of its owner
    Pay(PayArgs),

    /// Show one order
    Show(OrderArgs),

    /// List orders, all of them or one user's
    List(ListOrdersArgs),

    /// Show the payment attempts of an order
    Payments(OrderArgs),

    /// Show the delivery of a shipped order
    Delivery(OrderArgs),

    /// Validate a created order
    Validate(OrderArgs),

    /// Hand an order to a carrier
    Ship(ShipArgs),

    /// Mark a shipped order delivered
    Deliver(OrderArgs),

    /// Refund a paid order
    Refund(OrderArgs),

    /// Cancel an order, refunding it if paid
    Cancel(OrderArgs),
}

#[derive(Debug, Args)]
struct UserArgs {
    #[arg(long)]
    user_uuid: Uuid,
}

#[derive(Debug, Args)]
struct OrderArgs {
    #[arg(long)]
    order_uuid: Uuid,
}

#[derive(Debug, Args)]
struct ListOrdersArgs {
    /// Only list this user's orders
    #[arg(long)]
    user_uuid: Option<Uuid>,
}

#[derive(Debug, Args)]
struct ShipArgs {
    #[arg(long)]
    order_uuid: Uuid,

    /// Carrier name; the default carrier when omitted
    #[arg(long)]
    carrier: Option<String>,
}

#[derive(Debug, Args)]
struct PayArgs {
    #[arg(long)]
    order_uuid: Uuid,

    #[arg(long, env = "CARD_NUMBER", hide_env_values = true)]
    card_number: String,

    #[arg(long, env = "CARD_CVV", hide_env_values = true)]
    cvv: String,

    #[arg(long)]
    expiry_month: i64,

    #[arg(long)]
    expiry_year: i64,

    #[arg(long)]
    postal_code: Option<String>,

    #[arg(long)]
    phone: Option<String>,

    #[arg(long)]
    street_number: Option<String>,

    #[arg(long)]
    street_name: Option<String>,
}

impl PayArgs {
    fn details(self) -> PaymentDetails {
        PaymentDetails {
            card_number: Zeroizing::new(self.card_number),
            cvv: Zeroizing::new(self.cvv),
            expiry_month: self.expiry_month,
            expiry_year: self.expiry_year,
            postal_code: self.postal_code,
            phone: self.phone,
            street_number: self.street_number,
            street_name: self.street_name,
        }
    }
}

pub(crate) async fn run(command: OrderCommand) -> Result<(), String> {
    let context = command.connection.context().await?;
    let lifecycle = &context.lifecycle;
    let admin = operator();

    match command.command {
        OrderSubcommand::Checkout(args) => {
            let order = lifecycle
                .checkout(UserUuid::from_uuid(args.user_uuid))
                .await
                .map_err(|error| format!("checkout failed: {error}"))?;

            print_json(&order)
        }
        OrderSubcommand::Pay(args) => {
            let order = OrderUuid::from_uuid(args.order_uuid);

            let owner = lifecycle
                .order(admin, order)
                .await
                .map_err(|error| format!("failed to load order: {error}"))?
                .user_uuid;

            let paid = lifecycle
                .pay(Actor::customer(owner), order, &args.details())
                .await
                .map_err(|error| format!("payment failed: {error}"))?;

            print_json(&paid)
        }
        OrderSubcommand::Show(args) => {
            let order = lifecycle
                .order(admin, OrderUuid::from_uuid(args.order_uuid))
                .await
                .map_err(|error| format!("failed to load order: {error}"))?;

            print_json(&order)
        }
        OrderSubcommand::List(args) => {
            let orders = match args.user_uuid {
                Some(user) => lifecycle.orders_for(admin, UserUuid::from_uuid(user)).await,
                None => lifecycle.list_orders(admin).await,
            }
            .map_err(|error| format!("failed to list orders: {error}"))?;

            print_json(&orders)
        }
        OrderSubcommand::Payments(args) => {
            let payments = lifecycle
                .payments(admin, OrderUuid::from_uuid(args.order_uuid))
                .await
                .map_err(|error| format!("failed to list payments: {error}"))?;

            print_json(&payments)
        }
        OrderSubcommand::Delivery(args) => {
            let delivery = lifecycle
                .delivery(admin, OrderUuid::from_uuid(args.order_uuid))
                .await
                .map_err(|error| format!("failed to load delivery: {error}"))?;

            print_json(&delivery)
        }
        OrderSubcommand::Validate(args) => {
            let order = lifecycle
                .admin_validate(admin, OrderUuid::from_uuid(args.order_uuid))
                .await
                .map_err(|error| format!("validation failed: {error}"))?;

            print_json(&order)
        }
        OrderSubcommand::Ship(args) => {
            let shipment = lifecycle
                .admin_ship(
                    admin,
                    OrderUuid::from_uuid(args.order_uuid),
                    args.carrier.as_deref(),
                )
                .await
                .map_err(|error| format!("shipping failed: {error}"))?;

            print_json(&shipment)
        }
        OrderSubcommand::Deliver(args) => {
            let shipment = lifecycle
                .admin_mark_delivered(admin, OrderUuid::from_uuid(args.order_uuid))
                .await
                .map_err(|error| format!("delivery failed: {error}"))?;

            print_json(&shipment)
        }
        OrderSubcommand::Refund(args) => {
            let cancellation = lifecycle
                .admin_refund(admin, OrderUuid::from_uuid(args.order_uuid))
                .await
                .map_err(|error| format!("refund failed: {error}"))?;

            print_json(&cancellation)
        }
        OrderSubcommand::Cancel(args) => {
            let cancellation = lifecycle
                .cancel(admin, OrderUuid::from_uuid(args.order_uuid))
                .await
                .map_err(|error| format!("cancellation failed: {error}"))?;

            print_json(&cancellation)
        }
    }
}
