use clap::{Args, Subcommand};
use fulfil::money::{Money, Quantity};
use fulfil_app::domain::{
    carts::records::CartRecord, products::records::ProductUuid, users::UserUuid,
};
use serde::Serialize;
use uuid::Uuid;

use crate::cli::{ConnectionArgs, print_json};

#[derive(Debug, Args)]
pub(crate) struct CartCommand {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Owner of the cart
    #[arg(long)]
    user_uuid: Uuid,

    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartSubcommand {
    /// Add units of a product
    Add(CartItemArgs),

    /// Remove a line, or some units of it
    Remove(RemoveItemArgs),

    /// Show the cart and its value at current prices
    Show,

    /// Empty the cart
    Clear,
}

#[derive(Debug, Args)]
struct CartItemArgs {
    #[arg(long)]
    product_uuid: Uuid,

    #[arg(long, default_value_t = 1)]
    quantity: i64,
}

#[derive(Debug, Args)]
struct RemoveItemArgs {
    #[arg(long)]
    product_uuid: Uuid,

    /// Units to remove; the whole line when omitted
    #[arg(long)]
    quantity: Option<i64>,
}

#[derive(Debug, Serialize)]
struct CartView {
    cart: CartRecord,
    total: Money,
}

pub(crate) async fn run(command: CartCommand) -> Result<(), String> {
    let context = command.connection.context().await?;
    let carts = &context.carts;
    let user = UserUuid::from_uuid(command.user_uuid);

    match command.command {
        CartSubcommand::Add(args) => {
            let quantity = Quantity::new(args.quantity).map_err(|error| error.to_string())?;

            let cart = carts
                .add_to_cart(user, ProductUuid::from_uuid(args.product_uuid), quantity)
                .await
                .map_err(|error| format!("failed to add to cart: {error}"))?;

            print_json(&cart)
        }
        CartSubcommand::Remove(args) => {
            let quantity = args
                .quantity
                .map(Quantity::new)
                .transpose()
                .map_err(|error| error.to_string())?;

            let cart = carts
                .remove_from_cart(user, ProductUuid::from_uuid(args.product_uuid), quantity)
                .await
                .map_err(|error| format!("failed to remove from cart: {error}"))?;

            print_json(&cart)
        }
        CartSubcommand::Show => {
            let cart = carts
                .get_cart(user)
                .await
                .map_err(|error| format!("failed to load cart: {error}"))?;

            let total = carts
                .cart_total(user)
                .await
                .map_err(|error| format!("failed to price cart: {error}"))?;

            print_json(&CartView { cart, total })
        }
        CartSubcommand::Clear => {
            carts
                .clear_cart(user)
                .await
                .map_err(|error| format!("failed to clear cart: {error}"))?;

            println!("cart cleared");

            Ok(())
        }
    }
}
