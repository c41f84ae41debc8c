use clap::{Args, Subcommand};
use fulfil::money::{Money, Quantity};
use fulfil_app::domain::products::{
    data::{NewProduct, ProductUpdate},
    records::ProductUuid,
};
use uuid::Uuid;

use crate::cli::{ConnectionArgs, print_json};

#[derive(Debug, Args)]
pub(crate) struct ProductCommand {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: ProductSubcommand,
}

#[derive(Debug, Subcommand)]
enum ProductSubcommand {
    /// Add a product to the catalog
    Create(CreateProductArgs),

    /// List catalog products
    List(ListProductsArgs),

    /// Put units back into stock
    Restock(RestockProductArgs),

    /// Change name, price or active flag
    Update(UpdateProductArgs),
}

#[derive(Debug, Args)]
struct CreateProductArgs {
    /// Display name
    #[arg(long)]
    name: String,

    /// Unit price in cents
    #[arg(long)]
    price: u64,

    /// Initial stock
    #[arg(long, default_value_t = 0)]
    stock: u32,

    /// Create the product inactive
    #[arg(long)]
    inactive: bool,

    /// Optional product UUID; generated when omitted
    #[arg(long)]
    product_uuid: Option<Uuid>,
}

#[derive(Debug, Args)]
struct ListProductsArgs {
    /// Only list active products
    #[arg(long)]
    active: bool,
}

#[derive(Debug, Args)]
struct RestockProductArgs {
    #[arg(long)]
    product_uuid: Uuid,

    /// Units to add
    #[arg(long)]
    quantity: i64,
}

#[derive(Debug, Args)]
struct UpdateProductArgs {
    #[arg(long)]
    product_uuid: Uuid,

    #[arg(long)]
    name: Option<String>,

    /// Unit price in cents
    #[arg(long)]
    price: Option<u64>,

    #[arg(long)]
    active: Option<bool>,
}

pub(crate) async fn run(command: ProductCommand) -> Result<(), String> {
    let context = command.connection.context().await?;
    let products = &context.stores.products;

    match command.command {
        ProductSubcommand::Create(args) => {
            let product = products
                .create_product(NewProduct {
                    uuid: args
                        .product_uuid
                        .map_or_else(ProductUuid::new, ProductUuid::from_uuid),
                    name: args.name,
                    price: Money::from_minor(args.price),
                    stock_qty: args.stock,
                    active: !args.inactive,
                })
                .await
                .map_err(|error| format!("failed to create product: {error}"))?;

            print_json(&product)
        }
        ProductSubcommand::List(args) => {
            let listed = products
                .list_products(args.active)
                .await
                .map_err(|error| format!("failed to list products: {error}"))?;

            print_json(&listed)
        }
        ProductSubcommand::Restock(args) => {
            let quantity = Quantity::new(args.quantity).map_err(|error| error.to_string())?;

            let product = products
                .release(ProductUuid::from_uuid(args.product_uuid), quantity)
                .await
                .map_err(|error| format!("failed to restock product: {error}"))?
                .ok_or_else(|| format!("product {} not found", args.product_uuid))?;

            print_json(&product)
        }
        ProductSubcommand::Update(args) => {
            let product = products
                .update_product(
                    ProductUuid::from_uuid(args.product_uuid),
                    ProductUpdate {
                        name: args.name,
                        price: args.price.map(Money::from_minor),
                        active: args.active,
                    },
                )
                .await
                .map_err(|error| format!("failed to update product: {error}"))?;

            print_json(&product)
        }
    }
}
