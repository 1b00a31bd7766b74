use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use storefront_api::ProductInput;

#[derive(Parser)]
#[command(name = "storefront-admin")]
#[command(about = "Manage a storefront backend from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (overrides STOREFRONT_CONFIG)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and persist the session
    Login(LoginArgs),
    /// End the session on the server and locally
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Product catalogue
    #[command(subcommand)]
    Products(ProductCommands),
    /// Orders
    #[command(subcommand)]
    Orders(OrderCommands),
}

#[derive(Args)]
pub struct LoginArgs {
    #[arg(short, long)]
    pub email: String,
    #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand)]
pub enum ProductCommands {
    List,
    Get { id: u64 },
    Create(ProductArgs),
    Update {
        id: u64,
        #[command(flatten)]
        product: ProductArgs,
    },
    Delete { id: u64 },
}

#[derive(Args)]
pub struct ProductArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub category: String,
    #[arg(long)]
    pub price: f64,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long, default_value = "")]
    pub image: String,
    /// Units in stock
    #[arg(long, default_value_t = 0)]
    pub stock: u32,
}

impl From<&ProductArgs> for ProductInput {
    fn from(args: &ProductArgs) -> Self {
        ProductInput {
            name: args.name.clone(),
            category: args.category.clone(),
            description: args.description.clone(),
            price: args.price,
            image: args.image.clone(),
            quantity_stock: args.stock,
        }
    }
}

#[derive(Subcommand)]
pub enum OrderCommands {
    List,
    Get { id: u64 },
    /// Change an order's status (pending, processing, shipped, delivered, completed, cancelled)
    Status { id: u64, status: String },
}
