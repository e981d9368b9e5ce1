use clap::{Parser, Subcommand};

pub mod app;

#[derive(Parser)]
#[command(version, about = "Pynk ordering core: menu, orders, users and admin login")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run migrations and serve the gRPC API
    RPC,
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::RPC => app::rpc::main().await,
    }
}
