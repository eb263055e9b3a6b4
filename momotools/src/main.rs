use clap::Parser;
use log::*;

mod command_def;
mod command_handler;
mod formatting;

use command_def::Command;
use command_handler::handle_command;

#[derive(Parser, Debug)]
#[command(version = "0.1.0", about = "Reconcile mobile-money notifications against pending orders")]
pub struct Arguments {
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    if let Err(e) = handle_command(cli.command).await {
        error!("🛠️ {e:#}");
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
