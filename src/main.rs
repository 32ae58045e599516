mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, ClientCommand, Commands};
use granary::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            data_dir,
            port,
            memtable_max,
            config,
        } => commands::serve::run_serve(data_dir, port, memtable_max, config).await,

        Commands::Client { addr, command } => match command {
            ClientCommand::Set { key, value } => commands::client::set(&addr, key, value).await,
            ClientCommand::Get { key } => commands::client::get(&addr, key).await,
            ClientCommand::Del { key } => commands::client::del(&addr, key).await,
        },
    }
}
