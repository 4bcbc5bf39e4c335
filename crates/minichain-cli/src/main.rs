use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "minichain-cli")]
#[command(about = "CLI client for a minichain node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction for the next block
    Submit {
        /// Sender
        #[arg(long)]
        sender: String,
        /// Recipient
        #[arg(long)]
        recipient: String,
        /// Amount
        #[arg(long)]
        amount: u64,
    },
    /// Ask the node to mine the next block
    Mine,
    /// Fetch the full chain
    Chain,
}

#[derive(Serialize)]
struct Tx {
    sender: String,
    recipient: String,
    amount: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let node = cli.node;

    let res = match cli.cmd {
        Command::Submit {
            sender,
            recipient,
            amount,
        } => {
            let tx = Tx {
                sender,
                recipient,
                amount,
            };
            client
                .post(format!("{node}/transactions/new"))
                .json(&tx)
                .send()
                .await?
        }
        Command::Mine => client.get(format!("{node}/mine")).send().await?,
        Command::Chain => client.get(format!("{node}/chain")).send().await?,
    };

    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    println!("{body}");
    Ok(())
}
