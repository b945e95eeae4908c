use clap::Parser;
use log::info;
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Tick rate (updates per second)
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,

    /// Maximum number of connected clients
    #[arg(short, long, default_value = "16")]
    max_clients: usize,

    /// Listen mode: this peer also fields a host-owned actor
    #[arg(long)]
    listen: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);
    let tick_duration = Duration::from_secs_f64(1.0 / args.tick_rate as f64);

    info!(
        "starting authority at {} ({}Hz, max {} clients{})",
        addr,
        args.tick_rate,
        args.max_clients,
        if args.listen { ", listen mode" } else { "" }
    );

    let mut server = Server::new(&addr, tick_duration, args.max_clients, args.listen).await?;
    server.run().await
}
