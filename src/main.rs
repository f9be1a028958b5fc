use clap::Parser;
use redzone::{
    QueryDispatcher,
    config::ServerConfig,
    server::{run_tcp_server, run_udp_server},
    store::{RecordStore, RedisStore},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Authoritative DNS server backed by Redis
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "/etc/redzone/config.toml")]
    config: PathBuf,

    /// Override the configured bind address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Log filter used when RUST_LOG is unset
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = ServerConfig::load(&args.config)?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    info!(
        "Starting redzone for {} forward zones as {}",
        config.forward_zones.len(),
        config.primary_hostname
    );

    let store = RedisStore::connect(&config.redis.url, config.redis.max_retries).await?;
    store.ping().await?;
    let store: Arc<dyn RecordStore> = Arc::new(store);

    let bind_addr = config.bind_addr;
    let dispatcher = Arc::new(QueryDispatcher::new(Arc::new(config), store));

    let udp_socket = Arc::new(UdpSocket::bind(bind_addr).await?);
    let tcp_listener = TcpListener::bind(bind_addr).await?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let udp_task = tokio::spawn(run_udp_server(
        udp_socket,
        dispatcher.clone(),
        shutdown_tx.subscribe(),
    ));
    let tcp_task = tokio::spawn(run_tcp_server(
        tcp_listener,
        dispatcher,
        shutdown_tx.subscribe(),
    ));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    let _ = shutdown_tx.send(());

    for (name, task) in [("UDP", udp_task), ("TCP", tcp_task)] {
        match task.await {
            Ok(Ok(())) => info!("{} server stopped", name),
            Ok(Err(e)) => error!("{} server error: {}", name, e),
            Err(e) => error!("{} server task failed: {}", name, e),
        }
    }

    Ok(())
}
