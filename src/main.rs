use intercepted_cluster::cluster::handlers::{router, string_map};
use intercepted_cluster::cluster::node::Cluster;
use intercepted_cluster::cluster::remote::RemoteRegistryClient;
use intercepted_cluster::config::ClusterConfig;
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!(
            "Usage: {} --bind <addr:port> [--seed <addr:port>] [--map <name>]...",
            args[0]
        );
        eprintln!("Example: {} --bind 127.0.0.1:6000 --map cities", args[0]);
        eprintln!(
            "Example: {} --bind 127.0.0.1:6001 --seed 127.0.0.1:6000 --map cities",
            args[0]
        );

        std::process::exit(1);
    }

    let mut bind_addr: Option<SocketAddr> = None;
    let mut seed: Option<SocketAddr> = None;
    let mut maps: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--bind", Some(value)) => {
                bind_addr = Some(value.parse()?);
                i += 2;
            }
            ("--seed", Some(value)) => {
                seed = Some(value.parse()?);
                i += 2;
            }
            ("--map", Some(value)) => {
                maps.push(value.clone());
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let bind_addr = bind_addr.ok_or_else(|| anyhow::anyhow!("--bind is required"))?;
    if maps.is_empty() {
        maps.push("default".to_string());
    }

    // 1. Config and the local member:
    let config = ClusterConfig::from_env()?;
    tracing::info!("Config: {:?}", config);

    let cluster = Cluster::new(config)?;
    let node = cluster.join_node().await?;
    node.membership().set_http_addr(node.id(), bind_addr);
    tracing::info!("Node ID: {}", node.id());

    // 2. Maps, with the registry of each pulled from the seed first:
    for name in &maps {
        string_map(&node, name).await?;
    }

    match seed {
        Some(seed) => {
            tracing::info!("Pulling interceptor registries from seed {}", seed);
            let client = RemoteRegistryClient::new();
            for name in &maps {
                let transfer = client.fetch_registry(seed, name).await?;
                let installed = node.import_registry(&transfer).await?;
                tracing::info!("Map '{}': {} interceptor(s) installed", name, installed);
            }
        }
        None => tracing::info!("Starting as seed node"),
    }

    // 3. HTTP Router:
    let app = router(node.clone());

    // 4. Start HTTP server:
    tracing::info!("HTTP server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
