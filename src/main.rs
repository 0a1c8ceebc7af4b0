use std::collections::HashMap;
use std::sync::Arc;

use log::error;

use bgpd_rs::config;
use bgpd_rs::dispatcher::Dispatcher;
use bgpd_rs::router::Router;
use bgpd_rs::transport::{Channel, UnixChannel};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let (config, level) = match config::from_args() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("bgpd: {}", err);
            std::process::exit(1);
        }
    };
    env_logger::Builder::new().filter_level(level).init();

    let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();
    for neighbor in &config.neighbors {
        let local_path = socket_path(&neighbor.router_addr_dotted());
        let remote_path = socket_path(&neighbor.name);
        match UnixChannel::connect(&local_path, &remote_path) {
            Ok(channel) => {
                channels.insert(neighbor.name.clone(), Arc::new(channel));
            }
            Err(err) => {
                error!(
                    "failed to open channel to neighbor {} ({} -> {}): {}",
                    neighbor.name, local_path, remote_path, err
                );
                std::process::exit(1);
            }
        }
    }

    let router = Router::new(config.asn, config.neighbors);
    let dispatcher = Dispatcher::new(router, channels);

    if let Err(err) = dispatcher.run().await {
        error!("bgpd exiting: {}", err);
        std::process::exit(1);
    }
}

/// The filesystem-named Unix datagram socket path for a router-side or
/// neighbor-side channel address.
fn socket_path(addr: &str) -> String {
    format!("/tmp/bgpd/{}", addr)
}
