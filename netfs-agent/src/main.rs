use std::net::{Ipv4Addr, SocketAddr, TcpListener};

use netfs_agent::error::AgentError;
use netfs_agent::worker;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("NETFS_AGENT_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("netfs=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), AgentError> {
    init_tracing();

    let config = netfs_config::NetfsConfig::from_env().unwrap_or_else(|err| {
        tracing::warn!(%err, "falling back to default config");
        netfs_config::NetfsConfig::default()
    });

    // The agent binds every interface; `server_host` in the shared config
    // only matters to the layer, which uses it to find this process.
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.server_port));
    let listener = TcpListener::bind(addr).map_err(AgentError::Bind)?;
    tracing::info!(%addr, "listening");

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(%err, "failed to accept connection");
                continue;
            }
        };
        let peer = stream
            .peer_addr()
            .unwrap_or_else(|_| SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)));
        tracing::info!(%peer, "accepted connection");
        std::thread::spawn(move || worker::serve(stream, peer));
    }

    Ok(())
}
