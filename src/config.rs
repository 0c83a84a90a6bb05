use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Port the server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 4994;

/// Largest partial request buffered per connection.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub max_request_bytes: usize,
    /// JSON object file merged into the global snapshot.
    pub globals: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            globals: None,
        }
    }
}

impl ServerConfig {
    /// Loopback on an ephemeral port.
    pub fn ephemeral() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            ..Self::default()
        }
    }
}
