use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use replique::config::{DEFAULT_MAX_REQUEST_BYTES, DEFAULT_PORT};
use replique::logging::{self, LogFormat};
use replique::{Globals, ServerConfig};
use tracing::{error, info};

/// Serve evaluation and completion requests over TCP.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "REPLIQUE_HOST", default_value = "127.0.0.1")]
    host: IpAddr,
    /// Port to listen on
    #[arg(long, short, env = "REPLIQUE_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// JSON object whose entries are added to every new context
    #[arg(long, env = "REPLIQUE_GLOBALS")]
    globals: Option<PathBuf>,
    /// Largest partial request buffered per connection
    #[arg(long, default_value_t = DEFAULT_MAX_REQUEST_BYTES)]
    max_request_bytes: usize,
    /// Log at debug level (overridden by REPLIQUE_LOG)
    #[arg(long, short)]
    verbose: bool,
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() {
    // Parse CLI arguments.
    let args = Args::parse();
    logging::init(args.verbose, args.log_format);

    let config = ServerConfig {
        addr: SocketAddr::new(args.host, args.port),
        max_request_bytes: args.max_request_bytes,
        globals: args.globals,
    };

    // Capture the global snapshot once; every context starts from it.
    let globals = match config.globals.as_deref().map(Globals::load).transpose() {
        Ok(globals) => Arc::new(globals.unwrap_or_default()),
        Err(e) => {
            error!(error = %e, "startup failed");
            std::process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = replique::serve(&config, globals, shutdown).await {
        error!(error = %e, "server failed");
        std::process::exit(1);
    }
    info!("bye");
}
