pub mod errors;
pub mod config;
pub mod logging;
pub mod globals;
pub mod context;
pub mod engine;     // expression-then-statement evaluation
pub mod completion;
pub mod functions;  // builtin function table
pub mod registry;
pub mod protocol;
pub mod router;
pub mod framing;
pub mod server;
mod expression;
mod parser;
mod comparison;

use std::sync::Arc;

pub use config::ServerConfig;
pub use context::Context;
pub use engine::Outcome;
pub use errors::{EvalError, RegistryError, ServerError};
pub use globals::Globals;
pub use registry::{ContextRegistry, DEFAULT_CONTEXT};
pub use router::Router;
pub use server::Server;

/// Convenience: evaluate `code` in a throwaway context seeded with the
/// default globals.
pub fn eval(code: &str) -> Outcome {
    Context::new(0, &Globals::default()).evaluate(code)
}

/// Binds per `config` and serves until `shutdown` resolves.
pub async fn serve<F>(config: &ServerConfig, globals: Arc<Globals>, shutdown: F) -> Result<(), ServerError>
where
    F: std::future::Future<Output = ()>,
{
    Server::bind(config, globals).await?.serve(shutdown).await
}
