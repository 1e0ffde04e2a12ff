//! Observability module providing structured logging.
//!
//! Logs are emitted through `tracing` and rendered by a `tracing-subscriber`
//! formatter selected from configuration (pretty, compact, JSON).

mod tracing_init;

pub use tracing_init::*;
