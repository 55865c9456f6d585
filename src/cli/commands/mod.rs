//! CLI command implementations.

mod ask;
mod chat;
mod ingest;
mod stats;

pub use ask::run_ask;
pub use chat::run_chat;
pub use ingest::run_ingest;
pub use stats::run_stats;
