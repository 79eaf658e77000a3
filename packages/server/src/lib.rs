// Citation Verification Service - API Core
//
// Thin HTTP transport over the `verification` engine: environment
// configuration, document ingestion and the axum router.

pub mod config;
pub mod documents;
pub mod server;

pub use config::*;
