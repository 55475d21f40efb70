// Library interface for telefeed modules
// This allows tests and other binaries to import modules

pub mod ingestion;
pub mod llm;
pub mod notify;
pub mod pipeline;
pub mod scraping;
pub mod server;
pub mod store;
pub mod worker;
