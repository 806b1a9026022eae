pub mod backoff;
pub mod cases;
pub mod config;
pub mod errors;
pub mod inference;
pub mod logging;
pub mod orchestrator;
pub mod prompts;
pub mod queue;
pub mod scorer;
pub mod session;
pub mod store;
pub mod stream;
pub mod ui;
