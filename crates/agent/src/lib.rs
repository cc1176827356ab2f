// Domain-driven module structure for the fluxtail agent.

// Core infrastructure
pub mod error;
pub mod state;
pub mod conf;

// Pipeline stages
pub mod source;
pub mod parser;
pub mod sink;
pub mod pipeline;

// Observability and lifecycle
pub mod monitor;
pub mod runtime;
