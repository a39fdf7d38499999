// Library exports for nexmind
// This allows the modules to be imported in tests and external code

pub mod agent;
pub mod config;
pub mod llm;
pub mod search;
pub mod server;
