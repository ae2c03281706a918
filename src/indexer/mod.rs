pub mod chunker;
pub mod core;
pub mod loader;
