pub mod config;
pub mod constraint;
pub mod error;
pub mod generate;
pub mod graph;
pub mod output;
pub mod schema;

// Re-export key types for convenience
pub use error::{Result, SeedForgeError};
pub use generate::{generate, GeneratedData, GenerationOptions};
pub use schema::types::{DatabaseSchema, Dialect};
