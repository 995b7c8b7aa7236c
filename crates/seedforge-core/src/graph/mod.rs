pub mod dag;
pub mod scc;
pub mod visualize;

pub use dag::DependencyGraph;
pub use scc::{Component, DeferredEdge, GenerationOrder};
pub use visualize::{visualize, GraphFormat};
