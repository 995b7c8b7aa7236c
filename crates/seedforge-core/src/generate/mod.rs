pub mod coerce;
pub mod context;
pub mod engine;
pub mod foreign_key;
pub mod providers;
pub mod rows;
pub mod unique;
pub mod value;
pub mod words;

pub use context::{GenerationContext, GenerationOptions, RepetitionRule, SoftDelete, TableOptions};
pub use engine::{generate, GeneratedData};
pub use foreign_key::PendingUpdate;
pub use value::{Row, Value};
pub use words::WordSource;
