pub mod model;
pub mod orchestrator;
pub mod strategies;
pub mod types;

pub use model::*;
pub use orchestrator::*;
pub use strategies::*;
pub use types::*;
