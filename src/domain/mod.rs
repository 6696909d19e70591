pub mod decode;
pub mod network;
pub mod routing;
pub mod topology;
pub mod types;

pub use decode::*;
pub use network::*;
pub use routing::*;
pub use topology::*;
pub use types::*;
