mod clock;
mod context;
mod credits;
pub mod error;
mod service;

pub use clock::*;
pub use context::*;
pub use credits::*;
pub use error::*;
pub use service::*;
