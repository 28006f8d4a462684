mod account;
mod budget;
mod ledger;
mod money;
mod shopping;
mod validation;

pub use account::*;
pub use budget::*;
pub use ledger::*;
pub use money::*;
pub use shopping::*;
pub use validation::ValidationError;
