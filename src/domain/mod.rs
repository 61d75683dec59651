mod category;
mod ledger;
mod money;
mod password;
mod transaction;
mod validation;

pub use category::*;
pub use ledger::*;
pub use money::*;
pub use password::*;
pub use transaction::*;
pub use validation::*;
