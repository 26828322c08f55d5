//! Staging and committing config edits.

mod commit;
mod grouper;
mod ledger;
mod session;

pub use commit::*;
pub use grouper::*;
pub use ledger::*;
pub use session::*;
