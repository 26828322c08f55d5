mod client;
mod protocol;
#[cfg(test)]
pub(crate) mod testing;

pub use client::*;
pub use protocol::*;
