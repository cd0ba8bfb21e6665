//! Sessions against data sources.
//!
//! A [`Session`] owns one driver connection, the statement running on it and
//! the metadata cached for it. Identifier quoting and per-DBMS catalog rules
//! are fixed when the session connects.

pub mod identifier;
mod lookup;
pub mod quirks;
pub mod session;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use identifier::IdentifierCodec;
pub use quirks::DriverQuirks;
pub use session::{RedrawHook, Session};
pub use status::{ExecutionStatus, Status};
