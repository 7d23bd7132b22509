//! Durable storage for the journal client key.
//!
//! The key cache is a single slot, not a map: at most one record exists,
//! tagged with the subject id of the user it belongs to. Access is
//! serialized by [`crate::keyring::ClientKeyring`].

mod file;
mod memory;
mod traits;

pub use file::*;
pub use memory::*;
pub use traits::*;
