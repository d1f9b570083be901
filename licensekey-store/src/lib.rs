//! Storage for issued license records.
//!
//! The licensing engine never touches the database: callers hand it
//! attributes, get back an opaque token, and persist that token here along
//! with its expiry. A monthly sweep deletes expired records.

mod error;
mod store;
mod sweep;

pub use error::{StoreError, StoreResult};
pub use store::{LicenseRecord, LicenseStore};
pub use sweep::{next_sweep_after, sweep_expired};
