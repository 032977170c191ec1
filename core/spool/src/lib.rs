//! coderelay-spool - Append-only on-disk queue for events and responses.
//!
//! One file per record, compressed above a size threshold with a checksum
//! verified on read, a single persisted reader cursor, and TTL + count-cap
//! retention.

mod codec;
mod error;
mod spool;
mod store;

pub use codec::checksum_hex;
pub use error::Result;
pub use error::SpoolError;
pub use spool::Spool;
pub use spool::SpoolItem;
pub use spool::SpoolOptions;
pub use spool::SpooledRecord;
pub use store::SpoolSet;
