//! Purpose: Define the public API surface for the address-book storage stack.
//! Exports: Key-value client, record DAO, validation helpers, and error types.
//! Role: The only path the HTTP layer and binary use into store primitives.
//! Invariants: Consumers receive soft sentinels; transport errors stay below this line.

mod client;
mod dao;
mod validation;

pub use crate::core::conn::{StoreConn, StoreSettings};
pub use crate::core::error::{Error, ErrorKind, to_exit_code};
pub use crate::core::memory::MemoryStore;
pub use crate::core::store::{Store, TtlSpec};
pub use client::{KvClient, Ttl};
pub use dao::RecordDao;
pub use validation::{ADDRESS_MAX_LEN, validate_address, validate_phone};
