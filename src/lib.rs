//! Purpose: Shared library crate backing the `addrbook` service binary.
//! Exports: `api` (client, DAO, validation) and `core` (store backends, errors).
//! Role: Internal library; the HTTP layer lives in the binary crate.
//! Invariants: Everything above `core` receives soft sentinels, never transport errors.
pub mod api;
pub mod core;
