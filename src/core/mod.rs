// Core modules implementing store access, backends, and error modeling.
pub mod conn;
pub mod error;
pub mod memory;
pub mod store;
