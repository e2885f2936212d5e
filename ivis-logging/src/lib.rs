//! Logging setup for IVIS task processes
//!
//! Standard input and the request descriptor carry the host protocol, so every
//! subscriber installed here writes to stderr and nowhere else.

pub mod init;

pub use init::{init_logging, init_simple_tracing};
