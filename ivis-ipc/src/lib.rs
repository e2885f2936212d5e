//! Inter-process communication between an IVIS task and its host
//!
//! A task talks to the host over two unidirectional byte streams: requests go
//! out on a dedicated descriptor, responses come back on standard input. Both
//! carry one JSON document per line. The exchange is strictly half-duplex:
//! one request, then exactly one response, never pipelined.

pub mod error;
pub mod protocol;
pub mod transport;

// Re-export commonly used types
pub use error::IpcError;
pub use protocol::{encode_line, RequestKind, RequestMessage, ResponseMessage};
pub use transport::{LineChannel, LineReader, RequestChannel, DEFAULT_MAX_LINE_BYTES};
