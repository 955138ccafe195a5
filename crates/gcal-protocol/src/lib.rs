//! Request/response protocol between gcal callers and the daemon.
//!
//! Messages are length-prefixed JSON:
//! - 4 bytes: message length (u32, big-endian)
//! - N bytes: JSON payload
//!
//! Every message is wrapped in an [`Envelope`] carrying the protocol version
//! and a request id. Requests name a [`Method`] and carry a parameter map;
//! responses carry either a result value or an [`ErrorResponse`].
//!
//! ```rust
//! use gcal_protocol::{Envelope, Method, Request, decode_message, encode_message};
//!
//! let request = Envelope::request(
//!     "req-123",
//!     Request::for_method(Method::FreeSlots).with_param("duration_minutes", 30),
//! );
//! let bytes = encode_message(&request).unwrap();
//! let decoded: Envelope<Request> = decode_message(&bytes).unwrap();
//! assert_eq!(decoded.payload.method, "calendar.free_slots");
//! ```

mod error;
mod framing;
pub mod methods;
pub mod results;
mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use framing::{decode_message, encode_message, read_frame, write_frame};
pub use methods::{Method, MethodInfo, ParamKind, ParamSpec, UnknownMethod, param};
pub use types::{Envelope, ErrorCode, ErrorResponse, Request, Response};

pub const PROTOCOL_VERSION: &str = "1";

/// Maximum message size (1 MiB).
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;
