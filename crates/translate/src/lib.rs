//! Translators from the Anthropic Messages API wire format to OpenAI
//! chat-completion shapes.
//!
//! [`StreamConverter`] is the stateful event-stream translator used on the
//! streaming path; [`response::convert_complete`] is its stateless
//! counterpart for full JSON responses. Both are pure: no I/O.

pub mod response;
pub mod stream;

pub use response::{convert_complete, map_stop_reason};
pub use stream::StreamConverter;
