//! Chrome DevTools Protocol client.
//!
//! Four capabilities, which is all a render needs: navigate a page,
//! intercept its requests, evaluate scripts in it, and screenshot it.
//! Everything rides one browser WebSocket with flattened sessions.

mod client;
mod error;
mod protocol;
mod session;

pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::*;
pub use session::{PageSession, SessionCaller};
