//! Headless browser control for fold rendering.
//!
//! Wraps Chrome behind the DevTools protocol: engine lifecycle, isolated
//! per-render contexts, mobile emulation, and the network policy that keeps
//! renders fast and deterministic.

pub mod cdp;
pub mod emulation;
pub mod engine;
pub mod netpolicy;

pub use cdp::{CdpClient, CdpError, PageSession, ScreenshotClip, SessionCaller};
pub use engine::{EngineConfig, EngineError, EngineManager};
pub use netpolicy::{NetworkPolicy, should_abort};
