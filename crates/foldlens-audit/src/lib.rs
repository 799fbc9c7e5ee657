//! Fold UX auditing.
//!
//! Everything between "a URL arrived" and "here is the report": the SSRF
//! guard, the in-page audit programs, overlay detection and hiding, the
//! coverage math, and the staged render pipeline that strings them
//! together over a browser session.

pub mod fold;
pub mod lexicon;
pub mod overlay;
pub mod pipeline;
pub mod program;
pub mod ssrf;
pub mod watchdog;

pub use fold::{FoldAuditOutcome, FoldFacts, audit_fold};
pub use overlay::{BotProbe, OverlayOutcome};
pub use pipeline::RenderPipeline;
pub use ssrf::ensure_public_http_url;
