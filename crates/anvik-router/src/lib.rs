//! Intent routing for Anvik.
//!
//! [`IntentRouter::route`] is the single entry point used by every
//! transport: it takes chat text plus a chat identity and returns the reply.

pub mod context;
pub mod router;

pub use context::{AnvikContext, Services};
pub use router::IntentRouter;
