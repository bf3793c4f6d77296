//! Caller-owned conversation context.

mod session;

pub use session::SessionContext;
