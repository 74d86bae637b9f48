//! Session management

mod manager;

pub use manager::{CapturedPane, ResolvedWindow, SessionManager, SessionState};
