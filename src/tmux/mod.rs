//! tmux naming, command construction and capture sizing

pub mod capture;
pub mod command;
pub mod window;

pub use capture::{recommend, recommend_with_baseline, CaptureConfig};
pub use command::EnsureOutcome;
pub use window::{
    project_scoped_name, resolve_window_name, sanitize, session_name_for, shared_session_name,
};
