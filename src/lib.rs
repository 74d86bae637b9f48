//! mudcode - tmux bridge for long-running coding agents
//!
//! Every agent instance of a project lives in its own tmux window. The bridge
//! finds that window again on each call, creates it when missing, and reads
//! back the pane with a scrollback depth sized to what the pane has shown
//! before. tmux may run on this host or on a remote one reached over ssh.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        SessionManager                           │
//! │  resolve ─► ensure ─► capture ─► history probe                  │
//! │     │                                                           │
//! │     ├── tmux::window   window / session naming                  │
//! │     ├── tmux::capture  scrollback sizing                        │
//! │     └── tmux::command  ensure script, capture command           │
//! └──────────────────────────────┬─────────────────────────────────┘
//!                                │ shell command string
//! ┌──────────────────────────────▼─────────────────────────────────┐
//! │                  Arc<dyn CommandExecutor>                       │
//! │  ┌──────────────────┐          ┌──────────────────────────┐     │
//! │  │  LocalExecutor   │          │  SshExecutor             │     │
//! │  │  sh -c           │          │  ssh -o BatchMode=yes    │     │
//! │  └──────────────────┘          └──────────────────────────┘     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration management
//! - [`state`]: Read-only view of the project registry
//! - [`tmux`]: Window naming, tmux commands and capture sizing
//! - [`executor`]: Local and ssh command execution
//! - [`session`]: Per-identity ensure and capture lifecycle

pub mod config;
pub mod error;
pub mod executor;
pub mod session;
pub mod state;
pub mod tmux;

pub use config::BridgeConfig;
pub use error::{Error, Result};
pub use session::{CapturedPane, SessionManager, SessionState};
