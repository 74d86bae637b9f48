//! tmux command lines
//!
//! Every user-controlled value is quoted token by token with
//! [`shell_quote`], so the resulting strings are safe to hand to any
//! [`CommandExecutor`](crate::executor::CommandExecutor).
//!
//! Panes are always addressed through the window id (`@N`). tmux splits a
//! target at the first `.` after the `:` to find a pane, so a window name
//! such as `site.v2-claude` cannot be used in a target directly.

use crate::executor::{shell_join, shell_quote};

/// Probe printing the executing host's kernel name
pub const PLATFORM_PROBE: &str = "uname -s";

/// What the ensure script had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// Session (and its first window) was created
    CreatedSession,
    /// Session existed, window was created
    CreatedWindow,
    /// Both already existed
    Existing,
}

fn last_line(stdout: &str) -> Option<&str> {
    stdout.lines().rev().map(str::trim).find(|l| !l.is_empty())
}

impl EnsureOutcome {
    /// Parse the marker the ensure script prints last
    pub fn parse(stdout: &str) -> Option<Self> {
        match last_line(stdout)?.split_whitespace().next()? {
            "session-created" => Some(Self::CreatedSession),
            "window-created" => Some(Self::CreatedWindow),
            "window-exists" => Some(Self::Existing),
            _ => None,
        }
    }

    /// Whether anything new was created
    pub fn created(&self) -> bool {
        !matches!(self, Self::Existing)
    }
}

/// Window id printed after the ensure script's marker
pub fn ensure_window_id(stdout: &str) -> Option<String> {
    last_line(stdout)?
        .split_whitespace()
        .nth(1)
        .filter(|id| is_window_id(id))
        .map(str::to_string)
}

/// Whether `id` looks like a tmux window id (`@` followed by digits)
pub fn is_window_id(id: &str) -> bool {
    id.strip_prefix('@')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Exact-session tmux target for a window id
pub fn window_target(session: &str, window_id: &str) -> String {
    format!("={}:{}", session, window_id)
}

// Sets ID to the id of the window named exactly $WINDOW in $SESSION, or to
// the empty string. Names are compared whole, dots and spaces included.
const FIND_WINDOW: &str = "ID=$(tmux list-windows -t \"=$SESSION\" \
-F '#{window_id} #{window_name}' 2>/dev/null \
| while IFS= read -r line; do \
if [ \"${line#* }\" = \"$WINDOW\" ]; then printf '%s\\n' \"${line%% *}\"; break; fi; \
done)\n";

fn script_header(session: &str, window: &str) -> String {
    format!(
        "SESSION={}\nWINDOW={}\n",
        shell_quote(session),
        shell_quote(window)
    )
}

/// Idempotent script creating the session and window when absent.
///
/// Prints one marker line followed by the window id, e.g.
/// `window-created @4`. A lost race on `new-session` is tolerated: if the
/// session exists afterwards the script carries on to the window check.
/// New windows start in `start_dir` when given.
pub fn ensure_script(
    session: &str,
    window: &str,
    launch_command: Option<&str>,
    start_dir: Option<&str>,
) -> String {
    let launch = launch_command
        .map(|c| format!(" {}", shell_quote(c)))
        .unwrap_or_default();
    let dir = start_dir
        .map(|d| format!(" -c {}", shell_quote(d)))
        .unwrap_or_default();
    format!(
        "{header}\
if ! tmux has-session -t \"=$SESSION\" 2>/dev/null; then\n\
  if ID=$(tmux new-session -d -P -F '#{{window_id}}' \
-s \"$SESSION\" -n \"$WINDOW\"{dir}{launch}); then\n\
    echo \"session-created $ID\"\n\
    exit 0\n\
  fi\n\
  tmux has-session -t \"=$SESSION\" || exit 1\n\
fi\n\
{find}\
if [ -n \"$ID\" ]; then\n\
  echo \"window-exists $ID\"\n\
  exit 0\n\
fi\n\
ID=$(tmux new-window -d -P -F '#{{window_id}}' \
-t \"=$SESSION:\" -n \"$WINDOW\"{dir}{launch}) || exit 1\n\
echo \"window-created $ID\"\n",
        header = script_header(session, window),
        find = FIND_WINDOW,
    )
}

/// Print the id of an existing window; exits 1 when it does not exist
pub fn find_window_script(session: &str, window: &str) -> String {
    format!(
        "{header}\
{find}\
if [ -z \"$ID\" ]; then\n\
  echo \"can't find window: $WINDOW\" >&2\n\
  exit 1\n\
fi\n\
echo \"$ID\"\n",
        header = script_header(session, window),
        find = FIND_WINDOW,
    )
}

/// Capture the pane's text, `history_lines` of scrollback included
pub fn capture_command(target: &str, history_lines: usize) -> String {
    shell_join(&[
        "tmux".to_string(),
        "capture-pane".to_string(),
        "-p".to_string(),
        "-J".to_string(),
        "-t".to_string(),
        target.to_string(),
        "-S".to_string(),
        format!("-{}", history_lines),
    ])
}

/// Print the pane's current scrollback depth
pub fn history_probe_command(target: &str) -> String {
    shell_join(&["tmux", "display-message", "-p", "-t", target, "#{history_size}"])
}
