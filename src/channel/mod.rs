//! Sentinel Command Channel
//!
//! The remote side offers no request/response framing: commands and their
//! output share one byte stream with a human-oriented shell. Completion is
//! detected by appending `echo "<sentinel>"` to every command, so the
//! sentinel reaches the stream only after the user command (including
//! compound commands joined by `;`) has fully run.
//!
//! Two channel flavors implement the same protocol:
//!
//! - [`ShellChannel`] — a persistent interactive shell, opened lazily and
//!   reused across many commands
//! - [`ExecChannel`] — a one-shot exec request, opened and closed per call

pub mod exec;
pub mod shell;

pub use exec::ExecChannel;
pub use shell::ShellChannel;

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker echoed after every remote command to signal completion.
///
/// Known limitation: the token is fixed, not per-call unique. The protocol
/// assumes it never occurs in ordinary command output; a command that prints
/// the token itself will terminate the read early.
pub const SENTINEL: &str = "__COMMAND_ENDED__";

/// Default timeout for a single command, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Chunk size for each read from the remote stream
pub(crate) const READ_CHUNK_SIZE: usize = 4096;

/// Completion marker: the sentinel followed by whitespace.
///
/// The echoed command line contains the sentinel inside quotes
/// (`; echo "__COMMAND_ENDED__"`), where the next byte is `"` rather than
/// whitespace, so the echo alone never counts as completion.
static COMPLETION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("{}\\s", SENTINEL)).expect("completion pattern is valid"));

/// Compose the wire form of a command: trailing semicolons are stripped and
/// the sentinel echo is appended so it runs after every part of a compound
/// command.
pub fn compose_command(command: &str) -> String {
    let trimmed = command.trim_end().trim_end_matches(';');
    format!("{}; echo \"{}\"", trimmed, SENTINEL)
}

/// True once the accumulated output contains the completion marker
pub fn is_complete(accumulated: &str) -> bool {
    COMPLETION_RE.is_match(accumulated)
}

/// Strip protocol noise from accumulated output.
///
/// Removes the echoed `; echo "<sentinel>"` suffix of the command line
/// (interactive shells echo input) and every bare occurrence of the
/// sentinel. Idempotent: the result contains no sentinel to strip again.
pub fn cleanup(raw: &str) -> String {
    let echoed = format!("; echo \"{}\"", SENTINEL);
    raw.replace(&echoed, "").replace(SENTINEL, "")
}
