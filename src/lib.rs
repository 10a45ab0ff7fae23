//! # shexpect
//!
//! A line-oriented expect driver for long-lived interactive shell sessions.
//!
//! A [`ShellSession`] spawns a child process (an `adb shell`, a serial
//! console wrapper, a plain `sh`), captures its output line by line on a
//! background thread, and lets the caller send commands and wait for
//! expected output with bounded timeouts.
//!
//! ## Quick start
//!
//! ```no_run
//! use shexpect::{Budget, ShellSession, SpawnCommand};
//! use std::time::Duration;
//!
//! fn main() -> shexpect::Result<()> {
//!     let command = SpawnCommand::new("adb").args(["-s", "emulator-5554", "shell"]);
//!     let mut session = ShellSession::spawn("emulator-5554", &command)?;
//!
//!     session.send("getprop ro.build.version.sdk")?;
//!     let sdk = session.expect_regex(r"^\d+$", Budget::from_timeout(Duration::from_secs(5)))?;
//!     println!("SDK level {sdk}");
//!
//!     session.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Reading and expecting
//!
//! Captured lines are consumed in order through a single cursor:
//!
//! - [`ShellSession::read_line`] returns the next line or `None` if nothing
//!   arrived within the wait budget;
//! - [`ShellSession::expect`] consumes lines until one matches a
//!   [`Pattern`] and fails with [`SessionError::Timeout`] once a read comes
//!   back empty;
//! - [`ShellSession::read_all`] drains everything until the output closes.
//!
//! A [`Budget`] is `poll_interval * max_attempts`: each attempt waits up to
//! `poll_interval` for a new line and returns as soon as one arrives.
//!
//! ## Buffering
//!
//! At most [`SessionConfig::capacity`] lines (5000 by default) are kept.
//! When the buffer is full the oldest line is dropped. A consumer that falls
//! that far behind loses output; [`ShellSession::lost_lines`] counts how
//! many lines were dropped unread.
//!
//! ## Scripts
//!
//! The `shexpect` binary runs a small script against a session:
//!
//! | Command | Description |
//! |---------|-------------|
//! | `send "text"` | Send a line to the child |
//! | `expect "regex" 5s` | Wait for a line matching a regex |
//! | `match "text" 5s` | Wait for a line equal to `text` |
//! | `readline 1s` | Print the next line, if any |
//! | `wait 500ms` | Pause |
//! | `show "text"` | Print text |
//! | `prompt` | Switch the remote shell to a unique prompt |
//! | `# comment` | Full-line or inline comment |
//!
//! ```no_run
//! use shexpect::{Engine, SessionConfig, SpawnCommand, parse_str};
//!
//! fn main() -> anyhow::Result<()> {
//!     let commands = parse_str("send \"echo hello\"\nexpect \"^hello$\"\n")?;
//!     let mut engine = Engine::spawn("local", &SpawnCommand::new("sh"), SessionConfig::default(), false)?;
//!     engine.execute(commands)
//! }
//! ```

pub mod buffer;
pub mod command;
pub mod commands;
pub mod config;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod parser;
pub mod pattern;
pub mod process;
pub mod reader;
pub mod session;

#[cfg(test)]
pub(crate) mod test_utils;

pub use command::{Context, ScriptCommand};
pub use commands::{Expect, MatchLine, ReadLine, SendInput, Show, UniquePrompt, Wait};
pub use config::{SessionConfig, UNIQUE_PROMPT};
pub use encoding::LineEncoding;
pub use engine::Engine;
pub use error::{ConfigError, Result, SessionError, SpawnError};
pub use parser::{parse_file, parse_str};
pub use pattern::Pattern;
pub use process::{ChildProcess, PipeSpawner, PtySpawner, SpawnCommand, SpawnedProcess, Spawner};
pub use reader::{Budget, LineReader};
pub use session::{SessionState, ShellSession};
