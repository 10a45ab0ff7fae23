//! [`ShellSession`]: one conversation with a long-lived child process.
//!
//! The session writes command lines to the child's input and reads its
//! output back line by line through a [`LineReader`]. `expect` consumes lines
//! until one matches or the reader runs out of budget.
//!
//! Sessions have no implicit finalization: dropping a running session leaves
//! the child alive. Call [`ShellSession::stop`].

use crate::config::{SessionConfig, UNIQUE_PROMPT};
use crate::encoding::LineEncoding;
use crate::error::{Result, SessionError, SpawnError};
use crate::pattern::Pattern;
use crate::process::{ChildProcess, PipeSpawner, SpawnCommand, SpawnedProcess, Spawner};
use crate::reader::{Budget, LineReader};
use std::io::{Read, Write};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{Span, debug, debug_span, info, trace, warn};

const PROMPT_SET_SH: &str = r"PS1='[PEXPECT]\$ '";
const PROMPT_SET_CSH: &str = r"set prompt='[PEXPECT]\$ '";

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Process spawned, output capture not started yet.
    Created,
    /// Capture running; send, read and expect are available.
    Running,
    /// Stopped for good. Buffered output can still be read.
    Stopped,
}

/// Drives one interactive child process.
pub struct ShellSession {
    id: String,
    config: SessionConfig,
    prompt: Pattern,
    state: SessionState,
    child: Box<dyn ChildProcess>,
    input: Option<Box<dyn Write + Send>>,
    error: Option<Box<dyn Read + Send>>,
    reader: LineReader,
    span: Span,
}

impl ShellSession {
    /// Spawn `command` with piped stdio and the default configuration.
    pub fn spawn(id: impl Into<String>, command: &SpawnCommand) -> Result<Self> {
        Self::spawn_with(id, command, SessionConfig::default(), &PipeSpawner)
    }

    /// Spawn `command` through `spawner`.
    pub fn spawn_with(
        id: impl Into<String>,
        command: &SpawnCommand,
        config: SessionConfig,
        spawner: &dyn Spawner,
    ) -> Result<Self> {
        let id = id.into();
        config.validate()?;
        debug!(session = %id, program = %command.program, args = ?command.args, "spawning");
        let process = spawner.spawn(command)?;
        Self::attach(id, process, config)
    }

    /// Start a session over an already spawned process.
    pub fn attach(
        id: impl Into<String>,
        process: SpawnedProcess,
        config: SessionConfig,
    ) -> Result<Self> {
        let id = id.into();
        let SpawnedProcess {
            mut child,
            input,
            output,
            error,
        } = process;

        let prompt = match config
            .validate()
            .map_err(SessionError::from)
            .and_then(|()| Pattern::regex(&config.prompt).map_err(SessionError::from))
        {
            Ok(prompt) => prompt,
            Err(e) => {
                let _ = child.terminate();
                return Err(e);
            }
        };

        let span = config
            .span
            .clone()
            .unwrap_or_else(|| debug_span!("shell_session", id = %id));

        let reader = match LineReader::spawn(output, config.capacity, config.encoding, span.clone())
        {
            Ok(reader) => reader,
            Err(e) => {
                let _ = child.terminate();
                return Err(SpawnError::Thread(e).into());
            }
        };

        let mut session = Self {
            id,
            config,
            prompt,
            state: SessionState::Created,
            child,
            input: Some(input),
            error,
            reader,
            span,
        };
        session.transition(SessionState::Running);
        Ok(session)
    }

    /// Write `line` and a newline to the child's input.
    pub fn send(&mut self, line: &str) -> Result<()> {
        self.ensure_running()?;
        let _enter = self.span.enter();

        let mut data = self.config.encoding.encode(line);
        data.push(b'\n');
        let Some(input) = self.input.as_mut() else {
            return Err(SessionError::Stopped {
                session_id: self.id.clone(),
            });
        };
        input.write_all(&data)?;
        input.flush()?;
        debug!(line, "sent");
        Ok(())
    }

    /// Read the next line using the configured default budget.
    pub fn read_line(&mut self) -> Option<String> {
        self.read_line_with(self.config.default_budget)
    }

    /// Read the next line, waiting within `budget`. `None` means no new
    /// output arrived in time, or the stream has closed.
    pub fn read_line_with(&mut self, budget: Budget) -> Option<String> {
        let line = self.reader.read_next(budget);
        if let Some(line) = &line {
            self.span.in_scope(|| trace!(%line, "read"));
        }
        line
    }

    /// Collect every remaining line until the child's output closes.
    ///
    /// Blocks for as long as the output stream stays open, so this is meant
    /// for after the conversation has ended (typically after `exit` or
    /// [`stop`](Self::stop)).
    pub fn read_all(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            match self.reader.read_next(self.config.default_budget) {
                Some(line) => lines.push(line),
                None if self.reader.is_exhausted() => break,
                None => {}
            }
        }
        self.span
            .in_scope(|| debug!(count = lines.len(), "drained output"));
        lines
    }

    /// Consume lines until one matches `pattern` and return it.
    ///
    /// Fails with [`SessionError::Timeout`] as soon as a single read comes
    /// back empty within `budget`; the reported timeout is
    /// `budget.total()`.
    pub fn expect(&mut self, pattern: &Pattern, budget: Budget) -> Result<String> {
        self.ensure_running()?;
        let _enter = self.span.enter();
        debug!(%pattern, ?budget, "expecting");

        while let Some(line) = self.reader.read_next(budget) {
            if pattern.is_match(&line) {
                debug!(%line, "matched");
                return Ok(line);
            }
            trace!(%line, "no match");
        }

        Err(SessionError::Timeout {
            cause: format!("Failed to search message={pattern}"),
            timeout: budget.total(),
            session_id: self.id.clone(),
        })
    }

    /// [`expect`](Self::expect) a regular expression.
    pub fn expect_regex(&mut self, pattern: &str, budget: Budget) -> Result<String> {
        let pattern = Pattern::regex(pattern)?;
        self.expect(&pattern, budget)
    }

    /// [`expect`](Self::expect) a line equal to `text`.
    pub fn expect_exact(&mut self, text: &str, budget: Budget) -> Result<String> {
        self.expect(&Pattern::exact(text), budget)
    }

    /// Change the remote prompt to a marker that ordinary output is
    /// unlikely to contain, and wait for it.
    ///
    /// Tries the sh-style `PS1` assignment first and the csh-style
    /// `set prompt` if that times out. Returns `false` if neither prompt
    /// showed up. On success the session prompt becomes the marker.
    pub fn set_unique_prompt(&mut self) -> Result<bool> {
        let unique = Pattern::regex(UNIQUE_PROMPT)?;

        self.send("unset PROMPT_COMMAND")?;
        self.send(PROMPT_SET_SH)?;
        if !self.wait_for_prompt(&unique)? {
            self.span
                .in_scope(|| debug!("sh-style prompt not seen, trying csh"));
            self.send(PROMPT_SET_CSH)?;
            if !self.wait_for_prompt(&unique)? {
                self.span
                    .in_scope(|| warn!("could not establish unique prompt"));
                return Ok(false);
            }
        }

        self.prompt = unique;
        Ok(true)
    }

    /// Wait for the session prompt.
    pub fn sync_prompt(&mut self, budget: Budget) -> Result<String> {
        let prompt = self.prompt.clone();
        self.expect(&prompt, budget)
    }

    fn wait_for_prompt(&mut self, prompt: &Pattern) -> Result<bool> {
        match self.expect(prompt, self.config.prompt_budget) {
            Ok(_) => Ok(true),
            Err(e) if e.is_timeout() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Send `exit`, give the child [`SessionConfig::exit_grace`] to leave on
    /// its own, kill it otherwise, and wait for the capture thread.
    ///
    /// Calling `stop` on a stopped session does nothing. Failures while
    /// shutting down are logged, not returned.
    pub fn stop(&mut self) {
        if self.state == SessionState::Stopped {
            return;
        }

        self.span.in_scope(|| {
            if let Some(mut input) = self.input.take() {
                let mut exit = self.config.encoding.encode("exit");
                exit.push(b'\n');
                if let Err(e) = input.write_all(&exit).and_then(|()| input.flush()) {
                    debug!(error = %e, "could not send exit");
                }
            }

            if !wait_for_exit(&mut *self.child, self.config.exit_grace) {
                debug!(grace = ?self.config.exit_grace, "child still running after exit, killing it");
            }
            match self.child.terminate() {
                Ok(()) => {
                    if let Err(e) = self.child.wait() {
                        warn!(error = %e, "failed to reap child");
                    }
                }
                Err(e) => warn!(error = %e, "failed to terminate child"),
            }

            self.reader.join(self.config.stop_timeout);
        });
        self.transition(SessionState::Stopped);
    }

    fn ensure_running(&self) -> Result<()> {
        match self.state {
            SessionState::Running => Ok(()),
            SessionState::Created | SessionState::Stopped => Err(SessionError::Stopped {
                session_id: self.id.clone(),
            }),
        }
    }

    fn transition(&mut self, next: SessionState) {
        let prev = std::mem::replace(&mut self.state, next);
        self.span.in_scope(|| {
            debug!(?prev, ?next, "state change");
            match next {
                SessionState::Running => info!(pid = ?self.child.process_id(), "session started"),
                SessionState::Stopped => {
                    info!(lost_lines = self.reader.lost_lines(), "session stopped")
                }
                SessionState::Created => {}
            }
        });
    }

    /// Session identifier used in diagnostics.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn encoding(&self) -> LineEncoding {
        self.config.encoding
    }

    /// The pattern [`sync_prompt`](Self::sync_prompt) waits for.
    pub fn prompt(&self) -> &Pattern {
        &self.prompt
    }

    /// Replace the prompt pattern.
    pub fn set_prompt(&mut self, prompt: Pattern) {
        self.prompt = prompt;
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn process_id(&self) -> Option<u32> {
        self.child.process_id()
    }

    /// Lines dropped from the buffer before they were read.
    pub fn lost_lines(&self) -> u64 {
        self.reader.lost_lines()
    }

    /// Lines currently held in the capture buffer.
    pub fn buffered_lines(&self) -> usize {
        self.reader.len()
    }

    /// Whether the child's output stream has closed.
    pub fn is_output_closed(&self) -> bool {
        self.reader.is_closed()
    }

    /// Span the session records its events under.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Take the child's error stream. The caller is responsible for
    /// draining it; a child blocked on a full stderr pipe stops producing
    /// output. `None` for PTY sessions.
    pub fn take_stderr(&mut self) -> Option<Box<dyn Read + Send>> {
        self.error.take()
    }
}

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Poll `child` until it exits or `grace` runs out.
fn wait_for_exit(child: &mut dyn ChildProcess, grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    loop {
        if child.has_exited() {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(EXIT_POLL_INTERVAL.min(deadline - now));
    }
}
