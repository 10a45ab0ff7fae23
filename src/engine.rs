use crate::command::{Context, OutputHandler, ScriptCommand};
use crate::config::SessionConfig;
use crate::process::{PipeSpawner, PtySpawner, SpawnCommand, Spawner};
use crate::encoding::LineEncoding;
use crate::reader::{Budget, trim_line_end};
use crate::session::ShellSession;
use anyhow::{Context as _, Result};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// Runs script commands against one shell session.
pub struct Engine {
    ctx: Context,
}

impl Engine {
    /// Spawn `command` and write all script output to stdout.
    ///
    /// With `pty` set the child runs inside a pseudo-terminal, otherwise it
    /// gets plain pipes.
    pub fn spawn(
        session_id: &str,
        command: &SpawnCommand,
        config: SessionConfig,
        pty: bool,
    ) -> Result<Self> {
        Self::spawn_with_handler(session_id, command, config, pty, |data| {
            let mut stdout = io::stdout().lock();
            let _ = stdout.write_all(data);
            let _ = stdout.flush();
        })
    }

    /// Spawn `command` and pass all script output to `handler`.
    ///
    /// A piped stderr is drained in the background and logged at debug
    /// level, so a child that writes a lot of diagnostics never blocks.
    pub fn spawn_with_handler<F>(
        session_id: &str,
        command: &SpawnCommand,
        config: SessionConfig,
        pty: bool,
        handler: F,
    ) -> Result<Self>
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        let pty_spawner = PtySpawner::default();
        let spawner: &dyn Spawner = if pty { &pty_spawner } else { &PipeSpawner };
        let mut session = ShellSession::spawn_with(session_id, command, config, spawner)
            .with_context(|| format!("Failed to start '{}'", command.program))?;
        if let Some(stderr) = session.take_stderr() {
            if let Err(e) = drain_stderr(stderr, &session) {
                session.stop();
                return Err(e);
            }
        }
        Ok(Self::with_handler(session, handler))
    }

    /// Wrap an existing session. Its stderr, if still attached, is left to
    /// the caller.
    pub fn with_handler<F>(session: ShellSession, handler: F) -> Self
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        let output_handler: OutputHandler = Arc::new(handler);
        Engine {
            ctx: Context {
                session,
                output_handler,
            },
        }
    }

    pub fn session(&mut self) -> &mut ShellSession {
        self.ctx.session()
    }

    /// Execute commands in order, then stop the session and emit whatever
    /// output is left.
    ///
    /// The session is stopped even when a command fails; the first failure
    /// is returned.
    pub fn execute(&mut self, commands: Vec<Box<dyn ScriptCommand>>) -> Result<()> {
        let result = self.run(commands);
        self.finish();
        result
    }

    fn run(&mut self, commands: Vec<Box<dyn ScriptCommand>>) -> Result<()> {
        for (index, command) in commands.iter().enumerate() {
            debug!(index, command = command.name(), "executing");
            command
                .execute(&mut self.ctx)
                .with_context(|| format!("Command {} ('{}') failed", index + 1, command.name()))?;
        }
        Ok(())
    }

    fn finish(&mut self) {
        let session = &mut self.ctx.session;
        session.stop();

        // A grandchild may still hold the output open; only drain what is
        // already captured in that case.
        let remaining = if session.is_output_closed() {
            session.read_all()
        } else {
            std::iter::from_fn(|| session.read_line_with(Budget::immediate())).collect()
        };
        for line in remaining {
            self.ctx.emit_line(&line);
        }
    }
}

/// Log every stderr line of the session on a detached thread. The thread
/// ends when the child closes its stderr.
fn drain_stderr(stderr: Box<dyn Read + Send>, session: &ShellSession) -> Result<()> {
    let span = session.span().clone();
    let encoding = session.encoding();
    thread::Builder::new()
        .name("shexpect-stderr".into())
        .spawn(move || {
            let _enter = span.enter();
            let mut reader = BufReader::new(stderr);
            let mut raw = Vec::new();
            loop {
                raw.clear();
                match reader.read_until(b'\n', &mut raw) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                let raw = trim_line_end(&raw);
                let line = encoding
                    .decode(raw)
                    .or_else(|_| LineEncoding::Utf8Lossy.decode(raw))
                    .unwrap_or_default();
                debug!(%line, "stderr");
            }
        })
        .context("Failed to start stderr drain thread")?;
    Ok(())
}
