//! Child process spawning behind a small trait seam.
//!
//! A session only needs a writable input stream, a readable output stream
//! and a way to terminate the child. [`PipeSpawner`] provides that with
//! plain pipes, [`PtySpawner`] runs the program inside a pseudo-terminal.

use crate::error::SpawnError;
use portable_pty::{ChildKiller, CommandBuilder, MasterPty, PtySize};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Program, arguments and environment for a child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl SpawnCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child, on top of the inherited ones.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Override the child's `PS1`.
    pub fn prompt(self, ps1: impl Into<String>) -> Self {
        self.env("PS1", ps1)
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

/// Handle to a running child process.
pub trait ChildProcess: Send {
    /// OS process id, if known.
    fn process_id(&self) -> Option<u32>;

    /// Whether the child has exited.
    fn has_exited(&mut self) -> bool;

    /// Ask the child to terminate. Succeeds if it has already exited.
    fn terminate(&mut self) -> io::Result<()>;

    /// Wait for the child to exit.
    fn wait(&mut self) -> io::Result<()>;
}

/// The streams and handle of a freshly spawned child.
pub struct SpawnedProcess {
    pub child: Box<dyn ChildProcess>,
    pub input: Box<dyn Write + Send>,
    pub output: Box<dyn Read + Send>,
    /// Separate error stream; `None` when it is merged into `output`.
    pub error: Option<Box<dyn Read + Send>>,
}

/// Starts child processes for a session.
pub trait Spawner {
    fn spawn(&self, command: &SpawnCommand) -> Result<SpawnedProcess, SpawnError>;
}

/// Spawns children with piped stdin, stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipeSpawner;

impl Spawner for PipeSpawner {
    fn spawn(&self, command: &SpawnCommand) -> Result<SpawnedProcess, SpawnError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }

        // Own process group, so terminal signals aimed at us skip the child.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|source| SpawnError::Io {
            program: command.program.clone(),
            source,
        })?;

        let input = child.stdin.take().ok_or(SpawnError::MissingStream("stdin"))?;
        let output = child
            .stdout
            .take()
            .ok_or(SpawnError::MissingStream("stdout"))?;
        let error = child
            .stderr
            .take()
            .ok_or(SpawnError::MissingStream("stderr"))?;

        Ok(SpawnedProcess {
            child: Box::new(child),
            input: Box::new(input),
            output: Box::new(output),
            error: Some(Box::new(error)),
        })
    }
}

impl ChildProcess for std::process::Child {
    fn process_id(&self) -> Option<u32> {
        Some(self.id())
    }

    fn has_exited(&mut self) -> bool {
        matches!(self.try_wait(), Ok(Some(_)))
    }

    fn terminate(&mut self) -> io::Result<()> {
        match self.kill() {
            // Already reaped.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }

    fn wait(&mut self) -> io::Result<()> {
        std::process::Child::wait(self).map(|_| ())
    }
}

/// Spawns children inside a pseudo-terminal.
///
/// The child sees a TTY, so interactive shells print prompts and echo
/// input. Its stderr shares the PTY with stdout.
#[derive(Debug, Clone, Copy)]
pub struct PtySpawner {
    pub size: PtySize,
}

impl PtySpawner {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            size: PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            },
        }
    }
}

impl Default for PtySpawner {
    fn default() -> Self {
        Self::new(24, 80)
    }
}

impl Spawner for PtySpawner {
    fn spawn(&self, command: &SpawnCommand) -> Result<SpawnedProcess, SpawnError> {
        let pty_system = portable_pty::native_pty_system();
        let pair = pty_system
            .openpty(self.size)
            .map_err(|e| SpawnError::Pty(format!("failed to open PTY: {e:#}")))?;

        let mut cmd = CommandBuilder::new(&command.program);
        for arg in &command.args {
            cmd.arg(arg);
        }
        for (key, value) in &command.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &command.cwd {
            cmd.cwd(dir);
        }

        let child = pair.slave.spawn_command(cmd).map_err(|e| {
            SpawnError::Pty(format!("failed to spawn '{}': {e:#}", command.program))
        })?;

        let input = pair
            .master
            .take_writer()
            .map_err(|e| SpawnError::Pty(format!("failed to get PTY writer: {e:#}")))?;
        let output = pair
            .master
            .try_clone_reader()
            .map_err(|e| SpawnError::Pty(format!("failed to get PTY reader: {e:#}")))?;

        Ok(SpawnedProcess {
            child: Box::new(PtyChild {
                child,
                master: Some(pair.master),
            }),
            input,
            output,
            error: None,
        })
    }
}

/// A PTY child together with the master side that keeps the terminal open.
struct PtyChild {
    child: Box<dyn portable_pty::Child + Send + Sync>,
    master: Option<Box<dyn MasterPty + Send>>,
}

impl ChildProcess for PtyChild {
    fn process_id(&self) -> Option<u32> {
        self.child.process_id()
    }

    fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }

    fn terminate(&mut self) -> io::Result<()> {
        let result = if self.has_exited() {
            Ok(())
        } else {
            self.child.kill()
        };
        // Closing the master hangs up the terminal so the reader sees EOF.
        self.master = None;
        result
    }

    fn wait(&mut self) -> io::Result<()> {
        self.child.wait().map(|_| ())
    }
}
