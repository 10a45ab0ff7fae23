//! The [`ScriptCommand`] trait and the [`Context`] type commands receive when executed.

use crate::session::ShellSession;
use anyhow::Result;
use std::sync::Arc;

pub(crate) type OutputHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Execution context passed to [`ScriptCommand::execute`].
///
/// Gives commands the shell session and the output handler.
pub struct Context {
    pub(crate) session: ShellSession,
    pub(crate) output_handler: OutputHandler,
}

impl Context {
    pub fn session(&mut self) -> &mut ShellSession {
        &mut self.session
    }

    /// Pass bytes through the output handler (e.g. to stdout or a custom sink).
    pub fn emit(&self, data: &[u8]) {
        (self.output_handler)(data);
    }

    /// Emit a captured line followed by a newline.
    pub fn emit_line(&self, line: &str) {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.emit(&data);
    }
}

/// A single script command.
///
/// Implement this trait to add a new command to the engine. Then:
///
/// 1. Define `pub const NAME: &'static str` on your struct; this is the
///    script keyword (e.g. `"send"`, `"expect"`) used by the parser.
/// 2. Re-export the struct from `src/commands/mod.rs`.
/// 3. Add one entry to the `REGISTRY` in [`crate::parser`]:
///    `(MyCmd::NAME, MyCmd::parse_boxed)`.
pub trait ScriptCommand: 'static {
    /// The command name, accessible at runtime through a trait object.
    fn name(&self) -> &'static str;

    /// Parse this command from the argument string (everything after the
    /// command keyword on the script line).
    fn parse(args: &str) -> Result<Self>
    where
        Self: Sized;

    /// Parse and box this command. Used as the function-pointer type stored
    /// in the command registry.
    fn parse_boxed(args: &str) -> Result<Box<dyn ScriptCommand>>
    where
        Self: Sized,
    {
        Ok(Box::new(Self::parse(args)?))
    }

    /// Execute the command against the session in `ctx`.
    fn execute(&self, ctx: &mut Context) -> Result<()>;
}
