//! [`SendInput`] command: writes one line to the session.
//!
//! Script syntax: `send "text here"`

use crate::command::{Context, ScriptCommand};
use crate::parser::parse_quoted_string;
use anyhow::Result;

/// Sends a line to the child's input. The session appends the newline.
pub struct SendInput {
    pub line: String,
}

impl SendInput {
    pub const NAME: &'static str = "send";

    pub fn new(line: impl Into<String>) -> Self {
        Self { line: line.into() }
    }
}

impl ScriptCommand for SendInput {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self::new(parse_quoted_string(args)?))
    }

    fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.session().send(&self.line)?;
        Ok(())
    }
}
