//! [`Show`] command: prints an annotation between captured lines.
//!
//! Script syntax: `show "== after reboot =="`

use crate::command::{Context, ScriptCommand};
use crate::parser::parse_quoted_string;
use anyhow::Result;

/// Emits a line of text to the output handler. Nothing reaches the child.
pub struct Show {
    pub text: String,
}

impl Show {
    pub const NAME: &'static str = "show";
}

impl ScriptCommand for Show {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self {
            text: parse_quoted_string(args)?,
        })
    }

    fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.emit_line(&self.text);
        Ok(())
    }
}
