//! [`Wait`] command: lets the child run for a while.
//!
//! Script syntax: `wait 500ms` or `wait 1.5s`

use crate::command::{Context, ScriptCommand};
use crate::parser::parse_duration;
use anyhow::Result;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Pauses the script. Capture continues in the background, so whatever the
/// child prints meanwhile is buffered for the next read.
pub struct Wait {
    pub duration: Duration,
}

impl Wait {
    pub const NAME: &'static str = "wait";
}

impl ScriptCommand for Wait {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self {
            duration: parse_duration(args)?,
        })
    }

    fn execute(&self, ctx: &mut Context) -> Result<()> {
        thread::sleep(self.duration);
        debug!(
            duration = ?self.duration,
            buffered = ctx.session().buffered_lines(),
            "wait finished"
        );
        Ok(())
    }
}
