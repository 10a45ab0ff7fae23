//! [`ReadLine`] command: reads one line and passes it to the output handler.
//!
//! Script syntax: `readline` (1-second wait) or `readline 3s`

use crate::command::{Context, ScriptCommand};
use crate::parser::parse_duration;
use crate::reader::Budget;
use anyhow::Result;
use std::time::Duration;
use tracing::debug;

/// Reads the next captured line and emits it. Getting no line in time is
/// not an error.
pub struct ReadLine {
    pub timeout: Duration,
}

impl ReadLine {
    pub const NAME: &'static str = "readline";
}

impl Default for ReadLine {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
        }
    }
}

impl ScriptCommand for ReadLine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        if args.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            timeout: parse_duration(args)?,
        })
    }

    fn execute(&self, ctx: &mut Context) -> Result<()> {
        match ctx
            .session()
            .read_line_with(Budget::from_timeout(self.timeout))
        {
            Some(line) => ctx.emit_line(&line),
            None => debug!(timeout = ?self.timeout, "readline got no data"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default() {
        assert_eq!(ReadLine::parse("").unwrap().timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(
            ReadLine::parse("250ms").unwrap().timeout,
            Duration::from_millis(250)
        );
    }
}
