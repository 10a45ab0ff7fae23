//! [`MatchLine`] command: blocks until a line equal to the given text is read.
//!
//! Script syntax: `match "READY"` or `match "READY" 30s`

use crate::command::{Context, ScriptCommand};
use crate::commands::expect::DEFAULT_TIMEOUT;
use crate::parser::{parse_duration, split_quoted};
use crate::reader::Budget;
use anyhow::Result;
use std::time::Duration;

/// Like [`Expect`](crate::commands::Expect) but compares whole lines
/// literally instead of searching with a regex.
pub struct MatchLine {
    pub text: String,
    pub timeout: Duration,
}

impl MatchLine {
    pub const NAME: &'static str = "match";

    pub fn new(text: impl Into<String>) -> Self {
        Self::with_timeout(text, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(text: impl Into<String>, timeout: Duration) -> Self {
        Self {
            text: text.into(),
            timeout,
        }
    }
}

impl ScriptCommand for MatchLine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        let (text, remainder) = split_quoted(args)?;
        if remainder.is_empty() {
            Ok(Self::new(text))
        } else {
            Ok(Self::with_timeout(text, parse_duration(remainder)?))
        }
    }

    fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.session()
            .expect_exact(&self.text, Budget::from_timeout(self.timeout))?;
        Ok(())
    }
}
