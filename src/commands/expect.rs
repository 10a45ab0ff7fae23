//! [`Expect`] command: blocks until a line matching a regex is read.
//!
//! Script syntax:
//! - `expect "^\$ "`: 5-second default timeout
//! - `expect "Password:" 10s`: custom timeout

use crate::command::{Context, ScriptCommand};
use crate::parser::{parse_duration, split_quoted};
use crate::pattern::Pattern;
use crate::reader::Budget;
use anyhow::{Context as _, Result};
use std::time::Duration;

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Reads lines until one matches `pattern`, failing if no new line arrives
/// within `timeout`.
///
/// Matched and skipped lines are consumed, so a later `Expect` starts after
/// the match.
pub struct Expect {
    pub pattern: Pattern,
    pub timeout: Duration,
}

impl Expect {
    pub const NAME: &'static str = "expect";

    /// Create an `Expect` command with the default 5-second timeout.
    pub fn new(pattern: Pattern) -> Self {
        Self::with_timeout(pattern, DEFAULT_TIMEOUT)
    }

    /// Create an `Expect` command with a custom timeout.
    pub fn with_timeout(pattern: Pattern, timeout: Duration) -> Self {
        Self { pattern, timeout }
    }
}

impl ScriptCommand for Expect {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        let (pattern, remainder) = split_quoted(args)?;
        let pattern = Pattern::regex(&pattern)
            .with_context(|| format!("Invalid regex in expect: {pattern}"))?;

        if remainder.is_empty() {
            Ok(Self::new(pattern))
        } else {
            Ok(Self::with_timeout(pattern, parse_duration(remainder)?))
        }
    }

    fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.session()
            .expect(&self.pattern, Budget::from_timeout(self.timeout))?;
        Ok(())
    }
}
