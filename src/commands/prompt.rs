//! [`UniquePrompt`] command: switches the remote shell to a distinctive prompt.
//!
//! Script syntax: `prompt`

use crate::command::{Context, ScriptCommand};
use anyhow::{Result, anyhow};

/// Runs [`ShellSession::set_unique_prompt`](crate::ShellSession::set_unique_prompt)
/// and fails the script if neither prompt style took effect.
pub struct UniquePrompt;

impl UniquePrompt {
    pub const NAME: &'static str = "prompt";
}

impl ScriptCommand for UniquePrompt {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        if !args.trim().is_empty() {
            return Err(anyhow!("'prompt' takes no arguments, got: {}", args.trim()));
        }
        Ok(Self)
    }

    fn execute(&self, ctx: &mut Context) -> Result<()> {
        if ctx.session().set_unique_prompt()? {
            Ok(())
        } else {
            Err(anyhow!("Could not set a unique shell prompt"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_args() {
        assert!(UniquePrompt::parse("").is_ok());
        assert!(UniquePrompt::parse("  ").is_ok());
    }

    #[test]
    fn test_parse_rejects_args() {
        assert!(UniquePrompt::parse("now").is_err());
    }
}
