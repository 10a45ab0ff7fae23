//! Session configuration.

use crate::buffer::DEFAULT_CAPACITY;
use crate::encoding::LineEncoding;
use crate::error::ConfigError;
use crate::reader::Budget;
use std::time::Duration;
use tracing::Span;

/// Prompt installed by [`ShellSession::set_unique_prompt`](crate::ShellSession::set_unique_prompt).
pub const UNIQUE_PROMPT: &str = r"\[PEXPECT\][\$\#] ";

/// Tunables for a [`ShellSession`](crate::ShellSession).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum number of captured lines kept in memory.
    pub capacity: usize,
    /// Encoding of the child's input and output.
    pub encoding: LineEncoding,
    /// Budget used by `read_line` and `read_all`.
    pub default_budget: Budget,
    /// Budget for each prompt wait in `set_unique_prompt`.
    pub prompt_budget: Budget,
    /// Regex matching the shell prompt.
    pub prompt: String,
    /// How long `stop` lets the child act on `exit` before killing it.
    pub exit_grace: Duration,
    /// How long `stop` waits for the output stream to close.
    pub stop_timeout: Duration,
    /// Span every session and capture-thread event is recorded under.
    /// A `shell_session` span is created when unset.
    pub span: Option<Span>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            encoding: LineEncoding::Utf8,
            default_budget: Budget::default(),
            prompt_budget: Budget::new(Duration::from_secs(1), 10),
            prompt: UNIQUE_PROMPT.to_string(),
            exit_grace: Duration::from_millis(500),
            stop_timeout: Duration::from_secs(2),
            span: None,
        }
    }
}

impl SessionConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_encoding(mut self, encoding: LineEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_default_budget(mut self, budget: Budget) -> Self {
        self.default_budget = budget;
        self
    }

    pub fn with_prompt_budget(mut self, budget: Budget) -> Self {
        self.prompt_budget = budget;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_exit_grace(mut self, grace: Duration) -> Self {
        self.exit_grace = grace;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.prompt_budget.max_attempts == 0 {
            return Err(ConfigError::ZeroPromptAttempts);
        }
        if self.default_budget.total().is_zero() {
            return Err(ConfigError::ZeroDefaultBudget);
        }
        Ok(())
    }
}
