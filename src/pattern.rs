//! Line matchers used by `expect`.

use regex::Regex;
use std::fmt;

/// What an `expect` looks for in each captured line.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Regular-expression search anywhere in the line.
    Regex(Regex),
    /// Whole-line equality.
    Exact(String),
}

impl Pattern {
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Pattern::Regex(Regex::new(pattern)?))
    }

    pub fn exact(text: impl Into<String>) -> Self {
        Pattern::Exact(text.into())
    }

    /// Build a regex or exact pattern from a string.
    pub fn new(pattern: &str, is_regex: bool) -> Result<Self, regex::Error> {
        if is_regex {
            Self::regex(pattern)
        } else {
            Ok(Self::exact(pattern))
        }
    }

    pub fn is_match(&self, line: &str) -> bool {
        match self {
            Pattern::Regex(re) => re.is_match(line),
            Pattern::Exact(text) => line == text,
        }
    }

    /// The pattern source as written.
    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Regex(re) => re.as_str(),
            Pattern::Exact(text) => text,
        }
    }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self {
        Pattern::Regex(re)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
