//! Script parser for the shexpect scripting language.
//!
//! The top-level entry points are [`parse_str`] and [`parse_file`].

use crate::command::ScriptCommand;
use crate::commands::{Expect, MatchLine, ReadLine, SendInput, Show, UniquePrompt, Wait};
use anyhow::{Context as _, Result, anyhow};
use std::path::Path;
use std::time::Duration;

/// Parse a send/expect script, one command per line.
///
/// Blank lines and `#` comments are skipped. Errors name the offending line
/// number.
///
/// # Example
///
/// ```
/// use shexpect::parse_str;
///
/// let commands = parse_str("send \"echo hello\"\nexpect \"^hello$\" 2s\n").unwrap();
/// assert_eq!(commands.len(), 2);
/// ```
pub fn parse_str(content: &str) -> Result<Vec<Box<dyn ScriptCommand>>> {
    let mut commands = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = strip_inline_comment(line);
        let cmd = parse_line(line)
            .with_context(|| format!("Failed to parse line {}: {}", line_num + 1, line))?;
        commands.push(cmd);
    }
    Ok(commands)
}

/// Read and parse a script file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Box<dyn ScriptCommand>>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script file: {}", path.display()))?;
    parse_str(&content)
}

type ParseFn = fn(&str) -> Result<Box<dyn ScriptCommand>>;

static REGISTRY: &[(&str, ParseFn)] = &[
    (SendInput::NAME, SendInput::parse_boxed),
    (Expect::NAME, Expect::parse_boxed),
    (MatchLine::NAME, MatchLine::parse_boxed),
    (ReadLine::NAME, ReadLine::parse_boxed),
    (Show::NAME, Show::parse_boxed),
    (Wait::NAME, Wait::parse_boxed),
    (UniquePrompt::NAME, UniquePrompt::parse_boxed),
];

/// Dispatch a single non-empty, non-comment line to the matching command's parser.
fn parse_line(line: &str) -> Result<Box<dyn ScriptCommand>> {
    let (name, args) = line.split_once(' ').unwrap_or((line, ""));
    REGISTRY
        .iter()
        .find(|(cmd_name, _)| *cmd_name == name)
        .map(|(_, parse)| parse(args))
        .unwrap_or_else(|| Err(anyhow!("Unknown command: {}", line)))
}

/// Cut a trailing `# ...` comment off a script line.
///
/// A `#` inside a quoted argument belongs to the argument, so patterns such
/// as `expect "^root@.*# $"` survive.
fn strip_inline_comment(line: &str) -> &str {
    let mut quoted = false;
    let mut chars = line.char_indices();
    while let Some((i, ch)) = chars.next() {
        match ch {
            '\\' => {
                chars.next();
            }
            '"' => quoted = !quoted,
            '#' if !quoted => return line[..i].trim_end(),
            _ => {}
        }
    }
    line
}

/// Parse a timeout or pause: `250ms`, `5s`, `1.5s` or `2m`.
pub(crate) fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let invalid = || format!("Invalid duration '{s}' (expected e.g. 500ms, 5s or 1.5m)");

    if let Some(millis) = s.strip_suffix("ms") {
        return millis
            .trim()
            .parse()
            .map(Duration::from_millis)
            .with_context(invalid);
    }
    let (value, unit_secs) = match (s.strip_suffix('s'), s.strip_suffix('m')) {
        (Some(value), _) => (value, 1.0),
        (_, Some(value)) => (value, 60.0),
        _ => return Err(anyhow!(invalid())),
    };
    let value: f64 = value.trim().parse().with_context(invalid)?;
    Duration::try_from_secs_f64(value * unit_secs).with_context(invalid)
}

/// Split a leading double-quoted string off `args`.
///
/// Returns the unescaped string and the trimmed remainder after the closing
/// quote.
pub(crate) fn split_quoted(args: &str) -> Result<(String, &str)> {
    let args = args.trim();
    if !args.starts_with('"') {
        return Err(anyhow!("Expected quoted string, got: {}", args));
    }

    // Locate the closing quote, respecting backslash escapes.
    let mut escaped = false;
    let mut end_idx = None;
    for (i, ch) in args.char_indices().skip(1) {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if ch == '"' {
            end_idx = Some(i);
            break;
        }
    }

    let end_idx = end_idx.ok_or_else(|| anyhow!("Unclosed quote: {}", args))?;
    let text = parse_quoted_string(&args[..=end_idx])?;
    Ok((text, args[end_idx + 1..].trim()))
}

/// Parse a double-quoted string, processing `\n`, `\t`, `\"`, and `\\`.
pub(crate) fn parse_quoted_string(s: &str) -> Result<String> {
    let s = s.trim();
    if !s.starts_with('"') {
        return Err(anyhow!("Expected string to start with '\"'"));
    }
    if s.len() < 2 || !s.ends_with('"') {
        return Err(anyhow!("Expected string to end with '\"'"));
    }
    Ok(s[1..s.len() - 1]
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\\"", "\"")
        .replace("\\\\", "\\"))
}
