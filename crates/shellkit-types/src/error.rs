//! Error types for shellkit.

use std::io;

/// Errors produced by the shellkit interpreter and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("no matching command found for: {0}")]
    NoMatchingCommand(String),

    #[error("ambiguous command, candidates: {}", .0.join(", "))]
    AmbiguousCommand(Vec<String>),

    /// Attempted to pop the default context.
    #[error("no context to pop")]
    ContextUnderflow,

    /// Explicit request to leave the shell. Not a failure.
    #[error("end of program")]
    EndOfProgram,

    /// Raised by a command when the user interrupts it. The interpreter
    /// turns this into an aborted outcome.
    #[error("interrupted")]
    Interrupted,

    #[error("command error: {0}")]
    Command(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ShellError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_display() {
        let e = ShellError::Syntax("unexpected '|'".into());
        assert_eq!(format!("{e}"), "syntax error: unexpected '|'");
    }

    #[test]
    fn no_matching_command_carries_line() {
        let e = ShellError::NoMatchingCommand("  frobnicate now ".into());
        assert_eq!(
            format!("{e}"),
            "no matching command found for:   frobnicate now "
        );
    }

    #[test]
    fn ambiguous_command_lists_candidates() {
        let e = ShellError::AmbiguousCommand(vec!["config".into(), "configure <name>".into()]);
        assert_eq!(
            format!("{e}"),
            "ambiguous command, candidates: config, configure <name>"
        );
    }

    #[test]
    fn context_underflow_display() {
        assert_eq!(format!("{}", ShellError::ContextUnderflow), "no context to pop");
    }

    #[test]
    fn end_of_program_is_distinct() {
        let e = ShellError::EndOfProgram;
        assert!(matches!(e, ShellError::EndOfProgram));
        assert_eq!(format!("{e}"), "end of program");
    }

    #[test]
    fn command_error_display() {
        let e = ShellError::Command("disk full".into());
        assert_eq!(format!("{e}"), "command error: disk full");
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let e: ShellError = io_err.into();
        let msg = format!("{e}");
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("pipe closed"));
    }

    #[test]
    fn toml_error_from_conversion() {
        let toml_err = toml::from_str::<toml::Value>("prompt = [[[").unwrap_err();
        let e: ShellError = toml_err.into();
        assert!(format!("{e}").contains("TOML parse error"));
    }

    #[test]
    fn regex_error_from_conversion() {
        let re_err = regex::Regex::new("(unclosed").unwrap_err();
        let e: ShellError = re_err.into();
        assert!(format!("{e}").starts_with("invalid pattern"));
    }

    #[test]
    fn error_is_debug() {
        let e = ShellError::Interrupted;
        assert!(format!("{e:?}").contains("Interrupted"));
    }
}
