//! Line tokenizer and filter-clause splitting.
//!
//! A line is tokenized into words, then split on the first bare `|` word
//! into the command part and an optional output filter clause
//! (`| include <pattern>` or `| exclude <pattern>`). A quoted or escaped
//! `|` is an ordinary word.

use shellkit_types::error::{Result, ShellError};

/// Word that separates a command from its filter clause.
pub const FILTER_SEPARATOR: &str = "|";

/// Keywords accepted as the first word of a filter clause.
pub const FILTER_KEYWORDS: [&str; 2] = ["include", "exclude"];

/// One word of a tokenized line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    /// Some part of the word was quoted or backslash-escaped.
    pub literal: bool,
}

impl Word {
    /// Word typed without quotes or escapes.
    pub fn bare(text: &str) -> Self {
        Self {
            text: text.to_string(),
            literal: false,
        }
    }

    /// Whether this word separates a command from its filter clause.
    pub fn is_separator(&self) -> bool {
        !self.literal && self.text == FILTER_SEPARATOR
    }
}

/// Turns a raw line into words.
pub trait LineParser {
    fn parse(&self, line: &str) -> Result<Vec<Word>>;
}

/// Whitespace tokenizer with shell-style quoting.
///
/// - Single-quoted strings preserve all characters literally.
/// - Double-quoted strings honour `\"`, `\\` and `\$` escapes.
/// - Backslash escapes the next character outside of quotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellParser;

impl LineParser for ShellParser {
    fn parse(&self, line: &str) -> Result<Vec<Word>> {
        tokenize(line)
    }
}

/// Tokenize a line respecting quotes and backslash escapes.
pub fn tokenize(input: &str) -> Result<Vec<Word>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // Set by quotes and escapes; quoted empty strings ('' or "") still
    // produce a word.
    let mut literal = false;
    let mut chars = input.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(ch) = chars.next() {
        if in_single {
            if ch == '\'' {
                in_single = false;
            } else {
                current.push(ch);
            }
        } else if in_double {
            if ch == '"' {
                in_double = false;
            } else if ch == '\\'
                && let Some(&next) = chars.peek()
                && matches!(next, '"' | '\\' | '$')
            {
                current.push(next);
                chars.next();
            } else {
                current.push(ch);
            }
        } else {
            match ch {
                '\'' => {
                    in_single = true;
                    literal = true;
                },
                '"' => {
                    in_double = true;
                    literal = true;
                },
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                        literal = true;
                    }
                },
                c if c.is_whitespace() => {
                    if literal || !current.is_empty() {
                        tokens.push(Word {
                            text: std::mem::take(&mut current),
                            literal,
                        });
                        literal = false;
                    }
                },
                _ => current.push(ch),
            }
        }
    }

    if in_single {
        return Err(ShellError::Syntax("unterminated single quote".to_string()));
    }
    if in_double {
        return Err(ShellError::Syntax("unterminated double quote".to_string()));
    }

    if literal || !current.is_empty() {
        tokens.push(Word {
            text: current,
            literal,
        });
    }

    Ok(tokens)
}

/// A tokenized line split on the filter separator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitLine {
    /// Words before the separator.
    pub command: Vec<String>,
    /// Words after the separator.
    pub filter: Vec<String>,
    /// Whether a separator was present.
    pub separator: bool,
}

/// Split words on the first bare `|`. A second bare `|` is a syntax error.
pub fn split_filter(words: Vec<Word>) -> Result<SplitLine> {
    let mut split = SplitLine::default();
    for word in words {
        if word.is_separator() {
            if split.separator {
                return Err(ShellError::Syntax(
                    "only one '|' filter is allowed".to_string(),
                ));
            }
            split.separator = true;
            continue;
        }
        if split.separator {
            split.filter.push(word.text);
        } else {
            split.command.push(word.text);
        }
    }
    Ok(split)
}

/// Output filter requested after `|`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterClause {
    /// Keep only lines matching the pattern.
    Include(String),
    /// Drop lines matching the pattern.
    Exclude(String),
}

impl FilterClause {
    /// Parse the words after `|`: a prefix of `include` or `exclude`
    /// followed by exactly one pattern.
    pub fn from_tokens(tokens: &[String]) -> Result<Self> {
        let (keyword, pattern) = match tokens {
            [keyword, pattern] => (keyword.as_str(), pattern.clone()),
            [] => return Err(ShellError::Syntax("missing filter after '|'".to_string())),
            [keyword] => {
                return Err(ShellError::Syntax(format!(
                    "missing pattern for filter '{keyword}'"
                )));
            },
            _ => {
                return Err(ShellError::Syntax(
                    "filter takes exactly one pattern".to_string(),
                ));
            },
        };
        if keyword.is_empty() {
            return Err(ShellError::Syntax("empty filter keyword".to_string()));
        }
        if "include".starts_with(keyword) {
            Ok(Self::Include(pattern))
        } else if "exclude".starts_with(keyword) {
            Ok(Self::Exclude(pattern))
        } else {
            Err(ShellError::Syntax(format!("unknown filter '{keyword}'")))
        }
    }

    /// Pattern lines are tested against.
    pub fn pattern(&self) -> &str {
        match self {
            Self::Include(p) | Self::Exclude(p) => p,
        }
    }
}
