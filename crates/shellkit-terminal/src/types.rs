//! Token types: value matchers for a single word of a command line.
//!
//! A [`TokenType`] is built once when a command is defined and then shared
//! by every matching, completion and conversion call. It never changes.

use std::fmt;

use regex::Regex;

use shellkit_types::error::Result;

use crate::context::Context;

const BOOL_OPTIONS: [&str; 2] = ["true", "false"];

/// A completion candidate for the word under the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Completion {
    pub word: String,
    /// The candidate is a whole word; the editor may move on to the next one.
    pub terminal: bool,
}

impl Completion {
    pub fn terminal(word: &str) -> Self {
        Self {
            word: word.to_string(),
            terminal: true,
        }
    }
}

/// A typed value extracted from a matched word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Text(String),
    Integer(i64),
    Bool(bool),
}

impl Argument {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Argument::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Argument::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Text(s) => write!(f, "{s}"),
            Argument::Integer(v) => write!(f, "{v}"),
            Argument::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Acceptance rule of a token type.
#[derive(Debug, Clone)]
pub enum TokenKind {
    /// Any word.
    String,
    /// An integer strictly between the optional bounds.
    Integer { min: Option<i64>, max: Option<i64> },
    /// One of a fixed set of words.
    Options(Vec<String>),
    /// `true` or `false`.
    Bool,
    /// A word the pattern matches from its first character.
    Regex(Regex),
    /// One of the strings listed in the active context's data under a key.
    ContextOptions(String),
    /// Any of the child types, tried in order.
    AnyOf(Vec<TokenType>),
}

/// Matcher for one word of a command.
#[derive(Debug, Clone)]
pub struct TokenType {
    name: Option<String>,
    kind: TokenKind,
}

impl TokenType {
    fn from_kind(kind: TokenKind) -> Self {
        Self { name: None, kind }
    }

    pub fn string() -> Self {
        Self::from_kind(TokenKind::String)
    }

    /// Integer with exclusive bounds: `integer(Some(0), Some(10))` accepts 1..=9.
    pub fn integer(min: Option<i64>, max: Option<i64>) -> Self {
        Self::from_kind(TokenKind::Integer { min, max })
    }

    pub fn options<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_kind(TokenKind::Options(
            options.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn boolean() -> Self {
        Self::from_kind(TokenKind::Bool)
    }

    /// Compile a pattern. Matching is anchored at the start of the word only.
    pub fn regex(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})"))?;
        Ok(Self::from_kind(TokenKind::Regex(regex)))
    }

    pub fn context_options(key: &str) -> Self {
        Self::from_kind(TokenKind::ContextOptions(key.to_string()))
    }

    pub fn any_of(types: Vec<TokenType>) -> Self {
        Self::from_kind(TokenKind::AnyOf(types))
    }

    /// Give the type a display name (rendered as `<name>`).
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    /// Whether `word` is an acceptable value.
    pub fn matches(&self, word: &str, ctx: &Context) -> bool {
        match &self.kind {
            TokenKind::String => true,
            TokenKind::Integer { min, max } => match word.parse::<i64>() {
                Ok(v) => min.is_none_or(|m| v > m) && max.is_none_or(|m| v < m),
                Err(_) => false,
            },
            TokenKind::Options(options) => options.iter().any(|o| o == word),
            TokenKind::Bool => BOOL_OPTIONS.contains(&word),
            TokenKind::Regex(re) => re.is_match(word),
            TokenKind::ContextOptions(key) => ctx.data_strings(key).contains(&word),
            TokenKind::AnyOf(types) => types.iter().any(|t| t.matches(word, ctx)),
        }
    }

    /// Whether `word` is acceptable or could still become acceptable.
    ///
    /// Integers and patterns have no prefix relaxation: they partially
    /// match exactly what they match.
    pub fn partial_match(&self, word: &str, ctx: &Context) -> bool {
        match &self.kind {
            TokenKind::String => true,
            TokenKind::Integer { .. } | TokenKind::Regex(_) => self.matches(word, ctx),
            TokenKind::Options(options) => options.iter().any(|o| o.starts_with(word)),
            TokenKind::Bool => BOOL_OPTIONS.iter().any(|o| o.starts_with(word)),
            TokenKind::ContextOptions(key) => {
                ctx.data_strings(key).iter().any(|o| o.starts_with(word))
            },
            TokenKind::AnyOf(types) => types.iter().any(|t| t.partial_match(word, ctx)),
        }
    }

    /// Candidates for `token`, the last (possibly empty) word of `tokens`.
    pub fn complete(&self, token: &str, tokens: &[String], ctx: &Context) -> Vec<Completion> {
        match &self.kind {
            TokenKind::String | TokenKind::Integer { .. } | TokenKind::Regex(_) => Vec::new(),
            TokenKind::Options(options) => prefixed(options.iter().map(String::as_str), token),
            TokenKind::Bool => prefixed(BOOL_OPTIONS.into_iter(), token),
            TokenKind::ContextOptions(key) => prefixed(ctx.data_strings(key).into_iter(), token),
            // Every child contributes, not only the first that has candidates.
            TokenKind::AnyOf(types) => types
                .iter()
                .flat_map(|t| t.complete(token, tokens, ctx))
                .collect(),
        }
    }

    /// Typed value of a word this type matches, `None` if it does not match.
    pub fn convert(&self, word: &str, ctx: &Context) -> Option<Argument> {
        if !self.matches(word, ctx) {
            return None;
        }
        match &self.kind {
            TokenKind::Integer { .. } => word.parse().ok().map(Argument::Integer),
            TokenKind::Bool => Some(Argument::Bool(word == "true")),
            TokenKind::AnyOf(types) => types.iter().find_map(|t| t.convert(word, ctx)),
            _ => Some(Argument::Text(word.to_string())),
        }
    }
}

fn prefixed<'a>(options: impl Iterator<Item = &'a str>, token: &str) -> Vec<Completion> {
    options
        .filter(|o| o.starts_with(token))
        .map(Completion::terminal)
        .collect()
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            return write!(f, "<{name}>");
        }
        match &self.kind {
            TokenKind::String => write!(f, "<string>"),
            TokenKind::Integer { .. } => write!(f, "<integer>"),
            TokenKind::Options(options) => write!(f, "<{}>", options.join("|")),
            TokenKind::Bool => write!(f, "<{}>", BOOL_OPTIONS.join("|")),
            TokenKind::Regex(_) => write!(f, "<regex>"),
            TokenKind::ContextOptions(key) => write!(f, "<{key}>"),
            TokenKind::AnyOf(types) => {
                let parts: Vec<String> = types.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join("|"))
            },
        }
    }
}
