//! Command trait and the token-sequence command implementation.

use std::fmt;
use std::sync::atomic::Ordering;

use shellkit_types::error::{Result, ShellError};

use crate::context::Context;
use crate::filter::Output;
use crate::interpreter::Interpreter;
use crate::types::{Argument, Completion, TokenType};

/// Value returned by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Command produced no value.
    None,
    /// Plain text.
    Text(String),
    /// The user interrupted the command.
    Aborted,
}

/// Everything a command sees while it executes.
pub struct Call<'a> {
    /// Normalized words of the command part of the line.
    pub tokens: &'a [String],
    pub interpreter: &'a mut Interpreter,
    pub cmd_id: Option<&'a str>,
}

impl Call<'_> {
    /// Current output sink, filtered if the line had a filter clause.
    pub fn output(&self) -> Output {
        self.interpreter.output()
    }

    /// Fail with [`ShellError::Interrupted`] if an interruption was requested.
    ///
    /// Long-running commands call this between units of work.
    pub fn checkpoint(&self) -> Result<()> {
        if self
            .interpreter
            .interrupt_handle()
            .swap(false, Ordering::SeqCst)
        {
            return Err(ShellError::Interrupted);
        }
        Ok(())
    }
}

/// A command the interpreter can match and dispatch.
///
/// The interpreter only talks to commands through this trait.
pub trait Command {
    /// Identifier passed back to the command on execution.
    fn cmd_id(&self) -> Option<&str> {
        None
    }

    /// Usage line (e.g. "show user <name>").
    fn usage(&self) -> String;

    /// Help text for listings.
    fn help(&self) -> &str {
        ""
    }

    /// Whether the command is available in `ctx`.
    fn context_match(&self, ctx: &Context) -> bool;

    /// Every word matches its definition exactly.
    fn perfect_match(&self, tokens: &[String], ctx: &Context) -> bool;

    /// Every word matches, allowing abbreviated keywords.
    fn matches(&self, tokens: &[String], ctx: &Context) -> bool;

    /// The words typed so far can still grow into this command.
    fn partial_match(&self, tokens: &[String], ctx: &Context) -> bool;

    /// Candidates for the last word of `tokens`.
    fn complete(&self, tokens: &[String], ctx: &Context) -> Vec<Completion>;

    /// Words with abbreviations expanded.
    fn normalize_tokens(&self, tokens: &[String], ctx: &Context) -> Vec<String>;

    /// Typed arguments extracted from normalized words.
    fn arguments(&self, tokens: &[String], ctx: &Context) -> Result<Vec<Argument>>;

    fn execute(&self, args: &[Argument], call: &mut Call<'_>) -> Result<CommandOutput>;
}

/// One position of a command definition.
#[derive(Debug, Clone)]
pub enum Token {
    /// Literal word; may be abbreviated to any non-empty prefix.
    Keyword(String),
    /// Value checked by a token type and passed to the handler.
    Arg(TokenType),
}

impl From<&str> for Token {
    fn from(keyword: &str) -> Self {
        Token::Keyword(keyword.to_string())
    }
}

impl From<TokenType> for Token {
    fn from(t: TokenType) -> Self {
        Token::Arg(t)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(k) => write!(f, "{k}"),
            Token::Arg(t) => write!(f, "{t}"),
        }
    }
}

/// Strictness of a word comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strictness {
    /// Keywords must be spelled out.
    Exact,
    /// Keywords may be abbreviated.
    Prefix,
    /// The word is still being typed.
    Partial,
}

impl Token {
    fn accepts(&self, word: &str, ctx: &Context, strictness: Strictness) -> bool {
        match (self, strictness) {
            (Token::Keyword(k), Strictness::Exact) => k == word,
            (Token::Keyword(k), Strictness::Prefix) => !word.is_empty() && k.starts_with(word),
            (Token::Keyword(k), Strictness::Partial) => k.starts_with(word),
            (Token::Arg(t), Strictness::Partial) => t.partial_match(word, ctx),
            (Token::Arg(t), _) => t.matches(word, ctx),
        }
    }
}

/// Contexts in which a command is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Only the default (bottom) context.
    Default,
    /// Only contexts with this name.
    Named(String),
    /// Every context.
    Everywhere,
}

type Handler = Box<dyn Fn(&[Argument], &mut Call<'_>) -> Result<CommandOutput>>;

/// Command defined by a sequence of keywords and typed arguments.
pub struct TokenCommand {
    definition: Vec<Token>,
    handler: Handler,
    help: String,
    scope: Scope,
    cmd_id: Option<String>,
    /// The last definition token repeats for any extra words.
    variadic: bool,
}

impl TokenCommand {
    /// Command matching `definition`, run by `handler` with the typed arguments.
    pub fn new<F>(definition: Vec<Token>, handler: F) -> Self
    where
        F: Fn(&[Argument], &mut Call<'_>) -> Result<CommandOutput> + 'static,
    {
        Self {
            definition,
            handler: Box::new(handler),
            help: String::new(),
            scope: Scope::Default,
            cmd_id: None,
            variadic: false,
        }
    }

    /// Attach the text shown in help listings.
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = help.to_string();
        self
    }

    /// Attach the id passed back on execution and returned by `parse`.
    pub fn with_id(mut self, cmd_id: &str) -> Self {
        self.cmd_id = Some(cmd_id.to_string());
        self
    }

    /// Make the command available only in contexts named `name`.
    pub fn in_context(mut self, name: &str) -> Self {
        self.scope = Scope::Named(name.to_string());
        self
    }

    /// Make the command available in every context.
    pub fn everywhere(mut self) -> Self {
        self.scope = Scope::Everywhere;
        self
    }

    /// Let the last definition token absorb any number of trailing words.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Contexts the command is available in.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Definition token for the word at `index`.
    fn token_at(&self, index: usize) -> Option<&Token> {
        match self.definition.get(index) {
            Some(token) => Some(token),
            None if self.variadic => self.definition.last(),
            None => None,
        }
    }

    /// Whether `count` complete words fill the definition.
    fn complete_length(&self, count: usize) -> bool {
        if self.variadic {
            count >= self.definition.len()
        } else {
            count == self.definition.len()
        }
    }

    fn full_match(&self, tokens: &[String], ctx: &Context, strictness: Strictness) -> bool {
        self.context_match(ctx)
            && self.complete_length(tokens.len())
            && tokens.iter().enumerate().all(|(i, word)| {
                self.token_at(i)
                    .is_some_and(|t| t.accepts(word, ctx, strictness))
            })
    }
}

impl Command for TokenCommand {
    fn cmd_id(&self) -> Option<&str> {
        self.cmd_id.as_deref()
    }

    fn usage(&self) -> String {
        let mut parts: Vec<String> = self.definition.iter().map(ToString::to_string).collect();
        if self.variadic
            && let Some(last) = parts.last_mut()
        {
            last.push_str("...");
        }
        parts.join(" ")
    }

    fn help(&self) -> &str {
        &self.help
    }

    fn context_match(&self, ctx: &Context) -> bool {
        match &self.scope {
            Scope::Default => ctx.is_default(),
            Scope::Named(name) => ctx.has_name(name),
            Scope::Everywhere => true,
        }
    }

    fn perfect_match(&self, tokens: &[String], ctx: &Context) -> bool {
        self.full_match(tokens, ctx, Strictness::Exact)
    }

    fn matches(&self, tokens: &[String], ctx: &Context) -> bool {
        self.full_match(tokens, ctx, Strictness::Prefix)
    }

    fn partial_match(&self, tokens: &[String], ctx: &Context) -> bool {
        if !self.context_match(ctx) {
            return false;
        }
        let Some((last, done)) = tokens.split_last() else {
            return true;
        };
        done.iter().enumerate().all(|(i, word)| {
            self.token_at(i)
                .is_some_and(|t| t.accepts(word, ctx, Strictness::Prefix))
        }) && self
            .token_at(done.len())
            .is_some_and(|t| t.accepts(last, ctx, Strictness::Partial))
    }

    fn complete(&self, tokens: &[String], ctx: &Context) -> Vec<Completion> {
        if !self.partial_match(tokens, ctx) {
            return Vec::new();
        }
        let (last, index) = match tokens.split_last() {
            Some((last, done)) => (last.as_str(), done.len()),
            None => ("", 0),
        };
        match self.token_at(index) {
            Some(Token::Keyword(k)) if k.starts_with(last) => vec![Completion::terminal(k)],
            Some(Token::Arg(t)) => t.complete(last, tokens, ctx),
            _ => Vec::new(),
        }
    }

    fn normalize_tokens(&self, tokens: &[String], _ctx: &Context) -> Vec<String> {
        tokens
            .iter()
            .enumerate()
            .map(|(i, word)| match self.token_at(i) {
                Some(Token::Keyword(k)) if k.starts_with(word.as_str()) => k.clone(),
                _ => word.clone(),
            })
            .collect()
    }

    fn arguments(&self, tokens: &[String], ctx: &Context) -> Result<Vec<Argument>> {
        let mut args = Vec::new();
        for (i, word) in tokens.iter().enumerate() {
            if let Some(Token::Arg(t)) = self.token_at(i) {
                let arg = t.convert(word, ctx).ok_or_else(|| {
                    ShellError::Command(format!("invalid value '{word}' for {t}"))
                })?;
                args.push(arg);
            }
        }
        Ok(args)
    }

    fn execute(&self, args: &[Argument], call: &mut Call<'_>) -> Result<CommandOutput> {
        (self.handler)(args, call)
    }
}
