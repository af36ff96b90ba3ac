//! Line resolution and dispatch.
//!
//! A line is tokenized, split from its filter clause, matched against the
//! registered commands eligible in the current context, and the single
//! best match is executed. Matching runs in two phases: commands whose
//! words all match exactly win first; only if that does not single out one
//! command are abbreviated keywords considered.

use std::collections::BTreeSet;
use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use shellkit_types::config::ShellConfig;
use shellkit_types::error::{Result, ShellError};

use crate::command::{Call, Command, CommandOutput};
use crate::context::{Context, ContextStack};
use crate::filter::{FilterFactory, Output, RedirectGuard, RegexFilterFactory};
use crate::parser::{FILTER_KEYWORDS, FilterClause, LineParser, ShellParser, Word, split_filter};
use crate::types::Argument;

/// A line resolved to a single command.
struct Resolved {
    tokens: Vec<String>,
    filter: Option<FilterClause>,
    command: Rc<dyn Command>,
}

/// Matches lines against registered commands and executes them.
pub struct Interpreter {
    commands: Vec<Rc<dyn Command>>,
    parser: Box<dyn LineParser>,
    filter_factory: Box<dyn FilterFactory>,
    contexts: ContextStack,
    output: Output,
    interrupted: Arc<AtomicBool>,
}

impl Interpreter {
    /// Interpreter writing to stdout with an empty prompt.
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            parser: Box::new(ShellParser),
            filter_factory: Box::new(RegexFilterFactory::default()),
            contexts: ContextStack::new(""),
            output: Output::stdout(),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Interpreter set up from a loaded config: prompt and filter case.
    pub fn from_config(config: &ShellConfig) -> Self {
        Self::new()
            .with_prompt(&config.prompt)
            .with_filter_factory(RegexFilterFactory {
                case_insensitive: config.filter.case_insensitive,
            })
    }

    /// Send command output to `sink` instead of stdout.
    pub fn with_output(mut self, sink: impl Write + 'static) -> Self {
        self.output = Output::new(sink);
        self
    }

    /// Replace the default quoting tokenizer.
    pub fn with_parser(mut self, parser: impl LineParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Replace the factory building `| include` / `| exclude` filters.
    pub fn with_filter_factory(mut self, factory: impl FilterFactory + 'static) -> Self {
        self.filter_factory = Box::new(factory);
        self
    }

    /// Set the prompt of the default context.
    pub fn with_prompt(mut self, prompt: &str) -> Self {
        self.contexts = ContextStack::new(prompt);
        self
    }

    /// Register a command. Registration order is kept.
    pub fn add_command(&mut self, command: impl Command + 'static) {
        log::debug!("registered command: {}", command.usage());
        self.commands.push(Rc::new(command));
    }

    // -- Contexts --

    /// Enter context `name`. Its prompt defaults to the name.
    pub fn push_context(&mut self, name: &str, prompt: Option<&str>) {
        self.contexts.push(name, prompt);
    }

    /// Leave the current context. Fails on the default context.
    pub fn pop_context(&mut self) -> Result<()> {
        self.contexts.pop().map(|_| ())
    }

    /// The active (top) context.
    pub fn current_context(&self) -> &Context {
        self.contexts.current()
    }

    /// Mutable access to the active context, e.g. for its data.
    pub fn current_context_mut(&mut self) -> &mut Context {
        self.contexts.current_mut()
    }

    /// The whole context stack, default context first.
    pub fn contexts(&self) -> &ContextStack {
        &self.contexts
    }

    /// Prompt of the active context.
    pub fn prompt(&self) -> &str {
        &self.contexts.current().prompt
    }

    /// Change the prompt of the active context.
    pub fn set_prompt(&mut self, prompt: &str) {
        self.contexts.current_mut().prompt = prompt.to_string();
    }

    /// Current output sink.
    pub fn output(&self) -> Output {
        self.output.clone()
    }

    /// Flag a front-end sets to interrupt the running command.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    /// Request the end of the program.
    pub fn exit(&self) -> Result<CommandOutput> {
        Err(ShellError::EndOfProgram)
    }

    // -- Evaluation --

    /// Resolve and execute a line.
    ///
    /// Blank lines yield `Ok(None)`. An interrupted command yields
    /// `Ok(Some(CommandOutput::Aborted))`.
    pub fn eval(&mut self, line: &str) -> Result<Option<CommandOutput>> {
        let Some(resolved) = self.resolve(line)? else {
            return Ok(None);
        };
        let ctx = self.contexts.current();
        let tokens = resolved.command.normalize_tokens(&resolved.tokens, ctx);
        let args = resolved.command.arguments(&tokens, ctx)?;

        let _guard = match &resolved.filter {
            Some(clause) => {
                let factory = &self.filter_factory;
                Some(RedirectGuard::install(&self.output, |sink| {
                    factory.create_filter(clause, sink)
                })?)
            },
            None => None,
        };
        self.execute(&resolved.command, &args, &tokens).map(Some)
    }

    /// Evaluate lines in order, stopping at the first error.
    pub fn eval_multiple<I, S>(&mut self, lines: I) -> Result<Vec<Option<CommandOutput>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines
            .into_iter()
            .map(|line| self.eval(line.as_ref()))
            .collect()
    }

    /// Resolve a line without executing it, returning the command's id.
    pub fn parse(&self, line: &str) -> Result<Option<String>> {
        Ok(self
            .resolve(line)?
            .and_then(|r| r.command.cmd_id().map(str::to_string)))
    }

    fn execute(
        &mut self,
        command: &Rc<dyn Command>,
        args: &[Argument],
        tokens: &[String],
    ) -> Result<CommandOutput> {
        self.interrupted.store(false, Ordering::SeqCst);
        let cmd_id = command.cmd_id().map(str::to_string);
        let mut call = Call {
            tokens,
            interpreter: self,
            cmd_id: cmd_id.as_deref(),
        };
        match command.execute(args, &mut call) {
            Err(ShellError::Interrupted) => {
                log::info!("command aborted: {}", command.usage());
                Ok(CommandOutput::Aborted)
            },
            other => other,
        }
    }

    fn resolve(&self, line: &str) -> Result<Option<Resolved>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let split = split_filter(self.parser.parse(trimmed)?)?;
        let filter = if split.separator {
            Some(FilterClause::from_tokens(&split.filter)?)
        } else {
            None
        };
        let command = self.matching_command(&split.command, line)?;
        Ok(Some(Resolved {
            tokens: split.command,
            filter,
            command,
        }))
    }

    fn matching_command(&self, tokens: &[String], line: &str) -> Result<Rc<dyn Command>> {
        let ctx = self.contexts.current();

        let perfect: Vec<&Rc<dyn Command>> = self
            .active_commands()
            .filter(|c| c.perfect_match(tokens, ctx))
            .collect();
        if let [command] = perfect.as_slice() {
            log::debug!("perfect match: {}", command.usage());
            return Ok(Rc::clone(command));
        }

        let matching: Vec<&Rc<dyn Command>> = self
            .active_commands()
            .filter(|c| c.matches(tokens, ctx))
            .collect();
        match matching.as_slice() {
            [command] => {
                log::debug!("match: {}", command.usage());
                Ok(Rc::clone(command))
            },
            [] => {
                log::warn!("no command matches '{}'", line.trim());
                Err(ShellError::NoMatchingCommand(line.to_string()))
            },
            candidates => {
                let usages: Vec<String> = candidates.iter().map(|c| c.usage()).collect();
                log::warn!("ambiguous command '{}': {}", line.trim(), usages.join(", "));
                Err(ShellError::AmbiguousCommand(usages))
            },
        }
    }

    /// Commands available in the current context, in registration order.
    fn active_commands(&self) -> impl Iterator<Item = &Rc<dyn Command>> {
        let ctx = self.contexts.current();
        self.commands.iter().filter(move |c| c.context_match(ctx))
    }

    fn partial_matches(&self, tokens: &[String]) -> Vec<&Rc<dyn Command>> {
        let ctx = self.contexts.current();
        self.active_commands()
            .filter(|c| c.partial_match(tokens, ctx))
            .collect()
    }

    // -- Completion and help --

    /// Suggestions for the word being typed at the end of `line`.
    ///
    /// Terminal candidates carry a trailing space. A line that does not
    /// tokenize yet, such as one with an open quote, has no candidates.
    pub fn complete(&self, line: &str) -> Result<BTreeSet<String>> {
        let mut words = match self.parser.parse(line) {
            Ok(words) => words,
            Err(e) => {
                log::debug!("nothing to complete in '{line}': {e}");
                return Ok(BTreeSet::new());
            },
        };
        if line.is_empty() || line.ends_with(char::is_whitespace) {
            words.push(Word::default());
        }
        let split = split_filter(words)?;

        if split.separator {
            return Ok(match split.filter.as_slice() {
                [] => BTreeSet::from([" ".to_string()]),
                [keyword] => FILTER_KEYWORDS
                    .iter()
                    .filter(|k| k.starts_with(keyword.as_str()))
                    .map(|k| k.to_string())
                    .collect(),
                // Pattern completion is not supported.
                _ => BTreeSet::new(),
            });
        }

        let ctx = self.contexts.current();
        let mut completions = BTreeSet::new();
        for command in self.partial_matches(&split.command) {
            for c in command.complete(&split.command, ctx) {
                if c.terminal {
                    completions.insert(format!("{} ", c.word));
                } else {
                    completions.insert(c.word);
                }
            }
        }
        Ok(completions)
    }

    /// `(usage, help)` for every command the words of `line` could grow
    /// into, one entry per command in registration order.
    pub fn help(&self, line: &str) -> Result<Vec<(String, String)>> {
        let split = split_filter(self.parser.parse(line)?)?;
        Ok(self
            .partial_matches(&split.command)
            .into_iter()
            .map(|c| help_entry(c.as_ref()))
            .collect())
    }

    /// `(usage, help)` for every registered command regardless of context,
    /// in registration order.
    pub fn all_commands_help(&self) -> Vec<(String, String)> {
        self.commands.iter().map(|c| help_entry(c.as_ref())).collect()
    }
}

fn help_entry(command: &dyn Command) -> (String, String) {
    (command.usage(), command.help().to_string())
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
