//! Command matching and dispatch engine.
//!
//! Commands are sequences of keywords and typed arguments registered with
//! an `Interpreter`. The interpreter tokenizes input lines, selects the one
//! command matching the words under the current context, and executes it,
//! optionally piping its output through `| include` / `| exclude`.

mod command;
pub mod context;
pub mod filter;
mod interpreter;
pub mod parser;
pub mod types;

/// Everything a command sees while executing.
pub use command::Call;
/// A command the interpreter can match and dispatch.
pub use command::Command;
/// Value returned by a command.
pub use command::CommandOutput;
/// Contexts in which a `TokenCommand` is available.
pub use command::Scope;
/// One keyword or argument position of a `TokenCommand`.
pub use command::Token;
/// Command built from keywords, token types and a handler closure.
pub use command::TokenCommand;
/// Named command scope and the stack of active scopes.
pub use context::{Context, ContextStack};
/// Shared output sink and the filters applied to it.
pub use filter::{FilterFactory, Output, RegexFilterFactory};
/// Line resolution, dispatch, completion and help.
pub use interpreter::Interpreter;
/// Tokenizer contract, the default quoting tokenizer and its words.
pub use parser::{LineParser, ShellParser, Word};
/// Word matchers and the typed values they produce.
pub use types::{Argument, Completion, TokenType};
