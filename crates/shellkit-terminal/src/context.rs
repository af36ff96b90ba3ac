//! Command contexts and the context stack.
//!
//! The active (top) context decides which commands are eligible for
//! matching. The bottom of the stack is the default context and is never
//! removed.

use std::collections::HashMap;
use std::fmt;

use shellkit_types::error::{Result, ShellError};

/// Name of the context at the bottom of every stack.
pub const DEFAULT_CONTEXT: &str = "Default";

/// A named command scope.
#[derive(Debug, Clone)]
pub struct Context {
    name: String,
    /// Prompt displayed while this context is active.
    pub prompt: String,
    /// Free-form data owned by command implementations.
    pub data: HashMap<String, serde_json::Value>,
    default: bool,
}

impl Context {
    /// Create a context. The prompt defaults to the context name.
    pub fn new(name: &str, prompt: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            prompt: prompt.unwrap_or(name).to_string(),
            data: HashMap::new(),
            default: false,
        }
    }

    fn default_context(prompt: &str) -> Self {
        Self {
            name: DEFAULT_CONTEXT.to_string(),
            prompt: prompt.to_string(),
            data: HashMap::new(),
            default: true,
        }
    }

    /// Name the context was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is the bottom context of a stack.
    pub fn is_default(&self) -> bool {
        self.default
    }

    /// Whether the context is named `name`.
    pub fn has_name(&self, name: &str) -> bool {
        self.name == name
    }

    /// String members of an array stored under `key`.
    ///
    /// Missing keys and non-array values yield an empty list.
    pub fn data_strings(&self, key: &str) -> Vec<&str> {
        match self.data.get(key) {
            Some(serde_json::Value::Array(items)) => {
                items.iter().filter_map(|v| v.as_str()).collect()
            },
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context:{}", self.name)
    }
}

/// Stack of contexts, never empty.
#[derive(Debug, Clone)]
pub struct ContextStack {
    stack: Vec<Context>,
}

impl ContextStack {
    /// Create a stack holding only the default context.
    pub fn new(prompt: &str) -> Self {
        Self {
            stack: vec![Context::default_context(prompt)],
        }
    }

    /// Enter a new context.
    pub fn push(&mut self, name: &str, prompt: Option<&str>) {
        log::info!("entering context {name}");
        self.stack.push(Context::new(name, prompt));
    }

    /// Leave the current context.
    ///
    /// Fails with [`ShellError::ContextUnderflow`] when only the default
    /// context remains.
    pub fn pop(&mut self) -> Result<Context> {
        if self.stack.len() == 1 {
            return Err(ShellError::ContextUnderflow);
        }
        let ctx = self.stack.pop().ok_or(ShellError::ContextUnderflow)?;
        log::info!("leaving context {}", ctx.name());
        Ok(ctx)
    }

    /// The top context.
    pub fn current(&self) -> &Context {
        // The default context is never popped.
        &self.stack[self.stack.len() - 1]
    }

    /// Mutable access to the top context.
    pub fn current_mut(&mut self) -> &mut Context {
        let top = self.stack.len() - 1;
        &mut self.stack[top]
    }

    /// Number of contexts, including the default one.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Context names from bottom to top.
    pub fn names(&self) -> Vec<&str> {
        self.stack.iter().map(Context::name).collect()
    }
}
