//! Demo command set for the shellkit front-end.

use shellkit_terminal::{CommandOutput, Interpreter, TokenCommand, TokenType};
use shellkit_types::error::{Result, ShellError};

/// Context entered by `configure`.
pub const CONFIGURE_CONTEXT: &str = "configure";

/// Context data key listing the hosts declared with `host`.
const HOSTS_KEY: &str = "hosts";

/// Exclusive upper bound for `count`.
const MAX_COUNT: i64 = 1000;

/// Register the demo commands into an interpreter.
pub fn register_builtins(interp: &mut Interpreter) -> Result<()> {
    interp.add_command(
        TokenCommand::new(vec!["show".into(), "version".into()], |_, _| {
            Ok(CommandOutput::Text(format!(
                "shellkit {}",
                env!("CARGO_PKG_VERSION")
            )))
        })
        .with_help("Show the shellkit version")
        .with_id("show-version")
        .everywhere(),
    );

    interp.add_command(
        TokenCommand::new(vec!["show".into(), "contexts".into()], |_, call| {
            let out = call.output();
            for (depth, name) in call.interpreter.contexts().names().iter().enumerate() {
                out.write_line(&format!("{depth}: {name}"))?;
            }
            Ok(CommandOutput::None)
        })
        .with_help("List the active contexts, innermost last")
        .with_id("show-contexts")
        .everywhere(),
    );

    interp.add_command(
        TokenCommand::new(
            vec!["echo".into(), TokenType::string().named("text").into()],
            |args, call| {
                let words: Vec<String> = args.iter().map(ToString::to_string).collect();
                call.output().write_line(&words.join(" "))?;
                Ok(CommandOutput::None)
            },
        )
        .variadic()
        .with_help("Print the given words")
        .everywhere(),
    );

    interp.add_command(
        TokenCommand::new(
            vec![
                "count".into(),
                TokenType::integer(Some(0), Some(MAX_COUNT)).named("n").into(),
            ],
            |args, call| {
                let n = args.first().and_then(|a| a.as_int()).unwrap_or(0);
                let out = call.output();
                for i in 1..=n {
                    call.checkpoint()?;
                    out.write_line(&format!("line {i}"))?;
                }
                Ok(CommandOutput::None)
            },
        )
        .with_help("Print n numbered lines (1-999)"),
    );

    interp.add_command(
        TokenCommand::new(
            vec![
                "set".into(),
                "prompt".into(),
                TokenType::string().named("prompt").into(),
            ],
            |args, call| {
                let prompt = args.first().and_then(|a| a.as_str()).unwrap_or_default();
                call.interpreter.set_prompt(prompt);
                Ok(CommandOutput::None)
            },
        )
        .with_help("Change the prompt of the current context")
        .everywhere(),
    );

    interp.add_command(
        TokenCommand::new(
            vec!["set".into(), "verbose".into(), TokenType::boolean().into()],
            |args, _| {
                let verbose = args.first().and_then(|a| a.as_bool()).unwrap_or(false);
                // The configured filter still applies below the ceiling.
                let ceiling = if verbose {
                    log::LevelFilter::Trace
                } else {
                    log::LevelFilter::Warn
                };
                log::set_max_level(ceiling);
                Ok(CommandOutput::Text(format!("log ceiling: {ceiling}")))
            },
        )
        .with_help("Toggle informational logging"),
    );

    interp.add_command(
        TokenCommand::new(
            vec!["configure".into(), TokenType::string().named("name").into()],
            |args, call| {
                let name = args.first().map(ToString::to_string).unwrap_or_default();
                call.interpreter
                    .push_context(CONFIGURE_CONTEXT, Some(&format!("{name}(config)> ")));
                call.interpreter
                    .current_context_mut()
                    .data
                    .insert(HOSTS_KEY.to_string(), serde_json::json!([]));
                Ok(CommandOutput::None)
            },
        )
        .with_help("Enter configuration mode")
        .with_id("configure"),
    );

    interp.add_command(
        TokenCommand::new(
            vec![
                "host".into(),
                TokenType::regex(r"[a-z][a-z0-9-]*$")?.named("hostname").into(),
            ],
            |args, call| {
                let host = args.first().map(ToString::to_string).unwrap_or_default();
                let hosts = call
                    .interpreter
                    .current_context_mut()
                    .data
                    .entry(HOSTS_KEY.to_string())
                    .or_insert_with(|| serde_json::json!([]));
                if let Some(list) = hosts.as_array_mut() {
                    list.push(serde_json::Value::String(host.clone()));
                }
                Ok(CommandOutput::Text(format!("host {host} added")))
            },
        )
        .with_help("Declare a host")
        .in_context(CONFIGURE_CONTEXT),
    );

    interp.add_command(
        TokenCommand::new(
            vec![
                "use".into(),
                TokenType::any_of(vec![
                    TokenType::context_options(HOSTS_KEY),
                    TokenType::integer(Some(0), None).named("index"),
                ])
                .named("host|index")
                .into(),
            ],
            |args, call| {
                let ctx = call.interpreter.current_context();
                let hosts = ctx.data_strings(HOSTS_KEY);
                let chosen = match args.first() {
                    Some(arg) => match arg.as_int() {
                        Some(i) => usize::try_from(i - 1)
                            .ok()
                            .and_then(|i| hosts.get(i).copied())
                            .ok_or_else(|| ShellError::Command(format!("no host #{i}")))?
                            .to_string(),
                        None => arg.to_string(),
                    },
                    None => return Err(ShellError::Command("missing host".to_string())),
                };
                Ok(CommandOutput::Text(format!("using {chosen}")))
            },
        )
        .with_help("Select a declared host by name or 1-based index")
        .in_context(CONFIGURE_CONTEXT),
    );

    interp.add_command(
        TokenCommand::new(vec!["exit".into()], |_, call| {
            if call.interpreter.current_context().is_default() {
                return call.interpreter.exit();
            }
            call.interpreter.pop_context()?;
            Ok(CommandOutput::None)
        })
        .with_help("Leave the current context, or the shell")
        .everywhere(),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Capture(Rc<RefCell<Vec<u8>>>);

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn shell() -> (Interpreter, Capture) {
        let cap = Capture::default();
        let mut interp = Interpreter::new()
            .with_prompt("> ")
            .with_output(cap.clone());
        register_builtins(&mut interp).unwrap();
        (interp, cap)
    }

    #[test]
    fn show_version() {
        let (mut interp, _) = shell();
        match interp.eval("sh ver").unwrap() {
            Some(CommandOutput::Text(s)) => assert!(s.starts_with("shellkit ")),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn echo_is_variadic() {
        let (mut interp, cap) = shell();
        interp.eval("echo hello 'big world'").unwrap();
        assert_eq!(cap.text(), "hello big world\n");
    }

    #[test]
    fn count_with_filter() {
        let (mut interp, cap) = shell();
        interp.eval("count 12 | include 1$").unwrap();
        assert_eq!(cap.text(), "line 1\nline 11\n");
    }

    #[test]
    fn count_bounds_are_exclusive() {
        let (mut interp, _) = shell();
        assert!(interp.eval("count 0").is_err());
        assert!(interp.eval("count 1000").is_err());
        assert!(interp.eval("count 999 | include ^$").is_ok());
    }

    #[test]
    fn configure_session() {
        let (mut interp, _) = shell();
        assert!(interp.eval("host web-1").is_err());
        interp.eval("conf lab").unwrap();
        assert_eq!(interp.prompt(), "lab(config)> ");
        interp.eval("host web-1").unwrap();
        interp.eval("host db").unwrap();
        assert!(interp.eval("host 9bad").is_err());
        assert_eq!(
            interp.eval("use db").unwrap(),
            Some(CommandOutput::Text("using db".into()))
        );
        assert_eq!(
            interp.eval("use 1").unwrap(),
            Some(CommandOutput::Text("using web-1".into()))
        );
        assert!(interp.eval("use 5").is_err());
        assert!(interp.eval("use nothere").is_err());
        interp.eval("exit").unwrap();
        assert_eq!(interp.prompt(), "> ");
        assert!(matches!(interp.eval("exit"), Err(ShellError::EndOfProgram)));
    }

    #[test]
    fn host_completion_from_context_data() {
        let (mut interp, _) = shell();
        interp.eval("configure lab").unwrap();
        interp.eval("host alpha").unwrap();
        interp.eval("host alpine").unwrap();
        let got = interp.complete("use al").unwrap();
        assert!(got.contains("alpha "));
        assert!(got.contains("alpine "));
    }

    #[test]
    fn set_prompt_in_current_context() {
        let (mut interp, _) = shell();
        interp.eval("set prompt 'lab# '").unwrap();
        assert_eq!(interp.prompt(), "lab# ");
    }

    #[test]
    fn incomplete_lines_do_not_match() {
        let (mut interp, _) = shell();
        assert!(matches!(
            interp.eval("set p"),
            Err(ShellError::NoMatchingCommand(_))
        ));
        assert!(matches!(
            interp.eval("s"),
            Err(ShellError::NoMatchingCommand(_))
        ));
    }

    #[test]
    fn show_contexts_lists_stack() {
        let (mut interp, cap) = shell();
        interp.eval("configure lab").unwrap();
        interp.eval("show contexts").unwrap();
        assert_eq!(cap.text(), "0: Default\n1: configure\n");
    }

    #[test]
    fn help_for_prefix() {
        let (interp, _) = shell();
        let help = interp.help("s").unwrap();
        let usages: Vec<&str> = help.iter().map(|(u, _)| u.as_str()).collect();
        assert!(usages.contains(&"show version"));
        assert!(usages.contains(&"set verbose <true|false>"));
        assert!(!usages.contains(&"host <hostname>"));
    }
}
