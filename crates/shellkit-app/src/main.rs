//! shellkit demo front-end.
//!
//! Reads lines from stdin and evaluates them with a `shellkit_terminal`
//! interpreter. A line ending in `?` lists help for what has been typed so
//! far; a line ending in a tab lists completions.

mod commands;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;

use shellkit_terminal::{CommandOutput, Interpreter};
use shellkit_types::config::ShellConfig;
use shellkit_types::error::ShellError;

/// Environment variable naming the config file.
const CONFIG_ENV: &str = "SHELLKIT_CONFIG";

fn main() -> Result<()> {
    let config = load_config()?;
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter.as_str()),
    )
    .init();
    log::info!("shellkit {} starting", env!("CARGO_PKG_VERSION"));

    let mut interp = Interpreter::from_config(&config);
    commands::register_builtins(&mut interp)?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}", interp.prompt());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line?;

        if let Some(prefix) = line.strip_suffix('?') {
            print_help(&interp, prefix);
            continue;
        }
        if let Some(prefix) = line.strip_suffix('\t') {
            print_completions(&interp, prefix);
            continue;
        }

        match interp.eval(&line) {
            Ok(Some(CommandOutput::Text(text))) => println!("{text}"),
            Ok(Some(CommandOutput::Aborted)) => println!("aborted"),
            Ok(_) => {},
            Err(ShellError::EndOfProgram) => break,
            Err(e) => eprintln!("% {e}"),
        }
    }

    log::info!("shellkit exiting");
    Ok(())
}

/// Load the config named by the first argument or `SHELLKIT_CONFIG`,
/// falling back to defaults when neither is given.
fn load_config() -> Result<ShellConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .map(PathBuf::from);
    let config = match path {
        Some(path) => ShellConfig::load(&path)?,
        None => ShellConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn print_help(interp: &Interpreter, prefix: &str) {
    match interp.help(prefix) {
        Ok(help) if help.is_empty() => eprintln!("% no matching commands"),
        Ok(help) => {
            let width = help.iter().map(|(usage, _)| usage.len()).max().unwrap_or(0);
            for (usage, text) in &help {
                println!("  {usage:<width$}  {text}");
            }
        },
        Err(e) => eprintln!("% {e}"),
    }
}

fn print_completions(interp: &Interpreter, prefix: &str) {
    match interp.complete(prefix) {
        Ok(candidates) => {
            let words: Vec<&str> = candidates.iter().map(|c| c.trim_end()).collect();
            println!("{}", words.join("  "));
        },
        Err(e) => eprintln!("% {e}"),
    }
}
