//! Output sinks and `| include` / `| exclude` line filters.
//!
//! Commands write to the interpreter's [`Output`]. While a filtered line
//! runs, a [`RedirectGuard`] puts a line filter in front of the original
//! sink and puts the original back when it is dropped.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use regex::{Regex, RegexBuilder};

use shellkit_types::error::Result;

use crate::parser::FilterClause;

/// Shared handle to the current output sink.
///
/// Cloning the handle does not clone the sink: every clone writes to
/// whatever sink is installed at the time of the write.
#[derive(Clone)]
pub struct Output {
    sink: Rc<RefCell<Box<dyn Write>>>,
}

impl Output {
    /// Handle writing to `sink`.
    pub fn new(sink: impl Write + 'static) -> Self {
        Self::from_boxed(Box::new(sink))
    }

    /// Handle writing to the process stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    fn from_boxed(sink: Box<dyn Write>) -> Self {
        Self {
            sink: Rc::new(RefCell::new(sink)),
        }
    }

    /// Install `sink`, returning the previous one.
    fn replace(&self, sink: Box<dyn Write>) -> Box<dyn Write> {
        std::mem::replace(&mut *self.sink.borrow_mut(), sink)
    }

    /// Remove the installed sink, leaving a discarding one behind.
    fn take(&self) -> Box<dyn Write> {
        self.replace(Box::new(io::sink()))
    }

    /// Write one line followed by a newline.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut sink = self.sink.borrow_mut();
        sink.write_all(line.as_bytes())?;
        sink.write_all(b"\n")
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.borrow_mut().flush()
    }
}

/// Builds the sink used for a filter clause.
pub trait FilterFactory {
    /// Sink that forwards to `sink` only the lines matching `pattern`.
    fn create_include_filter(&self, pattern: &str, sink: Output) -> Result<Box<dyn Write>>;

    /// Sink that forwards to `sink` only the lines not matching `pattern`.
    fn create_exclude_filter(&self, pattern: &str, sink: Output) -> Result<Box<dyn Write>>;

    fn create_filter(&self, clause: &FilterClause, sink: Output) -> Result<Box<dyn Write>> {
        match clause {
            FilterClause::Include(pattern) => self.create_include_filter(pattern, sink),
            FilterClause::Exclude(pattern) => self.create_exclude_filter(pattern, sink),
        }
    }
}

/// Filters whose patterns are regular expressions searched anywhere in a line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexFilterFactory {
    pub case_insensitive: bool,
}

impl RegexFilterFactory {
    fn compile(&self, pattern: &str) -> Result<Regex> {
        Ok(RegexBuilder::new(pattern)
            .case_insensitive(self.case_insensitive)
            .build()?)
    }
}

impl FilterFactory for RegexFilterFactory {
    fn create_include_filter(&self, pattern: &str, sink: Output) -> Result<Box<dyn Write>> {
        Ok(Box::new(LineFilter::new(self.compile(pattern)?, true, sink)))
    }

    fn create_exclude_filter(&self, pattern: &str, sink: Output) -> Result<Box<dyn Write>> {
        Ok(Box::new(LineFilter::new(self.compile(pattern)?, false, sink)))
    }
}

/// Line-buffering writer that forwards lines selected by a regex.
pub struct LineFilter {
    regex: Regex,
    /// Forward matching lines (include) or non-matching lines (exclude).
    keep_matching: bool,
    sink: Output,
    pending: Vec<u8>,
}

impl LineFilter {
    /// Filter forwarding to `sink` the lines whose match result equals `keep_matching`.
    pub fn new(regex: Regex, keep_matching: bool, sink: Output) -> Self {
        Self {
            regex,
            keep_matching,
            sink,
            pending: Vec::new(),
        }
    }

    fn emit(&mut self, line: &[u8]) -> io::Result<()> {
        let text = String::from_utf8_lossy(line);
        let body = text.trim_end_matches(['\n', '\r']);
        if self.regex.is_match(body) == self.keep_matching {
            self.sink.write_all(line)?;
        }
        Ok(())
    }
}

impl Write for LineFilter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line)?;
        }
        Ok(buf.len())
    }

    /// Emits a pending partial line, then flushes the sink.
    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.emit(&line)?;
        }
        self.sink.flush()
    }
}

/// Scoped replacement of an [`Output`]'s sink.
///
/// Dropping the guard flushes the replacement and reinstalls the original
/// sink, whichever way the scope is left.
pub struct RedirectGuard {
    slot: Output,
    original: Output,
}

impl RedirectGuard {
    /// Install the sink built by `make`, which receives a handle to the
    /// original sink. If `make` fails nothing is changed.
    pub fn install<F>(slot: &Output, make: F) -> Result<Self>
    where
        F: FnOnce(Output) -> Result<Box<dyn Write>>,
    {
        let original = Output::from_boxed(slot.take());
        match make(original.clone()) {
            Ok(filter) => {
                slot.replace(filter);
                Ok(Self {
                    slot: slot.clone(),
                    original,
                })
            },
            Err(e) => {
                slot.replace(original.take());
                Err(e)
            },
        }
    }
}

impl Drop for RedirectGuard {
    fn drop(&mut self) {
        if let Err(e) = self.slot.flush() {
            log::warn!("failed to flush filtered output: {e}");
        }
        let filter = self.slot.replace(self.original.take());
        drop(filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellkit_types::error::ShellError;

    /// Sink recording everything written to it.
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

    fn include(pattern: &str, sink: Output) -> Result<Box<dyn Write>> {
        RegexFilterFactory::default().create_include_filter(pattern, sink)
    }

    #[test]
    fn output_write_line() {
        let cap = Capture::default();
        let out = Output::new(cap.clone());
        out.write_line("hello").unwrap();
        assert_eq!(cap.text(), "hello\n");
    }

    #[test]
    fn include_keeps_matching_lines() {
        let cap = Capture::default();
        let mut f = include("eth", Output::new(cap.clone())).unwrap();
        f.write_all(b"eth0 up\nlo up\neth1 down\n").unwrap();
        f.flush().unwrap();
        assert_eq!(cap.text(), "eth0 up\neth1 down\n");
    }

    #[test]
    fn exclude_drops_matching_lines() {
        let cap = Capture::default();
        let mut f = RegexFilterFactory::default()
            .create_exclude_filter("down", Output::new(cap.clone()))
            .unwrap();
        f.write_all(b"eth0 up\neth1 down\n").unwrap();
        f.flush().unwrap();
        assert_eq!(cap.text(), "eth0 up\n");
    }

    #[test]
    fn lines_split_across_writes() {
        let cap = Capture::default();
        let mut f = include("needle", Output::new(cap.clone())).unwrap();
        f.write_all(b"hay nee").unwrap();
        assert_eq!(cap.text(), "");
        f.write_all(b"dle\nhay\n").unwrap();
        assert_eq!(cap.text(), "hay needle\n");
    }

    #[test]
    fn flush_emits_partial_line() {
        let cap = Capture::default();
        let mut f = include("tail", Output::new(cap.clone())).unwrap();
        f.write_all(b"the tail").unwrap();
        f.flush().unwrap();
        assert_eq!(cap.text(), "the tail");
    }

    #[test]
    fn pattern_is_regex() {
        let cap = Capture::default();
        let mut f = include("^v[0-9]+$", Output::new(cap.clone())).unwrap();
        f.write_all(b"v12\nxv1\nv\n").unwrap();
        assert_eq!(cap.text(), "v12\n");
    }

    #[test]
    fn case_insensitive_factory() {
        let cap = Capture::default();
        let factory = RegexFilterFactory {
            case_insensitive: true,
        };
        let mut f = factory
            .create_include_filter("error", Output::new(cap.clone()))
            .unwrap();
        f.write_all(b"ERROR one\nok\n").unwrap();
        assert_eq!(cap.text(), "ERROR one\n");
    }

    #[test]
    fn invalid_pattern_is_error() {
        let cap = Capture::default();
        assert!(matches!(
            include("[", Output::new(cap)),
            Err(ShellError::Regex(_))
        ));
    }

    #[test]
    fn guard_filters_then_restores() {
        let cap = Capture::default();
        let out = Output::new(cap.clone());
        {
            let _guard = RedirectGuard::install(&out, |sink| include("keep", sink)).unwrap();
            out.write_line("keep me").unwrap();
            out.write_line("drop me").unwrap();
        }
        out.write_line("after").unwrap();
        assert_eq!(cap.text(), "keep me\nafter\n");
    }

    #[test]
    fn guard_restores_on_early_error_return() {
        fn run(out: &Output) -> Result<()> {
            let _guard = RedirectGuard::install(out, |sink| include("x", sink))?;
            out.write_line("no match here")?;
            Err(ShellError::Command("boom".into()))
        }
        let cap = Capture::default();
        let out = Output::new(cap.clone());
        assert!(run(&out).is_err());
        out.write_line("visible").unwrap();
        assert_eq!(cap.text(), "visible\n");
    }

    #[test]
    fn guard_restores_on_panic() {
        let cap = Capture::default();
        let out = Output::new(cap.clone());
        let inner = out.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = RedirectGuard::install(&inner, |sink| include("x", sink)).unwrap();
            panic!("command blew up");
        }));
        assert!(result.is_err());
        out.write_line("still here").unwrap();
        assert_eq!(cap.text(), "still here\n");
    }

    #[test]
    fn failed_install_keeps_original() {
        let cap = Capture::default();
        let out = Output::new(cap.clone());
        assert!(RedirectGuard::install(&out, |sink| include("(", sink)).is_err());
        out.write_line("unchanged").unwrap();
        assert_eq!(cap.text(), "unchanged\n");
    }

    #[test]
    fn guard_flushes_pending_partial_line() {
        let cap = Capture::default();
        let mut out = Output::new(cap.clone());
        {
            let _guard = RedirectGuard::install(&out, |sink| include("end", sink)).unwrap();
            write!(out, "the end").unwrap();
        }
        assert_eq!(cap.text(), "the end");
    }
}
