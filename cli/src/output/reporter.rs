//! `TerminalReporter`: Presentation-layer implementation of `ProgressReporter`.
//!
//! Wraps `&OutputContext` and implements the `application::ports::ProgressReporter`
//! trait so application services can emit progress events without depending on
//! any presentation type directly.

use std::cell::RefCell;

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// On a TTY each step gets a spinner that is replaced by its outcome. Without
/// a TTY the reporter prints one line per event:
///
/// - `step()` prints `"  → {message}"`
/// - `success()` prints `"  ✓ {message}"`
/// - `skipped()` prints `"  - {message}"`
/// - `warn()` prints `"  ! {message}"`
/// - `failed()` prints `"  ✗ {message}"` to stderr
///
/// Everything except failures is suppressed when `ctx.quiet`.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    active: RefCell<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            active: RefCell::new(None),
        }
    }

    /// Finish the running spinner, or print a plain line when there is none.
    fn finish(&self, prefix: String, message: &str) {
        match self.active.borrow_mut().take() {
            Some(pb) => progress::finish_with(&pb, prefix, message),
            None => println!("  {prefix} {message}"),
        }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        if self.ctx.show_progress() {
            if let Some(previous) = self.active.replace(Some(progress::spinner(message))) {
                previous.finish_and_clear();
            }
        } else {
            println!("  {} {message}", "→".style(self.ctx.styles.info));
        }
    }

    fn success(&self, message: &str) {
        if !self.ctx.quiet {
            self.finish("✓".style(self.ctx.styles.success).to_string(), message);
        }
    }

    fn skipped(&self, message: &str) {
        if !self.ctx.quiet {
            let line = message.style(self.ctx.styles.dim).to_string();
            self.finish("-".style(self.ctx.styles.dim).to_string(), &line);
        }
    }

    fn warn(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        let line = format!("  {} {message}", "!".style(self.ctx.styles.warning));
        match self.active.borrow().as_ref() {
            Some(pb) => pb.println(line),
            None => println!("{line}"),
        }
    }

    fn failed(&self, message: &str) {
        if let Some(pb) = self.active.borrow_mut().take() {
            pb.finish_and_clear();
        }
        eprintln!("  {} {message}", "✗".style(self.ctx.styles.error));
    }
}
