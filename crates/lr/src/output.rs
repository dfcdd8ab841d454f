//! Startup and error lines on the terminal.

use std::fmt::Display;
use std::path::Path;

use console::{StyledObject, Term, style};

/// Writes user-facing lines to stderr, leaving stdout untouched.
pub(crate) struct Output {
    term: Term,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    /// Announce the served URL and root.
    pub(crate) fn serving(&self, url: &str, root: &Path, live_reload: bool) {
        let [address, mode] = serving_lines(url, root, live_reload);
        self.line(style(address).cyan().bold());
        if live_reload {
            self.line(style(mode).dim());
        } else {
            self.line(style(mode).yellow());
        }
    }

    /// Report a fatal error (red).
    pub(crate) fn error(&self, err: &dyn Display) {
        self.line(style(format!("Error: {err}")).red());
    }

    fn line<D: Display>(&self, text: StyledObject<D>) {
        let _ = self.term.write_line(&text.to_string());
    }
}

fn serving_lines(url: &str, root: &Path, live_reload: bool) -> [String; 2] {
    let mode = if live_reload {
        "Live reload on: open pages refresh when files change"
    } else {
        "Live reload off"
    };
    [
        format!("Serving {} at {url}", root.display()),
        mode.to_owned(),
    ]
}
