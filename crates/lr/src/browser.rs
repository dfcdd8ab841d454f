//! Opening the served URL in the default browser.
//!
//! Each host OS has its own launcher command. Launching is best-effort: the
//! server keeps running whether or not a browser appears.

use std::io;
use std::process::{Command, Stdio};

/// Capability to open a URL.
pub(crate) trait UrlOpener {
    /// Open `url`.
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Launcher for Linux and other freedesktop systems (`xdg-open`).
pub(crate) struct XdgOpen;

/// Launcher for macOS (`open`).
pub(crate) struct MacOpen;

/// Launcher for Windows (`cmd /C start`).
pub(crate) struct WindowsStart;

impl UrlOpener for XdgOpen {
    fn open(&self, url: &str) -> io::Result<()> {
        spawn(Command::new("xdg-open").arg(url))
    }
}

impl UrlOpener for MacOpen {
    fn open(&self, url: &str) -> io::Result<()> {
        spawn(Command::new("open").arg(url))
    }
}

impl UrlOpener for WindowsStart {
    fn open(&self, url: &str) -> io::Result<()> {
        // The empty argument is the window title `start` expects first
        spawn(Command::new("cmd").args(["/C", "start", "", url]))
    }
}

/// Launch without waiting and without inheriting the terminal.
fn spawn(command: &mut Command) -> io::Result<()> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(drop)
}

/// Launcher for the current host OS, if there is one.
pub(crate) fn system_opener() -> Option<Box<dyn UrlOpener>> {
    opener_for(std::env::consts::OS)
}

fn opener_for(os: &str) -> Option<Box<dyn UrlOpener>> {
    match os {
        "macos" => Some(Box::new(MacOpen)),
        "windows" => Some(Box::new(WindowsStart)),
        "linux" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" => Some(Box::new(XdgOpen)),
        _ => None,
    }
}

/// Open `url` with `opener`, logging instead of failing.
pub(crate) fn open_best_effort(opener: Option<&dyn UrlOpener>, url: &str) {
    let Some(opener) = opener else {
        tracing::debug!(os = std::env::consts::OS, "No browser launcher for this OS");
        return;
    };
    match opener.open(url) {
        Ok(()) => tracing::debug!(url, "Opened browser"),
        Err(e) => tracing::warn!(url, error = %e, "Failed to open browser"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recording {
        urls: RefCell<Vec<String>>,
        fail: bool,
    }

    impl UrlOpener for Recording {
        fn open(&self, url: &str) -> io::Result<()> {
            self.urls.borrow_mut().push(url.to_owned());
            if self.fail {
                Err(io::Error::from(io::ErrorKind::NotFound))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_opener_for_known_systems() {
        assert!(opener_for("linux").is_some());
        assert!(opener_for("macos").is_some());
        assert!(opener_for("windows").is_some());
        assert!(opener_for("plan9").is_none());
    }

    #[test]
    fn test_open_best_effort_calls_opener() {
        let opener = Recording {
            urls: RefCell::new(Vec::new()),
            fail: false,
        };

        open_best_effort(Some(&opener), "http://127.0.0.1:3000/");

        assert_eq!(opener.urls.into_inner(), vec!["http://127.0.0.1:3000/"]);
    }

    #[test]
    fn test_open_best_effort_ignores_failure() {
        let opener = Recording {
            urls: RefCell::new(Vec::new()),
            fail: true,
        };

        open_best_effort(Some(&opener), "http://127.0.0.1:3000/");

        assert_eq!(opener.urls.into_inner().len(), 1);
    }

    #[test]
    fn test_open_best_effort_without_opener() {
        open_best_effort(None, "http://127.0.0.1:3000/");
    }
}
