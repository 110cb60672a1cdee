//! Live progress line for a running operation.
//!
//! The line is redrawn in place with a carriage return, so it only makes
//! sense on a terminal. Commands fall back to plain per-package lines
//! otherwise.

use super::theme::{Theme, truncate};
use crossterm::style::Stylize;
use crossterm::{QueueableCommand, cursor, terminal};
use pkgstate_schema::{OperationStatus, PackageState};
use std::io::{self, Write};
use std::time::Instant;

/// `[#####.....]  50%` for a percentage in `[0, 100]`.
pub fn progress_bar(percent: f64, width: usize) -> String {
    let percent = percent.clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        ".".repeat(width - filled),
        percent
    )
}

#[derive(Debug)]
pub struct ProgressLine {
    theme: Theme,
    verb: &'static str,
    start_time: Instant,
    live: bool,
}

impl ProgressLine {
    /// `verb` is shown in front of the package name (`installing`, `removing`).
    pub fn new(theme: Theme, verb: &'static str, live: bool) -> Self {
        Self {
            theme,
            verb,
            start_time: Instant::now(),
            live,
        }
    }

    /// Blink between the active and pending icon, 200ms per frame.
    fn icon(&self) -> &'static str {
        let frame = self.start_time.elapsed().as_millis() / 200;
        if frame % 2 == 0 {
            self.theme.icons.active
        } else {
            self.theme.icons.pending
        }
    }

    /// Redraw the line from the package's current state.
    pub fn draw(&self, name: &str, state: Option<&PackageState>) -> io::Result<()> {
        if !self.live {
            return Ok(());
        }
        let detail = match state {
            Some(s) if s.status() == OperationStatus::Installing => {
                let bar = progress_bar(s.progress().unwrap_or(0.0), self.theme.layout.bar_width);
                let line = s.progress_detail().unwrap_or_default();
                format!("{bar} {}", truncate(line, 40))
            }
            _ => String::new(),
        };

        let mut out = io::stdout();
        out.queue(cursor::MoveToColumn(0))?;
        out.queue(terminal::Clear(terminal::ClearType::CurrentLine))?;
        write!(
            out,
            "  {} {} {} {}",
            self.icon().with(self.theme.colors.active),
            self.verb.with(self.theme.colors.secondary),
            name.with(self.theme.colors.package_name),
            detail.with(self.theme.colors.secondary)
        )?;
        out.flush()
    }

    /// Replace the live line with the final outcome.
    pub fn finish(&self, name: &str, state: &PackageState) -> io::Result<()> {
        let mut out = io::stdout();
        if self.live {
            out.queue(cursor::MoveToColumn(0))?;
            out.queue(terminal::Clear(terminal::ClearType::CurrentLine))?;
        }
        let elapsed = self.start_time.elapsed().as_secs_f64();
        match state.status() {
            OperationStatus::Error => writeln!(
                out,
                "  {} {} {}",
                self.theme.icons.error.with(self.theme.colors.error),
                name.with(self.theme.colors.package_name),
                state.error().unwrap_or_default().with(self.theme.colors.error)
            )?,
            status => writeln!(
                out,
                "  {} {} {} {}",
                self.theme.icons.success.with(self.theme.colors.success),
                name.with(self.theme.colors.package_name),
                status.as_str().with(self.theme.status_color(status)),
                format!("({elapsed:.1}s)").dark_grey()
            )?,
        }
        out.flush()
    }
}
