//! Colors, icons and column widths shared by all output.

use crossterm::style::Color;
use pkgstate_schema::OperationStatus;

#[derive(Debug, Clone, Copy)]
pub struct Colors {
    pub header: Color,
    pub package_name: Color,
    pub secondary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub active: Color,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            header: Color::DarkGrey,
            package_name: Color::White,
            secondary: Color::DarkGrey,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            active: Color::Cyan,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Icons {
    pub success: &'static str,
    pub error: &'static str,
    pub active: &'static str,
    pub pending: &'static str,
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            success: "●",
            error: "✕",
            active: "○",
            pending: "·",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub name_width: usize,
    pub status_width: usize,
    pub bar_width: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            name_width: 24,
            status_width: 18,
            bar_width: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Theme {
    pub colors: Colors,
    pub icons: Icons,
    pub layout: Layout,
}

impl Theme {
    /// Color for a status label.
    pub fn status_color(&self, status: OperationStatus) -> Color {
        match status {
            OperationStatus::NotInstalled => self.colors.secondary,
            OperationStatus::Installing => self.colors.active,
            OperationStatus::Installed => self.colors.success,
            OperationStatus::UpdateAvailable => self.colors.warning,
            OperationStatus::Error => self.colors.error,
        }
    }
}

/// Truncate `text` to at most `width` characters, marking the cut with `…`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}
