//! Column-aligned rendering for `pkgstate status` and `pkgstate catalog`.

use super::progress::progress_bar;
use super::theme::{Theme, truncate};
use crossterm::style::Stylize;
use pkgstate_core::config::CatalogEntry;
use pkgstate_schema::{OperationStatus, PackageState};

/// Column headers for `pkgstate status`.
pub fn status_header(theme: &Theme) -> String {
    format!(
        "  {:<nw$} {:<sw$} {}",
        "name",
        "status",
        "detail",
        nw = theme.layout.name_width,
        sw = theme.layout.status_width,
    )
    .with(theme.colors.header)
    .to_string()
}

/// One row of `pkgstate status`.
pub fn status_row(theme: &Theme, name: &str, state: &PackageState) -> String {
    let name_part = format!(
        "{:<width$}",
        truncate(name, theme.layout.name_width),
        width = theme.layout.name_width
    );
    let status_part = format!(
        "{:<width$}",
        state.status().as_str(),
        width = theme.layout.status_width
    );

    let detail = match state.status() {
        OperationStatus::Installing => {
            let bar = progress_bar(state.progress().unwrap_or(0.0), theme.layout.bar_width);
            match state.progress_detail() {
                Some(d) if !d.is_empty() => format!("{bar} {d}"),
                _ => bar,
            }
        }
        OperationStatus::Error => state.error().unwrap_or_default().to_string(),
        _ => String::new(),
    };

    format!(
        "  {} {} {}",
        name_part.with(theme.colors.package_name),
        status_part.with(theme.status_color(state.status())),
        detail.with(theme.colors.secondary)
    )
}

/// Summary line under the status table.
pub fn status_footer(counts: &[(OperationStatus, usize)]) -> String {
    let parts: Vec<String> = counts
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(status, n)| format!("{n} {status}"))
        .collect();
    if parts.is_empty() {
        "  no packages tracked".dark_grey().to_string()
    } else {
        format!("  {}", parts.join(", ")).dark_grey().to_string()
    }
}

/// Column headers for `pkgstate catalog`.
pub fn catalog_header(theme: &Theme) -> String {
    format!(
        "  {:<nw$} {:<16} {}",
        "name",
        "category",
        "description",
        nw = theme.layout.name_width,
    )
    .with(theme.colors.header)
    .to_string()
}

/// One row of `pkgstate catalog`.
pub fn catalog_row(theme: &Theme, entry: &CatalogEntry) -> String {
    let name_part = format!(
        "{:<width$}",
        truncate(&entry.name, theme.layout.name_width),
        width = theme.layout.name_width
    );
    let category = format!("{:<16}", entry.category.as_deref().unwrap_or("-"));
    format!(
        "  {} {} {}",
        name_part.with(theme.colors.package_name),
        category.with(theme.colors.secondary),
        entry.description.as_deref().unwrap_or_default().with(theme.colors.secondary)
    )
}
