//! Catalog command
use crate::ui::Theme;
use crate::ui::list::{catalog_header, catalog_row};
use anyhow::Result;
use pkgstate_core::Config;

/// List configured packages. Does not touch the backend.
pub fn catalog(config: &Config, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&config.packages)?);
        return Ok(());
    }

    if config.packages.is_empty() {
        println!();
        println!("  No packages in the catalog.");
        println!("  Add [[package]] entries to your config.toml to track them.");
        return Ok(());
    }

    let theme = Theme::default();
    println!();
    println!("{}", catalog_header(&theme));
    for entry in &config.packages {
        println!("{}", catalog_row(&theme, entry));
    }
    println!();
    Ok(())
}
