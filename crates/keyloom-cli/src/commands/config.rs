//! Config command: inspect the resolved configuration.

use keyloom_config::{ResolvedConfig, loader};

use crate::formatter::{OutputFormat, print_json};
use crate::theme::Theme;

/// Print the resolved configuration and where each layer came from.
pub(crate) fn show_config(resolved: &ResolvedConfig, format: OutputFormat) -> anyhow::Result<()> {
    if format.is_json() {
        return print_json(resolved);
    }

    println!("{}", Theme::header("Sources"));
    println!("  {}", Theme::dimmed("embedded defaults"));
    for file in &resolved.loaded_files {
        println!("  {file}");
    }
    for var in &resolved.env_overrides {
        println!("  {} {}", Theme::dimmed("env"), var);
    }
    println!();
    print!("{}", resolved.config.to_toml_string()?);
    Ok(())
}

/// Print the paths Keyloom reads and writes.
pub(crate) fn show_paths(resolved: &ResolvedConfig, format: OutputFormat) -> anyhow::Result<()> {
    let user_file = loader::user_config_path();
    let data_dir = resolved.config.data_dir()?;

    if format.is_json() {
        return print_json(&serde_json::json!({
            "user_config": user_file,
            "data_dir": data_dir,
        }));
    }

    println!("{}", Theme::header("Paths"));
    match user_file {
        Some(path) => {
            let state = if path.exists() { "found" } else { "not found" };
            println!("  user config: {} {}", path.display(), Theme::dimmed(state));
        },
        None => println!("  user config: {}", Theme::dimmed("no config directory")),
    }
    println!("  data dir:    {}", data_dir.display());
    Ok(())
}
