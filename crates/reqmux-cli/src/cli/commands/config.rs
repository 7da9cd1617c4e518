//! `reqmux config` – print the effective configuration.

use anyhow::{Context, Result};
use reqmux::config::{self, ReqmuxConfig};

pub fn run_config(cfg: &ReqmuxConfig) -> Result<()> {
    let path = config::config_path()?;
    let text = toml::to_string_pretty(cfg).context("serialize config")?;
    println!("# {}", path.display());
    print!("{}", text);
    Ok(())
}
