//! Subcommands

pub mod publish;
pub mod validate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use live_config::{Config, RulesDocument};

/// Load the rule document named on the command line or in `[storage] rules_file`
pub(crate) fn load_rules(arg: Option<PathBuf>, config: &Config) -> Result<RulesDocument> {
    let path = arg
        .or_else(|| config.storage.rules_file.clone())
        .context("no rule document: pass --rules or set [storage] rules_file")?;
    RulesDocument::from_file(&path)
        .with_context(|| format!("loading rules from {}", path.display()))
}
