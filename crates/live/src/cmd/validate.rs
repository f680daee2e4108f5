//! `live validate`: check a rule document without running anything

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use live_config::{Config, OrgId, PipelineConfig, RulesDocument, check_rules_valid};
use live_pipeline::{RuleBuilder, Services};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Rule document (JSON), defaults to `[storage] rules_file`
    #[arg(short, long)]
    pub rules: Option<PathBuf>,
}

pub fn run(args: ValidateArgs, config: &Config) -> Result<()> {
    let doc = super::load_rules(args.rules, config)?;
    let orgs = validate_document(&doc, &config.pipeline)?;

    for (org_id, rules) in &orgs {
        println!("org {org_id}: {rules} rules ok");
    }
    println!("{} organizations, {} rules", orgs.len(), doc.rules.len());
    Ok(())
}

/// Validate every rule and build each organization's rule set
///
/// Returns the number of built rules per organization.
pub(crate) fn validate_document(
    doc: &RulesDocument,
    pipeline: &PipelineConfig,
) -> Result<Vec<(OrgId, usize)>> {
    check_rules_valid(&doc.rules).context("rule document is invalid")?;

    let builder = RuleBuilder::new(Arc::new(Services::new(pipeline)));
    let orgs: BTreeSet<OrgId> = doc.rules.iter().map(|r| r.org_id).collect();

    orgs.into_iter()
        .map(|org_id| {
            let built = builder
                .build_org(org_id, &doc.rules, &doc.remote_write_backends)
                .with_context(|| format!("building rules of org {org_id}"))?;
            Ok((org_id, built.len()))
        })
        .collect()
}
