//! Maintenance step chain.
//!
//! Steps run strictly in [`chain`] order against the synchronised workspace.
//! Each one appends a line to the update log only when it changed something,
//! and each manifest step re-reads `package.json` from disk rather than
//! sharing one in-memory copy.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::contract::{run_checked, CommandRunner, Invocation};
use crate::error::OrkoError;
use crate::manifest::{Manifest, PackageSnapshot};
use crate::state::PipelineState;

pub const SAVE_SCRIPT_NAME: &str = "save";
pub const SAVE_SCRIPT: &str =
    "git add .; git commit -m 'New Release'; git push; npm version patch; npm publish; git push;";

pub const LOG_DEPENDENCIES: &str = "update dependencies";
pub const LOG_VULNERABILITIES: &str = "fix vulnerabilities";
pub const LOG_AUTHOR: &str = "update package author";
pub const LOG_LICENSE: &str = "set license";
pub const LOG_SAVE_SCRIPT: &str = "add save script";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintenanceStep {
    /// `npm update`; failure aborts the pipeline.
    DependencyUpdate,
    /// `npm audit fix --force`; failure is only a warning.
    VulnerabilityFix,
    AuthorNormalization,
    LicenseNormalization(String),
    SaveScriptInjection,
}

/// The ordered chain. License normalization is only included when a license
/// was supplied.
pub fn chain(license: Option<&str>) -> Vec<MaintenanceStep> {
    let mut steps = vec![
        MaintenanceStep::DependencyUpdate,
        MaintenanceStep::VulnerabilityFix,
        MaintenanceStep::AuthorNormalization,
    ];
    if let Some(license) = license {
        steps.push(MaintenanceStep::LicenseNormalization(license.to_string()));
    }
    steps.push(MaintenanceStep::SaveScriptInjection);
    steps
}

fn workspace(state: &PipelineState) -> Result<PathBuf, OrkoError> {
    state
        .repository_path()
        .map(Path::to_path_buf)
        .ok_or_else(|| OrkoError::Selection("workspace was not synchronised".to_string()))
}

impl MaintenanceStep {
    pub fn name(&self) -> &'static str {
        match self {
            MaintenanceStep::DependencyUpdate => "dependency update",
            MaintenanceStep::VulnerabilityFix => "vulnerability auto-fix",
            MaintenanceStep::AuthorNormalization => "author normalization",
            MaintenanceStep::LicenseNormalization(_) => "license normalization",
            MaintenanceStep::SaveScriptInjection => "save script injection",
        }
    }

    pub async fn apply<R>(&self, state: &mut PipelineState, runner: &R) -> Result<(), OrkoError>
    where
        R: CommandRunner + ?Sized,
    {
        let path = workspace(state)?;
        info!(step = self.name(), path = %path.display(), "[MAINTAIN] Running step");
        match self {
            MaintenanceStep::DependencyUpdate => {
                let before = PackageSnapshot::take(&path);
                run_checked(runner, &Invocation::npm(&["update"], &path)).await?;
                if PackageSnapshot::take(&path) != before {
                    state.record(LOG_DEPENDENCIES);
                }
            }
            MaintenanceStep::VulnerabilityFix => {
                let before = PackageSnapshot::take(&path);
                let invocation = Invocation::npm(&["audit", "fix", "--force"], &path);
                let outcome = match runner.run(&invocation).await {
                    Ok(output) => output.into_success(&invocation),
                    Err(e) => Err(e),
                };
                match outcome {
                    Ok(_) => {
                        if PackageSnapshot::take(&path) != before {
                            state.record(LOG_VULNERABILITIES);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "[MAINTAIN] Audit fix failed, ignoring it");
                    }
                }
            }
            MaintenanceStep::AuthorNormalization => {
                let author = state
                    .package_author()
                    .ok_or_else(|| OrkoError::Ineligible {
                        reason: "no registry publisher identity to normalise the author to".to_string(),
                    })?
                    .to_string();
                let mut manifest = Manifest::load(&path)?;
                if manifest.set_author(&author) {
                    info!(author = %author, "[MAINTAIN] Package author rewritten");
                    state.record(LOG_AUTHOR);
                }
                manifest.save()?;
            }
            MaintenanceStep::LicenseNormalization(license) => {
                let mut manifest = Manifest::load(&path)?;
                if manifest.set_license(license) {
                    info!(license = %license, "[MAINTAIN] Package license rewritten");
                    state.record(LOG_LICENSE);
                }
                manifest.save()?;
            }
            MaintenanceStep::SaveScriptInjection => {
                let mut manifest = Manifest::load(&path)?;
                if manifest.insert_script(SAVE_SCRIPT_NAME, SAVE_SCRIPT)? {
                    info!("[MAINTAIN] Save script added");
                    manifest.save()?;
                    state.record(LOG_SAVE_SCRIPT);
                }
            }
        }
        Ok(())
    }
}

/// Runs the whole chain. Refuses to touch a workspace that was not
/// classified as a published, qualified package.
pub async fn run_chain<R>(
    state: &mut PipelineState,
    runner: &R,
    license: Option<&str>,
) -> Result<(), OrkoError>
where
    R: CommandRunner + ?Sized,
{
    if !state.is_eligible() {
        return Err(OrkoError::Ineligible {
            reason: "maintenance requires a published, qualified package".to_string(),
        });
    }
    for step in chain(license) {
        step.apply(state, runner).await?;
    }
    info!(entries = state.update_log().len(), "[MAINTAIN] Step chain finished");
    Ok(())
}
