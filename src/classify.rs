use serde_json::Value;
use tracing::{error, info, warn};

use crate::contract::{run_checked, CommandRunner, Invocation};
use crate::error::OrkoError;
use crate::manifest::Manifest;
use crate::state::PipelineState;

/// Dependencies that rule a package out of automated maintenance.
pub const DISQUALIFYING_FRAMEWORKS: [&str; 1] = ["electron"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No `package.json` in the workspace.
    NotAPackage,
    Package {
        name: String,
        /// Publisher identity from the registry, e.g. `catpea <catpea@example.com>`.
        publisher: Option<String>,
        is_published: bool,
        is_disqualified: bool,
    },
}

impl Classification {
    /// Reason maintenance must not run, or `None` when it may.
    pub fn rejection(&self, registry_user: &str) -> Option<String> {
        match self {
            Classification::NotAPackage => Some("not an npm package".to_string()),
            Classification::Package {
                is_disqualified: true,
                name,
                ..
            } => Some(format!(
                "{name} depends on a desktop-shell framework ({})",
                DISQUALIFYING_FRAMEWORKS.join(", ")
            )),
            Classification::Package {
                is_published: false,
                name,
                ..
            } => Some(format!("{name} is not published to npm by {registry_user}")),
            Classification::Package { .. } => None,
        }
    }
}

/// Pulls the publisher identity out of `npm info --json` output.
pub fn publisher_from_registry(info: &Value) -> Option<String> {
    let info = match info {
        Value::Array(versions) => versions.last()?,
        other => other,
    };
    match info.get("_npmUser")? {
        Value::String(user) => Some(user.clone()),
        Value::Object(user) => {
            let name = user.get("name")?.as_str()?;
            Some(match user.get("email").and_then(Value::as_str) {
                Some(email) => format!("{name} <{email}>"),
                None => name.to_string(),
            })
        }
        _ => None,
    }
}

/// Inspects the synchronised workspace without modifying it: is it an npm
/// package, was it published under `registry_user`, does it depend on a
/// disqualifying framework. Records the outcome in `state`.
pub async fn classify<R>(
    state: &mut PipelineState,
    runner: &R,
    registry_user: &str,
) -> Result<Classification, OrkoError>
where
    R: CommandRunner + ?Sized,
{
    let path = state
        .repository_path()
        .ok_or_else(|| OrkoError::Selection("workspace was not synchronised".to_string()))?
        .to_path_buf();

    if !Manifest::exists_in(&path) {
        info!(path = %path.display(), "[CLASSIFY] No package.json, not an npm package");
        state.set_classification(false, false, None);
        return Ok(Classification::NotAPackage);
    }

    let manifest = Manifest::load(&path)?;
    let name = manifest
        .name()
        .or(state.repository_name())
        .unwrap_or_default()
        .to_string();
    info!(package = %name, "[CLASSIFY] npm package found, querying registry");

    let output = run_checked(runner, &Invocation::npm(&["info", "--json", &name], &path)).await?;
    let info: Value = serde_json::from_str(&output.stdout).map_err(|e| {
        error!(error = ?e, package = %name, "[CLASSIFY] Registry returned unparseable JSON");
        OrkoError::ExternalCommand {
            program: "npm".to_string(),
            args: vec!["info".into(), "--json".into(), name.clone()],
            status: "invalid JSON output".to_string(),
            stderr: e.to_string(),
        }
    })?;

    let publisher = publisher_from_registry(&info);
    let is_published = publisher
        .as_deref()
        .is_some_and(|p| p.starts_with(registry_user));
    let is_disqualified = DISQUALIFYING_FRAMEWORKS
        .iter()
        .any(|framework| manifest.depends_on(framework));

    match (&publisher, is_published) {
        (Some(p), true) => info!(package = %name, publisher = %p, "[CLASSIFY] Package is published by operator"),
        (Some(p), false) => info!(package = %name, publisher = %p, "[CLASSIFY] Package is published by someone else"),
        (None, _) => info!(package = %name, "[CLASSIFY] Package is not published to npm"),
    }
    if is_disqualified {
        warn!(package = %name, "[CLASSIFY] Package depends on a disqualifying framework");
    }

    state.set_classification(is_published, is_disqualified, publisher.clone());
    Ok(Classification::Package {
        name,
        publisher,
        is_published,
        is_disqualified,
    })
}
