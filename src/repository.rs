use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::OrkoError;

/// One entry of a user's cached repository listing.
///
/// Stored under the GitHub field names so the cached listing is the same
/// shape as the API response it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub name: String,
    /// Clone-capable address.
    #[serde(rename = "ssh_url")]
    pub remote_url: String,
}

impl RepositoryDescriptor {
    pub fn new(name: &str, remote_url: &str) -> Self {
        Self {
            name: name.to_string(),
            remote_url: remote_url.to_string(),
        }
    }
}

/// Picks the repository to work on: the first descriptor named `requested`,
/// or a uniformly random one when no name is given.
pub fn select<'a, R>(
    repositories: &'a [RepositoryDescriptor],
    requested: Option<&str>,
    rng: &mut R,
) -> Result<&'a RepositoryDescriptor, OrkoError>
where
    R: Rng + ?Sized,
{
    let selected = match requested {
        Some(name) => repositories.iter().find(|r| r.name == name).ok_or_else(|| {
            error!(repository = name, "Requested repository was not found");
            OrkoError::Selection(format!("requested repository {name} was not found"))
        })?,
        None => repositories.choose(rng).ok_or_else(|| {
            error!("Repository listing is empty");
            OrkoError::Selection("the repository listing is empty".to_string())
        })?,
    };
    info!(
        repository = %selected.name,
        remote_url = %selected.remote_url,
        random = requested.is_none(),
        "Selected repository"
    );
    Ok(selected)
}
