//! Refresh pipeline: downloads a user's repository listing into the store,
//! plus the read-only `list` view over it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::contract::RepositoryListing;
use crate::cooldown::{self, format_timestamp, parse_timestamp, time_ago};
use crate::error::OrkoError;
use crate::repository::RepositoryDescriptor;
use crate::store::{refreshed_key, repositories_key, ConfigStore};
use crate::update::{cached_repositories, require_refreshed};

/// A page shorter than `per_page` (or empty) is the last one.
pub fn has_more(returned: usize, per_page: u32) -> bool {
    returned > 0 && returned >= per_page as usize
}

/// GitHub REST client for `GET /users/{user}/repos?type=source`.
pub struct GithubClient {
    client: reqwest::Client,
    api: String,
    per_page: u32,
    page_delay: Duration,
}

impl GithubClient {
    pub fn new(api: &str, per_page: u32) -> Result<Self, OrkoError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("orko/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api: api.trim_end_matches('/').to_string(),
            per_page: per_page.max(1),
            page_delay: Duration::from_secs(1),
        })
    }

    /// Pause between page requests.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    fn page_url(&self, username: &str, page: u32) -> String {
        format!(
            "{}/users/{}/repos?type=source&per_page={}&page={}",
            self.api, username, self.per_page, page
        )
    }
}

#[async_trait]
impl RepositoryListing for GithubClient {
    async fn fetch_repositories(
        &self,
        username: &str,
    ) -> Result<Vec<RepositoryDescriptor>, OrkoError> {
        let mut repositories = Vec::new();
        let mut page = 1;
        loop {
            let url = self.page_url(username, page);
            info!(url = %url, page, "[REFRESH] Fetching repository page");
            let response = self.client.get(&url).send().await.map_err(|e| {
                error!(error = ?e, url = %url, "[REFRESH] Request failed");
                OrkoError::Http(e)
            })?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                error!(status = %status, url = %url, "[REFRESH] GitHub returned an error");
                return Err(OrkoError::ExternalCommand {
                    program: "GET".to_string(),
                    args: vec![url],
                    status: status.to_string(),
                    stderr: body,
                });
            }
            let listing: Vec<RepositoryDescriptor> = response.json().await?;
            let returned = listing.len();
            debug!(page, returned, "[REFRESH] Page received");
            repositories.extend(listing);

            if !has_more(returned, self.per_page) {
                break;
            }
            page += 1;
            tokio::time::sleep(self.page_delay).await;
        }
        Ok(repositories)
    }
}

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    pub username: String,
    pub cooldown: Duration,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub repositories: usize,
    pub refreshed_at: DateTime<Utc>,
}

/// Fetches the listing and stores it with the refresh time, unless the
/// previous refresh is still within the cooldown.
pub async fn refresh<S, L>(
    store: &mut S,
    listing: &L,
    options: &RefreshOptions,
    now: DateTime<Utc>,
) -> Result<RefreshReport, OrkoError>
where
    S: ConfigStore + ?Sized,
    L: RepositoryListing + ?Sized,
{
    let username = options.username.as_str();
    let last = store.get(&refreshed_key(username)).as_ref().and_then(parse_timestamp);
    if let Some(last) = last {
        info!(
            username,
            "[REFRESH] The {username} repository listing was last refreshed {}",
            time_ago(last, now)
        );
    }
    if options.force {
        warn!(username, "[REFRESH] Forced run, skipping refresh cooldown");
    } else {
        cooldown::check("refresh", last, options.cooldown, now)?;
    }

    let repositories = listing.fetch_repositories(username).await?;
    let count = repositories.len();
    let value = serde_json::to_value(&repositories)
        .map_err(|e| OrkoError::Store(format!("failed to serialise listing: {e}")))?;

    store.set_all(vec![
        (refreshed_key(username), Value::String(format_timestamp(now))),
        (repositories_key(username), value),
    ])?;
    info!(username, repositories = count, "[REFRESH] Repository listing stored");

    Ok(RefreshReport {
        repositories: count,
        refreshed_at: now,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    pub header: String,
    pub names: Vec<String>,
}

/// Cached repository names of `username` with a "last refreshed" header.
pub fn list<S>(store: &S, username: &str, now: DateTime<Utc>) -> Result<ListView, OrkoError>
where
    S: ConfigStore + ?Sized,
{
    let refreshed = require_refreshed(store, username)?;
    let names = cached_repositories(store, username)?
        .into_iter()
        .map(|r| r.name)
        .collect();
    Ok(ListView {
        header: format!(
            "# The {username} repository listing was last refreshed {}.",
            time_ago(refreshed, now)
        ),
        names,
    })
}
