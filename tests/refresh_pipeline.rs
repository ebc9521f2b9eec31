use chrono::{Duration as ChronoDuration, Utc};
use orko::contract::MockRepositoryListing;
use orko::cooldown::parse_timestamp;
use orko::refresh::{list, refresh, RefreshOptions};
use orko::repository::RepositoryDescriptor;
use orko::store::{refreshed_key, repositories_key, ConfigStore, MemoryStore};
use orko::update::cached_repositories;
use orko::OrkoError;
use std::time::Duration;

fn options(force: bool) -> RefreshOptions {
    RefreshOptions {
        username: "catpea".to_string(),
        cooldown: Duration::from_secs(45 * 60),
        force,
    }
}

fn listing() -> Vec<RepositoryDescriptor> {
    vec![
        RepositoryDescriptor::new("alpha", "git@github.com:catpea/alpha.git"),
        RepositoryDescriptor::new("beta", "git@github.com:catpea/beta.git"),
    ]
}

#[tokio::test]
async fn first_refresh_stores_listing_and_timestamp() {
    let mut store = MemoryStore::new();
    let mut client = MockRepositoryListing::new();
    client
        .expect_fetch_repositories()
        .withf(|user: &str| user == "catpea")
        .times(1)
        .returning(|_| Ok(listing()));
    let now = Utc::now();

    let report = refresh(&mut store, &client, &options(false), now).await.unwrap();

    assert_eq!(report.repositories, 2);
    assert_eq!(
        store.get(&refreshed_key("catpea")).as_ref().and_then(parse_timestamp),
        Some(now)
    );
    assert_eq!(cached_repositories(&store, "catpea").unwrap(), listing());
    assert_eq!(
        store.get(&repositories_key("catpea")).unwrap()[0]["ssh_url"],
        "git@github.com:catpea/alpha.git"
    );
}

#[tokio::test]
async fn refresh_within_cooldown_does_not_fetch() {
    let now = Utc::now();
    let mut store = MemoryStore::new();
    store
        .set(
            &refreshed_key("catpea"),
            serde_json::json!((now - ChronoDuration::minutes(5)).to_rfc3339()),
        )
        .unwrap();
    // no expectations: any fetch would panic
    let client = MockRepositoryListing::new();

    let err = refresh(&mut store, &client, &options(false), now).await.unwrap_err();

    assert!(matches!(err, OrkoError::CooldownActive { .. }));
    assert!(store.get(&repositories_key("catpea")).is_none());
}

#[tokio::test]
async fn forced_refresh_ignores_the_cooldown() {
    let now = Utc::now();
    let mut store = MemoryStore::new();
    store
        .set(
            &refreshed_key("catpea"),
            serde_json::json!((now - ChronoDuration::minutes(5)).to_rfc3339()),
        )
        .unwrap();
    let mut client = MockRepositoryListing::new();
    client
        .expect_fetch_repositories()
        .times(1)
        .returning(|_| Ok(listing()));

    refresh(&mut store, &client, &options(true), now).await.unwrap();

    assert_eq!(cached_repositories(&store, "catpea").unwrap().len(), 2);
}

#[tokio::test]
async fn failed_fetch_keeps_previous_listing() {
    let now = Utc::now();
    let mut store = MemoryStore::new();
    let old = (now - ChronoDuration::hours(3)).to_rfc3339();
    store.set(&refreshed_key("catpea"), serde_json::json!(old)).unwrap();
    store
        .set(
            &repositories_key("catpea"),
            serde_json::json!([{ "name": "old", "ssh_url": "git@github.com:catpea/old.git" }]),
        )
        .unwrap();
    let mut client = MockRepositoryListing::new();
    client.expect_fetch_repositories().returning(|_| {
        Err(OrkoError::ExternalCommand {
            program: "GET".to_string(),
            args: vec!["https://api.github.com/users/catpea/repos".to_string()],
            status: "403 Forbidden".to_string(),
            stderr: "rate limited".to_string(),
        })
    });

    assert!(refresh(&mut store, &client, &options(false), now).await.is_err());
    assert_eq!(store.get(&refreshed_key("catpea")), Some(serde_json::json!(old)));
    assert_eq!(cached_repositories(&store, "catpea").unwrap()[0].name, "old");
}

#[test]
fn list_prints_header_and_names() {
    let now = Utc::now();
    let mut store = MemoryStore::new();
    store
        .set(
            &refreshed_key("catpea"),
            serde_json::json!((now - ChronoDuration::minutes(90)).to_rfc3339()),
        )
        .unwrap();
    store
        .set(&repositories_key("catpea"), serde_json::to_value(listing()).unwrap())
        .unwrap();

    let view = list(&store, "catpea", now).unwrap();

    assert_eq!(view.header, "# The catpea repository listing was last refreshed 1 hour ago.");
    assert_eq!(view.names, vec!["alpha", "beta"]);
}

#[test]
fn list_without_refresh_points_at_the_refresh_command() {
    let store = MemoryStore::new();
    let err = list(&store, "catpea", Utc::now()).unwrap_err();
    assert!(matches!(err, OrkoError::NotRefreshed { .. }));
}
