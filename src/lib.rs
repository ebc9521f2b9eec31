//! orko: automatic package and repository maintenance bot.
//!
//! Two pipelines share the modules below:
//! - [`refresh`] downloads a user's repository listing into the configuration store
//! - [`update`] picks one repository and runs the maintenance routine on it
//!
//! External effects go through [`contract::CommandRunner`],
//! [`contract::RepositoryListing`] and [`store::ConfigStore`], so every
//! pipeline can be driven by fakes in tests.

pub mod changes;
pub mod classify;
pub mod cli;
pub mod contract;
pub mod cooldown;
pub mod error;
pub mod load_config;
pub mod maintenance;
pub mod manifest;
pub mod publish;
pub mod refresh;
pub mod repository;
pub mod runner;
pub mod state;
pub mod store;
pub mod update;
pub mod workspace;

pub use cli::{run, Cli, Commands};
pub use error::OrkoError;
