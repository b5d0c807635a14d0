#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Terraform Cloud connector
//!
//! Projects a Terraform Cloud (or Terraform Enterprise) instance into the
//! identity-sync resource graph:
//!
//! - organizations, with their members
//! - users, including pending invitations
//! - teams and their memberships
//! - projects, with one entitlement per team access level
//! - workspaces, whose membership is inherited from the owning project
//! - agent tokens (listed only)
//!
//! ## Usage
//!
//! ```ignore
//! use identity_sync_sdk::Syncer;
//! use terraform_cloud_connector::{TerraformCloudConfig, TerraformCloudConnector};
//!
//! let connector = TerraformCloudConnector::new(&TerraformCloudConfig::with_token(token))?;
//! let snapshot = Syncer::new(Arc::new(connector)).run(&cancel).await?;
//! ```

pub mod client;
pub mod config;
pub mod connector;
pub mod domain;

#[cfg(test)]
mod test_support;

pub use client::{ClientError, HttpTerraformCloudClient, TerraformCloudApi};
pub use config::{ConfigError, TerraformCloudConfig};
pub use connector::{InitError, TerraformCloudConnector};
