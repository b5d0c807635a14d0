//! Builder traits implemented by connectors and driven by the sync host.
//!
//! Every builder implements the narrow [`ResourceSyncer`] core. Builders that
//! can mutate upstream state additionally implement [`ResourceProvisioner`]
//! and/or [`AccountManager`], and expose them through the `as_*` hooks so the
//! host can test for the capability at the call site.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::account::{
    AccountInfo, ConnectorMetadata, CreateAccountOutcome, CredentialDetails, CredentialOptions,
};
use crate::annotations::Annotations;
use crate::error::ConnectorError;
use crate::models::{Entitlement, Grant, Resource, ResourceId, ResourceType};
use crate::pagination::{Page, PageToken};

/// Lists one resource kind together with its entitlements and grants.
///
/// The host may call distinct `(builder, resource)` pairs concurrently, so
/// implementations must guard any shared state themselves.
#[async_trait]
pub trait ResourceSyncer: Send + Sync {
    fn resource_type(&self) -> &'static ResourceType;

    /// List one page of resources under `parent`.
    ///
    /// Builders of child kinds return an empty page when `parent` is `None`.
    ///
    /// # Errors
    ///
    /// - `BadPageToken` if `token` is not a decimal page number
    /// - `Upstream` if the upstream call fails
    /// - `Cancelled` if `cancel` fires first
    async fn list(
        &self,
        cancel: &CancellationToken,
        parent: Option<&ResourceId>,
        token: &PageToken,
    ) -> Result<Page<Resource>, ConnectorError>;

    /// Entitlements offered by `resource`.
    ///
    /// # Errors
    ///
    /// Same as [`ResourceSyncer::list`].
    async fn entitlements(
        &self,
        cancel: &CancellationToken,
        resource: &Resource,
        token: &PageToken,
    ) -> Result<Page<Entitlement>, ConnectorError>;

    /// One page of grants on `resource`.
    ///
    /// # Errors
    ///
    /// Same as [`ResourceSyncer::list`].
    async fn grants(
        &self,
        cancel: &CancellationToken,
        resource: &Resource,
        token: &PageToken,
    ) -> Result<Page<Grant>, ConnectorError>;

    fn as_provisioner(&self) -> Option<&dyn ResourceProvisioner> {
        None
    }

    fn as_account_manager(&self) -> Option<&dyn AccountManager> {
        None
    }
}

/// Grant and revoke entitlements on resources of one kind.
#[async_trait]
pub trait ResourceProvisioner: Send + Sync {
    /// Give `principal` the `entitlement`.
    ///
    /// # Errors
    ///
    /// - `Upstream` if the upstream call fails
    /// - `Cancelled` if `cancel` fires first
    async fn grant(
        &self,
        cancel: &CancellationToken,
        principal: &Resource,
        entitlement: &Entitlement,
    ) -> Result<Annotations, ConnectorError>;

    /// Remove `grant`.
    ///
    /// A grant that no longer exists upstream is a success carrying
    /// [`Annotation::GrantAlreadyRevoked`](crate::Annotation::GrantAlreadyRevoked).
    ///
    /// # Errors
    ///
    /// - `ProfileContract` if the principal lacks data needed to locate the grant
    /// - `Upstream` if the upstream call fails
    /// - `Cancelled` if `cancel` fires first
    async fn revoke(
        &self,
        cancel: &CancellationToken,
        grant: &Grant,
    ) -> Result<Annotations, ConnectorError>;
}

/// Create accounts for the user resource kind.
#[async_trait]
pub trait AccountManager: Send + Sync {
    fn create_account_capability_details(&self) -> CredentialDetails;

    /// Create an upstream account described by `account`.
    ///
    /// # Errors
    ///
    /// - `ProfileContract` if a required profile field is missing
    /// - `NoTeamsFound` if the provisioning target does not resolve
    /// - `Upstream` if the upstream call fails
    /// - `Cancelled` if `cancel` fires first
    async fn create_account(
        &self,
        cancel: &CancellationToken,
        account: &AccountInfo,
        credentials: &CredentialOptions,
    ) -> Result<CreateAccountOutcome, ConnectorError>;
}

/// A connector: metadata plus the set of resource builders.
#[async_trait]
pub trait Connector: Send + Sync {
    fn metadata(&self) -> ConnectorMetadata;

    /// Check that the connector is usable.
    ///
    /// # Errors
    ///
    /// Connector-specific; see the implementation.
    async fn validate(&self, cancel: &CancellationToken) -> Result<Annotations, ConnectorError>;

    /// Builders in the order the host should list them.
    fn resource_syncers(&self) -> Vec<Arc<dyn ResourceSyncer>>;
}
