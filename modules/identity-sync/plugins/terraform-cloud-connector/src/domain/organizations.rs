use std::sync::Arc;

use async_trait::async_trait;
use identity_sync_sdk::{
    Annotation, Annotations, ConnectorError, Entitlement, Grant, Page, PageToken, Profile,
    Resource, ResourceId, ResourceProvisioner, ResourceSyncer, ResourceType,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::resource_types::{ORGANIZATION, ORGANIZATION_CHILDREN, ORGANIZATION_MEMBER, USER};
use super::{guarded, page_from};
use crate::client::{ListOptions, MembershipListOptions, Organization, TerraformCloudApi};

pub struct OrganizationBuilder {
    client: Arc<dyn TerraformCloudApi>,
}

impl OrganizationBuilder {
    pub fn new(client: Arc<dyn TerraformCloudApi>) -> Self {
        Self { client }
    }
}

/// The organization name doubles as its ID upstream.
pub(crate) fn organization_resource(org: &Organization) -> Resource {
    let mut profile = Profile::new();
    profile.insert("email".to_owned(), json!(org.email));
    profile.insert(
        "costEstimationEnabled".to_owned(),
        json!(org.cost_estimation_enabled),
    );
    profile.insert(
        "twoFactorConformant".to_owned(),
        json!(org.two_factor_conformant),
    );
    profile.insert(
        "defaultProjectName".to_owned(),
        json!(org.default_project_name),
    );

    ORGANIZATION_CHILDREN.iter().fold(
        Resource::group(&org.name, &ORGANIZATION, &org.name, profile),
        |resource, child| resource.with_annotation(Annotation::child_resource_type(child.id)),
    )
}

#[async_trait]
impl ResourceSyncer for OrganizationBuilder {
    fn resource_type(&self) -> &'static ResourceType {
        &ORGANIZATION
    }

    #[instrument(skip_all, fields(page = %token))]
    async fn list(
        &self,
        cancel: &CancellationToken,
        _parent: Option<&ResourceId>,
        token: &PageToken,
    ) -> Result<Page<Resource>, ConnectorError> {
        let page = token.page()?;
        let orgs = guarded(
            cancel,
            "list organizations",
            self.client.list_organizations(ListOptions::page(page)),
        )
        .await?;
        Ok(page_from(orgs, |org| Some(organization_resource(&org))))
    }

    async fn entitlements(
        &self,
        _cancel: &CancellationToken,
        resource: &Resource,
        _token: &PageToken,
    ) -> Result<Page<Entitlement>, ConnectorError> {
        let label = format!("Member of {} organization", resource.display_name);
        Ok(Page::single(vec![
            Entitlement::assignment(resource, ORGANIZATION_MEMBER)
                .with_grantable_to(&USER)
                .with_display_name(label.clone())
                .with_description(label),
        ]))
    }

    #[instrument(skip_all, fields(organization = %resource.id.resource, page = %token))]
    async fn grants(
        &self,
        cancel: &CancellationToken,
        resource: &Resource,
        token: &PageToken,
    ) -> Result<Page<Grant>, ConnectorError> {
        let options = MembershipListOptions {
            list: ListOptions::page(token.page()?),
            email: None,
        };
        let memberships = guarded(
            cancel,
            "list organization memberships",
            self.client
                .list_organization_memberships(&resource.id.resource, &options),
        )
        .await?;

        Ok(page_from(memberships, |membership| {
            let Some(user) = membership.user else {
                warn!(membership_id = %membership.id, "Membership without a user; skipping");
                return None;
            };
            Some(Grant::new(
                resource,
                ORGANIZATION_MEMBER,
                USER.resource_id(user.id),
            ))
        }))
    }

    fn as_provisioner(&self) -> Option<&dyn ResourceProvisioner> {
        Some(self)
    }
}

#[async_trait]
impl ResourceProvisioner for OrganizationBuilder {
    /// Organization membership is conferred by team assignment at account
    /// creation, so there is nothing to do here.
    async fn grant(
        &self,
        _cancel: &CancellationToken,
        principal: &Resource,
        entitlement: &Entitlement,
    ) -> Result<Annotations, ConnectorError> {
        info!(
            principal = %principal.id,
            entitlement = %entitlement.id,
            "Organization grant is a no-op; membership follows team assignment"
        );
        Ok(Annotations::new())
    }

    #[instrument(skip_all, fields(grant = %grant.id))]
    async fn revoke(
        &self,
        cancel: &CancellationToken,
        grant: &Grant,
    ) -> Result<Annotations, ConnectorError> {
        let email = grant
            .principal
            .user_trait()
            .and_then(|t| t.profile.get("email"))
            .and_then(serde_json::Value::as_str)
            .filter(|email| !email.is_empty())
            .ok_or_else(|| {
                ConnectorError::profile_contract("email", "not found in principal profile")
            })?;
        let organization = &grant.entitlement.resource.id.resource;

        let options = MembershipListOptions {
            list: ListOptions::default(),
            email: Some(email.to_owned()),
        };
        let memberships = guarded(
            cancel,
            "list organization memberships",
            self.client
                .list_organization_memberships(organization, &options),
        )
        .await?;

        let Some(membership) = memberships.items.first() else {
            debug!(organization, "No membership left to revoke");
            return Ok(Annotations::from(Annotation::GrantAlreadyRevoked));
        };
        guarded(
            cancel,
            "delete organization membership",
            self.client.delete_organization_membership(&membership.id),
        )
        .await?;
        info!(organization, membership_id = %membership.id, "Revoked organization membership");
        Ok(Annotations::new())
    }
}
