use std::sync::Arc;

use async_trait::async_trait;
use identity_sync_sdk::{
    AccountInfo, AccountManager, Annotations, ConnectorError, CreateAccountOutcome,
    CreateAccountResponse, CredentialDetails, CredentialOption, CredentialOptions, Entitlement,
    Grant, Page, PageToken, Profile, Resource, ResourceId, ResourceSyncer, ResourceType,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::resource_types::{ORGANIZATION, USER};
use super::{guarded, page_from};
use crate::client::{ListOptions, MembershipListOptions, TeamListOptions, TerraformCloudApi, User};

/// Team new accounts join when the request names none.
pub const DEFAULT_TEAM: &str = "owners";

pub struct UserBuilder {
    client: Arc<dyn TerraformCloudApi>,
}

impl UserBuilder {
    pub fn new(client: Arc<dyn TerraformCloudApi>) -> Self {
        Self { client }
    }
}

/// Users with a pending invitation have no username yet; they are shown as
/// `<email>+invited`.
pub(crate) fn user_resource(user: &User, parent: &ResourceId) -> Resource {
    let mut profile = Profile::new();
    profile.insert("email".to_owned(), json!(user.email));
    profile.insert(
        "twoFactorEnabled".to_owned(),
        json!(user.two_factor.enabled),
    );
    profile.insert(
        "twoFactorVerified".to_owned(),
        json!(user.two_factor.verified),
    );
    if let Some(is_admin) = user.is_admin {
        profile.insert("isAdmin".to_owned(), json!(is_admin));
    }

    let display_name = if user.username.is_empty() {
        format!("{}+invited", user.email)
    } else {
        user.username.clone()
    };
    Resource::user(display_name, &USER, &user.id, profile).with_parent(parent)
}

#[async_trait]
impl ResourceSyncer for UserBuilder {
    fn resource_type(&self) -> &'static ResourceType {
        &USER
    }

    #[instrument(skip_all, fields(page = %token))]
    async fn list(
        &self,
        cancel: &CancellationToken,
        parent: Option<&ResourceId>,
        token: &PageToken,
    ) -> Result<Page<Resource>, ConnectorError> {
        let Some(parent) = parent else {
            return Ok(Page::empty());
        };
        let options = MembershipListOptions {
            list: ListOptions::page(token.page()?),
            email: None,
        };
        let memberships = guarded(
            cancel,
            "list users",
            self.client
                .list_organization_memberships(&parent.resource, &options),
        )
        .await?;
        Ok(page_from(memberships, |membership| {
            membership.user.map(|user| user_resource(&user, parent))
        }))
    }

    async fn entitlements(
        &self,
        _cancel: &CancellationToken,
        _resource: &Resource,
        _token: &PageToken,
    ) -> Result<Page<Entitlement>, ConnectorError> {
        Ok(Page::empty())
    }

    async fn grants(
        &self,
        _cancel: &CancellationToken,
        _resource: &Resource,
        _token: &PageToken,
    ) -> Result<Page<Grant>, ConnectorError> {
        Ok(Page::empty())
    }

    fn as_account_manager(&self) -> Option<&dyn AccountManager> {
        Some(self)
    }
}

#[async_trait]
impl AccountManager for UserBuilder {
    fn create_account_capability_details(&self) -> CredentialDetails {
        CredentialDetails {
            supported: vec![CredentialOption::NoPassword],
            preferred: CredentialOption::NoPassword,
        }
    }

    /// Invite the account into the organization through the requested teams.
    ///
    /// The upstream sends the invitation email itself, so the outcome is
    /// always `ActionRequired` carrying the membership status.
    #[instrument(skip_all)]
    async fn create_account(
        &self,
        cancel: &CancellationToken,
        account: &AccountInfo,
        credentials: &CredentialOptions,
    ) -> Result<CreateAccountOutcome, ConnectorError> {
        if credentials.option != CredentialOption::NoPassword {
            return Err(ConnectorError::Unsupported(format!(
                "credential option {:?}",
                credentials.option
            )));
        }
        let email = required(account, "email")?;
        let organization = required(account, "organizationName")?;
        let options = TeamListOptions {
            list: ListOptions::default(),
            names: team_names(account),
        };
        let teams = guarded(
            cancel,
            "list teams",
            self.client.list_teams(organization, &options),
        )
        .await?;
        // Only teams that were asked for by name; an unfiltered response must
        // never widen the invitation.
        let team_ids: Vec<String> = teams
            .items
            .into_iter()
            .filter(|team| options.names.contains(&team.name))
            .map(|team| team.id)
            .collect();
        if team_ids.is_empty() {
            return Err(ConnectorError::NoTeamsFound {
                organization: organization.to_owned(),
            });
        }

        let membership = guarded(
            cancel,
            "create user",
            self.client
                .create_organization_membership(organization, email, &team_ids),
        )
        .await?;
        info!(
            organization,
            membership_id = %membership.id,
            status = %membership.status,
            "Created organization membership"
        );

        let parent = ORGANIZATION.resource_id(organization);
        Ok(CreateAccountOutcome {
            response: CreateAccountResponse::ActionRequired {
                message: membership.status,
                resource: membership.user.map(|user| user_resource(&user, &parent)),
            },
            annotations: Annotations::new(),
        })
    }
}

/// Requested team names with blanks dropped; none left means the default team.
fn team_names(account: &AccountInfo) -> Vec<String> {
    let names: Vec<String> = account
        .string_list("teamNames")
        .unwrap_or_default()
        .into_iter()
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() {
        vec![DEFAULT_TEAM.to_owned()]
    } else {
        names
    }
}

fn required<'a>(account: &'a AccountInfo, field: &str) -> Result<&'a str, ConnectorError> {
    account
        .string(field)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConnectorError::profile_contract(field, "not found in profile"))
}
