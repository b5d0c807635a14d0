//! Connector entry point: metadata plus the wired-up builders.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use identity_sync_sdk::{
    AccountCreationField, AccountCreationSchema, Annotations, Connector, ConnectorError,
    ConnectorMetadata, FieldKind, ResourceSyncer,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::client::{ClientError, HttpTerraformCloudClient, TerraformCloudApi};
use crate::config::{ConfigError, TerraformCloudConfig};
use crate::domain::agent_tokens::AgentTokenBuilder;
use crate::domain::organizations::OrganizationBuilder;
use crate::domain::projects::ProjectBuilder;
use crate::domain::teams::TeamBuilder;
use crate::domain::users::{DEFAULT_TEAM, UserBuilder};
use crate::domain::workspaces::WorkspaceBuilder;

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] ClientError),
}

/// Terraform Cloud connector.
///
/// Builders are created once and shared; the team and workspace builders keep
/// caches that live as long as the connector.
pub struct TerraformCloudConnector {
    organizations: Arc<OrganizationBuilder>,
    users: Arc<UserBuilder>,
    projects: Arc<ProjectBuilder>,
    workspaces: Arc<WorkspaceBuilder>,
    teams: Arc<TeamBuilder>,
    agent_tokens: Arc<AgentTokenBuilder>,
}

impl TerraformCloudConnector {
    /// Connect to the Terraform Cloud instance described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &TerraformCloudConfig) -> Result<Self, InitError> {
        config.validate()?;
        let client = HttpTerraformCloudClient::new(config)?;
        info!(address = %config.address, "Terraform Cloud connector configured");
        Ok(Self::with_client(Arc::new(client)))
    }

    #[must_use]
    pub fn with_client(client: Arc<dyn TerraformCloudApi>) -> Self {
        Self {
            organizations: Arc::new(OrganizationBuilder::new(Arc::clone(&client))),
            users: Arc::new(UserBuilder::new(Arc::clone(&client))),
            projects: Arc::new(ProjectBuilder::new(Arc::clone(&client))),
            workspaces: Arc::new(WorkspaceBuilder::new(Arc::clone(&client))),
            teams: Arc::new(TeamBuilder::new(Arc::clone(&client))),
            agent_tokens: Arc::new(AgentTokenBuilder::new(client)),
        }
    }

    /// Builder for `resource_type_id`, if this connector has one.
    #[must_use]
    pub fn syncer(&self, resource_type_id: &str) -> Option<Arc<dyn ResourceSyncer>> {
        self.resource_syncers()
            .into_iter()
            .find(|s| s.resource_type().id == resource_type_id)
    }
}

fn account_creation_schema() -> AccountCreationSchema {
    let field = |display_name: &str,
                 description: String,
                 placeholder: &str,
                 required: bool,
                 order: u32,
                 kind: FieldKind| AccountCreationField {
        display_name: display_name.to_owned(),
        description,
        placeholder: placeholder.to_owned(),
        required,
        order,
        kind,
    };

    let mut fields = BTreeMap::new();
    fields.insert(
        "email".to_owned(),
        field(
            "Email",
            "Email address of the user to invite".to_owned(),
            "Email",
            true,
            1,
            FieldKind::String,
        ),
    );
    fields.insert(
        "organizationName".to_owned(),
        field(
            "Organization name",
            "Organization the user is invited to".to_owned(),
            "organizationName",
            true,
            2,
            FieldKind::String,
        ),
    );
    fields.insert(
        "teamNames".to_owned(),
        field(
            "Team names",
            format!("Teams the user joins; defaults to the \"{DEFAULT_TEAM}\" team"),
            "teamNames",
            false,
            3,
            FieldKind::StringList,
        ),
    );
    AccountCreationSchema { fields }
}

#[async_trait]
impl Connector for TerraformCloudConnector {
    fn metadata(&self) -> ConnectorMetadata {
        ConnectorMetadata {
            display_name: "Terraform Cloud".to_owned(),
            description: "Syncs Terraform Cloud organizations, users, teams, projects, \
                          workspaces and agent tokens"
                .to_owned(),
            account_creation_schema: Some(account_creation_schema()),
        }
    }

    /// Always succeeds; the first list call exercises the credentials.
    async fn validate(&self, _cancel: &CancellationToken) -> Result<Annotations, ConnectorError> {
        Ok(Annotations::new())
    }

    fn resource_syncers(&self) -> Vec<Arc<dyn ResourceSyncer>> {
        let organizations: Arc<dyn ResourceSyncer> = self.organizations.clone();
        let users: Arc<dyn ResourceSyncer> = self.users.clone();
        let projects: Arc<dyn ResourceSyncer> = self.projects.clone();
        let workspaces: Arc<dyn ResourceSyncer> = self.workspaces.clone();
        let teams: Arc<dyn ResourceSyncer> = self.teams.clone();
        let agent_tokens: Arc<dyn ResourceSyncer> = self.agent_tokens.clone();
        vec![organizations, users, projects, workspaces, teams, agent_tokens]
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use identity_sync_sdk::{AccountInfo, EffectiveGrant, Profile, ResourceId, Syncer};
    use serde_json::json;

    use crate::client::{AgentPool, AgentToken, TeamProjectAccess};
    use crate::domain::resource_types::{ORGANIZATION, USER};
    use crate::test_support::{FakeTerraformCloud, membership, project, team, user, workspace};

    /// One organization where alice belongs to team `core`, `core` has admin
    /// on project `platform`, and workspace `network` lives in that project.
    fn acme() -> Arc<FakeTerraformCloud> {
        let alice = user("user-1", "alice", "alice@acme.test");
        let bob = user("user-2", "bob", "bob@acme.test");
        let mut fake = FakeTerraformCloud::default().with_organization("acme");
        fake.memberships.insert(
            "acme".to_owned(),
            vec![membership("ou-1", alice.clone()), membership("ou-2", bob)],
        );
        fake.teams
            .insert("acme".to_owned(), vec![team("team-1", "core", vec![alice])]);
        fake.projects
            .insert("acme".to_owned(), vec![project("prj-1", "platform")]);
        fake.team_projects.push(TeamProjectAccess {
            id: "tprj-1".to_owned(),
            access: "admin".to_owned(),
            team_id: "team-1".to_owned(),
            project_id: "prj-1".to_owned(),
        });
        fake.workspaces.insert(
            "acme".to_owned(),
            vec![workspace("ws-1", "network", Some("prj-1"))],
        );
        fake.agent_pools.insert(
            "acme".to_owned(),
            vec![AgentPool {
                id: "apool-1".to_owned(),
                name: "default".to_owned(),
            }],
        );
        fake.agent_tokens.insert(
            "apool-1".to_owned(),
            vec![AgentToken {
                id: "at-1".to_owned(),
                description: "ci".to_owned(),
                ..AgentToken::default()
            }],
        );
        Arc::new(fake)
    }

    #[test]
    fn builders_are_declared_in_order() {
        let connector = TerraformCloudConnector::with_client(acme());
        let ids: Vec<_> = connector
            .resource_syncers()
            .iter()
            .map(|s| s.resource_type().id)
            .collect();
        assert_eq!(
            ids,
            vec!["organization", "user", "project", "workspace", "team", "agentToken"]
        );
        assert!(connector.syncer("team").is_some());
        assert!(connector.syncer("variable").is_none());
    }

    #[test]
    fn only_users_create_accounts_and_only_orgs_and_teams_provision() {
        let connector = TerraformCloudConnector::with_client(acme());
        for syncer in connector.resource_syncers() {
            let id = syncer.resource_type().id;
            assert_eq!(syncer.as_account_manager().is_some(), id == "user", "{id}");
            assert_eq!(
                syncer.as_provisioner().is_some(),
                id == "organization" || id == "team",
                "{id}"
            );
        }
    }

    #[test]
    fn schema_requires_email_and_organization() {
        let metadata = TerraformCloudConnector::with_client(acme()).metadata();
        assert_eq!(metadata.display_name, "Terraform Cloud");
        let schema = metadata.account_creation_schema.unwrap();

        let mut profile = Profile::new();
        profile.insert("teamNames".to_owned(), json!(["core"]));
        assert_eq!(
            schema.missing_required(&AccountInfo::new(profile)),
            vec!["email", "organizationName"]
        );
        assert!(schema.fields["teamNames"].description.contains("owners"));
        assert_eq!(schema.fields["teamNames"].kind, FieldKind::StringList);
    }

    #[tokio::test]
    async fn validate_is_unconditional() {
        let connector = TerraformCloudConnector::with_client(acme());
        let annotations = connector
            .validate(&CancellationToken::new())
            .await
            .unwrap();
        assert!(annotations.is_empty());
    }

    #[tokio::test]
    async fn full_pass_expands_workspace_access_to_team_members() {
        let fake = acme();
        let connector = Arc::new(TerraformCloudConnector::with_client(fake.clone()));

        let snapshot = Syncer::new(connector)
            .run(&CancellationToken::new())
            .await
            .unwrap();

        let org = ORGANIZATION.resource_id("acme");
        for resource in &snapshot.resources {
            if resource.id == org {
                assert!(resource.parent_resource_id.is_none());
            } else {
                assert_eq!(resource.parent_resource_id.as_ref(), Some(&org), "{}", resource.id);
            }
        }
        assert_eq!(snapshot.resources_of("user").len(), 2);
        assert_eq!(snapshot.resources_of("agentToken").len(), 1);
        assert_eq!(fake.count("read_team"), 0);
        assert_eq!(fake.count("read_workspace"), 0);

        let effective = snapshot.expand_grants();
        let alice = USER.resource_id("user-1");
        let bob = USER.resource_id("user-2");
        let holds = |entitlement: &str, principal: &ResourceId| {
            effective.contains(&EffectiveGrant {
                entitlement_id: entitlement.to_owned(),
                principal: principal.clone(),
            })
        };
        assert!(holds("workspace:ws-1:member", &alice));
        assert!(holds("project:prj-1:admin", &alice));
        assert!(!holds("workspace:ws-1:member", &bob));
        assert!(holds("organization:acme:member", &bob));
    }
}
