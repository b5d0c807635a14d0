//! JSON:API wire shapes and their conversion into [`super::models`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ClientError;
use super::models::{
    AgentPool, AgentToken, Organization, OrganizationMembership, Project, Team, TeamProjectAccess,
    TwoFactor, User, Workspace,
};

pub const MEDIA_TYPE: &str = "application/vnd.api+json";

#[derive(Debug, Deserialize)]
pub struct Document<D> {
    pub data: D,
    #[serde(default)]
    pub included: Vec<Resource<Value>>,
    #[serde(default)]
    pub meta: Meta,
}

#[derive(Debug, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resource<A> {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: A,
    #[serde(default)]
    pub relationships: HashMap<String, Relationship>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<Linkage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    One(Identifier),
    Many(Vec<Identifier>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Identifier {
    pub id: String,
}

impl<A> Resource<A> {
    fn related_id(&self, name: &str) -> Option<&str> {
        match self.relationships.get(name)?.data.as_ref()? {
            Linkage::One(identifier) => Some(identifier.id.as_str()),
            Linkage::Many(_) => None,
        }
    }

    fn related_ids(&self, name: &str) -> Vec<&str> {
        match self.relationships.get(name).and_then(|r| r.data.as_ref()) {
            Some(Linkage::Many(identifiers)) => identifiers.iter().map(|i| i.id.as_str()).collect(),
            Some(Linkage::One(identifier)) => vec![identifier.id.as_str()],
            None => Vec::new(),
        }
    }
}

impl<D> Document<D> {
    /// `(current_page, total_pages)`; a response without pagination meta is one page.
    pub fn pages(&self) -> (u32, u32) {
        self.meta
            .pagination
            .as_ref()
            .map_or((1, 1), |p| (p.current_page, p.total_pages))
    }

    /// Attributes of the included resource `(kind, id)`, if it was included.
    fn included<A: DeserializeOwned>(
        &self,
        kind: &str,
        id: &str,
    ) -> Result<Option<A>, ClientError> {
        self.included
            .iter()
            .find(|r| r.kind == kind && r.id == id)
            .map(|r| serde_json::from_value(r.attributes.clone()))
            .transpose()
            .map_err(ClientError::from)
    }

    /// Included user `id`, or a bare user carrying only the ID.
    fn included_user(&self, id: &str) -> Result<User, ClientError> {
        Ok(self
            .included::<UserAttributes>("users", id)?
            .map_or_else(
                || User {
                    id: id.to_owned(),
                    ..User::default()
                },
                |attrs| attrs.into_user(id),
            ))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OrganizationAttributes {
    pub email: Option<String>,
    pub cost_estimation_enabled: bool,
    pub two_factor_conformant: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAttributes {
    pub username: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
    pub is_service_account: bool,
    pub two_factor: TwoFactorAttributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TwoFactorAttributes {
    pub enabled: bool,
    pub verified: bool,
}

impl UserAttributes {
    fn into_user(self, id: &str) -> User {
        User {
            id: id.to_owned(),
            username: self.username.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            is_admin: self.is_admin,
            is_service_account: self.is_service_account,
            two_factor: TwoFactor {
                enabled: self.two_factor.enabled,
                verified: self.two_factor.verified,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MembershipAttributes {
    pub status: String,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TeamAttributes {
    pub name: String,
    pub visibility: Option<String>,
    pub users_count: u64,
    pub is_unified: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProjectAttributes {
    pub name: String,
    pub description: Option<String>,
    pub is_unified: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TeamProjectAttributes {
    pub access: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WorkspaceAttributes {
    pub name: String,
    pub working_directory: Option<String>,
    pub terraform_version: Option<String>,
    #[serde(rename = "workspace-kpis-runs-count")]
    pub runs_count: Option<u64>,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
    pub environment: Option<String>,
    pub allow_destroy_plan: bool,
    pub auto_apply: bool,
    pub resource_count: u64,
    pub execution_mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AgentPoolAttributes {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AgentTokenAttributes {
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}

pub type ListDocument<A> = Document<Vec<Resource<A>>>;
pub type SingleDocument<A> = Document<Resource<A>>;

impl ListDocument<OrganizationAttributes> {
    pub fn into_organizations(self) -> Result<Vec<Organization>, ClientError> {
        self.data
            .iter()
            .map(|org| {
                let default_project_name = match org.related_id("default-project") {
                    Some(id) => self
                        .included::<ProjectAttributes>("projects", id)?
                        .map(|p| p.name),
                    None => None,
                };
                Ok(Organization {
                    name: org.id.clone(),
                    email: org.attributes.email.clone().unwrap_or_default(),
                    cost_estimation_enabled: org.attributes.cost_estimation_enabled,
                    two_factor_conformant: org.attributes.two_factor_conformant,
                    default_project_name,
                })
            })
            .collect()
    }
}

impl ListDocument<MembershipAttributes> {
    pub fn into_memberships(self) -> Result<Vec<OrganizationMembership>, ClientError> {
        self.data
            .iter()
            .map(|membership| membership_from(&self, membership))
            .collect()
    }
}

impl SingleDocument<MembershipAttributes> {
    pub fn into_membership(self) -> Result<OrganizationMembership, ClientError> {
        membership_from(&self, &self.data)
    }
}

fn membership_from<D>(
    doc: &Document<D>,
    membership: &Resource<MembershipAttributes>,
) -> Result<OrganizationMembership, ClientError> {
    let user = membership
        .related_id("user")
        .map(|id| doc.included_user(id))
        .transpose()?;
    Ok(OrganizationMembership {
        id: membership.id.clone(),
        status: membership.attributes.status.clone(),
        email: membership.attributes.email.clone().unwrap_or_default(),
        user,
    })
}

impl ListDocument<TeamAttributes> {
    pub fn into_teams(self) -> Result<Vec<Team>, ClientError> {
        self.data.iter().map(|team| team_from(&self, team)).collect()
    }
}

impl SingleDocument<TeamAttributes> {
    pub fn into_team(self) -> Result<Team, ClientError> {
        team_from(&self, &self.data)
    }
}

fn team_from<D>(doc: &Document<D>, team: &Resource<TeamAttributes>) -> Result<Team, ClientError> {
    let users = team
        .related_ids("users")
        .into_iter()
        .map(|id| doc.included_user(id))
        .collect::<Result<_, _>>()?;
    Ok(Team {
        id: team.id.clone(),
        name: team.attributes.name.clone(),
        visibility: team.attributes.visibility.clone().unwrap_or_default(),
        user_count: team.attributes.users_count,
        is_unified: team.attributes.is_unified,
        users,
    })
}

impl ListDocument<ProjectAttributes> {
    pub fn into_projects(self) -> Vec<Project> {
        self.data
            .into_iter()
            .map(|project| Project {
                id: project.id,
                name: project.attributes.name,
                description: project.attributes.description.unwrap_or_default(),
                is_unified: project.attributes.is_unified,
            })
            .collect()
    }
}

impl ListDocument<TeamProjectAttributes> {
    pub fn into_team_project_access(self) -> Result<Vec<TeamProjectAccess>, ClientError> {
        self.data
            .iter()
            .map(|row| {
                let team_id = row.related_id("team").ok_or_else(|| {
                    ClientError::Malformed(format!("team-project {} has no team", row.id))
                })?;
                Ok(TeamProjectAccess {
                    id: row.id.clone(),
                    access: row.attributes.access.clone(),
                    team_id: team_id.to_owned(),
                    project_id: row.related_id("project").unwrap_or_default().to_owned(),
                })
            })
            .collect()
    }
}

fn workspace_from(workspace: Resource<WorkspaceAttributes>) -> Workspace {
    let project_id = workspace.related_id("project").map(str::to_owned);
    let attrs = workspace.attributes;
    Workspace {
        id: workspace.id,
        name: attrs.name,
        working_directory: attrs.working_directory.unwrap_or_default(),
        terraform_version: attrs.terraform_version.unwrap_or_default(),
        runs_count: attrs.runs_count.unwrap_or_default(),
        source_name: attrs.source_name.unwrap_or_default(),
        source_url: attrs.source_url.unwrap_or_default(),
        environment: attrs.environment.unwrap_or_default(),
        allow_destroy_plan: attrs.allow_destroy_plan,
        auto_apply: attrs.auto_apply,
        resource_count: attrs.resource_count,
        execution_mode: attrs.execution_mode.unwrap_or_default(),
        project_id,
    }
}

impl ListDocument<WorkspaceAttributes> {
    pub fn into_workspaces(self) -> Vec<Workspace> {
        self.data.into_iter().map(workspace_from).collect()
    }
}

impl SingleDocument<WorkspaceAttributes> {
    pub fn into_workspace(self) -> Workspace {
        workspace_from(self.data)
    }
}

impl ListDocument<AgentPoolAttributes> {
    pub fn into_agent_pools(self) -> Vec<AgentPool> {
        self.data
            .into_iter()
            .map(|pool| AgentPool {
                id: pool.id,
                name: pool.attributes.name,
            })
            .collect()
    }
}

impl ListDocument<AgentTokenAttributes> {
    pub fn into_agent_tokens(self) -> Vec<AgentToken> {
        self.data
            .into_iter()
            .map(|token| AgentToken {
                id: token.id,
                description: token.attributes.description.unwrap_or_default(),
                created_at: token.attributes.created_at,
                last_used_at: token.attributes.last_used_at,
            })
            .collect()
    }
}
