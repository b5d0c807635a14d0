//! In-memory Terraform Cloud for builder tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::{
    AgentPool, AgentToken, ClientError, ListOptions, MembershipListOptions, Organization,
    OrganizationMembership, Paginated, Project, Team, TeamListOptions, TeamProjectAccess,
    TerraformCloudApi, User, Workspace,
};

/// Upstream state keyed by organization name, plus a log of every call.
#[derive(Default)]
pub struct FakeTerraformCloud {
    pub organizations: Vec<Organization>,
    pub memberships: HashMap<String, Vec<OrganizationMembership>>,
    pub teams: HashMap<String, Vec<Team>>,
    pub projects: HashMap<String, Vec<Project>>,
    pub team_projects: Vec<TeamProjectAccess>,
    pub workspaces: HashMap<String, Vec<Workspace>>,
    pub agent_pools: HashMap<String, Vec<AgentPool>>,
    pub agent_tokens: HashMap<String, Vec<AgentToken>>,
    /// Return every team from `list_teams`, as an upstream that drops the
    /// name filter would.
    pub ignores_team_filter: bool,
    /// Operation name that fails with a 500.
    pub failing: Option<&'static str>,
    /// Operation name that records its call and then never completes.
    pub stalling: Option<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl FakeTerraformCloud {
    pub fn with_organization(mut self, name: &str) -> Self {
        self.organizations.push(Organization {
            name: name.to_owned(),
            email: format!("admin@{name}.test"),
            ..Organization::default()
        });
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of recorded calls to `operation`.
    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.split(' ').next() == Some(operation))
            .count()
    }

    async fn record(&self, operation: &'static str, detail: &str) -> Result<(), ClientError> {
        self.calls.lock().push(format!("{operation} {detail}"));
        if self.stalling == Some(operation) {
            std::future::pending::<()>().await;
        }
        if self.failing == Some(operation) {
            return Err(ClientError::Status {
                status: 500,
                body: "boom".to_owned(),
            });
        }
        Ok(())
    }
}

pub fn user(id: &str, username: &str, email: &str) -> User {
    User {
        id: id.to_owned(),
        username: username.to_owned(),
        email: email.to_owned(),
        ..User::default()
    }
}

pub fn membership(id: &str, user: User) -> OrganizationMembership {
    OrganizationMembership {
        id: id.to_owned(),
        status: "active".to_owned(),
        email: user.email.clone(),
        user: Some(user),
    }
}

pub fn team(id: &str, name: &str, users: Vec<User>) -> Team {
    Team {
        id: id.to_owned(),
        name: name.to_owned(),
        visibility: "organization".to_owned(),
        user_count: users.len() as u64,
        is_unified: false,
        users,
    }
}

pub fn project(id: &str, name: &str) -> Project {
    Project {
        id: id.to_owned(),
        name: name.to_owned(),
        ..Project::default()
    }
}

pub fn workspace(id: &str, name: &str, project_id: Option<&str>) -> Workspace {
    Workspace {
        id: id.to_owned(),
        name: name.to_owned(),
        execution_mode: "remote".to_owned(),
        project_id: project_id.map(str::to_owned),
        ..Workspace::default()
    }
}

fn paginate<T: Clone>(items: &[T], options: ListOptions) -> Paginated<T> {
    let size = options.page_size as usize;
    let page = options.page_number.max(1) as usize;
    let total_pages = items.len().div_ceil(size).max(1);
    Paginated {
        items: items
            .iter()
            .skip((page - 1) * size)
            .take(size)
            .cloned()
            .collect(),
        current_page: options.page_number.max(1),
        total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
    }
}

#[async_trait]
impl TerraformCloudApi for FakeTerraformCloud {
    async fn list_organizations(
        &self,
        options: ListOptions,
    ) -> Result<Paginated<Organization>, ClientError> {
        self.record("list_organizations", &options.page_number.to_string()).await?;
        Ok(paginate(&self.organizations, options))
    }

    async fn list_organization_memberships(
        &self,
        organization: &str,
        options: &MembershipListOptions,
    ) -> Result<Paginated<OrganizationMembership>, ClientError> {
        self.record(
            "list_organization_memberships",
            &format!("{organization} {}", options.list.page_number),
        ).await?;
        let all = self.memberships.get(organization).cloned().unwrap_or_default();
        let matching: Vec<_> = all
            .into_iter()
            .filter(|m| options.email.as_ref().is_none_or(|e| &m.email == e))
            .collect();
        Ok(paginate(&matching, options.list))
    }

    async fn create_organization_membership(
        &self,
        organization: &str,
        email: &str,
        team_ids: &[String],
    ) -> Result<OrganizationMembership, ClientError> {
        self.record(
            "create_organization_membership",
            &format!("{organization} {email} {}", team_ids.join(",")),
        ).await?;
        Ok(OrganizationMembership {
            id: "ou-new".to_owned(),
            status: "invited".to_owned(),
            email: email.to_owned(),
            user: Some(user("user-new", "", email)),
        })
    }

    async fn delete_organization_membership(
        &self,
        membership_id: &str,
    ) -> Result<(), ClientError> {
        self.record("delete_organization_membership", membership_id).await
    }

    async fn list_teams(
        &self,
        organization: &str,
        options: &TeamListOptions,
    ) -> Result<Paginated<Team>, ClientError> {
        self.record(
            "list_teams",
            &format!("{organization} {}", options.names.join(",")),
        ).await?;
        let matching: Vec<_> = self
            .teams
            .get(organization)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|t| {
                self.ignores_team_filter
                    || options.names.is_empty()
                    || options.names.contains(&t.name)
            })
            .collect();
        Ok(paginate(&matching, options.list))
    }

    async fn read_team(&self, team_id: &str) -> Result<Team, ClientError> {
        self.record("read_team", team_id).await?;
        self.teams
            .values()
            .flatten()
            .find(|t| t.id == team_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("GET teams/{team_id}")))
    }

    async fn add_team_members(
        &self,
        team_id: &str,
        usernames: &[String],
    ) -> Result<(), ClientError> {
        self.record("add_team_members", &format!("{team_id} {}", usernames.join(","))).await
    }

    async fn remove_team_members(
        &self,
        team_id: &str,
        usernames: &[String],
    ) -> Result<(), ClientError> {
        self.record(
            "remove_team_members",
            &format!("{team_id} {}", usernames.join(",")),
        ).await
    }

    async fn list_projects(
        &self,
        organization: &str,
        options: ListOptions,
    ) -> Result<Paginated<Project>, ClientError> {
        self.record("list_projects", organization).await?;
        Ok(paginate(
            self.projects.get(organization).map_or(&[][..], Vec::as_slice),
            options,
        ))
    }

    async fn list_team_project_access(
        &self,
        project_id: &str,
        options: ListOptions,
    ) -> Result<Paginated<TeamProjectAccess>, ClientError> {
        self.record("list_team_project_access", project_id).await?;
        let rows: Vec<_> = self
            .team_projects
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect();
        Ok(paginate(&rows, options))
    }

    async fn list_workspaces(
        &self,
        organization: &str,
        options: ListOptions,
    ) -> Result<Paginated<Workspace>, ClientError> {
        self.record("list_workspaces", organization).await?;
        Ok(paginate(
            self.workspaces.get(organization).map_or(&[][..], Vec::as_slice),
            options,
        ))
    }

    async fn read_workspace(&self, workspace_id: &str) -> Result<Workspace, ClientError> {
        self.record("read_workspace", workspace_id).await?;
        self.workspaces
            .values()
            .flatten()
            .find(|w| w.id == workspace_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("GET workspaces/{workspace_id}")))
    }

    async fn list_agent_pools(
        &self,
        organization: &str,
        options: ListOptions,
    ) -> Result<Paginated<AgentPool>, ClientError> {
        self.record("list_agent_pools", organization).await?;
        Ok(paginate(
            self.agent_pools.get(organization).map_or(&[][..], Vec::as_slice),
            options,
        ))
    }

    async fn list_agent_tokens(&self, agent_pool_id: &str) -> Result<Vec<AgentToken>, ClientError> {
        self.record("list_agent_tokens", agent_pool_id).await?;
        Ok(self
            .agent_tokens
            .get(agent_pool_id)
            .cloned()
            .unwrap_or_default())
    }
}
