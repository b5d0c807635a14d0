//! Upstream client adapter.
//!
//! [`TerraformCloudApi`] is the seam between the builders and the platform:
//! one method per noun operation, every list call paged with [`ListOptions`].
//! [`HttpTerraformCloudClient`] implements it over the JSON:API endpoints.

mod error;
mod http;
mod jsonapi;
pub mod models;

use async_trait::async_trait;

pub use error::ClientError;
pub use http::HttpTerraformCloudClient;
pub use models::{
    AgentPool, AgentToken, Organization, OrganizationMembership, Project, Team, TeamProjectAccess,
    TwoFactor, User, Workspace,
};

/// Fixed page size for every paged list call.
pub const PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// 1-based.
    pub page_number: u32,
    pub page_size: u32,
}

impl ListOptions {
    #[must_use]
    pub fn page(page_number: u32) -> Self {
        Self {
            page_number,
            page_size: PAGE_SIZE,
        }
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        Self::page(1)
    }
}

/// Organization memberships are always listed with their user included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipListOptions {
    pub list: ListOptions,
    /// Only memberships whose email matches.
    pub email: Option<String>,
}

/// Teams are always listed with their users included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamListOptions {
    pub list: ListOptions,
    /// Only teams with one of these names.
    pub names: Vec<String>,
}

/// One page of a list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
}

impl<T> Paginated<T> {
    /// A single-page result, for calls the upstream does not paginate.
    #[must_use]
    pub fn single(items: Vec<T>) -> Self {
        Self {
            items,
            current_page: 1,
            total_pages: 1,
        }
    }
}

/// Typed access to the Terraform Cloud API.
///
/// Implementations must be safe for concurrent use; builders share one
/// instance behind an `Arc`.
#[async_trait]
pub trait TerraformCloudApi: Send + Sync {
    async fn list_organizations(
        &self,
        options: ListOptions,
    ) -> Result<Paginated<Organization>, ClientError>;

    async fn list_organization_memberships(
        &self,
        organization: &str,
        options: &MembershipListOptions,
    ) -> Result<Paginated<OrganizationMembership>, ClientError>;

    /// Invite `email` into `organization` as a member of `team_ids`.
    async fn create_organization_membership(
        &self,
        organization: &str,
        email: &str,
        team_ids: &[String],
    ) -> Result<OrganizationMembership, ClientError>;

    async fn delete_organization_membership(&self, membership_id: &str)
    -> Result<(), ClientError>;

    async fn list_teams(
        &self,
        organization: &str,
        options: &TeamListOptions,
    ) -> Result<Paginated<Team>, ClientError>;

    /// Single team with its users.
    async fn read_team(&self, team_id: &str) -> Result<Team, ClientError>;

    async fn add_team_members(&self, team_id: &str, usernames: &[String])
    -> Result<(), ClientError>;

    async fn remove_team_members(
        &self,
        team_id: &str,
        usernames: &[String],
    ) -> Result<(), ClientError>;

    async fn list_projects(
        &self,
        organization: &str,
        options: ListOptions,
    ) -> Result<Paginated<Project>, ClientError>;

    async fn list_team_project_access(
        &self,
        project_id: &str,
        options: ListOptions,
    ) -> Result<Paginated<TeamProjectAccess>, ClientError>;

    async fn list_workspaces(
        &self,
        organization: &str,
        options: ListOptions,
    ) -> Result<Paginated<Workspace>, ClientError>;

    async fn read_workspace(&self, workspace_id: &str) -> Result<Workspace, ClientError>;

    async fn list_agent_pools(
        &self,
        organization: &str,
        options: ListOptions,
    ) -> Result<Paginated<AgentPool>, ClientError>;

    /// Every token of one pool. Not paginated.
    async fn list_agent_tokens(&self, agent_pool_id: &str) -> Result<Vec<AgentToken>, ClientError>;
}
