//! Upstream entities as the builders see them, decoupled from the JSON:API
//! wire shape.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Organization {
    /// Organizations are addressed by name; there is no separate opaque ID.
    pub name: String,
    pub email: String,
    pub cost_estimation_enabled: bool,
    pub two_factor_conformant: bool,
    pub default_project_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TwoFactor {
    pub enabled: bool,
    pub verified: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub id: String,
    /// Empty while the invitation is pending.
    pub username: String,
    pub email: String,
    pub is_admin: Option<bool>,
    pub is_service_account: bool,
    pub two_factor: TwoFactor,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationMembership {
    pub id: String,
    /// `active` or `invited`.
    pub status: String,
    pub email: String,
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub visibility: String,
    pub user_count: u64,
    pub is_unified: bool,
    /// Populated only when the request included `users`.
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_unified: bool,
}

/// One row of the team-to-project access table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamProjectAccess {
    pub id: String,
    /// `read`, `write`, `maintain`, `admin` or `custom`.
    pub access: String,
    pub team_id: String,
    pub project_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub working_directory: String,
    pub terraform_version: String,
    pub runs_count: u64,
    pub source_name: String,
    pub source_url: String,
    pub environment: String,
    pub allow_destroy_plan: bool,
    pub auto_apply: bool,
    pub resource_count: u64,
    pub execution_mode: String,
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentPool {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentToken {
    pub id: String,
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}
