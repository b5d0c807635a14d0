//! The six resource kinds projected from Terraform Cloud.
//!
//! Organization is the only parentless kind; every other kind is listed
//! under an organization.

use identity_sync_sdk::{ResourceType, TraitKind};

pub static ORGANIZATION: ResourceType = ResourceType {
    id: "organization",
    display_name: "Organization",
    traits: &[TraitKind::Group],
    skip_entitlements_and_grants: false,
};

pub static USER: ResourceType = ResourceType {
    id: "user",
    display_name: "User",
    traits: &[TraitKind::User],
    skip_entitlements_and_grants: false,
};

/// Team management requires a paid plan upstream.
pub static TEAM: ResourceType = ResourceType {
    id: "team",
    display_name: "Team",
    traits: &[TraitKind::Group],
    skip_entitlements_and_grants: false,
};

pub static PROJECT: ResourceType = ResourceType {
    id: "project",
    display_name: "Project",
    traits: &[TraitKind::Group],
    skip_entitlements_and_grants: false,
};

pub static WORKSPACE: ResourceType = ResourceType {
    id: "workspace",
    display_name: "Workspace",
    traits: &[TraitKind::Group],
    skip_entitlements_and_grants: false,
};

pub static AGENT_TOKEN: ResourceType = ResourceType {
    id: "agentToken",
    display_name: "Agent Token",
    traits: &[TraitKind::Secret],
    skip_entitlements_and_grants: true,
};

/// Kinds listed under an organization, in listing order.
pub static ORGANIZATION_CHILDREN: [&ResourceType; 5] =
    [&USER, &TEAM, &PROJECT, &WORKSPACE, &AGENT_TOKEN];

pub const ORGANIZATION_MEMBER: &str = "member";
pub const TEAM_MEMBER: &str = "member";
pub const WORKSPACE_MEMBER: &str = "member";

/// Project team-access levels, in the order entitlements are emitted.
pub const PROJECT_ACCESS_LEVELS: [&str; 5] = ["read", "write", "maintain", "admin", "custom"];
