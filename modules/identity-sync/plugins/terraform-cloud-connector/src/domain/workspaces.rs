use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use identity_sync_sdk::{
    Annotation, ConnectorError, Entitlement, Grant, Page, PageToken, Profile, Resource,
    ResourceId, ResourceSyncer, ResourceType, entitlement_id,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::resource_types::{PROJECT, PROJECT_ACCESS_LEVELS, USER, WORKSPACE, WORKSPACE_MEMBER};
use super::{guarded, page_from};
use crate::client::{ListOptions, TerraformCloudApi, Workspace};

/// Workspaces inherit their membership from the owning project.
///
/// `list` remembers which project each workspace belongs to; `grants` falls
/// back to reading the workspace for IDs it has not seen.
pub struct WorkspaceBuilder {
    client: Arc<dyn TerraformCloudApi>,
    projects: Mutex<HashMap<String, String>>,
}

impl WorkspaceBuilder {
    pub fn new(client: Arc<dyn TerraformCloudApi>) -> Self {
        Self {
            client,
            projects: Mutex::new(HashMap::new()),
        }
    }

    fn cache_projects(&self, workspaces: &[Workspace]) {
        let mut projects = self.projects.lock();
        for workspace in workspaces {
            if let Some(project_id) = &workspace.project_id {
                projects.insert(workspace.id.clone(), project_id.clone());
            }
        }
    }

    async fn project_of(
        &self,
        cancel: &CancellationToken,
        workspace_id: &str,
    ) -> Result<Option<String>, ConnectorError> {
        let cached = self.projects.lock().get(workspace_id).cloned();
        if cached.is_some() {
            return Ok(cached);
        }
        debug!(workspace_id, "Workspace project cache miss");
        let workspace = guarded(
            cancel,
            "get workspace",
            self.client.read_workspace(workspace_id),
        )
        .await?;
        Ok(workspace.project_id)
    }
}

fn workspace_resource(workspace: &Workspace, parent: &ResourceId) -> Resource {
    let mut profile = Profile::new();
    profile.insert(
        "workingDirectory".to_owned(),
        json!(workspace.working_directory),
    );
    profile.insert(
        "terraformVersion".to_owned(),
        json!(workspace.terraform_version),
    );
    profile.insert("runsCount".to_owned(), json!(workspace.runs_count));
    profile.insert("sourceName".to_owned(), json!(workspace.source_name));
    profile.insert("sourceURL".to_owned(), json!(workspace.source_url));
    profile.insert("environment".to_owned(), json!(workspace.environment));
    profile.insert(
        "allowDestroyPlan".to_owned(),
        json!(workspace.allow_destroy_plan),
    );
    profile.insert("autoApply".to_owned(), json!(workspace.auto_apply));
    profile.insert("resourceCount".to_owned(), json!(workspace.resource_count));
    profile.insert("executionMode".to_owned(), json!(workspace.execution_mode));
    Resource::group(&workspace.name, &WORKSPACE, &workspace.id, profile).with_parent(parent)
}

#[async_trait]
impl ResourceSyncer for WorkspaceBuilder {
    fn resource_type(&self) -> &'static ResourceType {
        &WORKSPACE
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
        let workspaces = guarded(
            cancel,
            "list workspaces",
            self.client
                .list_workspaces(&parent.resource, ListOptions::page(token.page()?)),
        )
        .await?;
        self.cache_projects(&workspaces.items);
        Ok(page_from(workspaces, |workspace| {
            Some(workspace_resource(&workspace, parent))
        }))
    }

    async fn entitlements(
        &self,
        _cancel: &CancellationToken,
        resource: &Resource,
        _token: &PageToken,
    ) -> Result<Page<Entitlement>, ConnectorError> {
        let label = format!("Member of {} workspace", resource.display_name);
        Ok(Page::single(vec![
            Entitlement::assignment(resource, WORKSPACE_MEMBER)
                .with_grantable_to(&USER)
                .with_display_name(label.clone())
                .with_description(label),
        ]))
    }

    /// A single grant to the owning project, expandable through every
    /// project access level.
    #[instrument(skip_all, fields(workspace_id = %resource.id.resource))]
    async fn grants(
        &self,
        cancel: &CancellationToken,
        resource: &Resource,
        _token: &PageToken,
    ) -> Result<Page<Grant>, ConnectorError> {
        let Some(project_id) = self.project_of(cancel, &resource.id.resource).await? else {
            warn!("Workspace has no project; no membership grant emitted");
            return Ok(Page::empty());
        };
        let project = PROJECT.resource_id(project_id);
        let expand = PROJECT_ACCESS_LEVELS
            .iter()
            .map(|level| entitlement_id(&project, level))
            .collect();
        Ok(Page::single(vec![
            Grant::new(resource, WORKSPACE_MEMBER, project)
                .with_annotation(Annotation::grant_expandable(expand)),
        ]))
    }
}
