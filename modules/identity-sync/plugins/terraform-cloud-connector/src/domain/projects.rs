use std::sync::Arc;

use async_trait::async_trait;
use identity_sync_sdk::{
    Annotation, ConnectorError, Entitlement, Grant, Page, PageToken, Profile, Resource,
    ResourceId, ResourceSyncer, ResourceType, entitlement_id,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use super::resource_types::{PROJECT, PROJECT_ACCESS_LEVELS, TEAM, TEAM_MEMBER, USER};
use super::{guarded, page_from};
use crate::client::{ListOptions, Project, TeamProjectAccess, TerraformCloudApi};

pub struct ProjectBuilder {
    client: Arc<dyn TerraformCloudApi>,
}

impl ProjectBuilder {
    pub fn new(client: Arc<dyn TerraformCloudApi>) -> Self {
        Self { client }
    }
}

fn project_resource(project: &Project, parent: &ResourceId) -> Resource {
    let mut profile = Profile::new();
    profile.insert("description".to_owned(), json!(project.description));
    profile.insert("isUnified".to_owned(), json!(project.is_unified));
    Resource::group(&project.name, &PROJECT, &project.id, profile).with_parent(parent)
}

/// One grant per team-access row: the team holds the access level and
/// every member of the team inherits it.
fn access_grant(project: &Resource, row: &TeamProjectAccess) -> Option<Grant> {
    if !PROJECT_ACCESS_LEVELS.contains(&row.access.as_str()) {
        warn!(
            access = %row.access,
            team_id = %row.team_id,
            "Unknown project access level; skipping"
        );
        return None;
    }
    let team = TEAM.resource_id(&row.team_id);
    let expand = vec![entitlement_id(&team, TEAM_MEMBER)];
    Some(
        Grant::new(project, &row.access, team)
            .with_annotation(Annotation::grant_expandable(expand)),
    )
}

#[async_trait]
impl ResourceSyncer for ProjectBuilder {
    fn resource_type(&self) -> &'static ResourceType {
        &PROJECT
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
        let projects = guarded(
            cancel,
            "list projects",
            self.client
                .list_projects(&parent.resource, ListOptions::page(token.page()?)),
        )
        .await?;
        Ok(page_from(projects, |project| {
            Some(project_resource(&project, parent))
        }))
    }

    async fn entitlements(
        &self,
        _cancel: &CancellationToken,
        resource: &Resource,
        _token: &PageToken,
    ) -> Result<Page<Entitlement>, ConnectorError> {
        Ok(Page::single(
            PROJECT_ACCESS_LEVELS
                .iter()
                .map(|level| {
                    let label = format!("Project access level {level}");
                    Entitlement::assignment(resource, level)
                        .with_grantable_to(&USER)
                        .with_display_name(label.clone())
                        .with_description(label)
                })
                .collect(),
        ))
    }

    #[instrument(skip_all, fields(project_id = %resource.id.resource, page = %token))]
    async fn grants(
        &self,
        cancel: &CancellationToken,
        resource: &Resource,
        token: &PageToken,
    ) -> Result<Page<Grant>, ConnectorError> {
        let rows = guarded(
            cancel,
            "list team project access",
            self.client
                .list_team_project_access(&resource.id.resource, ListOptions::page(token.page()?)),
        )
        .await?;
        Ok(page_from(rows, |row| access_grant(resource, &row)))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::resource_types::ORGANIZATION;
    use crate::test_support::{FakeTerraformCloud, project};
    use tracing_test::traced_test;

    fn access(id: &str, team_id: &str, level: &str) -> TeamProjectAccess {
        TeamProjectAccess {
            id: id.to_owned(),
            access: level.to_owned(),
            team_id: team_id.to_owned(),
            project_id: "prj-1".to_owned(),
        }
    }

    fn project_ref() -> Resource {
        project_resource(&project("prj-1", "platform"), &ORGANIZATION.resource_id("acme"))
    }

    #[tokio::test]
    async fn five_access_levels_in_order() {
        let builder = ProjectBuilder::new(Arc::new(FakeTerraformCloud::default()));
        let page = builder
            .entitlements(&CancellationToken::new(), &project_ref(), &PageToken::first())
            .await
            .unwrap();

        assert_eq!(
            page.items.iter().map(|e| e.slug.as_str()).collect::<Vec<_>>(),
            vec!["read", "write", "maintain", "admin", "custom"]
        );
        assert_eq!(page.items[3].id, "project:prj-1:admin");
        assert_eq!(page.items[3].description, "Project access level admin");
    }

    #[tokio::test]
    async fn team_access_becomes_an_expandable_grant() {
        let mut fake = FakeTerraformCloud::default();
        fake.team_projects.push(access("tprj-1", "t1", "admin"));
        let builder = ProjectBuilder::new(Arc::new(fake));

        let page = builder
            .grants(&CancellationToken::new(), &project_ref(), &PageToken::first())
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        let grant = &page.items[0];
        assert_eq!(grant.entitlement.resource.id, PROJECT.resource_id("prj-1"));
        assert_eq!(grant.entitlement.slug, "admin");
        assert_eq!(grant.principal.id, TEAM.resource_id("t1"));
        assert_eq!(
            grant.expandable_entitlement_ids(),
            Some(["team:t1:member".to_owned()].as_slice())
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn one_grant_per_row_with_known_levels_only() {
        let mut fake = FakeTerraformCloud::default();
        fake.team_projects.extend([
            access("tprj-1", "t1", "read"),
            access("tprj-2", "t2", "custom"),
            access("tprj-3", "t3", "owner"),
        ]);
        let builder = ProjectBuilder::new(Arc::new(fake));

        let page = builder
            .grants(&CancellationToken::new(), &project_ref(), &PageToken::first())
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert!(
            page.items
                .iter()
                .all(|g| PROJECT_ACCESS_LEVELS.contains(&g.entitlement.slug.as_str()))
        );
        assert!(logs_contain("Unknown project access level"));
    }

    #[tokio::test]
    async fn lists_projects_under_the_organization() {
        let mut fake = FakeTerraformCloud::default();
        fake.projects
            .insert("acme".to_owned(), vec![project("prj-1", "platform")]);
        let builder = ProjectBuilder::new(Arc::new(fake));
        let org = ORGANIZATION.resource_id("acme");

        let page = builder
            .list(&CancellationToken::new(), Some(&org), &PageToken::first())
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].parent_resource_id.as_ref(), Some(&org));
        assert_eq!(page.items[0].display_name, "platform");
    }
}
