use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use identity_sync_sdk::{
    Annotations, ConnectorError, Entitlement, Grant, Page, PageToken, Profile, Resource,
    ResourceId, ResourceProvisioner, ResourceSyncer, ResourceType,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::resource_types::{TEAM, TEAM_MEMBER, USER};
use super::{guarded, page_from};
use crate::client::{ListOptions, Team, TeamListOptions, TerraformCloudApi, User};

/// Teams and their memberships.
///
/// Listing a page of teams includes their users; those are kept in memory so
/// `grants` does not re-read every team. A team not seen by `list` is read on
/// demand and not added to the cache.
pub struct TeamBuilder {
    client: Arc<dyn TerraformCloudApi>,
    members: Mutex<HashMap<String, Vec<User>>>,
}

impl TeamBuilder {
    pub fn new(client: Arc<dyn TerraformCloudApi>) -> Self {
        Self {
            client,
            members: Mutex::new(HashMap::new()),
        }
    }

    fn cache_members(&self, teams: &[Team]) {
        let mut members = self.members.lock();
        for team in teams {
            members.insert(team.id.clone(), team.users.clone());
        }
    }

    async fn team_members(
        &self,
        cancel: &CancellationToken,
        team_id: &str,
    ) -> Result<Vec<User>, ConnectorError> {
        let cached = self.members.lock().get(team_id).cloned();
        if let Some(users) = cached {
            debug!(team_id, "Team members cache hit");
            return Ok(users);
        }
        debug!(team_id, "Team members cache miss");
        let team = guarded(cancel, "get team members", self.client.read_team(team_id)).await?;
        Ok(team.users)
    }
}

fn team_resource(team: &Team, parent: &ResourceId) -> Resource {
    let mut profile = Profile::new();
    profile.insert("visibility".to_owned(), json!(team.visibility));
    profile.insert("userCount".to_owned(), json!(team.user_count));
    profile.insert("isUnified".to_owned(), json!(team.is_unified));
    Resource::group(&team.name, &TEAM, &team.id, profile).with_parent(parent)
}

/// Team membership is managed by username, which is the user's display name.
fn username(principal: &Resource) -> Result<Vec<String>, ConnectorError> {
    if principal.display_name.is_empty() {
        return Err(ConnectorError::profile_contract(
            "display_name",
            "is empty; team membership is managed by username",
        ));
    }
    Ok(vec![principal.display_name.clone()])
}

#[async_trait]
impl ResourceSyncer for TeamBuilder {
    fn resource_type(&self) -> &'static ResourceType {
        &TEAM
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
        let options = TeamListOptions {
            list: ListOptions::page(token.page()?),
            names: Vec::new(),
        };
        let teams = guarded(
            cancel,
            "list teams",
            self.client.list_teams(&parent.resource, &options),
        )
        .await?;
        self.cache_members(&teams.items);
        Ok(page_from(teams, |team| Some(team_resource(&team, parent))))
    }

    async fn entitlements(
        &self,
        _cancel: &CancellationToken,
        resource: &Resource,
        _token: &PageToken,
    ) -> Result<Page<Entitlement>, ConnectorError> {
        let label = format!("Member of {} team", resource.display_name);
        Ok(Page::single(vec![
            Entitlement::assignment(resource, TEAM_MEMBER)
                .with_grantable_to(&USER)
                .with_display_name(label.clone())
                .with_description(label),
        ]))
    }

    #[instrument(skip_all, fields(team_id = %resource.id.resource))]
    async fn grants(
        &self,
        cancel: &CancellationToken,
        resource: &Resource,
        _token: &PageToken,
    ) -> Result<Page<Grant>, ConnectorError> {
        let users = self.team_members(cancel, &resource.id.resource).await?;
        // Service accounts have no stable handle to grant or revoke against.
        let grants = users
            .into_iter()
            .filter(|user| !user.is_service_account)
            .map(|user| Grant::new(resource, TEAM_MEMBER, USER.resource_id(user.id)))
            .collect();
        Ok(Page::single(grants))
    }

    fn as_provisioner(&self) -> Option<&dyn ResourceProvisioner> {
        Some(self)
    }
}

#[async_trait]
impl ResourceProvisioner for TeamBuilder {
    #[instrument(skip_all, fields(entitlement = %entitlement.id))]
    async fn grant(
        &self,
        cancel: &CancellationToken,
        principal: &Resource,
        entitlement: &Entitlement,
    ) -> Result<Annotations, ConnectorError> {
        let team_id = &entitlement.resource.id.resource;
        let usernames = username(principal)?;
        guarded(
            cancel,
            "add user to team",
            self.client.add_team_members(team_id, &usernames),
        )
        .await?;
        info!(team_id, principal = %principal.id, "Added user to team");
        Ok(Annotations::new())
    }

    #[instrument(skip_all, fields(grant = %grant.id))]
    async fn revoke(
        &self,
        cancel: &CancellationToken,
        grant: &Grant,
    ) -> Result<Annotations, ConnectorError> {
        let team_id = &grant.entitlement.resource.id.resource;
        let usernames = username(&grant.principal)?;
        guarded(
            cancel,
            "remove user from team",
            self.client.remove_team_members(team_id, &usernames),
        )
        .await?;
        info!(team_id, principal = %grant.principal.id, "Removed user from team");
        Ok(Annotations::new())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::resource_types::ORGANIZATION;
    use crate::test_support::{FakeTerraformCloud, team, user};

    fn fake() -> Arc<FakeTerraformCloud> {
        let mut bot = user("user-bot", "ci-bot", "");
        bot.is_service_account = true;
        let mut fake = FakeTerraformCloud::default().with_organization("acme");
        fake.teams.insert(
            "acme".to_owned(),
            vec![team(
                "team-1",
                "core",
                vec![user("user-1", "alice", "alice@acme.test"), bot],
            )],
        );
        Arc::new(fake)
    }

    fn team_ref(id: &str) -> Resource {
        team_resource(
            &team(id, "core", vec![]),
            &ORGANIZATION.resource_id("acme"),
        )
    }

    #[tokio::test]
    async fn grants_use_members_cached_by_list() {
        let fake = fake();
        let builder = TeamBuilder::new(fake.clone());
        let cancel = CancellationToken::new();

        let teams = builder
            .list(
                &cancel,
                Some(&ORGANIZATION.resource_id("acme")),
                &PageToken::first(),
            )
            .await
            .unwrap();
        let team = &teams.items[0];
        assert_eq!(team.profile().unwrap()["userCount"], 2);

        let grants = builder
            .grants(&cancel, team, &PageToken::first())
            .await
            .unwrap();

        assert_eq!(fake.count("read_team"), 0);
        assert_eq!(
            grants.items.iter().map(|g| g.id.as_str()).collect::<Vec<_>>(),
            vec!["team:team-1:member:user:user-1"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn list_and_grants_share_the_builder_across_threads() {
        let mut fake = FakeTerraformCloud::default().with_organization("acme");
        fake.teams.insert(
            "acme".to_owned(),
            (1..=4)
                .map(|n| {
                    let member = user(&format!("user-{n}"), &format!("u{n}"), "");
                    team(&format!("team-{n}"), &format!("t{n}"), vec![member])
                })
                .collect(),
        );
        let fake = Arc::new(fake);
        let builder = Arc::new(TeamBuilder::new(fake.clone()));
        let org = ORGANIZATION.resource_id("acme");

        let spawn_grants = || {
            futures::future::join_all((1..=4).map(|n| {
                let builder = builder.clone();
                tokio::spawn(async move {
                    let team = team_ref(&format!("team-{n}"));
                    builder
                        .grants(&CancellationToken::new(), &team, &PageToken::first())
                        .await
                })
            }))
        };
        let list = {
            let builder = builder.clone();
            tokio::spawn(async move {
                builder
                    .list(&CancellationToken::new(), Some(&org), &PageToken::first())
                    .await
            })
        };

        let (listed, granted) = tokio::join!(list, spawn_grants());
        assert_eq!(listed.unwrap().unwrap().items.len(), 4);
        for (n, result) in (1..=4).zip(granted) {
            let page = result.unwrap().unwrap();
            assert_eq!(
                page.items.iter().map(|g| g.id.clone()).collect::<Vec<_>>(),
                vec![format!("team:team-{n}:member:user:user-{n}")]
            );
        }
        assert!(fake.count("read_team") <= 4);

        let reads = fake.count("read_team");
        for result in spawn_grants().await {
            assert_eq!(result.unwrap().unwrap().items.len(), 1);
        }
        assert_eq!(fake.count("read_team"), reads);
    }

    #[tokio::test]
    async fn cache_miss_reads_the_team_without_back_filling() {
        let fake = fake();
        let builder = TeamBuilder::new(fake.clone());
        let cancel = CancellationToken::new();
        let team = team_ref("team-1");

        for _ in 0..2 {
            let grants = builder
                .grants(&cancel, &team, &PageToken::first())
                .await
                .unwrap();
            assert_eq!(grants.items.len(), 1);
        }

        assert_eq!(fake.count("read_team"), 2);
    }

    #[tokio::test]
    async fn grant_and_revoke_use_the_principal_username() {
        let fake = fake();
        let builder = TeamBuilder::new(fake.clone());
        let cancel = CancellationToken::new();
        let team = team_ref("team-1");
        let entitlement = Entitlement::assignment(&team, TEAM_MEMBER);
        let principal = Resource::user("bob", &USER, "user-2", Profile::new());

        builder.grant(&cancel, &principal, &entitlement).await.unwrap();
        let mut grant = Grant::new(&team, TEAM_MEMBER, principal.id.clone());
        grant.principal = principal;
        builder.revoke(&cancel, &grant).await.unwrap();

        assert_eq!(
            fake.calls(),
            vec![
                "add_team_members team-1 bob".to_owned(),
                "remove_team_members team-1 bob".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn grant_without_username_is_rejected() {
        let fake = fake();
        let builder = TeamBuilder::new(fake.clone());
        let team = team_ref("team-1");
        let entitlement = Entitlement::assignment(&team, TEAM_MEMBER);
        let principal = Resource::reference(USER.resource_id("user-2"));

        let err = builder
            .grant(&CancellationToken::new(), &principal, &entitlement)
            .await
            .unwrap_err();

        assert!(matches!(err, ConnectorError::ProfileContract { .. }));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn cancelled_grants_issue_no_call() {
        let fake = fake();
        let builder = TeamBuilder::new(fake.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = builder
            .grants(&cancel, &team_ref("team-1"), &PageToken::first())
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(fake.calls().is_empty());
    }
}
