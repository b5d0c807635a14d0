//! Sync driver: walks a connector's builders in parent→child order and
//! collects one in-memory snapshot of the resource graph.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::api::{Connector, ResourceSyncer};
use crate::error::ConnectorError;
use crate::models::{Entitlement, Grant, Resource, ResourceId, ResourceType, TraitKind};
use crate::pagination::{Page, PageToken};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Resources whose entitlements and grants are fetched concurrently.
    pub concurrency: usize,
    /// Upper bound on pages in one pagination chain.
    pub max_pages: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            max_pages: 10_000,
        }
    }
}

/// Result of one sync pass. Nothing here outlives the pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSnapshot {
    pub resource_types: Vec<ResourceType>,
    pub resources: Vec<Resource>,
    pub entitlements: Vec<Entitlement>,
    pub grants: Vec<Grant>,
}

/// An `(entitlement, principal)` pair after grant expansion.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct EffectiveGrant {
    pub entitlement_id: String,
    pub principal: ResourceId,
}

impl SyncSnapshot {
    #[must_use]
    pub fn resources_of(&self, resource_type_id: &str) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|r| r.id.resource_type == resource_type_id)
            .collect()
    }

    #[must_use]
    pub fn grants_on(&self, resource: &ResourceId) -> Vec<&Grant> {
        self.grants
            .iter()
            .filter(|g| &g.entitlement.resource.id == resource)
            .collect()
    }

    /// Fan expandable grants out to the principals that ultimately hold them.
    ///
    /// For an expandable grant of entitlement `E`, every holder of one of the
    /// listed entitlement IDs also holds `E`. Expansion is transitive and
    /// terminates on cycles. Only principals of user-trait types are returned.
    #[must_use]
    pub fn expand_grants(&self) -> BTreeSet<EffectiveGrant> {
        let mut holders: HashMap<&str, BTreeSet<&ResourceId>> = HashMap::new();
        let mut edges: Vec<(&str, &str)> = Vec::new();

        for grant in &self.grants {
            holders
                .entry(grant.entitlement.id.as_str())
                .or_default()
                .insert(&grant.principal.id);
            if let Some(sources) = grant.expandable_entitlement_ids() {
                for source in sources {
                    edges.push((source.as_str(), grant.entitlement.id.as_str()));
                }
            }
        }

        let mut changed = true;
        while changed {
            changed = false;
            for (source, target) in &edges {
                let Some(inherited) = holders.get(source).cloned() else {
                    continue;
                };
                let entry = holders.entry(*target).or_default();
                for principal in inherited {
                    changed |= entry.insert(principal);
                }
            }
        }

        let user_types: BTreeSet<&str> = self
            .resource_types
            .iter()
            .filter(|rt| rt.has_trait(TraitKind::User))
            .map(|rt| rt.id)
            .collect();

        holders
            .into_iter()
            .flat_map(|(entitlement_id, principals)| {
                principals.into_iter().map(move |p| (entitlement_id, p))
            })
            .filter(|(_, principal)| user_types.contains(principal.resource_type.as_str()))
            .map(|(entitlement_id, principal)| EffectiveGrant {
                entitlement_id: entitlement_id.to_owned(),
                principal: principal.clone(),
            })
            .collect()
    }
}

/// Drives every builder of a connector through one sync pass.
pub struct Syncer<C: ?Sized> {
    connector: Arc<C>,
    options: SyncOptions,
}

impl<C: Connector + ?Sized> Syncer<C> {
    pub fn new(connector: Arc<C>) -> Self {
        Self {
            connector,
            options: SyncOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one sync pass.
    ///
    /// # Errors
    ///
    /// Returns the first builder error, or `Cancelled` once `cancel` fires.
    #[instrument(skip_all)]
    pub async fn run(&self, cancel: &CancellationToken) -> Result<SyncSnapshot, ConnectorError> {
        let syncers = self.connector.resource_syncers();
        let by_type: HashMap<&'static str, Arc<dyn ResourceSyncer>> = syncers
            .iter()
            .map(|s| (s.resource_type().id, Arc::clone(s)))
            .collect();

        let mut snapshot = SyncSnapshot {
            resource_types: syncers.iter().map(|s| *s.resource_type()).collect(),
            ..SyncSnapshot::default()
        };

        let mut queue = VecDeque::new();
        for syncer in &syncers {
            queue.extend(self.list_all(cancel, syncer.as_ref(), None).await?);
        }

        while let Some(resource) = queue.pop_front() {
            for child_type in resource.annotations.child_resource_types() {
                let Some(child) = by_type.get(child_type) else {
                    warn!(
                        parent = %resource.id,
                        child_type,
                        "No builder registered for child resource type"
                    );
                    continue;
                };
                queue.extend(
                    self.list_all(cancel, child.as_ref(), Some(&resource.id))
                        .await?,
                );
            }
            snapshot.resources.push(resource);
        }

        let targets: Vec<(&dyn ResourceSyncer, &Resource)> = snapshot
            .resources
            .iter()
            .filter_map(|resource| {
                let syncer = by_type.get(resource.id.resource_type.as_str())?;
                (!syncer.resource_type().skip_entitlements_and_grants)
                    .then_some((syncer.as_ref(), resource))
            })
            .collect();

        let collected: Vec<(Vec<Entitlement>, Vec<Grant>)> = stream::iter(targets)
            .map(move |(syncer, resource)| async move {
                let entitlements = self
                    .drain(cancel, &resource.id, move |token| async move {
                        syncer.entitlements(cancel, resource, &token).await
                    })
                    .await?;
                let grants = self
                    .drain(cancel, &resource.id, move |token| async move {
                        syncer.grants(cancel, resource, &token).await
                    })
                    .await?;
                Ok::<_, ConnectorError>((entitlements, grants))
            })
            .buffered(self.options.concurrency.max(1))
            .try_collect()
            .await?;

        for (entitlements, grants) in collected {
            snapshot.entitlements.extend(entitlements);
            snapshot.grants.extend(grants);
        }

        info!(
            resources = snapshot.resources.len(),
            entitlements = snapshot.entitlements.len(),
            grants = snapshot.grants.len(),
            "Sync pass complete"
        );
        Ok(snapshot)
    }

    async fn list_all(
        &self,
        cancel: &CancellationToken,
        syncer: &dyn ResourceSyncer,
        parent: Option<&ResourceId>,
    ) -> Result<Vec<Resource>, ConnectorError> {
        let resource_type = syncer.resource_type().id;
        let resources = self
            .drain(cancel, resource_type, move |token| async move {
                syncer.list(cancel, parent, &token).await
            })
            .await?;
        debug!(
            resource_type,
            parent = ?parent.map(ToString::to_string),
            count = resources.len(),
            "Listed resources"
        );
        Ok(resources)
    }

    /// Follow one pagination chain to its end.
    async fn drain<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        chain: &(impl std::fmt::Display + ?Sized),
        mut fetch: F,
    ) -> Result<Vec<T>, ConnectorError>
    where
        F: FnMut(PageToken) -> Fut,
        Fut: Future<Output = Result<Page<T>, ConnectorError>>,
    {
        let mut token = PageToken::first();
        let mut items = Vec::new();
        for _ in 0..self.options.max_pages {
            if cancel.is_cancelled() {
                return Err(ConnectorError::Cancelled);
            }
            let page = fetch(token).await?;
            items.extend(page.items);
            if page.next_page_token.is_empty() {
                return Ok(items);
            }
            token = page.next_page_token;
        }
        Err(ConnectorError::Internal(format!(
            "pagination of {chain} did not finish within {} pages",
            self.options.max_pages
        )))
    }
}
