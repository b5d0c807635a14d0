use std::sync::Arc;

use async_trait::async_trait;
use identity_sync_sdk::{
    ConnectorError, Entitlement, Grant, Page, PageToken, Resource, ResourceId, ResourceSyncer,
    ResourceType, SecretTrait,
};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::guarded;
use super::resource_types::AGENT_TOKEN;
use crate::client::{AgentToken, ListOptions, TerraformCloudApi};

/// Agent tokens, flattened across every agent pool of an organization.
///
/// Pagination follows the pools: one page of pools yields all tokens of
/// those pools.
pub struct AgentTokenBuilder {
    client: Arc<dyn TerraformCloudApi>,
}

impl AgentTokenBuilder {
    pub fn new(client: Arc<dyn TerraformCloudApi>) -> Self {
        Self { client }
    }
}

fn agent_token_resource(token: AgentToken, parent: &ResourceId) -> Resource {
    Resource::secret(
        token.description,
        &AGENT_TOKEN,
        token.id,
        SecretTrait {
            created_at: token.created_at,
            last_used_at: token.last_used_at,
        },
    )
    .with_parent(parent)
}

#[async_trait]
impl ResourceSyncer for AgentTokenBuilder {
    fn resource_type(&self) -> &'static ResourceType {
        &AGENT_TOKEN
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
        let pools = guarded(
            cancel,
            "list agent pools",
            self.client
                .list_agent_pools(&parent.resource, ListOptions::page(token.page()?)),
        )
        .await?;
        if pools.items.is_empty() {
            return Ok(Page::empty());
        }

        let mut resources = Vec::new();
        for pool in &pools.items {
            let tokens = guarded(
                cancel,
                "list agent tokens",
                self.client.list_agent_tokens(&pool.id),
            )
            .await?;
            resources.extend(
                tokens
                    .into_iter()
                    .map(|token| agent_token_resource(token, parent)),
            );
        }
        Ok(Page::new(
            resources,
            PageToken::next(pools.current_page, pools.total_pages),
        ))
    }

    async fn entitlements(
        &self,
        _cancel: &CancellationToken,
        _resource: &Resource,
        _token: &PageToken,
    ) -> Result<Page<Entitlement>, ConnectorError> {
        Ok(Page::empty())
    }

    async fn grants(
        &self,
        _cancel: &CancellationToken,
        _resource: &Resource,
        _token: &PageToken,
    ) -> Result<Page<Grant>, ConnectorError> {
        Ok(Page::empty())
    }
}
