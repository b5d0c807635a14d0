//! reqwest implementation of [`TerraformCloudApi`] over the v2 JSON:API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use super::jsonapi::{
    AgentPoolAttributes, AgentTokenAttributes, ListDocument, MEDIA_TYPE, MembershipAttributes,
    OrganizationAttributes, ProjectAttributes, SingleDocument, TeamAttributes,
    TeamProjectAttributes, WorkspaceAttributes,
};
use super::{
    AgentPool, AgentToken, ClientError, ListOptions, MembershipListOptions, Organization,
    OrganizationMembership, PAGE_SIZE, Paginated, Project, Team, TeamListOptions,
    TeamProjectAccess, TerraformCloudApi, Workspace,
};
use crate::config::TerraformCloudConfig;

/// String to set as the user agent in HTTP requests.
static CLIENT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Delay before the first retry; later retries wait proportionally longer.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

type Query = Vec<(&'static str, String)>;

pub struct HttpTerraformCloudClient {
    /// `{address}/api/v2/`, always with a trailing slash so `join` appends.
    base: Url,
    client: ReqwestClient,
    token: SecretString,
    max_retries: u32,
}

impl HttpTerraformCloudClient {
    /// Build a client from validated config.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidAddress`] if `address` is not a URL
    /// - [`ClientError::Http`] if the HTTP client cannot be built
    pub fn new(config: &TerraformCloudConfig) -> Result<Self, ClientError> {
        let mut base = config
            .base_url()
            .map_err(|e| ClientError::InvalidAddress(e.to_string()))?;
        let path = format!("{}/", base.path().trim_end_matches('/'));
        base.set_path(&path);
        let base = base
            .join("api/v2/")
            .map_err(|e| ClientError::InvalidAddress(e.to_string()))?;

        let client = ReqwestClient::builder()
            .timeout(config.request_timeout())
            .user_agent(CLIENT_USER_AGENT)
            .build()?;

        Ok(Self {
            base,
            client,
            token: config.token.clone(),
            max_retries: config.max_retries,
        })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::InvalidAddress(e.to_string()))
    }

    /// Send one request, retrying 429 and 5xx responses, and return the body.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> Result<String, ClientError> {
        let url = self.url(path)?;
        let body = body.map(serde_json::to_vec).transpose()?;
        let mut attempt = 0;
        loop {
            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .bearer_auth(self.token.expose_secret())
                .header(ACCEPT, MEDIA_TYPE)
                .query(query);
            if let Some(body) = &body {
                request = request.header(CONTENT_TYPE, MEDIA_TYPE).body(body.clone());
            }

            let response = request.send().await?;
            let status = response.status();
            debug!(%method, path, status = status.as_u16(), attempt, "Terraform Cloud API call");

            if status.is_success() {
                return Ok(response.text().await?);
            }
            if is_retryable(status) && attempt < self.max_retries {
                attempt += 1;
                warn!(
                    %method,
                    path,
                    status = status.as_u16(),
                    attempt,
                    "Retrying Terraform Cloud API call"
                );
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                continue;
            }
            if status == StatusCode::NOT_FOUND {
                return Err(ClientError::NotFound(format!("{method} {path}")));
            }
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, ClientError> {
        let text = self.send(Method::GET, path, query, None).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn page_query(options: ListOptions) -> Query {
    vec![
        ("page[number]", options.page_number.to_string()),
        ("page[size]", options.page_size.to_string()),
    ]
}

fn paginated<A, T>(
    doc: ListDocument<A>,
    convert: impl FnOnce(ListDocument<A>) -> Result<Vec<T>, ClientError>,
) -> Result<Paginated<T>, ClientError> {
    let (current_page, total_pages) = doc.pages();
    Ok(Paginated {
        items: convert(doc)?,
        current_page,
        total_pages,
    })
}

fn users_body(usernames: &[String]) -> Value {
    let data: Vec<Value> = usernames
        .iter()
        .map(|username| json!({ "type": "users", "id": username }))
        .collect();
    json!({ "data": data })
}

#[async_trait]
impl TerraformCloudApi for HttpTerraformCloudClient {
    async fn list_organizations(
        &self,
        options: ListOptions,
    ) -> Result<Paginated<Organization>, ClientError> {
        let doc: ListDocument<OrganizationAttributes> =
            self.get("organizations", &page_query(options)).await?;
        paginated(doc, ListDocument::<OrganizationAttributes>::into_organizations)
    }

    async fn list_organization_memberships(
        &self,
        organization: &str,
        options: &MembershipListOptions,
    ) -> Result<Paginated<OrganizationMembership>, ClientError> {
        let mut query = page_query(options.list);
        query.push(("include", "user".to_owned()));
        if let Some(email) = &options.email {
            query.push(("filter[email]", email.clone()));
        }
        let doc: ListDocument<MembershipAttributes> = self
            .get(
                &format!("organizations/{organization}/organization-memberships"),
                &query,
            )
            .await?;
        paginated(doc, ListDocument::<MembershipAttributes>::into_memberships)
    }

    async fn create_organization_membership(
        &self,
        organization: &str,
        email: &str,
        team_ids: &[String],
    ) -> Result<OrganizationMembership, ClientError> {
        let teams: Vec<Value> = team_ids
            .iter()
            .map(|id| json!({ "type": "teams", "id": id }))
            .collect();
        let body = json!({
            "data": {
                "type": "organization-memberships",
                "attributes": { "email": email },
                "relationships": { "teams": { "data": teams } }
            }
        });
        let text = self
            .send(
                Method::POST,
                &format!("organizations/{organization}/organization-memberships"),
                &[],
                Some(&body),
            )
            .await?;
        let doc: SingleDocument<MembershipAttributes> = serde_json::from_str(&text)?;
        doc.into_membership()
    }

    async fn delete_organization_membership(
        &self,
        membership_id: &str,
    ) -> Result<(), ClientError> {
        self.send(
            Method::DELETE,
            &format!("organization-memberships/{membership_id}"),
            &[],
            None,
        )
        .await?;
        Ok(())
    }

    async fn list_teams(
        &self,
        organization: &str,
        options: &TeamListOptions,
    ) -> Result<Paginated<Team>, ClientError> {
        let mut query = page_query(options.list);
        query.push(("include", "users".to_owned()));
        if !options.names.is_empty() {
            query.push(("filter[names]", options.names.join(",")));
        }
        let doc: ListDocument<TeamAttributes> = self
            .get(&format!("organizations/{organization}/teams"), &query)
            .await?;
        paginated(doc, ListDocument::<TeamAttributes>::into_teams)
    }

    async fn read_team(&self, team_id: &str) -> Result<Team, ClientError> {
        let doc: SingleDocument<TeamAttributes> = self
            .get(
                &format!("teams/{team_id}"),
                &[("include", "users".to_owned())],
            )
            .await?;
        doc.into_team()
    }

    async fn add_team_members(
        &self,
        team_id: &str,
        usernames: &[String],
    ) -> Result<(), ClientError> {
        self.send(
            Method::POST,
            &format!("teams/{team_id}/relationships/users"),
            &[],
            Some(&users_body(usernames)),
        )
        .await?;
        Ok(())
    }

    async fn remove_team_members(
        &self,
        team_id: &str,
        usernames: &[String],
    ) -> Result<(), ClientError> {
        self.send(
            Method::DELETE,
            &format!("teams/{team_id}/relationships/users"),
            &[],
            Some(&users_body(usernames)),
        )
        .await?;
        Ok(())
    }

    async fn list_projects(
        &self,
        organization: &str,
        options: ListOptions,
    ) -> Result<Paginated<Project>, ClientError> {
        let doc: ListDocument<ProjectAttributes> = self
            .get(
                &format!("organizations/{organization}/projects"),
                &page_query(options),
            )
            .await?;
        paginated(doc, |doc| Ok(doc.into_projects()))
    }

    async fn list_team_project_access(
        &self,
        project_id: &str,
        options: ListOptions,
    ) -> Result<Paginated<TeamProjectAccess>, ClientError> {
        let mut query = page_query(options);
        query.push(("filter[project][id]", project_id.to_owned()));
        let doc: ListDocument<TeamProjectAttributes> = self.get("team-projects", &query).await?;
        paginated(doc, ListDocument::<TeamProjectAttributes>::into_team_project_access)
    }

    async fn list_workspaces(
        &self,
        organization: &str,
        options: ListOptions,
    ) -> Result<Paginated<Workspace>, ClientError> {
        let doc: ListDocument<WorkspaceAttributes> = self
            .get(
                &format!("organizations/{organization}/workspaces"),
                &page_query(options),
            )
            .await?;
        paginated(doc, |doc| Ok(doc.into_workspaces()))
    }

    async fn read_workspace(&self, workspace_id: &str) -> Result<Workspace, ClientError> {
        let doc: SingleDocument<WorkspaceAttributes> =
            self.get(&format!("workspaces/{workspace_id}"), &[]).await?;
        Ok(doc.into_workspace())
    }

    async fn list_agent_pools(
        &self,
        organization: &str,
        options: ListOptions,
    ) -> Result<Paginated<AgentPool>, ClientError> {
        let doc: ListDocument<AgentPoolAttributes> = self
            .get(
                &format!("organizations/{organization}/agent-pools"),
                &page_query(options),
            )
            .await?;
        paginated(doc, |doc| Ok(doc.into_agent_pools()))
    }

    async fn list_agent_tokens(&self, agent_pool_id: &str) -> Result<Vec<AgentToken>, ClientError> {
        let doc: ListDocument<AgentTokenAttributes> = self
            .get(
                &format!("agent-pools/{agent_pool_id}/authentication-tokens"),
                &[("page[size]", PAGE_SIZE.to_string())],
            )
            .await?;
        Ok(doc.into_agent_tokens())
    }
}
