//! HTTP transport for an AppSync-style GraphQL todo API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    domain::{Item, ItemId},
    protocol::{
        parse_response, CreateTodoData, DeleteTodoData, GraphqlResponse, ListTodosData,
        TodoRequest, UpdateTodoData,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    error::{StoreError, StoreResult},
    RemoteStore,
};

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone)]
pub struct GraphqlStoreConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl GraphqlStoreConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            request_timeout: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

pub struct GraphqlRemoteStore {
    http: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl GraphqlRemoteStore {
    pub fn new(config: GraphqlStoreConfig) -> Result<Self> {
        let endpoint = Url::parse(config.endpoint.trim())
            .with_context(|| format!("invalid graphql endpoint '{}'", config.endpoint))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            anyhow::bail!(
                "graphql endpoint must use http or https, got '{}'",
                endpoint.scheme()
            );
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build http client")?;

        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key.filter(|key| !key.is_empty()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn execute<D: DeserializeOwned>(&self, request: &TodoRequest) -> StoreResult<D> {
        let operation = request.operation_name();
        debug!(operation, endpoint = %self.endpoint, "sending graphql request");

        let mut builder = self
            .http
            .post(self.endpoint.clone())
            .json(&request.to_graphql());
        if let Some(api_key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let parsed: GraphqlResponse<D> = parse_response(&body)?;
        if !parsed.errors.is_empty() {
            return Err(StoreError::Graphql(parsed.errors));
        }
        parsed.data.ok_or_else(|| {
            StoreError::Malformed(format!(
                "{operation} response carried no data for `{}`",
                request.data_field()
            ))
        })
    }
}

#[async_trait]
impl RemoteStore for GraphqlRemoteStore {
    async fn list(&self) -> StoreResult<Vec<Item>> {
        let data: ListTodosData = self.execute(&TodoRequest::List).await?;
        let decoded = data.decode()?;
        if decoded.skipped_nulls > 0 {
            warn!(
                count = decoded.skipped_nulls,
                "listTodos returned null entries; skipping them"
            );
        }
        for (id, err) in &decoded.rejected {
            warn!(
                item_id = id.as_deref().unwrap_or("<none>"),
                error = %err,
                "listTodos returned an unusable record; skipping it"
            );
        }
        Ok(decoded.items)
    }

    async fn create(&self, name: &str) -> StoreResult<Item> {
        let data: CreateTodoData = self
            .execute(&TodoRequest::Create {
                name: name.to_string(),
            })
            .await?;
        Ok(data.decode()?)
    }

    async fn update(&self, id: &ItemId, name: &str) -> StoreResult<()> {
        let data: UpdateTodoData = self
            .execute(&TodoRequest::Update {
                id: id.clone(),
                name: name.to_string(),
            })
            .await?;
        Ok(data.decode()?)
    }

    async fn delete(&self, id: &ItemId) -> StoreResult<()> {
        let data: DeleteTodoData = self
            .execute(&TodoRequest::Delete { id: id.clone() })
            .await?;
        Ok(data.decode()?)
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
