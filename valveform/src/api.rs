//! REST client for the pipeline admin API.
//!
//! All endpoints live under `{base_url}[/{api_prefix}]/api/pipelines`:
//!
//! | Method | Path                         | Body / result              |
//! |--------|------------------------------|----------------------------|
//! | GET    | `/list`                      | `{ "data": [Pipeline] }`   |
//! | POST   | `/upload`                    | multipart `file`           |
//! | DELETE | `/delete?id={id}`            |                            |
//! | GET    | `/{id}/valves/spec`          | field spec map             |
//! | GET    | `/{id}/valves`               | valve values               |
//! | POST   | `/{id}/valves/update`        | valve values (JSON)        |
//!
//! Error bodies carry a `detail` string. Requests are never retried.

use std::{future::Future, time::Duration};

use reqwest::{
    RequestBuilder,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
    multipart,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    data::{SpecMap, ValveValues},
    error::{Result, ValveError},
};

/// Valve endpoints needed to load and save a form.
pub trait ValveApi {
    /// Fetch the field spec map of a pipeline.
    fn valve_spec(&self, pipeline_id: &str) -> impl Future<Output = Result<SpecMap>> + Send;

    /// Fetch the current valve values of a pipeline.
    fn valves(&self, pipeline_id: &str) -> impl Future<Output = Result<ValveValues>> + Send;

    /// Replace the valve values of a pipeline.
    fn update_valves(
        &self,
        pipeline_id: &str,
        valves: &ValveValues,
    ) -> impl Future<Output = Result<Value>> + Send;
}

/// A pipeline known to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Pipeline {
    /// Type label, `N/A` when unknown.
    pub fn kind_label(&self) -> &str {
        self.kind.as_deref().unwrap_or("N/A")
    }

    /// Location label, `Local` when the pipeline has no URL.
    pub fn url_label(&self) -> &str {
        self.url.as_deref().filter(|u| !u.is_empty()).unwrap_or("Local")
    }

    /// Name, or the id for unnamed pipelines.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[derive(Deserialize)]
struct PipelineList {
    #[serde(default)]
    data: Vec<Pipeline>,
}

/// Connection settings for [`PipelineClient`].
#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
    /// Scheme and host, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Optional path segment mounted in front of `/api`.
    pub api_prefix: Option<String>,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiConfig {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// URL every endpoint path is appended to.
    pub fn root(&self) -> String {
        let mut root = self.base_url.trim_end_matches('/').to_string();
        if let Some(prefix) = self.api_prefix.as_deref() {
            let prefix = prefix.trim_matches('/');
            if !prefix.is_empty() && prefix != "None" {
                root.push('/');
                root.push_str(prefix);
            }
        }
        root
    }
}

/// HTTP implementation of the admin API.
#[derive(Debug, Clone)]
pub struct PipelineClient {
    root: String,
    http: reqwest::Client,
}

impl PipelineClient {
    /// Build a client from connection settings.
    ///
    /// # Errors
    ///
    /// Fails when the token is not a valid header value or the TLS backend
    /// cannot be initialised.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ValveError::Config(format!("token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(PipelineClient {
            root: config.root(),
            http: builder.build()?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/pipelines{path}", self.root)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    /// List the pipelines the backend knows about.
    pub async fn list_pipelines(&self) -> Result<Vec<Pipeline>> {
        let doc = self.send(self.http.get(self.url("/list"))).await?;
        let list: PipelineList = serde_json::from_value(doc)?;
        debug!("loaded {} pipelines", list.data.len());
        Ok(list.data)
    }

    /// Upload a pipeline source file as the multipart `file` part.
    pub async fn upload_pipeline(&self, file_name: &str, content: Vec<u8>) -> Result<Value> {
        info!("uploading pipeline {file_name} ({} bytes)", content.len());
        let file_name = file_name.to_string();

        let form =
            multipart::Form::new().part("file", multipart::Part::bytes(content).file_name(file_name));
        self.send(self.http.post(self.url("/upload")).multipart(form))
            .await
    }

    /// Delete a pipeline by id.
    pub async fn delete_pipeline(&self, pipeline_id: &str) -> Result<Value> {
        info!("deleting pipeline {pipeline_id}");
        self.send(
            self.http
                .delete(self.url("/delete"))
                .query(&[("id", pipeline_id)]),
        )
        .await
    }
}

impl ValveApi for PipelineClient {
    async fn valve_spec(&self, pipeline_id: &str) -> Result<SpecMap> {
        let url = self.url(&format!("/{pipeline_id}/valves/spec"));
        let doc = self.send(self.http.get(url)).await?;
        Ok(SpecMap::from_json(doc))
    }

    async fn valves(&self, pipeline_id: &str) -> Result<ValveValues> {
        let url = self.url(&format!("/{pipeline_id}/valves"));
        match self.send(self.http.get(url)).await? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(ValveValues::new()),
            other => {
                warn!("valves of {pipeline_id} are not an object: {other}");
                Ok(ValveValues::new())
            }
        }
    }

    async fn update_valves(&self, pipeline_id: &str, valves: &ValveValues) -> Result<Value> {
        let url = self.url(&format!("/{pipeline_id}/valves/update"));
        self.send(self.http.post(url).json(valves)).await
    }
}

/// Turn an error response into a [`ValveError::Api`].
///
/// A JSON body with a string `detail` supplies the message; anything else
/// gets a generic one naming the status code.
pub fn api_error(status: u16, body: &[u8]) -> ValveError {
    let detail = serde_json::from_slice::<Value>(body).ok().and_then(|v| {
        v.get("detail")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    });
    ValveError::Api {
        status,
        message: detail.unwrap_or_else(|| format!("request failed (HTTP {status})")),
    }
}
