//! Management API adapter (reqwest).
//!
//! Implements the `frb-core` ManagePort over the club management HTTP API:
//! - `POST /public_api/pc/manage` (reboot)
//! - `GET /public_api/global/linking_pc_by_type/list` (device names)

use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use frb_core::{
    config::Config,
    errors::Error,
    formatting::truncate_text,
    manage::{
        client::ManagePort,
        types::{
            parse_device_list, parse_manage_response, DeviceEntry, ManageRequest, ManageResponse,
        },
    },
    Result,
};

pub mod retry;

pub use retry::RetryPolicy;

pub const API_KEY_HEADER: &str = "X-API-KEY";
pub const MANAGE_PATH: &str = "public_api/pc/manage";
pub const DEVICE_LIST_PATH: &str = "public_api/global/linking_pc_by_type/list";

const ERROR_BODY_MAX_LEN: usize = 200;
const POOL_MAX_IDLE_PER_HOST: usize = 8;

#[derive(Clone, Debug)]
pub struct ManageClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    retry: RetryPolicy,
}

impl ManageClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.http_timeout)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;

        Ok(Self::with_client(
            http,
            cfg.api_base_url.clone(),
            cfg.api_key.clone(),
            RetryPolicy::new(cfg.http_retry_count),
        ))
    }

    pub fn with_client(
        http: reqwest::Client,
        mut base_url: Url,
        api_key: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        // Url::join replaces the last path segment unless the base ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            http,
            base_url,
            api_key: api_key.into(),
            retry,
        }
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("invalid endpoint {path}: {e}")))
    }

    /// Send a request built fresh for every attempt and return the body text.
    pub async fn send<F>(&self, build: F, cancel: &CancellationToken) -> Result<String>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder + Send + Sync,
    {
        self.retry
            .run(cancel, |attempt| {
                let request = build(&self.http).header(API_KEY_HEADER, &self.api_key);
                async move {
                    debug!(attempt, "sending management api request");
                    execute(request).await
                }
            })
            .await
    }
}

async fn execute(request: RequestBuilder) -> Result<String> {
    let resp = request.send().await.map_err(map_reqwest_error)?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Http {
            status: status.as_u16(),
            body: truncate_text(&body, ERROR_BODY_MAX_LEN),
        });
    }

    resp.text().await.map_err(map_reqwest_error)
}

fn map_reqwest_error(e: reqwest::Error) -> Error {
    if e.is_builder() || e.is_redirect() {
        Error::External(format!("management api request error: {e}"))
    } else if e.is_decode() {
        Error::Decode(e.to_string())
    } else {
        // connect / timeout / request / body
        Error::Transport(e.to_string())
    }
}

#[async_trait]
impl ManagePort for ManageClient {
    async fn manage(
        &self,
        req: &ManageRequest,
        cancel: &CancellationToken,
    ) -> Result<ManageResponse> {
        let url = self.endpoint(MANAGE_PATH)?;
        let body = self
            .send(|http| http.post(url.clone()).json(req), cancel)
            .await?;
        parse_manage_response(&body)
    }

    async fn list_devices(
        &self,
        club_id: i64,
        pc_type: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DeviceEntry>> {
        let url = self.endpoint(DEVICE_LIST_PATH)?;
        let club_id = club_id.to_string();
        let body = self
            .send(
                |http| {
                    http.get(url.clone())
                        .query(&[("club_id", club_id.as_str()), ("type", pc_type)])
                },
                cancel,
            )
            .await?;
        parse_device_list(&body)
    }
}
