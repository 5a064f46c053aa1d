//! OpsGenie alert notifier.
//!
//! Critical and warning checks open (or update) an alert; passing checks
//! close it. Both sides are keyed by the same alias, derived from the node
//! and service id, so a recovery closes the alert its failure opened.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::OpsGenieConfig;
use crate::error::{NotifyError, NotifyResult};
use crate::messages::{Message, Messages, Status, Summary};
use crate::Notifier;

/// Public OpsGenie endpoint used when no URL is configured.
pub const DEFAULT_API_URL: &str = "https://api.opsgenie.com";

/// Value of the `source` field on every request.
pub const ALERT_SOURCE: &str = "consul";

/// Per-request timeout for the alert API.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Occurrences of the `-main` suffix stripped from service names in titles.
const SERVICE_SUFFIX_STRIP_LIMIT: usize = 3;

// =============================================================================
// OpsGenie API types
// =============================================================================

/// Body of `POST /v2/alerts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateAlertRequest {
    pub message: String,
    pub description: String,
    pub alias: String,
    pub source: String,
    pub entity: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Close-by-alias request. The alias travels in the URL, not the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloseAlertRequest {
    #[serde(skip)]
    pub alias: String,
    pub source: String,
}

impl CloseAlertRequest {
    #[must_use]
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            source: ALERT_SOURCE.to_string(),
        }
    }
}

/// Acknowledgement returned by the alert API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertResponse {
    pub result: String,
    pub took: f64,
    pub request_id: Option<String>,
}

/// Remote alert operations used by the notifier.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertApi: Send + Sync {
    /// Open an alert, or update the open alert with the same alias.
    async fn create_alert(&self, request: &CreateAlertRequest) -> NotifyResult<AlertResponse>;

    /// Close the alert identified by the request's alias.
    async fn close_alert(&self, request: &CloseAlertRequest) -> NotifyResult<AlertResponse>;
}

// =============================================================================
// HTTP client
// =============================================================================

/// HTTP client for the OpsGenie v2 alert API.
pub struct OpsGenieClient {
    client: reqwest::Client,
    base_url: Url,
}

impl OpsGenieClient {
    /// Create a new client for `api_url`, authenticated with `api_key`.
    ///
    /// An empty `api_url` selects [`DEFAULT_API_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::ClientConstruction`] if the key is blank, the
    /// URL is invalid, or the HTTP client fails to build.
    pub fn new(api_key: &str, api_url: &str) -> NotifyResult<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(NotifyError::ClientConstruction(
                "API key cannot be blank".to_string(),
            ));
        }

        let api_url = match api_url.trim() {
            "" => DEFAULT_API_URL,
            url => url.trim_end_matches('/'),
        };

        let base_url = Url::parse(api_url).map_err(|e| {
            NotifyError::ClientConstruction(format!("Invalid API URL '{api_url}': {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(NotifyError::ClientConstruction(format!(
                "API URL '{api_url}' cannot be used as a base"
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("GenieKey {api_key}")).map_err(|_| {
                NotifyError::ClientConstruction("Invalid API key".to_string())
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::ClientConstruction(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> NotifyResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                NotifyError::ClientConstruction(format!(
                    "API URL '{}' cannot be used as a base",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post<T: Serialize + Sync>(&self, url: Url, body: &T) -> NotifyResult<AlertResponse> {
        let response = self.client.post(url).json(body).send().await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(AlertResponse::default());
            }
            Ok(serde_json::from_str(&text)?)
        } else {
            let request_id = serde_json::from_str::<AlertResponse>(&text)
                .ok()
                .and_then(|r| r.request_id);
            Err(NotifyError::Remote {
                status: status.as_u16(),
                request_id,
                body: text,
            })
        }
    }
}

#[async_trait]
impl AlertApi for OpsGenieClient {
    async fn create_alert(&self, request: &CreateAlertRequest) -> NotifyResult<AlertResponse> {
        let url = self.endpoint(&["v2", "alerts"])?;
        self.post(url, request).await
    }

    async fn close_alert(&self, request: &CloseAlertRequest) -> NotifyResult<AlertResponse> {
        let mut url = self.endpoint(&["v2", "alerts", request.alias.as_str(), "close"])?;
        url.query_pairs_mut().append_pair("identifierType", "alias");
        self.post(url, request).await
    }
}

// =============================================================================
// Formatting
// =============================================================================

/// Correlation key for a check: the node, plus the service id when set.
#[must_use]
pub fn alert_alias(message: &Message) -> String {
    if message.service_id.is_empty() {
        message.node.clone()
    } else {
        format!("{}:{}", message.node, message.service_id)
    }
}

/// Service name with the first three `-main` occurrences removed.
#[must_use]
pub fn sanitize_service(service: &str) -> String {
    service.replacen("-main", "", SERVICE_SUFFIX_STRIP_LIMIT)
}

/// One-line alert title.
#[must_use]
pub fn alert_title(cluster_name: &str, message: &Message) -> String {
    format!(
        "[{cluster_name}] {}=>{}=>{} {}",
        message.status.as_str().to_uppercase(),
        message.node,
        sanitize_service(&message.service),
        message.output
    )
}

/// Alert description: batch header, the check line, then the raw output.
#[must_use]
pub fn alert_content(cluster_name: &str, summary: &Summary, message: &Message) -> String {
    format!(
        "\n{cluster_name} is {}.\n\nFail: {}, Warn: {}, Pass: {}\n\n{}:{}:{} is {}.\n{}",
        summary.overall,
        summary.fail,
        summary.warn,
        summary.pass,
        message.node,
        message.service,
        message.check,
        message.status,
        message.output
    )
}

// =============================================================================
// Notifier
// =============================================================================

/// OpsGenie notification backend.
#[derive(Debug, Clone)]
pub struct OpsGenieNotifier {
    config: OpsGenieConfig,
}

impl OpsGenieNotifier {
    #[must_use]
    pub fn new(config: OpsGenieConfig) -> Self {
        Self { config }
    }

    /// Create a notifier from `OPSGENIE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(OpsGenieConfig::from_env())
    }

    #[must_use]
    pub fn config(&self) -> &OpsGenieConfig {
        &self.config
    }

    /// Build a client for the current configuration.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::ClientConstruction`] as [`OpsGenieClient::new`].
    pub fn connect(&self) -> NotifyResult<OpsGenieClient> {
        let client = OpsGenieClient::new(&self.config.api_key, &self.config.api_url)?;
        info!(
            notifier = "opsgenie",
            api_url = %client.base_url(),
            api_key = %self.config.redacted_key(),
            "OpsGenie client ready"
        );
        Ok(client)
    }

    /// Dispatch every message in `messages` through `api`.
    ///
    /// Messages are sent one after another in batch order. Returns `true`
    /// only if every dispatch succeeded.
    pub async fn dispatch<A: AlertApi + ?Sized>(&self, api: &A, messages: &Messages) -> bool {
        let summary = messages.summary();
        let mut ok = true;

        for message in messages {
            let alias = alert_alias(message);

            let sent = match &message.status {
                Status::Critical | Status::Warning => {
                    let request = CreateAlertRequest {
                        message: alert_title(&self.config.cluster_name, message),
                        description: alert_content(&self.config.cluster_name, &summary, message),
                        alias,
                        source: ALERT_SOURCE.to_string(),
                        entity: self.config.cluster_name.clone(),
                        tags: message.service_tags.clone(),
                    };
                    Self::create_alert(api, &request).await
                }
                Status::Passing => Self::close_alert(api, &CloseAlertRequest::new(alias)).await,
                Status::Unknown(raw) => {
                    let err = NotifyError::UnclassifiedStatus {
                        alias: alias.clone(),
                        status: raw.clone(),
                    };
                    report_failure("classify", &alias, &err);
                    false
                }
            };

            ok = sent && ok;
        }

        ok
    }

    async fn create_alert<A: AlertApi + ?Sized>(api: &A, request: &CreateAlertRequest) -> bool {
        debug!(notifier = "opsgenie", alias = %request.alias, "Creating alert");

        match api.create_alert(request).await {
            Ok(response) => {
                info!(
                    notifier = "opsgenie",
                    alias = %request.alias,
                    request_id = response.request_id.as_deref().unwrap_or("-"),
                    "OpsGenie notification sent"
                );
                true
            }
            Err(e) => {
                report_failure("create", &request.alias, &e);
                false
            }
        }
    }

    async fn close_alert<A: AlertApi + ?Sized>(api: &A, request: &CloseAlertRequest) -> bool {
        debug!(notifier = "opsgenie", alias = %request.alias, "Closing alert");

        match api.close_alert(request).await {
            Ok(response) => {
                info!(
                    notifier = "opsgenie",
                    alias = %request.alias,
                    request_id = response.request_id.as_deref().unwrap_or("-"),
                    "OpsGenie close alert sent"
                );
                true
            }
            Err(e) => {
                report_failure("close", &request.alias, &e);
                false
            }
        }
    }
}

/// Log a failed dispatch for `alias`.
fn report_failure(operation: &'static str, alias: &str, error: &NotifyError) {
    warn!(
        notifier = "opsgenie",
        operation,
        alias,
        request_id = error.request_id().unwrap_or("-"),
        error = %error,
        "OpsGenie notification trouble"
    );
}

#[async_trait]
impl Notifier for OpsGenieNotifier {
    fn name(&self) -> &'static str {
        "opsgenie"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn boxed_clone(&self) -> Box<dyn Notifier> {
        Box::new(self.clone())
    }

    async fn notify(&self, messages: &Messages) -> bool {
        // Client is scoped to this call so config changes apply next cycle.
        let client = match self.connect() {
            Ok(client) => client,
            Err(e) => {
                warn!(notifier = "opsgenie", error = %e, "OpsGenie notification trouble with client");
                return false;
            }
        };

        self.dispatch(&client, messages).await
    }
}
