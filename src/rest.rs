//! HTTP implementation of [`PdfServices`] over the vendor REST API.
//!
//! ## Call sequence
//!
//! ```text
//! POST /token                     client id + secret  → bearer token (cached)
//! POST /assets                    {"mediaType"}       → {uploadUri, assetID}
//! PUT  <uploadUri>                raw bytes
//! POST /operation/<endpoint>      {"assetID", …}      → 201, `location` header
//! GET  <location>                                     → {"status", <role>: asset}
//! GET  <downloadUri>                                  → bytes
//! ```
//!
//! Pre-signed upload and download URIs are called without the API headers.
//! Every other call carries `X-API-Key` and `Authorization: Bearer`.
//!
//! Nothing here retries. HTTP 429 maps to
//! [`PdfServicesError::ServiceUsage`], any other non-success status to
//! [`PdfServicesError::ServiceApi`], and reqwest failures to
//! [`PdfServicesError::Transport`].

use crate::config::{ClientConfig, Credentials, ProxyServerConfig};
use crate::error::{PdfServicesError, Result};
use crate::job::{Asset, Job, JobHandle, JobResult, JobStatus, ResultRole, StreamAsset};
use crate::media::MediaType;
use crate::service::PdfServices;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION, RETRY_AFTER};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Refresh the bearer token this long before the service says it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Longest server-suggested poll delay we are willing to honour.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// [`PdfServices`] over HTTPS with reqwest.
pub struct RestPdfServices {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    token: Mutex<Option<AccessToken>>,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

impl RestPdfServices {
    /// Build a client. Performs no network I/O.
    ///
    /// Timeouts and the proxy from `config` apply to every request this
    /// client makes. Without a proxy, environment proxy variables are
    /// ignored and connections are direct.
    pub fn new(credentials: Credentials, config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .user_agent(concat!("pdf-services-jobs/", env!("CARGO_PKG_VERSION")));

        builder = match config.proxy {
            Some(ref proxy) => {
                info!("Routing PDF Services calls through proxy {}", proxy.url());
                builder.proxy(build_proxy(proxy)?)
            }
            None => builder.no_proxy(),
        };

        let client = builder
            .build()
            .map_err(|e| PdfServicesError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.resolved_base_url(),
            credentials,
            token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current bearer token, fetching a new one when missing or stale.
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(ref token) = *cached {
            if token.is_fresh() {
                return Ok(token.value.clone());
            }
        }

        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", self.credentials.client_id())
            .append_pair("client_secret", self.credentials.client_secret())
            .finish();

        let response = self
            .client
            .post(format!("{}/token", self.base_url))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await?;
        let token: TokenResponse = check_status(response).await?.json().await?;

        debug!("Obtained access token, valid for {}s", token.expires_in);
        let value = token.access_token;
        *cached = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(value)
    }

    /// A request carrying the API key and bearer token.
    async fn authed(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let token = self.access_token().await?;
        Ok(self
            .client
            .request(method, url)
            .header("X-API-Key", self.credentials.client_id())
            .bearer_auth(token))
    }

    /// Resolve a possibly relative `location` against the base URL.
    fn absolute(&self, location: &str) -> Result<String> {
        let base = url::Url::parse(&format!("{}/", self.base_url))
            .map_err(|e| PdfServicesError::InvalidConfig(format!("Invalid base URL: {e}")))?;
        base.join(location)
            .map(|u| u.to_string())
            .map_err(|e| {
                PdfServicesError::MalformedResponse(format!("Bad job location '{location}': {e}"))
            })
    }

    async fn resolve_download_uri(&self, asset: &Asset) -> Result<String> {
        if let Some(ref uri) = asset.download_uri {
            return Ok(uri.clone());
        }
        let url = format!("{}/assets/{}", self.base_url, asset.id);
        let response = self.authed(Method::GET, &url).await?.send().await?;
        let info: DownloadInfo = check_status(response).await?.json().await?;
        Ok(info.download_uri)
    }
}

#[async_trait]
impl PdfServices for RestPdfServices {
    async fn upload(&self, bytes: Vec<u8>, media_type: MediaType) -> Result<Asset> {
        let size = bytes.len() as u64;
        let url = format!("{}/assets", self.base_url);
        let response = self
            .authed(Method::POST, &url)
            .await?
            .json(&serde_json::json!({ "mediaType": media_type.mime() }))
            .send()
            .await?;
        let ticket: UploadTicket = check_status(response).await?.json().await?;

        let request = self
            .client
            .put(&ticket.upload_uri)
            .header(CONTENT_TYPE, media_type.mime())
            .body(bytes);
        check_status(send_to_service_uri(request, &ticket.upload_uri).await?).await?;

        debug!("Uploaded {} bytes as asset {}", size, ticket.asset_id);
        Ok(Asset {
            id: ticket.asset_id,
            media_type: Some(media_type.mime().to_string()),
            download_uri: None,
            size: Some(size),
        })
    }

    async fn submit(&self, job: &Job) -> Result<JobHandle> {
        let url = format!("{}/operation/{}", self.base_url, job.kind.endpoint());
        let response = self
            .authed(Method::POST, &url)
            .await?
            .json(&job.request_body())
            .send()
            .await?;
        let response = check_status(response).await?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                PdfServicesError::MalformedResponse(
                    "Submit response is missing the location header".into(),
                )
            })?;
        Ok(JobHandle::new(self.absolute(location)?))
    }

    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus> {
        let response = self
            .authed(Method::GET, handle.as_str())
            .await?
            .send()
            .await?;
        let response = check_status(response).await?;
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .map(|hint| {
                if hint > MAX_RETRY_AFTER {
                    warn!(
                        "Service asked to wait {:?} before polling {}; capping at {:?}",
                        hint, handle, MAX_RETRY_AFTER
                    );
                }
                hint.min(MAX_RETRY_AFTER)
            });
        let body = response.text().await?;
        parse_job_status(&body, retry_after)
    }

    async fn download(&self, asset: &Asset) -> Result<StreamAsset> {
        let uri = self.resolve_download_uri(asset).await?;
        let response = check_status(send_to_service_uri(self.client.get(&uri), &uri).await?).await?;
        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| asset.media_type.clone());
        let bytes = response.bytes().await?.to_vec();
        debug!("Downloaded {} bytes for asset {}", bytes.len(), asset.id);
        Ok(StreamAsset { bytes, media_type })
    }
}

/// Send a request to a pre-signed URI handed out by the service.
///
/// A URI reqwest refuses to build a request from is a bad response, not a
/// local configuration problem.
async fn send_to_service_uri(request: RequestBuilder, uri: &str) -> Result<Response> {
    request.send().await.map_err(|e| {
        if e.is_builder() {
            PdfServicesError::MalformedResponse(format!(
                "Service returned an unusable URI '{uri}': {e}"
            ))
        } else {
            e.into()
        }
    })
}

/// Translate a [`ProxyServerConfig`] into a reqwest proxy for all schemes.
pub(crate) fn build_proxy(config: &ProxyServerConfig) -> Result<reqwest::Proxy> {
    let mut proxy = reqwest::Proxy::all(config.url())
        .map_err(|e| PdfServicesError::InvalidConfig(format!("Invalid proxy: {e}")))?;
    if let Some(ref creds) = config.credentials {
        proxy = proxy.basic_auth(&creds.username, &creds.password);
    }
    Ok(proxy)
}

/// Pass successful responses through; turn everything else into an error.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_error(status, &body))
}

/// Map a non-success status and its body onto the error taxonomy.
pub(crate) fn classify_error(status: StatusCode, body: &str) -> PdfServicesError {
    let (code, message) = parse_error_body(body);
    let message = message.unwrap_or_else(|| {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string()
        } else {
            body.trim().to_string()
        }
    });

    if status == StatusCode::TOO_MANY_REQUESTS {
        PdfServicesError::ServiceUsage {
            status: status.as_u16(),
            message,
        }
    } else {
        PdfServicesError::ServiceApi {
            status: status.as_u16(),
            code: code.unwrap_or_else(|| status.as_u16().to_string()),
            message,
        }
    }
}

/// Pull `(code, message)` out of the shapes the service uses for errors:
/// `{"error": {"code", "message"}}`, `{"code", "message"}` and
/// `{"error_code", "message"}`.
fn parse_error_body(body: &str) -> (Option<String>, Option<String>) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return (None, None);
    };
    let detail = value
        .get("error")
        .filter(|e| e.is_object())
        .unwrap_or(&value);
    let text = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).map(str::to_string);

    let code = text(detail, "code")
        .or_else(|| text(detail, "error_code"))
        .or_else(|| text(&value, "error"));
    let message = text(detail, "message").or_else(|| text(&value, "error_description"));
    (code, message)
}

/// Interpret a job status body.
pub(crate) fn parse_job_status(body: &str, retry_after: Option<Duration>) -> Result<JobStatus> {
    let status: StatusBody = serde_json::from_str(body)
        .map_err(|e| PdfServicesError::MalformedResponse(format!("Job status body: {e}")))?;

    match status.status.to_ascii_lowercase().as_str() {
        "in progress" | "in_progress" | "running" | "submitted" => {
            Ok(JobStatus::InProgress { retry_after })
        }
        "done" | "succeeded" => {
            let mut result = JobResult::new();
            for role in ResultRole::ALL {
                if let Some(raw) = status.rest.get(role.wire_key()) {
                    let wire: WireAsset = serde_json::from_value(raw.clone()).map_err(|e| {
                        PdfServicesError::MalformedResponse(format!("'{role}' asset: {e}"))
                    })?;
                    result = result.with(role, wire.into());
                }
            }
            Ok(JobStatus::Succeeded(result))
        }
        "failed" => {
            let error = status.error.unwrap_or_default();
            Ok(JobStatus::Failed {
                code: error.code.unwrap_or_else(|| "UNKNOWN".into()),
                message: error
                    .message
                    .unwrap_or_else(|| "Job failed without a reason".into()),
            })
        }
        other => Err(PdfServicesError::MalformedResponse(format!(
            "Unknown job status '{other}'"
        ))),
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_lifetime")]
    expires_in: u64,
}

fn default_token_lifetime() -> u64 {
    3600
}

#[derive(Deserialize)]
struct UploadTicket {
    #[serde(rename = "uploadUri")]
    upload_uri: String,
    #[serde(rename = "assetID")]
    asset_id: String,
}

#[derive(Deserialize)]
struct DownloadInfo {
    #[serde(rename = "downloadUri")]
    download_uri: String,
}

#[derive(Deserialize)]
struct StatusBody {
    status: String,
    error: Option<WireError>,
    #[serde(flatten)]
    rest: HashMap<String, Value>,
}

#[derive(Deserialize, Default)]
struct WireError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct WireAsset {
    #[serde(rename = "assetID")]
    asset_id: String,
    #[serde(rename = "downloadUri")]
    download_uri: Option<String>,
    metadata: Option<WireMetadata>,
}

#[derive(Deserialize)]
struct WireMetadata {
    #[serde(rename = "type")]
    media_type: Option<String>,
    size: Option<u64>,
}

impl From<WireAsset> for Asset {
    fn from(w: WireAsset) -> Self {
        let (media_type, size) = match w.metadata {
            Some(m) => (m.media_type, m.size),
            None => (None, None),
        };
        Asset {
            id: w.asset_id,
            media_type,
            download_uri: w.download_uri,
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyScheme;
    use crate::error::ErrorKind;

    #[test]
    fn parses_in_progress_with_hint() {
        let status =
            parse_job_status(r#"{"status":"in progress"}"#, Some(Duration::from_secs(2))).unwrap();
        assert_eq!(
            status,
            JobStatus::InProgress {
                retry_after: Some(Duration::from_secs(2))
            }
        );
    }

    #[test]
    fn parses_autotag_done() {
        let body = r#"{
            "status": "done",
            "tagged-pdf": {
                "metadata": {"type": "application/pdf", "size": 1024},
                "downloadUri": "https://dl.example/tagged",
                "assetID": "urn:aaid:tagged"
            },
            "report": {
                "metadata": {"type": "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", "size": 10},
                "downloadUri": "https://dl.example/report",
                "assetID": "urn:aaid:report"
            }
        }"#;
        let JobStatus::Succeeded(result) = parse_job_status(body, None).unwrap() else {
            panic!("expected success");
        };
        let tagged = result.tagged_pdf().unwrap();
        assert_eq!(tagged.id, "urn:aaid:tagged");
        assert_eq!(tagged.download_uri.as_deref(), Some("https://dl.example/tagged"));
        assert_eq!(tagged.size, Some(1024));
        assert!(result.report().is_some());
        assert!(result.asset().is_none());
    }

    #[test]
    fn parses_failed_reason() {
        let body = r#"{"status":"failed","error":{"code":"BAD_PDF","message":"Unable to parse","status":400}}"#;
        assert_eq!(
            parse_job_status(body, None).unwrap(),
            JobStatus::Failed {
                code: "BAD_PDF".into(),
                message: "Unable to parse".into()
            }
        );
    }

    #[test]
    fn unknown_status_is_malformed() {
        let err = parse_job_status(r#"{"status":"paused"}"#, None).unwrap_err();
        assert!(matches!(err, PdfServicesError::MalformedResponse(_)));
        assert!(parse_job_status("not json", None).is_err());
    }

    #[test]
    fn too_many_requests_is_usage() {
        let err = classify_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"code":"QUOTA_EXCEEDED","message":"Monthly quota exhausted"}}"#,
        );
        assert_eq!(err.kind(), ErrorKind::ServiceUsage);
        assert!(err.to_string().contains("Monthly quota exhausted"));
    }

    #[test]
    fn bad_request_keeps_remote_code() {
        let err = classify_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":"INVALID_PARAMETER","message":"assetID is required"}}"#,
        );
        match err {
            PdfServicesError::ServiceApi {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, "INVALID_PARAMETER");
                assert_eq!(message, "assetID is required");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn token_endpoint_error_shape() {
        let err = classify_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error_code":"invalid_client","message":"invalid client_id parameter"}"#,
        );
        assert!(matches!(
            err,
            PdfServicesError::ServiceApi { ref code, .. } if code == "invalid_client"
        ));
    }

    #[test]
    fn plain_text_error_body_used_as_message() {
        let err = classify_error(StatusCode::BAD_GATEWAY, "upstream unavailable");
        assert!(err.to_string().contains("upstream unavailable"));
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn proxy_builds_for_both_schemes() {
        assert!(build_proxy(&ProxyServerConfig::new("proxy.local", ProxyScheme::Http)).is_ok());
        assert!(build_proxy(
            &ProxyServerConfig::new("proxy.local", ProxyScheme::Https)
                .with_port(8443)
                .with_credentials("user", "pass")
        )
        .is_ok());
    }

    #[test]
    fn relative_location_resolved_against_base() {
        let config = ClientConfig::builder()
            .base_url("http://127.0.0.1:9999")
            .build()
            .unwrap();
        let svc = RestPdfServices::new(Credentials::new("id", "secret").unwrap(), &config).unwrap();
        assert_eq!(
            svc.absolute("/operation/autotag/42/status").unwrap(),
            "http://127.0.0.1:9999/operation/autotag/42/status"
        );
        assert_eq!(
            svc.absolute("https://other.example/status/1").unwrap(),
            "https://other.example/status/1"
        );
    }

    #[tokio::test]
    async fn unusable_download_uri_is_malformed_response() {
        let config = ClientConfig::builder()
            .base_url("http://127.0.0.1:9999")
            .build()
            .unwrap();
        let svc = RestPdfServices::new(Credentials::new("id", "secret").unwrap(), &config).unwrap();
        let asset = Asset::new("urn:aaid:out").with_download_uri("not a uri");

        let err = svc.download(&asset).await.unwrap_err();

        assert!(matches!(err, PdfServicesError::MalformedResponse(_)), "got: {err:?}");
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
