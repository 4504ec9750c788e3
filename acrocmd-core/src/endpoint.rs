//! Acrolinx checking service client
//!
//! Covers the four calls the commander needs: capabilities, submitting a
//! check, polling its result, and the aggregated report of a batch.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::check::{CheckOptions, QualityStatus, Report, ReportType};
use crate::error::{CommanderError, Result};

/// Client signature for development installations
pub const DEVELOPMENT_SIGNATURE: &str = "SW50ZWdyYXRpb25EZXZlbG9wbWVudERlbW9Pbmx5";

/// Upper bound on a single poll delay, whatever the server asks for
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Polling a single check gives up after this long
pub const MAX_CHECK_DURATION: Duration = Duration::from_secs(10 * 60);

/// Identifies this integration to the server
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub name: String,
    pub signature: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: "AcroCommander".to_string(),
            signature: DEVELOPMENT_SIGNATURE.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

/// What the server can check
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckingCapabilities {
    pub reference_pattern: String,
    #[serde(default)]
    pub guidance_profiles: Vec<GuidanceProfile>,
}

/// How `CheckRequest::content` is encoded on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    #[default]
    #[serde(rename = "none")]
    Plain,
    Base64,
}

impl ContentEncoding {
    fn is_plain(&self) -> bool {
        *self == ContentEncoding::Plain
    }
}

/// One document to check
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub content: String,
    pub content_encoding: ContentEncoding,
    pub reference: String,
    pub options: CheckOptions,
}

impl CheckRequest {
    /// Build a request from raw file bytes
    ///
    /// UTF-8 text is sent as is; anything else (docx, images) goes base64.
    pub fn from_bytes(bytes: Vec<u8>, reference: impl Into<String>, options: CheckOptions) -> Self {
        let (content, content_encoding) = match String::from_utf8(bytes) {
            Ok(text) => (text, ContentEncoding::Plain),
            Err(err) => (
                general_purpose::STANDARD.encode(err.into_bytes()),
                ContentEncoding::Base64,
            ),
        };
        Self {
            content,
            content_encoding,
            reference: reference.into(),
            options,
        }
    }
}

/// Result of a finished check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub score: u32,
    pub status: QualityStatus,
    pub reports: BTreeMap<ReportType, Report>,
}

/// The remote checking service as the batch checker sees it
#[async_trait]
pub trait CheckingEndpoint: Send + Sync {
    async fn checking_capabilities(&self, access_token: &str) -> Result<CheckingCapabilities>;

    /// Submit a check and wait for its result
    async fn check(&self, access_token: &str, request: CheckRequest) -> Result<CheckOutcome>;

    /// Link to the report aggregating every check of a batch
    async fn aggregated_report_url(&self, access_token: &str, batch_id: &str) -> Result<Option<String>>;
}

// --- wire types -----------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitCheckBody<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "ContentEncoding::is_plain")]
    content_encoding: ContentEncoding,
    check_options: &'a CheckOptions,
    document: DocumentDescriptor<'a>,
}

#[derive(Debug, Serialize)]
struct DocumentDescriptor<'a> {
    reference: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitCheckResponse {
    links: SubmitLinks,
}

#[derive(Debug, Deserialize)]
struct SubmitLinks {
    result: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Progress {
    #[serde(default)]
    retry_after: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    data: Option<CheckResultData>,
    progress: Option<Progress>,
}

#[derive(Debug, Deserialize)]
struct CheckResultData {
    quality: Quality,
    #[serde(default)]
    reports: BTreeMap<String, Report>,
}

#[derive(Debug, Deserialize)]
struct Quality {
    score: f64,
    status: QualityStatus,
}

#[derive(Debug, Deserialize)]
struct AggregatedReports {
    #[serde(default)]
    reports: Vec<AggregatedReportLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregatedReportLink {
    report_type: String,
    link: String,
}

/// Where a poll left off
#[derive(Debug, PartialEq)]
enum PollState {
    Running { retry_after: Duration },
    Finished(CheckOutcome),
}

fn parse_poll(body: &str) -> Result<PollState> {
    let poll: PollResponse =
        serde_json::from_str(body).map_err(|err| CommanderError::json("check result", err))?;

    if let Some(data) = poll.data {
        let reports = data
            .reports
            .into_iter()
            .filter_map(|(key, report)| ReportType::from_key(&key).map(|ty| (ty, report)))
            .collect();
        return Ok(PollState::Finished(CheckOutcome {
            score: data.quality.score.round().max(0.0) as u32,
            status: data.quality.status,
            reports,
        }));
    }

    let seconds = poll
        .progress
        .and_then(|p| p.retry_after)
        .filter(|s| s.is_finite() && *s >= 0.0)
        .unwrap_or(1.0);
    Ok(PollState::Running {
        retry_after: Duration::from_secs_f64(seconds).min(MAX_RETRY_AFTER),
    })
}

/// Call `poll` until the check finishes, sleeping as the server asks
///
/// Fails with `CheckTimedOut` once `limit` has passed without a result.
async fn poll_until_finished<F, Fut>(reference: &str, limit: Duration, mut poll: F) -> Result<CheckOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollState>>,
{
    let started = tokio::time::Instant::now();
    loop {
        match poll().await? {
            PollState::Finished(outcome) => return Ok(outcome),
            PollState::Running { retry_after } => {
                let waited = started.elapsed();
                if waited + retry_after > limit {
                    return Err(CommanderError::check_timed_out(reference, waited));
                }
                tokio::time::sleep(retry_after).await;
            }
        }
    }
}

fn pick_aggregated_link(reports: AggregatedReports) -> Option<String> {
    let mut reports = reports.reports;
    if let Some(idx) = reports.iter().position(|r| r.report_type == "withApiKey") {
        return Some(reports.swap_remove(idx).link);
    }
    reports.into_iter().next().map(|r| r.link)
}

// --- HTTP client ------------------------------------------------------------

/// reqwest-backed [`CheckingEndpoint`]
pub struct AcrolinxEndpoint {
    client: Client,
    server_address: String,
    client_info: ClientInfo,
}

impl AcrolinxEndpoint {
    pub fn new(server_address: impl Into<String>, client_info: ClientInfo) -> Self {
        let server_address = server_address.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            server_address,
            client_info,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_address, path)
    }

    fn authorized(&self, builder: RequestBuilder, access_token: &str) -> RequestBuilder {
        builder
            .header(
                "X-Acrolinx-Client",
                format!("{}; {}", self.client_info.signature, self.client_info.version),
            )
            .header("X-Acrolinx-Auth", access_token)
            .header("Accept", "application/json")
    }

    async fn send(&self, builder: RequestBuilder, context: &str) -> Result<String> {
        let response: Response = builder
            .send()
            .await
            .map_err(|err| CommanderError::http(context, err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| CommanderError::http(context, err))?;

        if !status.is_success() {
            return Err(CommanderError::api(status.as_u16(), context, body));
        }
        Ok(body)
    }
}

#[async_trait]
impl CheckingEndpoint for AcrolinxEndpoint {
    async fn checking_capabilities(&self, access_token: &str) -> Result<CheckingCapabilities> {
        let request = self.authorized(
            self.client.get(self.url("/api/v1/checking/capabilities")),
            access_token,
        );
        let body = self.send(request, "checking capabilities").await?;
        let envelope: Envelope<CheckingCapabilities> = serde_json::from_str(&body)
            .map_err(|err| CommanderError::json("checking capabilities", err))?;
        Ok(envelope.data)
    }

    async fn check(&self, access_token: &str, request: CheckRequest) -> Result<CheckOutcome> {
        let body = SubmitCheckBody {
            content: &request.content,
            content_encoding: request.content_encoding,
            check_options: &request.options,
            document: DocumentDescriptor {
                reference: &request.reference,
            },
        };
        let submit = self.authorized(
            self.client.post(self.url("/api/v1/checking/checks")).json(&body),
            access_token,
        );
        let response = self.send(submit, "submit check").await?;
        let submitted: SubmitCheckResponse = serde_json::from_str(&response)
            .map_err(|err| CommanderError::json("submit check", err))?;

        tracing::debug!(reference = %request.reference, "check submitted");

        let result_url = submitted.links.result.as_str();
        poll_until_finished(&request.reference, MAX_CHECK_DURATION, || async move {
            let poll = self.authorized(self.client.get(result_url), access_token);
            let body = self.send(poll, "check result").await?;
            parse_poll(&body)
        })
        .await
    }

    async fn aggregated_report_url(&self, access_token: &str, batch_id: &str) -> Result<Option<String>> {
        let request = self.authorized(
            self.client
                .get(self.url(&format!("/api/v1/checking/aggregation/{}", batch_id))),
            access_token,
        );
        let body = self.send(request, "aggregated report").await?;
        let envelope: Envelope<AggregatedReports> = serde_json::from_str(&body)
            .map_err(|err| CommanderError::json("aggregated report", err))?;
        Ok(pick_aggregated_link(envelope.data))
    }
}
