//! HTTP and WebSocket client for the detection service.

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use skyguard_core::{AircraftReport, AvoidanceAction, Conflict, CycleReport, IngestError};

/// Client for one SkyGuard server.
pub struct SkyguardClient {
    pub(crate) base_url: String,
    pub(crate) client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SnapshotRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    epoch: Option<DateTime<Utc>>,
    aircraft: &'a [AircraftReport],
}

/// Server acknowledgement of a submitted snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotReceipt {
    pub sequence: u64,
    pub accepted: usize,
    pub rejected: usize,
    #[serde(default)]
    pub rejections: Vec<IngestError>,
}

/// WebSocket stream of cycle reports.
pub struct ReportStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl SkyguardClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a snapshot. A newer submission supersedes any cycle still running.
    pub async fn submit_snapshot(
        &self,
        epoch: Option<DateTime<Utc>>,
        aircraft: &[AircraftReport],
    ) -> Result<SnapshotReceipt> {
        let url = format!("{}/v1/snapshots", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SnapshotRequest { epoch, aircraft })
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to submit snapshot: {}", response.status());
        }

        let receipt: SnapshotReceipt = response.json().await?;
        tracing::debug!(
            sequence = receipt.sequence,
            accepted = receipt.accepted,
            rejected = receipt.rejected,
            "Snapshot accepted"
        );
        Ok(receipt)
    }

    /// Conflicts of the latest cycle, optionally only those involving one aircraft.
    pub async fn conflicts(&self, aircraft_id: Option<&str>) -> Result<Vec<Conflict>> {
        let mut url = Url::parse(&format!("{}/v1/conflicts", self.base_url))?;
        if let Some(id) = aircraft_id {
            url.query_pairs_mut().append_pair("aircraft_id", id);
        }
        let conflicts = self.client.get(url).send().await?.json().await?;
        Ok(conflicts)
    }

    /// All avoidance actions of the latest cycle keyed by aircraft.
    pub async fn advisories(&self) -> Result<BTreeMap<String, Vec<AvoidanceAction>>> {
        let url = format!("{}/v1/advisories", self.base_url);
        let advisories = self.client.get(&url).send().await?.json().await?;
        Ok(advisories)
    }

    pub async fn advisories_for(&self, aircraft_id: &str) -> Result<Vec<AvoidanceAction>> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Invalid base URL"))?
            .extend(["v1", "advisories", aircraft_id]);
        let actions = self.client.get(url).send().await?.json().await?;
        Ok(actions)
    }

    /// Latest cycle report, or `None` before the first cycle completes.
    pub async fn report(&self) -> Result<Option<CycleReport>> {
        let url = format!("{}/v1/report", self.base_url);
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch report: {}", response.status());
        }
        Ok(Some(response.json().await?))
    }

    /// Connect to the report stream, optionally filtered to one aircraft.
    pub async fn stream_reports(&self, aircraft_id: Option<&str>) -> Result<ReportStream> {
        let url = build_ws_url(&self.base_url, "/v1/ws", aircraft_id)?;
        let (socket, _) = connect_async(url.as_str()).await?;
        Ok(ReportStream { socket })
    }
}

impl ReportStream {
    /// Read the next report from the stream (returns None on close).
    pub async fn next_report(&mut self) -> Result<Option<CycleReport>> {
        while let Some(msg) = self.socket.next().await {
            match msg? {
                Message::Text(text) => return Ok(Some(serde_json::from_str(&text)?)),
                Message::Binary(data) => {
                    if let Ok(report) = serde_json::from_slice(&data) {
                        return Ok(Some(report));
                    }
                }
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }
}

fn build_ws_url(base: &str, path: &str, aircraft_id: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(base)?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => other,
    }
    .to_string();

    url.set_scheme(&scheme)
        .map_err(|_| anyhow::anyhow!("Invalid base URL scheme"))?;
    url.set_path(path);
    if let Some(id) = aircraft_id {
        url.query_pairs_mut().append_pair("aircraft_id", id);
    }
    Ok(url)
}
