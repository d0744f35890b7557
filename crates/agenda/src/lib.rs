//! Agenda ingestion: one fetch of an external agenda document at startup,
//! filtered to today's sessions and created into the session collection.
//!
//! Room match is a display flag, never a filter: every session happening
//! today is created, and `isThisRoom` marks the ones in the configured room.

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use records::Collection;
use shared::{domain::Attributes, session};

/// Asynchronous source of the raw agenda document body.
#[async_trait]
pub trait AgendaSource: Send + Sync {
    async fn fetch_document(&self) -> anyhow::Result<String>;
}

/// Fetches the agenda over HTTP with a cache-busting query parameter, once.
/// Failures are surfaced to the caller, which logs them and moves on; there
/// is no retry.
pub struct HttpAgendaSource {
    client: reqwest::Client,
    url: String,
}

impl HttpAgendaSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl AgendaSource for HttpAgendaSource {
    async fn fetch_document(&self) -> anyhow::Result<String> {
        let url = with_cache_buster(&self.url, &Uuid::new_v4().simple().to_string());
        info!(%url, "fetching agenda");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to fetch agenda from {url}"))?
            .error_for_status()
            .context("agenda endpoint returned an error status")?;
        response.text().await.context("failed to read agenda body")
    }
}

fn with_cache_buster(url: &str, token: &str) -> String {
    if url.contains('?') {
        format!("{url}&nocache={token}")
    } else {
        format!("{url}?nocache={token}")
    }
}

#[derive(Debug, Deserialize)]
struct AgendaDocument {
    // Candidates are parsed individually so one malformed entry never sinks
    // the whole ingestion.
    agenda: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCandidate {
    pub on_day: String,
    pub starts_at: String,
    pub in_room: Value,
    pub speaker: String,
    pub topic: String,
}

impl SessionCandidate {
    pub fn day(&self) -> Option<NaiveDate> {
        parse_day(&self.on_day)
    }

    pub fn room_number(&self) -> Option<u32> {
        match &self.in_room {
            Value::Number(n) => n.as_u64().and_then(|room| u32::try_from(room).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Day-granularity date parsing; the agenda author's format varies.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    const FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%m/%d/%Y"];
    let raw = raw.trim();
    FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub accepted: usize,
    pub skipped: usize,
}

/// Fetches the agenda once and creates every session dated `today` in the
/// collection. `this_room` discriminates display (`isThisRoom`), it does not
/// filter; an unset room number never matches any candidate.
pub async fn ingest_today(
    source: &dyn AgendaSource,
    sessions: &Collection,
    today: NaiveDate,
    this_room: Option<u32>,
) -> anyhow::Result<IngestSummary> {
    let body = source.fetch_document().await?;
    let document: AgendaDocument =
        serde_json::from_str(&body).context("agenda document is not valid JSON")?;

    let mut summary = IngestSummary::default();
    for raw in document.agenda {
        let candidate: SessionCandidate = match serde_json::from_value(raw) {
            Ok(candidate) => candidate,
            Err(error) => {
                warn!(%error, "skipping malformed agenda candidate");
                summary.skipped += 1;
                continue;
            }
        };
        let Some(day) = candidate.day() else {
            warn!(on_day = %candidate.on_day, "skipping candidate with unparseable date");
            summary.skipped += 1;
            continue;
        };
        if day != today {
            summary.skipped += 1;
            continue;
        }

        let is_this_room = match (candidate.room_number(), this_room) {
            (Some(room), Some(here)) => room == here,
            _ => false,
        };
        info!(topic = %candidate.topic, speaker = %candidate.speaker, "saving today's session");

        let mut attributes = Attributes::new();
        attributes.insert(session::ON_DAY.to_string(), Value::String(candidate.on_day));
        attributes.insert(
            session::STARTS_AT.to_string(),
            Value::String(candidate.starts_at),
        );
        attributes.insert(session::IN_ROOM.to_string(), candidate.in_room);
        attributes.insert(session::IS_THIS_ROOM.to_string(), Value::Bool(is_this_room));
        attributes.insert(session::SPEAKER.to_string(), Value::String(candidate.speaker));
        attributes.insert(session::TOPIC.to_string(), Value::String(candidate.topic));
        sessions.create(attributes).await?;
        summary.accepted += 1;
    }
    Ok(summary)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
