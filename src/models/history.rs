//! Append-only event history embedded in each tool record

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const EVENT_SEPARATOR: &str = "||";
pub const FIELD_SEPARATOR: &str = ":: ";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One recorded event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HistoryEvent {
    /// Local time, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    pub operatore: String,
    /// e.g. `PRELIEVO 3` or `RESTITUZIONE 2 (rotta)`
    pub azione: String,
    /// Stored text had no fields; `azione` holds it whole
    #[serde(skip)]
    verbatim: bool,
}

impl HistoryEvent {
    pub fn new(timestamp: NaiveDateTime, operatore: &str, azione: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.format(TIMESTAMP_FORMAT).to_string(),
            operatore: operatore.to_string(),
            azione: azione.into(),
            verbatim: false,
        }
    }

    /// Parse one stored event. Text that does not have three fields is kept
    /// verbatim in `azione` so it re-encodes unchanged.
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw.splitn(3, FIELD_SEPARATOR).collect();
        match parts.as_slice() {
            [timestamp, operatore, azione] => Self {
                timestamp: timestamp.to_string(),
                operatore: operatore.to_string(),
                azione: azione.to_string(),
                verbatim: false,
            },
            _ => Self {
                timestamp: String::new(),
                operatore: String::new(),
                azione: raw.to_string(),
                verbatim: true,
            },
        }
    }

    pub fn render(&self) -> String {
        if self.verbatim {
            return self.azione.clone();
        }
        format!(
            "{}{sep}{}{sep}{}",
            self.timestamp,
            self.operatore,
            self.azione,
            sep = FIELD_SEPARATOR
        )
    }
}

/// Ordered event sequence; events are only ever appended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog(Vec<HistoryEvent>);

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::default();
        }
        Self(raw.split(EVENT_SEPARATOR).map(HistoryEvent::parse).collect())
    }

    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(HistoryEvent::render)
            .collect::<Vec<_>>()
            .join(EVENT_SEPARATOR)
    }

    pub fn push(&mut self, event: HistoryEvent) {
        self.0.push(event);
    }

    pub fn events(&self) -> &[HistoryEvent] {
        &self.0
    }

    pub fn last(&self) -> Option<&HistoryEvent> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Append one event to a stored log string
pub fn append(log: &str, timestamp: &str, operatore: &str, description: &str) -> String {
    let event = format!(
        "{}{sep}{}{sep}{}",
        timestamp,
        operatore,
        description,
        sep = FIELD_SEPARATOR
    );
    if log.is_empty() {
        event
    } else {
        format!("{}{}{}", log, EVENT_SEPARATOR, event)
    }
}
