//! CSV-backed record store
//!
//! The whole inventory lives in one file that is rewritten on every save.
//! Files written by older versions may lack some columns or carry
//! non-numeric quantities; those are normalized on every load.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::RecordStore;
use crate::{
    error::{AppError, AppResult},
    models::{HistoryLog, OperatorLedger, Tool, ToolStatus},
};

/// Column order of written files
pub const COLUMNS: [&str; 12] = [
    "produttore",
    "diametro",
    "materiale",
    "descrizione",
    "codice",
    "quantita",
    "quantita_disponibile",
    "tipo",
    "cassetto",
    "stato",
    "operatori",
    "storico",
];

/// Raw row as found on disk; every column may be missing or empty
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ToolRow {
    produttore: Option<String>,
    diametro: Option<String>,
    materiale: Option<String>,
    descrizione: Option<String>,
    codice: Option<String>,
    quantita: Option<String>,
    quantita_disponibile: Option<String>,
    tipo: Option<String>,
    cassetto: Option<String>,
    stato: Option<String>,
    operatori: Option<String>,
    storico: Option<String>,
}

impl From<&Tool> for ToolRow {
    fn from(tool: &Tool) -> Self {
        Self {
            produttore: Some(tool.produttore.clone()),
            diametro: Some(tool.diametro.clone()),
            materiale: Some(tool.materiale.clone()),
            descrizione: Some(tool.descrizione.clone()),
            codice: Some(tool.codice.clone()),
            quantita: Some(tool.quantita.to_string()),
            quantita_disponibile: Some(tool.quantita_disponibile.to_string()),
            tipo: Some(tool.tipo.clone()),
            cassetto: Some(tool.cassetto.clone()),
            stato: Some(tool.stato.as_str().to_string()),
            operatori: Some(tool.operatori.encode()),
            storico: Some(tool.storico.encode()),
        }
    }
}

impl ToolRow {
    /// Build a tool, backfilling and coercing what older files got wrong
    fn normalize(self, line: usize) -> Option<Tool> {
        let codice = self.codice.as_deref().map(str::trim).unwrap_or_default();
        if codice.is_empty() {
            tracing::warn!("Inventory row {} has no code, skipping", line);
            return None;
        }

        let quantita = match self.quantita.as_deref() {
            None => {
                tracing::debug!("Tool {}: no quantita, using 0", codice);
                0
            }
            Some(raw) => parse_quantity(raw).unwrap_or_else(|| {
                tracing::warn!("Tool {}: quantita {:?} is not a number, using 0", codice, raw);
                0
            }),
        };

        let quantita_disponibile = match self.quantita_disponibile.as_deref() {
            None => {
                tracing::debug!(
                    "Tool {}: no quantita_disponibile, using quantita {}",
                    codice,
                    quantita
                );
                quantita
            }
            Some(raw) => parse_quantity(raw).unwrap_or_else(|| {
                tracing::warn!(
                    "Tool {}: quantita_disponibile {:?} is not a number, using quantita {}",
                    codice,
                    raw,
                    quantita
                );
                quantita
            }),
        };

        let stato = match self.stato.as_deref().map(str::trim) {
            None | Some("") => ToolStatus::default(),
            Some(raw) => ToolStatus::parse(raw).unwrap_or_else(|| {
                tracing::warn!("Tool {}: unknown stato {:?}, using in magazzino", codice, raw);
                ToolStatus::default()
            }),
        };

        Some(Tool {
            codice: codice.to_string(),
            produttore: self.produttore.unwrap_or_default(),
            diametro: self.diametro.unwrap_or_default(),
            materiale: self.materiale.unwrap_or_default(),
            descrizione: self.descrizione.unwrap_or_default(),
            tipo: self.tipo.unwrap_or_default(),
            cassetto: self.cassetto.unwrap_or_default(),
            quantita,
            quantita_disponibile,
            stato,
            operatori: OperatorLedger::decode(self.operatori.as_deref().unwrap_or_default()),
            storico: HistoryLog::decode(self.storico.as_deref().unwrap_or_default()),
        })
    }
}

/// Integer quantity; float text such as `5.0` is truncated
fn parse_quantity(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| value.trunc() as i64)
}

/// Parse a whole inventory file
pub fn parse_inventory(bytes: &[u8]) -> AppResult<Vec<Tool>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let mut seen = HashSet::new();
    let mut tools = Vec::new();
    for (index, row) in reader.deserialize::<ToolRow>().enumerate() {
        // header is line 1
        let Some(tool) = row?.normalize(index + 2) else {
            continue;
        };
        if !seen.insert(tool.codice.clone()) {
            tracing::warn!("Duplicate tool code {} in inventory, keeping the first", tool.codice);
            continue;
        }
        tools.push(tool);
    }
    Ok(tools)
}

/// Render a whole inventory file, header included
pub fn render_inventory(tools: &[Tool]) -> AppResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);

    writer.write_record(COLUMNS)?;
    for tool in tools {
        writer.serialize(ToolRow::from(tool))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush inventory: {}", e)))
}

/// Record store backed by a single CSV file
#[derive(Debug, Clone)]
pub struct CsvRecordStore {
    path: PathBuf,
}

impl CsvRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RecordStore for CsvRecordStore {
    async fn load(&self) -> AppResult<Vec<Tool>> {
        if !tokio::fs::try_exists(&self.path).await? {
            tracing::debug!("Inventory {} does not exist yet", self.path.display());
            return Ok(Vec::new());
        }
        let bytes = tokio::fs::read(&self.path).await?;
        parse_inventory(&bytes)
    }

    async fn save(&self, tools: &[Tool]) -> AppResult<()> {
        let bytes = render_inventory(tools)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write beside the target, then swap it in
        let staging = self.staging_path();
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &self.path).await?;

        tracing::debug!("Saved {} tool(s) to {}", tools.len(), self.path.display());
        Ok(())
    }
}
