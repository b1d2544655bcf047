//! Per-tool operator ledger: who holds how many units
//!
//! Stored as a single text field of the form `Filippo:2;Cristian:1`.
//! Entries keep the order in which operators first appeared.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const ENTRY_SEPARATOR: &str = ";";
pub const UNITS_SEPARATOR: &str = ":";

/// Operator name -> units currently held
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorLedger(IndexMap<String, i64>);

impl OperatorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the stored text form.
    ///
    /// Entries without a `:` are kept with zero units; unparseable units
    /// coerce to zero. A repeated name keeps its first position and the last
    /// value.
    pub fn decode(raw: &str) -> Self {
        let mut entries = IndexMap::new();
        if raw.trim().is_empty() {
            return Self(entries);
        }

        for item in raw.split(ENTRY_SEPARATOR) {
            if item.trim().is_empty() {
                continue;
            }
            match item.split_once(UNITS_SEPARATOR) {
                Some((name, units)) => {
                    let units = units.trim().parse::<i64>().unwrap_or_else(|_| {
                        tracing::debug!("Operator entry {:?} has non-integer units, using 0", item);
                        0
                    });
                    entries.insert(name.trim().to_string(), units);
                }
                None => {
                    tracing::debug!("Operator entry {:?} has no units, using 0", item);
                    entries.insert(item.trim().to_string(), 0);
                }
            }
        }

        Self(entries)
    }

    /// Render back to the stored text form
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(name, units)| format!("{}{}{}", name, UNITS_SEPARATOR, units))
            .collect::<Vec<_>>()
            .join(ENTRY_SEPARATOR)
    }

    /// Units held by `name` (zero when absent)
    pub fn held(&self, name: &str) -> i64 {
        self.0.get(name).copied().unwrap_or(0)
    }

    /// Total units held across all operators
    pub fn total(&self) -> i64 {
        self.0.values().filter(|units| **units > 0).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Add `delta` units to `name`, dropping the entry once it reaches zero.
    ///
    /// The ledger is left unchanged when the new count would overflow.
    pub fn apply_delta(&mut self, name: &str, delta: i64) -> AppResult<()> {
        if delta == 0 {
            return Ok(());
        }
        let units = self.held(name).checked_add(delta).ok_or_else(|| {
            AppError::Validation(format!("Quantity held by {} is out of range", name))
        })?;
        if units <= 0 {
            self.0.shift_remove(name);
        } else {
            self.0.insert(name.to_string(), units);
        }
        Ok(())
    }

    /// Take back `qty` units from `name`, refusing if they hold fewer
    pub fn withdraw(&mut self, codice: &str, name: &str, qty: i64) -> AppResult<()> {
        let held = self.held(name);
        if !self.0.contains_key(name) || held < qty {
            return Err(AppError::NotHeld {
                codice: codice.to_string(),
                operatore: name.to_string(),
                requested: qty,
                held,
            });
        }
        self.apply_delta(name, -qty)
    }

    /// Human readable form, e.g. `Filippo (2), Cristian (1)`
    pub fn formatted(&self) -> String {
        self.0
            .iter()
            .map(|(name, units)| format!("{} ({})", name, units))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Decode, adjust one operator, re-encode
pub fn apply_delta(raw: &str, name: &str, delta: i64) -> AppResult<String> {
    let mut ledger = OperatorLedger::decode(raw);
    ledger.apply_delta(name, delta)?;
    Ok(ledger.encode())
}
