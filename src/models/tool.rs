//! Tool record, its checkout/return state machine and listing filters

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{
    history::{HistoryEvent, HistoryLog},
    operators::OperatorLedger,
};
use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// ToolStatus
// ---------------------------------------------------------------------------

/// Tool status as stored in the inventory file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum ToolStatus {
    #[default]
    #[serde(rename = "in magazzino")]
    InMagazzino,
    #[serde(rename = "in uso")]
    InUso,
    #[serde(rename = "rotta")]
    Rotta,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::InMagazzino => "in magazzino",
            ToolStatus::InUso => "in uso",
            ToolStatus::Rotta => "rotta",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "in magazzino" => Some(ToolStatus::InMagazzino),
            "in uso" => Some(ToolStatus::InUso),
            "rotta" => Some(ToolStatus::Rotta),
            _ => None,
        }
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ReturnCondition
// ---------------------------------------------------------------------------

/// Condition declared when units come back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnCondition {
    InMagazzino,
    Rotta,
    /// Anything else; treated like a return to stock
    Other(String),
}

impl ReturnCondition {
    /// Missing or blank input means "in magazzino".
    ///
    /// The label is written into the history action, so it may not contain
    /// the history separators.
    pub fn parse(raw: Option<&str>) -> AppResult<Self> {
        let normalized = raw.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        if normalized.contains([':', '|']) {
            return Err(AppError::Validation(
                "Return condition cannot contain ':' or '|'".to_string(),
            ));
        }
        Ok(match normalized.as_str() {
            "" | "in magazzino" => ReturnCondition::InMagazzino,
            "rotta" => ReturnCondition::Rotta,
            _ => ReturnCondition::Other(normalized),
        })
    }

    pub fn label(&self) -> &str {
        match self {
            ReturnCondition::InMagazzino => "in magazzino",
            ReturnCondition::Rotta => "rotta",
            ReturnCondition::Other(label) => label,
        }
    }
}

// ---------------------------------------------------------------------------
// Tool
// ---------------------------------------------------------------------------

/// One tool type in the inventory, keyed by `codice`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Tool {
    pub codice: String,
    pub produttore: String,
    pub diametro: String,
    pub materiale: String,
    pub descrizione: String,
    pub tipo: String,
    pub cassetto: String,
    /// Units currently accounted for; follows checkouts and returns
    pub quantita: i64,
    /// Units that can be checked out right now
    pub quantita_disponibile: i64,
    pub stato: ToolStatus,
    /// Operator name -> units held
    #[schema(value_type = Object)]
    pub operatori: OperatorLedger,
    #[schema(value_type = Vec<HistoryEvent>)]
    pub storico: HistoryLog,
}

impl Tool {
    /// Fresh record from a create request
    pub fn new(data: &CreateTool) -> Self {
        Self {
            codice: data.codice.trim().to_string(),
            produttore: data.produttore.clone(),
            diametro: data.diametro.clone(),
            materiale: data.materiale.clone(),
            descrizione: data.descrizione.clone(),
            tipo: data.tipo.clone(),
            cassetto: data.cassetto.clone(),
            quantita: data.quantita,
            quantita_disponibile: data.quantita,
            stato: ToolStatus::InMagazzino,
            operatori: OperatorLedger::new(),
            storico: HistoryLog::new(),
        }
    }

    /// Merge more units into an existing record
    pub fn restock(&mut self, qty: i64) -> AppResult<()> {
        let quantita = add_units(&self.codice, self.quantita, qty)?;
        let disponibile = add_units(&self.codice, self.quantita_disponibile, qty)?;
        self.quantita = quantita;
        self.quantita_disponibile = disponibile;
        self.stato = ToolStatus::InMagazzino;
        Ok(())
    }

    /// Units checked out and not yet returned
    pub fn checked_out(&self) -> i64 {
        self.operatori.total()
    }

    /// Hand `qty` units to `operatore`
    pub fn checkout(&mut self, operatore: &str, qty: i64, now: NaiveDateTime) -> AppResult<()> {
        let operatore = validate_movement(operatore, qty)?;

        if qty > self.quantita_disponibile {
            return Err(AppError::InsufficientStock {
                codice: self.codice.clone(),
                requested: qty,
                available: self.quantita_disponibile,
            });
        }

        let quantita = add_units(&self.codice, self.quantita, -qty)?;
        self.operatori.apply_delta(operatore, qty)?;

        let previous_total = self.quantita;
        self.quantita_disponibile -= qty;
        self.quantita = quantita;
        self.stato = if self.quantita_disponibile < self.quantita
            || self.quantita_disponibile < previous_total
        {
            ToolStatus::InUso
        } else {
            ToolStatus::InMagazzino
        };

        self.storico
            .push(HistoryEvent::new(now, operatore, format!("PRELIEVO {}", qty)));
        Ok(())
    }

    /// Take back `qty` units from `operatore` in the given condition.
    ///
    /// Broken units leave circulation: only the ledger and status change.
    pub fn return_units(
        &mut self,
        operatore: &str,
        qty: i64,
        condition: &ReturnCondition,
        now: NaiveDateTime,
    ) -> AppResult<()> {
        let operatore = validate_movement(operatore, qty)?;

        let restored = match condition {
            ReturnCondition::Rotta => None,
            ReturnCondition::InMagazzino | ReturnCondition::Other(_) => Some((
                add_units(&self.codice, self.quantita, qty)?,
                add_units(&self.codice, self.quantita_disponibile, qty)?,
            )),
        };

        self.operatori.withdraw(&self.codice, operatore, qty)?;

        match restored {
            None => {
                self.stato = ToolStatus::Rotta;
            }
            Some((quantita, disponibile)) => {
                self.quantita = quantita;
                self.quantita_disponibile = disponibile;
                self.stato = ToolStatus::InMagazzino;
            }
        }

        self.storico.push(HistoryEvent::new(
            now,
            operatore,
            format!("RESTITUZIONE {} ({})", qty, condition.label()),
        ));
        Ok(())
    }
}

fn add_units(codice: &str, current: i64, delta: i64) -> AppResult<i64> {
    current.checked_add(delta).ok_or_else(|| {
        AppError::Validation(format!("Quantity of {} is out of range", codice))
    })
}

/// Operator must be a usable ledger key and quantity strictly positive
fn validate_movement(operatore: &str, qty: i64) -> AppResult<&str> {
    let operatore = operatore.trim();
    if operatore.is_empty() {
        return Err(AppError::Validation("Operator name is required".to_string()));
    }
    if operatore.contains([';', ':', '|']) {
        return Err(AppError::Validation(
            "Operator name cannot contain ';', ':' or '|'".to_string(),
        ));
    }
    if qty <= 0 {
        return Err(AppError::Validation("Quantity must be greater than 0".to_string()));
    }
    Ok(operatore)
}

/// Codes become file names and URL segments
pub fn validate_codice(codice: &str) -> AppResult<&str> {
    let codice = codice.trim();
    if codice.is_empty() {
        return Err(AppError::Validation("Tool code is required".to_string()));
    }
    if codice.contains(['/', '\\']) || codice == "." || codice == ".." {
        return Err(AppError::Validation(format!("Invalid tool code: {}", codice)));
    }
    Ok(codice)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Create (or restock) request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CreateTool {
    #[validate(length(min = 1, message = "Tool code is required"))]
    pub codice: String,
    #[serde(default)]
    pub produttore: String,
    #[serde(default)]
    pub diametro: String,
    #[serde(default)]
    pub materiale: String,
    #[serde(default)]
    pub descrizione: String,
    #[serde(default)]
    pub tipo: String,
    #[serde(default)]
    pub cassetto: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantita: i64,
}

/// Checkout request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub operatore: String,
    pub quantita: i64,
}

/// Return request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReturnRequest {
    pub operatore: String,
    pub quantita: i64,
    /// "in magazzino" (default), "rotta", or any other note
    pub stato: Option<String>,
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Listing filters; every supplied value must appear (case-insensitive) in its field
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ToolQuery {
    pub produttore: Option<String>,
    pub diametro: Option<String>,
    pub materiale: Option<String>,
    pub tipo: Option<String>,
    pub descrizione: Option<String>,
    pub codice: Option<String>,
}

impl ToolQuery {
    pub fn matches(&self, tool: &Tool) -> bool {
        let filters = [
            (&self.produttore, &tool.produttore),
            (&self.diametro, &tool.diametro),
            (&self.materiale, &tool.materiale),
            (&self.tipo, &tool.tipo),
            (&self.descrizione, &tool.descrizione),
            (&self.codice, &tool.codice),
        ];

        filters.iter().all(|(needle, field)| match needle {
            Some(needle) if !needle.trim().is_empty() => field
                .to_lowercase()
                .contains(&needle.trim().to_lowercase()),
            _ => true,
        })
    }

    /// Keep matching tools, in store order
    pub fn filter(&self, tools: Vec<Tool>) -> Vec<Tool> {
        tools.into_iter().filter(|t| self.matches(t)).collect()
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// Tool with the derived fields a client needs for display
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToolView {
    #[serde(flatten)]
    pub tool: Tool,
    /// Units currently out; the most that can be returned
    pub in_uso: i64,
    /// e.g. `Filippo (2), Cristian (1)`
    pub operatori_formattati: String,
    /// URL encoded in the tool's QR label
    pub qr_url: String,
}

impl ToolView {
    pub fn new(tool: Tool, qr_url: String) -> Self {
        Self {
            in_uso: tool.checked_out(),
            operatori_formattati: tool.operatori.formatted(),
            qr_url,
            tool,
        }
    }
}

/// Entry of the label sheet
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LabelEntry {
    pub codice: String,
    pub descrizione: String,
    pub cassetto: String,
    pub qr_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|d| d.and_hms_opt(8, 15, 0))
            .unwrap()
    }

    fn tool(codice: &str, quantita: i64) -> Tool {
        Tool::new(&CreateTool {
            codice: codice.to_string(),
            produttore: "Sandvik".to_string(),
            diametro: "6".to_string(),
            materiale: "HSS".to_string(),
            descrizione: "Punta elicoidale".to_string(),
            tipo: "punta".to_string(),
            cassetto: "A3".to_string(),
            quantita,
        })
    }

    #[test]
    fn test_new_tool_is_in_stock() {
        let t = tool("T1", 10);
        assert_eq!(t.quantita, 10);
        assert_eq!(t.quantita_disponibile, 10);
        assert_eq!(t.stato, ToolStatus::InMagazzino);
        assert!(t.operatori.is_empty());
        assert!(t.storico.is_empty());
    }

    #[test]
    fn test_checkout_moves_units_to_operator() {
        let mut t = tool("T1", 10);
        t.checkout("Alice", 3, now()).unwrap();

        assert_eq!(t.quantita_disponibile, 7);
        assert_eq!(t.quantita, 7);
        assert_eq!(t.operatori.encode(), "Alice:3");
        assert_eq!(t.stato, ToolStatus::InUso);
        assert_eq!(t.storico.encode(), "2024-03-05 08:15:00:: Alice:: PRELIEVO 3");
    }

    #[test]
    fn test_checkout_then_full_return_restores_quantities() {
        let mut t = tool("T1", 10);
        t.checkout("Alice", 3, now()).unwrap();
        t.return_units("Alice", 3, &ReturnCondition::InMagazzino, now())
            .unwrap();

        assert_eq!(t.quantita_disponibile, 10);
        assert_eq!(t.quantita, 10);
        assert!(t.operatori.is_empty());
        assert_eq!(t.stato, ToolStatus::InMagazzino);
        assert_eq!(t.storico.len(), 2);
        assert_eq!(
            t.storico.last().map(|e| e.azione.as_str()),
            Some("RESTITUZIONE 3 (in magazzino)")
        );
    }

    #[test]
    fn test_checkout_beyond_availability_leaves_state_unchanged() {
        let mut t = tool("T1", 10);
        t.checkout("Alice", 3, now()).unwrap();
        let before = t.clone();

        let err = t.checkout("Bob", 20, now()).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { available: 7, requested: 20, .. }));
        assert_eq!(t, before);
    }

    #[test]
    fn test_checkout_validation() {
        let mut t = tool("T1", 10);
        assert!(matches!(t.checkout("  ", 1, now()), Err(AppError::Validation(_))));
        assert!(matches!(t.checkout("Alice", 0, now()), Err(AppError::Validation(_))));
        assert!(matches!(t.checkout("Alice", -2, now()), Err(AppError::Validation(_))));
        assert!(matches!(t.checkout("A;B", 1, now()), Err(AppError::Validation(_))));
        assert_eq!(t, tool("T1", 10));
    }

    #[test]
    fn test_checkout_trims_operator() {
        let mut t = tool("T1", 10);
        t.checkout("  Alice ", 2, now()).unwrap();
        assert_eq!(t.operatori.held("Alice"), 2);
    }

    #[test]
    fn test_return_by_non_holder_is_rejected() {
        let mut t = tool("T1", 10);
        t.checkout("Alice", 3, now()).unwrap();
        let before = t.clone();

        let err = t
            .return_units("Bob", 1, &ReturnCondition::InMagazzino, now())
            .unwrap_err();
        assert!(matches!(err, AppError::NotHeld { held: 0, .. }));

        let err = t
            .return_units("Alice", 4, &ReturnCondition::InMagazzino, now())
            .unwrap_err();
        assert!(matches!(err, AppError::NotHeld { held: 3, .. }));
        assert_eq!(t, before);
    }

    #[test]
    fn test_broken_return_retires_units() {
        let mut t = tool("T1", 10);
        t.checkout("Alice", 3, now()).unwrap();
        t.return_units("Alice", 2, &ReturnCondition::Rotta, now()).unwrap();

        assert_eq!(t.stato, ToolStatus::Rotta);
        assert_eq!(t.quantita_disponibile, 7);
        assert_eq!(t.quantita, 7);
        assert_eq!(t.operatori.held("Alice"), 1);
        assert_eq!(
            t.storico.last().map(|e| e.azione.as_str()),
            Some("RESTITUZIONE 2 (rotta)")
        );
    }

    #[test]
    fn test_other_condition_returns_to_stock() {
        let mut t = tool("T1", 5);
        t.checkout("Alice", 2, now()).unwrap();
        let condition = ReturnCondition::parse(Some(" Da Affilare ")).unwrap();
        t.return_units("Alice", 2, &condition, now()).unwrap();

        assert_eq!(t.quantita_disponibile, 5);
        assert_eq!(t.stato, ToolStatus::InMagazzino);
        assert_eq!(
            t.storico.last().map(|e| e.azione.as_str()),
            Some("RESTITUZIONE 2 (da affilare)")
        );
    }

    #[test]
    fn test_restock_adds_to_both_quantities() {
        let mut t = tool("T1", 10);
        t.checkout("Alice", 3, now()).unwrap();
        t.return_units("Alice", 3, &ReturnCondition::InMagazzino, now())
            .unwrap();
        t.restock(5).unwrap();

        assert_eq!(t.quantita, 15);
        assert_eq!(t.quantita_disponibile, 15);
        assert_eq!(t.stato, ToolStatus::InMagazzino);
    }

    #[test]
    fn test_ledger_sum_tracks_outstanding_units() {
        let mut t = tool("T1", 20);
        let mut outstanding = 0;
        let steps: [(&str, i64, bool); 6] = [
            ("Alice", 3, true),
            ("Bob", 5, true),
            ("Alice", 2, false),
            ("Carla", 4, true),
            ("Bob", 5, false),
            ("Alice", 1, false),
        ];
        for (who, qty, is_checkout) in steps {
            let history_before = t.storico.len();
            if is_checkout {
                t.checkout(who, qty, now()).unwrap();
                outstanding += qty;
            } else {
                t.return_units(who, qty, &ReturnCondition::InMagazzino, now())
                    .unwrap();
                outstanding -= qty;
            }
            assert!(t.quantita_disponibile >= 0);
            assert_eq!(t.checked_out(), outstanding);
            assert_eq!(t.storico.len(), history_before + 1);
        }
        assert_eq!(t.operatori.encode(), "Carla:4");
    }

    #[test]
    fn test_return_condition_parse() {
        assert_eq!(ReturnCondition::parse(None).unwrap(), ReturnCondition::InMagazzino);
        assert_eq!(ReturnCondition::parse(Some("")).unwrap(), ReturnCondition::InMagazzino);
        assert_eq!(ReturnCondition::parse(Some(" ROTTA ")).unwrap(), ReturnCondition::Rotta);
        assert_eq!(
            ReturnCondition::parse(Some("usurata")).unwrap(),
            ReturnCondition::Other("usurata".to_string())
        );
    }

    #[test]
    fn test_return_condition_rejects_history_separators() {
        for raw in [
            "ok||2024-01-01 00:00:00:: Mallory:: PRELIEVO 99",
            "ok|x",
            "nota: punta scheggiata",
        ] {
            assert!(matches!(
                ReturnCondition::parse(Some(raw)),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_restock_overflow_is_rejected() {
        let mut t = tool("T1", i64::MAX);
        let before = t.clone();

        let err = t.restock(1).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(t, before);
        assert!(t.quantita_disponibile >= 0);
    }

    #[test]
    fn test_return_overflow_leaves_state_unchanged() {
        let mut t = tool("T1", 5);
        t.checkout("Alice", 2, now()).unwrap();
        t.quantita = i64::MAX;
        t.quantita_disponibile = i64::MAX;
        let before = t.clone();

        let err = t
            .return_units("Alice", 2, &ReturnCondition::InMagazzino, now())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(t, before);

        // Broken units never come back into stock, so nothing can overflow
        t.return_units("Alice", 2, &ReturnCondition::Rotta, now()).unwrap();
        assert_eq!(t.quantita_disponibile, i64::MAX);
        assert!(t.operatori.is_empty());
    }

    #[test]
    fn test_checkout_overflowing_ledger_leaves_state_unchanged() {
        let mut t = tool("T1", 5);
        t.operatori = OperatorLedger::decode(&format!("Alice:{}", i64::MAX));
        let before = t.clone();

        let err = t.checkout("Alice", 1, now()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(t, before);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(ToolStatus::parse("In Uso"), Some(ToolStatus::InUso));
        assert_eq!(ToolStatus::parse("rotta"), Some(ToolStatus::Rotta));
        assert_eq!(ToolStatus::parse("perso"), None);
        assert_eq!(ToolStatus::InMagazzino.to_string(), "in magazzino");
    }

    #[test]
    fn test_validate_codice() {
        assert_eq!(validate_codice(" T1 ").unwrap(), "T1");
        assert!(validate_codice("").is_err());
        assert!(validate_codice("../etc").is_err());
        assert!(validate_codice("a\\b").is_err());
    }

    #[test]
    fn test_query_filters_case_insensitively() {
        let mut other = tool("F-200", 1);
        other.produttore = "Garant".to_string();
        other.tipo = "fresa".to_string();
        let tools = vec![tool("T1", 1), other, tool("T2", 1)];

        let query = ToolQuery {
            produttore: Some("SAND".to_string()),
            ..Default::default()
        };
        let codes: Vec<_> = query
            .filter(tools.clone())
            .into_iter()
            .map(|t| t.codice)
            .collect();
        assert_eq!(codes, vec!["T1", "T2"]);

        let query = ToolQuery {
            tipo: Some("Fre".to_string()),
            codice: Some("f-2".to_string()),
            ..Default::default()
        };
        assert_eq!(query.filter(tools.clone()).len(), 1);

        let query = ToolQuery {
            tipo: Some("fresa".to_string()),
            produttore: Some("sandvik".to_string()),
            ..Default::default()
        };
        assert!(query.filter(tools.clone()).is_empty());
    }

    #[test]
    fn test_blank_filters_impose_nothing() {
        let tools = vec![tool("T1", 1), tool("T2", 1)];
        let query = ToolQuery {
            materiale: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.filter(tools).len(), 2);
    }

    #[test]
    fn test_view_derives_fields() {
        let mut t = tool("T1", 10);
        t.checkout("Filippo", 2, now()).unwrap();
        t.checkout("Cristian", 1, now()).unwrap();
        let view = ToolView::new(t, "http://host/utensile/T1".to_string());
        assert_eq!(view.in_uso, 3);
        assert_eq!(view.operatori_formattati, "Filippo (2), Cristian (1)");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["codice"], "T1");
        assert_eq!(json["stato"], "in uso");
        assert_eq!(json["operatori"]["Filippo"], 2);
        assert_eq!(json["storico"][0]["azione"], "PRELIEVO 2");
    }
}
