//! Data models for Magazzino

pub mod history;
pub mod operators;
pub mod tool;

// Re-export commonly used types
pub use history::{HistoryEvent, HistoryLog};
pub use operators::OperatorLedger;
pub use tool::{
    CheckoutRequest, CreateTool, LabelEntry, ReturnCondition, ReturnRequest, Tool, ToolQuery,
    ToolStatus, ToolView,
};
