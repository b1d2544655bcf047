//! Inventory ledger service
//!
//! Every mutation loads the full record set, changes one tool and saves the
//! full set back. Mutations run one at a time behind `writer`, so two
//! requests can never overwrite each other's save.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tokio::sync::Mutex;
use validator::Validate;

use super::labels::{label_url, LabelGenerator};
use crate::{
    error::{AppError, AppResult},
    models::{
        tool::validate_codice, CheckoutRequest, CreateTool, LabelEntry, ReturnCondition,
        ReturnRequest, Tool, ToolQuery, ToolView,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct InventoryService {
    repository: Repository,
    labels: Arc<dyn LabelGenerator>,
    public_base_url: String,
    writer: Arc<Mutex<()>>,
}

impl InventoryService {
    pub fn new(
        repository: Repository,
        labels: Arc<dyn LabelGenerator>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            labels,
            public_base_url: public_base_url.into(),
            writer: Arc::new(Mutex::new(())),
        }
    }

    fn view(&self, tool: Tool) -> ToolView {
        let url = label_url(&self.public_base_url, &tool.codice);
        ToolView::new(tool, url)
    }

    /// List tools matching the query, in store order
    pub async fn list(&self, query: &ToolQuery) -> AppResult<Vec<ToolView>> {
        let tools = self.repository.tools.load().await?;
        Ok(query
            .filter(tools)
            .into_iter()
            .map(|tool| self.view(tool))
            .collect())
    }

    /// Get one tool by code
    pub async fn get(&self, codice: &str) -> AppResult<ToolView> {
        let tools = self.repository.tools.load().await?;
        tools
            .into_iter()
            .find(|t| t.codice == codice)
            .map(|tool| self.view(tool))
            .ok_or_else(|| not_found(codice))
    }

    /// Every tool with the URL its label encodes; missing label images are redrawn
    pub async fn labels(&self) -> AppResult<Vec<LabelEntry>> {
        let tools = self.repository.tools.load().await?;
        let mut entries = Vec::with_capacity(tools.len());
        for tool in tools {
            let qr_url = label_url(&self.public_base_url, &tool.codice);
            if let Err(e) = self.labels.ensure(&tool, &qr_url).await {
                tracing::warn!("Label for {} unavailable: {}", tool.codice, e);
            }
            entries.push(LabelEntry {
                qr_url,
                codice: tool.codice,
                descrizione: tool.descrizione,
                cassetto: tool.cassetto,
            });
        }
        Ok(entries)
    }

    /// Create a tool, or add units to the one with the same code.
    ///
    /// Returns the tool and whether it was newly created.
    pub async fn create_or_restock(&self, data: CreateTool) -> AppResult<(ToolView, bool)> {
        data.validate()?;
        let codice = validate_codice(&data.codice)?.to_string();

        let (tool, created) = {
            let _guard = self.writer.lock().await;
            let mut tools = self.repository.tools.load().await?;

            let (tool, created) = match tools.iter().position(|t| t.codice == codice) {
                Some(index) => {
                    tools[index].restock(data.quantita)?;
                    (tools[index].clone(), false)
                }
                None => {
                    let tool = Tool::new(&data);
                    tools.push(tool.clone());
                    (tool, true)
                }
            };

            self.repository.tools.save(&tools).await?;
            (tool, created)
        };

        if created {
            tracing::info!("Created tool {} with {} unit(s)", codice, tool.quantita);
        } else {
            tracing::info!(
                "Restocked tool {} with {} unit(s), now {}/{}",
                codice,
                data.quantita,
                tool.quantita_disponibile,
                tool.quantita
            );
        }

        let url = label_url(&self.public_base_url, &codice);
        if let Err(e) = self.labels.generate(&tool, &url).await {
            tracing::warn!("Label generation for {} failed: {}", codice, e);
        }

        Ok((self.view(tool), created))
    }

    /// Check out units to an operator
    pub async fn checkout(&self, codice: &str, request: &CheckoutRequest) -> AppResult<ToolView> {
        let now = now();
        let tool = self
            .mutate(codice, |tool| {
                tool.checkout(&request.operatore, request.quantita, now)
            })
            .await?;

        tracing::info!(
            "Checkout {}: {} took {}, available {}/{}",
            codice,
            request.operatore.trim(),
            request.quantita,
            tool.quantita_disponibile,
            tool.quantita
        );
        Ok(self.view(tool))
    }

    /// Take units back from an operator
    pub async fn return_tool(&self, codice: &str, request: &ReturnRequest) -> AppResult<ToolView> {
        let now = now();
        let condition = ReturnCondition::parse(request.stato.as_deref())?;
        let tool = self
            .mutate(codice, |tool| {
                tool.return_units(&request.operatore, request.quantita, &condition, now)
            })
            .await?;

        tracing::info!(
            "Return {}: {} gave back {} ({}), available {}/{}",
            codice,
            request.operatore.trim(),
            request.quantita,
            condition.label(),
            tool.quantita_disponibile,
            tool.quantita
        );
        Ok(self.view(tool))
    }

    /// Remove a tool and its label
    pub async fn delete(&self, codice: &str) -> AppResult<()> {
        {
            let _guard = self.writer.lock().await;
            let mut tools = self.repository.tools.load().await?;
            let index = tools
                .iter()
                .position(|t| t.codice == codice)
                .ok_or_else(|| not_found(codice))?;
            tools.remove(index);
            self.repository.tools.save(&tools).await?;
        }

        tracing::info!("Deleted tool {}", codice);

        if let Err(e) = self.labels.remove(codice).await {
            tracing::warn!("Label removal for {} failed: {}", codice, e);
        }
        Ok(())
    }

    /// Whether the store can be read
    pub async fn check_store(&self) -> AppResult<usize> {
        Ok(self.repository.tools.load().await?.len())
    }

    /// Load, apply `change` to one tool, save. Nothing is saved when `change` fails.
    async fn mutate<F>(&self, codice: &str, change: F) -> AppResult<Tool>
    where
        F: FnOnce(&mut Tool) -> AppResult<()>,
    {
        let _guard = self.writer.lock().await;
        let mut tools = self.repository.tools.load().await?;
        let tool = tools
            .iter_mut()
            .find(|t| t.codice == codice)
            .ok_or_else(|| not_found(codice))?;

        change(tool)?;
        let updated = tool.clone();

        self.repository.tools.save(&tools).await?;
        Ok(updated)
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn not_found(codice: &str) -> AppError {
    AppError::NotFound(format!("Tool {} not found", codice))
}
