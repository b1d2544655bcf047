//! QR label collaborator
//!
//! Every tool gets a printed label whose QR code points at the tool's page.
//! Images live in the label folder as `<codice>.png`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::Luma;
use qrcode::QrCode;

use crate::{
    error::{AppError, AppResult},
    models::{tool::validate_codice, Tool},
};

/// URL a tool's label encodes
pub fn label_url(public_base_url: &str, codice: &str) -> String {
    format!(
        "{}/utensile/{}",
        public_base_url.trim_end_matches('/'),
        codice.trim_matches('/')
    )
}

#[async_trait]
pub trait LabelGenerator: Send + Sync {
    /// Called after a tool is created or restocked
    async fn generate(&self, tool: &Tool, url: &str) -> AppResult<()>;

    /// Called when the label sheet is built; only fills in missing labels
    async fn ensure(&self, tool: &Tool, url: &str) -> AppResult<()> {
        self.generate(tool, url).await
    }

    /// Called after a tool is deleted
    async fn remove(&self, codice: &str) -> AppResult<()>;
}

/// Labels rendered to `<folder>/<codice>.png`
#[derive(Debug, Clone)]
pub struct LabelFolder {
    folder: PathBuf,
}

impl LabelFolder {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    /// Codes from a hand-edited inventory may not point outside the folder
    pub fn image_path(&self, codice: &str) -> AppResult<PathBuf> {
        let codice = validate_codice(codice)?;
        Ok(self.folder.join(format!("{}.png", codice)))
    }
}

fn render_qr(url: &str, path: &Path) -> AppResult<()> {
    let code = QrCode::new(url.as_bytes())
        .map_err(|e| AppError::Internal(format!("Cannot encode {} as QR: {}", url, e)))?;
    code.render::<Luma<u8>>()
        .build()
        .save(path)
        .map_err(|e| AppError::Internal(format!("Cannot write {}: {}", path.display(), e)))
}

#[async_trait]
impl LabelGenerator for LabelFolder {
    async fn generate(&self, tool: &Tool, url: &str) -> AppResult<()> {
        let path = self.image_path(&tool.codice)?;
        tokio::fs::create_dir_all(&self.folder).await?;

        let target = path.clone();
        let encoded = url.to_string();
        tokio::task::spawn_blocking(move || render_qr(&encoded, &target))
            .await
            .map_err(|e| AppError::Internal(format!("Label task failed: {}", e)))??;

        tracing::debug!("Wrote label {} for {}", path.display(), url);
        Ok(())
    }

    async fn ensure(&self, tool: &Tool, url: &str) -> AppResult<()> {
        let path = self.image_path(&tool.codice)?;
        if tokio::fs::try_exists(&path).await? {
            return Ok(());
        }
        tracing::info!("Label for {} is missing, regenerating", tool.codice);
        self.generate(tool, url).await
    }

    async fn remove(&self, codice: &str) -> AppResult<()> {
        let path = self.image_path(codice)?;
        if tokio::fs::try_exists(&path).await? {
            tokio::fs::remove_file(&path).await?;
            tracing::debug!("Removed label {}", path.display());
        }
        Ok(())
    }
}

/// Used when labels are disabled
#[derive(Debug, Clone, Default)]
pub struct NoLabels;

#[async_trait]
impl LabelGenerator for NoLabels {
    async fn generate(&self, _tool: &Tool, _url: &str) -> AppResult<()> {
        Ok(())
    }

    async fn remove(&self, _codice: &str) -> AppResult<()> {
        Ok(())
    }
}
