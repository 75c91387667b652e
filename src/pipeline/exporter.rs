use std::sync::Arc;

use crate::{
    error::{GenFillError, Result},
    host::{DocumentPort, LayerId, StagingArea},
    models::{ImageFormat, ImagePayload},
    pipeline::bounds::BoundsResolver,
};

/// Captures the selection or the whole canvas as an encoded payload.
#[derive(Clone)]
pub struct RegionExporter {
    document: Arc<dyn DocumentPort>,
    resolver: BoundsResolver,
    staging: StagingArea,
}

impl RegionExporter {
    pub fn new(document: Arc<dyn DocumentPort>, staging: StagingArea) -> Self {
        Self {
            resolver: BoundsResolver::new(document.clone()),
            document,
            staging,
        }
    }

    /// `Ok(None)` when nothing is selected. The temporary layer is removed on every path.
    pub async fn export_selection(&self) -> Result<Option<ImagePayload>> {
        if !self.resolver.has_selection().await {
            return Ok(None);
        }

        self.document
            .copy_merged()
            .await
            .map_err(export_failure("copy merged selection"))?;
        let layer = self
            .document
            .paste_as_layer()
            .await
            .map_err(export_failure("paste selection as layer"))?;

        let encoded = self.encode_layer(layer).await;
        let removed = self.document.delete_layer(layer).await;

        match (encoded, removed) {
            (Ok(payload), Ok(())) => Ok(Some(payload)),
            (Ok(_), Err(e)) => Err(export_failure("remove temporary layer")(e)),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup)) => {
                log::error!("Temporary layer {} was left behind: {}", layer, cleanup);
                Err(e)
            }
        }
    }

    pub async fn export_document(&self) -> Result<ImagePayload> {
        let staged = self
            .staging
            .create("document.png")
            .map_err(export_failure("stage document"))?;

        let saved = match self.document.save_document(staged.path(), ImageFormat::Png).await {
            Ok(()) => staged.read().await,
            Err(e) => Err(e),
        };
        staged.close();

        let payload = into_payload(saved.map_err(export_failure("encode document"))?)?;
        log::debug!("Exported document: {} bytes", payload.len());
        Ok(payload)
    }

    async fn encode_layer(&self, layer: LayerId) -> Result<ImagePayload> {
        let staged = self
            .staging
            .create("selection.png")
            .map_err(export_failure("stage selection"))?;

        let saved = match self
            .document
            .save_layer(layer, staged.path(), ImageFormat::Png)
            .await
        {
            Ok(()) => staged.read().await,
            Err(e) => Err(e),
        };
        staged.close();

        let payload = into_payload(saved.map_err(export_failure("encode selection"))?)?;
        log::debug!("Exported selection: {} bytes", payload.len());
        Ok(payload)
    }
}

fn into_payload(bytes: Vec<u8>) -> Result<ImagePayload> {
    if bytes.is_empty() {
        return Err(GenFillError::export("host wrote an empty image"));
    }
    Ok(ImagePayload::png(bytes))
}

fn export_failure(step: &'static str) -> impl FnOnce(GenFillError) -> GenFillError {
    move |cause| GenFillError::export(format!("{}: {}", step, cause))
}
