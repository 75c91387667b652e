use std::sync::Arc;

use crate::{host::DocumentPort, models::SelectionBounds};

/// Reads the active selection. Absence and query failures both mean "no selection".
#[derive(Clone)]
pub struct BoundsResolver {
    document: Arc<dyn DocumentPort>,
}

impl BoundsResolver {
    pub fn new(document: Arc<dyn DocumentPort>) -> Self {
        Self { document }
    }

    pub async fn has_selection(&self) -> bool {
        self.bounds().await.is_some()
    }

    pub async fn bounds(&self) -> Option<SelectionBounds> {
        match self.document.selection_bounds().await {
            Ok(Some(bounds)) if bounds.is_empty() => {
                log::debug!("Ignoring zero-area selection {}", bounds);
                None
            }
            Ok(bounds) => bounds,
            Err(e) => {
                log::debug!("Selection query failed, treating as no selection: {}", e);
                None
            }
        }
    }
}
