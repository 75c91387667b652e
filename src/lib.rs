pub mod config;
pub mod error;
pub mod gemini;
pub mod host;
pub mod logger;
pub mod models;
pub mod pipeline;

#[cfg(test)]
mod testing;

pub use config::{GeminiConfig, SessionConfig};
pub use error::{GenFillError, RemoteError, Result};
pub use gemini::{GenerationClient, ReqwestTransport, Transport};
pub use host::{DocumentPort, LayerId, RasterDocument};
pub use models::{
    ImageFormat, ImagePayload, LayerBounds, PlacementTransform, QuickTransform, SelectionBounds,
    TransformKind,
};
pub use pipeline::{
    EditSession, LogNotifier, Notice, NoticeLevel, Notifier, Operation, OperationReport,
    PlacedLayer,
};
