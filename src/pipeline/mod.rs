pub mod bounds;
pub mod compositor;
pub mod exporter;
pub mod session;

pub use bounds::BoundsResolver;
pub use compositor::{LayerCompositor, PlacedLayer, DEFAULT_LAYER_NAME};
pub use exporter::RegionExporter;
pub use session::{
    EditSession, LogNotifier, Notice, NoticeLevel, Notifier, Operation, OperationReport,
};
