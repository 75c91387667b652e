pub mod raster;
pub mod staging;
pub mod traits;

pub use raster::{LayerInfo, RasterDocument};
pub use staging::{StagedFile, StagingArea};
pub use traits::{DocumentPort, LayerId};
