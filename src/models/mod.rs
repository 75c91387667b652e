pub mod gemini;
pub mod geometry;
pub mod payload;
pub mod transform;

pub use geometry::*;
pub use payload::*;
pub use transform::*;
