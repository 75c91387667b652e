pub mod image_client;
pub mod transport;

pub use image_client::{GenerationClient, GenerationRequest};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
