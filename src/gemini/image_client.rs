use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use crate::{
    config::{GeminiConfig, DEFAULT_TEMPERATURE},
    error::{GenFillError, RemoteError, Result},
    gemini::transport::{ReqwestTransport, Transport, TransportResponse},
    models::{
        gemini::{
            ErrorEnvelope, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
            InlineDataRequest, RequestContent, RequestPart,
        },
        ImageFormat, ImagePayload,
    },
};

pub const TOP_K: u32 = 40;
pub const TOP_P: f64 = 0.95;
pub const RESPONSE_MODALITY: &str = "image";
pub const RESPONSE_IMAGE_TYPE: &str = "image/png";

/// One generation call. A reference image switches from create to transform.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub instruction: String,
    pub reference_image: Option<ImagePayload>,
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
}

impl GenerationRequest {
    pub fn new(instruction: impl Into<String>, temperature: Option<f64>) -> Self {
        Self {
            instruction: instruction.into(),
            reference_image: None,
            temperature: temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_k: TOP_K,
            top_p: TOP_P,
        }
    }

    pub fn with_reference(mut self, image: ImagePayload) -> Self {
        self.reference_image = Some(image);
        self
    }

    pub fn action(&self) -> &'static str {
        if self.reference_image.is_some() {
            "edit"
        } else {
            "generate"
        }
    }

    pub fn to_wire(&self) -> GenerateContentRequest {
        let mut parts = vec![RequestPart::Text {
            text: self.instruction.clone(),
        }];
        if let Some(image) = &self.reference_image {
            parts.push(RequestPart::InlineData {
                inline_data: InlineDataRequest {
                    mime_type: image.mime_type().to_string(),
                    data: image.to_base64(),
                },
            });
        }

        GenerateContentRequest {
            contents: vec![RequestContent { parts }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                top_k: self.top_k,
                top_p: self.top_p,
                response_modalities: vec![RESPONSE_MODALITY.to_string()],
                response_image_type: RESPONSE_IMAGE_TYPE.to_string(),
            },
        }
    }
}

/// Stateless client for the image model. Every call is one independent round trip.
#[derive(Clone)]
pub struct GenerationClient {
    config: GeminiConfig,
    transport: Arc<dyn Transport>,
}

impl GenerationClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(config: GeminiConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn has_credential(&self) -> bool {
        self.config.has_credential()
    }

    pub async fn generate(
        &self,
        instruction: &str,
        temperature: Option<f64>,
    ) -> Result<ImagePayload> {
        self.send(GenerationRequest::new(instruction, temperature)).await
    }

    pub async fn edit(
        &self,
        source: &ImagePayload,
        instruction: &str,
        temperature: Option<f64>,
    ) -> Result<ImagePayload> {
        let request =
            GenerationRequest::new(instruction, temperature).with_reference(source.clone());
        self.send(request).await
    }

    pub async fn send(&self, request: GenerationRequest) -> Result<ImagePayload> {
        if !self.has_credential() {
            return Err(GenFillError::MissingApiKey);
        }

        let action = request.action();
        log::info!("Requesting {} from model: {}", action, self.config.model);
        if let Some(image) = &request.reference_image {
            log::debug!("Reference image: {} bytes ({})", image.len(), image.mime_type());
        }

        self.round_trip(&request).await.map_err(|source| {
            log::error!("Gemini {} call failed: {:?}", action, source);
            GenFillError::Generation { action, source }
        })
    }

    async fn round_trip(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<ImagePayload, RemoteError> {
        let body = serde_json::to_value(request.to_wire())
            .map_err(|e| RemoteError::Parse(format!("failed to encode request: {}", e)))?;

        log::debug!("POST {}", self.config.redacted_endpoint());
        let response = self.transport.post_json(&self.config.endpoint(), &body).await?;

        if !response.is_success() {
            return Err(status_error(&response));
        }
        parse_response(&response.body)
    }
}

/// Extracts the first inline image from a successful response body.
pub fn parse_response(body: &str) -> std::result::Result<ImagePayload, RemoteError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| RemoteError::Parse(format!("invalid response JSON: {}", e)))?;

    let blob = response
        .first_inline_image()
        .ok_or(RemoteError::NoImageInResponse)?;

    let format = ImageFormat::from_mime_type(blob.mime_type.as_deref());
    let payload = ImagePayload::from_base64(format, &blob.data)?;
    if payload.is_empty() {
        return Err(RemoteError::NoImageInResponse);
    }
    log::debug!("Received {} bytes of {}", payload.len(), payload.mime_type());
    Ok(payload)
}

fn status_error(response: &TransportResponse) -> RemoteError {
    let remote_message = serde_json::from_str::<ErrorEnvelope>(&response.body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
        .filter(|message| !message.trim().is_empty());

    let message = remote_message.unwrap_or_else(|| {
        StatusCode::from_u16(response.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", response.status))
    });

    RemoteError::Status {
        status: response.status,
        message,
    }
}

/// Shape of a minimal success body, handy for fakes and fixtures.
pub fn inline_image_response(payload: &ImagePayload) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {
                "parts": [{
                    "inlineData": {
                        "mimeType": payload.mime_type(),
                        "data": payload.to_base64()
                    }
                }]
            }
        }]
    })
}
