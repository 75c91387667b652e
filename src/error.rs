use thiserror::Error;

/// Cause of a failed round trip to the generation endpoint.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Gemini API Error: {message}")]
    Status { status: u16, message: String },
    #[error("Malformed response: {0}")]
    Parse(String),
    #[error("No image generated in response")]
    NoImageInResponse,
}

#[derive(Debug, Error)]
pub enum GenFillError {
    #[error("Please open a document first!")]
    NoDocument,
    #[error(
        "API Key Required! Get a key from https://aistudio.google.com/app/apikey and set GEMINI_API_KEY"
    )]
    MissingApiKey,
    #[error("Please make a selection first!")]
    NoSelection,
    #[error("Please enter a prompt!")]
    EmptyPrompt,
    #[error("Export failed: {message}")]
    Export { message: String },
    #[error("Failed to {action} image: {source}")]
    Generation {
        action: &'static str,
        #[source]
        source: RemoteError,
    },
    #[error("Compositing failed: {message}")]
    Compositing { message: String },
    #[error("Host error: {message}")]
    Host { message: String },
}

impl GenFillError {
    pub fn export(message: impl Into<String>) -> Self {
        GenFillError::Export {
            message: message.into(),
        }
    }

    pub fn compositing(message: impl Into<String>) -> Self {
        GenFillError::Compositing {
            message: message.into(),
        }
    }

    pub fn host(message: impl Into<String>) -> Self {
        GenFillError::Host {
            message: message.into(),
        }
    }

    /// True for failures raised before any document mutation.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            GenFillError::NoDocument
                | GenFillError::MissingApiKey
                | GenFillError::NoSelection
                | GenFillError::EmptyPrompt
        )
    }
}

pub type Result<T> = std::result::Result<T, GenFillError>;
