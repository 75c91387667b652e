use std::sync::Arc;

use uuid::Uuid;

use crate::{
    config::SessionConfig,
    error::{GenFillError, Result},
    gemini::GenerationClient,
    host::{DocumentPort, StagingArea},
    logger,
    models::{extend_instruction, TransformKind},
    pipeline::{
        bounds::BoundsResolver,
        compositor::{LayerCompositor, PlacedLayer},
        exporter::RegionExporter,
    },
};

pub const DEFAULT_EXTEND_DIRECTION: &str = "all sides";
pub const EDITED_LAYER_NAME: &str = "Generated Content";
pub const EXTENDED_LAYER_NAME: &str = "Extended Image";
const LAYER_NAME_PROMPT_CHARS: usize = 30;
const SELECTION_TIP: &str =
    "Tip: press Q to enter Quick Mask mode, paint the area you want to edit, then press Q again.";

/// The user-facing operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Generate { prompt: String },
    EditSelection { prompt: String },
    Transform(TransformKind),
    Extend { direction: String },
}

impl Operation {
    pub fn label(&self) -> String {
        match self {
            Operation::Generate { .. } => "generate".to_string(),
            Operation::EditSelection { .. } => "edit-selection".to_string(),
            Operation::Transform(kind) => format!("transform:{}", kind),
            Operation::Extend { direction } => format!("extend:{}", direction),
        }
    }

    fn checkpoint_name(&self) -> &'static str {
        match self {
            Operation::Generate { .. } => "Before Gemini Generation",
            Operation::EditSelection { .. } => "Before Gemini Edit",
            Operation::Transform(_) => "Before Transform",
            Operation::Extend { .. } => "Before Extend",
        }
    }

    fn requires_selection(&self) -> bool {
        matches!(self, Operation::EditSelection { .. } | Operation::Transform(_))
    }

    fn prompt(&self) -> Option<&str> {
        match self {
            Operation::Generate { prompt } | Operation::EditSelection { prompt } => {
                Some(prompt.as_str())
            }
            _ => None,
        }
    }

    fn success_message(&self) -> String {
        let detail = match self {
            Operation::Generate { .. } => "Image generated and added as new layer".to_string(),
            Operation::EditSelection { .. } => "Selection edited and replaced".to_string(),
            Operation::Transform(kind) => format!("{} applied", kind),
            Operation::Extend { .. } => "Image extended".to_string(),
        };
        format!("✅ Success!\n\n{}", detail)
    }

    fn failure_message(&self, error: &GenFillError) -> String {
        match (self, error) {
            (Operation::EditSelection { .. }, GenFillError::NoSelection) => {
                format!("❌ Error: {}\n\n{}", error, SELECTION_TIP)
            }
            _ => format!("❌ Error: {}", error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Failure,
}

/// A message for the person driving the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Sends notices to the log when no UI is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Success => log::info!("{}", notice.message),
            NoticeLevel::Failure => log::warn!("{}", notice.message),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperationReport {
    pub id: Uuid,
    pub operation: String,
    pub success: bool,
    pub message: String,
    pub layer: Option<PlacedLayer>,
}

/// Runs one operation at a time against a document: preconditions, checkpoint,
/// capture, remote call, composite, report.
pub struct EditSession {
    document: Arc<dyn DocumentPort>,
    client: GenerationClient,
    resolver: BoundsResolver,
    exporter: RegionExporter,
    compositor: LayerCompositor,
    notifier: Arc<dyn Notifier>,
    config: SessionConfig,
}

impl EditSession {
    pub fn new(
        document: Arc<dyn DocumentPort>,
        client: GenerationClient,
        config: SessionConfig,
    ) -> Self {
        let staging = StagingArea::new(config.staging_dir.clone());
        Self {
            resolver: BoundsResolver::new(document.clone()),
            exporter: RegionExporter::new(document.clone(), staging.clone()),
            compositor: LayerCompositor::new(document.clone(), staging),
            document,
            client,
            notifier: Arc::new(LogNotifier),
            config,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub async fn generate_from_prompt(&self, prompt: &str) -> OperationReport {
        self.run(Operation::Generate {
            prompt: prompt.to_string(),
        })
        .await
    }

    pub async fn edit_selection(&self, prompt: &str) -> OperationReport {
        self.run(Operation::EditSelection {
            prompt: prompt.to_string(),
        })
        .await
    }

    pub async fn transform_selection(&self, kind: &str) -> OperationReport {
        let kind: TransformKind = match kind.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        };
        self.run(Operation::Transform(kind)).await
    }

    pub async fn extend_image(&self, direction: Option<&str>) -> OperationReport {
        self.run(Operation::Extend {
            direction: direction.unwrap_or(DEFAULT_EXTEND_DIRECTION).to_string(),
        })
        .await
    }

    /// Every failure ends here: logged in full, reported to the user as one message.
    pub async fn run(&self, operation: Operation) -> OperationReport {
        let id = Uuid::new_v4();
        let label = operation.label();
        let _timer = logger::timer(&label);
        log::debug!("Operation {} started: {}", id, label);

        let outcome = self.execute(&operation).await;
        let (notice, layer) = match outcome {
            Ok(layer) => (
                Notice {
                    level: NoticeLevel::Success,
                    message: operation.success_message(),
                },
                Some(layer),
            ),
            Err(error) => {
                if error.is_precondition() {
                    log::warn!("{} aborted: {}", label, error);
                } else {
                    log::error!("{} failed: {:?}", label, error);
                }
                (
                    Notice {
                        level: NoticeLevel::Failure,
                        message: operation.failure_message(&error),
                    },
                    None,
                )
            }
        };

        self.notifier.notify(&notice);
        OperationReport {
            id,
            operation: label,
            success: notice.level == NoticeLevel::Success,
            message: notice.message,
            layer,
        }
    }

    async fn execute(&self, operation: &Operation) -> Result<PlacedLayer> {
        self.check_preconditions(operation).await?;
        self.checkpoint(operation.checkpoint_name()).await;

        let temperature = Some(self.config.temperature);
        match operation {
            Operation::Generate { prompt } => {
                log::info!("Generating image with Gemini...");
                let image = self.client.generate(prompt, temperature).await?;
                log::info!("Creating layer...");
                self.compositor
                    .place_image(image, &generated_layer_name(prompt))
                    .await
            }
            Operation::EditSelection { prompt } => self.edit_region(prompt).await,
            Operation::Transform(kind) => self.edit_region(&kind.instruction()).await,
            Operation::Extend { direction } => {
                log::info!("Getting context...");
                let document = self.exporter.export_document().await?;
                log::info!("Extending image...");
                let extended = self
                    .client
                    .edit(&document, &extend_instruction(direction), temperature)
                    .await?;
                log::info!("Creating result...");
                self.compositor
                    .place_image(extended, EXTENDED_LAYER_NAME)
                    .await
            }
        }
    }

    async fn edit_region(&self, instruction: &str) -> Result<PlacedLayer> {
        log::info!("Capturing selection...");
        let source = self
            .exporter
            .export_selection()
            .await?
            .ok_or(GenFillError::NoSelection)?;

        log::info!("Editing with Gemini...");
        let edited = self
            .client
            .edit(&source, instruction, Some(self.config.temperature))
            .await?;
        drop(source);

        log::info!("Applying result...");
        let bounds = self.resolver.bounds().await;
        self.compositor
            .replace_selection_content(edited, EDITED_LAYER_NAME, bounds)
            .await
    }

    async fn check_preconditions(&self, operation: &Operation) -> Result<()> {
        if !self.document.has_document().await {
            return Err(GenFillError::NoDocument);
        }
        if !self.client.has_credential() {
            return Err(GenFillError::MissingApiKey);
        }
        if operation.prompt().is_some_and(|prompt| prompt.trim().is_empty()) {
            return Err(GenFillError::EmptyPrompt);
        }
        if operation.requires_selection() && !self.resolver.has_selection().await {
            return Err(GenFillError::NoSelection);
        }
        Ok(())
    }

    async fn checkpoint(&self, name: &str) {
        if let Err(e) = self.document.create_checkpoint(name).await {
            log::warn!("History checkpoint '{}' could not be created: {}", name, e);
        }
    }
}

/// "Generated: " plus the first 30 characters of the prompt.
pub fn generated_layer_name(prompt: &str) -> String {
    let head: String = prompt.chars().take(LAYER_NAME_PROMPT_CHARS).collect();
    format!("Generated: {}", head)
}
