use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Canned one-click edits offered next to free-form prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuickTransform {
    Blur,
    Remove,
    Enhance,
    Colorize,
    Sharpen,
}

impl QuickTransform {
    pub const ALL: [QuickTransform; 5] = [
        QuickTransform::Blur,
        QuickTransform::Remove,
        QuickTransform::Enhance,
        QuickTransform::Colorize,
        QuickTransform::Sharpen,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            QuickTransform::Blur => "blur",
            QuickTransform::Remove => "remove",
            QuickTransform::Enhance => "enhance",
            QuickTransform::Colorize => "colorize",
            QuickTransform::Sharpen => "sharpen",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            QuickTransform::Blur => {
                "Blur the background of this image while keeping the subject sharp and in focus"
            }
            QuickTransform::Remove => {
                "Remove the selected object from this image and fill with appropriate background that matches the surrounding area"
            }
            QuickTransform::Enhance => {
                "Enhance and improve this image with better lighting, colors, and overall quality"
            }
            QuickTransform::Colorize => {
                "Add natural, realistic color to this black and white or grayscale image"
            }
            QuickTransform::Sharpen => {
                "Make this image sharper and more detailed with enhanced clarity"
            }
        }
    }
}

/// A quick transform request: a built-in kind, or any other text sent verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformKind {
    Builtin(QuickTransform),
    FreeText(String),
}

impl TransformKind {
    pub fn instruction(&self) -> Cow<'_, str> {
        match self {
            TransformKind::Builtin(kind) => Cow::Borrowed(kind.instruction()),
            TransformKind::FreeText(text) => Cow::Borrowed(text.as_str()),
        }
    }
}

impl FromStr for TransformKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match QuickTransform::from_key(s) {
            Some(kind) => TransformKind::Builtin(kind),
            None => TransformKind::FreeText(s.to_string()),
        })
    }
}

impl From<QuickTransform> for TransformKind {
    fn from(kind: QuickTransform) -> Self {
        TransformKind::Builtin(kind)
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformKind::Builtin(kind) => f.write_str(kind.key()),
            TransformKind::FreeText(text) => f.write_str(text),
        }
    }
}

/// Instruction for outward extension of the whole canvas.
pub fn extend_instruction(direction: &str) -> String {
    format!(
        "Extend this image naturally on {}, maintaining the same artistic style, composition, and visual consistency",
        direction
    )
}
