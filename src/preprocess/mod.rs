//! Preprocessing operations applied between decode and encode.

pub mod quant;
pub mod resize;
pub mod rotate;

pub use quant::QuantOptions;
pub use resize::{ResizeMethod, ResizeOptions, resize_with_aspect};
pub use rotate::RotateOptions;

/// The fixed set of preprocessing operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Preprocessor {
    Resize,
    Quant,
    Rotate,
}

impl Preprocessor {
    /// All preprocessors, in registry order.
    pub const ALL: [Preprocessor; 3] = [
        Preprocessor::Resize,
        Preprocessor::Quant,
        Preprocessor::Rotate,
    ];

    /// Registry key.
    pub fn key(self) -> &'static str {
        match self {
            Preprocessor::Resize => "resize",
            Preprocessor::Quant => "quant",
            Preprocessor::Rotate => "rotate",
        }
    }

    /// Look up a preprocessor by registry key.
    pub fn from_key(key: &str) -> Option<Self> {
        Preprocessor::ALL.into_iter().find(|p| p.key() == key)
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Preprocessor::Resize => "Resize",
            Preprocessor::Quant => "ImageQuant",
            Preprocessor::Rotate => "Rotate",
        }
    }

    /// Human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            Preprocessor::Resize => "Resize the image before compressing",
            Preprocessor::Quant => "Reduce the number of colors used (aka. paletting)",
            Preprocessor::Rotate => "Rotate image",
        }
    }
}
