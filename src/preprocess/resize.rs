//! Aspect-preserving resize.

use serde::{Deserialize, Serialize};

use crate::engine::{CodecEngine, run_backend};
use crate::error::CodecError;
use crate::module::{ModuleKind, ModuleLink};
use crate::pixel::Image;

/// Resampling algorithms, in the backend's positional order.
///
/// The backend selects its filter by index, so this mapping is closed and
/// the variants must not be reordered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMethod {
    Triangle = 0,
    Catrom = 1,
    Mitchell = 2,
    #[default]
    Lanczos3 = 3,
}

impl ResizeMethod {
    /// Parse a method name from the fixed set.
    pub fn from_name(name: &str) -> Result<Self, CodecError> {
        match name {
            "triangle" => Ok(ResizeMethod::Triangle),
            "catrom" => Ok(ResizeMethod::Catrom),
            "mitchell" => Ok(ResizeMethod::Mitchell),
            "lanczos3" => Ok(ResizeMethod::Lanczos3),
            other => Err(CodecError::UnknownAlgorithm(other.to_owned())),
        }
    }

    /// Method name.
    pub fn name(self) -> &'static str {
        match self {
            ResizeMethod::Triangle => "triangle",
            ResizeMethod::Catrom => "catrom",
            ResizeMethod::Mitchell => "mitchell",
            ResizeMethod::Lanczos3 => "lanczos3",
        }
    }

    /// Positional index understood by the resize backend.
    pub fn index(self) -> u32 {
        self as u32
    }
}

/// Resize options. A missing or zero target dimension is inferred from the
/// input aspect ratio; setting both stretches.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResizeOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub method: ResizeMethod,
    pub premultiply: bool,
    pub linear_rgb: bool,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            method: ResizeMethod::Lanczos3,
            premultiply: true,
            linear_rgb: true,
        }
    }
}

/// Resolve output dimensions, preserving aspect when only one target is
/// given.
///
/// A target of zero counts as unset. When both targets are set they are
/// returned unchanged (explicit stretch); when neither is set the call
/// fails. Inferred dimensions round half away from zero.
pub fn resize_with_aspect(
    input_width: u32,
    input_height: u32,
    target_width: Option<u32>,
    target_height: Option<u32>,
) -> Result<(u32, u32), CodecError> {
    let target_width = target_width.filter(|&w| w > 0);
    let target_height = target_height.filter(|&h| h > 0);

    match (target_width, target_height) {
        (None, None) => Err(CodecError::InvalidArguments(
            "need to specify at least width or height when resizing".to_owned(),
        )),
        (Some(width), Some(height)) => Ok((width, height)),
        (None, Some(height)) => {
            let width = f64::from(input_width) / f64::from(input_height) * f64::from(height);
            Ok((width.round() as u32, height))
        }
        (Some(width), None) => {
            let height = f64::from(input_height) / f64::from(input_width) * f64::from(width);
            Ok((width, height.round() as u32))
        }
    }
}

pub(crate) async fn apply(
    engine: &CodecEngine,
    image: Image,
    options: &ResizeOptions,
) -> Result<Image, CodecError> {
    let (width, height) =
        resize_with_aspect(image.width(), image.height(), options.width, options.height)?;

    let backend = engine
        .loader()
        .load(ModuleKind::Resize, ModuleLink::default())
        .await?
        .resize(ModuleKind::Resize)?;

    let ResizeOptions {
        method,
        premultiply,
        linear_rgb,
        ..
    } = *options;

    let pixels = run_backend(ModuleKind::Resize, move || {
        backend.resize(
            image.pixels(),
            image.width(),
            image.height(),
            width,
            height,
            method.index(),
            premultiply,
            linear_rgb,
        )
    })
    .await?;

    Image::new(width, height, pixels)
}
