//! Image transcoding orchestration over sandboxed codec modules.
//!
//! The compression and resampling algorithms themselves live in externally
//! compiled modules supplied through a [`BackendRuntime`]; this crate owns
//! everything around them: format detection by magic bytes, lazy
//! single-flight module instantiation and caching, encoder option tables,
//! capability-gated backend selection, and the resize/quantize/rotate
//! preprocessors.
//!
//! ```ignore
//! use sandcodecs::{Codec, CodecEngine, EncoderOptions};
//!
//! let engine = CodecEngine::new(runtime);
//! let image = engine.decode_auto(input_bytes).await?;
//! let webp = engine.encode(Codec::WebP, image, &EncoderOptions::new()).await?;
//! ```

pub mod capability;
pub mod codecs;
pub mod engine;
pub mod error;
pub mod format;
pub mod memory;
pub mod module;
pub mod pixel;
pub mod preprocess;

#[cfg(test)]
mod testutil;

pub use capability::CapabilityDetector;
pub use codecs::{AutoOptimize, EncoderOptions, merge_options};
pub use engine::CodecEngine;
pub use error::{BackendError, CodecError};
pub use format::{Codec, Signature};
pub use memory::{LinearMemory, MemoryError, PAGE_SIZE};
pub use module::{
    BackendRuntime, DecodeBackend, EncodeBackend, ModuleHandle, ModuleKind, ModuleLink,
    ModuleLoader, PngCodecBackend, PngOptimizerBackend, QuantizeBackend, ResizeBackend,
    RotateModule,
};
pub use pixel::Image;
pub use preprocess::{
    Preprocessor, QuantOptions, ResizeMethod, ResizeOptions, RotateOptions, resize_with_aspect,
};
