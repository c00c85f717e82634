//! Backend module boundary: module identities, calling contracts, and the
//! lazy single-flight loader.
//!
//! Every codec and preprocessor algorithm lives in an externally compiled,
//! sandboxed module. This layer never looks inside one; it instantiates
//! modules through a [`BackendRuntime`], caches the resulting handles for
//! the process lifetime, and dispatches calls against them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;
use tracing::debug;

use crate::codecs::EncoderOptions;
use crate::error::{BackendError, CodecError};
use crate::memory::LinearMemory;
use crate::pixel::Image;

/// Identity of one cacheable backend module.
///
/// One variant per binary resource; the threaded AVIF encoder is a distinct
/// module from the plain one even though both expose the same calling
/// contract. The rotate module is absent on purpose: it is instantiated
/// fresh for every call and never cached (see
/// [`BackendRuntime::instantiate_rotate`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    MozJpegDec,
    MozJpegEnc,
    WebPDec,
    WebPEnc,
    AvifDec,
    AvifEnc,
    AvifEncMt,
    JxlDec,
    JxlEnc,
    Wp2Dec,
    Wp2Enc,
    Png,
    OxiPng,
    Resize,
    Quant,
}

impl ModuleKind {
    /// File name of the module's binary resource.
    pub fn binary(self) -> &'static str {
        match self {
            ModuleKind::MozJpegDec => "mozjpeg_dec.wasm",
            ModuleKind::MozJpegEnc => "mozjpeg_enc.wasm",
            ModuleKind::WebPDec => "webp_dec.wasm",
            ModuleKind::WebPEnc => "webp_enc.wasm",
            ModuleKind::AvifDec => "avif_dec.wasm",
            ModuleKind::AvifEnc => "avif_enc.wasm",
            ModuleKind::AvifEncMt => "avif_enc_mt.wasm",
            ModuleKind::JxlDec => "jxl_dec.wasm",
            ModuleKind::JxlEnc => "jxl_enc.wasm",
            ModuleKind::Wp2Dec => "wp2_dec.wasm",
            ModuleKind::Wp2Enc => "wp2_enc.wasm",
            ModuleKind::Png => "png.wasm",
            ModuleKind::OxiPng => "oxipng.wasm",
            ModuleKind::Resize => "resize.wasm",
            ModuleKind::Quant => "imagequant.wasm",
        }
    }

    /// Companion worker resource, for modules that run an internal thread
    /// pool.
    pub fn worker(self) -> Option<&'static str> {
        match self {
            ModuleKind::AvifEncMt => Some("avif_enc_mt.worker.js"),
            _ => None,
        }
    }
}

/// Wiring handed to the runtime when a module is instantiated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModuleLink {
    /// Worker pool size for modules with a companion worker resource.
    pub worker_threads: Option<usize>,
}

/// Decode entry point of a format decoder module.
///
/// Cached handles are shared across callers, so implementations must be safe
/// for concurrent calls; a non-reentrant backend must serialize internally.
pub trait DecodeBackend: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<Image, BackendError>;
}

impl core::fmt::Debug for dyn DecodeBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("dyn DecodeBackend")
    }
}

/// Encode entry point of a format encoder module.
///
/// `options` is the caller's option bag already merged over the codec
/// defaults; validation belongs to the backend.
pub trait EncodeBackend: Send + Sync {
    fn encode(&self, image: &Image, options: &EncoderOptions) -> Result<Vec<u8>, BackendError>;
}

/// The PNG codec companion module: baseline decode and encode without
/// optimization.
pub trait PngCodecBackend: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<Image, BackendError>;
    fn encode(&self, image: &Image) -> Result<Vec<u8>, BackendError>;
}

/// The OxiPNG optimizer module: rewrites an already-encoded PNG.
pub trait PngOptimizerBackend: Send + Sync {
    fn optimise(&self, png: &[u8], level: u8, interlace: bool) -> Result<Vec<u8>, BackendError>;
}

/// The resize module. Selects its resampling filter by positional index;
/// see [`crate::preprocess::ResizeMethod`] for the fixed name-to-index
/// mapping.
pub trait ResizeBackend: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn resize(
        &self,
        pixels: &[u8],
        input_width: u32,
        input_height: u32,
        output_width: u32,
        output_height: u32,
        method_index: u32,
        premultiply: bool,
        linear_rgb: bool,
    ) -> Result<Vec<u8>, BackendError>;
}

/// The palette quantization module.
pub trait QuantizeBackend: Send + Sync {
    fn quantize(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        max_num_colors: u32,
        dither: f32,
    ) -> Result<Vec<u8>, BackendError>;
}

/// One rotation module instance.
///
/// Unlike every other backend this one exposes its linear memory: the caller
/// writes the input buffer at byte offset 8 (the first 8 bytes are reserved
/// header space expected by the calling convention), invokes [`rotate`],
/// and reads the result from immediately after the input copy. The module
/// mutates its memory destructively, so instances are exclusive and
/// per-call.
///
/// [`rotate`]: RotateModule::rotate
pub trait RotateModule: Send {
    fn memory(&self) -> &LinearMemory;
    fn memory_mut(&mut self) -> &mut LinearMemory;
    fn rotate(&mut self, width: u32, height: u32, degrees: u32) -> Result<(), BackendError>;
}

/// Shared handle to one instantiated backend module.
///
/// Cached by the loader for the process lifetime; cloning shares the
/// underlying instance. The variant reflects which entry points the module
/// exports.
#[derive(Clone)]
pub enum ModuleHandle {
    Decoder(Arc<dyn DecodeBackend>),
    Encoder(Arc<dyn EncodeBackend>),
    PngCodec(Arc<dyn PngCodecBackend>),
    PngOptimizer(Arc<dyn PngOptimizerBackend>),
    Resize(Arc<dyn ResizeBackend>),
    Quantizer(Arc<dyn QuantizeBackend>),
}

impl ModuleHandle {
    pub fn decoder(&self, kind: ModuleKind) -> Result<Arc<dyn DecodeBackend>, CodecError> {
        match self {
            ModuleHandle::Decoder(backend) => Ok(Arc::clone(backend)),
            _ => Err(CodecError::MissingExport {
                module: kind.binary(),
                export: "decode",
            }),
        }
    }

    pub fn encoder(&self, kind: ModuleKind) -> Result<Arc<dyn EncodeBackend>, CodecError> {
        match self {
            ModuleHandle::Encoder(backend) => Ok(Arc::clone(backend)),
            _ => Err(CodecError::MissingExport {
                module: kind.binary(),
                export: "encode",
            }),
        }
    }

    pub fn png_codec(&self, kind: ModuleKind) -> Result<Arc<dyn PngCodecBackend>, CodecError> {
        match self {
            ModuleHandle::PngCodec(backend) => Ok(Arc::clone(backend)),
            _ => Err(CodecError::MissingExport {
                module: kind.binary(),
                export: "decode/encode",
            }),
        }
    }

    pub fn png_optimizer(
        &self,
        kind: ModuleKind,
    ) -> Result<Arc<dyn PngOptimizerBackend>, CodecError> {
        match self {
            ModuleHandle::PngOptimizer(backend) => Ok(Arc::clone(backend)),
            _ => Err(CodecError::MissingExport {
                module: kind.binary(),
                export: "optimise",
            }),
        }
    }

    pub fn resize(&self, kind: ModuleKind) -> Result<Arc<dyn ResizeBackend>, CodecError> {
        match self {
            ModuleHandle::Resize(backend) => Ok(Arc::clone(backend)),
            _ => Err(CodecError::MissingExport {
                module: kind.binary(),
                export: "resize",
            }),
        }
    }

    pub fn quantizer(&self, kind: ModuleKind) -> Result<Arc<dyn QuantizeBackend>, CodecError> {
        match self {
            ModuleHandle::Quantizer(backend) => Ok(Arc::clone(backend)),
            _ => Err(CodecError::MissingExport {
                module: kind.binary(),
                export: "quantize",
            }),
        }
    }
}

/// Supplier of the externally compiled computational modules.
///
/// Implementations read the module's binary resource, set it up in a sandbox
/// with its linear memory, and wire in companion resources named by
/// [`ModuleLink`]. Instantiation runs on the blocking pool.
pub trait BackendRuntime: Send + Sync + 'static {
    /// Instantiate the module for `kind`. The loader calls this at most once
    /// per kind per process (retried only after a failure).
    fn instantiate(&self, kind: ModuleKind, link: ModuleLink)
    -> Result<ModuleHandle, BackendError>;

    /// Instantiate a fresh rotation module. Called once per rotate
    /// operation; the caller takes exclusive ownership of the instance and
    /// its memory.
    fn instantiate_rotate(&self) -> Result<Box<dyn RotateModule>, BackendError>;
}

/// Lazy, once-only module instantiation with per-kind caching.
///
/// The first `load` for a kind triggers instantiation; calls arriving while
/// it is in flight attach to the same pending attempt. A resolved handle is
/// cached forever. A failed attempt propagates to every waiter and is not
/// cached, so a later call may retry.
pub struct ModuleLoader {
    runtime: Arc<dyn BackendRuntime>,
    cells: Mutex<HashMap<ModuleKind, Arc<OnceCell<ModuleHandle>>>>,
}

impl ModuleLoader {
    pub fn new(runtime: Arc<dyn BackendRuntime>) -> Self {
        Self {
            runtime,
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// The runtime backing this loader.
    pub fn runtime(&self) -> &Arc<dyn BackendRuntime> {
        &self.runtime
    }

    /// Load the module for `kind`, instantiating it on first use.
    ///
    /// Must be called from within a tokio runtime: instantiation is moved to
    /// the blocking pool.
    pub async fn load(&self, kind: ModuleKind, link: ModuleLink) -> Result<ModuleHandle, CodecError> {
        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(cells.entry(kind).or_default())
        };

        let handle = cell
            .get_or_try_init(|| async {
                debug!(module = kind.binary(), "instantiating backend module");
                let runtime = Arc::clone(&self.runtime);
                tokio::task::spawn_blocking(move || runtime.instantiate(kind, link))
                    .await
                    .map_err(|join| CodecError::Instantiation {
                        module: kind.binary(),
                        source: Box::new(join),
                    })?
                    .map_err(|source| CodecError::Instantiation {
                        module: kind.binary(),
                        source,
                    })
            })
            .await?;

        Ok(handle.clone())
    }
}
