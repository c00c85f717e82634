//! Decode/encode dispatch built on the module loader.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::capability::CapabilityDetector;
use crate::codecs::{EncoderOptions, merge_options};
use crate::error::{BackendError, CodecError};
use crate::format::Codec;
use crate::module::{BackendRuntime, ModuleKind, ModuleLink, ModuleLoader};
use crate::pixel::Image;
use crate::preprocess::{QuantOptions, ResizeOptions, RotateOptions, quant, resize, rotate};

/// Orchestrates codecs and preprocessors over a set of sandboxed backend
/// modules.
///
/// One engine owns one module cache; modules are instantiated lazily on
/// first use and shared by every subsequent call. Backend call failures are
/// call-scoped and leave the cached module usable.
pub struct CodecEngine {
    loader: ModuleLoader,
    capabilities: CapabilityDetector,
}

impl CodecEngine {
    /// Engine with capabilities detected from the environment.
    pub fn new(runtime: Arc<dyn BackendRuntime>) -> Self {
        Self::with_capabilities(runtime, CapabilityDetector::from_env())
    }

    /// Engine with explicit capabilities.
    pub fn with_capabilities(
        runtime: Arc<dyn BackendRuntime>,
        capabilities: CapabilityDetector,
    ) -> Self {
        Self {
            loader: ModuleLoader::new(runtime),
            capabilities,
        }
    }

    pub fn capabilities(&self) -> &CapabilityDetector {
        &self.capabilities
    }

    pub(crate) fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    /// Detect the codec for encoded bytes. See [`Codec::detect`].
    pub fn detect_format(&self, data: &[u8]) -> Option<Codec> {
        Codec::detect(data)
    }

    /// Detect the input format and decode it.
    pub async fn decode_auto(&self, data: Vec<u8>) -> Result<Image, CodecError> {
        let codec = Codec::detect(&data).ok_or(CodecError::UnrecognizedFormat)?;
        self.decode(codec, data).await
    }

    /// Decode encoded bytes with the given codec's decoder module.
    pub async fn decode(&self, codec: Codec, data: Vec<u8>) -> Result<Image, CodecError> {
        let kind = codec.decoder_module();
        debug!(codec = codec.key(), module = kind.binary(), "decode");
        match codec {
            // PNG decoding goes through the companion codec module.
            Codec::OxiPng => {
                let png = self
                    .loader
                    .load(kind, ModuleLink::default())
                    .await?
                    .png_codec(kind)?;
                run_backend(kind, move || png.decode(&data)).await
            }
            _ => {
                let decoder = self
                    .loader
                    .load(kind, ModuleLink::default())
                    .await?
                    .decoder(kind)?;
                run_backend(kind, move || decoder.decode(&data)).await
            }
        }
    }

    /// Encode an image, merging `options` over the codec's defaults.
    pub async fn encode(
        &self,
        codec: Codec,
        image: Image,
        options: &EncoderOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let merged = merge_options(codec.default_encoder_options(), options);
        match codec {
            Codec::OxiPng => self.encode_oxipng(image, &merged).await,
            _ => {
                let (kind, link) = codec.encoder_module(&self.capabilities);
                debug!(codec = codec.key(), module = kind.binary(), "encode");
                let encoder = self.loader.load(kind, link).await?.encoder(kind)?;
                run_backend(kind, move || encoder.encode(&image, &merged)).await
            }
        }
    }

    /// Encode with the codec selected by registry key.
    pub async fn encode_by_key(
        &self,
        key: &str,
        image: Image,
        options: &EncoderOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let codec =
            Codec::from_key(key).ok_or_else(|| CodecError::UnsupportedFormat(key.to_owned()))?;
        self.encode(codec, image, options).await
    }

    /// OxiPNG encode needs two modules: the PNG codec for the baseline
    /// encode and the optimizer for the final pass. Both must be ready
    /// before the call proceeds.
    async fn encode_oxipng(
        &self,
        image: Image,
        options: &EncoderOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let png = self
            .loader
            .load(ModuleKind::Png, ModuleLink::default())
            .await?
            .png_codec(ModuleKind::Png)?;
        let oxi = self
            .loader
            .load(ModuleKind::OxiPng, ModuleLink::default())
            .await?
            .png_optimizer(ModuleKind::OxiPng)?;

        let level = options.get("level").and_then(Value::as_u64).unwrap_or(2) as u8;
        let interlace = options
            .get("interlace")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        run_backend(ModuleKind::OxiPng, move || {
            let baseline = png.encode(&image)?;
            oxi.optimise(&baseline, level, interlace)
        })
        .await
    }

    /// Resize, inferring missing target dimensions from the aspect ratio.
    pub async fn resize(&self, image: Image, options: &ResizeOptions) -> Result<Image, CodecError> {
        resize::apply(self, image, options).await
    }

    /// Reduce the image palette.
    pub async fn quantize(
        &self,
        image: Image,
        options: &QuantOptions,
    ) -> Result<Image, CodecError> {
        quant::apply(self, image, options).await
    }

    /// Rotate in quarter turns.
    pub async fn rotate(&self, image: Image, options: &RotateOptions) -> Result<Image, CodecError> {
        rotate::apply(self, image, options).await
    }
}

/// Run a backend call on the blocking pool, mapping failures to the
/// call-scoped error variant.
pub(crate) async fn run_backend<T, F>(kind: ModuleKind, call: F) -> Result<T, CodecError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BackendError> + Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|join| CodecError::Backend {
            module: kind.binary(),
            source: Box::new(join),
        })?
        .map_err(|source| CodecError::Backend {
            module: kind.binary(),
            source,
        })
}
