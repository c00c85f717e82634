//! Codec descriptor tables: encoder defaults, auto-optimize parameters, and
//! backend module wiring.
//!
//! Encoder options are open JSON object maps validated only by the external
//! codec; this layer merges user-supplied options over the per-codec defaults
//! and passes the result through untouched.

use serde_json::{Value, json};

use crate::capability::CapabilityDetector;
use crate::format::Codec;
use crate::module::{ModuleKind, ModuleLink};

/// Encoder option bag, keyed by option name.
pub type EncoderOptions = serde_json::Map<String, Value>;

/// The designated size/quality lever for an external auto-optimize search.
///
/// `min` and `max` are a search order, not numeric bounds: the search
/// traverses from `min` toward `max`, and for some codecs the `min` end is
/// the numerically higher setting (AVIF searches `cqLevel` from 62 down to
/// 0, OxiPNG searches `level` from 6 down to 1).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutoOptimize {
    pub option: &'static str,
    pub min: f64,
    pub max: f64,
}

/// Overlay user-supplied options on top of a default table.
pub fn merge_options(mut defaults: EncoderOptions, user: &EncoderOptions) -> EncoderOptions {
    for (key, value) in user {
        defaults.insert(key.clone(), value.clone());
    }
    defaults
}

fn object(value: Value) -> EncoderOptions {
    match value {
        Value::Object(map) => map,
        _ => EncoderOptions::new(),
    }
}

impl Codec {
    /// Default encoder options for this codec.
    pub fn default_encoder_options(self) -> EncoderOptions {
        object(match self {
            Codec::MozJpeg => json!({
                "quality": 75,
                "baseline": false,
                "arithmetic": false,
                "progressive": true,
                "optimize_coding": true,
                "smoothing": 0,
                "color_space": 3, // YCbCr
                "quant_table": 3,
                "trellis_multipass": false,
                "trellis_opt_zero": false,
                "trellis_opt_table": false,
                "trellis_loops": 1,
                "auto_subsample": true,
                "chroma_subsample": 2,
                "separate_chroma_quality": false,
                "chroma_quality": 75,
            }),
            Codec::WebP => json!({
                "quality": 75,
                "target_size": 0,
                "target_PSNR": 0,
                "method": 4,
                "sns_strength": 50,
                "filter_strength": 60,
                "filter_sharpness": 0,
                "filter_type": 1,
                "partitions": 0,
                "segments": 4,
                "pass": 1,
                "show_compressed": 0,
                "preprocessing": 0,
                "autofilter": 0,
                "partition_limit": 0,
                "alpha_compression": 1,
                "alpha_filtering": 1,
                "alpha_quality": 100,
                "lossless": 0,
                "exact": 0,
                "image_hint": 0,
                "emulate_jpeg_size": 0,
                "thread_level": 0,
                "low_memory": 0,
                "near_lossless": 100,
                "use_delta_palette": 0,
                "use_sharp_yuv": 0,
            }),
            Codec::Avif => json!({
                "cqLevel": 33,
                "cqAlphaLevel": -1,
                "denoiseLevel": 0,
                "tileColsLog2": 0,
                "tileRowsLog2": 0,
                "speed": 6,
                "subsample": 1,
                "chromaDeltaQ": false,
                "sharpness": 0,
                "tune": 0, // auto
            }),
            Codec::Jxl => json!({
                "speed": 4,
                "quality": 75,
                "progressive": false,
                "epf": -1,
                "nearLossless": 0,
                "lossyPalette": false,
                "decodingSpeedTier": 0,
            }),
            Codec::Wp2 => json!({
                "quality": 75,
                "alpha_quality": 75,
                "effort": 5,
                "pass": 1,
                "sns": 50,
                "uv_mode": 0,   // UVModeAuto
                "csp_type": 0,  // kYCoCg
                "error_diffusion": 0,
                "use_random_matrix": false,
            }),
            Codec::OxiPng => json!({
                "level": 2,
                "interlace": false,
            }),
        })
    }

    /// Auto-optimize search parameters for this codec.
    pub fn auto_optimize(self) -> AutoOptimize {
        match self {
            Codec::MozJpeg => AutoOptimize {
                option: "quality",
                min: 0.0,
                max: 100.0,
            },
            Codec::WebP => AutoOptimize {
                option: "quality",
                min: 0.0,
                max: 100.0,
            },
            Codec::Avif => AutoOptimize {
                option: "cqLevel",
                min: 62.0,
                max: 0.0,
            },
            Codec::Jxl => AutoOptimize {
                option: "quality",
                min: 0.0,
                max: 100.0,
            },
            Codec::Wp2 => AutoOptimize {
                option: "quality",
                min: 0.0,
                max: 100.0,
            },
            Codec::OxiPng => AutoOptimize {
                option: "level",
                min: 6.0,
                max: 1.0,
            },
        }
    }

    /// The module that decodes this format.
    ///
    /// OxiPNG has no decoder of its own; decoding goes through the PNG codec
    /// companion module.
    pub(crate) fn decoder_module(self) -> ModuleKind {
        match self {
            Codec::MozJpeg => ModuleKind::MozJpegDec,
            Codec::WebP => ModuleKind::WebPDec,
            Codec::Avif => ModuleKind::AvifDec,
            Codec::Jxl => ModuleKind::JxlDec,
            Codec::Wp2 => ModuleKind::Wp2Dec,
            Codec::OxiPng => ModuleKind::Png,
        }
    }

    /// The module that encodes this format, with its wiring.
    ///
    /// AVIF has two functionally equivalent encoder variants; when the
    /// runtime supports threading the threaded module is selected and its
    /// worker pool sized from the hardware-concurrency hint. Both variants
    /// expose an identical calling contract.
    pub(crate) fn encoder_module(self, capabilities: &CapabilityDetector) -> (ModuleKind, ModuleLink) {
        match self {
            Codec::MozJpeg => (ModuleKind::MozJpegEnc, ModuleLink::default()),
            Codec::WebP => (ModuleKind::WebPEnc, ModuleLink::default()),
            Codec::Avif => {
                if capabilities.threading_available() {
                    (
                        ModuleKind::AvifEncMt,
                        ModuleLink {
                            worker_threads: Some(capabilities.hardware_concurrency()),
                        },
                    )
                } else {
                    (ModuleKind::AvifEnc, ModuleLink::default())
                }
            }
            Codec::Jxl => (ModuleKind::JxlEnc, ModuleLink::default()),
            Codec::Wp2 => (ModuleKind::Wp2Enc, ModuleLink::default()),
            Codec::OxiPng => (ModuleKind::OxiPng, ModuleLink::default()),
        }
    }
}
