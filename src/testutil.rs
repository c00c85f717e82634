//! In-memory stand-ins for the external backend modules, used across the
//! crate's tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::codecs::EncoderOptions;
use crate::error::BackendError;
use crate::memory::LinearMemory;
use crate::module::{
    BackendRuntime, DecodeBackend, EncodeBackend, ModuleHandle, ModuleKind, ModuleLink,
    PngCodecBackend, PngOptimizerBackend, QuantizeBackend, ResizeBackend, RotateModule,
};
use crate::pixel::Image;

/// Minimal PNG: signature plus an IHDR chunk carrying the dimensions.
pub fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(33);
    data.extend_from_slice(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    // Bit depth 8, color type RGBA, no compression/filter/interlace quirks,
    // and a placeholder CRC nothing here verifies.
    data.extend_from_slice(&[8, 6, 0, 0, 0]);
    data.extend_from_slice(&[0; 4]);
    data
}

/// Arguments of the most recent resize backend call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizeCall {
    pub output_width: u32,
    pub output_height: u32,
    pub method_index: u32,
    pub premultiply: bool,
    pub linear_rgb: bool,
}

fn injected(what: &str) -> BackendError {
    Box::new(std::io::Error::other(format!("injected {what} failure")))
}

#[derive(Default)]
struct Shared {
    counts: Mutex<HashMap<ModuleKind, usize>>,
    links: Mutex<HashMap<ModuleKind, ModuleLink>>,
    failing_instantiations: AtomicUsize,
    failing_calls: AtomicUsize,
    rotate_count: AtomicUsize,
    last_resize: Mutex<Option<ResizeCall>>,
    last_quant: Mutex<Option<(u32, f32)>>,
}

impl Shared {
    fn consume(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// A [`BackendRuntime`] whose modules run entirely in process memory.
///
/// Instantiations and backend calls are recorded for assertions, and both
/// can be made to fail a configured number of times.
#[derive(Default)]
pub struct StubRuntime {
    shared: Arc<Shared>,
    instantiation_delay: Option<Duration>,
}

impl StubRuntime {
    /// Sleep this long inside every `instantiate`, to widen race windows in
    /// concurrency tests.
    pub fn with_instantiation_delay(mut self, millis: u64) -> Self {
        self.instantiation_delay = Some(Duration::from_millis(millis));
        self
    }

    /// Fail the next `n` instantiation attempts.
    pub fn with_failing_instantiations(self, n: usize) -> Self {
        self.shared.failing_instantiations.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the next `n` encoder calls.
    pub fn with_failing_calls(self, n: usize) -> Self {
        self.shared.failing_calls.store(n, Ordering::SeqCst);
        self
    }

    /// How many times `kind` was successfully instantiated.
    pub fn instantiation_count(&self, kind: ModuleKind) -> usize {
        self.shared
            .counts
            .lock()
            .unwrap()
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    /// The link passed to the most recent successful instantiation of `kind`.
    pub fn link_for(&self, kind: ModuleKind) -> Option<ModuleLink> {
        self.shared.links.lock().unwrap().get(&kind).copied()
    }

    /// How many rotation instances were handed out.
    pub fn rotate_instantiations(&self) -> usize {
        self.shared.rotate_count.load(Ordering::SeqCst)
    }

    pub fn last_resize_call(&self) -> Option<ResizeCall> {
        *self.shared.last_resize.lock().unwrap()
    }

    pub fn last_quant_call(&self) -> Option<(u32, f32)> {
        *self.shared.last_quant.lock().unwrap()
    }

    fn handle_for(&self, kind: ModuleKind) -> ModuleHandle {
        match kind {
            ModuleKind::MozJpegDec
            | ModuleKind::WebPDec
            | ModuleKind::AvifDec
            | ModuleKind::JxlDec
            | ModuleKind::Wp2Dec => ModuleHandle::Decoder(Arc::new(StubDecoder)),
            ModuleKind::MozJpegEnc
            | ModuleKind::WebPEnc
            | ModuleKind::AvifEnc
            | ModuleKind::AvifEncMt
            | ModuleKind::JxlEnc
            | ModuleKind::Wp2Enc => ModuleHandle::Encoder(Arc::new(StubEncoder {
                shared: Arc::clone(&self.shared),
            })),
            ModuleKind::Png => ModuleHandle::PngCodec(Arc::new(StubPngCodec)),
            ModuleKind::OxiPng => ModuleHandle::PngOptimizer(Arc::new(StubPngOptimizer)),
            ModuleKind::Resize => ModuleHandle::Resize(Arc::new(StubResize {
                shared: Arc::clone(&self.shared),
            })),
            ModuleKind::Quant => ModuleHandle::Quantizer(Arc::new(StubQuantizer {
                shared: Arc::clone(&self.shared),
            })),
        }
    }
}

impl BackendRuntime for StubRuntime {
    fn instantiate(
        &self,
        kind: ModuleKind,
        link: ModuleLink,
    ) -> Result<ModuleHandle, BackendError> {
        if let Some(delay) = self.instantiation_delay {
            std::thread::sleep(delay);
        }
        if Shared::consume(&self.shared.failing_instantiations) {
            return Err(injected("instantiation"));
        }
        *self.shared.counts.lock().unwrap().entry(kind).or_insert(0) += 1;
        self.shared.links.lock().unwrap().insert(kind, link);
        Ok(self.handle_for(kind))
    }

    fn instantiate_rotate(&self) -> Result<Box<dyn RotateModule>, BackendError> {
        if Shared::consume(&self.shared.failing_instantiations) {
            return Err(injected("instantiation"));
        }
        self.shared.rotate_count.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubRotate {
            memory: LinearMemory::with_pages(1),
        }))
    }
}

struct StubDecoder;

impl DecodeBackend for StubDecoder {
    fn decode(&self, _data: &[u8]) -> Result<Image, BackendError> {
        Ok(Image::new(1, 1, vec![0; 4])?)
    }
}

/// Echoes the merged option bag back as the "encoded" output, so tests can
/// assert what the backend was asked to do.
struct StubEncoder {
    shared: Arc<Shared>,
}

impl EncodeBackend for StubEncoder {
    fn encode(&self, _image: &Image, options: &EncoderOptions) -> Result<Vec<u8>, BackendError> {
        if Shared::consume(&self.shared.failing_calls) {
            return Err(injected("encode"));
        }
        Ok(serde_json::to_vec(options)?)
    }
}

struct StubPngCodec;

impl PngCodecBackend for StubPngCodec {
    fn decode(&self, data: &[u8]) -> Result<Image, BackendError> {
        let dims = |at: usize| -> Result<u32, BackendError> {
            let bytes: [u8; 4] = data
                .get(at..at + 4)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| injected("truncated fixture"))?;
            Ok(u32::from_be_bytes(bytes))
        };
        let width = dims(16)?;
        let height = dims(20)?;
        Ok(Image::new(width, height, vec![0; (width * height * 4) as usize])?)
    }

    fn encode(&self, image: &Image) -> Result<Vec<u8>, BackendError> {
        Ok(png_fixture(image.width(), image.height()))
    }
}

/// Appends `[level, interlace]` so tests can see the options arrive.
struct StubPngOptimizer;

impl PngOptimizerBackend for StubPngOptimizer {
    fn optimise(&self, png: &[u8], level: u8, interlace: bool) -> Result<Vec<u8>, BackendError> {
        let mut out = png.to_vec();
        out.push(level);
        out.push(interlace as u8);
        Ok(out)
    }
}

struct StubResize {
    shared: Arc<Shared>,
}

impl ResizeBackend for StubResize {
    fn resize(
        &self,
        _pixels: &[u8],
        _input_width: u32,
        _input_height: u32,
        output_width: u32,
        output_height: u32,
        method_index: u32,
        premultiply: bool,
        linear_rgb: bool,
    ) -> Result<Vec<u8>, BackendError> {
        *self.shared.last_resize.lock().unwrap() = Some(ResizeCall {
            output_width,
            output_height,
            method_index,
            premultiply,
            linear_rgb,
        });
        Ok(vec![0; (output_width * output_height * 4) as usize])
    }
}

struct StubQuantizer {
    shared: Arc<Shared>,
}

impl QuantizeBackend for StubQuantizer {
    fn quantize(
        &self,
        pixels: &[u8],
        _width: u32,
        _height: u32,
        max_num_colors: u32,
        dither: f32,
    ) -> Result<Vec<u8>, BackendError> {
        *self.shared.last_quant.lock().unwrap() = Some((max_num_colors, dither));
        Ok(pixels.to_vec())
    }
}

/// Performs the actual pixel shuffle in place of an external module,
/// honoring the same memory layout the real one expects.
struct StubRotate {
    memory: LinearMemory,
}

impl RotateModule for StubRotate {
    fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut LinearMemory {
        &mut self.memory
    }

    fn rotate(&mut self, width: u32, height: u32, degrees: u32) -> Result<(), BackendError> {
        let (w, h) = (width as usize, height as usize);
        let size = w * h * 4;
        let src = self.memory.read(8, size)?.to_vec();

        let mut dst = vec![0u8; size];
        for y in 0..h {
            for x in 0..w {
                let to = match degrees {
                    0 => y * w + x,
                    90 => x * h + (h - 1 - y),
                    180 => (h - 1 - y) * w + (w - 1 - x),
                    270 => (w - 1 - x) * h + y,
                    other => return Err(injected(&format!("unsupported angle {other}"))),
                };
                dst[to * 4..to * 4 + 4].copy_from_slice(&src[(y * w + x) * 4..(y * w + x) * 4 + 4]);
            }
        }

        self.memory.write(8 + size, &dst)?;
        Ok(())
    }
}
