//! Rotation in quarter turns via a fresh sandbox instance per call.
//!
//! This is the one operation that manages sandbox linear memory from this
//! layer. The rotation module's calling convention: an 8-byte reserved
//! header, the input buffer at offset 8, and the result written immediately
//! after the input copy. The module mutates its memory destructively, so
//! every call instantiates its own instance instead of sharing a cached
//! handle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::CodecEngine;
use crate::error::CodecError;
use crate::pixel::Image;

/// Byte offset where the input buffer is placed; the bytes before it are
/// reserved header space expected by the backend.
pub const HEADER_BYTES: usize = 8;

const MODULE: &str = "rotate.wasm";

/// Rotation options. `num_rotations` counts clockwise quarter turns and may
/// be any integer; only its value modulo 4 matters.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RotateOptions {
    pub num_rotations: i32,
}

pub(crate) async fn apply(
    engine: &CodecEngine,
    image: Image,
    options: &RotateOptions,
) -> Result<Image, CodecError> {
    let degrees = (i64::from(options.num_rotations) * 90).rem_euclid(360) as u32;
    let same_dimensions = degrees == 0 || degrees == 180;
    let (width, height) = (image.width(), image.height());
    let size = image.pixels().len();

    let runtime = Arc::clone(engine.loader().runtime());
    let pixels = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, CodecError> {
        let mut module = runtime
            .instantiate_rotate()
            .map_err(|source| CodecError::Instantiation {
                module: MODULE,
                source,
            })?;

        // The memory must hold the input and output buffers back to back,
        // after the reserved header.
        let memory = module.memory_mut();
        memory.grow_to_fit(size * 2 + HEADER_BYTES);
        memory.write(HEADER_BYTES, image.pixels())?;

        module
            .rotate(width, height, degrees)
            .map_err(|source| CodecError::Backend {
                module: MODULE,
                source,
            })?;

        Ok(module.memory().read(size + HEADER_BYTES, size)?.to_vec())
    })
    .await
    .map_err(|join| CodecError::Backend {
        module: MODULE,
        source: Box::new(join),
    })??;

    let (out_width, out_height) = if same_dimensions {
        (width, height)
    } else {
        (height, width)
    };
    Image::new(out_width, out_height, pixels)
}
