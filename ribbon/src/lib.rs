// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ribbon is a geometry engine that turns unordered particles into ribbon strips.
//!
//! Particles are grouped into ribbons by id, ordered along each ribbon by a link order
//! attribute, filtered by a minimum segment length, and given tangents, arc length
//! distances and UV parameters. A subdivision factor is picked from the curvature and
//! twist of the ribbons and the distance to the viewer, and the triangles of every
//! segment are emitted as composite vertex ids that a vertex stage decodes.
//!
//! There are two implementations of the same pipeline:
//!
//! - [`RibbonRenderer`] runs it sequentially on the calling thread.
//! - [`GpuRibbonRenderer`] records it as compute dispatches (sort, prefix scan,
//!   finalize, index generation) and runs the recording on a [`low_level::CpuEngine`]
//!   that validates the barriers between stages.
//!
//! ```ignore
//! let mut renderer = ribbon::RibbonRenderer::new(settings, RibbonTunables::default());
//! let particles = ribbon::ParticleData::new(&positions, ribbon::LinkOrder::Float(&ages));
//! let frame = renderer.generate(&particles, &ribbon::ViewParams::default())?;
//! upload(frame.indices.indices.as_bytes());
//! ```

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
// Feel free to send a PR that solves one or more of these.
// Need to allow instead of expect until Rust 1.83 https://github.com/rust-lang/rust/pull/130025
#![allow(missing_docs, reason = "We have many as-yet undocumented items.")]
#![allow(
    missing_debug_implementations,
    unnameable_types,
    unreachable_pub,
    clippy::cast_possible_truncation,
    clippy::missing_assert_message,
    clippy::shadow_unrelated,
    reason = "Deferred"
)]

mod cache;
mod engine;
mod index;
mod particles;
mod partition;
mod recording;
mod render;
mod renderer;
mod shaders;
mod sort;
mod tessellation;
mod vertex;

pub use ribbon_encoding;

pub use cache::{GpuBufferCache, ResizableBuffer};
pub use index::{generate_indices, use_invert_order, GeneratedIndices, IndexBuffer, IndexGenParams};
pub use particles::{FullRibbonId, LinkOrder, ParticleData, RibbonIds};
pub use partition::partition_ribbons;
pub use render::{GpuRibbonFrame, GpuRibbonRenderer};
pub use renderer::{CpuRibbonFrame, RibbonRenderer};
pub use sort::sort_ribbon;
pub use tessellation::{max_sub_segment_count, sub_segment_count, ViewParams};
pub use vertex::{GeneratedVertexData, SegmentParams, VertexDataBuilder};

pub mod low_level {
    //! The command model and the engine that executes it.
    //!
    //! [`GpuRibbonRenderer`][crate::GpuRibbonRenderer] is built on these; they are
    //! exposed for tests and for callers that want to record their own stages.
    pub use crate::engine::{CpuEngine, CpuShaderType};
    pub use crate::recording::{
        BufferProxy, Command, Recording, ResourceId, ResourceProxy, ShaderId,
    };
    pub use crate::shaders::FullShaders;
}

use ribbon_encoding::LayoutError;
use thiserror::Error;

/// Errors that can occur while generating ribbons.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A per-particle attribute doesn't have one entry per particle.
    #[error("attribute '{attribute}' has {actual} entries, expected {expected}")]
    AttributeLength {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The composite vertex id of the index buffer would not fit in 32 bits.
    #[error("composite vertex id needs {total_bits} bits, at most 32 are available")]
    IndexBudgetExceeded { total_bits: u32 },
    /// Used a buffer inside a recording while it was not available.
    /// Check if you have created it and not freed before its last usage.
    #[error("Buffer '{0}' is not available but used for {1}")]
    UnavailableBufferUsed(&'static str, &'static str),
    /// A stage accessed a buffer written by an earlier stage with no barrier in between.
    #[error("Buffer '{buffer}' was written without a barrier before its use by {shader}")]
    UnsynchronizedAccess {
        buffer: &'static str,
        shader: &'static str,
    },
    /// A dispatch named a shader that has no CPU implementation.
    #[error("Shader '{0}' has no CPU implementation")]
    MissingShader(&'static str),
    /// The dispatch size of an indirect dispatch lies past the end of its buffer.
    #[error("Indirect arguments read past the end of buffer '{0}'")]
    IndirectArgsOutOfBounds(&'static str),
}

impl From<LayoutError> for Error {
    fn from(err: LayoutError) -> Self {
        Self::IndexBudgetExceeded {
            total_bits: err.total_bits(),
        }
    }
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;
