// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Plain-data layouts shared by the sequential and the compute paths of ribbon generation.
//!
//! Everything that crosses a buffer boundary lives here as a `#[repr(C)]` [`bytemuck::Pod`]
//! type, together with the small numeric kernels (UV solving, tessellation estimation, index
//! emission) that both paths must evaluate identically.

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
// Feel free to send a PR that solves one or more of these.
// Allow because of: https://github.com/rust-lang/rust/pull/130025
#![allow(missing_docs, reason = "We have many as-yet undocumented items.")]
#![expect(
    missing_debug_implementations,
    clippy::cast_possible_truncation,
    clippy::missing_assert_message,
    reason = "Deferred"
)]
#![allow(
    unnameable_types,
    clippy::exhaustive_enums,
    reason = "Deferred, only apply in some feature sets so not expect"
)]

mod config;
mod layout;
pub mod math;
mod monoid;
mod order;
mod reduction;
mod ribbon;
mod settings;
mod shape;
mod tessellation;
mod uv;

pub use config::{
    align_up, BufferSize, BufferSizes, ConfigUniform, GpuParticle, IndexGenUniform, ScanUniform,
    SortUniform, WorkgroupCounts, WorkgroupSize, DRAW_ORDER_BACK_TO_FRONT,
    DRAW_ORDER_FRONT_TO_BACK, DRAW_ORDER_SORTED, FINALIZE_WG, INDEX_GEN_WG, REDUCTION_WG,
    SORT_GROUP_WIDTH, SORT_MERGE_WG, UV_PARAMS_WG,
};
pub use layout::{
    bit_mask, bits_for_range, write_sub_segment_indices, CompositeIndexLayout,
    CompositeVertexIndex, IndexWidth, LayoutError,
};
pub use math::Vec3;
pub use monoid::Monoid;
pub use order::{order_key_from_f32, order_key_from_i32, ribbon_order_key, LinkOrderKind};
pub use reduction::{
    PointContribution, RibbonAccumulation, RibbonPoint, RibbonRange, POINT_FLAG_KEPT,
    POINT_FLAG_RIBBON_END, POINT_FLAG_RIBBON_START,
};
pub use ribbon::{
    reflect_end_tangents, CommandBuffer, DrawIndexedArgs, IndirectCount, IndirectDrawArgs,
    RibbonExtents, RibbonLookupEntry, TangentAndDistance,
};
pub use settings::{
    DrawDirection, PipelineVariant, RibbonIdKind, RibbonSettings, RibbonTunables,
    TessellationKind, TessellationMode, TessellationSettings, RIBBON_FLAGS_CONSTANT_TESSELLATION,
    RIBBON_FLAGS_CUSTOM_U0, RIBBON_FLAGS_CUSTOM_U1, RIBBON_FLAGS_FULL_IDS,
    RIBBON_FLAGS_INT_LINK_ORDER, RIBBON_FLAGS_MULTI_RIBBON, RIBBON_FLAGS_TESSELLATION_STATS,
    RIBBON_FLAGS_TWIST,
};
pub use shape::{CustomSliceVertex, ShapeKind, ShapeSettings, ShapeSlice, SliceVertex};
pub use tessellation::{
    tessellation_factor, TessellationParams, TessellationSmoothingState, TessellationStats,
    MAX_CURVATURE_FACTOR,
};
pub use uv::{
    solve_uv_params, UvChannelSettings, UvChannelUniform, UvDistributionMode, UvEdgeMode,
    UvParams, UvRibbonSpan,
};
