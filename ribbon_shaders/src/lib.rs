// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Metadata for the compute stages of ribbon generation.
//!
//! Each stage is described by a [`ComputeShader`]: its name, workgroup size and the kind
//! of every buffer it binds, in binding order. The engine uses the binding list both to
//! create bind groups and to validate that writes are separated from later reads by a
//! barrier.
//!
//! With the `cpu` feature, the [`cpu`] module provides an implementation of every stage
//! operating on byte buffers.

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
#![expect(missing_debug_implementations, reason = "Deferred")]
#![allow(
    unnameable_types,
    clippy::cast_possible_truncation,
    clippy::missing_assert_message,
    reason = "Deferred, only apply in some feature sets so not expect"
)]

mod types;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use types::BindType;

use std::borrow::Cow;

#[derive(Clone, Debug)]
pub struct ComputeShader<'a> {
    pub name: Cow<'a, str>,
    pub workgroup_size: [u32; 3],
    pub bindings: Cow<'a, [BindType]>,
}

pub struct Shaders<'a> {
    pub index_gen: ComputeShader<'a>,
    pub index_params: ComputeShader<'a>,
    pub reduction_apply: ComputeShader<'a>,
    pub reduction_finalize: ComputeShader<'a>,
    pub reduction_init: ComputeShader<'a>,
    pub reduction_step: ComputeShader<'a>,
    pub sort_bubble: ComputeShader<'a>,
    pub sort_merge: ComputeShader<'a>,
    pub uv_params: ComputeShader<'a>,
}

impl<'a> Shaders<'a> {
    /// All stages, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &ComputeShader<'a>> {
        [
            &self.index_gen,
            &self.index_params,
            &self.reduction_apply,
            &self.reduction_finalize,
            &self.reduction_init,
            &self.reduction_step,
            &self.sort_bubble,
            &self.sort_merge,
            &self.uv_params,
        ]
        .into_iter()
    }
}

mod generated {
    use super::*;
    use BindType::*;
    pub const SHADERS: Shaders<'static> = Shaders {
        // config, indirect draw args, segments, slice adjacency, multi-ribbon indices,
        // lookup, extents, indices
        index_gen: ComputeShader {
            name: Cow::Borrowed("index_gen"),
            workgroup_size: [64, 1, 1],
            bindings: Cow::Borrowed(&[
                Uniform,
                BufReadOnly,
                BufReadOnly,
                BufReadOnly,
                BufReadOnly,
                BufReadOnly,
                BufReadOnly,
                Buffer,
            ]),
        },
        // config, command buffer, indirect draw args
        index_params: ComputeShader {
            name: Cow::Borrowed("index_params"),
            workgroup_size: [1, 1, 1],
            bindings: Cow::Borrowed(&[Uniform, BufReadOnly, Buffer]),
        },
        // config, points, scanned accumulation, sorted indices, tangents,
        // multi-ribbon indices, segments, ribbon ranges
        reduction_apply: ComputeShader {
            name: Cow::Borrowed("reduction_apply"),
            workgroup_size: [64, 1, 1],
            bindings: Cow::Borrowed(&[
                Uniform,
                BufReadOnly,
                BufReadOnly,
                Buffer,
                Buffer,
                Buffer,
                Buffer,
                Buffer,
            ]),
        },
        // config, particles, sorted keys, scanned accumulation, ribbon ranges,
        // lookup, extents, command buffer
        reduction_finalize: ComputeShader {
            name: Cow::Borrowed("reduction_finalize"),
            workgroup_size: [64, 1, 1],
            bindings: Cow::Borrowed(&[
                Uniform,
                BufReadOnly,
                BufReadOnly,
                BufReadOnly,
                BufReadOnly,
                Buffer,
                Buffer,
                Buffer,
            ]),
        },
        // config, particles, sorted keys, points, accumulation
        reduction_init: ComputeShader {
            name: Cow::Borrowed("reduction_init"),
            workgroup_size: [64, 1, 1],
            bindings: Cow::Borrowed(&[Uniform, BufReadOnly, BufReadOnly, Buffer, Buffer]),
        },
        // scan config, accumulation in, accumulation out
        reduction_step: ComputeShader {
            name: Cow::Borrowed("reduction_step"),
            workgroup_size: [64, 1, 1],
            bindings: Cow::Borrowed(&[Uniform, BufReadOnly, Buffer]),
        },
        // config, particles, keys
        sort_bubble: ComputeShader {
            name: Cow::Borrowed("sort_bubble"),
            workgroup_size: [64, 1, 1],
            bindings: Cow::Borrowed(&[Uniform, BufReadOnly, Buffer]),
        },
        // sort config, particles, keys in, keys out
        sort_merge: ComputeShader {
            name: Cow::Borrowed("sort_merge"),
            workgroup_size: [64, 1, 1],
            bindings: Cow::Borrowed(&[Uniform, BufReadOnly, BufReadOnly, Buffer]),
        },
        // config, particles, command buffer, sorted indices, tangents, lookup
        uv_params: ComputeShader {
            name: Cow::Borrowed("uv_params"),
            workgroup_size: [64, 1, 1],
            bindings: Cow::Borrowed(&[
                Uniform,
                BufReadOnly,
                BufReadOnly,
                BufReadOnly,
                Buffer,
                Buffer,
            ]),
        },
    };
}

pub use generated::SHADERS;
