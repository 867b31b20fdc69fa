// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU implementations of the compute stages.
//!
//! Every stage has the signature `fn(n_wg: u32, resources: &[CpuBinding<'_>])` and loops
//! over the invocations of `n_wg` workgroups, so the stages can be driven by the same
//! dispatch commands a GPU would receive.

// Allow un-idiomatic Rust to more closely match shaders
#![expect(
    clippy::needless_range_loop,
    reason = "Keeps code easily comparable to GPU shaders"
)]

mod index_gen;
mod index_params;
mod reduction_apply;
mod reduction_finalize;
mod reduction_init;
mod reduction_step;
mod sort_bubble;
mod sort_merge;
mod util;
mod uv_params;

pub use index_gen::index_gen;
pub use index_params::index_params;
pub use reduction_apply::reduction_apply;
pub use reduction_finalize::reduction_finalize;
pub use reduction_init::reduction_init;
pub use reduction_step::reduction_step;
pub use sort_bubble::sort_bubble;
pub use sort_merge::sort_merge;
pub use util::compare_particles;
pub use uv_params::uv_params;

use std::cell::{Ref, RefCell, RefMut};
use std::ops::{Deref, DerefMut};

use bytemuck::Pod;

#[derive(Clone, Copy)]
pub enum CpuBinding<'a> {
    Buffer(&'a [u8]),
    BufferRW(&'a RefCell<Vec<u8>>),
}

pub enum TypedBufGuard<'a, T: ?Sized> {
    Slice(&'a T),
    Interior(Ref<'a, T>),
}

pub enum TypedBufGuardMut<'a, T: ?Sized> {
    Slice(&'a mut T),
    Interior(RefMut<'a, T>),
}

impl<T: ?Sized> Deref for TypedBufGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match self {
            TypedBufGuard::Slice(s) => s,
            TypedBufGuard::Interior(r) => r,
        }
    }
}

impl<T: ?Sized> Deref for TypedBufGuardMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match self {
            TypedBufGuardMut::Slice(s) => s,
            TypedBufGuardMut::Interior(r) => r,
        }
    }
}

impl<T: ?Sized> DerefMut for TypedBufGuardMut<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            TypedBufGuardMut::Slice(s) => s,
            TypedBufGuardMut::Interior(r) => r,
        }
    }
}

impl CpuBinding<'_> {
    /// Reads the start of the buffer as a single `T`.
    ///
    /// Buffers are allowed to be larger than `T`, pooled buffers usually are.
    pub fn as_typed<T: Pod>(&self) -> TypedBufGuard<'_, T> {
        let size = std::mem::size_of::<T>();
        match self {
            CpuBinding::Buffer(b) => TypedBufGuard::Slice(bytemuck::from_bytes(&b[..size])),
            CpuBinding::BufferRW(b) => TypedBufGuard::Interior(Ref::map(b.borrow(), |buf| {
                bytemuck::from_bytes(&buf[..size])
            })),
        }
    }

    pub fn as_typed_mut<T: Pod>(&self) -> TypedBufGuardMut<'_, T> {
        let size = std::mem::size_of::<T>();
        match self {
            CpuBinding::Buffer(_) => panic!("can't borrow external buffer mutably"),
            CpuBinding::BufferRW(b) => {
                TypedBufGuardMut::Interior(RefMut::map(b.borrow_mut(), |buf| {
                    bytemuck::from_bytes_mut(&mut buf[..size])
                }))
            }
        }
    }

    /// Views the buffer as a slice of `T`, ignoring trailing bytes that don't form a
    /// whole element.
    pub fn as_slice<T: Pod>(&self) -> TypedBufGuard<'_, [T]> {
        match self {
            CpuBinding::Buffer(b) => TypedBufGuard::Slice(bytemuck::cast_slice(whole::<T>(b))),
            CpuBinding::BufferRW(b) => TypedBufGuard::Interior(Ref::map(b.borrow(), |buf| {
                bytemuck::cast_slice(whole::<T>(buf))
            })),
        }
    }

    pub fn as_slice_mut<T: Pod>(&self) -> TypedBufGuardMut<'_, [T]> {
        match self {
            CpuBinding::Buffer(_) => panic!("can't borrow external buffer mutably"),
            CpuBinding::BufferRW(b) => {
                TypedBufGuardMut::Interior(RefMut::map(b.borrow_mut(), |buf| {
                    let len = buf.len() - buf.len() % std::mem::size_of::<T>();
                    bytemuck::cast_slice_mut(&mut buf[..len])
                }))
            }
        }
    }
}

fn whole<T>(bytes: &[u8]) -> &[u8] {
    &bytes[..bytes.len() - bytes.len() % std::mem::size_of::<T>()]
}
