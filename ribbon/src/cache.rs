// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reuse of persistent buffers across frames.

use ribbon_encoding::{align_up, RibbonTunables};

use crate::low_level::{BufferProxy, Recording};

const UPSIZE_MULTIPLIER: f32 = 1.1;
const DOWNSIZE_MULTIPLIER: f32 = 1.2;

/// A persistent buffer that is only reallocated when the needed size moves far enough.
#[derive(Debug)]
pub struct ResizableBuffer {
    name: &'static str,
    element_size: u32,
    gpu_read_only: bool,
    num_elements: u32,
    proxy: Option<BufferProxy>,
}

impl ResizableBuffer {
    pub fn new(name: &'static str, element_size: u32) -> Self {
        Self {
            name,
            element_size,
            gpu_read_only: false,
            num_elements: 0,
            proxy: None,
        }
    }

    /// Makes room for `needed` elements, never allocating more than `max`.
    ///
    /// A new buffer is created when the usage changed, when the current one is too small
    /// or more than 20% too large; it then gets 10% of headroom. The replaced buffer is
    /// freed through `recording`. Returns the buffer, or `None` when `needed` is zero,
    /// which also releases it.
    pub fn allocate(
        &mut self,
        recording: &mut Recording,
        needed: u32,
        max: u32,
        gpu_read_only: bool,
    ) -> Option<BufferProxy> {
        if needed == 0 {
            self.release(recording);
            return None;
        }
        debug_assert!(needed <= max, "{} needs {needed} of {max}", self.name);
        let usage_changed = self.proxy.is_some() && self.gpu_read_only != gpu_read_only;
        let too_large = self.num_elements > (needed as f32 * DOWNSIZE_MULTIPLIER).ceil() as u32;
        if self.proxy.is_none() || usage_changed || self.num_elements < needed || too_large {
            self.release(recording);
            let num_elements = max
                .min((needed as f32 * UPSIZE_MULTIPLIER).round() as u32)
                .max(needed);
            log::trace!("reallocating {} for {num_elements} elements", self.name);
            self.num_elements = num_elements;
            self.gpu_read_only = gpu_read_only;
            self.proxy = Some(BufferProxy::new(
                u64::from(num_elements) * u64::from(self.element_size),
                self.name,
            ));
        }
        self.proxy
    }

    pub fn release(&mut self, recording: &mut Recording) {
        if let Some(proxy) = self.proxy.take() {
            recording.free_buffer(proxy);
        }
        self.num_elements = 0;
    }

    pub fn num_elements(&self) -> u32 {
        self.num_elements
    }

    pub fn proxy(&self) -> Option<BufferProxy> {
        self.proxy
    }
}

#[derive(Debug)]
struct CacheEntry {
    buffer: BufferProxy,
    num_indices: u32,
    frame_used: u64,
}

/// Indirect draw and 32-bit index buffers shared by the renderers of a frame.
///
/// Buffers handed out in a frame are not handed out again until the next
/// [`GpuBufferCache::begin_frame`].
#[derive(Debug)]
pub struct GpuBufferCache {
    frame: u64,
    purge_counter: i32,
    align: u32,
    allocate_max_count: u32,
    indirect_draw: Vec<CacheEntry>,
    index32: Vec<CacheEntry>,
}

impl GpuBufferCache {
    pub fn new(tunables: &RibbonTunables) -> Self {
        Self {
            frame: 0,
            purge_counter: tunables.gpu_buffer_cache_purge_counter,
            align: tunables.gpu_buffer_align.max(1).next_power_of_two(),
            allocate_max_count: tunables.gpu_allocate_max_count,
            indirect_draw: Vec::new(),
            index32: Vec::new(),
        }
    }

    /// Evicts stale buffers and starts a new frame.
    ///
    /// With a negative purge counter nothing survives from one frame to the next.
    pub fn begin_frame(&mut self, recording: &mut Recording) {
        let frame = self.frame;
        let purge_counter = self.purge_counter;
        let stale = |entry: &CacheEntry| {
            purge_counter < 0 || frame - entry.frame_used > purge_counter as u64
        };
        for cache in [&mut self.indirect_draw, &mut self.index32] {
            cache.retain(|entry| {
                if stale(entry) {
                    recording.free_buffer(entry.buffer);
                    return false;
                }
                true
            });
        }
        if self.purge_counter >= 0 {
            self.frame += 1;
        }
    }

    pub fn get_or_allocate_indirect_draw(&mut self, size: u64) -> BufferProxy {
        let frame = self.frame;
        if let Some(entry) = self
            .indirect_draw
            .iter_mut()
            .find(|entry| entry.frame_used != frame)
        {
            entry.frame_used = frame;
            return entry.buffer;
        }
        let buffer = BufferProxy::new(size, "indirect_draw");
        self.indirect_draw.push(CacheEntry {
            buffer,
            num_indices: 0,
            frame_used: frame,
        });
        buffer
    }

    /// Returns a 32-bit index buffer for `num_indices` indices.
    ///
    /// While caching is on, the request is rounded to the buffer alignment, or replaced by
    /// `max_estimate` when allocating for the maximum count. Only buffers of exactly the
    /// resulting size are reused.
    pub fn get_or_allocate_index_buffer(
        &mut self,
        num_indices: u32,
        max_estimate: u32,
    ) -> BufferProxy {
        let num_indices = if self.purge_counter < 0 {
            num_indices
        } else if self.allocate_max_count == 0 {
            align_up(num_indices, self.align)
        } else {
            max_estimate.max(num_indices)
        }
        .max(1);
        let frame = self.frame;
        if let Some(entry) = self
            .index32
            .iter_mut()
            .find(|entry| entry.frame_used != frame && entry.num_indices == num_indices)
        {
            entry.frame_used = frame;
            return entry.buffer;
        }
        let buffer = BufferProxy::new(u64::from(num_indices) * 4, "indices");
        self.index32.push(CacheEntry {
            buffer,
            num_indices,
            frame_used: frame,
        });
        buffer
    }

    /// Number of cached buffers of both kinds.
    pub fn len(&self) -> usize {
        self.indirect_draw.len() + self.index32.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::low_level::Command;

    fn freed(recording: Recording) -> usize {
        recording
            .into_commands()
            .iter()
            .filter(|c| matches!(c, Command::FreeBuffer(_)))
            .count()
    }

    #[test]
    fn resizable_buffer_has_hysteresis() {
        let mut recording = Recording::default();
        let mut buffer = ResizableBuffer::new("tangents", 16);
        let first = buffer.allocate(&mut recording, 100, 1000, false).unwrap();
        assert_eq!(buffer.num_elements(), 110);
        assert_eq!(first.size, 110 * 16);
        // Shrinking a little keeps the buffer.
        let same = buffer.allocate(&mut recording, 95, 1000, false).unwrap();
        assert_eq!(same.id, first.id);
        // Growing past it reallocates, capped at the maximum.
        buffer.allocate(&mut recording, 120, 125, false).unwrap();
        assert_eq!(buffer.num_elements(), 125);
        // Changing usage reallocates too.
        let read_only = buffer.allocate(&mut recording, 120, 125, true).unwrap();
        assert_ne!(read_only.id, first.id);
        assert!(buffer.allocate(&mut recording, 0, 125, true).is_none());
        assert_eq!(freed(recording), 3);
    }

    #[test]
    fn index_buffers_reuse_exact_sizes_once_per_frame() {
        let tunables = RibbonTunables {
            gpu_allocate_max_count: 0,
            ..Default::default()
        };
        let mut cache = GpuBufferCache::new(&tunables);
        let mut recording = Recording::default();
        cache.begin_frame(&mut recording);
        let a = cache.get_or_allocate_index_buffer(100, 0);
        assert_eq!(a.size, 512 * 4);
        let b = cache.get_or_allocate_index_buffer(300, 0);
        assert_ne!(a.id, b.id);

        cache.begin_frame(&mut recording);
        let c = cache.get_or_allocate_index_buffer(10, 0);
        assert_eq!(c.id, a.id);
        assert_eq!(cache.len(), 2);

        // Unused for more than zero frames: evicted.
        cache.begin_frame(&mut recording);
        cache.begin_frame(&mut recording);
        assert!(cache.is_empty());
        assert_eq!(freed(recording), 2);
    }

    #[test]
    fn negative_purge_counter_never_reuses() {
        let tunables = RibbonTunables {
            gpu_buffer_cache_purge_counter: -1,
            ..Default::default()
        };
        let mut cache = GpuBufferCache::new(&tunables);
        let mut recording = Recording::default();
        let a = cache.get_or_allocate_indirect_draw(68);
        cache.begin_frame(&mut recording);
        let b = cache.get_or_allocate_indirect_draw(68);
        assert_ne!(a.id, b.id);
        assert_eq!(cache.len(), 1);
    }
}
