// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Record the compute path for one frame of particles and run it.

use bytemuck::Pod;
use ribbon_encoding::{
    BufferSizes, CommandBuffer, CompositeIndexLayout, ConfigUniform, IndexGenUniform,
    IndirectDrawArgs, PipelineVariant, RibbonExtents, RibbonLookupEntry, RibbonTunables,
    RibbonSettings, ScanUniform, ShapeSlice, SortUniform, TangentAndDistance,
    TessellationParams, UvChannelUniform, WorkgroupCounts, SORT_GROUP_WIDTH,
};

use crate::cache::{GpuBufferCache, ResizableBuffer};
use crate::index::index_capacity;
use crate::low_level::{BufferProxy, CpuEngine, Recording};
use crate::particles::ParticleData;
use crate::renderer::{build_shape, resolve_variant};
use crate::shaders::{full_shaders, FullShaders};
use crate::tessellation::{max_sub_segment_count, ViewParams};
use crate::{Error, Result};

/// Everything the compute path produces for one frame, read back from the engine.
///
/// Buffers are trimmed to the counts the device wrote. Indices are always 32-bit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GpuRibbonFrame {
    pub variant: PipelineVariant,
    pub sorted_indices: Vec<u32>,
    pub tangents_and_distances: Vec<TangentAndDistance>,
    pub multi_ribbon_indices: Vec<u32>,
    pub segment_data: Vec<u32>,
    pub ribbon_lookup: Vec<RibbonLookupEntry>,
    pub ribbon_extents: Vec<RibbonExtents>,
    pub command: CommandBuffer,
    pub draw_args: IndirectDrawArgs,
    pub indices: Vec<u32>,
    pub layout: CompositeIndexLayout,
    /// Capacity of the index buffer: every particle a segment at the largest factor.
    pub total_num_indices: u32,
}

/// Vertex support buffers, kept across frames.
struct VertexBuffers {
    sorted_indices: ResizableBuffer,
    tangents: ResizableBuffer,
    multi_ribbon_indices: ResizableBuffer,
    segments: ResizableBuffer,
    lookup: ResizableBuffer,
    extents: ResizableBuffer,
}

impl VertexBuffers {
    fn new() -> Self {
        Self {
            sorted_indices: ResizableBuffer::new("sorted_indices", 4),
            tangents: ResizableBuffer::new(
                "tangents",
                std::mem::size_of::<TangentAndDistance>() as u32,
            ),
            multi_ribbon_indices: ResizableBuffer::new("multi_ribbon_indices", 4),
            segments: ResizableBuffer::new("segments", 4),
            lookup: ResizableBuffer::new(
                "lookup",
                std::mem::size_of::<RibbonLookupEntry>() as u32,
            ),
            extents: ResizableBuffer::new(
                "extents",
                std::mem::size_of::<RibbonExtents>() as u32,
            ),
        }
    }
}

/// Proxies of the outputs of one recording.
struct Outputs {
    sorted_indices: BufferProxy,
    tangents: BufferProxy,
    multi_ribbon_indices: BufferProxy,
    segments: BufferProxy,
    lookup: BufferProxy,
    extents: BufferProxy,
    indirect_draw: BufferProxy,
    indices: BufferProxy,
}

/// Generates ribbon geometry with the compute stages.
///
/// The stages run on a [`CpuEngine`], so the results can be checked against
/// [`RibbonRenderer`](crate::RibbonRenderer). The command buffer, which carries the
/// tessellation smoothing state, lives in the engine across frames.
pub struct GpuRibbonRenderer {
    engine: CpuEngine,
    shaders: FullShaders,
    settings: RibbonSettings,
    tunables: RibbonTunables,
    shape: ShapeSlice,
    tessellation: TessellationParams,
    command: BufferProxy,
    vertex_buffers: VertexBuffers,
    cache: GpuBufferCache,
    max_allocated_count_estimate: u32,
    translucent: bool,
}

impl GpuRibbonRenderer {
    pub fn new(settings: RibbonSettings, tunables: RibbonTunables) -> Self {
        let mut engine = CpuEngine::new();
        let shaders = full_shaders(&mut engine);
        let shape = build_shape(&settings);
        let tessellation = TessellationParams::resolve(&settings.tessellation, &tunables);
        Self {
            engine,
            shaders,
            settings,
            tunables,
            shape,
            tessellation,
            command: BufferProxy::new(std::mem::size_of::<CommandBuffer>() as u64, "command"),
            vertex_buffers: VertexBuffers::new(),
            cache: GpuBufferCache::new(&tunables),
            max_allocated_count_estimate: 0,
            translucent: false,
        }
    }

    /// Translucent materials emit multi-ribbons in the configured draw direction.
    pub fn set_translucent(&mut self, translucent: bool) {
        self.translucent = translucent;
    }

    /// Upper estimate of the particle count, used to leave headroom in the buffers.
    pub fn set_max_allocated_count_estimate(&mut self, estimate: u32) {
        self.max_allocated_count_estimate = estimate;
    }

    pub fn shape(&self) -> &ShapeSlice {
        &self.shape
    }

    pub fn engine(&self) -> &CpuEngine {
        &self.engine
    }

    /// Records and runs the compute path for one frame.
    ///
    /// Without at least two particles, positions and a link order no stage runs; the
    /// command buffer is cleared, which resets the smoothing state, and the frame is
    /// empty.
    pub fn generate(
        &mut self,
        particles: &ParticleData<'_>,
        view: &ViewParams,
    ) -> Result<GpuRibbonFrame> {
        particles.validate()?;
        let variant = resolve_variant(&self.settings, particles);
        let mut recording = Recording::default();
        self.cache.begin_frame(&mut recording);
        if !particles.is_renderable() {
            recording.clear_all(self.command);
            self.engine.run_recording(&recording, "ribbon.clear")?;
            return Ok(GpuRibbonFrame {
                variant,
                ..Default::default()
            });
        }

        let n = particles.len() as u32;
        let sub_segment_cap = max_sub_segment_count(&self.tessellation);
        let layout = CompositeIndexLayout::new(n, sub_segment_cap, self.shape.bits_for_shape)?;
        let total_num_indices =
            index_capacity(n, sub_segment_cap, self.shape.triangles_per_segment)?;
        let outputs =
            self.record(&mut recording, particles, variant, view, layout, total_num_indices)?;
        self.engine.run_recording(&recording, "ribbon.generate")?;
        let frame = self.read_back(variant, layout, total_num_indices, &outputs)?;
        log::debug!(
            "gpu ribbons: {} particles, {} ribbons, {} segments, tessellation {}",
            n,
            frame.command.num_ribbons,
            frame.command.num_segments,
            frame.draw_args.tessellation_factor
        );
        Ok(frame)
    }

    fn record(
        &mut self,
        recording: &mut Recording,
        particles: &ParticleData<'_>,
        variant: PipelineVariant,
        view: &ViewParams,
        layout: CompositeIndexLayout,
        total_num_indices: u32,
    ) -> Result<Outputs> {
        let shaders = &self.shaders;
        let n = particles.len() as u32;
        let flags = variant.flags();
        let counts = WorkgroupCounts::new(n, variant.is_multi_ribbon());
        let sizes = BufferSizes::new(n);

        let config = ConfigUniform {
            num_particles: n,
            flags,
            min_segment_length: self.tunables.min_segment_length,
            curve_tension: self.settings.curve_tension,
            uv0: UvChannelUniform::from(&self.settings.uv0),
            uv1: UvChannelUniform::from(&self.settings.uv1),
        };
        let config_buf = recording.upload_uniform("config", &config);
        let gpu_particles = particles.to_gpu_particles();
        let particles_buf = recording.upload_slice("particles", &gpu_particles);
        let mut transients = vec![config_buf, particles_buf];

        // Sort: bubble sort fixed groups, then merge runs. With an odd number of merge
        // passes the groups start in slot one so the result always lands in slot zero.
        let keys = [
            BufferProxy::new(sizes.sort_keys.size_in_bytes().into(), "sort_keys"),
            BufferProxy::new(sizes.sort_keys.size_in_bytes().into(), "sort_keys"),
        ];
        let mut slot = (counts.sort_merge_passes % 2) as usize;
        recording.dispatch(
            shaders.sort_bubble,
            counts.sort_bubble,
            [config_buf, particles_buf, keys[slot]],
        );
        recording.barrier([keys[slot]]);
        for pass in 0..counts.sort_merge_passes {
            let uniform = SortUniform {
                num_keys: n,
                flags,
                run_size: SORT_GROUP_WIDTH << pass,
                pad0: 0,
            };
            let uniform_buf = recording.upload_uniform("sort_uniform", &uniform);
            recording.dispatch(
                shaders.sort_merge,
                counts.sort_merge,
                [uniform_buf, particles_buf, keys[slot], keys[1 - slot]],
            );
            slot = 1 - slot;
            recording.barrier([keys[slot]]);
            transients.push(uniform_buf);
        }
        let sorted_keys = keys[0];

        // Reduction: per point contributions, then a log-step scan over two slots.
        let points = BufferProxy::new(sizes.points.size_in_bytes().into(), "points");
        let accumulation = [
            BufferProxy::new(sizes.accumulation.size_in_bytes().into(), "accumulation"),
            BufferProxy::new(sizes.accumulation.size_in_bytes().into(), "accumulation"),
        ];
        let ranges = BufferProxy::new(sizes.ranges.size_in_bytes().into(), "ranges");
        recording.dispatch(
            shaders.reduction_init,
            counts.reduction,
            [config_buf, particles_buf, sorted_keys, points, accumulation[0]],
        );
        recording.barrier([points, accumulation[0]]);
        let mut scan = 0;
        for pass in 0..WorkgroupCounts::scan_passes(n) {
            let uniform = ScanUniform {
                num_particles: n,
                stride: 1 << pass,
                pad0: 0,
                pad1: 0,
            };
            let uniform_buf = recording.upload_uniform("scan_uniform", &uniform);
            recording.dispatch(
                shaders.reduction_step,
                counts.reduction,
                [uniform_buf, accumulation[scan], accumulation[1 - scan]],
            );
            scan = 1 - scan;
            recording.barrier([accumulation[scan]]);
            transients.push(uniform_buf);
        }
        let scanned = accumulation[scan];

        let max = n.max(self.max_allocated_count_estimate);
        let buffers = &mut self.vertex_buffers;
        let mut persistent = |buffer: &mut ResizableBuffer| {
            buffer
                .allocate(recording, n, max, false)
                .ok_or(Error::UnavailableBufferUsed("vertex buffer", "allocate"))
        };
        let sorted_indices = persistent(&mut buffers.sorted_indices)?;
        let tangents = persistent(&mut buffers.tangents)?;
        let multi_ribbon_indices = persistent(&mut buffers.multi_ribbon_indices)?;
        let segments = persistent(&mut buffers.segments)?;
        let lookup = persistent(&mut buffers.lookup)?;
        let extents = persistent(&mut buffers.extents)?;

        recording.dispatch(
            shaders.reduction_apply,
            counts.reduction,
            [
                config_buf,
                points,
                scanned,
                sorted_indices,
                tangents,
                multi_ribbon_indices,
                segments,
                ranges,
            ],
        );
        recording.barrier([sorted_indices, tangents, multi_ribbon_indices, segments, ranges]);
        recording.dispatch(
            shaders.reduction_finalize,
            counts.reduction_finalize,
            [
                config_buf,
                particles_buf,
                sorted_keys,
                scanned,
                ranges,
                lookup,
                extents,
                self.command,
            ],
        );
        recording.barrier([lookup, extents, self.command]);

        // The command buffer starts with the dispatch size of the UV stage.
        recording.dispatch_indirect(
            shaders.uv_params,
            self.command,
            0,
            [
                config_buf,
                particles_buf,
                self.command,
                sorted_indices,
                tangents,
                lookup,
            ],
        );
        recording.barrier([tangents, lookup]);

        let indirect_draw = self
            .cache
            .get_or_allocate_indirect_draw(sizes.indirect_draw.size_in_bytes().into());
        let indices = self.cache.get_or_allocate_index_buffer(
            total_num_indices,
            total_num_indices.max(self.max_allocated_count_estimate),
        );
        let adjacency = &self.shape.triangle_to_vertex_ids[..];
        let mut index_uniform = IndexGenUniform {
            tessellation: self.tessellation,
            view_distance: view.view_distance,
            lod_distance_factor: view.lod_distance_factor,
            layout,
            triangles_per_segment: self.shape.triangles_per_segment,
            adjacency_len: adjacency.len() as u32,
            flip_index: self.shape.flip_index() as u32,
            sub_segment_cap: max_sub_segment_count(&self.tessellation),
            ..Default::default()
        };
        if self.translucent && variant.is_multi_ribbon() {
            index_uniform.set_translucent(self.settings.draw_direction, view.view_direction);
        }
        let index_uniform_buf = recording.upload_uniform("index_uniform", &index_uniform);
        let adjacency_buf = recording.upload_slice("adjacency", adjacency);
        transients.extend([index_uniform_buf, adjacency_buf]);
        recording.dispatch(
            shaders.index_params,
            counts.index_params,
            [index_uniform_buf, self.command, indirect_draw],
        );
        recording.barrier([indirect_draw]);
        // The draw buffer starts with the dispatch size of index generation.
        recording.dispatch_indirect(
            shaders.index_gen,
            indirect_draw,
            0,
            [
                index_uniform_buf,
                indirect_draw,
                segments,
                adjacency_buf,
                multi_ribbon_indices,
                lookup,
                extents,
                indices,
            ],
        );
        recording.barrier([indices]);

        let outputs = Outputs {
            sorted_indices,
            tangents,
            multi_ribbon_indices,
            segments,
            lookup,
            extents,
            indirect_draw,
            indices,
        };
        for buf in [
            sorted_indices,
            tangents,
            multi_ribbon_indices,
            segments,
            lookup,
            extents,
            self.command,
            indirect_draw,
            indices,
        ] {
            recording.download(buf);
        }
        recording.free_buffers(
            keys.into_iter()
                .chain(accumulation)
                .chain([points, ranges])
                .chain(transients),
        );
        Ok(outputs)
    }

    fn read_back(
        &mut self,
        variant: PipelineVariant,
        layout: CompositeIndexLayout,
        total_num_indices: u32,
        outputs: &Outputs,
    ) -> Result<GpuRibbonFrame> {
        let command: CommandBuffer = self.take_one(self.command)?;
        let draw_args: IndirectDrawArgs = self.take_one(outputs.indirect_draw)?;
        let mut ribbon_lookup: Vec<RibbonLookupEntry> = self.take(outputs.lookup)?;
        let mut ribbon_extents: Vec<RibbonExtents> = self.take(outputs.extents)?;
        ribbon_lookup.truncate(command.num_ribbons as usize);
        ribbon_extents.truncate(command.num_ribbons as usize);
        let retained = ribbon_lookup
            .iter()
            .filter(|entry| entry.num_segment_data_indices > 0)
            .map(|entry| entry.last_particle_id as usize + 1)
            .max()
            .unwrap_or(0);

        let mut sorted_indices: Vec<u32> = self.take(outputs.sorted_indices)?;
        sorted_indices.truncate(retained);
        let mut tangents_and_distances: Vec<TangentAndDistance> = self.take(outputs.tangents)?;
        tangents_and_distances.truncate(retained);
        let mut multi_ribbon_indices: Vec<u32> = self.take(outputs.multi_ribbon_indices)?;
        multi_ribbon_indices.truncate(if variant.is_multi_ribbon() { retained } else { 0 });
        let mut segment_data: Vec<u32> = self.take(outputs.segments)?;
        segment_data.truncate(command.num_segments as usize);
        let mut indices: Vec<u32> = self.take(outputs.indices)?;
        indices.truncate(draw_args.draw.index_count as usize);

        Ok(GpuRibbonFrame {
            variant,
            sorted_indices,
            tangents_and_distances,
            multi_ribbon_indices,
            segment_data,
            ribbon_lookup,
            ribbon_extents,
            command,
            draw_args,
            indices,
            layout,
            total_num_indices,
        })
    }

    /// Reads a download as a vector of `T` and releases it.
    fn take<T: Pod>(&mut self, buf: BufferProxy) -> Result<Vec<T>> {
        let bytes = self
            .engine
            .get_download(buf)
            .ok_or(Error::UnavailableBufferUsed(buf.name, "download"))?;
        let values = bytes
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect();
        self.engine.free_download(buf);
        Ok(values)
    }

    fn take_one<T: Pod>(&mut self, buf: BufferProxy) -> Result<T> {
        self.take(buf)?
            .into_iter()
            .next()
            .ok_or(Error::UnavailableBufferUsed(buf.name, "download"))
    }
}

#[cfg(test)]
mod tests {
    use ribbon_encoding::Vec3;

    use super::*;
    use crate::particles::LinkOrder;

    #[test]
    fn straight_ribbon_compacts_all_points() {
        let positions: Vec<Vec3> = (0..5).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let order = [0.0, 1.0, 2.0, 3.0, 4.0];
        let tunables = RibbonTunables {
            min_segment_length: 0.5,
            ..Default::default()
        };
        let mut renderer = GpuRibbonRenderer::new(RibbonSettings::default(), tunables);
        let frame = renderer
            .generate(
                &ParticleData::new(&positions, LinkOrder::Float(&order)),
                &ViewParams::default(),
            )
            .unwrap();
        assert_eq!(frame.sorted_indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(frame.segment_data, vec![0, 1, 2, 3]);
        assert_eq!(frame.command.stats.total_segment_length, 4.0);
        let sub = frame.draw_args.num_sub_segments;
        assert_eq!(frame.indices.len() as u32, 4 * sub * 2 * 3);
    }

    #[test]
    fn too_few_particles_reset_smoothing() {
        let bent = [
            Vec3::ZERO,
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(2.0, 2.0, 0.0),
        ];
        let straight = [
            Vec3::ZERO,
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
        ];
        let order = [0.0, 1.0, 2.0];
        let view = ViewParams::default();
        let mut renderer =
            GpuRibbonRenderer::new(RibbonSettings::default(), RibbonTunables::default());
        let frame = renderer
            .generate(&ParticleData::new(&bent, LinkOrder::Float(&order)), &view)
            .unwrap();
        assert!(frame.command.smoothing.angle > 0.0);

        let empty = renderer
            .generate(
                &ParticleData::new(&bent[..1], LinkOrder::Float(&order[..1])),
                &view,
            )
            .unwrap();
        assert_eq!(empty.draw_args.draw.index_count, 0);
        assert!(empty.indices.is_empty());

        // Without the reset the previous bend would still pull the angle up.
        let frame = renderer
            .generate(&ParticleData::new(&straight, LinkOrder::Float(&order)), &view)
            .unwrap();
        assert_eq!(frame.command.smoothing.angle, 0.0);
        assert_eq!(frame.command.smoothing.total_length, 4.0);
    }
}
