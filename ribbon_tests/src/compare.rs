// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{bail, Result};
use ribbon::{
    CpuRibbonFrame, GpuRibbonFrame, GpuRibbonRenderer, ParticleData, RibbonRenderer, ViewParams,
};
use ribbon_encoding::{CompositeVertexIndex, RibbonSettings, RibbonTunables, UvParams, Vec3};

/// Relative comparison, absolute below magnitude one.
pub fn approx_eq(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() <= tolerance * a.abs().max(b.abs()).max(1.0)
}

fn vec3_approx_eq(a: Vec3, b: Vec3, tolerance: f32) -> bool {
    approx_eq(a.x, b.x, tolerance)
        && approx_eq(a.y, b.y, tolerance)
        && approx_eq(a.z, b.z, tolerance)
}

fn uv_approx_eq(a: &UvParams, b: &UvParams, tolerance: f32) -> bool {
    approx_eq(a.scale, b.scale, tolerance)
        && approx_eq(a.offset, b.offset, tolerance)
        && approx_eq(a.distribution_scaler, b.distribution_scaler, tolerance)
}

#[must_use]
/// One frame generated by both the sequential and the compute path.
pub struct RibbonComparison {
    pub name: String,
    pub cpu: CpuRibbonFrame,
    pub gpu: GpuRibbonFrame,
}

impl RibbonComparison {
    /// Decoded composite ids of the sequential path, in emission order.
    pub fn cpu_triples(&self) -> Vec<CompositeVertexIndex> {
        let layout = self.cpu.indices.layout;
        self.cpu.indices.indices.iter().map(|id| layout.decode(id)).collect()
    }

    pub fn gpu_triples(&self) -> Vec<CompositeVertexIndex> {
        let layout = self.gpu.layout;
        self.gpu.indices.iter().map(|&id| layout.decode(id)).collect()
    }

    /// Checks that both paths agree, comparing floats with `tolerance`.
    ///
    /// The two paths pack ids with different segment widths, so indices are compared
    /// after decoding.
    pub fn assert_matches(&self, tolerance: f32) -> Result<()> {
        let cpu = &self.cpu.vertex_data;
        let gpu = &self.gpu;
        self.check("sorted indices", cpu.sorted_indices == gpu.sorted_indices)?;
        self.check(
            "multi-ribbon indices",
            cpu.multi_ribbon_indices == gpu.multi_ribbon_indices,
        )?;
        self.check("segments", cpu.segment_data == gpu.segment_data)?;
        self.check(
            "tangents and distances",
            cpu.tangents_and_distances.len() == gpu.tangents_and_distances.len()
                && cpu
                    .tangents_and_distances
                    .iter()
                    .zip(&gpu.tangents_and_distances)
                    .all(|(a, b)| {
                        vec3_approx_eq(a.tangent, b.tangent, tolerance)
                            && approx_eq(a.distance, b.distance, tolerance)
                    }),
        )?;
        self.check(
            "ribbon lookup",
            cpu.ribbon_lookup.len() == gpu.ribbon_lookup.len()
                && cpu.ribbon_lookup.iter().zip(&gpu.ribbon_lookup).all(|(a, b)| {
                    a.first_particle_id == b.first_particle_id
                        && a.last_particle_id == b.last_particle_id
                        && a.base_segment_data_index == b.base_segment_data_index
                        && a.num_segment_data_indices == b.num_segment_data_indices
                        && uv_approx_eq(&a.u0, &b.u0, tolerance)
                        && uv_approx_eq(&a.u1, &b.u1, tolerance)
                }),
        )?;
        self.check(
            "ribbon extents",
            cpu.ribbon_extents.len() == gpu.ribbon_extents.len()
                && cpu.ribbon_extents.iter().zip(&gpu.ribbon_extents).all(|(a, b)| {
                    vec3_approx_eq(a.start, b.start, tolerance)
                        && vec3_approx_eq(a.end, b.end, tolerance)
                }),
        )?;
        self.check(
            "total segment length",
            approx_eq(
                cpu.stats.total_segment_length,
                gpu.command.stats.total_segment_length,
                tolerance,
            ),
        )?;
        self.check(
            "sub-segment count",
            self.cpu.indices.sub_segment_count == gpu.draw_args.num_sub_segments,
        )?;
        self.check(
            "index count",
            self.cpu.draw_args.draw.index_count == gpu.draw_args.draw.index_count,
        )?;
        self.check("decoded indices", self.cpu_triples() == self.gpu_triples())?;
        log::debug!(
            "{}: {} segments, {} indices match",
            self.name,
            cpu.num_segments(),
            gpu.indices.len()
        );
        Ok(())
    }

    fn check(&self, what: &str, matches: bool) -> Result<()> {
        if !matches {
            bail!("{}: {what} differ between the sequential and compute paths", self.name);
        }
        Ok(())
    }
}

/// Generates one frame with fresh renderers of both paths.
pub fn compare_gpu_cpu(
    name: &str,
    settings: &RibbonSettings,
    tunables: &RibbonTunables,
    particles: &ParticleData<'_>,
    view: &ViewParams,
) -> Result<RibbonComparison> {
    let mut frames = compare_frames(name, settings, tunables, &[*particles], view)?;
    match frames.pop() {
        Some(frame) => Ok(frame),
        None => bail!("{name}: no frame generated"),
    }
}

/// Generates consecutive frames with one renderer per path, so that state carried
/// between frames is exercised too.
pub fn compare_frames(
    name: &str,
    settings: &RibbonSettings,
    tunables: &RibbonTunables,
    frames: &[ParticleData<'_>],
    view: &ViewParams,
) -> Result<Vec<RibbonComparison>> {
    let mut cpu = RibbonRenderer::new(settings.clone(), *tunables);
    let mut gpu = GpuRibbonRenderer::new(settings.clone(), *tunables);
    frames
        .iter()
        .enumerate()
        .map(|(i, particles)| {
            Ok(RibbonComparison {
                name: format!("{name} (frame {i})"),
                cpu: cpu.generate(particles, view)?,
                gpu: gpu.generate(particles, view)?,
            })
        })
        .collect()
}

/// Like [`compare_gpu_cpu`], with both renderers drawing a translucent material.
pub fn compare_translucent(
    name: &str,
    settings: &RibbonSettings,
    tunables: &RibbonTunables,
    particles: &ParticleData<'_>,
    view: &ViewParams,
) -> Result<RibbonComparison> {
    let mut cpu = RibbonRenderer::new(settings.clone(), *tunables);
    let mut gpu = GpuRibbonRenderer::new(settings.clone(), *tunables);
    cpu.set_translucent(true);
    gpu.set_translucent(true);
    Ok(RibbonComparison {
        name: name.to_owned(),
        cpu: cpu.generate(particles, view)?,
        gpu: gpu.generate(particles, view)?,
    })
}
