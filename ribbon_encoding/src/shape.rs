// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross sections extruded along a ribbon.

use bytemuck::{Pod, Zeroable};
use smallvec::SmallVec;

use super::bits_for_range;
use super::math::{rotate_degrees, SMALL_NUMBER};

const MAX_SHAPE_SUBDIVISIONS: u32 = 16;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CustomSliceVertex {
    pub position: [f32; 2],
    /// A zero normal is replaced by the direction of `position`.
    pub normal: [f32; 2],
    pub texture_v: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ShapeSettings {
    Plane {
        width_segments: u32,
    },
    Tube {
        subdivisions: u32,
    },
    MultiPlane {
        planes: u32,
        width_segments: u32,
        /// Emit separate back faces instead of flipping normals towards the view.
        accurate_geometry: bool,
    },
    Custom {
        vertices: Vec<CustomSliceVertex>,
    },
}

impl Default for ShapeSettings {
    fn default() -> Self {
        Self::Plane { width_segments: 1 }
    }
}

impl ShapeSettings {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Plane { .. } => ShapeKind::Plane,
            Self::Tube { .. } => ShapeKind::Tube,
            Self::MultiPlane { .. } => ShapeKind::MultiPlane,
            Self::Custom { .. } => ShapeKind::Custom,
        }
    }

    fn width_segments(&self) -> u32 {
        match self {
            Self::Plane { width_segments } | Self::MultiPlane { width_segments, .. } => {
                *width_segments
            }
            _ => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShapeKind {
    #[default]
    Plane,
    Tube,
    MultiPlane,
    Custom,
}

/// One vertex of the precomputed cross section.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct SliceVertex {
    pub position: [f32; 2],
    pub normal: [f32; 2],
    pub texture_v: f32,
}

/// The cross section ring and its edge table, computed once per renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeSlice {
    /// Shape that was built. Differs from `requested_kind` after a fallback to a plane.
    pub kind: ShapeKind,
    pub requested_kind: ShapeKind,
    pub vertices: Vec<SliceVertex>,
    /// Pairs of slice vertex ids, one pair per shape edge.
    pub triangle_to_vertex_ids: SmallVec<[u32; 32]>,
    pub triangles_per_segment: u32,
    pub num_vertices_in_slice: u32,
    pub bits_for_shape: u32,
    pub disable_backface_culling: bool,
    pub flip_normal_to_view: bool,
}

impl ShapeSlice {
    pub fn new(settings: &ShapeSettings, use_material_backface_culling: bool) -> Self {
        let requested_kind = settings.kind();
        let mut slice = match settings {
            ShapeSettings::Custom { vertices } if vertices.len() > 2 => {
                Self::custom(vertices, use_material_backface_culling)
            }
            ShapeSettings::Tube { subdivisions }
                if *subdivisions > 2 && *subdivisions <= MAX_SHAPE_SUBDIVISIONS =>
            {
                Self::tube(*subdivisions, use_material_backface_culling)
            }
            ShapeSettings::MultiPlane {
                planes,
                width_segments,
                accurate_geometry,
            } if *planes > 1 && *planes <= MAX_SHAPE_SUBDIVISIONS => Self::multi_plane(
                *planes,
                (*width_segments).max(1),
                *accurate_geometry,
                use_material_backface_culling,
            ),
            _ => Self::plane(
                settings.width_segments().max(1),
                use_material_backface_culling,
            ),
        };
        slice.requested_kind = requested_kind;
        slice
    }

    /// Whether the requested shape was invalid and a plane was built instead.
    pub fn fell_back(&self) -> bool {
        self.kind != self.requested_kind
    }

    pub fn shape_mask(&self) -> u32 {
        super::bit_mask(self.bits_for_shape)
    }

    /// Edge index (in adjacency entries) at which the triangle diagonal switches.
    pub fn flip_index(&self) -> usize {
        let len = self.triangle_to_vertex_ids.len();
        (len / 2).max(2).min(len)
    }

    fn build(
        kind: ShapeKind,
        vertices: Vec<SliceVertex>,
        triangle_to_vertex_ids: SmallVec<[u32; 32]>,
        disable_backface_culling: bool,
        flip_normal_to_view: bool,
    ) -> Self {
        let num_vertices_in_slice = vertices.len() as u32;
        Self {
            kind,
            requested_kind: kind,
            triangles_per_segment: triangle_to_vertex_ids.len() as u32,
            num_vertices_in_slice,
            bits_for_shape: bits_for_range(num_vertices_in_slice),
            vertices,
            triangle_to_vertex_ids,
            disable_backface_culling,
            flip_normal_to_view,
        }
    }

    fn ring_edges(edges: u32) -> SmallVec<[u32; 32]> {
        (0..edges).flat_map(|i| [i, i + 1]).collect()
    }

    fn plane(width_segments: u32, use_culling: bool) -> Self {
        let w = width_segments as f32;
        let vertices = (0..=width_segments)
            .map(|i| SliceVertex {
                position: [i as f32 / w - 0.5, 0.0],
                normal: [0.0, 1.0],
                texture_v: i as f32 / w,
            })
            .collect();
        Self::build(
            ShapeKind::Plane,
            vertices,
            Self::ring_edges(width_segments),
            !use_culling,
            false,
        )
    }

    fn tube(subdivisions: u32, use_culling: bool) -> Self {
        let s = subdivisions as f32;
        let vertices = (0..=subdivisions)
            .map(|i| {
                let angle = i as f32 / s * -360.0;
                SliceVertex {
                    position: rotate_degrees([-0.5, 0.0], angle),
                    normal: rotate_degrees([-1.0, 0.0], angle),
                    texture_v: i as f32 / s,
                }
            })
            .collect();
        Self::build(
            ShapeKind::Tube,
            vertices,
            Self::ring_edges(subdivisions),
            !use_culling,
            false,
        )
    }

    fn multi_plane(planes: u32, width_segments: u32, accurate: bool, use_culling: bool) -> Self {
        let w = width_segments as f32;
        let faces: &[[f32; 2]] = if accurate {
            &[[0.0, 1.0], [0.0, -1.0]]
        } else {
            &[[0.0, 1.0]]
        };
        let per_face = (planes * (width_segments + 1)) as usize;
        let mut vertices = Vec::with_capacity(faces.len() * per_face);
        for normal in faces {
            for plane in 0..planes {
                let angle = plane as f32 / planes as f32 * 180.0;
                for i in 0..=width_segments {
                    vertices.push(SliceVertex {
                        position: rotate_degrees([i as f32 / w - 0.5, 0.0], angle),
                        normal: rotate_degrees(*normal, angle),
                        texture_v: i as f32 / w,
                    });
                }
            }
        }

        let front_face_vertices = planes * (width_segments + 1);
        let mut adjacency = SmallVec::new();
        for plane in 0..planes {
            let base = plane * (width_segments + 1);
            for i in 0..width_segments {
                adjacency.extend([base + i, base + i + 1]);
            }
            if accurate {
                for i in 0..width_segments {
                    let back = front_face_vertices + base + i;
                    adjacency.extend([back + 1, back]);
                }
            }
        }
        Self::build(
            ShapeKind::MultiPlane,
            vertices,
            adjacency,
            !accurate && !use_culling,
            !accurate,
        )
    }

    fn custom(custom: &[CustomSliceVertex], use_culling: bool) -> Self {
        let n = custom.len();
        let has_custom_v = custom.iter().any(|v| v.texture_v.abs() > SMALL_NUMBER);
        let vertices = (0..=n)
            .map(|i| {
                let v = &custom[i % n];
                let [nx, ny] = v.normal;
                let normal = if nx * nx + ny * ny <= SMALL_NUMBER {
                    safe_normalize_2d(v.position)
                } else {
                    v.normal
                };
                SliceVertex {
                    position: v.position,
                    normal,
                    texture_v: if has_custom_v {
                        v.texture_v
                    } else {
                        i as f32 / n as f32
                    },
                }
            })
            .collect();
        Self::build(
            ShapeKind::Custom,
            vertices,
            Self::ring_edges(n as u32),
            !use_culling,
            false,
        )
    }
}

fn safe_normalize_2d(p: [f32; 2]) -> [f32; 2] {
    let len_sq = p[0] * p[0] + p[1] * p[1];
    if len_sq < SMALL_NUMBER {
        [0.0, 0.0]
    } else {
        let inv = 1.0 / len_sq.sqrt();
        [p[0] * inv, p[1] * inv]
    }
}
