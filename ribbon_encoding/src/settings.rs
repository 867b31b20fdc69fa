// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::{LinkOrderKind, RibbonExtents, ShapeSettings, UvChannelSettings, Vec3};

/// Particles carry a ribbon id, so several ribbons are generated.
pub const RIBBON_FLAGS_MULTI_RIBBON: u32 = 1 << 0;
/// Ribbon ids are `(index, acquire_tag)` pairs rather than plain integers.
pub const RIBBON_FLAGS_FULL_IDS: u32 = 1 << 1;
/// The link order key is an integer, sorted descending.
pub const RIBBON_FLAGS_INT_LINK_ORDER: u32 = 1 << 2;
/// Curvature statistics are gathered for automatic tessellation.
pub const RIBBON_FLAGS_TESSELLATION_STATS: u32 = 1 << 3;
/// Particles carry twist, so twist and width statistics are gathered alongside curvature.
pub const RIBBON_FLAGS_TWIST: u32 = 1 << 4;
pub const RIBBON_FLAGS_CUSTOM_U0: u32 = 1 << 5;
pub const RIBBON_FLAGS_CUSTOM_U1: u32 = 1 << 6;
pub const RIBBON_FLAGS_CONSTANT_TESSELLATION: u32 = 1 << 7;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TessellationMode {
    #[default]
    Automatic,
    Custom,
    Disabled,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TessellationSettings {
    pub mode: TessellationMode,
    /// Factor requested by [`TessellationMode::Custom`].
    pub custom_factor: u32,
    pub use_constant_factor: bool,
    /// Minimum angle per subdivision in degrees, used by [`TessellationMode::Custom`].
    pub min_angle_degrees: f32,
    pub use_screen_space: bool,
}

impl Default for TessellationSettings {
    fn default() -> Self {
        Self {
            mode: TessellationMode::Automatic,
            custom_factor: 16,
            use_constant_factor: false,
            min_angle_degrees: 15.0,
            use_screen_space: true,
        }
    }
}

impl TessellationSettings {
    /// Angles between zero and one degree are raised to one degree.
    pub fn min_angle_radians(&self) -> f32 {
        let degrees = if self.min_angle_degrees > 0.0 && self.min_angle_degrees < 1.0 {
            1.0
        } else {
            self.min_angle_degrees
        };
        degrees.to_radians()
    }

    pub fn kind(&self) -> TessellationKind {
        match self.mode {
            TessellationMode::Disabled => TessellationKind::Disabled,
            TessellationMode::Custom if self.use_constant_factor => TessellationKind::Constant,
            _ => TessellationKind::Automatic,
        }
    }
}

/// Order in which translucent multi-ribbons are emitted relative to the view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrawDirection {
    FrontToBack,
    #[default]
    BackToFront,
}

impl DrawDirection {
    /// Whether a ribbon spanning `extents` must have its segments reversed to be drawn
    /// in this direction along `view_direction`.
    pub fn inverts(self, extents: &RibbonExtents, view_direction: Vec3) -> bool {
        let along_view = (extents.end - extents.start).dot(view_direction);
        match self {
            Self::BackToFront => along_view > 0.0,
            Self::FrontToBack => along_view < 0.0,
        }
    }
}

/// Per renderer configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RibbonSettings {
    pub shape: ShapeSettings,
    pub tessellation: TessellationSettings,
    pub uv0: UvChannelSettings,
    pub uv1: UvChannelSettings,
    /// Catmull-Rom tension in `[0, 1]`.
    pub curve_tension: f32,
    pub draw_direction: DrawDirection,
    pub use_material_backface_culling: bool,
}

impl Default for RibbonSettings {
    fn default() -> Self {
        Self {
            shape: ShapeSettings::default(),
            tessellation: TessellationSettings::default(),
            uv0: UvChannelSettings::default(),
            uv1: UvChannelSettings::default(),
            curve_tension: 0.0,
            draw_direction: DrawDirection::BackToFront,
            use_material_backface_culling: false,
        }
    }
}

/// Process wide tuning values, passed explicitly into every renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RibbonTunables {
    pub tessellation_enabled: bool,
    /// Default minimum angle per subdivision, in radians.
    pub tessellation_angle: f32,
    pub max_tessellation: u32,
    pub screen_percentage: f32,
    pub min_displacement_error: f32,
    /// Points closer than this to the previous retained point are skipped.
    pub min_segment_length: f32,
    pub force_index32: bool,
    /// Frames an unused cached buffer survives. Negative values disable reuse.
    pub gpu_buffer_cache_purge_counter: i32,
    pub gpu_buffer_align: u32,
    /// When zero, cached index buffers are sized to the aligned request instead of the
    /// caller's estimate of the maximum.
    pub gpu_allocate_max_count: u32,
}

impl Default for RibbonTunables {
    fn default() -> Self {
        Self {
            tessellation_enabled: true,
            tessellation_angle: 15.0_f32.to_radians(),
            max_tessellation: 16,
            screen_percentage: 0.002,
            min_displacement_error: 0.5,
            min_segment_length: 1.0,
            force_index32: false,
            gpu_buffer_cache_purge_counter: 0,
            gpu_buffer_align: 512,
            gpu_allocate_max_count: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RibbonIdKind {
    #[default]
    None,
    Simple,
    Full,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TessellationKind {
    Disabled,
    Constant,
    #[default]
    Automatic,
}

/// Strategy variant resolved once from the settings and the capabilities of the
/// particle data. Kernels branch on [`PipelineVariant::flags`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineVariant {
    pub ribbon_ids: RibbonIdKind,
    pub link_order: LinkOrderKind,
    pub tessellation: TessellationKind,
    pub has_twist: bool,
    pub custom_u: [bool; 2],
}

impl PipelineVariant {
    pub fn flags(&self) -> u32 {
        let mut flags = 0;
        match self.ribbon_ids {
            RibbonIdKind::None => {}
            RibbonIdKind::Simple => flags |= RIBBON_FLAGS_MULTI_RIBBON,
            RibbonIdKind::Full => flags |= RIBBON_FLAGS_MULTI_RIBBON | RIBBON_FLAGS_FULL_IDS,
        }
        if self.link_order == LinkOrderKind::Int {
            flags |= RIBBON_FLAGS_INT_LINK_ORDER;
        }
        if self.wants_tessellation_stats() {
            flags |= RIBBON_FLAGS_TESSELLATION_STATS;
        }
        if self.has_twist {
            flags |= RIBBON_FLAGS_TWIST;
        }
        if self.tessellation == TessellationKind::Constant {
            flags |= RIBBON_FLAGS_CONSTANT_TESSELLATION;
        }
        if self.custom_u[0] {
            flags |= RIBBON_FLAGS_CUSTOM_U0;
        }
        if self.custom_u[1] {
            flags |= RIBBON_FLAGS_CUSTOM_U1;
        }
        flags
    }

    pub fn from_flags(flags: u32) -> Self {
        let ribbon_ids = if flags & RIBBON_FLAGS_FULL_IDS != 0 {
            RibbonIdKind::Full
        } else if flags & RIBBON_FLAGS_MULTI_RIBBON != 0 {
            RibbonIdKind::Simple
        } else {
            RibbonIdKind::None
        };
        let tessellation = if flags & RIBBON_FLAGS_CONSTANT_TESSELLATION != 0 {
            TessellationKind::Constant
        } else if flags & RIBBON_FLAGS_TESSELLATION_STATS != 0 {
            TessellationKind::Automatic
        } else {
            TessellationKind::Disabled
        };
        Self {
            ribbon_ids,
            link_order: if flags & RIBBON_FLAGS_INT_LINK_ORDER != 0 {
                LinkOrderKind::Int
            } else {
                LinkOrderKind::Float
            },
            tessellation,
            has_twist: flags & RIBBON_FLAGS_TWIST != 0,
            custom_u: [
                flags & RIBBON_FLAGS_CUSTOM_U0 != 0,
                flags & RIBBON_FLAGS_CUSTOM_U1 != 0,
            ],
        }
    }

    pub fn is_multi_ribbon(&self) -> bool {
        self.ribbon_ids != RibbonIdKind::None
    }

    pub fn wants_tessellation_stats(&self) -> bool {
        self.tessellation == TessellationKind::Automatic
    }

    pub fn wants_twist_stats(&self) -> bool {
        self.wants_tessellation_stats() && self.has_twist
    }
}
