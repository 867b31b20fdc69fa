// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Register the compute stages with an engine.

use crate::low_level::{CpuEngine, CpuShaderType, ShaderId};

// Shaders for the full pipeline
pub struct FullShaders {
    pub sort_bubble: ShaderId,
    pub sort_merge: ShaderId,
    pub reduction_init: ShaderId,
    pub reduction_step: ShaderId,
    pub reduction_apply: ShaderId,
    pub reduction_finalize: ShaderId,
    pub uv_params: ShaderId,
    pub index_params: ShaderId,
    pub index_gen: ShaderId,
}

pub(crate) fn full_shaders(engine: &mut CpuEngine) -> FullShaders {
    let shaders = ribbon_shaders::SHADERS;

    macro_rules! add_shader {
        ($name:ident, $cpu:expr) => {{
            engine.add_compute_shader(
                concat!("ribbon.", stringify!($name)),
                &shaders.$name.bindings,
                $cpu,
            )
        }};
        ($name:ident) => {
            add_shader!(
                $name,
                CpuShaderType::Present(ribbon_shaders::cpu::$name)
            )
        };
    }

    FullShaders {
        sort_bubble: add_shader!(sort_bubble),
        sort_merge: add_shader!(sort_merge),
        reduction_init: add_shader!(reduction_init),
        reduction_step: add_shader!(reduction_step),
        reduction_apply: add_shader!(reduction_apply),
        reduction_finalize: add_shader!(reduction_finalize),
        uv_params: add_shader!(uv_params),
        index_params: add_shader!(index_params),
        index_gen: add_shader!(index_gen),
    }
}
