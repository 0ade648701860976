//! WGSL module assembly
//!
//! WGSL has no includes, so kernels are concatenated from shared chunks and
//! validated inside an error scope before any pipeline is built from them.

use crate::error::{VisibilityError, VisibilityResult};
use std::borrow::Cow;

pub const COMMON: &str = include_str!("../shaders/common.wgsl");
pub const GEOMETRY: &str = include_str!("../shaders/geometry.wgsl");
pub const FILL: &str = include_str!("../shaders/fill.wgsl");
pub const SURFACE: &str = include_str!("../shaders/surface.wgsl");
pub const WIREFRAME: &str = include_str!("../shaders/wireframe.wgsl");
pub const BLIT: &str = include_str!("../shaders/blit.wgsl");
pub const SCANLINE_COMMON: &str = include_str!("../shaders/scanline_common.wgsl");
pub const SCANLINE_INIT: &str = include_str!("../shaders/scanline_init.wgsl");
pub const SCANLINE_WORK: &str = include_str!("../shaders/scanline_work.wgsl");
pub const PYRAMID_REDUCE: &str = include_str!("../shaders/pyramid_reduce.wgsl");
pub const HIZ_COMMON: &str = include_str!("../shaders/hiz_common.wgsl");
pub const HIZ_NAIVE: &str = include_str!("../shaders/hiz_naive.wgsl");
pub const OCTREE_COMMON: &str = include_str!("../shaders/octree_common.wgsl");
pub const OCTREE_BUILD: &str = include_str!("../shaders/octree_build.wgsl");
pub const HIZ_OCTREE: &str = include_str!("../shaders/hiz_octree.wgsl");

/// One shader module: its label and the chunks it is concatenated from
#[derive(Debug, Clone, Copy)]
pub struct ShaderModuleDesc {
    pub label: &'static str,
    pub chunks: &'static [&'static str],
}

pub const SURFACE_MODULE: ShaderModuleDesc = ShaderModuleDesc {
    label: "Surface Shader",
    chunks: &[COMMON, GEOMETRY, SURFACE],
};
pub const WIREFRAME_MODULE: ShaderModuleDesc = ShaderModuleDesc {
    label: "Wireframe Shader",
    chunks: &[COMMON, WIREFRAME],
};
pub const BLIT_MODULE: ShaderModuleDesc = ShaderModuleDesc {
    label: "Blit Shader",
    chunks: &[COMMON, BLIT],
};
pub const FILL_MODULE: ShaderModuleDesc = ShaderModuleDesc {
    label: "Fill Shader",
    chunks: &[FILL],
};
pub const SCANLINE_INIT_MODULE: ShaderModuleDesc = ShaderModuleDesc {
    label: "Scanline Init Shader",
    chunks: &[COMMON, GEOMETRY, SCANLINE_COMMON, SCANLINE_INIT],
};
pub const SCANLINE_WORK_MODULE: ShaderModuleDesc = ShaderModuleDesc {
    label: "Scanline Work Shader",
    chunks: &[COMMON, SCANLINE_COMMON, SCANLINE_WORK],
};
pub const PYRAMID_REDUCE_MODULE: ShaderModuleDesc = ShaderModuleDesc {
    label: "Pyramid Reduce Shader",
    chunks: &[COMMON, PYRAMID_REDUCE],
};
pub const HIZ_NAIVE_MODULE: ShaderModuleDesc = ShaderModuleDesc {
    label: "Naive Hi-Z Shader",
    chunks: &[COMMON, GEOMETRY, HIZ_COMMON, HIZ_NAIVE],
};
pub const OCTREE_BUILD_MODULE: ShaderModuleDesc = ShaderModuleDesc {
    label: "Octree Build Shader",
    chunks: &[COMMON, GEOMETRY, OCTREE_COMMON, OCTREE_BUILD],
};
pub const HIZ_OCTREE_MODULE: ShaderModuleDesc = ShaderModuleDesc {
    label: "Octree Hi-Z Shader",
    chunks: &[COMMON, GEOMETRY, HIZ_COMMON, OCTREE_COMMON, HIZ_OCTREE],
};

/// Every module `create_pipelines` compiles
pub const ALL_MODULES: [ShaderModuleDesc; 10] = [
    SURFACE_MODULE,
    WIREFRAME_MODULE,
    BLIT_MODULE,
    FILL_MODULE,
    SCANLINE_INIT_MODULE,
    SCANLINE_WORK_MODULE,
    PYRAMID_REDUCE_MODULE,
    HIZ_NAIVE_MODULE,
    OCTREE_BUILD_MODULE,
    HIZ_OCTREE_MODULE,
];

/// Join chunks in order
pub fn compose_shader(chunks: &[&str]) -> String {
    chunks.join("\n")
}

/// Create a shader module, failing on validation errors instead of
/// deferring them to pipeline creation
pub fn create_validated_shader(
    device: &wgpu::Device,
    desc: &ShaderModuleDesc,
) -> VisibilityResult<wgpu::ShaderModule> {
    let label = desc.label;
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(compose_shader(desc.chunks))),
    });

    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        log::error!("[Shaders] {} failed validation: {}", label, error);
        return Err(VisibilityError::ShaderValidation {
            label: label.to_string(),
            message: error.to_string(),
        });
    }

    log::debug!("[Shaders] Compiled {}", label);
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_keeps_order() {
        let source = compose_shader(&[COMMON, GEOMETRY, SURFACE]);
        let frame = source.find("var<uniform> frame").unwrap();
        let vertices = source.find("var<storage, read> vertices").unwrap();
        let surface = source.find("fn vs_mesh").unwrap();
        assert!(frame < vertices && vertices < surface);
    }

    #[test]
    fn test_chunks_do_not_redeclare_bindings() {
        // Any binding slot must be declared by exactly one chunk of a module
        for desc in ALL_MODULES {
            let source = compose_shader(desc.chunks);
            let mut seen = std::collections::HashSet::new();
            for line in source.lines().filter(|l| l.trim_start().starts_with("@group(")) {
                let slot: String = line.split("var").next().unwrap().trim().to_string();
                assert!(seen.insert(slot.clone()), "{}: duplicate binding {}", desc.label, slot);
            }
        }
    }

    #[test]
    fn test_every_module_validates_without_a_device() {
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        );
        for desc in ALL_MODULES {
            let source = compose_shader(desc.chunks);
            let module = naga::front::wgsl::parse_str(&source)
                .unwrap_or_else(|e| panic!("{}: {}", desc.label, e.emit_to_string(&source)));
            if let Err(e) = validator.validate(&module) {
                panic!("{}: {:?}", desc.label, e);
            }
        }
    }

    #[test]
    fn test_module_labels_are_unique() {
        let labels: std::collections::HashSet<_> = ALL_MODULES.iter().map(|d| d.label).collect();
        assert_eq!(labels.len(), ALL_MODULES.len());
    }
}
