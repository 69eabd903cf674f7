//! Shader sources, compiled stages and linked programs.
//!
//! A `ShaderSource` collects prepended injections (budget constants, shared
//! declarations) in call order and compiles once into a `CompiledShader`. Two
//! compiled stages link into a `ShaderProgram` whose interface names the
//! render-target layout it writes.

mod library;
mod program;
mod source;
mod validate;

use std::fmt;

use crate::render::TargetLayout;

pub use library::{build_standard_programs, StandardProgram, STANDARD_PROGRAMS};
pub use program::ShaderProgram;
pub use source::{CompiledShader, ShaderSource};
pub use validate::StageInterface;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Compile-time sizes baked into shader text.
///
/// Fixed for the life of an engine; changing either one means recompiling
/// every program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ShaderBudget {
    pub num_lights: u32,
    pub num_vpl: u32,
}

impl Default for ShaderBudget {
    fn default() -> Self {
        Self {
            num_lights: 4,
            num_vpl: 64,
        }
    }
}

impl ShaderBudget {
    pub fn lights_declaration(&self) -> String {
        format!("const NUM_LIGHTS: u32 = {}u;\n", self.num_lights)
    }

    pub fn vpl_declaration(&self) -> String {
        format!("const NUM_VPL: u32 = {}u;\n", self.num_vpl)
    }
}

/// What a program consumes and which target layout it writes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ProgramInterface {
    /// Scene geometry into the G-buffer.
    Geometry,
    /// Scene geometry seen from a light into its RSM.
    ShadowMap,
    /// Fullscreen read of the G-buffer into the accumulation buffer.
    DirectLighting,
    /// Fullscreen read of the G-buffer and one RSM, added into the accumulation buffer.
    IndirectIllumination,
    /// Accumulation buffer to the presentation surface.
    Present,
}

impl ProgramInterface {
    pub fn target(self) -> TargetLayout {
        match self {
            ProgramInterface::Geometry => TargetLayout::GBUFFER,
            ProgramInterface::ShadowMap => TargetLayout::RSM,
            ProgramInterface::DirectLighting | ProgramInterface::IndirectIllumination => {
                TargetLayout::ACCUMULATION
            }
            ProgramInterface::Present => TargetLayout::SURFACE,
        }
    }

    /// Geometry interfaces read mesh vertex buffers; the rest draw a fullscreen triangle.
    pub fn reads_vertex_buffers(self) -> bool {
        matches!(self, ProgramInterface::Geometry | ProgramInterface::ShadowMap)
    }
}

impl fmt::Display for ProgramInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProgramInterface::Geometry => "geometry",
            ProgramInterface::ShadowMap => "shadow map",
            ProgramInterface::DirectLighting => "direct lighting",
            ProgramInterface::IndirectIllumination => "indirect illumination",
            ProgramInterface::Present => "present",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_declarations_are_wgsl_consts() {
        let budget = ShaderBudget {
            num_lights: 2,
            num_vpl: 16,
        };
        assert_eq!(budget.lights_declaration(), "const NUM_LIGHTS: u32 = 2u;\n");
        assert_eq!(budget.vpl_declaration(), "const NUM_VPL: u32 = 16u;\n");
    }

    #[test]
    fn lighting_interfaces_share_the_accumulation_layout() {
        assert_eq!(
            ProgramInterface::DirectLighting.target(),
            ProgramInterface::IndirectIllumination.target()
        );
        assert!(ProgramInterface::ShadowMap.reads_vertex_buffers());
        assert!(!ProgramInterface::Present.reads_vertex_buffers());
    }
}
