use std::fmt;

use crate::device::RenderDevice;
use crate::error::{EngineError, Result};

use super::source::CompiledShader;
use super::{ProgramInterface, ShaderStage};

/// A vertex + fragment pair linked into one device program.
///
/// Stages are attached with `add_shader`; `link` runs once. Everything that can
/// go wrong while assembling the pair is reported as `EngineError::Link`.
pub struct ShaderProgram<D: RenderDevice> {
    name: String,
    interface: ProgramInterface,
    vertex: Option<CompiledShader<D>>,
    fragment: Option<CompiledShader<D>>,
    linked: Option<D::Program>,
}

impl<D: RenderDevice> ShaderProgram<D> {
    pub fn new(name: impl Into<String>, interface: ProgramInterface) -> Self {
        Self {
            name: name.into(),
            interface,
            vertex: None,
            fragment: None,
            linked: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interface(&self) -> ProgramInterface {
        self.interface
    }

    pub fn is_linked(&self) -> bool {
        self.linked.is_some()
    }

    pub fn add_shader(&mut self, shader: CompiledShader<D>) -> Result<&mut Self> {
        if self.linked.is_some() {
            return Err(self.link_error(format!(
                "cannot attach {} shader '{}' to a linked program",
                shader.stage(),
                shader.name()
            )));
        }

        let slot = match shader.stage() {
            ShaderStage::Vertex => &mut self.vertex,
            ShaderStage::Fragment => &mut self.fragment,
        };
        if let Some(existing) = slot.as_ref() {
            let diagnostic = format!(
                "{} stage already attached ('{}'), refusing '{}'",
                shader.stage(),
                existing.name(),
                shader.name()
            );
            return Err(self.link_error(diagnostic));
        }

        *slot = Some(shader);
        Ok(self)
    }

    pub fn link(&mut self, device: &mut D) -> Result<()> {
        if self.linked.is_some() {
            return Err(self.link_error("program is already linked"));
        }

        let (Some(vertex), Some(fragment)) = (&self.vertex, &self.fragment) else {
            let missing = if self.vertex.is_none() {
                ShaderStage::Vertex
            } else {
                ShaderStage::Fragment
            };
            return Err(self.link_error(format!("missing {missing} stage")));
        };

        check_interfaces(self.interface, vertex, fragment).map_err(|d| self.link_error(d))?;

        let raw = device
            .link_program(&self.name, self.interface, vertex.raw(), fragment.raw())
            .map_err(|d| self.link_error(d))?;

        log::debug!("linked program '{}' ({})", self.name, self.interface);
        self.linked = Some(raw);
        Ok(())
    }

    /// Device program, present once `link` succeeded.
    pub fn raw(&self) -> Option<&D::Program> {
        self.linked.as_ref()
    }

    fn link_error(&self, diagnostic: impl Into<String>) -> EngineError {
        EngineError::Link {
            program: self.name.clone(),
            diagnostic: diagnostic.into(),
        }
    }
}

fn check_interfaces<D: RenderDevice>(
    interface: ProgramInterface,
    vertex: &CompiledShader<D>,
    fragment: &CompiledShader<D>,
) -> std::result::Result<(), String> {
    let produced = &vertex.interface().outputs;
    let missing: Vec<_> = fragment
        .interface()
        .inputs
        .difference(produced)
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(format!(
            "fragment '{}' reads @location {:?} that vertex '{}' does not write",
            fragment.name(),
            missing,
            vertex.name()
        ));
    }

    let expected = interface.target().color_count();
    let written = fragment.interface().outputs.len();
    if written != expected {
        return Err(format!(
            "fragment '{}' writes {written} color outputs, {} target has {expected}",
            fragment.name(),
            interface.target().kind
        ));
    }

    Ok(())
}

impl<D: RenderDevice> fmt::Debug for ShaderProgram<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("name", &self.name)
            .field("interface", &self.interface)
            .field("vertex", &self.vertex.as_ref().map(|s| s.name()))
            .field("fragment", &self.fragment.as_ref().map(|s| s.name()))
            .field("linked", &self.linked.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SoftwareDevice;
    use crate::shader::ShaderSource;

    const VS: &str = r#"
struct Out {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> Out {
    var output: Out;
    output.uv = vec2<f32>(f32(index), 0.0);
    output.clip = vec4<f32>(output.uv, 0.0, 1.0);
    return output;
}
"#;

    const FS: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 0.0, 1.0);
}
"#;

    const FS_READS_LOCATION_3: &str = r#"
@fragment
fn fs_main(@location(3) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 0.0, 1.0);
}
"#;

    fn compile(
        device: &mut SoftwareDevice,
        stage: ShaderStage,
        body: &str,
    ) -> CompiledShader<SoftwareDevice> {
        ShaderSource::new(stage, format!("{stage}"), body)
            .compile(device)
            .unwrap()
    }

    // ── linking ─────────────────────────────────────────────────────────────

    #[test]
    fn links_matching_pair() {
        let mut device = SoftwareDevice::new();
        let mut program = ShaderProgram::new("Tonemap", ProgramInterface::DirectLighting);
        program
            .add_shader(compile(&mut device, ShaderStage::Vertex, VS))
            .unwrap()
            .add_shader(compile(&mut device, ShaderStage::Fragment, FS))
            .unwrap();
        program.link(&mut device).unwrap();
        assert!(program.is_linked());
        assert!(program.raw().is_some());
    }

    #[test]
    fn missing_fragment_is_a_link_error() {
        let mut device = SoftwareDevice::new();
        let mut program = ShaderProgram::new("Half", ProgramInterface::DirectLighting);
        program
            .add_shader(compile(&mut device, ShaderStage::Vertex, VS))
            .unwrap();
        let err = program.link(&mut device).unwrap_err();
        assert!(matches!(&err, EngineError::Link { program, diagnostic }
            if program == "Half" && diagnostic.contains("fragment")));
        assert!(!program.is_linked());
    }

    #[test]
    fn duplicate_stage_is_a_link_error() {
        let mut device = SoftwareDevice::new();
        let mut program = ShaderProgram::new("Twice", ProgramInterface::DirectLighting);
        program
            .add_shader(compile(&mut device, ShaderStage::Vertex, VS))
            .unwrap();
        let second = program.add_shader(compile(&mut device, ShaderStage::Vertex, VS));
        assert!(matches!(second, Err(EngineError::Link { .. })));
    }

    #[test]
    fn relink_is_rejected() {
        let mut device = SoftwareDevice::new();
        let mut program = ShaderProgram::new("Once", ProgramInterface::DirectLighting);
        program
            .add_shader(compile(&mut device, ShaderStage::Vertex, VS))
            .unwrap()
            .add_shader(compile(&mut device, ShaderStage::Fragment, FS))
            .unwrap();
        program.link(&mut device).unwrap();
        assert!(matches!(
            program.link(&mut device),
            Err(EngineError::Link { .. })
        ));
        assert!(program.is_linked());
    }

    #[test]
    fn unmatched_fragment_input_is_a_link_error() {
        let mut device = SoftwareDevice::new();
        let mut program = ShaderProgram::new("Mismatch", ProgramInterface::DirectLighting);
        program
            .add_shader(compile(&mut device, ShaderStage::Vertex, VS))
            .unwrap()
            .add_shader(compile(&mut device, ShaderStage::Fragment, FS_READS_LOCATION_3))
            .unwrap();
        let err = program.link(&mut device).unwrap_err();
        assert!(err.to_string().contains("@location [3]"));
    }

    #[test]
    fn output_count_must_match_target_layout() {
        let mut device = SoftwareDevice::new();
        let mut program = ShaderProgram::new("Narrow", ProgramInterface::Geometry);
        program
            .add_shader(compile(&mut device, ShaderStage::Vertex, VS))
            .unwrap()
            .add_shader(compile(&mut device, ShaderStage::Fragment, FS))
            .unwrap();
        let err = program.link(&mut device).unwrap_err();
        assert!(err.to_string().contains("1 color outputs"));
    }
}
