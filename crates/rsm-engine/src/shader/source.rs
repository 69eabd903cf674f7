use std::fmt;

use crate::device::RenderDevice;
use crate::error::{EngineError, Result};

use super::validate::{validate_stage, StageInterface};
use super::ShaderStage;

/// Uncompiled shader stage: a body plus ordered prepended injections.
///
/// The final text is every injection in call order followed by the body.
/// `compile` consumes the source, so a stage compiles at most once.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    stage: ShaderStage,
    name: String,
    body: String,
    injections: Vec<String>,
}

impl ShaderSource {
    pub fn new(stage: ShaderStage, name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            stage,
            name: name.into(),
            body: body.into(),
            injections: Vec::new(),
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends `text` after every earlier injection and before the body.
    pub fn inject(&mut self, text: impl Into<String>) -> &mut Self {
        self.injections.push(text.into());
        self
    }

    /// Builder-style `inject`.
    pub fn with(mut self, text: impl Into<String>) -> Self {
        self.inject(text);
        self
    }

    pub fn text(&self) -> String {
        let len = self.injections.iter().map(String::len).sum::<usize>() + self.body.len();
        let mut text = String::with_capacity(len);
        for injection in &self.injections {
            text.push_str(injection);
        }
        text.push_str(&self.body);
        text
    }

    /// Validates the assembled text and hands it to the device.
    pub fn compile<D: RenderDevice>(self, device: &mut D) -> Result<CompiledShader<D>> {
        let text = self.text();
        let compile_error = |diagnostic: String| EngineError::Compile {
            stage: self.stage,
            name: self.name.clone(),
            diagnostic,
        };

        let interface = validate_stage(self.stage, &text).map_err(compile_error)?;
        let raw = device
            .compile_stage(self.stage, &self.name, &text, &interface)
            .map_err(compile_error)?;

        log::debug!("compiled {} shader '{}'", self.stage, self.name);

        Ok(CompiledShader {
            stage: self.stage,
            name: self.name,
            interface,
            raw,
        })
    }
}

/// Successfully compiled stage, ready to be attached to a program.
pub struct CompiledShader<D: RenderDevice> {
    stage: ShaderStage,
    name: String,
    interface: StageInterface,
    raw: D::Stage,
}

impl<D: RenderDevice> CompiledShader<D> {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interface(&self) -> &StageInterface {
        &self.interface
    }

    pub fn raw(&self) -> &D::Stage {
        &self.raw
    }
}

impl<D: RenderDevice> fmt::Debug for CompiledShader<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledShader")
            .field("stage", &self.stage)
            .field("name", &self.name)
            .field("interface", &self.interface)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SoftwareDevice;

    const FS_USING_BUDGET: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(f32(NUM_LIGHTS), f32(NUM_VPL), 0.0, 1.0);
}
"#;

    #[test]
    fn injections_prepend_in_call_order() {
        let mut src = ShaderSource::new(ShaderStage::Fragment, "t", "S");
        src.inject("a").inject("b").inject("c");
        assert_eq!(src.text(), "abcS");
        assert_eq!(src.text(), src.clone().text());
    }

    #[test]
    fn no_injections_is_just_the_body() {
        let src = ShaderSource::new(ShaderStage::Vertex, "t", "body");
        assert_eq!(src.text(), "body");
    }

    #[test]
    fn compiles_with_budget_injected() {
        let mut device = SoftwareDevice::new();
        let compiled = ShaderSource::new(ShaderStage::Fragment, "budget.fs", FS_USING_BUDGET)
            .with("const NUM_LIGHTS: u32 = 4u;\n")
            .with("const NUM_VPL: u32 = 64u;\n")
            .compile(&mut device)
            .unwrap();
        assert_eq!(compiled.stage(), ShaderStage::Fragment);
        assert_eq!(compiled.interface().entry_point, "fs_main");
    }

    #[test]
    fn missing_budget_is_a_compile_error() {
        let mut device = SoftwareDevice::new();
        let err = ShaderSource::new(ShaderStage::Fragment, "budget.fs", FS_USING_BUDGET)
            .compile(&mut device)
            .unwrap_err();
        match err {
            EngineError::Compile { stage, name, diagnostic } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(name, "budget.fs");
                assert!(!diagnostic.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_stage_is_a_compile_error() {
        let mut device = SoftwareDevice::new();
        let src = ShaderSource::new(ShaderStage::Vertex, "budget.fs", FS_USING_BUDGET)
            .with("const NUM_LIGHTS: u32 = 4u;\nconst NUM_VPL: u32 = 64u;\n");
        assert!(matches!(
            src.compile(&mut device),
            Err(EngineError::Compile { stage: ShaderStage::Vertex, .. })
        ));
    }
}
