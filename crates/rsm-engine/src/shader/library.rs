use crate::assets::AssetSource;
use crate::device::RenderDevice;
use crate::error::Result;
use crate::resources::Registry;

use super::{ProgramInterface, ShaderBudget, ShaderProgram, ShaderSource, ShaderStage};

/// One entry of the built-in program set.
#[derive(Debug, Copy, Clone)]
pub struct StandardProgram {
    pub name: &'static str,
    pub interface: ProgramInterface,
    pub vertex: &'static str,
    pub fragment: &'static str,
}

impl StandardProgram {
    pub const GBUFFER: &'static str = "GBuffer";
    pub const RSM: &'static str = "RSMGBuffer";
    pub const DEFERRED_SHADING: &'static str = "DeferredShading";
    pub const INDIRECT_ILLUMINATION: &'static str = "IndirectIllumination";
    pub const PRESENT: &'static str = "Present";

    /// Loads, injects, compiles and links this program.
    ///
    /// Fragment stages receive the budget constants; vertex stages are compiled
    /// as written.
    pub fn build<D: RenderDevice>(
        &self,
        device: &mut D,
        assets: &dyn AssetSource,
        budget: ShaderBudget,
    ) -> Result<ShaderProgram<D>> {
        let vertex = ShaderSource::new(ShaderStage::Vertex, self.vertex, assets.source(self.vertex)?)
            .compile(device)?;

        let fragment =
            ShaderSource::new(ShaderStage::Fragment, self.fragment, assets.source(self.fragment)?)
                .with(budget.lights_declaration())
                .with(budget.vpl_declaration())
                .compile(device)?;

        let mut program = ShaderProgram::new(self.name, self.interface);
        program.add_shader(vertex)?.add_shader(fragment)?;
        program.link(device)?;
        Ok(program)
    }
}

pub const STANDARD_PROGRAMS: &[StandardProgram] = &[
    StandardProgram {
        name: StandardProgram::GBUFFER,
        interface: ProgramInterface::Geometry,
        vertex: "shaders/gbuffer.vs.wgsl",
        fragment: "shaders/gbuffer.fs.wgsl",
    },
    StandardProgram {
        name: StandardProgram::RSM,
        interface: ProgramInterface::ShadowMap,
        vertex: "shaders/rsm.vs.wgsl",
        fragment: "shaders/rsm.fs.wgsl",
    },
    StandardProgram {
        name: StandardProgram::DEFERRED_SHADING,
        interface: ProgramInterface::DirectLighting,
        vertex: "shaders/fullscreen.vs.wgsl",
        fragment: "shaders/deferred_shading.fs.wgsl",
    },
    StandardProgram {
        name: StandardProgram::INDIRECT_ILLUMINATION,
        interface: ProgramInterface::IndirectIllumination,
        vertex: "shaders/fullscreen.vs.wgsl",
        fragment: "shaders/indirect_illumination.fs.wgsl",
    },
    StandardProgram {
        name: StandardProgram::PRESENT,
        interface: ProgramInterface::Present,
        vertex: "shaders/fullscreen.vs.wgsl",
        fragment: "shaders/present.fs.wgsl",
    },
];

/// Builds every standard program and registers it under its name.
///
/// All or nothing: `shaders` is only touched once every program has linked.
pub fn build_standard_programs<D: RenderDevice>(
    device: &mut D,
    assets: &dyn AssetSource,
    budget: ShaderBudget,
    shaders: &mut Registry<ShaderProgram<D>>,
) -> Result<()> {
    let built = STANDARD_PROGRAMS
        .iter()
        .map(|standard| Ok((standard.name, standard.build(device, assets, budget)?)))
        .collect::<Result<Vec<_>>>()?;
    for (name, program) in built {
        shaders.add(name, program);
    }
    log::info!(
        "built {} shader programs (NUM_LIGHTS={}, NUM_VPL={})",
        STANDARD_PROGRAMS.len(),
        budget.num_lights,
        budget.num_vpl
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{EmbeddedShaders, MemoryAssetSource};
    use crate::device::SoftwareDevice;
    use crate::error::EngineError;
    use crate::resources::Category;

    #[test]
    fn every_standard_program_links_from_embedded_sources() {
        let mut device = SoftwareDevice::new();
        let mut shaders = Registry::new(Category::Shader);
        build_standard_programs(
            &mut device,
            &EmbeddedShaders,
            ShaderBudget::default(),
            &mut shaders,
        )
        .unwrap();

        assert_eq!(shaders.len(), STANDARD_PROGRAMS.len());
        for standard in STANDARD_PROGRAMS {
            let program = shaders.get(standard.name).unwrap();
            assert!(program.is_linked(), "{} not linked", standard.name);
            assert_eq!(program.interface(), standard.interface);
        }
    }

    #[test]
    fn small_budgets_still_compile() {
        let mut device = SoftwareDevice::new();
        let budget = ShaderBudget {
            num_lights: 1,
            num_vpl: 1,
        };
        for standard in STANDARD_PROGRAMS {
            standard.build(&mut device, &EmbeddedShaders, budget).unwrap();
        }
    }

    #[test]
    fn missing_source_is_asset_not_found() {
        let mut device = SoftwareDevice::new();
        let empty = MemoryAssetSource::new();
        let err = STANDARD_PROGRAMS[0]
            .build(&mut device, &empty, ShaderBudget::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::AssetNotFound { path } if path == "shaders/gbuffer.vs.wgsl"));
    }

    #[test]
    fn broken_fragment_names_the_file() {
        let mut device = SoftwareDevice::new();
        let mut assets = MemoryAssetSource::new();
        for standard in STANDARD_PROGRAMS {
            assets.insert(standard.vertex, EmbeddedShaders.source(standard.vertex).unwrap());
        }
        assets.insert("shaders/gbuffer.fs.wgsl", "@fragment fn fs_main( {");

        let err = STANDARD_PROGRAMS[0]
            .build(&mut device, &assets, ShaderBudget::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::Compile { stage: ShaderStage::Fragment, name, .. }
            if name == "shaders/gbuffer.fs.wgsl"));
    }

    #[test]
    fn late_failure_registers_nothing() {
        let mut device = SoftwareDevice::new();
        let mut assets = MemoryAssetSource::new();
        for standard in STANDARD_PROGRAMS {
            for path in [standard.vertex, standard.fragment] {
                assets.insert(path, EmbeddedShaders.source(path).unwrap());
            }
        }
        assets.insert("shaders/present.fs.wgsl", "@fragment fn fs_main( {");

        let mut shaders = Registry::new(Category::Shader);
        let err =
            build_standard_programs(&mut device, &assets, ShaderBudget::default(), &mut shaders)
                .unwrap_err();
        assert!(matches!(err, EngineError::Compile { name, .. } if name == "shaders/present.fs.wgsl"));
        assert!(shaders.is_empty());
    }
}
