use std::collections::BTreeSet;

use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::ShaderStage;

/// User-defined `@location` slots an entry point consumes and produces.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct StageInterface {
    pub entry_point: String,
    pub inputs: BTreeSet<u32>,
    pub outputs: BTreeSet<u32>,
}

/// Parses and validates one WGSL stage, returning its location interface.
///
/// Errors carry the naga diagnostic rendered against `text`.
pub(crate) fn validate_stage(stage: ShaderStage, text: &str) -> Result<StageInterface, String> {
    let module = naga::front::wgsl::parse_str(text).map_err(|e| e.emit_to_string(text))?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| e.emit_to_string(text))?;

    let wanted = stage.to_naga();
    let mut entries = module.entry_points.iter().filter(|ep| ep.stage == wanted);

    let entry = entries
        .next()
        .ok_or_else(|| format!("no @{stage} entry point"))?;
    if entries.next().is_some() {
        return Err(format!("more than one @{stage} entry point"));
    }

    let mut interface = StageInterface {
        entry_point: entry.name.clone(),
        ..Default::default()
    };

    for arg in &entry.function.arguments {
        collect_locations(&module, arg.binding.as_ref(), arg.ty, &mut interface.inputs);
    }
    if let Some(result) = &entry.function.result {
        collect_locations(&module, result.binding.as_ref(), result.ty, &mut interface.outputs);
    }

    Ok(interface)
}

fn collect_locations(
    module: &naga::Module,
    binding: Option<&naga::Binding>,
    ty: naga::Handle<naga::Type>,
    out: &mut BTreeSet<u32>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            out.insert(*location);
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.binding.as_ref(), member.ty, out);
                }
            }
        }
    }
}
