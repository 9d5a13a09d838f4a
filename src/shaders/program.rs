// SPDX-License-Identifier: GPL-3.0-only

//! Shader program validation and interface reflection
//!
//! The presentation program is parsed and validated with naga before any
//! pipeline is created. Its interface is then checked against what the
//! renderer binds: the two entry points, the two vertex input locations and
//! the three plane textures plus their sampler. Any mismatch is an
//! initialization failure rather than a silent black frame.

use crate::errors::{RenderError, RenderResult};
use tracing::debug;

/// Vertex stage entry point
pub const VERTEX_ENTRY: &str = "vs_main";

/// Fragment stage entry point
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Vertex input location of the quad position
pub const POSITION_LOCATION: u32 = 0;

/// Vertex input location of the texture coordinate
pub const TEX_COORD_LOCATION: u32 = 1;

/// Bind group holding the plane textures and sampler
pub const PLANE_GROUP: u32 = 0;

/// Resources the renderer binds, by name and binding index
pub const PLANE_BINDINGS: [(&str, u32); 4] = [
    ("tex_y", 0),
    ("tex_u", 1),
    ("tex_v", 2),
    ("plane_sampler", 3),
];

/// A resource binding declared by the program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSlot {
    pub name: String,
    pub group: u32,
    pub binding: u32,
}

/// Reflected interface of a validated program
#[derive(Debug, Clone, Default)]
pub struct ProgramInterface {
    /// Entry point names with their stage
    pub entry_points: Vec<(String, naga::ShaderStage)>,
    /// Input locations of the vertex entry point
    pub vertex_locations: Vec<u32>,
    /// Global resource bindings
    pub resources: Vec<ResourceSlot>,
}

impl ProgramInterface {
    fn has_entry(&self, name: &str, stage: naga::ShaderStage) -> bool {
        self.entry_points
            .iter()
            .any(|(entry, entry_stage)| entry == name && *entry_stage == stage)
    }

    fn resource(&self, name: &str) -> Option<&ResourceSlot> {
        self.resources.iter().find(|slot| slot.name == name)
    }
}

/// Parse and validate WGSL source
pub fn compile(source: &str) -> RenderResult<naga::Module> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| {
        RenderError::InitFailed(format!("shader parse failed: {}", e.emit_to_string(source)))
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| RenderError::InitFailed(format!("shader validation failed: {:?}", e)))?;

    Ok(module)
}

/// Collect the locations bound to a function argument, looking into structs
fn collect_locations(module: &naga::Module, arg: &naga::FunctionArgument, out: &mut Vec<u32>) {
    if let Some(naga::Binding::Location { location, .. }) = arg.binding {
        out.push(location);
        return;
    }
    if let naga::TypeInner::Struct { members, .. } = &module.types[arg.ty].inner {
        for member in members {
            if let Some(naga::Binding::Location { location, .. }) = member.binding {
                out.push(location);
            }
        }
    }
}

/// Reflect the interface of a validated module
pub fn reflect(module: &naga::Module) -> ProgramInterface {
    let mut interface = ProgramInterface::default();

    for entry in &module.entry_points {
        interface.entry_points.push((entry.name.clone(), entry.stage));
        if entry.stage == naga::ShaderStage::Vertex && entry.name == VERTEX_ENTRY {
            for arg in &entry.function.arguments {
                collect_locations(module, arg, &mut interface.vertex_locations);
            }
        }
    }

    for (_, global) in module.global_variables.iter() {
        if let (Some(name), Some(binding)) = (&global.name, &global.binding) {
            interface.resources.push(ResourceSlot {
                name: name.clone(),
                group: binding.group,
                binding: binding.binding,
            });
        }
    }

    interface
}

/// Check a reflected interface against what the renderer binds
pub fn check_interface(interface: &ProgramInterface) -> RenderResult<()> {
    if !interface.has_entry(VERTEX_ENTRY, naga::ShaderStage::Vertex) {
        return Err(RenderError::InitFailed(format!(
            "missing vertex entry point '{}'",
            VERTEX_ENTRY
        )));
    }
    if !interface.has_entry(FRAGMENT_ENTRY, naga::ShaderStage::Fragment) {
        return Err(RenderError::InitFailed(format!(
            "missing fragment entry point '{}'",
            FRAGMENT_ENTRY
        )));
    }

    for location in [POSITION_LOCATION, TEX_COORD_LOCATION] {
        if !interface.vertex_locations.contains(&location) {
            return Err(RenderError::InitFailed(format!(
                "vertex input location {} not found",
                location
            )));
        }
    }

    for (name, binding) in PLANE_BINDINGS {
        match interface.resource(name) {
            Some(slot) if slot.group == PLANE_GROUP && slot.binding == binding => {}
            Some(slot) => {
                return Err(RenderError::InitFailed(format!(
                    "'{}' bound at group {} binding {}, expected group {} binding {}",
                    name, slot.group, slot.binding, PLANE_GROUP, binding
                )));
            }
            None => {
                return Err(RenderError::InitFailed(format!(
                    "shader resource '{}' not found",
                    name
                )));
            }
        }
    }

    Ok(())
}

/// Validate a program and check its interface in one step
pub fn check_program(source: &str) -> RenderResult<ProgramInterface> {
    let module = compile(source)?;
    let interface = reflect(&module);
    check_interface(&interface)?;
    debug!(
        entry_points = interface.entry_points.len(),
        resources = interface.resources.len(),
        "Shader program interface verified"
    );
    Ok(interface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CHROMA_OFFSET, LUMA_OFFSET, LUMA_SCALE, YUV_TO_RGB};
    use crate::shaders::YUV_PRESENT_SHADER;

    #[test]
    fn test_present_shader_validates() {
        let interface = check_program(YUV_PRESENT_SHADER).unwrap();
        assert_eq!(interface.vertex_locations, vec![0, 1]);
        assert_eq!(interface.resources.len(), 4);
    }

    #[test]
    fn test_shader_constants_match() {
        for (name, value) in [
            ("LUMA_SCALE", LUMA_SCALE),
            ("LUMA_OFFSET", LUMA_OFFSET),
            ("CHROMA_OFFSET", CHROMA_OFFSET),
        ] {
            let decl = format!("const {}: f32 = {:?};", name, value);
            assert!(YUV_PRESENT_SHADER.contains(&decl), "missing `{}`", decl);
        }
        for column in YUV_TO_RGB {
            let literal = format!(
                "vec3<f32>({:?}, {:?}, {:?})",
                column[0], column[1], column[2]
            );
            assert!(YUV_PRESENT_SHADER.contains(&literal), "missing `{}`", literal);
        }
    }

    #[test]
    fn test_missing_binding_rejected() {
        let source = YUV_PRESENT_SHADER.replace(
            "@group(0) @binding(2) var tex_v: texture_2d<f32>;",
            "@group(0) @binding(2) var tex_w: texture_2d<f32>;",
        );
        let source = source.replace("textureSample(tex_v,", "textureSample(tex_w,");
        match check_program(&source) {
            Err(RenderError::InitFailed(msg)) => assert!(msg.contains("tex_v"), "{}", msg),
            other => panic!("expected InitFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_location_rejected() {
        let source = YUV_PRESENT_SHADER.replace(
            "@location(1) tex_coord: vec2<f32>,\n) -> VertexOutput",
            "@location(2) tex_coord: vec2<f32>,\n) -> VertexOutput",
        );
        assert_ne!(source, YUV_PRESENT_SHADER);
        assert!(matches!(
            check_program(&source),
            Err(RenderError::InitFailed(_))
        ));
    }

    #[test]
    fn test_syntax_error_rejected() {
        assert!(matches!(
            check_program("fn vs_main( {"),
            Err(RenderError::InitFailed(_))
        ));
    }
}
