use std::borrow::Cow;

use anyhow::Result;
use wgpu::naga::ShaderStage;

use crate::types::{ShaderCompiler, BLUR_DIRECTIONS, BLUR_QUALITY, BLUR_RADIUS_PX};

/// Compiles the quad vertex stage shared by both passes.
pub(crate) fn compile_vertex_shader(
    device: &wgpu::Device,
    compiler: ShaderCompiler,
) -> Result<wgpu::ShaderModule> {
    create_module(
        device,
        "sideblur vertex",
        Cow::Owned(vertex_source()),
        ShaderStage::Vertex,
        compiler,
    )
}

/// Compiles the fragment stage with the blur constants baked in.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    compiler: ShaderCompiler,
) -> Result<wgpu::ShaderModule> {
    create_module(
        device,
        "sideblur fragment",
        Cow::Owned(fragment_source()),
        ShaderStage::Fragment,
        compiler,
    )
}

fn create_module(
    device: &wgpu::Device,
    label: &str,
    source: Cow<'static, str>,
    stage: ShaderStage,
    compiler: ShaderCompiler,
) -> Result<wgpu::ShaderModule> {
    let source = match compiler {
        ShaderCompiler::NagaGlsl => wgpu::ShaderSource::Glsl {
            shader: source,
            stage,
            defines: &[],
        },
        ShaderCompiler::Shaderc => {
            wgpu::ShaderSource::SpirV(Cow::Owned(compile_spirv(&source, stage, label)?))
        }
    };
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source,
    }))
}

#[cfg(feature = "shaderc")]
fn compile_spirv(source: &str, stage: ShaderStage, name: &str) -> Result<Vec<u32>> {
    use anyhow::Context;

    let kind = match stage {
        ShaderStage::Vertex => shaderc::ShaderKind::Vertex,
        ShaderStage::Fragment => shaderc::ShaderKind::Fragment,
        other => anyhow::bail!("unsupported shader stage {other:?}"),
    };
    let compiler = shaderc::Compiler::new().context("failed to initialise shaderc")?;
    let mut options =
        shaderc::CompileOptions::new().context("failed to create shaderc options")?;
    options.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_0 as u32,
    );
    let artifact = compiler
        .compile_into_spirv(source, kind, name, "main", Some(&options))
        .with_context(|| format!("shaderc rejected {name}"))?;
    if artifact.get_num_warnings() > 0 {
        tracing::warn!(shader = name, warnings = %artifact.get_warning_messages(), "shaderc warnings");
    }
    Ok(artifact.as_binary().to_vec())
}

#[cfg(not(feature = "shaderc"))]
fn compile_spirv(_source: &str, _stage: ShaderStage, name: &str) -> Result<Vec<u32>> {
    anyhow::bail!("cannot compile {name}: built without the `shaderc` feature")
}

/// Produces the vertex stage source.
pub(crate) fn vertex_source() -> String {
    format!("{VERTEX_HEADER}{PARAMS_BLOCK}{VERTEX_BODY}")
}

/// Produces the fragment stage source from the shared blur constants.
pub(crate) fn fragment_source() -> String {
    format!(
        "{FRAGMENT_HEADER}{PARAMS_BLOCK}{FRAGMENT_BINDINGS}\n\
         const int QUALITY = {quality};\n\
         const int DIRECTIONS = {directions};\n\
         const float TAU = {tau:?};\n\
         const float RADIUS = {radius:?};\n{FRAGMENT_BODY}",
        quality = BLUR_QUALITY,
        directions = BLUR_DIRECTIONS,
        tau = std::f32::consts::TAU,
        radius = BLUR_RADIUS_PX,
    )
}

/// Uniform block shared by both stages; must match [`EffectUniforms`].
///
/// [`EffectUniforms`]: crate::gpu::EffectUniforms
const PARAMS_BLOCK: &str = r"
layout(std140, set = 0, binding = 0) uniform EffectParams {
    mat4 uTransformationMatrix;
    mat4 uTexTransformationMatrix;
    vec2 uResolution;
    int uDrawMode;
} params;
";

const VERTEX_HEADER: &str = r"#version 450
layout(location = 0) in vec4 aFramePosition;
layout(location = 0) out vec2 vTexSamplingCoord;
";

const VERTEX_BODY: &str = r"
void main() {
    gl_Position = params.uTransformationMatrix * aFramePosition;
    // Textures are addressed from the top-left, so NDC +Y maps to v = 0.
    vec4 texturePosition = vec4(aFramePosition.x * 0.5 + 0.5,
                                0.5 - aFramePosition.y * 0.5, 0.0, 1.0);
    vTexSamplingCoord = (params.uTexTransformationMatrix * texturePosition).xy;
}
";

const FRAGMENT_HEADER: &str = r"#version 450
layout(location = 0) in vec2 vTexSamplingCoord;
layout(location = 0) out vec4 fragColor;
";

const FRAGMENT_BINDINGS: &str = r"
layout(set = 1, binding = 0) uniform texture2D uFrameTexture;
layout(set = 1, binding = 1) uniform sampler uFrameSampler;
";

const FRAGMENT_BODY: &str = r"
// Input frames carry a single mip level.
vec4 sampleFrame(vec2 coord) {
    return textureLod(sampler2D(uFrameTexture, uFrameSampler), coord, 0.0);
}

void main() {
    vec4 color = sampleFrame(vTexSamplingCoord);

    if (params.uDrawMode == 1) {
        vec2 radius = RADIUS / params.uResolution;
        for (int d = 0; d < DIRECTIONS; d++) {
            float angle = TAU * float(d) / float(DIRECTIONS);
            vec2 direction = vec2(cos(angle), sin(angle));
            for (int i = 1; i <= QUALITY; i++) {
                float reach = float(i) / float(QUALITY);
                color += sampleFrame(vTexSamplingCoord + direction * radius * reach);
            }
        }
        color /= float(QUALITY * DIRECTIONS + 1);
    }

    fragColor = color;
}
";
