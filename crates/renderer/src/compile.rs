use naga::valid::{Capabilities, ValidationFlags, Validator};

/// Name of the vertex entry point emitted by the preamble.
pub const VERTEX_ENTRY: &str = "vs_main";

/// Name of the fragment entry point the user source must define.
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Errors produced while turning editor text into a pipeline.
///
/// Every variant only ends the current attempt; the manager stays usable and a
/// later recompile may succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// The shader compiler rejected the composed program.
    #[error("failed to compile shader:\n{0}")]
    Build(String),
    /// The program compiled but does not expose a required entry point.
    #[error("missing entry point `{0}`")]
    MissingEntryPoint(String),
    /// The device refused to assemble a pipeline from the compiled program.
    #[error("failed to create pipeline: {0}")]
    PipelineAssembly(String),
}

impl CompileError {
    /// One-line form for status displays: the headline of a compiler
    /// diagnostic, or the full message for the other variants.
    pub fn summary(&self) -> String {
        match self {
            CompileError::Build(diagnostic) => diagnostic
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(|line| line.strip_prefix("error:").map_or(line, str::trim_start))
                .unwrap_or("failed to compile shader")
                .to_string(),
            other => other.to_string(),
        }
    }
}

/// Fully composed and validated WGSL program, ready for the GPU backend.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    source: String,
}

impl ShaderProgram {
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Prepends [`PREAMBLE`] to the user's fragment-stage source.
///
/// The user text is appended untouched; the vertex stage is never editable.
pub fn compose_program(fragment_source: &str) -> String {
    let mut composed = String::with_capacity(PREAMBLE.len() + fragment_source.len() + 1);
    composed.push_str(PREAMBLE);
    composed.push('\n');
    composed.push_str(fragment_source);
    composed
}

/// Composes, parses and validates the program with naga.
///
/// Entry points are looked up in the parsed module, so occurrences of the
/// entry-point names in comments or other identifiers never count.
pub fn build_program(fragment_source: &str) -> Result<ShaderProgram, CompileError> {
    let source = compose_program(fragment_source);

    let module = naga::front::wgsl::parse_str(&source)
        .map_err(|err| CompileError::Build(err.emit_to_string(&source)))?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::default());
    validator
        .validate(&module)
        .map_err(|err| CompileError::Build(err.emit_to_string(&source)))?;

    for (name, stage) in [
        (VERTEX_ENTRY, naga::ShaderStage::Vertex),
        (FRAGMENT_ENTRY, naga::ShaderStage::Fragment),
    ] {
        let found = module
            .entry_points
            .iter()
            .any(|entry| entry.name == name && entry.stage == stage);
        if !found {
            return Err(CompileError::MissingEntryPoint(name.to_string()));
        }
    }

    Ok(ShaderProgram { source })
}

/// WGSL prologue placed ahead of every fragment shader.
///
/// `Env` must stay in sync with [`crate::UniformBlock`]; the vertex stage
/// forwards the clip-space corners of the full-screen quad untouched.
pub const PREAMBLE: &str = r"struct Env {
    time: f32,
    width: f32,
    height: f32,
}

@group(0) @binding(0)
var<uniform> env: Env;

@vertex
fn vs_main(@location(0) position: vec4<f32>) -> @builtin(position) vec4<f32> {
    return position;
}
";

/// Placeholder program shown on start-up and restored by reset: rotating
/// radial stripes.
pub const DEFAULT_FRAGMENT_SOURCE: &str = r"@fragment
fn fs_main(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    let uv = position.xy / vec2<f32>(env.width, env.height) * 2.0 - 1.0;
    let center = vec2<f32>(0.0, 0.0);

    let diff = uv - center;
    let radius = length(diff);
    let angle = atan2(diff.y, diff.x);

    let wave = sin(radius * 10.0 - env.time * 5.0 + angle * 5.0);
    let color = step(0.5, wave);
    return vec4<f32>(color, color, color, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_source_builds() {
        let program = build_program(DEFAULT_FRAGMENT_SOURCE).expect("default shader");
        assert!(program.source().starts_with(PREAMBLE));
        assert!(program.source().ends_with(DEFAULT_FRAGMENT_SOURCE));
    }

    #[test]
    fn syntax_error_reports_diagnostic() {
        let err = build_program("@fragment fn fs_main( -> {").unwrap_err();
        match err {
            CompileError::Build(message) => assert!(!message.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn summary_keeps_first_diagnostic_line() {
        let err = CompileError::Build("\nerror: expected `)`\n  ┌─ wgsl:3:1\n".into());
        assert_eq!(err.summary(), "expected `)`");
        assert_eq!(CompileError::Build(String::new()).summary(), "failed to compile shader");
        assert_eq!(
            CompileError::MissingEntryPoint("fs_main".into()).summary(),
            "missing entry point `fs_main`"
        );

        let err = build_program("@fragment fn fs_main( -> {").unwrap_err();
        let summary = err.summary();
        assert!(!summary.is_empty());
        assert!(!summary.contains('\n'));
    }

    #[test]
    fn type_error_is_a_build_error() {
        let source = r"@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return env.time;
}
";
        assert!(matches!(build_program(source), Err(CompileError::Build(_))));
    }

    #[test]
    fn entry_point_names_in_text_are_not_entry_points() {
        let source = r"// fs_main lives elsewhere
fn fs_main_helper() -> f32 {
    return env.time;
}
";
        assert_eq!(
            build_program(source).unwrap_err(),
            CompileError::MissingEntryPoint(FRAGMENT_ENTRY.to_string())
        );
    }

    #[test]
    fn plain_function_named_like_entry_point_is_missing() {
        let source = r"fn fs_main() -> vec4<f32> {
    return vec4<f32>(1.0);
}
";
        assert_eq!(
            build_program(source).unwrap_err(),
            CompileError::MissingEntryPoint(FRAGMENT_ENTRY.to_string())
        );
    }

    #[test]
    fn redefining_vertex_stage_fails_to_build() {
        let source = format!(
            "{DEFAULT_FRAGMENT_SOURCE}\n@vertex\nfn vs_main() -> @builtin(position) vec4<f32> {{ return vec4<f32>(0.0); }}\n"
        );
        assert!(matches!(build_program(&source), Err(CompileError::Build(_))));
    }

    #[test]
    fn empty_source_lacks_fragment_entry() {
        assert_eq!(
            build_program("").unwrap_err(),
            CompileError::MissingEntryPoint(FRAGMENT_ENTRY.to_string())
        );
    }
}
