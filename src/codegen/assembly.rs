//! Program assembly from the fixed fragment template.

use super::{RESOLUTION_UNIFORM, TIME_UNIFORM};

const PROGRAM_TEMPLATE: &str = "#version {{VERSION}}
precision highp float;

uniform float {{TIME}};
uniform vec2 {{RESOLUTION}};
{{UNIFORMS}}
out vec4 fragColor;

{{GLOBALS}}

{{FUNCTIONS}}

void main() {
    vec2 uv = (gl_FragCoord.xy - 0.5 * {{RESOLUTION}}.xy) / {{RESOLUTION}}.y;
    vec3 p = vec3(uv, 0.0);

{{BODY}}

    fragColor = vec4({{COLOR}}, 1.0);
}
";

/// The generated pieces of one program.
#[derive(Debug, Clone, Default)]
pub struct ProgramParts {
    pub glsl_version: String,
    /// Complete `uniform float x;` lines, already sorted and deduplicated.
    pub uniforms: Vec<String>,
    pub globals: Vec<String>,
    pub functions: Vec<String>,
    pub bodies: Vec<String>,
    pub color: String,
}

pub fn assemble_program(parts: &ProgramParts) -> String {
    let functions: Vec<&str> = parts
        .functions
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .collect();
    PROGRAM_TEMPLATE
        .replace("{{VERSION}}", &parts.glsl_version)
        .replace("{{TIME}}", TIME_UNIFORM)
        .replace("{{RESOLUTION}}", RESOLUTION_UNIFORM)
        .replace("{{UNIFORMS}}", &parts.uniforms.join("\n"))
        .replace("{{GLOBALS}}", &parts.globals.join("\n"))
        .replace("{{FUNCTIONS}}", &functions.join("\n\n"))
        .replace("{{BODY}}", &parts.bodies.join("\n\n"))
        .replace("{{COLOR}}", &parts.color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_layout() {
        let parts = ProgramParts {
            glsl_version: "300 es".to_string(),
            uniforms: vec!["uniform float uaValue;".to_string()],
            globals: vec!["float node_a_out = 0.0;".to_string()],
            functions: vec!["float f() { return 1.0; }".to_string(), "  ".to_string()],
            bodies: vec!["    // node: a (constant)\n    {\n        node_a_out = uaValue;\n    }".to_string()],
            color: "vec3(node_a_out)".to_string(),
        };
        let program = assemble_program(&parts);
        assert!(program.starts_with("#version 300 es\nprecision highp float;\n"));
        assert!(program.contains("uniform float uTime;\nuniform vec2 uResolution;\nuniform float uaValue;\n"));
        assert!(program.contains("vec2 uv = (gl_FragCoord.xy - 0.5 * uResolution.xy) / uResolution.y;"));
        assert!(program.contains("float f() { return 1.0; }\n\nvoid main()"));
        assert!(program.contains("fragColor = vec4(vec3(node_a_out), 1.0);"));

        let uniforms_at = program.find("uaValue;").unwrap();
        let globals_at = program.find("float node_a_out").unwrap();
        let body_at = program.find("node_a_out = uaValue").unwrap();
        assert!(uniforms_at < globals_at && globals_at < body_at);
    }
}
