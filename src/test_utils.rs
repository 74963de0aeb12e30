//! Test fixtures shared by the unit tests.

use crate::graph::{Connection, NodeGraph, NodeInstance};
use crate::metadata::{DataType, NodeTypeSpec, ParamSpec, PortSpec, ShaderNodeRegistry};

pub const RAYMARCH_TEMPLATE: &str = "vec3 ro = vec3(0.0, 0.0, -3.0);
vec3 rd = normalize(vec3($uv, 1.5));
float travel = 0.0;
for (int i = 0; i < $param.steps; i++) {
    vec3 marchPos = ro + rd * travel;
    float d = $sdf_call + $displacement_at_p;
    if (d < 0.001) break;
    travel += d;
}
$output.color = vec3(1.0 - travel * 0.1);";

/// A small registry covering every code path the compiler has.
pub fn test_registry() -> ShaderNodeRegistry {
    ShaderNodeRegistry::from_specs([
        NodeTypeSpec::new("constant", "input")
            .with_output(PortSpec::new("out", DataType::Float))
            .with_param("value", ParamSpec::float(1.0))
            .with_main_code("$output.out = $param.value;"),
        NodeTypeSpec::new("seven", "input")
            .with_output(PortSpec::new("out", DataType::Float))
            .with_main_code("$output.out = 7.0;"),
        NodeTypeSpec::new("output", "output").with_input(PortSpec::new("color", DataType::Vec3)),
        NodeTypeSpec::new("scale", "math")
            .with_input(PortSpec::new("in", DataType::Float).with_fallback_params(["gain"]))
            .with_output(PortSpec::new("out", DataType::Float))
            .with_param("gain", ParamSpec::float(2.0).with_range(0.0, 10.0))
            .with_param("steps", ParamSpec::int(4))
            .with_main_code("$output.out = $input.in * $param.gain;"),
        NodeTypeSpec::new("tint", "color")
            .with_input(PortSpec::new("color", DataType::Vec4))
            .with_output(PortSpec::new("out", DataType::Vec4))
            .with_main_code("$output.out = $input.color;"),
        NodeTypeSpec::new("circle", "shape")
            .with_input(PortSpec::new("center", DataType::Vec2).with_fallback_params(["cx", "cy"]))
            .with_output(PortSpec::new("dist", DataType::Float))
            .with_param("radius", ParamSpec::float(0.5).with_range(0.0, 2.0))
            .with_param("cx", ParamSpec::float(0.0))
            .with_param("cy", ParamSpec::float(0.0))
            .with_function_code(
                "float sdCircle(vec2 p, float r) {\n    return length(p) - r;\n}\n",
            )
            .with_main_code("$output.dist = sdCircle($uv - $input.center, $param.radius);"),
        NodeTypeSpec::new("ring", "shape")
            .with_output(PortSpec::new("dist", DataType::Float))
            .with_param("radius", ParamSpec::float(0.5))
            .with_function_code(
                "const float RING_EPS = 0.001;\n\nfloat ringShape(vec2 p) {\n    return abs(length(p) - $param.radius) - RING_EPS;\n}\n",
            )
            .with_main_code("$output.dist = ringShape($uv);"),
        NodeTypeSpec::new("disc", "shape")
            .with_output(PortSpec::new("dist", DataType::Float))
            .with_main_code("$output.dist = length($uv) - 0.5;"),
        NodeTypeSpec::new("vignette", "color")
            .with_output(PortSpec::new("value", DataType::Float))
            .with_function_code("float vignette(float s) {\n    return s * length($uv);\n}\n")
            .with_main_code("$output.value = vignette(1.0);"),
        NodeTypeSpec::new("sphere", "sdf")
            .with_output(PortSpec::new("dist", DataType::Float))
            .with_param("radius", ParamSpec::float(1.0))
            .with_function_code("float sdSphere(vec3 p, float r) {\n    return length(p) - r;\n}\n")
            .with_main_code("$output.dist = sdSphere($position, $param.radius);"),
        NodeTypeSpec::new("ripple", "sdf")
            .with_output(PortSpec::new("value", DataType::Float))
            .with_param("freq", ParamSpec::float(4.0))
            .with_main_code("$output.value = sin($position.x * $param.freq) * 0.1;"),
        NodeTypeSpec::new("raymarcher", "render")
            .with_input(PortSpec::new("sdf", DataType::Float))
            .with_input(PortSpec::new("displacement", DataType::Float))
            .with_output(PortSpec::new("color", DataType::Vec3))
            .with_param("steps", ParamSpec::int(64))
            .with_main_code(RAYMARCH_TEMPLATE),
    ])
}

pub fn graph_with(nodes: Vec<NodeInstance>, connections: Vec<Connection>) -> NodeGraph {
    let mut graph = NodeGraph::new("test-graph", "test");
    graph.nodes = nodes;
    graph.connections = connections;
    graph
}
