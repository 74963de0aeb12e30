#![allow(dead_code)]

use psgc::{Connection, NodeGraph, NodeInstance, ShaderNodeRegistry};

/// Node types as the editor ships them.
pub const REGISTRY_JSON: &str = r#"[
  {
    "id": "seven",
    "category": "input",
    "outputs": [{ "name": "out", "type": "float" }],
    "mainCode": "$output.out = 7.0;"
  },
  {
    "id": "constant",
    "category": "input",
    "outputs": [{ "name": "out", "type": "float" }],
    "parameters": { "value": { "type": "float", "default": 1.0, "min": 0.0, "max": 10.0 } },
    "mainCode": "$output.out = $param.value;"
  },
  {
    "id": "output",
    "category": "output",
    "inputs": [{ "name": "color", "type": "vec3" }]
  },
  {
    "id": "circle",
    "category": "shape",
    "inputs": [{ "name": "center", "type": "vec2", "fallback": "vec2(0.0)" }],
    "outputs": [{ "name": "mask", "type": "float" }],
    "parameters": { "radius": { "type": "float", "default": 0.5, "min": 0.0, "max": 2.0 } },
    "functionCode": "float sdCircle(vec2 p, float r) {\n    return length(p) - r;\n}\n",
    "mainCode": "$output.mask = 1.0 - step(0.0, sdCircle($uv - $input.center, $param.radius));"
  },
  {
    "id": "ring",
    "category": "shape",
    "outputs": [{ "name": "mask", "type": "float" }],
    "parameters": { "radius": { "type": "float", "default": 0.5 } },
    "functionCode": "const float RING_WIDTH = 0.02;\n\nfloat ringShape(vec2 p) {\n    // width is shared, radius is per instance\n    return abs(length(p) - $param.radius) - RING_WIDTH;\n}\n",
    "mainCode": "$output.mask = 1.0 - step(0.0, ringShape($uv));"
  },
  {
    "id": "mix",
    "category": "color",
    "inputs": [
      { "name": "a", "type": "vec3" },
      { "name": "b", "type": "vec3", "fallbackParams": ["r", "g", "b"] }
    ],
    "outputs": [{ "name": "out", "type": "vec3" }],
    "parameters": {
      "amount": { "type": "float", "default": 0.5, "min": 0.0, "max": 1.0, "combinationMode": "multiply" },
      "r": { "type": "float", "default": 1.0 },
      "g": { "type": "float", "default": 1.0 },
      "b": { "type": "float", "default": 1.0 }
    },
    "mainCode": "$output.out = mix($input.a, $input.b, $param.amount);"
  },
  {
    "id": "glow",
    "category": "color",
    "inputs": [{ "name": "level", "type": "float", "fallback": "$bogus" }],
    "outputs": [{ "name": "out", "type": "float" }],
    "functionCode": "float glow(float x) {\n    return x * x;\n}\n",
    "mainCode": "$output.out = glow($input.level);"
  },
  {
    "id": "sphere",
    "category": "sdf",
    "outputs": [{ "name": "dist", "type": "float" }],
    "parameters": { "radius": { "type": "float", "default": 1.0 } },
    "functionCode": "float sdSphere(vec3 p, float r) {\n    return length(p) - r;\n}\n",
    "mainCode": "$output.dist = sdSphere($position, $param.radius);"
  },
  {
    "id": "raymarcher",
    "category": "render",
    "inputs": [
      { "name": "sdf", "type": "float" },
      { "name": "displacement", "type": "float" }
    ],
    "outputs": [{ "name": "color", "type": "vec3" }],
    "parameters": { "steps": { "type": "int", "default": 64 } },
    "mainCode": "vec3 ro = vec3(0.0, 0.0, -3.0);\nvec3 rd = normalize(vec3($uv, 1.5));\nfloat travel = 0.0;\nfor (int i = 0; i < $param.steps; i++) {\n    vec3 marchPos = ro + rd * travel;\n    float d = $sdf_call + $displacement_at_p;\n    if (d < 0.001) break;\n    travel += d;\n}\n$output.color = vec3(1.0 / (1.0 + travel));"
  }
]"#;

pub fn registry() -> ShaderNodeRegistry {
    ShaderNodeRegistry::from_json(REGISTRY_JSON).expect("fixture registry parses")
}

pub fn graph(nodes: Vec<NodeInstance>, connections: Vec<Connection>) -> NodeGraph {
    let mut graph = NodeGraph::new("fixture", "fixture graph");
    graph.nodes = nodes;
    graph.connections = connections;
    graph
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
