//! # Symbol Naming
//!
//! Deterministic GLSL identifiers derived from node ids and port/parameter
//! names. Uniqueness follows from node id and port name uniqueness.

/// Replace every character outside `[A-Za-z0-9]` with `_`.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Global variable holding a node output.
pub fn output_variable_name(node_id: &str, port: &str) -> String {
    format!("node_{}_{}", sanitize(node_id), sanitize(port))
}

/// Global array backing an array parameter.
pub fn array_variable_name(node_id: &str, param: &str) -> String {
    format!("array_{}_{}", sanitize(node_id), sanitize(param))
}

/// Evaluator function of an automation lane.
pub fn automation_function_name(lane_id: &str) -> String {
    format!("automation_{}", sanitize(lane_id))
}

/// Instance-qualified name of a library function.
pub fn instance_function_name(function: &str, node_id: &str) -> String {
    format!("{}_{}", function, sanitize(node_id))
}

/// Distance function synthesised for a raymarcher.
pub fn sdf_function_name(node_id: &str) -> String {
    format!("sdf_{}", sanitize(node_id))
}

/// Displacement function synthesised for a raymarcher.
pub fn displacement_function_name(node_id: &str) -> String {
    format!("displacement_{}", sanitize(node_id))
}

/// Local that shadows a node output inside a synthesised raymarch function.
pub fn inline_variable_name(node_id: &str, port: &str) -> String {
    format!("rm_{}_{}", sanitize(node_id), sanitize(port))
}
