//! # Automation Evaluators
//!
//! One GLSL function per automation lane. The emitted code follows
//! [`AutomationLane::evaluate`] exactly: first covering region wins, looping
//! regions wrap with a floored modulo, and a linear scan finds the active
//! keyframe segment.

use super::glsl::format_float;
use super::{push_warning, CompileContext};
use crate::graph::{hermite_tangents, AutomationLane, AutomationRegion, Interpolation, Keyframe};
use crate::naming::automation_function_name;
use std::collections::HashSet;

/// Emit an evaluator for every lane, in graph order.
pub fn generate_automation(ctx: &CompileContext<'_>, warnings: &mut Vec<String>) -> Vec<String> {
    let mut names = HashSet::new();
    let mut functions = Vec::new();

    for lane in &ctx.graph.automation {
        let name = automation_function_name(&lane.id);
        if !names.insert(name.clone()) {
            push_warning(
                warnings,
                format!("Automation lane '{}' maps to duplicate evaluator '{}'; skipped", lane.id, name),
            );
            continue;
        }
        let (min, max) = ctx
            .node(&lane.node_id)
            .and_then(|node| ctx.spec(node))
            .and_then(|spec| spec.parameter(&lane.param_name))
            .map_or((None, None), |param| (param.min, param.max));

        tracing::debug!(
            "[PSGC] Automation evaluator {} for {}.{}",
            name,
            lane.node_id,
            lane.param_name
        );
        functions.push(lane_function(&name, lane, min, max));
    }
    functions
}

fn clamp_expr(value: &str, min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) => format!("clamp({value}, {}, {})", format_float(lo), format_float(hi)),
        (Some(lo), None) => format!("max({value}, {})", format_float(lo)),
        (None, Some(hi)) => format!("min({value}, {})", format_float(hi)),
        (None, None) => value.to_string(),
    }
}

fn lane_function(name: &str, lane: &AutomationLane, min: Option<f64>, max: Option<f64>) -> String {
    let floor = format_float(min.unwrap_or(0.0));
    let mut out = String::new();
    out.push_str(&format!("float {name}(float t) {{\n"));
    for region in &lane.regions {
        if region.duration.is_nan() || region.duration <= 0.0 {
            continue;
        }
        out.push_str(&region_block(region, min, max, &floor));
    }
    out.push_str(&format!("    return {floor};\n"));
    out.push('}');
    out
}

fn region_block(region: &AutomationRegion, min: Option<f64>, max: Option<f64>, floor: &str) -> String {
    let start = format_float(region.start_time);
    let duration = format_float(region.duration);
    let mut out = String::new();
    if region.looping {
        out.push_str(&format!("    if (t >= {start}) {{\n"));
        out.push_str(&format!("        float localT = mod(t - {start}, {duration}) / {duration};\n"));
    } else {
        let end = format_float(region.start_time + region.duration);
        out.push_str(&format!("    if (t >= {start} && t < {end}) {{\n"));
        out.push_str(&format!("        float localT = (t - {start}) / {duration};\n"));
    }

    let keys = region.curve.sorted_keyframes();
    match keys.last() {
        None => {
            out.push_str(&format!("        return {};\n", clamp_expr(floor, min, max)));
        }
        Some(last) => {
            out.push_str(&format!("        float v = {};\n", format_float(last.value)));
            out.push_str(&segment_chain(&keys, region.curve.interpolation));
            out.push_str(&format!("        return {};\n", clamp_expr("v", min, max)));
        }
    }
    out.push_str("    }\n");
    out
}

/// `if (localT <= t0) ... else if (localT < t1) ...` over every segment.
fn segment_chain(keys: &[Keyframe], interpolation: Interpolation) -> String {
    let tangents = hermite_tangents(keys);
    let mut out = String::new();
    out.push_str(&format!(
        "        if (localT <= {}) {{\n            v = {};\n        }}\n",
        format_float(keys[0].time),
        format_float(keys[0].value)
    ));
    for i in 0..keys.len().saturating_sub(1) {
        let (k0, k1) = (keys[i], keys[i + 1]);
        let dt = k1.time - k0.time;
        if dt <= 0.0 {
            continue;
        }
        let t0 = format_float(k0.time);
        let span = format_float(dt);
        let v0 = format_float(k0.value);
        let v1 = format_float(k1.value);
        let assign = match interpolation {
            Interpolation::Stepped => format!("v = {v0};"),
            Interpolation::Linear => format!("v = mix({v0}, {v1}, (localT - {t0}) / {span});"),
            Interpolation::Bezier => {
                let m0 = format_float(tangents[i] * dt);
                let m1 = format_float(tangents[i + 1] * dt);
                format!(
                    "float s = (localT - {t0}) / {span};\n            \
                     float s2 = s * s;\n            \
                     float s3 = s2 * s;\n            \
                     v = (2.0 * s3 - 3.0 * s2 + 1.0) * {v0} + (s3 - 2.0 * s2 + s) * {m0} \
                     + (-2.0 * s3 + 3.0 * s2) * {v1} + (s3 - s2) * {m1};"
                )
            }
        };
        out.push_str(&format!(
            "        else if (localT < {}) {{\n            {}\n        }}\n",
            format_float(k1.time),
            assign
        ));
    }
    out
}
