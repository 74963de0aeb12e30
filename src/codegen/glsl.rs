//! GLSL value helpers: numeric literals and type conversions.

use crate::metadata::DataType;

/// Float literal with an explicit fractional part (`7` -> `7.0`).
pub fn format_float(value: f64) -> String {
    if !value.is_finite() {
        return "0.0".to_string();
    }
    if value.fract() != 0.0 {
        return format!("{}", value);
    }
    if value.abs() < 1e15 {
        return format!("{:.1}", value);
    }
    // exponent form, with a mantissa that always carries a fractional part
    let text = format!("{:e}", value);
    match text.split_once('e') {
        Some((mantissa, exponent)) if !mantissa.contains('.') => {
            format!("{mantissa}.0e{exponent}")
        }
        _ => text,
    }
}

/// Integer literal (truncating).
pub fn format_int(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    format!("{}", value.trunc() as i64)
}

fn is_simple(expr: &str) -> bool {
    !expr.is_empty()
        && expr
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// `expr.<components>`, parenthesised unless `expr` is a plain symbol.
pub fn swizzle(expr: &str, components: &str) -> String {
    if is_simple(expr) {
        format!("{expr}.{components}")
    } else {
        format!("({expr}).{components}")
    }
}

/// Convert `expr` of type `from` into `to` using the fixed conversion rules:
/// vectors demote by dropping trailing components, scalars broadcast, vectors
/// widen by padding with `0.0` (and `1.0` for alpha).
pub fn convert(expr: &str, from: DataType, to: DataType) -> String {
    use DataType::*;
    match (from, to) {
        _ if from == to => expr.to_string(),
        (Int, Float) => format!("float({expr})"),
        (Float, Int) => format!("int({expr})"),
        (Int, Vec2 | Vec3 | Vec4) => format!("{}(float({expr}))", to.glsl_name()),
        (Float, Vec2 | Vec3 | Vec4) => format!("{}({expr})", to.glsl_name()),
        (Vec2 | Vec3 | Vec4, Float) => swizzle(expr, "x"),
        (Vec2 | Vec3 | Vec4, Int) => format!("int({})", swizzle(expr, "x")),
        (Vec2, Vec3) => format!("vec3({expr}, 0.0)"),
        (Vec2, Vec4) => format!("vec4({expr}, 0.0, 1.0)"),
        (Vec3, Vec4) => format!("vec4({expr}, 1.0)"),
        (Vec3 | Vec4, Vec2) => swizzle(expr, "xy"),
        (Vec4, Vec3) => swizzle(expr, "xyz"),
        _ => expr.to_string(),
    }
}

/// Promote any numeric value to a float (parameter connections).
pub fn to_float(expr: &str, from: DataType) -> String {
    convert(expr, from, DataType::Float)
}

/// Project a value onto an RGB color.
pub fn to_color(expr: &str, from: DataType) -> String {
    match from {
        DataType::Vec2 => format!("vec3({expr}, 0.0)"),
        other => convert(expr, other, DataType::Vec3),
    }
}

/// Assemble float components into a value of `target`'s arity.
///
/// One component broadcasts; otherwise missing components pad with `0.0` and
/// extra ones are dropped.
pub fn assemble(components: &[String], target: DataType) -> String {
    let arity = target.components();
    match (components.len(), target) {
        (0, _) => target.zero().to_string(),
        (_, DataType::Int) => format!("int({})", components[0]),
        (_, DataType::Float) => components[0].clone(),
        (1, _) => format!("{}({})", target.glsl_name(), components[0]),
        _ => {
            let mut parts: Vec<String> = components.iter().take(arity).cloned().collect();
            while parts.len() < arity {
                parts.push("0.0".to_string());
            }
            format!("{}({})", target.glsl_name(), parts.join(", "))
        }
    }
}
