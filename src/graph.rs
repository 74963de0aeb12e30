//! # Node Graph Data Model
//!
//! The editor-owned graph handed to the compiler as a value. The compiler reads
//! it but never mutates it.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SEGMENT_EPSILON: f64 = 1e-9;

/// A complete user-editable shader graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGraph {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub nodes: Vec<NodeInstance>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub automation: Vec<AutomationLane>,
}

impl NodeGraph {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: crate::config::GRAPH_FORMAT_VERSION.to_string(),
            nodes: Vec::new(),
            connections: Vec::new(),
            automation: Vec::new(),
        }
    }

    /// Parse an editor snapshot.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// First node with the given id.
    pub fn node(&self, id: &str) -> Option<&NodeInstance> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// First automation lane bound to `(node_id, param_name)`.
    pub fn lane_for(&self, node_id: &str, param_name: &str) -> Option<&AutomationLane> {
        self.automation
            .iter()
            .find(|lane| lane.node_id == node_id && lane.param_name == param_name)
    }
}

/// One operation in the graph, of a registered node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInstance {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Parameter value overrides.
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    /// Per-parameter combination-mode overrides.
    #[serde(default)]
    pub combination_modes: BTreeMap<String, CombinationMode>,
}

impl NodeInstance {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            params: BTreeMap::new(),
            combination_modes: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_combination_mode(mut self, name: impl Into<String>, mode: CombinationMode) -> Self {
        self.combination_modes.insert(name.into(), mode);
        self
    }
}

/// A parameter value as stored on an instance or as a node type default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
    Array(Vec<f64>),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            _ => None,
        }
    }
}

/// How a parameter connection combines with the configured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombinationMode {
    #[default]
    Override,
    Add,
    Subtract,
    Multiply,
}

/// A wire between an output port and either an input port or a float parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub source_node_id: String,
    pub source_port: String,
    pub target_node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_parameter: Option<String>,
}

/// Where a well-formed connection lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionTarget<'a> {
    Port(&'a str),
    Parameter(&'a str),
}

impl Connection {
    pub fn to_port(
        id: impl Into<String>,
        source: (&str, &str),
        target: (&str, &str),
    ) -> Self {
        Self {
            id: id.into(),
            source_node_id: source.0.to_string(),
            source_port: source.1.to_string(),
            target_node_id: target.0.to_string(),
            target_port: Some(target.1.to_string()),
            target_parameter: None,
        }
    }

    pub fn to_parameter(
        id: impl Into<String>,
        source: (&str, &str),
        target: (&str, &str),
    ) -> Self {
        Self {
            id: id.into(),
            source_node_id: source.0.to_string(),
            source_port: source.1.to_string(),
            target_node_id: target.0.to_string(),
            target_port: None,
            target_parameter: Some(target.1.to_string()),
        }
    }

    /// The target, or `None` when the connection sets both or neither field.
    pub fn target(&self) -> Option<ConnectionTarget<'_>> {
        match (&self.target_port, &self.target_parameter) {
            (Some(port), None) => Some(ConnectionTarget::Port(port)),
            (None, Some(param)) => Some(ConnectionTarget::Parameter(param)),
            _ => None,
        }
    }

    pub fn targets_port(&self, node_id: &str, port: &str) -> bool {
        self.target_node_id == node_id && self.target() == Some(ConnectionTarget::Port(port))
    }

    pub fn targets_parameter(&self, node_id: &str, param: &str) -> bool {
        self.target_node_id == node_id
            && self.target() == Some(ConnectionTarget::Parameter(param))
    }
}

/// A time-driven value source for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationLane {
    pub id: String,
    pub node_id: String,
    pub param_name: String,
    #[serde(default)]
    pub regions: Vec<AutomationRegion>,
}

impl AutomationLane {
    /// Value of the lane at timeline `time`.
    ///
    /// The first region covering `time` wins. Looping regions cover everything
    /// after their start. Outside every region the lane yields `min` (or `0.0`).
    pub fn evaluate(&self, time: f64, min: Option<f64>, max: Option<f64>) -> f64 {
        let floor = min.unwrap_or(0.0);
        for region in &self.regions {
            let Some(local) = region.local_time(time) else {
                continue;
            };
            let value = region.curve.sample(local).unwrap_or(floor);
            return clamp_optional(value, min, max);
        }
        floor
    }
}

/// A placed, optionally looping, curve on a lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRegion {
    pub start_time: f64,
    pub duration: f64,
    #[serde(default, rename = "loop")]
    pub looping: bool,
    pub curve: Curve,
}

impl AutomationRegion {
    /// Normalised position in `[0, 1)` of `time` inside this region.
    pub fn local_time(&self, time: f64) -> Option<f64> {
        if self.duration.is_nan() || self.duration <= 0.0 {
            return None;
        }
        let elapsed = time - self.start_time;
        if elapsed < 0.0 {
            return None;
        }
        let within = if self.looping {
            elapsed.rem_euclid(self.duration)
        } else if elapsed >= self.duration {
            return None;
        } else {
            elapsed
        };
        Some(within / self.duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Linear,
    Stepped,
    Bezier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Curve {
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Local time in `[0, 1]`.
    pub time: f64,
    pub value: f64,
}

impl Curve {
    /// Keyframes ordered by time. Ties keep their authored order.
    pub fn sorted_keyframes(&self) -> Vec<Keyframe> {
        let mut keys = self.keyframes.clone();
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        keys
    }

    /// Sample the curve at local time `local`. `None` when there are no keyframes.
    pub fn sample(&self, local: f64) -> Option<f64> {
        let keys = self.sorted_keyframes();
        let first = keys.first()?;
        let last = keys[keys.len() - 1];
        if keys.len() == 1 || local <= first.time {
            return Some(first.value);
        }
        if local >= last.time {
            return Some(last.value);
        }

        let tangents = hermite_tangents(&keys);
        for i in 0..keys.len() - 1 {
            let (k0, k1) = (keys[i], keys[i + 1]);
            if local >= k1.time {
                continue;
            }
            let dt = k1.time - k0.time;
            let s = if dt > SEGMENT_EPSILON { (local - k0.time) / dt } else { 0.0 };
            let value = match self.interpolation {
                Interpolation::Stepped => k0.value,
                Interpolation::Linear => k0.value + (k1.value - k0.value) * s,
                Interpolation::Bezier => {
                    hermite(k0.value, k1.value, tangents[i] * dt, tangents[i + 1] * dt, s)
                }
            };
            return Some(value);
        }
        Some(last.value)
    }
}

/// Per-keyframe slopes derived from neighbouring keyframes.
///
/// Interior keys use the central difference, the ends use one-sided differences.
pub fn hermite_tangents(keys: &[Keyframe]) -> Vec<f64> {
    let n = keys.len();
    if n < 2 {
        return vec![0.0; n];
    }
    (0..n)
        .map(|i| {
            let (a, b) = match i {
                0 => (keys[0], keys[1]),
                i if i == n - 1 => (keys[n - 2], keys[n - 1]),
                i => (keys[i - 1], keys[i + 1]),
            };
            let dt = b.time - a.time;
            if dt > SEGMENT_EPSILON {
                (b.value - a.value) / dt
            } else {
                0.0
            }
        })
        .collect()
}

/// Cubic Hermite basis with tangents already scaled by the segment length.
pub fn hermite(v0: f64, v1: f64, m0: f64, m1: f64, s: f64) -> f64 {
    let s2 = s * s;
    let s3 = s2 * s;
    (2.0 * s3 - 3.0 * s2 + 1.0) * v0
        + (s3 - 2.0 * s2 + s) * m0
        + (-2.0 * s3 + 3.0 * s2) * v1
        + (s3 - s2) * m1
}

fn clamp_optional(value: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let value = min.map_or(value, |lo| value.max(lo));
    max.map_or(value, |hi| value.min(hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(interpolation: Interpolation) -> Curve {
        Curve {
            interpolation,
            keyframes: vec![
                Keyframe { time: 0.0, value: 0.0 },
                Keyframe { time: 1.0, value: 10.0 },
            ],
        }
    }

    fn lane(curve: Curve, looping: bool) -> AutomationLane {
        AutomationLane {
            id: "lane".to_string(),
            node_id: "n1".to_string(),
            param_name: "radius".to_string(),
            regions: vec![AutomationRegion {
                start_time: 2.0,
                duration: 4.0,
                looping,
                curve,
            }],
        }
    }

    #[test]
    fn test_linear_midpoint() {
        let value = ramp(Interpolation::Linear).sample(0.5).unwrap();
        assert!((value - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_stepped_holds_previous_key() {
        let value = ramp(Interpolation::Stepped).sample(0.5).unwrap();
        assert!(value.abs() < 1e-6);
    }

    #[test]
    fn test_bezier_hits_keys_and_is_smooth() {
        let curve = Curve {
            interpolation: Interpolation::Bezier,
            keyframes: vec![
                Keyframe { time: 0.0, value: 0.0 },
                Keyframe { time: 0.5, value: 4.0 },
                Keyframe { time: 1.0, value: 10.0 },
            ],
        };
        assert!((curve.sample(0.0).unwrap()).abs() < 1e-9);
        assert!((curve.sample(0.5).unwrap() - 4.0).abs() < 1e-9);
        let mid = curve.sample(0.25).unwrap();
        assert!(mid > 0.0 && mid < 4.0);
    }

    #[test]
    fn test_unsorted_keyframes_are_ordered() {
        let curve = Curve {
            interpolation: Interpolation::Linear,
            keyframes: vec![
                Keyframe { time: 1.0, value: 10.0 },
                Keyframe { time: 0.0, value: 0.0 },
            ],
        };
        assert!((curve.sample(0.25).unwrap() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_curve_has_no_value() {
        let curve = Curve { interpolation: Interpolation::Linear, keyframes: vec![] };
        assert_eq!(curve.sample(0.5), None);
    }

    #[test]
    fn test_lane_region_dispatch() {
        let lane = lane(ramp(Interpolation::Linear), false);
        // region covers [2, 6)
        assert!((lane.evaluate(4.0, None, None) - 5.0).abs() < 1e-9);
        assert_eq!(lane.evaluate(1.0, Some(-1.0), None), -1.0);
        assert_eq!(lane.evaluate(6.5, Some(0.5), None), 0.5);
    }

    #[test]
    fn test_lane_looping_and_clamp() {
        let lane = lane(ramp(Interpolation::Linear), true);
        // 2 + 4 + 2 -> halfway through the second loop
        assert!((lane.evaluate(8.0, None, None) - 5.0).abs() < 1e-9);
        assert_eq!(lane.evaluate(8.0, None, Some(3.0)), 3.0);
    }

    #[test]
    fn test_connection_target_exactly_one() {
        let mut conn = Connection::to_port("c1", ("a", "out"), ("b", "in"));
        assert_eq!(conn.target(), Some(ConnectionTarget::Port("in")));
        conn.target_parameter = Some("scale".to_string());
        assert_eq!(conn.target(), None);
        conn.target_port = None;
        conn.target_parameter = None;
        assert_eq!(conn.target(), None);
    }

    #[test]
    fn test_graph_json_contract() {
        let json = r#"{
            "id": "g1",
            "name": "demo",
            "version": "1.0",
            "nodes": [
                { "id": "n1", "type": "circle", "params": { "radius": 0.5, "mode": "soft" },
                  "combinationModes": { "radius": "add" } }
            ],
            "connections": [
                { "id": "c1", "sourceNodeId": "virtual:audio", "sourcePort": "level",
                  "targetNodeId": "n1", "targetParameter": "radius" }
            ],
            "automation": [
                { "id": "l1", "nodeId": "n1", "paramName": "radius",
                  "regions": [ { "startTime": 0, "duration": 2, "loop": true,
                    "curve": { "interpolation": "bezier", "keyframes": [ { "time": 0, "value": 1 } ] } } ] }
            ]
        }"#;
        let graph = NodeGraph::from_json(json).unwrap();
        let node = graph.node("n1").unwrap();
        assert_eq!(node.params["radius"], ParamValue::Number(0.5));
        assert_eq!(node.params["mode"], ParamValue::Text("soft".to_string()));
        assert_eq!(node.combination_modes["radius"], CombinationMode::Add);
        assert!(graph.connections[0].targets_parameter("n1", "radius"));
        let lane = graph.lane_for("n1", "radius").unwrap();
        assert!(lane.regions[0].looping);
        assert_eq!(lane.regions[0].curve.interpolation, Interpolation::Bezier);
    }
}
