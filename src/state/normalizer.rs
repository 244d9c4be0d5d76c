use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ShapeError;
use crate::state::model::{ClusterState, HistogramEntry, ServerRecord, ServerStatus, VirtualNode};

/// Body of one successful poll, before any shape checks.
pub type RawPayload = Value;

const IDENTITY_KEYS: &[&str] = &["name", "id"];
const IP_KEYS: &[&str] = &["ip", "host"];
const LOAD_KEYS: &[&str] = &["load_count", "loadCount", "load"];
const VNODE_COUNT_KEYS: &[&str] = &["vnodes", "vnodeCount", "vnode_count"];
const SERVER_REF_KEYS: &[&str] = &["server", "serverRef", "server_ref", "name", "id"];
const ANGLE_KEYS: &[&str] = &["angle", "angleDegrees", "angle_degrees"];

/// The payload layouts the state endpoint has been seen to return.
#[derive(Debug)]
enum PayloadShape<'a> {
    /// `[server, ...]`
    ServerList(&'a [Value]),
    /// `{"servers": [...], ...}`
    Wrapped(&'a [Value]),
    /// `{"servers", "vnodes", "requests_histogram", "ring_size"}`
    Full {
        servers: &'a [Value],
        vnodes: &'a [Value],
        histogram: &'a [Value],
        ring_size: u64,
    },
}

pub fn normalize(raw: &RawPayload) -> Result<ClusterState, ShapeError> {
    match classify(raw)? {
        PayloadShape::ServerList(items) | PayloadShape::Wrapped(items) => {
            let servers = parse_servers(items)?;
            let vnodes = synthesize_vnodes(&servers);
            let histogram = synthesize_histogram(&servers);
            Ok(ClusterState::new(servers, vnodes, histogram, None))
        }
        PayloadShape::Full {
            servers,
            vnodes,
            histogram,
            ring_size,
        } => {
            let servers = parse_servers(servers)?;
            let vnodes = vnodes
                .iter()
                .enumerate()
                .map(|(idx, v)| parse_vnode(idx, v))
                .collect::<Result<Vec<_>, _>>()?;
            let histogram = parse_histogram(histogram, &servers)?;
            Ok(ClusterState::new(servers, vnodes, histogram, Some(ring_size)))
        }
    }
}

fn classify(raw: &Value) -> Result<PayloadShape<'_>, ShapeError> {
    match raw {
        Value::Array(items) => Ok(PayloadShape::ServerList(items)),
        Value::Object(obj) => {
            let full_keys = ["servers", "vnodes", "requests_histogram", "ring_size"];
            if full_keys.iter().all(|k| obj.contains_key(*k)) {
                return Ok(PayloadShape::Full {
                    servers: array_field(obj, "servers")?,
                    vnodes: array_field(obj, "vnodes")?,
                    histogram: array_field(obj, "requests_histogram")?,
                    ring_size: count_value(&obj["ring_size"]).ok_or_else(|| {
                        invalid("ring_size", "payload", "expected a non-negative integer")
                    })?,
                });
            }
            match obj.get("servers") {
                Some(Value::Array(items)) => Ok(PayloadShape::Wrapped(items)),
                Some(other) => Err(ShapeError::Unrecognized(format!(
                    "'servers' is {}, not an array",
                    kind(other)
                ))),
                None => Err(ShapeError::Unrecognized("object without 'servers'".into())),
            }
        }
        other => Err(ShapeError::Unrecognized(kind(other).into())),
    }
}

fn array_field<'a>(
    obj: &'a Map<String, Value>,
    key: &'static str,
) -> Result<&'a [Value], ShapeError> {
    match obj.get(key) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => {
            let reason = format!("expected an array, got {}", kind(other));
            Err(invalid(key, "payload", &reason))
        }
        None => Err(invalid(key, "payload", "missing")),
    }
}

fn parse_servers(items: &[Value]) -> Result<Vec<ServerRecord>, ShapeError> {
    let mut seen = HashSet::with_capacity(items.len());
    let mut servers = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let server = parse_server(idx, item)?;
        if !seen.insert(server.name.clone()) {
            return Err(ShapeError::DuplicateServer(server.name));
        }
        servers.push(server);
    }
    Ok(servers)
}

fn parse_server(idx: usize, item: &Value) -> Result<ServerRecord, ShapeError> {
    let obj = item.as_object().ok_or_else(|| {
        let reason = format!("expected an object, got {}", kind(item));
        invalid("servers", &format!("index {idx}"), &reason)
    })?;

    let name = identity(lookup(obj, IDENTITY_KEYS)).ok_or(ShapeError::MissingIdentity(idx))?;
    let ctx = format!("server '{name}'");

    let ip = match lookup(obj, IP_KEYS) {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            let reason = format!("expected a string, got {}", kind(other));
            return Err(invalid("ip", &ctx, &reason));
        }
    };

    let port = match lookup(obj, &["port"]) {
        None => 0,
        Some(v) => count_value(v)
            .and_then(|p| u16::try_from(p).ok())
            .ok_or_else(|| invalid("port", &ctx, "expected an integer in 0..=65535"))?,
    };

    let status = match lookup(obj, &["status"]) {
        Some(Value::String(label)) => ServerStatus::from_label(label),
        Some(Value::Bool(flag)) => ServerStatus::from_flag(*flag),
        Some(_) => ServerStatus::Unknown,
        None => match lookup(obj, &["active", "healthy"]) {
            Some(Value::Bool(flag)) => ServerStatus::from_flag(*flag),
            _ => ServerStatus::Unknown,
        },
    };

    let load_count = count_field(obj, LOAD_KEYS, "load_count", &ctx)?;

    // Some exports list the server's vnodes instead of counting them.
    let vnode_count = match lookup(obj, VNODE_COUNT_KEYS) {
        Some(Value::Array(list)) => list.len() as u64,
        _ => count_field(obj, VNODE_COUNT_KEYS, "vnodes", &ctx)?,
    };

    let weight = match lookup(obj, &["weight"]) {
        None => 0.0,
        Some(v) => v
            .as_f64()
            .filter(|w| w.is_finite() && *w >= 0.0)
            .ok_or_else(|| invalid("weight", &ctx, "expected a non-negative number"))?,
    };

    Ok(ServerRecord {
        name,
        ip,
        port,
        status,
        load_count,
        vnode_count,
        weight,
    })
}

fn parse_vnode(idx: usize, item: &Value) -> Result<VirtualNode, ShapeError> {
    let ctx = format!("vnode {idx}");
    let obj = item.as_object().ok_or_else(|| {
        invalid("vnodes", &ctx, &format!("expected an object, got {}", kind(item)))
    })?;

    let server_ref = identity(lookup(obj, SERVER_REF_KEYS))
        .ok_or_else(|| invalid("server", &ctx, "missing server reference"))?;

    let angle_degrees = match lookup(obj, ANGLE_KEYS) {
        None => None,
        Some(v) => {
            let angle = v.as_f64().ok_or_else(|| {
                invalid("angle", &ctx, &format!("expected a number, got {}", kind(v)))
            })?;
            Some(fold_angle(angle))
        }
    };

    Ok(VirtualNode {
        server_ref,
        angle_degrees,
    })
}

/// Maps any angle onto `[0, 360)`; `-90` becomes `270`, `360` becomes `0`.
fn fold_angle(angle: f64) -> f64 {
    let folded = angle.rem_euclid(360.0);
    // rem_euclid of a tiny negative value rounds up to 360.0
    if folded >= 360.0 {
        0.0
    } else {
        folded
    }
}

/// Entries keep the payload's order, but a known server's own `load_count`
/// wins over the histogram's copy.
fn parse_histogram(
    items: &[Value],
    servers: &[ServerRecord],
) -> Result<Vec<HistogramEntry>, ShapeError> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let ctx = format!("requests_histogram {idx}");
            let obj = item.as_object().ok_or_else(|| {
                let reason = format!("expected an object, got {}", kind(item));
                invalid("requests_histogram", &ctx, &reason)
            })?;
            let server_ref = identity(lookup(obj, SERVER_REF_KEYS))
                .ok_or_else(|| invalid("name", &ctx, "missing server reference"))?;
            let reported = count_field(obj, LOAD_KEYS, "load_count", &ctx)?;
            let load_count = match servers.iter().find(|s| s.name == server_ref) {
                Some(server) => {
                    if server.load_count != reported {
                        debug!(
                            server = %server_ref,
                            reported,
                            authoritative = server.load_count,
                            "histogram load differs from server record"
                        );
                    }
                    server.load_count
                }
                None => reported,
            };
            Ok(HistogramEntry {
                server_ref,
                load_count,
            })
        })
        .collect()
}

fn synthesize_vnodes(servers: &[ServerRecord]) -> Vec<VirtualNode> {
    servers
        .iter()
        .map(|s| VirtualNode {
            server_ref: s.name.clone(),
            angle_degrees: None,
        })
        .collect()
}

fn synthesize_histogram(servers: &[ServerRecord]) -> Vec<HistogramEntry> {
    servers
        .iter()
        .map(|s| HistogramEntry {
            server_ref: s.name.clone(),
            load_count: s.load_count,
        })
        .collect()
}

/// First non-null value among `keys`.
fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| !v.is_null())
}

fn identity(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn count_field(
    obj: &Map<String, Value>,
    keys: &[&str],
    field: &'static str,
    ctx: &str,
) -> Result<u64, ShapeError> {
    match lookup(obj, keys) {
        None => Ok(0),
        Some(v) => count_value(v)
            .ok_or_else(|| invalid(field, ctx, "expected a non-negative integer")),
    }
}

/// Non-negative integer, tolerating integral floats such as `3.0`.
fn count_value(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn invalid(field: &'static str, context: &str, reason: &str) -> ShapeError {
    ShapeError::InvalidField {
        field,
        context: context.to_string(),
        reason: reason.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_server_list_is_accepted() {
        let raw = json!([
            {"id": "A", "load": 10, "status": "active"},
            {"id": "B", "load": 30, "status": "down"},
        ]);
        let state = normalize(&raw).unwrap();

        let names: Vec<_> = state.servers().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(state.servers()[0].load_count, 10);
        assert_eq!(state.servers()[0].status, ServerStatus::Healthy);
        assert_eq!(state.servers()[1].status, ServerStatus::Down);
        assert_eq!(state.ring_size(), 2);
        assert!(state.vnodes().iter().all(|v| v.angle_degrees.is_none()));
        assert_eq!(state.histogram()[1].load_count, 30);
    }

    #[test]
    fn wrapped_server_list_reconciles_field_names() {
        let raw = json!({"servers": [
            {"name": "Backend-1", "ip": "10.0.0.1", "port": 8080, "status": "HEALTHY",
             "loadCount": 4, "vnodeCount": 3, "weight": 2.5},
            {"name": "Backend-2", "ip": "10.0.0.2", "port": 8081, "status": "DOWN",
             "load_count": 1, "vnodes": 5, "weight": 1},
        ]});
        let state = normalize(&raw).unwrap();

        assert_eq!(
            state.servers()[0],
            ServerRecord {
                name: "Backend-1".into(),
                ip: "10.0.0.1".into(),
                port: 8080,
                status: ServerStatus::Healthy,
                load_count: 4,
                vnode_count: 3,
                weight: 2.5,
            }
        );
        assert_eq!(state.servers()[1].vnode_count, 5);
        assert_eq!(state.servers()[1].weight, 1.0);
        assert_eq!(state.vnodes().len(), 2);
    }

    #[test]
    fn full_object_is_used_directly() {
        let raw = json!({
            "servers": [
                {"name": "Backend-1", "ip": "10.0.0.1", "port": 8080, "status": "HEALTHY", "load_count": 7, "vnodes": 2, "weight": 1},
                {"name": "Backend-2", "ip": "10.0.0.2", "port": 8080, "status": "HEALTHY", "load_count": 3, "vnodes": 1, "weight": 1},
            ],
            "vnodes": [
                {"server": "Backend-1", "angle": 12.5},
                {"server": "Backend-2", "angle": 150.0},
                {"server": "Backend-1", "angle": 300.25},
            ],
            "requests_histogram": [
                {"name": "Backend-2", "load_count": 3},
                {"name": "Backend-1", "load_count": 7},
            ],
            "ring_size": 64,
        });
        let state = normalize(&raw).unwrap();

        assert_eq!(state.ring_size(), 64);
        assert_eq!(state.vnodes().len(), 3);
        assert_eq!(state.vnodes()[2].angle_degrees, Some(300.25));
        assert_eq!(state.histogram()[0].server_ref, "Backend-2");
    }

    #[test]
    fn histogram_follows_server_load() {
        let raw = json!({
            "servers": [{"name": "a", "load_count": 9}],
            "vnodes": [],
            "requests_histogram": [{"name": "a", "load_count": 2}, {"name": "gone", "load_count": 4}],
            "ring_size": 0,
        });
        let state = normalize(&raw).unwrap();
        assert_eq!(state.histogram()[0].load_count, 9);
        assert_eq!(state.histogram()[1].load_count, 4);
    }

    #[test]
    fn missing_fields_get_defaults() {
        let state = normalize(&json!([{"name": "solo"}])).unwrap();
        let server = &state.servers()[0];
        assert_eq!(server.load_count, 0);
        assert_eq!(server.vnode_count, 0);
        assert_eq!(server.port, 0);
        assert_eq!(server.status, ServerStatus::Unknown);
    }

    #[test]
    fn boolean_active_flag_maps_to_status() {
        let raw = json!([{"id": 1, "active": false}, {"id": 2, "status": true}]);
        let state = normalize(&raw).unwrap();
        assert_eq!(state.servers()[0].name, "1");
        assert_eq!(state.servers()[0].status, ServerStatus::Down);
        assert_eq!(state.servers()[1].status, ServerStatus::Healthy);
    }

    #[test]
    fn malformed_payloads_are_shape_errors() {
        let inputs = [
            json!({}),
            json!(null),
            json!("servers"),
            json!(42),
            json!({"servers": {"a": 1}}),
        ];
        for raw in inputs {
            assert!(
                matches!(normalize(&raw), Err(ShapeError::Unrecognized(_))),
                "{raw} should be unrecognized"
            );
        }
    }

    #[test]
    fn invalid_members_are_rejected() {
        assert!(matches!(normalize(&json!([1, 2])), Err(ShapeError::InvalidField { .. })));
        assert_eq!(normalize(&json!([{"ip": "10.0.0.1"}])), Err(ShapeError::MissingIdentity(0)));
        assert_eq!(
            normalize(&json!([{"id": "A"}, {"name": "A"}])),
            Err(ShapeError::DuplicateServer("A".into()))
        );
        assert!(matches!(
            normalize(&json!([{"id": "A", "load_count": -1}])),
            Err(ShapeError::InvalidField { field: "load_count", .. })
        ));
        let bad_angle = json!({
            "servers": [], "vnodes": [{"server": "a", "angle": "north"}],
            "requests_histogram": [], "ring_size": 1,
        });
        assert!(matches!(
            normalize(&bad_angle),
            Err(ShapeError::InvalidField { field: "angle", .. })
        ));
    }

    #[test]
    fn out_of_range_angles_wrap_onto_the_ring() {
        let raw = json!({
            "servers": [{"name": "a", "load_count": 4}, {"name": "b", "load_count": 1}],
            "vnodes": [
                {"server": "a", "angle": -90.0},
                {"server": "b", "angle": 360.0},
                {"server": "a", "angle": 725.5},
                {"server": "b", "angle": -1e-20},
            ],
            "requests_histogram": [],
            "ring_size": 4,
        });
        let state = normalize(&raw).unwrap();

        assert_eq!(state.servers().len(), 2);
        let angles: Vec<_> = state.vnodes().iter().map(|v| v.angle_degrees.unwrap()).collect();
        assert_eq!(angles, [270.0, 0.0, 5.5, 0.0]);
        assert!(angles.iter().all(|a| (0.0..360.0).contains(a)));
    }

    #[test]
    fn normalizing_twice_gives_equal_snapshots() {
        let raw = json!({"servers": [{"id": "x", "load": 2}, {"id": "y", "load": 5}]});
        assert_eq!(normalize(&raw).unwrap(), normalize(&raw).unwrap());
    }
}
