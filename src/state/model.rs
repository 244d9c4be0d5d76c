use std::fmt;

use serde::{Deserialize, Serialize};

/// Health of a backend as reported by the balancer, folded from the
/// various spellings the state endpoint has used over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerStatus {
    Healthy,
    Down,
    Unknown,
}

impl ServerStatus {
    /// `HEALTHY`/`active`/`up`/`true` and `DOWN`/`inactive`/`false` style
    /// labels. Anything else is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "healthy" | "active" | "up" | "alive" | "ok" | "online" | "true" => Self::Healthy,
            "down" | "inactive" | "unhealthy" | "dead" | "offline" | "false" => Self::Down,
            _ => Self::Unknown,
        }
    }

    pub fn from_flag(active: bool) -> Self {
        if active { Self::Healthy } else { Self::Down }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Healthy => "HEALTHY",
            Self::Down => "DOWN",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub name: String,
    pub ip: String,
    pub port: u16,
    pub status: ServerStatus,
    pub load_count: u64,
    pub vnode_count: u64,
    pub weight: f64,
}

/// One point on the ring. `server_ref` names a [`ServerRecord`] but the
/// server is not required to be present in the same snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualNode {
    pub server_ref: String,
    pub angle_degrees: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramEntry {
    pub server_ref: String,
    pub load_count: u64,
}

/// One normalized snapshot of the balancer. Built fresh on every successful
/// poll and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterState {
    servers: Vec<ServerRecord>,
    vnodes: Vec<VirtualNode>,
    histogram: Vec<HistogramEntry>,
    ring_size: u64,
}

impl ClusterState {
    pub(crate) fn new(
        servers: Vec<ServerRecord>,
        vnodes: Vec<VirtualNode>,
        histogram: Vec<HistogramEntry>,
        ring_size: Option<u64>,
    ) -> Self {
        let ring_size = ring_size.unwrap_or(vnodes.len() as u64);
        Self {
            servers,
            vnodes,
            histogram,
            ring_size,
        }
    }

    pub fn servers(&self) -> &[ServerRecord] {
        &self.servers
    }

    pub fn vnodes(&self) -> &[VirtualNode] {
        &self.vnodes
    }

    pub fn histogram(&self) -> &[HistogramEntry] {
        &self.histogram
    }

    pub fn ring_size(&self) -> u64 {
        self.ring_size
    }

    pub fn server(&self, name: &str) -> Option<&ServerRecord> {
        self.servers.iter().find(|s| s.name == name)
    }
}
