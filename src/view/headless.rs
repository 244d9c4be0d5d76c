use std::io;

use tracing::{info, warn};

use super::ui::BAR_SCALE;
use crate::layout::{layout, scale};
use crate::poller::PollerHandle;
use crate::state::{ClusterState, StateCell};

/// Logs every new snapshot until Ctrl-C or the poller stops.
pub async fn run_headless(poller: &mut PollerHandle) -> io::Result<()> {
    let mut cell = StateCell::new();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                res?;
                info!("interrupt received, shutting down");
                break;
            }
            event = poller.next_event() => {
                let Some(event) = event else { break };
                let seen = cell.updates();
                cell.apply(event);
                if cell.updates() > seen {
                    if let Some(state) = cell.current() {
                        report(state);
                    }
                }
            }
        }
    }
    Ok(())
}

/// One `[SNAPSHOT]` block: totals, then one line per server.
pub fn report(state: &ClusterState) {
    for line in snapshot_lines(state) {
        info!("{line}");
    }
    if let Err(err) = layout(state.vnodes(), 1.0, 0.0, 0.0) {
        warn!(error = %err, "ring layout unavailable for this snapshot");
    }
}

/// Lines of a `[SNAPSHOT]` block. Shares are relative to the busiest server.
pub fn snapshot_lines(state: &ClusterState) -> Vec<String> {
    let bars = scale(state.histogram(), BAR_SCALE);
    let mut lines = Vec::with_capacity(state.servers().len() + 1);
    lines.push(format!(
        "[SNAPSHOT] {} servers, ring size {}",
        state.servers().len(),
        state.ring_size()
    ));
    for server in state.servers() {
        let share = bars
            .iter()
            .find(|b| b.server_ref == server.name)
            .map(|b| b.height_fraction * 100.0)
            .unwrap_or(0.0);
        lines.push(format!(
            "    {} {}:{} [{}] load={} ({:.0}% of busiest) vnodes={} weight={}",
            server.name,
            server.ip,
            server.port,
            server.status,
            server.load_count,
            share,
            server.vnode_count,
            server.weight
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::normalize;
    use serde_json::json;

    #[test]
    fn shares_are_relative_to_busiest_server() {
        let state = normalize(&json!([
            {"id": "A", "load": 10, "status": "active"},
            {"id": "B", "load": 30, "status": "down"},
        ]))
        .unwrap();

        let lines = snapshot_lines(&state);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "[SNAPSHOT] 2 servers, ring size 2");
        assert!(lines[1].contains("A :0 [HEALTHY] load=10 (33% of busiest)"));
        assert!(lines[2].contains("B :0 [DOWN] load=30 (100% of busiest)"));
    }

    #[test]
    fn mixed_angles_still_report_servers() {
        let state = normalize(&json!({
            "servers": [{"name": "a", "load_count": 0}, {"name": "b", "load_count": 0}],
            "vnodes": [{"server": "a", "angle": 15.0}, {"server": "b"}],
            "requests_histogram": [],
            "ring_size": 2,
        }))
        .unwrap();

        report(&state);
        let lines = snapshot_lines(&state);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("(0% of busiest)"));
    }
}
