use crate::poller::Snapshot;

/// Emit a poll snapshot as pretty-printed JSON to stdout. Used by the
/// one-shot mode in place of the interactive dashboard.
pub fn report_snapshot(snapshot: &Snapshot) {
    if let Ok(json) = serde_json::to_string_pretty(snapshot) {
        println!("{json}");
    }
}
