use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::types::{Bid, ProjectRow, RawProject};

/// One poll cycle's published output: the full replacement row list and the
/// wall-clock time it was produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub rows: Vec<ProjectRow>,
    pub updated_at: String,
}

/// Poll the marketplace until the snapshot receiver is dropped.
///
/// Cycles run sequentially: fetch, publish, sleep, repeat. A slow cycle
/// delays the next one rather than overlapping it, so publication order is
/// deterministic. A failed cycle logs a warning and leaves the previously
/// published snapshot in place.
pub async fn run(client: ApiClient, config: AppConfig, tx: watch::Sender<Snapshot>) {
    let interval = Duration::from_secs(config.settings.poll_interval_secs);
    let mut prev_ids: HashSet<u64> = HashSet::new();

    loop {
        match poll_cycle(&client, &config).await {
            Ok(rows) => {
                let fresh = rows.iter().filter(|r| !prev_ids.contains(&r.id)).count();
                if fresh > 0 && !prev_ids.is_empty() {
                    info!("Detected {fresh} new project(s)");
                }
                prev_ids = rows.iter().map(|r| r.id).collect();

                let snapshot = Snapshot {
                    rows,
                    updated_at: now_stamp(),
                };
                if tx.send(snapshot).is_err() {
                    // View is gone; nothing left to publish to.
                    break;
                }
            }
            Err(e) => {
                warn!("Poll cycle error: {e:#}");
            }
        }

        tokio::time::sleep(interval).await;
    }
}

/// One complete fetch-flatten pass: resolve skill filters, fetch matching
/// active projects, fetch the user's own bids over that project set, and
/// project everything into rows.
pub async fn poll_cycle(client: &ApiClient, config: &AppConfig) -> Result<Vec<ProjectRow>> {
    let job_ids = if config.filters.skills.is_empty() {
        Vec::new()
    } else {
        client.resolve_job_ids(&config.filters.skills).await?
    };

    let projects = client.active_projects(&config.filters, &job_ids).await?;

    let project_ids: Vec<u64> = projects.iter().map(|p| p.id).collect();
    let bids = if project_ids.is_empty() {
        Vec::new()
    } else {
        client
            .bids_for_projects(&project_ids, config.account.user_id)
            .await?
    };

    Ok(project_rows(&projects, &bids))
}

/// Project raw API projects into flat rows, marking the ones the configured
/// user has already bid on.
pub fn project_rows(projects: &[RawProject], bids: &[Bid]) -> Vec<ProjectRow> {
    let bidded_ids: HashSet<u64> = bids.iter().map(|b| b.project_id).collect();
    projects
        .iter()
        .map(|p| ProjectRow::from_project(p, bidded_ids.contains(&p.id)))
        .collect()
}

/// Current UTC time formatted for the "last updated" header.
pub fn now_stamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn project(id: u64) -> RawProject {
        serde_json::from_value(json!({"id": id, "title": format!("p{id}")}))
            .expect("valid project JSON")
    }

    fn bid(id: u64, project_id: u64, bidder_id: u64) -> Bid {
        serde_json::from_value(json!({
            "id": id,
            "project_id": project_id,
            "bidder_id": bidder_id,
            "amount": 50.0
        }))
        .expect("valid bid JSON")
    }

    // ── bidded flag ────────────────────────────────────────────────

    #[test]
    fn bidded_iff_project_id_in_bids() {
        let projects = vec![project(1), project(2), project(3)];
        let bids = vec![bid(900, 2, 42)];
        let rows = project_rows(&projects, &bids);
        for row in &rows {
            assert_eq!(row.bidded, row.id == 2);
        }
    }

    #[test]
    fn no_bids_means_nothing_bidded() {
        let rows = project_rows(&[project(1), project(2)], &[]);
        assert!(rows.iter().all(|r| !r.bidded));
    }

    #[test]
    fn multiple_bids_mark_multiple_rows() {
        let projects = vec![project(1), project(2), project(3)];
        let bids = vec![bid(900, 1, 42), bid(901, 3, 42)];
        let rows = project_rows(&projects, &bids);
        let flags: Vec<bool> = rows.iter().map(|r| r.bidded).collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[test]
    fn rows_preserve_listing_order() {
        let projects = vec![project(5), project(1), project(9)];
        let rows = project_rows(&projects, &[]);
        let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 1, 9]);
    }

    // ── snapshot replacement ───────────────────────────────────────

    #[test]
    fn watch_channel_replaces_snapshot_wholesale() {
        let (tx, rx) = watch::channel(Snapshot::default());

        let first = Snapshot {
            rows: project_rows(&[project(1), project(2)], &[]),
            updated_at: "2024-01-01 00:00:00".to_string(),
        };
        tx.send(first).unwrap();

        // Project 1 is absent from the second cycle's response.
        let second = Snapshot {
            rows: project_rows(&[project(2), project(3)], &[]),
            updated_at: "2024-01-01 00:01:00".to_string(),
        };
        tx.send(second).unwrap();

        let seen = rx.borrow();
        let ids: Vec<u64> = seen.rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(seen.updated_at, "2024-01-01 00:01:00");
    }
}
