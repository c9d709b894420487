//! Shared data published by the transport worker and read by the UI.
//!
//! The `Topics` struct is a plain data bus, written once per frame by
//! `PatchbayApp::process_transport_messages()` and read by the status bar.

use chrono::{DateTime, Local};

use crate::editor::ReconcileReport;
use crate::types::ConnectionStatus;

/// All shared data published by the transport worker.
#[derive(Debug, Default)]
pub struct Topics {
    /// Event feed status
    pub connection_status: ConnectionStatus,

    /// When the last snapshot arrived
    pub last_snapshot_at: Option<DateTime<Local>>,

    /// Snapshots received since startup
    pub snapshots_received: u64,

    /// Outcome of the last reconciliation pass that changed something
    pub last_report: Option<ReconcileReport>,

    /// Last submission or fetch error, cleared on reconnect
    pub last_error: Option<String>,
}

impl Topics {
    pub fn record_snapshot(&mut self) {
        self.snapshots_received += 1;
        self.last_snapshot_at = Some(Local::now());
    }

    pub fn record_report(&mut self, report: ReconcileReport) {
        if !report.is_noop() {
            self.last_report = Some(report);
        }
    }

    /// Human readable age of the view, e.g. `"updated 14:03:11"`.
    pub fn freshness(&self) -> String {
        match self.last_snapshot_at {
            Some(at) => format!("updated {}", at.format("%H:%M:%S")),
            None => "no snapshot yet".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_reports_do_not_replace_last() {
        let mut topics = Topics::default();
        let report = ReconcileReport {
            nodes_added: 2,
            ..Default::default()
        };
        topics.record_report(report.clone());
        topics.record_report(ReconcileReport::default());
        assert_eq!(topics.last_report, Some(report));
    }

    #[test]
    fn test_freshness() {
        let mut topics = Topics::default();
        assert_eq!(topics.freshness(), "no snapshot yet");
        topics.record_snapshot();
        assert!(topics.freshness().starts_with("updated "));
        assert_eq!(topics.snapshots_received, 1);
    }
}
