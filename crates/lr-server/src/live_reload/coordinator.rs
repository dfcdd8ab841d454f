//! Reload coordinator.
//!
//! Consumes watcher events and broadcasts the reload sentinel for each one.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::registry::{BroadcastReport, ConnectionRegistry, ReloadMessage};
use super::watcher::ChangeEvent;

/// Turns every [`ChangeEvent`] into exactly one reload broadcast.
///
/// No coalescing and no retries: per-connection failures are already isolated
/// by the registry and are only logged.
pub struct ReloadCoordinator {
    registry: Arc<ConnectionRegistry>,
}

impl ReloadCoordinator {
    /// Create a coordinator broadcasting through `registry`.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Handle one change event.
    pub fn handle(&self, event: &ChangeEvent) -> BroadcastReport {
        let report = self.registry.broadcast(ReloadMessage::Reload);

        tracing::info!(
            path = %event.path.display(),
            kind = ?event.kind,
            clients = report.delivered,
            "File changed, reloading clients"
        );
        if report.failed > 0 {
            tracing::debug!(failed = report.failed, "Some clients did not accept the reload");
        }

        report
    }

    /// Process events until the channel closes.
    pub async fn run(self, mut events: mpsc::Receiver<ChangeEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(&event);
        }
        tracing::debug!("Change event channel closed, coordinator stopping");
    }

    /// Run on a dedicated task.
    #[must_use]
    pub fn spawn(self, events: mpsc::Receiver<ChangeEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live_reload::watcher::ChangeKind;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn modified(path: &str) -> ChangeEvent {
        ChangeEvent {
            path: PathBuf::from(path),
            kind: ChangeKind::Modified,
        }
    }

    fn drain(conn: &mut crate::live_reload::Connection) -> Vec<ReloadMessage> {
        std::iter::from_fn(|| conn.try_recv()).collect()
    }

    #[tokio::test]
    async fn test_two_open_of_three_receive_exactly_one_reload() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut a = registry.accept();
        let mut b = registry.accept();
        let mut c = registry.accept();
        b.close();

        let (tx, rx) = mpsc::channel(8);
        let task = ReloadCoordinator::new(Arc::clone(&registry)).spawn(rx);
        tx.send(modified("/site/index.html")).await.unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(drain(&mut a), vec![ReloadMessage::Reload]);
        assert_eq!(drain(&mut b), vec![]);
        assert_eq!(drain(&mut c), vec![ReloadMessage::Reload]);
    }

    #[tokio::test]
    async fn test_each_event_broadcasts_once() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut conn = registry.accept();

        let (tx, rx) = mpsc::channel(8);
        let task = ReloadCoordinator::new(Arc::clone(&registry)).spawn(rx);
        tx.send(modified("/site/app.js")).await.unwrap();
        tx.send(modified("/site/app.js")).await.unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(
            drain(&mut conn),
            vec![ReloadMessage::Reload, ReloadMessage::Reload]
        );
    }

    #[test]
    fn test_handle_with_no_clients() {
        let registry = Arc::new(ConnectionRegistry::new());
        let coordinator = ReloadCoordinator::new(registry);

        let report = coordinator.handle(&modified("/site/index.html"));

        assert_eq!(report, BroadcastReport::default());
    }

    #[test]
    fn test_handle_reports_delivery() {
        let registry = Arc::new(ConnectionRegistry::new());
        let _a = registry.accept();
        let _b = registry.accept();
        let coordinator = ReloadCoordinator::new(Arc::clone(&registry));

        let report = coordinator.handle(&modified("/site/index.html"));

        assert_eq!(report.delivered, 2);
    }
}
