//! Background tasks for the Chie server.

use crate::session::SessionStore;
use tokio::time::{sleep, Duration};

/// Starts the session pruning task.
///
/// Runs indefinitely, sweeping expired sessions every `interval_seconds`.
/// Expired sessions are already rejected on lookup; the sweep only reclaims
/// memory held by sessions nobody presents again.
pub async fn start_session_prune_task(sessions: SessionStore, interval_seconds: u64) {
    if interval_seconds == 0 {
        tracing::warn!("session pruning task disabled (interval=0)");
        return;
    }

    let interval = Duration::from_secs(interval_seconds);
    tracing::info!(interval_seconds, "starting session pruning task");

    loop {
        sleep(interval).await;

        let pruned = sessions.prune_expired();
        if pruned > 0 {
            tracing::info!(count = pruned, remaining = sessions.len(), "pruned expired sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chie_board::User;
    use chie_types::LdapId;

    fn user() -> User {
        User {
            ldap_id: LdapId::parse("12345678").unwrap(),
            name: "Tester".to_string(),
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn prune_task_sweeps_expired_sessions() {
        let sessions = SessionStore::new(0);
        sessions.create(user());
        sessions.create(user());

        let handle = tokio::spawn(start_session_prune_task(sessions.clone(), 5));
        sleep(Duration::from_secs(6)).await;

        assert!(sessions.is_empty());
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn prune_task_keeps_live_sessions() {
        let sessions = SessionStore::new(3600);
        sessions.create(user());

        let handle = tokio::spawn(start_session_prune_task(sessions.clone(), 5));
        sleep(Duration::from_secs(11)).await;

        assert_eq!(sessions.len(), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn zero_interval_disables_task() {
        let sessions = SessionStore::new(0);
        sessions.create(user());

        // Returns immediately instead of looping.
        start_session_prune_task(sessions.clone(), 0).await;
        assert_eq!(sessions.len(), 1);
    }
}
