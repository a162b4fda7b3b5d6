//! Background expiry watch.
//!
//! While a session is authenticated, a task re-decodes the token on a fixed
//! interval and asks for a logout once the token has expired or is about to
//! expire. This catches expiry between requests without waiting for a
//! server rejection. The task stops as soon as its [`CancellationToken`] is
//! cancelled, the session loses its token, or it has requested a logout.

use std::sync::Arc;
use std::time::Duration;

use portal_core::clock::Clock;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::funnel::{LogoutHandle, LogoutSource};
use crate::state::{Session, SESSION_EXPIRED_REASON, SESSION_INVALID_REASON};
use crate::token;

/// Everything the watch task needs; it holds no reference to the manager.
pub(crate) struct ExpiryWatch {
    pub session: watch::Receiver<Session>,
    pub clock: Arc<dyn Clock>,
    pub interval: Duration,
    pub lookahead: chrono::Duration,
    pub logout: LogoutHandle,
    pub cancel: CancellationToken,
}

impl ExpiryWatch {
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(
            interval_ms = self.interval.as_millis() as u64,
            lookahead_secs = self.lookahead.num_seconds(),
            "Expiry watch started",
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Expiry watch cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            // The session may have ended between the tick and now.
            if self.cancel.is_cancelled() {
                return;
            }

            let Some(current) = self.session.borrow().token().map(str::to_owned) else {
                tracing::debug!("Session has no token, expiry watch exiting");
                return;
            };

            match token::check(&current, self.clock.now(), self.lookahead) {
                Ok(health) if !health.needs_logout() => continue,
                Ok(health) => {
                    tracing::info!(?health, "Token expired or about to expire");
                    self.logout.force_logout_for(
                        LogoutSource::ExpiryWatch,
                        SESSION_EXPIRED_REASON,
                        current,
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Current token can no longer be decoded");
                    self.logout.force_logout_for(
                        LogoutSource::ExpiryWatch,
                        SESSION_INVALID_REASON,
                        current,
                    );
                    return;
                }
            }
        }
    }
}
