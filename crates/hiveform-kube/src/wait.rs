//! Bounded polling after apply and delete
//!
//! Both waits poll with a fixed interval and a hard budget. A wait never
//! sleeps past its budget, and a cancelled token ends it at the next
//! suspension point.

use hiveform_core::{ResourceIdentity, WaitForDelete, WaitForUpsert};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ObjectApi;
use crate::error::{KubeError, Result};

/// Progress of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteState {
    /// DELETE accepted, no confirmation yet
    Requested,
    /// Waiting for the object to disappear
    Polling,
    /// A read reported the object as gone
    ConfirmedAbsent,
    /// The budget ran out with the object still present
    TimedOut,
}

impl fmt::Display for DeleteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Requested => "requested",
            Self::Polling => "polling",
            Self::ConfirmedAbsent => "confirmed absent",
            Self::TimedOut => "timed out",
        };
        f.write_str(s)
    }
}

/// Result of a delete and its wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub state: DeleteState,
    /// Existence checks issued after the DELETE
    pub polls: usize,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

/// Sleep for `duration` unless the token is cancelled first
async fn sleep_or_cancel(
    duration: Duration,
    cancel: &CancellationToken,
    identity: &ResourceIdentity,
) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(KubeError::Cancelled { identity: identity.clone() }),
        _ = sleep(duration) => Ok(()),
    }
}

fn check_cancelled(cancel: &CancellationToken, identity: &ResourceIdentity) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(KubeError::Cancelled {
            identity: identity.clone(),
        });
    }
    Ok(())
}

/// Poll until the object is gone or the budget measured from `started` runs out
///
/// A zero timeout issues exactly one read. A not-found read ends the wait,
/// any other read error aborts it.
pub async fn wait_for_absence<A: ObjectApi + ?Sized>(
    api: &A,
    identity: &ResourceIdentity,
    wait: &WaitForDelete,
    started: Instant,
    cancel: &CancellationToken,
) -> Result<DeleteOutcome> {
    let mut state = DeleteState::Requested;
    let mut polls = 0;

    if wait.timeout.is_zero() {
        polls += 1;
        if !api.exists(identity).await? {
            state = DeleteState::ConfirmedAbsent;
        }
        debug!(%identity, %state, "delete wait skipped");
        return Ok(DeleteOutcome {
            state,
            polls,
            elapsed: started.elapsed(),
        });
    }

    loop {
        check_cancelled(cancel, identity)?;

        let elapsed = started.elapsed();
        if elapsed >= wait.timeout {
            warn!(%identity, ?elapsed, polls, "object still present after delete timeout");
            return Ok(DeleteOutcome {
                state: DeleteState::TimedOut,
                polls,
                elapsed,
            });
        }

        if state == DeleteState::Requested {
            state = DeleteState::Polling;
            info!(%identity, timeout = ?wait.timeout, "waiting for deletion");
        }

        polls += 1;
        if !api.exists(identity).await? {
            let elapsed = started.elapsed();
            info!(%identity, ?elapsed, polls, "deletion confirmed");
            return Ok(DeleteOutcome {
                state: DeleteState::ConfirmedAbsent,
                polls,
                elapsed,
            });
        }

        let remaining = wait.timeout.saturating_sub(started.elapsed());
        sleep_or_cancel(wait.poll_interval.min(remaining), cancel, identity).await?;
    }
}

/// Poll until the condition holds on the live object
///
/// Returns the last object read, if any. A zero timeout checks once and
/// never fails. A missing object keeps the wait going since it may not be
/// visible yet.
pub async fn wait_for_condition<A: ObjectApi + ?Sized>(
    api: &A,
    identity: &ResourceIdentity,
    condition: &WaitForUpsert,
    cancel: &CancellationToken,
) -> Result<Option<Value>> {
    let path = condition.path()?;
    let expected = condition.value.as_deref();
    let started = Instant::now();
    let mut last = None;

    loop {
        check_cancelled(cancel, identity)?;

        match api.get(identity).await {
            Ok(object) => {
                if path.matches(&object, expected) {
                    debug!(%identity, path = path.expression(), "condition met");
                    return Ok(Some(object));
                }
                last = Some(object);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let elapsed = started.elapsed();
        if condition.timeout.is_zero() {
            debug!(%identity, path = path.expression(), "condition not met, not waiting");
            return Ok(last);
        }
        if elapsed >= condition.timeout {
            warn!(%identity, path = path.expression(), ?elapsed, "condition not met before timeout");
            return Err(KubeError::Timeout {
                identity: identity.clone(),
                waiting_for: match expected {
                    Some(value) => format!("{} to equal {value:?}", path.expression()),
                    None => format!("{} to be set", path.expression()),
                },
                elapsed,
            });
        }

        let remaining = condition.timeout.saturating_sub(elapsed);
        sleep_or_cancel(condition.poll_interval.min(remaining), cancel, identity).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{DeleteBehavior, MockObjectApi};
    use hiveform_core::HiveKind;
    use serde_json::json;

    fn identity() -> ResourceIdentity {
        ResourceIdentity::new(HiveKind::DnsZone, Some("ns"), "zone").unwrap()
    }

    #[test]
    fn test_state_display() {
        assert_eq!(DeleteState::TimedOut.to_string(), "timed out");
        assert_eq!(DeleteState::ConfirmedAbsent.to_string(), "confirmed absent");
    }

    #[tokio::test(start_paused = true)]
    async fn test_absence_confirmed_after_finalizer() {
        let api = MockObjectApi::new().with_delete_behavior(DeleteBehavior::AfterGets(2));
        api.insert(&identity(), json!({}), "hiveform");
        api.delete(&identity(), None).await.unwrap();

        let wait = WaitForDelete::new(Duration::from_secs(30), Duration::from_secs(5));
        let outcome = wait_for_absence(
            &api,
            &identity(),
            &wait,
            Instant::now(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.state, DeleteState::ConfirmedAbsent);
        assert_eq!(outcome.polls, 3);
        assert_eq!(outcome.elapsed, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_is_clamped_to_budget() {
        let api = MockObjectApi::new().with_delete_behavior(DeleteBehavior::Never);
        api.insert(&identity(), json!({}), "hiveform");
        api.delete(&identity(), None).await.unwrap();

        let wait = WaitForDelete::new(Duration::from_secs(3), Duration::from_secs(5));
        let outcome = wait_for_absence(
            &api,
            &identity(),
            &wait,
            Instant::now(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.state, DeleteState::TimedOut);
        assert_eq!(outcome.polls, 1);
        assert_eq!(outcome.elapsed, Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_condition_zero_timeout_never_fails() {
        let api = MockObjectApi::new();
        api.insert(&identity(), json!({}), "hiveform");

        let condition = WaitForUpsert::new(".status.ready").with_timing(Duration::ZERO, Duration::ZERO);
        let last = wait_for_condition(&api, &identity(), &condition, &CancellationToken::new())
            .await
            .unwrap();

        assert!(last.is_some());
        assert_eq!(api.operation_counts().gets, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_condition_times_out() {
        let api = MockObjectApi::new();
        api.insert(&identity(), json!({"status": {"phase": "Pending"}}), "hiveform");

        let condition = WaitForUpsert::new("{.status.phase}")
            .with_value("Ready")
            .with_timing(Duration::from_secs(4), Duration::from_secs(2));
        let err = wait_for_condition(&api, &identity(), &condition, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(err.to_string().contains("\"Ready\""));
        assert_eq!(api.operation_counts().gets, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_poll() {
        let api = MockObjectApi::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let condition = WaitForUpsert::new(".status");
        let err = wait_for_condition(&api, &identity(), &condition, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::Cancelled { .. }));
        assert_eq!(api.operation_counts().gets, 0);
    }
}
