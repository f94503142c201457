use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use benchttp_http::{ClientOptions, RequestTemplate};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, trace, warn};

use super::config::RunConfig;
use super::error::{Error, Result};
use super::gate::{Deadline, LaunchGate};
use super::pool::{ClientPool, PooledClient};
use super::report::Report;
use super::stats::RunStats;

/// Launches exactly `requests` calls and returns once all of them have completed.
pub async fn run_by_count(
    template: RequestTemplate,
    opts: &ClientOptions,
    concurrency: usize,
    requests: u64,
) -> Result<Report> {
    run(template, opts, RunConfig::by_count(concurrency, requests)).await
}

/// Launches calls until `duration` has elapsed, then waits for the calls still in flight.
///
/// Calls that complete after the deadline are not counted.
pub async fn run_by_duration(
    template: RequestTemplate,
    opts: &ClientOptions,
    concurrency: usize,
    duration: Duration,
) -> Result<Report> {
    run(template, opts, RunConfig::by_duration(concurrency, duration)).await
}

/// Runs one benchmark.
///
/// At most `cfg.concurrency` calls are in flight at any time: every call owns one handle of a
/// [`ClientPool`] of that size, and the dispatch loop waits on the pool before each launch.
/// The report is built only after every launched call has been joined.
pub async fn run(template: RequestTemplate, opts: &ClientOptions, cfg: RunConfig) -> Result<Report> {
    cfg.validate()?;

    let mut pool = ClientPool::new(cfg.concurrency, opts)?;
    let template = Arc::new(template);
    let stats = Arc::new(RunStats::default());

    debug!(
        method = %template.method(),
        url = %template.url(),
        concurrency = cfg.concurrency,
        stop = ?cfg.stop,
        "run started"
    );

    let started = Instant::now();
    let gate = LaunchGate::new(cfg.stop, started);

    let dispatched = dispatch(&mut pool, gate, |client, deadline| {
        send_one(client, template.clone(), stats.clone(), deadline)
    })
    .await?;

    let elapsed = dispatched.ended.saturating_duration_since(started);
    let report = stats.summarize(elapsed);

    debug!(
        launched = dispatched.launched,
        requests_total = report.requests_total,
        errors_total = report.errors_total,
        late_arrivals_total = report.late_arrivals_total,
        peak_in_flight = pool.peak_checked_out(),
        elapsed = ?elapsed,
        "run finished"
    );

    Ok(report)
}

#[derive(Debug)]
struct Dispatched {
    launched: u64,
    /// When the last call settled, or when dispatching stopped if that was later.
    ended: Instant,
}

/// The launch loop plus the join barrier.
///
/// `call` builds the task for one launch; the task yields the instant its call settled.
/// A failed task stops further launches; the calls already in flight are still joined.
async fn dispatch<F, Fut>(
    pool: &mut ClientPool,
    mut gate: LaunchGate,
    mut call: F,
) -> Result<Dispatched>
where
    F: FnMut(PooledClient, Option<Deadline>) -> Fut,
    Fut: Future<Output = Instant> + Send + 'static,
{
    let mut in_flight: JoinSet<Instant> = JoinSet::new();
    let mut joined = Joined::default();

    while !gate.is_stopped() && joined.failure.is_none() {
        let Some(client) = next_client(pool, gate.deadline()).await? else {
            break;
        };

        gate.record_launch();
        in_flight.spawn(call(client, gate.deadline()));

        // Finished tasks stay in the set until joined; reap them so it stays bounded by the pool.
        while let Some(res) = in_flight.try_join_next() {
            joined.reap(res);
        }
    }

    let dispatch_ended = Instant::now();

    while let Some(res) = in_flight.join_next().await {
        joined.reap(res);
    }

    if let Some(err) = joined.failure {
        return Err(Error::Join(err));
    }

    Ok(Dispatched {
        launched: gate.launched(),
        ended: joined
            .last_settled
            .map_or(dispatch_ended, |settled| settled.max(dispatch_ended)),
    })
}

#[derive(Debug, Default)]
struct Joined {
    last_settled: Option<Instant>,
    failure: Option<JoinError>,
}

impl Joined {
    fn reap(&mut self, res: std::result::Result<Instant, JoinError>) {
        match res {
            Ok(settled) => {
                self.last_settled = Some(self.last_settled.map_or(settled, |t| t.max(settled)));
            }
            Err(err) => {
                warn!(error = %err, "request task failed; no further calls will be launched");
                self.failure.get_or_insert(err);
            }
        }
    }
}

/// Waits for an idle handle, giving up once the deadline passes.
async fn next_client(
    pool: &mut ClientPool,
    deadline: Option<Deadline>,
) -> Result<Option<PooledClient>> {
    let Some(deadline) = deadline else {
        return pool.acquire().await.map(Some);
    };

    let client = tokio::select! {
        client = pool.acquire() => client?,
        () = tokio::time::sleep(deadline.remaining()) => return Ok(None),
    };

    // The wait for a handle can outlast the deadline; such a call could only be discarded.
    if deadline.is_over() {
        client.release();
        return Ok(None);
    }

    Ok(Some(client))
}

async fn send_one(
    mut client: PooledClient,
    template: Arc<RequestTemplate>,
    stats: Arc<RunStats>,
    deadline: Option<Deadline>,
) -> Instant {
    let mut budget_end = None;
    if let Some(deadline) = deadline {
        let remaining = deadline.remaining();
        if remaining.is_zero() {
            // Launched in time but first polled after the deadline.
            client.release();
            stats.record_late_arrival();
            return Instant::now();
        }
        client.set_timeout(Some(remaining));
        budget_end = Instant::now().checked_add(remaining);
    }

    let outcome = client.send(&template).await;
    let settled = settled_at(Instant::now(), budget_end);

    // Give the handle back before touching the stats; the dispatcher may be waiting for it.
    client.release();

    if deadline.is_some_and(|d| d.is_over()) {
        trace!(ok = outcome.is_ok(), "discarding late arrival");
        stats.record_late_arrival();
        return settled;
    }

    match outcome {
        Ok(res) => {
            trace!(status = res.status, body_len = res.body_len, "response");
            stats.record_success(res.status);
        }
        Err(err) => {
            let description = err.description();
            trace!(kind = %err.transport_error_kind(), error = %description, "request failed");
            stats.record_failure(&description);
        }
    }

    settled
}

/// A call never outlives its own time budget, even when its task is woken late.
fn settled_at(returned_at: Instant, budget_end: Option<Instant>) -> Instant {
    budget_end.map_or(returned_at, |end| returned_at.min(end))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::runner::config::StopCondition;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn pool(size: usize) -> ClientPool {
        ClientPool::new(size, &ClientOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn panicking_task_stops_launches_and_fails_the_run() {
        let mut pool = pool(1);
        let gate = LaunchGate::new(StopCondition::Requests(100), Instant::now());
        let calls = Arc::new(AtomicU64::new(0));

        let res = dispatch(&mut pool, gate, |client, _| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let _client = client;
                if n == 2 {
                    panic!("request task blew up");
                }
                Instant::now()
            }
        })
        .await;

        assert!(matches!(res, Err(Error::Join(ref err)) if err.is_panic()));
        let calls = calls.load(Ordering::SeqCst);
        assert!((3..10).contains(&calls), "launches continued after a panic: {calls}");
        assert_eq!(pool.checked_out(), 0);
    }

    #[tokio::test]
    async fn waiting_for_a_handle_ends_at_the_deadline() {
        let mut pool = pool(1);
        let held = pool.acquire().await.unwrap();

        let deadline = Deadline::new(Instant::now(), Duration::from_millis(50));
        let started = Instant::now();
        let next = next_client(&mut pool, Some(deadline)).await.unwrap();

        assert!(next.is_none());
        assert!(deadline.is_over());
        assert!(started.elapsed() < Duration::from_secs(1));
        drop(held);
    }

    #[tokio::test]
    async fn handle_acquired_after_the_deadline_is_released() {
        let mut pool = pool(1);
        let deadline = Deadline::new(Instant::now(), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));

        let next = next_client(&mut pool, Some(deadline)).await.unwrap();
        assert!(next.is_none());
        assert_eq!(pool.checked_out(), 0);

        // Without a deadline the same pool still hands out its handle.
        assert!(next_client(&mut pool, None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn run_ends_when_the_last_call_settles() {
        let mut pool = pool(4);
        let started = Instant::now();
        let d = Duration::from_millis(100);
        let gate = LaunchGate::new(StopCondition::Duration(d), started);

        // Each task lingers well past its budget, as a call torn down after its timeout would.
        let dispatched = dispatch(&mut pool, gate, |client, deadline| async move {
            let _client = client;
            let end = deadline.map(|d| Instant::now() + d.remaining());
            tokio::time::sleep(Duration::from_millis(400)).await;
            settled_at(Instant::now(), end)
        })
        .await
        .unwrap();

        let elapsed = dispatched.ended.duration_since(started);
        assert_eq!(dispatched.launched, 4);
        assert!(elapsed >= d, "ended before the deadline: {elapsed:?}");
        assert!(
            elapsed < Duration::from_millis(300),
            "task teardown counted as run time: {elapsed:?}"
        );
        assert!(started.elapsed() >= Duration::from_millis(400), "tasks were not joined");
    }

    #[test]
    fn settled_instant_is_capped_by_the_call_budget() {
        let now = Instant::now();
        let end = now + Duration::from_millis(10);
        let late = now + Duration::from_millis(250);

        assert_eq!(settled_at(late, Some(end)), end);
        assert_eq!(settled_at(now, Some(end)), now);
        assert_eq!(settled_at(late, None), late);
    }
}
