use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context as _;
use benchttp_core::{ClientOptions, RequestTemplate, run_by_count};
use benchttp_testserver::TestServer;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ten_requests_ten_clients_all_ok() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let template = RequestTemplate::get(&server.urls().hello)?;

    let report = run_by_count(template, &ClientOptions::default(), 10, 10).await?;

    anyhow::ensure!(report.requests_total == 10, "report: {report:?}");
    anyhow::ensure!(
        report.status_counts == BTreeMap::from([(200, 10)]),
        "report: {report:?}"
    );
    anyhow::ensure!(report.error_counts.is_empty(), "report: {report:?}");
    anyhow::ensure!(report.late_arrivals_total == 0, "report: {report:?}");
    anyhow::ensure!(server.stats().requests_total() == 10);

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn high_concurrency_counts_are_exact() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let template = RequestTemplate::get(&server.urls().status(201))?;

    let report = run_by_count(template, &ClientOptions::default(), 64, 2_000).await?;

    anyhow::ensure!(report.requests_total == 2_000, "report: {report:?}");
    anyhow::ensure!(
        report.status_counts == BTreeMap::from([(201, 2_000)]),
        "report: {report:?}"
    );
    anyhow::ensure!(report.is_consistent(), "report: {report:?}");
    anyhow::ensure!(
        server.stats().requests_total() == 2_000,
        "server saw {} requests",
        server.stats().requests_total()
    );

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_requests_never_exceed_concurrency() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let template = RequestTemplate::get(&server.urls().slow)?;

    // 40 calls of ~50ms each through 8 handles: the server sees at most 8 at once.
    let report = run_by_count(template, &ClientOptions::default(), 8, 40).await?;

    anyhow::ensure!(report.requests_total == 40, "report: {report:?}");
    let peak = server.stats().peak_in_flight();
    anyhow::ensure!(peak <= 8, "server saw {peak} concurrent requests");
    anyhow::ensure!(peak >= 2, "requests were not dispatched concurrently (peak {peak})");

    // Five sequential waves of 50ms, so well under the serial 2s.
    anyhow::ensure!(
        report.elapsed < Duration::from_secs(2),
        "elapsed {:?}",
        report.elapsed
    );

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn returns_only_after_every_call_completed() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let template = RequestTemplate::get(&server.urls().sleep(200))?;

    let report = run_by_count(template, &ClientOptions::default(), 5, 5).await?;

    anyhow::ensure!(report.requests_total == 5, "report: {report:?}");
    anyhow::ensure!(
        report.elapsed >= Duration::from_millis(200),
        "returned before in-flight calls finished: {:?}",
        report.elapsed
    );

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn non_2xx_statuses_are_responses_not_errors() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let report = run_by_count(
        RequestTemplate::get(&server.urls().status(500))?,
        &ClientOptions::default(),
        2,
        6,
    )
    .await?;
    anyhow::ensure!(report.errors_total == 0, "report: {report:?}");
    anyhow::ensure!(
        report.status_counts == BTreeMap::from([(500, 6)]),
        "report: {report:?}"
    );

    let report = run_by_count(
        RequestTemplate::get(&server.urls().redirect)?,
        &ClientOptions::default(),
        2,
        4,
    )
    .await?;
    anyhow::ensure!(
        report.status_counts == BTreeMap::from([(302, 4)]),
        "redirects must not be followed: {report:?}"
    );

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn head_requests_reach_the_server() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let template = RequestTemplate::head(&server.urls().hello)?;

    let report = run_by_count(template, &ClientOptions::default(), 3, 9).await?;

    anyhow::ensure!(report.status_counts.get(&200) == Some(&9), "report: {report:?}");
    anyhow::ensure!(server.stats().head_requests_total() == 9);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn zero_concurrency_is_rejected_before_any_call() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let template = RequestTemplate::get(&server.urls().hello)?;

    let res = run_by_count(template, &ClientOptions::default(), 0, 10).await;

    anyhow::ensure!(
        matches!(res, Err(benchttp_core::Error::InvalidConcurrency)),
        "unexpected result: {res:?}"
    );
    anyhow::ensure!(server.stats().requests_total() == 0);

    server.shutdown().await;
    Ok(())
}
