use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::client::TelemetryClient;
use super::error::TelemetryError;
use super::types::TelemetrySample;
use crate::position::PositionProvider;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Polls the telemetry endpoint at a fixed interval and publishes the
/// latest sample on a watch channel. A failed poll keeps the previous
/// sample in place; only the sampler ever writes the slot.
pub struct TelemetrySampler {
    client: TelemetryClient,
    interval: Duration,
    latest_tx: watch::Sender<Option<TelemetrySample>>,
    worker: Option<WorkerHandle>,
}

impl TelemetrySampler {
    pub fn new(client: TelemetryClient, interval: Duration) -> Self {
        let (latest_tx, _) = watch::channel(None);
        Self {
            client,
            interval,
            latest_tx,
            worker: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<TelemetrySample>> {
        self.latest_tx.subscribe()
    }

    pub fn latest(&self) -> Option<TelemetrySample> {
        self.latest_tx.borrow().clone()
    }

    /// Starts the polling loop. At most one loop runs per sampler;
    /// starting again without stopping fails instead of doubling polls.
    pub fn start(&mut self, position: Arc<dyn PositionProvider>) -> Result<(), TelemetryError> {
        if self.worker.is_some() {
            return Err(TelemetryError::AlreadyRunning);
        }

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let latest_tx = self.latest_tx.clone();
        let client = self.client.clone();
        let interval = self.interval;

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = &mut stop_rx => return,
                }

                // A stop while the fetch is outstanding discards its
                // result; a late response must not land after cancellation.
                let result = tokio::select! {
                    result = poll_once(&client, position.as_ref()) => result,
                    _ = &mut stop_rx => return,
                };

                match result {
                    Ok(sample) => {
                        log::debug!(
                            "telemetry sample: satellite={} azimuth={} elevation={} signal={}",
                            sample.satellite,
                            sample.azimuth_deg,
                            sample.elevation_deg,
                            sample.signal
                        );
                        let _ = latest_tx.send(Some(sample));
                    }
                    Err(e) => {
                        log::warn!("telemetry poll failed, keeping previous sample: {}", e);
                    }
                }
            }
        });

        self.worker = Some(WorkerHandle { stop_tx, join });
        Ok(())
    }

    /// Cancels future polls. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.await;
        }
    }
}

async fn poll_once(
    client: &TelemetryClient,
    position: &dyn PositionProvider,
) -> Result<TelemetrySample, TelemetryError> {
    let coordinates = position.current()?;
    client.fetch(coordinates).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{Coordinates, SharedPosition};
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn serve(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn fixed_position() -> Arc<SharedPosition> {
        Arc::new(SharedPosition::new(Some(Coordinates {
            latitude: 10.0,
            longitude: -14.0,
        })))
    }

    fn sampler_for(addr: SocketAddr) -> TelemetrySampler {
        let client = TelemetryClient::new(format!("http://{}/api/telemetry", addr));
        TelemetrySampler::new(client, Duration::from_millis(20))
    }

    /// Records every published azimuth off a subscription.
    fn record_published(
        mut rx: watch::Receiver<Option<TelemetrySample>>,
    ) -> Arc<std::sync::Mutex<Vec<f64>>> {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                if let Some(sample) = rx.borrow_and_update().clone() {
                    sink.lock().unwrap().push(sample.azimuth_deg);
                }
            }
        });
        seen
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition never became true");
    }

    async fn next_sample(
        rx: &mut watch::Receiver<Option<TelemetrySample>>,
    ) -> TelemetrySample {
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("timed out waiting for a sample")
            .expect("sampler dropped");
        rx.borrow_and_update().clone().expect("empty slot")
    }

    #[tokio::test]
    async fn failed_poll_retains_previous_sample() {
        // Polls 1 and 2 succeed, poll 3 returns a server error, poll 4
        // onwards succeeds again. The failure must never publish.
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/api/telemetry",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let hit = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    assert!(params.contains_key("lat") && params.contains_key("lon"));
                    if hit == 3 {
                        return Err(StatusCode::INTERNAL_SERVER_ERROR);
                    }
                    Ok(Json(json!({
                        "azimuth": 100.0 + 10.0 * hit as f64,
                        "elevation": 47.0,
                        "signal": "moderate",
                        "satellite": "Starlink-3428"
                    })))
                }
            }),
        );
        let addr = serve(router).await;

        let mut sampler = sampler_for(addr);
        let seen = record_published(sampler.subscribe());
        sampler.start(fixed_position()).unwrap();

        // Polling continues past the failure.
        wait_until(|| seen.lock().unwrap().iter().any(|a| *a >= 140.0)).await;
        sampler.stop().await;

        let seen = seen.lock().unwrap().clone();
        // Poll 3 (would publish 130) was swallowed, nothing was reset,
        // and the published azimuths only ever moved forward.
        assert!(!seen.is_empty());
        assert!(!seen.contains(&130.0));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn malformed_payload_is_a_transient_failure() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/api/telemetry",
            get(move || {
                let hit = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if hit == 2 {
                        // Missing elevation
                        Json(json!({ "azimuth": 222.0 }))
                    } else {
                        Json(json!({ "azimuth": 10.0 * hit as f64, "elevation": 47.0 }))
                    }
                }
            }),
        );
        let addr = serve(router).await;

        let mut sampler = sampler_for(addr);
        let seen = record_published(sampler.subscribe());
        sampler.start(fixed_position()).unwrap();

        wait_until(|| seen.lock().unwrap().iter().any(|a| *a >= 30.0)).await;
        sampler.stop().await;

        // The malformed poll never made it into the latest slot.
        let seen = seen.lock().unwrap().clone();
        assert!(!seen.contains(&222.0));
    }

    #[tokio::test]
    async fn polls_resume_once_a_position_fix_arrives() {
        let router = Router::new().route(
            "/api/telemetry",
            get(|| async { Json(json!({ "azimuth": 42.0, "elevation": 47.0 })) }),
        );
        let addr = serve(router).await;

        let position = Arc::new(SharedPosition::default());
        let mut sampler = sampler_for(addr);
        let mut rx = sampler.subscribe();
        sampler.start(position.clone()).unwrap();

        // No fix yet: a few intervals pass without a publish.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(sampler.latest().is_none());

        position.update(Coordinates {
            latitude: 1.0,
            longitude: 2.0,
        });
        assert_eq!(next_sample(&mut rx).await.azimuth_deg, 42.0);

        sampler.stop().await;
    }

    #[tokio::test]
    async fn double_start_is_rejected_and_stop_is_idempotent() {
        let router = Router::new().route(
            "/api/telemetry",
            get(|| async { Json(json!({ "azimuth": 1.0, "elevation": 47.0 })) }),
        );
        let addr = serve(router).await;

        let mut sampler = sampler_for(addr);
        sampler.start(fixed_position()).unwrap();
        assert!(matches!(
            sampler.start(fixed_position()),
            Err(TelemetryError::AlreadyRunning)
        ));

        sampler.stop().await;
        sampler.stop().await;

        // A stopped sampler can be started again.
        sampler.start(fixed_position()).unwrap();
        sampler.stop().await;
    }
}
