mod feedback;

pub use feedback::{CommandNotifier, HapticNotifier, LogNotifier};

use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex as StdMutex};
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use utoipa::ToSchema;

use crate::align::{
    normalize_deg, AlignmentEvent, AlignmentMachine, AlignmentPhase, AlignmentState, Tolerances,
    AZIMUTH_TOLERANCE_MAX_DEG, AZIMUTH_TOLERANCE_MIN_DEG,
};
use crate::logbook::{InstallerLog, LogEntry};
use crate::position::{Coordinates, PositionProvider, SharedPosition};
use crate::telemetry::{TelemetryError, TelemetrySample, TelemetrySampler};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("alignment session already running")]
    AlreadyRunning,
    #[error(
        "azimuth tolerance {0} outside [{min}, {max}]",
        min = AZIMUTH_TOLERANCE_MIN_DEG,
        max = AZIMUTH_TOLERANCE_MAX_DEG
    )]
    ToleranceOutOfRange(f64),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// Snapshot read by presentation collaborators. The session owns the
/// state exclusively; readers never mutate it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AlignmentStatus {
    pub phase: AlignmentPhase,
    pub state: AlignmentState,
    pub heading_deg: Option<f64>,
    pub telemetry: Option<TelemetrySample>,
    pub tolerances: Tolerances,
}

#[derive(Debug)]
struct Shared {
    status: AlignmentStatus,
}

struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Alignment session: fuses the heading feed, the polled telemetry and
/// the tolerance windows into a debounced lock verdict, and dispatches
/// the per-edge side effects (haptic signal, installer log append).
pub struct Aligner {
    shared: Arc<StdMutex<Shared>>,
    tolerances: Arc<StdMutex<Tolerances>>,
    // NaN marks "no heading received yet"; it evaluates to not-aligned.
    heading_tx: watch::Sender<f64>,
    position: SharedPosition,
    logbook: Arc<StdMutex<InstallerLog>>,
    notifier: Arc<dyn HapticNotifier>,
    sampler: TelemetrySampler,
    worker: Option<WorkerHandle>,
}

impl Aligner {
    pub fn new(
        sampler: TelemetrySampler,
        logbook: InstallerLog,
        notifier: Arc<dyn HapticNotifier>,
        tolerances: Tolerances,
        position: SharedPosition,
    ) -> Self {
        let (heading_tx, _) = watch::channel(f64::NAN);
        Self {
            shared: Arc::new(StdMutex::new(Shared {
                status: AlignmentStatus {
                    phase: AlignmentPhase::NotAligned,
                    state: AlignmentState::default(),
                    heading_deg: None,
                    telemetry: None,
                    tolerances,
                },
            })),
            tolerances: Arc::new(StdMutex::new(tolerances)),
            heading_tx,
            position,
            logbook: Arc::new(StdMutex::new(logbook)),
            notifier,
            sampler,
            worker: None,
        }
    }

    pub fn status(&self) -> AlignmentStatus {
        self.shared.lock().unwrap().status.clone()
    }

    pub fn logbook(&self) -> Arc<StdMutex<InstallerLog>> {
        self.logbook.clone()
    }

    /// Feeds one orientation sample. Values are normalized into
    /// `[0, 360)`; only the latest heading matters.
    pub fn push_heading(&self, heading_deg: f64) {
        if !heading_deg.is_finite() {
            log::warn!("ignoring non-finite heading sample");
            return;
        }
        let _ = self.heading_tx.send(normalize_deg(heading_deg));
    }

    pub fn push_position(&self, coordinates: Coordinates) {
        self.position.update(coordinates);
    }

    /// Adjusts the azimuth tolerance window, bounded to the control
    /// range. Takes effect on the next evaluation.
    pub fn set_azimuth_tolerance(&self, tolerance_deg: f64) -> Result<Tolerances, SessionError> {
        if !Tolerances::azimuth_in_range(tolerance_deg) {
            return Err(SessionError::ToleranceOutOfRange(tolerance_deg));
        }
        let mut tolerances = self.tolerances.lock().unwrap();
        tolerances.azimuth_deg = tolerance_deg;
        let updated = *tolerances;
        drop(tolerances);

        self.shared.lock().unwrap().status.tolerances = updated;
        Ok(updated)
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.worker.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        self.sampler
            .start(Arc::new(self.position.clone()) as Arc<dyn PositionProvider>)?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_session_loop(
            self.shared.clone(),
            self.tolerances.clone(),
            self.logbook.clone(),
            self.notifier.clone(),
            self.position.clone(),
            self.heading_tx.subscribe(),
            self.sampler.subscribe(),
            stop_rx,
        ));

        self.worker = Some(WorkerHandle { stop_tx, join });
        log::info!("alignment session started");
        Ok(())
    }

    /// Stops the evaluation loop and the telemetry sampler. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.await;
        }
        self.sampler.stop().await;
        log::info!("alignment session stopped");
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_session_loop(
    shared: Arc<StdMutex<Shared>>,
    tolerances: Arc<StdMutex<Tolerances>>,
    logbook: Arc<StdMutex<InstallerLog>>,
    notifier: Arc<dyn HapticNotifier>,
    position: SharedPosition,
    mut heading_rx: watch::Receiver<f64>,
    mut telemetry_rx: watch::Receiver<Option<TelemetrySample>>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut machine = AlignmentMachine::new();

    loop {
        tokio::select! {
            _ = &mut stop_rx => return,
            changed = heading_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            changed = telemetry_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }

        let heading_deg = *heading_rx.borrow_and_update();
        let sample = telemetry_rx.borrow_and_update().clone();
        let tol = *tolerances.lock().unwrap();

        let event = match &sample {
            Some(s) => machine.evaluate(heading_deg, s.azimuth_deg, s.elevation_deg, &tol),
            // No telemetry yet: evaluate against nothing, stays not-aligned.
            None => machine.evaluate(heading_deg, f64::NAN, f64::NAN, &tol),
        };

        // Side effects run before the snapshot is published, so a reader
        // that observes the new state also observes their consequences.
        match event {
            Some(AlignmentEvent::LockAcquired) => {
                log::info!("alignment lock acquired");
                notifier.notify_lock();
                if let Some(sample) = &sample {
                    record_lock(&logbook, &position, heading_deg, sample);
                }
            }
            Some(AlignmentEvent::LockLost) => {
                log::info!("alignment lock lost");
            }
            None => {}
        }

        let mut locked = shared.lock().unwrap();
        locked.status.state = machine.state();
        locked.status.phase = machine.phase();
        locked.status.heading_deg = heading_deg.is_finite().then_some(heading_deg);
        locked.status.telemetry = sample;
        locked.status.tolerances = tol;
    }
}

fn record_lock(
    logbook: &Arc<StdMutex<InstallerLog>>,
    position: &SharedPosition,
    heading_deg: f64,
    sample: &TelemetrySample,
) {
    match position.current() {
        Ok(location) => {
            let entry = LogEntry {
                timestamp: Utc::now(),
                location,
                heading_deg,
                azimuth_deg: sample.azimuth_deg,
                satellite: sample.satellite.clone(),
            };
            let length = logbook.lock().unwrap().append(entry);
            log::info!("installer log entry {} recorded", length);
        }
        Err(e) => {
            log::warn!("lock acquired but no position fix, skipping log entry: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logbook::FileStore;
    use crate::telemetry::TelemetryClient;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    struct CountingNotifier(AtomicUsize);

    impl HapticNotifier for CountingNotifier {
        fn notify_lock(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn serve_telemetry(azimuth: f64, elevation: f64) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Router::new().route(
            "/api/telemetry",
            get(move || async move {
                Json(json!({
                    "azimuth": azimuth,
                    "elevation": elevation,
                    "signal": "strong",
                    "satellite": "Starlink-3428"
                }))
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        timeout(Duration::from_secs(5), async {
            while !condition() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition never became true");
    }

    fn build_aligner(
        addr: SocketAddr,
        dir: &tempfile::TempDir,
        notifier: Arc<dyn HapticNotifier>,
    ) -> Aligner {
        let client = TelemetryClient::new(format!("http://{}/api/telemetry", addr));
        let sampler = TelemetrySampler::new(client, Duration::from_millis(20));
        let logbook = InstallerLog::load(Box::new(FileStore::new(dir.path().join("log.json"))));
        let position = SharedPosition::new(Some(Coordinates {
            latitude: 40.4168,
            longitude: -3.7038,
        }));
        Aligner::new(sampler, logbook, notifier, Tolerances::default(), position)
    }

    #[tokio::test]
    async fn lock_cycle_fires_feedback_and_log_once_per_edge() {
        let addr = serve_telemetry(90.0, 47.0).await;
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(CountingNotifier(AtomicUsize::new(0)));
        let mut aligner = build_aligner(addr, &dir, notifier.clone());

        aligner.start().unwrap();
        wait_until(|| aligner.status().telemetry.is_some()).await;

        // Swing onto target: one lock, one haptic, one log entry.
        aligner.push_heading(90.0);
        wait_until(|| aligner.status().state.fully_aligned).await;
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
        assert_eq!(aligner.logbook().lock().unwrap().len(), 1);

        // Holding the lock produces no further feedback.
        aligner.push_heading(91.0);
        aligner.push_heading(89.0);
        wait_until(|| aligner.status().heading_deg == Some(89.0)).await;
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
        assert_eq!(aligner.logbook().lock().unwrap().len(), 1);

        // Swing away: lock lost, no log entry for the falling edge.
        aligner.push_heading(200.0);
        wait_until(|| !aligner.status().state.fully_aligned).await;
        assert_eq!(aligner.logbook().lock().unwrap().len(), 1);

        // Re-acquire: a fresh edge, a second entry.
        aligner.push_heading(88.0);
        wait_until(|| aligner.status().state.fully_aligned).await;
        assert_eq!(notifier.0.load(Ordering::SeqCst), 2);
        assert_eq!(aligner.logbook().lock().unwrap().len(), 2);

        let logbook = aligner.logbook();
        let logbook = logbook.lock().unwrap();
        let entry = &logbook.entries()[1];
        assert_eq!(entry.heading_deg, 88.0);
        assert_eq!(entry.azimuth_deg, 90.0);
        assert_eq!(entry.satellite, "Starlink-3428");
        drop(logbook);

        aligner.stop().await;
    }

    #[tokio::test]
    async fn tolerance_adjustment_applies_on_next_evaluation() {
        let addr = serve_telemetry(90.0, 47.0).await;
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(LogNotifier);
        let mut aligner = build_aligner(addr, &dir, notifier);

        aligner.start().unwrap();
        wait_until(|| aligner.status().telemetry.is_some()).await;

        // 5 degrees off target: inside the default 10 degree window.
        aligner.push_heading(95.0);
        wait_until(|| aligner.status().state.fully_aligned).await;

        // Tighten to 2 degrees: the same heading no longer qualifies.
        aligner.set_azimuth_tolerance(2.0).unwrap();
        aligner.push_heading(95.0);
        wait_until(|| !aligner.status().state.fully_aligned).await;
        assert_eq!(aligner.status().tolerances.azimuth_deg, 2.0);

        aligner.stop().await;
    }

    #[tokio::test]
    async fn tolerance_outside_control_range_is_rejected() {
        let addr = serve_telemetry(90.0, 47.0).await;
        let dir = tempfile::tempdir().unwrap();
        let aligner = build_aligner(addr, &dir, Arc::new(LogNotifier));

        assert!(matches!(
            aligner.set_azimuth_tolerance(1.0),
            Err(SessionError::ToleranceOutOfRange(_))
        ));
        assert!(matches!(
            aligner.set_azimuth_tolerance(31.0),
            Err(SessionError::ToleranceOutOfRange(_))
        ));
        assert!(matches!(
            aligner.set_azimuth_tolerance(f64::NAN),
            Err(SessionError::ToleranceOutOfRange(_))
        ));
        assert_eq!(aligner.status().tolerances.azimuth_deg, 10.0);
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let addr = serve_telemetry(90.0, 47.0).await;
        let dir = tempfile::tempdir().unwrap();
        let mut aligner = build_aligner(addr, &dir, Arc::new(LogNotifier));

        aligner.start().unwrap();
        assert!(matches!(aligner.start(), Err(SessionError::AlreadyRunning)));
        aligner.stop().await;
        aligner.stop().await;
    }

    #[tokio::test]
    async fn missing_position_fix_skips_the_log_entry() {
        let dir = tempfile::tempdir().unwrap();
        let logbook = InstallerLog::load(Box::new(FileStore::new(dir.path().join("log.json"))));
        let logbook = Arc::new(StdMutex::new(logbook));

        let sample = TelemetrySample {
            azimuth_deg: 90.0,
            elevation_deg: 47.0,
            signal: crate::telemetry::SignalLevel::Strong,
            satellite: "Starlink-3428".into(),
            observed_at: Utc::now(),
        };
        record_lock(&logbook, &SharedPosition::default(), 90.0, &sample);
        assert_eq!(logbook.lock().unwrap().len(), 0);

        // A fix restores normal recording.
        let fixed = SharedPosition::new(Some(Coordinates {
            latitude: 40.4168,
            longitude: -3.7038,
        }));
        record_lock(&logbook, &fixed, 90.0, &sample);
        assert_eq!(logbook.lock().unwrap().len(), 1);
    }
}
