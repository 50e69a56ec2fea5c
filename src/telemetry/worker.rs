//! Background fetch thread

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use super::{TelemetryError, TelemetrySource};
use crate::data::Catalog;

#[derive(Debug)]
enum FeedCommand {
    Fetch { request: u64, requested_at_ms: i64 },
    Stop,
}

/// A completed fetch, delivered in request order
#[derive(Debug)]
pub struct FetchOutcome {
    pub request: u64,
    pub requested_at_ms: i64,
    pub result: Result<Catalog, TelemetryError>,
}

/// Runs one telemetry source on its own thread.
///
/// Requests are serviced one at a time in the order they were sent; there
/// is no cancellation of a fetch already in progress. A panicking source is
/// reported as a failed fetch and the thread keeps serving requests.
pub struct TelemetryWorker {
    source_name: String,
    sender: Sender<FeedCommand>,
    receiver: Receiver<FetchOutcome>,
    _handle: thread::JoinHandle<()>,
}

impl TelemetryWorker {
    pub fn spawn(mut source: Box<dyn TelemetrySource>) -> Self {
        let source_name = source.name().to_string();
        let (cmd_tx, cmd_rx) = mpsc::channel::<FeedCommand>();
        let (result_tx, result_rx) = mpsc::channel::<FetchOutcome>();

        let thread_name = source_name.clone();
        let handle = thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    FeedCommand::Fetch {
                        request,
                        requested_at_ms,
                    } => {
                        let fetched =
                            panic::catch_unwind(AssertUnwindSafe(|| source.fetch(requested_at_ms)));
                        let result = match fetched {
                            Ok(result) => {
                                result.map(|records| Catalog::from_raw(records, requested_at_ms))
                            }
                            Err(payload) => {
                                log::error!("Telemetry source '{}' panicked", thread_name);
                                Err(TelemetryError::Source {
                                    source_name: thread_name.clone(),
                                    message: format!(
                                        "fetch panicked: {}",
                                        panic_message(payload.as_ref())
                                    ),
                                })
                            }
                        };
                        let outcome = FetchOutcome {
                            request,
                            requested_at_ms,
                            result,
                        };
                        if result_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                    FeedCommand::Stop => break,
                }
            }
            log::debug!("Telemetry worker for '{}' exiting", thread_name);
        });

        Self {
            source_name,
            sender: cmd_tx,
            receiver: result_rx,
            _handle: handle,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Queue a fetch behind any already queued
    pub fn request(&self, request: u64, requested_at_ms: i64) -> Result<(), TelemetryError> {
        self.sender
            .send(FeedCommand::Fetch {
                request,
                requested_at_ms,
            })
            .map_err(|_| TelemetryError::WorkerStopped)
    }

    /// Append every outcome completed since the last call, oldest first.
    /// Fails once the worker thread is gone.
    pub fn drain(&self, outcomes: &mut Vec<FetchOutcome>) -> Result<(), TelemetryError> {
        loop {
            match self.receiver.try_recv() {
                Ok(outcome) => outcomes.push(outcome),
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => return Err(TelemetryError::WorkerStopped),
            }
        }
    }

    /// Block until the next outcome arrives. `Ok(None)` means the timeout
    /// passed first.
    pub fn wait(&self, timeout: Duration) -> Result<Option<FetchOutcome>, TelemetryError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TelemetryError::WorkerStopped),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
impl TelemetryWorker {
    /// A worker that accepts requests but whose thread never delivers
    pub(crate) fn disconnected(source_name: &str) -> Self {
        let (sender, commands) = mpsc::channel::<FeedCommand>();
        let (_, receiver) = mpsc::channel::<FetchOutcome>();
        let handle = thread::spawn(move || while commands.recv().is_ok() {});
        Self {
            source_name: source_name.to_string(),
            sender,
            receiver,
            _handle: handle,
        }
    }
}

impl Drop for TelemetryWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(FeedCommand::Stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawSample;

    /// Replays a fixed script of fetch results
    struct ScriptedSource {
        script: Vec<Result<Vec<RawSample>, TelemetryError>>,
    }

    impl TelemetrySource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        fn fetch(&mut self, _now_ms: i64) -> Result<Vec<RawSample>, TelemetryError> {
            if self.script.is_empty() {
                return Err(TelemetryError::NoData {
                    source_name: "scripted".into(),
                });
            }
            self.script.remove(0)
        }
    }

    fn sample(id: u32) -> RawSample {
        RawSample {
            norad_id: Some(id),
            ..Default::default()
        }
    }

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_outcomes_arrive_in_request_order() {
        let worker = TelemetryWorker::spawn(Box::new(ScriptedSource {
            script: vec![
                Ok(vec![sample(1)]),
                Err(TelemetryError::Source {
                    source_name: "scripted".into(),
                    message: "timeout".into(),
                }),
                Ok(vec![sample(1), sample(2)]),
            ],
        }));

        for request in 0..3 {
            worker.request(request, 1_000 * request as i64).unwrap();
        }

        let first = worker.wait(WAIT).unwrap().unwrap();
        let second = worker.wait(WAIT).unwrap().unwrap();
        let third = worker.wait(WAIT).unwrap().unwrap();

        assert_eq!(first.request, 0);
        assert_eq!(first.result.unwrap().len(), 1);
        assert_eq!(second.request, 1);
        assert!(second.result.is_err());
        assert_eq!(third.request, 2);
        assert_eq!(third.result.unwrap().len(), 2);
    }

    #[test]
    fn test_catalog_uses_request_time_as_receipt() {
        let worker = TelemetryWorker::spawn(Box::new(ScriptedSource {
            script: vec![Ok(vec![sample(9)])],
        }));
        worker.request(7, 12_345).unwrap();

        let outcome = worker.wait(WAIT).unwrap().unwrap();
        let catalog = outcome.result.unwrap();
        assert_eq!(catalog.received_at_ms(), 12_345);
        assert_eq!(catalog.get(9).unwrap().observed_at_ms, 12_345);
    }

    #[test]
    fn test_drain_is_empty_without_requests() {
        let worker = TelemetryWorker::spawn(Box::new(ScriptedSource { script: Vec::new() }));
        let mut outcomes = Vec::new();
        worker.drain(&mut outcomes).unwrap();
        assert!(outcomes.is_empty());
        assert_eq!(worker.source_name(), "scripted");
    }

    /// Panics on its first fetch, then serves one record per fetch
    struct FlakySource {
        fetches: u32,
    }

    impl TelemetrySource for FlakySource {
        fn name(&self) -> &str {
            "flaky"
        }

        fn fetch(&mut self, _now_ms: i64) -> Result<Vec<RawSample>, TelemetryError> {
            self.fetches += 1;
            if self.fetches == 1 {
                panic!("socket closed");
            }
            Ok(vec![sample(self.fetches)])
        }
    }

    #[test]
    fn test_panicking_fetch_becomes_error_and_worker_survives() {
        let worker = TelemetryWorker::spawn(Box::new(FlakySource { fetches: 0 }));
        worker.request(0, 0).unwrap();
        worker.request(1, 5_000).unwrap();

        let failed = worker.wait(WAIT).unwrap().unwrap();
        match failed.result {
            Err(TelemetryError::Source {
                source_name,
                message,
            }) => {
                assert_eq!(source_name, "flaky");
                assert!(message.contains("socket closed"), "{}", message);
            }
            other => panic!("expected a source error, got {:?}", other),
        }

        let recovered = worker.wait(WAIT).unwrap().unwrap();
        assert_eq!(recovered.request, 1);
        assert!(recovered.result.unwrap().contains(2));
    }

    #[test]
    fn test_disconnected_worker_reports_stopped() {
        let worker = TelemetryWorker::disconnected("gone");
        let mut outcomes = Vec::new();
        assert_eq!(worker.drain(&mut outcomes), Err(TelemetryError::WorkerStopped));
        assert!(outcomes.is_empty());
        assert_eq!(
            worker.wait(Duration::from_millis(1)).unwrap_err(),
            TelemetryError::WorkerStopped
        );
    }
}
