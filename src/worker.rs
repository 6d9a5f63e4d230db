use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use crate::error::{InvoiceError, Result};
use crate::generator::{generate_invoice, GenerationOutcome, GenerationRequest, LogLevel, LogLine};

/// Runs at most one generation at a time on a background thread.
#[derive(Default)]
pub struct GenerationWorker {
    pending: Option<Receiver<GenerationOutcome>>,
}

impl GenerationWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn submit(&mut self, request: GenerationRequest) -> Result<()> {
        self.submit_job(move || generate_invoice(&request))
    }

    fn submit_job<F>(&mut self, job: F) -> Result<()>
    where
        F: FnOnce() -> GenerationOutcome + Send + 'static,
    {
        if self.is_busy() {
            return Err(InvoiceError::Busy);
        }
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("generation".into())
            .spawn(move || {
                let outcome = catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|panic| {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "erreur inattendue".to_string());
                    tracing::error!(%reason, "generation panicked");
                    crashed(reason)
                });
                // The receiver may be gone if the app quit mid-run.
                let _ = tx.send(outcome);
            })?;
        self.pending = Some(rx);
        Ok(())
    }

    /// The finished outcome, if the running job has completed.
    pub fn try_recv(&mut self) -> Option<GenerationOutcome> {
        let rx = self.pending.as_ref()?;
        match rx.try_recv() {
            Ok(outcome) => {
                self.pending = None;
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                Some(crashed("la tâche s'est arrêtée sans résultat".to_string()))
            }
        }
    }
}

fn crashed(reason: String) -> GenerationOutcome {
    GenerationOutcome {
        log: vec![LogLine {
            level: LogLevel::Error,
            message: format!("❌ Erreur : {reason}"),
        }],
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn wait(worker: &mut GenerationWorker) -> GenerationOutcome {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(outcome) = worker.try_recv() {
                return outcome;
            }
            assert!(Instant::now() < deadline, "worker did not finish");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_rejects_second_submission_while_busy() {
        let mut worker = GenerationWorker::new();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        worker
            .submit_job(move || {
                let _ = release_rx.recv();
                GenerationOutcome {
                    success: true,
                    ..Default::default()
                }
            })
            .unwrap();
        assert!(worker.is_busy());

        let err = worker.submit_job(GenerationOutcome::default).unwrap_err();
        assert!(matches!(err, InvoiceError::Busy));
        assert!(worker.try_recv().is_none());

        release_tx.send(()).unwrap();
        let outcome = wait(&mut worker);
        assert!(outcome.success);
        assert!(!worker.is_busy());

        // Free again once the first run has been collected.
        worker.submit_job(GenerationOutcome::default).unwrap();
        wait(&mut worker);
    }

    #[test]
    fn test_panicking_job_becomes_failed_outcome() {
        let mut worker = GenerationWorker::new();
        worker
            .submit_job(|| panic!("boom"))
            .unwrap();
        let outcome = wait(&mut worker);
        assert!(!outcome.success);
        assert!(outcome.files.is_empty());
        assert!(outcome.log[0].message.contains("boom"));
        assert!(!worker.is_busy());
    }

    #[test]
    fn test_submit_runs_generation() {
        let dir = tempfile::tempdir().unwrap();
        let mut worker = GenerationWorker::new();
        worker
            .submit(GenerationRequest {
                source: dir.path().join("absent.xlsx"),
                year: 2024,
                month: 3,
                format: crate::models::OutputFormat::Pdf,
                config_path: dir.path().join("absent.json"),
                invoice_number: None,
                payment_date: None,
            })
            .unwrap();
        let outcome = wait(&mut worker);
        assert!(!outcome.success);
        assert!(outcome.log_text().contains("absent.json"));
    }
}
