//! Burn job controller
//!
//! Runs burns as tracked jobs:
//! 1. Reject the request if the current job is still running
//! 2. Record a new Pending job and return its id right away
//! 3. On the runtime: build the xorriso command, stream it, fold progress
//!    into the job and republish it to the event sink
//! 4. Optionally verify the written disc with `-check_media`
//! 5. Settle the job as Done or Error, unless it was cancelled first
//!
//! The controller keeps exactly one job slot. A finished job stays in the
//! slot until the next successful start replaces it.

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use uuid::Uuid;

use crate::core::{
    format_duration, BurnEvent, BurnJob, BurnOptions, BurnResult, BurnState, EventSink, Phase,
    ProgressSnapshot, Project,
};
use crate::error::{BurnError, ExecError};
use crate::xorriso::{
    CancelToken, Channel, CommandBuilder, Executor, ProcessOutcome, RunLimits, StreamEvent,
};

/// The single job slot and the token bound to it
#[derive(Default)]
struct Slot {
    job: Option<BurnJob>,
    cancel: Option<CancelToken>,
}

struct Inner {
    executor: Arc<Executor>,
    sink: Arc<dyn EventSink>,
    media_timeout: Duration,
    /// Cancelled on shutdown; bounds standalone blank/format runs
    shutdown: CancelToken,
    current: Mutex<Slot>,
}

/// Orchestrates burn, blank and format operations on one executor
pub struct BurnController {
    inner: Arc<Inner>,
    runtime: Handle,
}

impl BurnController {
    pub fn new(
        executor: Arc<Executor>,
        sink: Arc<dyn EventSink>,
        media_timeout: Duration,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                executor,
                sink,
                media_timeout,
                shutdown: CancelToken::new(),
                current: Mutex::new(Slot::default()),
            }),
            runtime,
        }
    }

    /// Start burning `project` to `device` as a new job
    ///
    /// # Arguments
    /// * `project` - Volume id, ISO options and the files to map into the image
    /// * `device` - Drive path, e.g. `/dev/sr0`
    /// * `opts` - Speed, dummy mode, verification, closing and eject
    ///
    /// # Returns
    /// * `Ok(job_id)` as soon as the job is recorded; the burn runs on the runtime
    /// * `Err(BurnError::Busy)` if the current job has not settled
    /// * `Err(BurnError::Start)` if the xorriso binary cannot be found; no job is created
    pub fn start_burn(
        &self,
        project: Project,
        device: &str,
        opts: BurnOptions,
    ) -> Result<String, BurnError> {
        let job_id = Uuid::new_v4().to_string();
        let cancel = CancelToken::new();
        {
            // Busy check and slot replacement under one lock
            let mut slot = self.inner.lock();
            if let Some(job) = &slot.job
                && !job.state.is_terminal()
            {
                log::warn!("Rejecting burn request: job {} is {}", job.id, job.state.as_str());
                return Err(BurnError::Busy);
            }

            self.inner.executor.check_binary()?;

            slot.job = Some(BurnJob::new(job_id.clone()));
            slot.cancel = Some(cancel.clone());
        }

        log::info!("Burn job {} created for {}", job_id, device);
        self.inner.emit_state(BurnState::Pending);

        let inner = self.inner.clone();
        let id = job_id.clone();
        let device = device.to_string();
        self.runtime.spawn(async move {
            inner.run_burn(&id, &project, &device, &opts, cancel).await;
        });

        Ok(job_id)
    }

    /// Cancel the current job
    ///
    /// The job flips to Cancelled right away; the xorriso child is asked to
    /// terminate and whatever it reports afterwards is ignored.
    ///
    /// # Returns
    /// * `Ok(())` if the job was cancelled or had already settled
    /// * `Err(BurnError::UnknownJob)` if `job_id` is not the current job
    pub fn cancel_burn(&self, job_id: &str) -> Result<(), BurnError> {
        {
            let mut slot = self.inner.lock();
            let Slot { job, cancel } = &mut *slot;
            let job = match job {
                Some(job) if job.id == job_id => job,
                _ => return Err(BurnError::UnknownJob(job_id.to_string())),
            };

            if job.state.is_terminal() {
                log::info!("Job {} already {}, nothing to cancel", job.id, job.state.as_str());
                return Ok(());
            }

            // Terminate the child, then settle the job without waiting for it
            if let Some(token) = cancel {
                token.cancel();
            }
            job.state = BurnState::Cancelled;
            job.finished_at = Some(Utc::now());
        }

        log::info!("Burn job {} cancelled", job_id);
        self.inner.emit_state(BurnState::Cancelled);
        Ok(())
    }

    /// Snapshot of the current job, if `job_id` names it
    pub fn get_job_status(&self, job_id: &str) -> Result<BurnJob, BurnError> {
        match &self.inner.lock().job {
            Some(job) if job.id == job_id => Ok(job.clone()),
            _ => Err(BurnError::UnknownJob(job_id.to_string())),
        }
    }

    pub fn current_job(&self) -> Option<BurnJob> {
        self.inner.lock().job.clone()
    }

    /// Blank a rewritable disc (`mode` e.g. `as_needed`, `all`, `fast`)
    pub async fn blank_disc(&self, device: &str, mode: &str) -> Result<ProcessOutcome, BurnError> {
        let args = CommandBuilder::new().device(device).blank(mode).build();
        self.inner.run_media_op(args, Phase::Blanking).await
    }

    /// Format a disc (BD-RE, DVD-RAM, DVD+RW; `mode` e.g. `as_needed`, `full`)
    pub async fn format_disc(&self, device: &str, mode: &str) -> Result<ProcessOutcome, BurnError> {
        let args = CommandBuilder::new().device(device).format(mode).build();
        self.inner.run_media_op(args, Phase::Formatting).await
    }

    /// Stop everything: cancels the current job and any blank/format run
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let running = self
            .current_job()
            .filter(|job| !job.state.is_terminal())
            .map(|job| job.id);
        if let Some(id) = running {
            let _ = self.cancel_burn(&id);
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_burn(
        &self,
        job_id: &str,
        project: &Project,
        device: &str,
        opts: &BurnOptions,
        cancel: CancelToken,
    ) {
        if !self.update_state(job_id, BurnState::Writing) {
            return;
        }

        let args = burn_command(project, device, opts);
        let outcome = self
            .executor
            .run_streaming(args, RunLimits::cancel(cancel.clone()), |event| {
                self.on_stream_event(job_id, event, None)
            })
            .await;

        if self.settle_failed_run(job_id, outcome).is_none() {
            return;
        }

        let mut md5_match = false;
        if opts.verify {
            if cancel.is_cancelled() || !self.update_state(job_id, BurnState::Verifying) {
                return;
            }
            match self.verify(job_id, device, opts, cancel).await {
                Ok(verified_md5) => md5_match = project.iso_options.md5 && verified_md5,
                Err(message) => {
                    self.finish(job_id, BurnState::Error, None, Some(message));
                    return;
                }
            }
        }

        let result = self.with_job(job_id, |job| BurnResult {
            success: true,
            bytes_written: job.progress.bytes_written,
            duration: format_duration(Utc::now() - job.started_at),
            average_speed: job.progress.speed.clone(),
            md5_match,
            verify_errors: 0,
        });
        if let Some(result) = result {
            self.finish(job_id, BurnState::Done, Some(result), None);
        }
    }

    /// Pass a successful write through; settle the job as Error otherwise
    ///
    /// Execution errors (the output pipe broke) keep their I/O text, a
    /// nonzero exit uses the last Info line.
    fn settle_failed_run(
        &self,
        job_id: &str,
        outcome: Result<ProcessOutcome, ExecError>,
    ) -> Option<ProcessOutcome> {
        let message = match outcome {
            Ok(outcome) if outcome.success() => return Some(outcome),
            Ok(outcome) => failure_message(&outcome),
            Err(e) => {
                log::error!("Burn job {} failed to run: {}", job_id, e);
                e.to_string()
            }
        };
        self.finish(job_id, BurnState::Error, None, Some(message));
        None
    }

    /// Read the disc back; `Ok(md5_ok)` when every region is readable
    async fn verify(
        &self,
        job_id: &str,
        device: &str,
        opts: &BurnOptions,
        cancel: CancelToken,
    ) -> Result<bool, String> {
        let mut cmd = CommandBuilder::new();
        cmd.in_device(device).check_media(&[("what", "disc")]);
        if opts.eject {
            cmd.eject("all");
        }

        let outcome = self
            .executor
            .run_streaming(cmd.build(), RunLimits::cancel(cancel), |event| {
                self.on_stream_event(job_id, event, Some(Phase::Verifying))
            })
            .await
            .map_err(|e| e.to_string())?;

        if !outcome.success() {
            return Err(failure_message(&outcome));
        }

        let bad = count_bad_regions(&outcome.result_lines);
        if bad > 0 {
            return Err(format!("Verification found {} unreadable region(s)", bad));
        }

        let md5_ok = !outcome
            .result_lines
            .iter()
            .chain(&outcome.info_lines)
            .any(|line| line.contains("MD5 MISMATCH"));
        Ok(md5_ok)
    }

    /// Progress wiring shared by burn and verify runs
    fn on_stream_event(&self, job_id: &str, event: StreamEvent<'_>, phase: Option<Phase>) {
        match event {
            StreamEvent::Line(line) => {
                if line.channel == Channel::Info {
                    self.sink.emit(BurnEvent::LogLine(line.text.trim_end().to_string()));
                }
            }
            StreamEvent::Progress(update) => {
                let snapshot = self.with_live_job(job_id, |job| {
                    job.progress.apply(update);
                    if let Some(phase) = phase {
                        job.progress.phase = phase;
                    }
                    job.progress.clone()
                });
                if let Some(snapshot) = snapshot {
                    self.sink.emit(BurnEvent::Progress(snapshot));
                }
            }
        }
    }

    fn emit_state(&self, state: BurnState) {
        self.sink
            .emit(BurnEvent::StateChanged(state.as_str().to_string()));
    }

    /// Standalone blank/format: no job record, progress straight to the sink
    ///
    /// Emits `formatting` on start and `done` or `error` when the run ends.
    async fn run_media_op(&self, args: Vec<String>, phase: Phase) -> Result<ProcessOutcome, BurnError> {
        log::info!("Starting {:?} run", phase);
        self.emit_state(BurnState::Formatting);

        let mut snapshot = ProgressSnapshot {
            phase,
            ..Default::default()
        };
        let limits = RunLimits::timeout(self.media_timeout).with_cancel(self.shutdown.clone());
        let outcome = self
            .executor
            .run_streaming(args, limits, |event| {
                if let StreamEvent::Progress(update) = event {
                    snapshot.apply(update);
                    snapshot.phase = phase;
                    self.sink.emit(BurnEvent::Progress(snapshot.clone()));
                }
            })
            .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                self.emit_state(BurnState::Error);
                self.sink.emit(BurnEvent::Error(e.to_string()));
                return Err(e.into());
            }
        };

        if !outcome.success() {
            let message = failure_message(&outcome);
            log::error!("{:?} failed: {}", phase, message);
            self.emit_state(BurnState::Error);
            self.sink.emit(BurnEvent::Error(message.clone()));
            return Err(BurnError::NonZeroExit {
                code: outcome.exit_code,
                message,
            });
        }

        log::info!("{:?} finished", phase);
        self.emit_state(BurnState::Done);
        Ok(outcome)
    }

    /// Run `f` on the job if it is still the current one
    fn with_job<T>(&self, job_id: &str, f: impl FnOnce(&mut BurnJob) -> T) -> Option<T> {
        let mut slot = self.lock();
        match slot.job.as_mut() {
            Some(job) if job.id == job_id => Some(f(job)),
            _ => None,
        }
    }

    /// Like `with_job`, but only while the job has not settled
    fn with_live_job<T>(&self, job_id: &str, f: impl FnOnce(&mut BurnJob) -> T) -> Option<T> {
        self.with_job(job_id, |job| (!job.state.is_terminal()).then(|| f(job)))
            .flatten()
    }

    fn update_state(&self, job_id: &str, state: BurnState) -> bool {
        let applied = self
            .with_live_job(job_id, |job| job.state = state)
            .is_some();
        if applied {
            log::info!("Burn job {} is {}", job_id, state.as_str());
            self.emit_state(state);
        }
        applied
    }

    fn finish(
        &self,
        job_id: &str,
        state: BurnState,
        result: Option<BurnResult>,
        error: Option<String>,
    ) {
        let applied = self
            .with_live_job(job_id, |job| {
                job.state = state;
                job.result = result.clone();
                job.error = error.clone();
                job.finished_at = Some(Utc::now());
            })
            .is_some();
        if !applied {
            log::info!("Burn job {} settled before {} arrived", job_id, state.as_str());
            return;
        }

        self.emit_state(state);
        match (result, error) {
            (Some(result), _) => {
                log::info!("Burn job {} done in {}", job_id, result.duration);
                self.sink.emit(BurnEvent::Complete(result));
            }
            (None, Some(error)) => {
                log::error!("Burn job {} failed: {}", job_id, error);
                self.sink.emit(BurnEvent::Error(error));
            }
            (None, None) => {}
        }
    }
}

/// The xorriso arguments for burning `project`
pub fn burn_command(project: &Project, device: &str, opts: &BurnOptions) -> Vec<String> {
    let mut cmd = CommandBuilder::new();
    cmd.device(device);

    if !project.volume_id.is_empty() {
        cmd.volume_id(&project.volume_id);
    }
    let iso = &project.iso_options;
    cmd.rock_ridge(iso.rock_ridge).joliet(iso.joliet);
    if iso.md5 {
        cmd.md5("on");
    }
    if iso.backup_mode {
        cmd.for_backup();
    }

    for entry in &project.entries {
        cmd.map(&entry.source_path, &entry.dest_path);
    }

    if let Some(speed) = opts.explicit_speed() {
        cmd.speed(speed);
    }
    cmd.dummy(opts.dummy_mode)
        .close(opts.close_disc)
        .stream_recording(opts.stream_recording)
        .commit();

    // With verification the drive must keep the disc until check_media ran
    if opts.eject && !opts.verify {
        cmd.eject("all");
    }

    cmd.build()
}

/// Human readable reason for a failed run
fn failure_message(outcome: &ProcessOutcome) -> String {
    outcome
        .last_info_line()
        .map(str::to_string)
        .unwrap_or_else(|| format!("xorriso exited with code {}", outcome.exit_code))
}

/// Count `-check_media` regions whose quality is negative (unreadable)
///
/// Region lines look like `Media region :   0 s  ,  15968 s , + good`.
fn count_bad_regions(result_lines: &[String]) -> usize {
    result_lines
        .iter()
        .filter(|line| line.contains("Media region"))
        .filter_map(|line| line.rsplit(',').next())
        .filter(|quality| quality.trim_start().starts_with('-'))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FileEntry;

    fn project() -> Project {
        Project {
            volume_id: "PHOTOS".into(),
            entries: vec![
                FileEntry::at_root("/home/me/a"),
                FileEntry {
                    source_path: "/home/me/b c".into(),
                    dest_path: "/docs/b c".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_burn_command_order() {
        let opts = BurnOptions {
            speed: "8".into(),
            verify: false,
            ..Default::default()
        };
        let args = burn_command(&project(), "/dev/sr0", &opts);
        assert_eq!(
            args,
            vec![
                "-dev", "/dev/sr0", "-volid", "PHOTOS", "-rockridge", "on", "-joliet", "on",
                "-md5", "on", "-map", "/home/me/a", "/a", "-map", "/home/me/b c", "/docs/b c",
                "-speed", "8", "-dummy", "off", "-close", "on", "-stream_recording", "off",
                "-commit", "-eject", "all",
            ]
        );
    }

    #[test]
    fn test_burn_command_auto_speed_and_deferred_eject() {
        let opts = BurnOptions::default();
        let args = burn_command(&Project::default(), "/dev/sr1", &opts);
        assert!(!args.contains(&"-speed".to_string()));
        assert!(!args.contains(&"-volid".to_string()));
        assert!(!args.contains(&"-eject".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("-commit"));
    }

    #[test]
    fn test_count_bad_regions() {
        let lines: Vec<String> = vec![
            "Media region :      0 s  ,    15968 s , + good".into(),
            "Media region :  15968 s  ,       32 s , - unreadable".into(),
            "Media summary: 1 session, 16000 data blocks".into(),
        ];
        assert_eq!(count_bad_regions(&lines), 1);
        assert_eq!(count_bad_regions(&[]), 0);
    }

    #[test]
    fn test_failure_message_falls_back_to_exit_code() {
        let outcome = ProcessOutcome {
            exit_code: 3,
            ..Default::default()
        };
        assert_eq!(failure_message(&outcome), "xorriso exited with code 3");

        let outcome = ProcessOutcome {
            exit_code: 3,
            info_lines: vec!["FAILURE : Drive not ready\n".into()],
            ..Default::default()
        };
        assert_eq!(failure_message(&outcome), "FAILURE : Drive not ready");
    }
}

#[cfg(all(test, unix))]
mod job_tests {
    use super::*;
    use crate::test_fixtures::FakeXorriso;
    use std::sync::mpsc;

    fn controller(fake: &FakeXorriso) -> (BurnController, mpsc::Receiver<BurnEvent>) {
        let (tx, rx) = mpsc::channel();
        let controller = BurnController::new(
            Arc::new(Executor::new(fake.path())),
            Arc::new(tx),
            Duration::from_secs(10),
            Handle::current(),
        );
        (controller, rx)
    }

    fn no_verify() -> BurnOptions {
        BurnOptions {
            verify: false,
            eject: false,
            ..Default::default()
        }
    }

    async fn wait_until_settled(controller: &BurnController, id: &str) -> BurnJob {
        for _ in 0..200 {
            let job = controller.get_job_status(id).unwrap();
            if job.state.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {} never settled", id);
    }

    fn states(events: &[BurnEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                BurnEvent::StateChanged(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    const BURN_OK: &str = r#"
printf 'I:0:Beginning to write data track.\n'
printf 'I:0:xorriso : UPDATE : 40.0%% done, fifo 90%%, 8.0xD\n'
printf 'I:0:xorriso : UPDATE : 80.0%% done\n'
printf 'R:0:Writing to /dev/sr0 completed successfully.\n'
"#;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_burn_runs_to_done() {
        let fake = FakeXorriso::new(BURN_OK);
        let (controller, rx) = controller(&fake);

        let id = controller
            .start_burn(Project::default(), "/dev/sr0", no_verify())
            .unwrap();
        let job = wait_until_settled(&controller, &id).await;

        assert_eq!(job.state, BurnState::Done);
        assert!(job.finished_at.is_some());
        assert!(job.result.as_ref().unwrap().success);
        // The second update had no fifo or speed, the earlier values stay
        assert_eq!(job.progress.percent, 80.0);
        assert_eq!(job.progress.fifo_fill, 90);
        assert_eq!(job.progress.speed, "8.0xD");

        let args = fake.recorded_args();
        assert_eq!(&args[..4], &["-pkt_output", "on", "-dev", "/dev/sr0"]);
        assert_eq!(args.last().map(String::as_str), Some("-commit"));

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(states(&events), vec!["pending", "writing", "done"]);
        let percents: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                BurnEvent::Progress(p) => Some(p.percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents, vec![40.0, 80.0]);
        assert!(events
            .iter()
            .any(|e| matches!(e, BurnEvent::LogLine(l) if l == "Beginning to write data track.")));
        assert!(matches!(events.last(), Some(BurnEvent::Complete(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_start_is_busy() {
        let fake = FakeXorriso::new("exec sleep 30\n");
        let (controller, _rx) = controller(&fake);

        let first = controller
            .start_burn(Project::default(), "/dev/sr0", no_verify())
            .unwrap();
        let second = controller.start_burn(Project::default(), "/dev/sr0", no_verify());
        assert!(matches!(second, Err(BurnError::Busy)));

        let job = controller.get_job_status(&first).unwrap();
        assert_eq!(job.id, first);
        assert!(!job.state.is_terminal());

        controller.cancel_burn(&first).unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancel_is_immediate_and_final() {
        let fake = FakeXorriso::new("printf 'I:0:xorriso : UPDATE : 5.0%% done\\n'\nexec sleep 30\n");
        let (controller, rx) = controller(&fake);

        let id = controller
            .start_burn(Project::default(), "/dev/sr0", no_verify())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        controller.cancel_burn(&id).unwrap();
        let job = controller.get_job_status(&id).unwrap();
        assert_eq!(job.state, BurnState::Cancelled);
        assert!(job.finished_at.is_some());

        // Give the killed process time to report back; it must not win
        tokio::time::sleep(Duration::from_millis(500)).await;
        let job = controller.get_job_status(&id).unwrap();
        assert_eq!(job.state, BurnState::Cancelled);
        assert!(job.error.is_none());

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(states(&events).last().map(String::as_str), Some("cancelled"));
        assert!(!events.iter().any(|e| matches!(e, BurnEvent::Error(_))));

        // A settled job does not block a new one
        let next = controller
            .start_burn(Project::default(), "/dev/sr0", no_verify())
            .unwrap();
        assert_ne!(next, id);
        assert!(controller.get_job_status(&id).is_err());
        controller.shutdown();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_job_ids() {
        let fake = FakeXorriso::new(BURN_OK);
        let (controller, _rx) = controller(&fake);

        assert!(matches!(
            controller.get_job_status("nope"),
            Err(BurnError::UnknownJob(_))
        ));
        assert!(matches!(
            controller.cancel_burn("nope"),
            Err(BurnError::UnknownJob(_))
        ));

        let id = controller
            .start_burn(Project::default(), "/dev/sr0", no_verify())
            .unwrap();
        let before = wait_until_settled(&controller, &id).await;
        assert!(controller.cancel_burn("nope").is_err());
        assert_eq!(controller.get_job_status(&id).unwrap(), before);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_nonzero_exit_uses_last_info_line() {
        let fake = FakeXorriso::new(
            r#"
printf 'I:0:Drive current: -dev /dev/sr0\n'
printf 'I:0:FAILURE : Media is not writeable\n'
exit 32
"#,
        );
        let (controller, rx) = controller(&fake);

        let id = controller
            .start_burn(Project::default(), "/dev/sr0", no_verify())
            .unwrap();
        let job = wait_until_settled(&controller, &id).await;

        assert_eq!(job.state, BurnState::Error);
        assert_eq!(job.error.as_deref(), Some("FAILURE : Media is not writeable"));
        assert!(job.result.is_none());

        let events: Vec<_> = rx.try_iter().collect();
        assert!(matches!(events.last(), Some(BurnEvent::Error(m)) if m.contains("not writeable")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_failure_creates_no_job() {
        let (tx, _rx) = mpsc::channel();
        let controller = BurnController::new(
            Arc::new(Executor::new("/nonexistent/xorriso")),
            Arc::new(tx),
            Duration::from_secs(10),
            Handle::current(),
        );

        let err = controller
            .start_burn(Project::default(), "/dev/sr0", no_verify())
            .unwrap_err();
        assert!(matches!(err, BurnError::Start(_)));
        assert!(controller.current_job().is_none());
    }

    const VERIFY_SCRIPT: &str = r#"
case "$*" in
  *-check_media*)
    printf 'I:0:xorriso : UPDATE : 50.0%% done\n'
    printf 'R:0:Media region :      0 s  ,    15968 s , + good\n'
    ;;
  *)
    printf 'I:0:xorriso : UPDATE : 100.0%% done\n'
    ;;
esac
"#;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_verify_passes_through_verifying() {
        let fake = FakeXorriso::new(VERIFY_SCRIPT);
        let (controller, rx) = controller(&fake);

        let opts = BurnOptions {
            verify: true,
            eject: true,
            ..Default::default()
        };
        let id = controller.start_burn(Project::default(), "/dev/sr0", opts).unwrap();
        let job = wait_until_settled(&controller, &id).await;

        assert_eq!(job.state, BurnState::Done);
        assert_eq!(job.progress.phase, Phase::Verifying);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(states(&events), vec!["pending", "writing", "verifying", "done"]);

        // The last run was the verification, and it ejects
        let args = fake.recorded_args();
        assert!(args.contains(&"-check_media".to_string()));
        assert!(args.contains(&"-indev".to_string()));
        assert_eq!(&args[args.len() - 2..], &["-eject", "all"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_verify_failure_is_error() {
        let fake = FakeXorriso::new(
            r#"
case "$*" in
  *-check_media*)
    printf 'R:0:Media region :      0 s  ,    100 s , - unreadable\n'
    ;;
esac
"#,
        );
        let (controller, _rx) = controller(&fake);

        let opts = BurnOptions {
            verify: true,
            ..Default::default()
        };
        let id = controller.start_burn(Project::default(), "/dev/sr0", opts).unwrap();
        let job = wait_until_settled(&controller, &id).await;

        assert_eq!(job.state, BurnState::Error);
        assert!(job.error.unwrap().contains("unreadable"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blank_reports_blanking_progress_without_job() {
        let fake = FakeXorriso::new(
            r#"
printf 'I:0:xorriso : UPDATE : Blanking 30.0%% done\n'
printf 'I:0:xorriso : UPDATE : Blanking 60.0%% done\n'
"#,
        );
        let (controller, rx) = controller(&fake);

        let outcome = controller.blank_disc("/dev/sr0", "as_needed").await.unwrap();
        assert!(outcome.success());
        assert!(controller.current_job().is_none());
        assert_eq!(
            fake.recorded_args(),
            vec!["-pkt_output", "on", "-dev", "/dev/sr0", "-blank", "as_needed"]
        );

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(states(&events), vec!["formatting", "done"]);
        let progress: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                BurnEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(progress.len(), 2);
        assert!(progress.iter().all(|p| p.phase == Phase::Blanking));
        assert_eq!(progress[1].percent, 60.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_format_failure_is_nonzero_exit() {
        let fake = FakeXorriso::new("printf 'I:0:SORRY : Medium not formattable\\n'\nexit 1\n");
        let (controller, rx) = controller(&fake);

        let err = controller.format_disc("/dev/sr0", "full").await.unwrap_err();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(states(&events), vec!["formatting", "error"]);
        match err {
            BurnError::NonZeroExit { code, message } => {
                assert_eq!(code, 1);
                assert_eq!(message, "SORRY : Medium not formattable");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_broken_output_pipe_fails_job_with_io_text() {
        let fake = FakeXorriso::new("exit 0\n");
        let (controller, rx) = controller(&fake);
        controller.inner.lock().job = Some(BurnJob::new("job-1".into()));

        let broken = Err(ExecError::Pipe(std::io::Error::other("device vanished")));
        assert!(controller.inner.settle_failed_run("job-1", broken).is_none());

        let job = controller.get_job_status("job-1").unwrap();
        assert_eq!(job.state, BurnState::Error);
        assert!(job.finished_at.is_some());
        assert!(job.error.unwrap().contains("device vanished"));

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(states(&events), vec!["error"]);
        assert!(matches!(events.last(), Some(BurnEvent::Error(m)) if m.contains("device vanished")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_successful_run_passes_through() {
        let fake = FakeXorriso::new("exit 0\n");
        let (controller, rx) = controller(&fake);
        controller.inner.lock().job = Some(BurnJob::new("job-1".into()));

        let outcome = controller.inner.settle_failed_run("job-1", Ok(ProcessOutcome::default()));
        assert!(outcome.is_some());
        assert_eq!(controller.get_job_status("job-1").unwrap().state, BurnState::Pending);
        assert_eq!(rx.try_iter().count(), 0);
    }
}
