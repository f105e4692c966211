//! Drive discovery and media queries
//!
//! Thin wrappers around buffered xorriso runs plus a background poller that
//! republishes the drive list. Every query goes through the shared
//! [`Executor`], so a running burn holds them off until it finishes.

mod parse;

pub use parse::{
    parse_drives, parse_media_info, parse_media_space, parse_profiles, parse_speeds, BLOCK_SIZE,
};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::core::{BurnEvent, Drive, EventSink, MediaInfo, MediaProfile, Settings, SpeedDescriptor};
use crate::error::BurnError;
use crate::xorriso::{CancelToken, CommandBuilder, Executor, ProcessOutcome, RunLimits};

/// Timeouts for the different kinds of drive queries
#[derive(Debug, Clone, Copy)]
pub struct QueryTimeouts {
    /// Listing drives, media info, speeds, eject
    pub query: Duration,
    /// Profile listing
    pub profiles: Duration,
}

impl QueryTimeouts {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            query: settings.query_timeout(),
            profiles: settings.profile_timeout(),
        }
    }
}

impl Default for QueryTimeouts {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Read-only questions about drives and media
#[derive(Clone)]
pub struct DriveQueries {
    executor: Arc<Executor>,
    timeouts: QueryTimeouts,
}

impl DriveQueries {
    pub fn new(executor: Arc<Executor>, timeouts: QueryTimeouts) -> Self {
        Self { executor, timeouts }
    }

    /// All drives xorriso can see, each with its profile list
    ///
    /// A drive whose profiles cannot be read is still listed, without them.
    pub async fn list_drives(&self) -> Result<Vec<Drive>, BurnError> {
        let args = CommandBuilder::new().device_links().build();
        let outcome = self.query(args, self.timeouts.query).await?;

        let mut drives = parse_drives(&outcome.result_lines);
        for drive in &mut drives {
            match self.drive_profiles(&drive.path).await {
                Ok(profiles) => drive.profiles = profiles,
                Err(e) => log::debug!("No profiles for {}: {}", drive.path, e),
            }
        }

        log::debug!("Found {} drive(s)", drives.len());
        Ok(drives)
    }

    pub async fn drive_profiles(&self, device: &str) -> Result<Vec<MediaProfile>, BurnError> {
        let args = CommandBuilder::new()
            .out_device(device)
            .list_profiles("all")
            .build();
        let outcome = self.query(args, self.timeouts.profiles).await?;
        Ok(parse_profiles(&outcome.result_lines))
    }

    /// Medium type, status, free space and erasability
    pub async fn media_info(&self, device: &str) -> Result<MediaInfo, BurnError> {
        let args = CommandBuilder::new()
            .device(device)
            .toc()
            .tell_media_space()
            .build();
        let outcome = self.query(args, self.timeouts.query).await?;
        Ok(parse_media_info(device, &outcome.result_lines, &outcome.info_lines))
    }

    pub async fn write_speeds(&self, device: &str) -> Result<Vec<SpeedDescriptor>, BurnError> {
        let args = CommandBuilder::new().device(device).list_speeds().build();
        let outcome = self.query(args, self.timeouts.query).await?;
        Ok(parse_speeds(&outcome.result_lines))
    }

    pub async fn eject(&self, device: &str) -> Result<(), BurnError> {
        let args = CommandBuilder::new().device(device).eject("all").build();
        let outcome = self.query(args, self.timeouts.query).await?;
        if !outcome.success() {
            return Err(BurnError::NonZeroExit {
                code: outcome.exit_code,
                message: outcome
                    .last_info_line()
                    .unwrap_or("eject failed")
                    .to_string(),
            });
        }
        log::info!("Ejected {}", device);
        Ok(())
    }

    /// xorriso's version banner
    pub async fn version(&self) -> Result<String, BurnError> {
        Ok(self.executor.version(self.timeouts.query).await?)
    }

    async fn query(&self, args: Vec<String>, timeout: Duration) -> Result<ProcessOutcome, BurnError> {
        Ok(self.executor.run(args, RunLimits::timeout(timeout)).await?)
    }
}

/// Background task that refreshes the drive list on an interval
pub struct DevicePoller {
    stop: CancelToken,
    handle: JoinHandle<()>,
}

impl DevicePoller {
    /// Start polling on the current runtime
    ///
    /// The first refresh happens immediately, then every `interval`.
    pub fn start(queries: DriveQueries, sink: Arc<dyn EventSink>, interval: Duration) -> Self {
        let stop = CancelToken::new();
        let stopped = stop.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = stopped.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                // The refresh may queue behind a burn on the executor lock
                let refreshed = tokio::select! {
                    _ = stopped.cancelled() => break,
                    refreshed = queries.list_drives() => refreshed,
                };
                match refreshed {
                    Ok(drives) => sink.emit(BurnEvent::DeviceListUpdated(drives)),
                    Err(e) => log::warn!("Drive poll failed: {}", e),
                }
            }
            log::debug!("Device poller stopped");
        });

        Self { stop, handle }
    }

    /// Stop polling and wait for the task to wind down
    ///
    /// Returns promptly even when a refresh is waiting behind a running burn;
    /// that refresh is abandoned.
    pub async fn stop(self) {
        self.stop.cancel();
        let _ = self.handle.await;
    }
}
