use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::player::{Bitmap, MediaPlayer};
use crate::utils::{AppError, ThumbnailError};

/// One point on the timeline a thumbnail is captured at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleTimestamp {
    pub index: usize,
    pub time_secs: f64,
}

#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub index: usize,
    pub time_secs: f64,
    pub image: Bitmap,
}

/// Result of extracting a single sample, tagged with the batch it belongs to
#[derive(Debug, Clone)]
pub struct ThumbnailOutcome {
    pub batch: u64,
    pub index: usize,
    pub time_secs: f64,
    pub result: Result<Bitmap, ThumbnailError>,
}

/// Receives outcomes from extraction tasks. Returns `false` once the receiving
/// side is gone.
pub type Deliver = Arc<dyn Fn(ThumbnailOutcome) -> bool + Send + Sync>;

/// Sample times at a fixed interval from 0 up to and including `duration`.
///
/// There is always at least the sample at 0, even for an empty or broken
/// duration.
pub fn sample_timestamps(duration: f64, interval: f64) -> Vec<SampleTimestamp> {
    let duration = if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    };
    if !(interval.is_finite() && interval > 0.0) {
        return vec![SampleTimestamp {
            index: 0,
            time_secs: 0.0,
        }];
    }

    let count = (duration / interval).floor() as usize + 1;
    (0..count)
        .map(|index| SampleTimestamp {
            index,
            time_secs: index as f64 * interval,
        })
        // floor() can round up on values like 0.3 / 0.1
        .filter(|sample| sample.time_secs <= duration)
        .collect()
}

/// Extracts the timeline thumbnails of an asset concurrently
pub struct ThumbnailBatchGenerator {
    capture_interval: f64,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl ThumbnailBatchGenerator {
    pub fn new(capture_interval: f64, max_concurrent: usize) -> Result<Self, AppError> {
        if !(capture_interval.is_finite() && capture_interval > 0.0) {
            return Err(AppError::Configuration(format!(
                "Capture interval must be positive, got {}",
                capture_interval
            )));
        }
        if max_concurrent == 0 {
            return Err(AppError::Configuration(
                "At least one concurrent extraction is required".to_string(),
            ));
        }

        Ok(Self {
            capture_interval,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        })
    }

    pub fn capture_interval(&self) -> f64 {
        self.capture_interval
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn plan(&self, duration: f64) -> Vec<SampleTimestamp> {
        sample_timestamps(duration, self.capture_interval)
    }

    /// Spawns one extraction task per sample.
    ///
    /// At most `max_concurrent` extractions run at once across every batch
    /// dispatched by this generator. Outcomes are handed to `deliver` in
    /// completion order, which is not index order.
    pub fn dispatch(
        &self,
        player: Arc<dyn MediaPlayer>,
        batch: u64,
        samples: Vec<SampleTimestamp>,
        deliver: Deliver,
    ) -> Vec<JoinHandle<()>> {
        debug!(
            "Dispatching thumbnail batch {} with {} samples",
            batch,
            samples.len()
        );

        samples
            .into_iter()
            .map(|sample| {
                let player = player.clone();
                let permits = self.permits.clone();
                let deliver = deliver.clone();

                tokio::spawn(async move {
                    let result = match permits.acquire_owned().await {
                        Ok(_permit) => player.generate_frame(sample.time_secs).await,
                        Err(_) => Err(ThumbnailError::Extraction {
                            time: sample.time_secs,
                            reason: "extraction pool closed".to_string(),
                        }),
                    };

                    if let Err(e) = &result {
                        warn!("Thumbnail {} of batch {} failed: {}", sample.index, batch, e);
                    }

                    let delivered = deliver(ThumbnailOutcome {
                        batch,
                        index: sample.index,
                        time_secs: sample.time_secs,
                        result,
                    });
                    if !delivered {
                        trace!(
                            "Dropped thumbnail {} of batch {}, receiver is gone",
                            sample.index, batch
                        );
                    }
                })
            })
            .collect()
    }

    /// Extracts a whole batch and waits for every sample to resolve
    pub async fn generate(&self, player: Arc<dyn MediaPlayer>, duration: f64) -> ThumbnailStrip {
        let samples = self.plan(duration);
        let mut strip = ThumbnailStrip::new(0, samples.clone());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let deliver: Deliver = Arc::new(move |outcome: ThumbnailOutcome| tx.send(outcome).is_ok());
        self.dispatch(player, 0, samples, deliver);

        while !strip.is_complete() {
            match rx.recv().await {
                Some(outcome) => {
                    strip.accept(outcome);
                }
                None => break,
            }
        }
        strip
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Pending,
    Ready(Thumbnail),
    Failed,
}

/// Changes produced by feeding one outcome into a strip
#[derive(Debug, Default)]
pub struct StripUpdate {
    /// Thumbnails newly released for display, in index order
    pub appended: Vec<Thumbnail>,
    pub failure: Option<(usize, ThumbnailError)>,
    /// Set on the update that resolved the last outstanding sample
    pub complete: bool,
}

/// Ordered display collection for one thumbnail batch.
///
/// Outcomes arrive in any order, but thumbnails are only released once every
/// lower index has resolved, so the display list grows strictly by index.
#[derive(Debug)]
pub struct ThumbnailStrip {
    batch: u64,
    samples: Vec<SampleTimestamp>,
    slots: Vec<Slot>,
    released: usize,
    resolved: usize,
    displayed: Vec<Thumbnail>,
    failed: Vec<usize>,
}

impl ThumbnailStrip {
    pub fn new(batch: u64, samples: Vec<SampleTimestamp>) -> Self {
        let slots = vec![Slot::Pending; samples.len()];
        Self {
            batch,
            samples,
            slots,
            released: 0,
            resolved: 0,
            displayed: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn batch(&self) -> u64 {
        self.batch
    }

    pub fn samples(&self) -> &[SampleTimestamp] {
        &self.samples
    }

    pub fn displayed(&self) -> &[Thumbnail] {
        &self.displayed
    }

    pub fn displayed_indices(&self) -> Vec<usize> {
        self.displayed.iter().map(|t| t.index).collect()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        let mut failed = self.failed.clone();
        failed.sort_unstable();
        failed
    }

    pub fn outstanding(&self) -> usize {
        self.samples.len() - self.resolved
    }

    pub fn is_complete(&self) -> bool {
        self.resolved == self.samples.len()
    }

    pub fn accept(&mut self, outcome: ThumbnailOutcome) -> StripUpdate {
        let mut update = StripUpdate::default();

        if outcome.batch != self.batch {
            trace!(
                "Ignoring thumbnail from batch {} (current {})",
                outcome.batch, self.batch
            );
            return update;
        }
        let Some(slot) = self.slots.get_mut(outcome.index) else {
            warn!("Thumbnail index {} is outside the batch", outcome.index);
            return update;
        };
        if !matches!(slot, Slot::Pending) {
            trace!("Ignoring duplicate thumbnail {}", outcome.index);
            return update;
        }

        match outcome.result {
            Ok(image) => {
                *slot = Slot::Ready(Thumbnail {
                    index: outcome.index,
                    time_secs: outcome.time_secs,
                    image,
                });
            }
            Err(e) => {
                *slot = Slot::Failed;
                self.failed.push(outcome.index);
                update.failure = Some((outcome.index, e));
            }
        }
        self.resolved += 1;

        while let Some(slot) = self.slots.get(self.released) {
            match slot {
                Slot::Pending => break,
                Slot::Ready(thumbnail) => update.appended.push(thumbnail.clone()),
                Slot::Failed => {}
            }
            self.released += 1;
        }
        self.displayed.extend(update.appended.iter().cloned());

        if self.is_complete() {
            info!(
                "Thumbnail batch {} complete: {} shown, {} failed",
                self.batch,
                self.displayed.len(),
                self.failed.len()
            );
            update.complete = true;
        }
        update
    }
}
