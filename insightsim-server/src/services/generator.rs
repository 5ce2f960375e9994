//! Synthetic data generator
//!
//! A run is prepared synchronously ([`prepare`]: validation and tag
//! resolution, no storage effect) and then executed by [`run`], which deletes
//! the scope's samples and regenerates them tag by tag. Progress is pushed as
//! [`GenerationEvent`]s into an unbounded channel; the run never waits on the
//! consumer and keeps going if the receiver is dropped.
//!
//! Writes are committed in fixed-size batches. A failure stops the run but
//! leaves earlier batches committed.

use insightsim_common::config::{DataConfig, ValueRange};
use insightsim_common::db::{Sample, GOOD_QUALITY};
use insightsim_common::{time, Error, GenerationEvent, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::db::{samples, tags};
use crate::services::batched_writer::BatchedWriter;
use crate::services::tag_registry;

/// Maximum relative step of the sequential walk
const MAX_STEP: f64 = 0.30;

/// Tick spacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
}

impl Frequency {
    pub fn minutes(&self) -> i64 {
        match self {
            Frequency::OneMinute => 1,
            Frequency::FiveMinutes => 5,
            Frequency::FifteenMinutes => 15,
            Frequency::ThirtyMinutes => 30,
            Frequency::OneHour => 60,
        }
    }

    pub fn interval_ms(&self) -> i64 {
        self.minutes() * 60_000
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::OneMinute
    }
}

impl FromStr for Frequency {
    type Err = Error;

    /// Empty text means one minute
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "1min" => Ok(Frequency::OneMinute),
            "5min" => Ok(Frequency::FiveMinutes),
            "15min" => Ok(Frequency::FifteenMinutes),
            "30min" => Ok(Frequency::ThirtyMinutes),
            "1hour" => Ok(Frequency::OneHour),
            _ => Err(Error::InvalidInput(format!(
                "invalid frequency '{}' (expected 1min, 5min, 15min, 30min or 1hour)",
                s
            ))),
        }
    }
}

/// Value model for generated samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Bounded random walk: each value is the previous one moved by up to ±30%
    Sequential,
    /// Independent draws from the value range
    Uniform,
}

impl GenerationMode {
    pub fn from_flag(use_sequential: bool) -> Self {
        if use_sequential {
            GenerationMode::Sequential
        } else {
            GenerationMode::Uniform
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMode::Sequential => f.write_str("sequential"),
            GenerationMode::Uniform => f.write_str("uniform"),
        }
    }
}

impl FromStr for GenerationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(GenerationMode::Sequential),
            "uniform" => Ok(GenerationMode::Uniform),
            _ => Err(Error::InvalidInput(format!(
                "invalid mode '{}' (expected sequential or uniform)",
                s
            ))),
        }
    }
}

/// Which tags a run regenerates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagScope {
    /// Every registered tag; the whole sample table is cleared first
    All,
    /// One registered tag; only its samples are cleared
    Single(String),
}

/// Run lifecycle, logged at debug level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    Validating,
    Deleting,
    Generating,
    Done,
    Failed,
}

/// Caller-supplied options; anything absent falls back to configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub tag: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub frequency: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub mode: Option<String>,
    pub seed: Option<u64>,
}

/// Validated, resolved run
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    pub scope: TagScope,
    pub tags: Vec<String>,
    pub start_ms: i64,
    pub end_ms: i64,
    pub frequency: Frequency,
    pub range: ValueRange,
    pub mode: GenerationMode,
    pub seed: u64,
    pub batch_size: usize,
}

impl GenerationPlan {
    /// Ticks per tag: `floor((end - start) / interval) + 1`
    pub fn ticks_per_tag(&self) -> u64 {
        ticks(self.start_ms, self.end_ms, self.frequency.interval_ms()).count() as u64
    }
}

/// Tick timestamps `start, start + interval, ...` while `<= end`
pub fn ticks(start_ms: i64, end_ms: i64, interval_ms: i64) -> impl Iterator<Item = i64> {
    let step = interval_ms.max(1);
    std::iter::successors(Some(start_ms), move |t| t.checked_add(step))
        .take_while(move |t| *t <= end_ms)
}

/// Value source for one run
///
/// One walk is shared by all tags of a run so a seed reproduces the whole
/// run; the sequential state restarts at each tag.
pub struct ValueWalk {
    rng: StdRng,
    range: ValueRange,
    mode: GenerationMode,
    previous: Option<f64>,
}

impl ValueWalk {
    pub fn new(seed: u64, range: ValueRange, mode: GenerationMode) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            range,
            mode,
            previous: None,
        }
    }

    /// Forget the previous value; the next draw is a fresh base value
    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn next_value(&mut self) -> f64 {
        let (min, max) = (self.range.min, self.range.max);
        let value = match (self.mode, self.previous) {
            (GenerationMode::Sequential, Some(prev)) => {
                let step = self.rng.gen_range(-MAX_STEP..=MAX_STEP);
                (prev * (1.0 + step)).clamp(min, max)
            }
            _ => (min + self.rng.gen::<f64>() * (max - min)).min(max),
        };
        self.previous = Some(value);
        value
    }
}

/// Validate the request and resolve target tags without touching samples
pub async fn prepare(
    pool: &SqlitePool,
    config: &DataConfig,
    request: GenerationRequest,
) -> Result<GenerationPlan> {
    debug!(phase = ?GenerationPhase::Validating, "Preparing generation run");

    let range = ValueRange {
        min: request.min_value.unwrap_or(config.value_range.min),
        max: request.max_value.unwrap_or(config.value_range.max),
    };
    range.validate()?;

    let start_text =
        non_empty(request.start.as_deref()).unwrap_or(config.generation_start_time.as_str());
    let end_text =
        non_empty(request.end.as_deref()).unwrap_or(config.generation_end_time.as_str());
    let start_ms = time::parse_timestamp(start_text)?;
    let end_ms = time::parse_timestamp(end_text)?;
    if start_ms >= end_ms {
        return Err(Error::InvalidInput(format!(
            "start ({}) must be before end ({})",
            start_text, end_text
        )));
    }

    let frequency = request.frequency.as_deref().unwrap_or("").parse::<Frequency>()?;

    let mode = match non_empty(request.mode.as_deref()) {
        Some(literal) => literal.parse::<GenerationMode>()?,
        None => GenerationMode::from_flag(config.use_sequential_generation),
    };

    let (scope, tag_names) = match non_empty(request.tag.as_deref()) {
        Some(tag) => {
            if !tags::tag_exists(pool, tag).await? {
                return Err(Error::NotFound(format!("tag '{}' not found", tag)));
            }
            (TagScope::Single(tag.to_string()), vec![tag.to_string()])
        }
        None => (TagScope::All, tags::list_tag_names(pool).await?),
    };

    let seed = request.seed.unwrap_or_else(rand::random);

    Ok(GenerationPlan {
        scope,
        tags: tag_names,
        start_ms,
        end_ms,
        frequency,
        range,
        mode,
        seed,
        batch_size: config.generation_batch_size,
    })
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|s| !s.is_empty())
}

/// Execute a prepared run, emitting progress into `events`
///
/// Returns the total rows written. Send failures (consumer gone) are ignored.
pub async fn run(
    pool: SqlitePool,
    plan: GenerationPlan,
    events: mpsc::UnboundedSender<GenerationEvent>,
) -> Result<u64> {
    info!(
        scope = ?plan.scope,
        tags = plan.tags.len(),
        mode = %plan.mode,
        minutes = plan.frequency.minutes(),
        seed = plan.seed,
        "Starting generation run"
    );

    match execute(&pool, &plan, &events).await {
        Ok(count) => {
            debug!(phase = ?GenerationPhase::Done, "Generation run finished");
            info!("Generation complete: {} records across {} tags", count, plan.tags.len());
            let _ = events.send(GenerationEvent::Done {
                count,
                tags_count: plan.tags.len(),
            });
            Ok(count)
        }
        Err(e) => {
            debug!(phase = ?GenerationPhase::Failed, "Generation run failed");
            error!("Generation failed: {}", e);
            let _ = events.send(GenerationEvent::Error {
                message: e.to_string(),
            });
            Err(e)
        }
    }
}

async fn execute(
    pool: &SqlitePool,
    plan: &GenerationPlan,
    events: &mpsc::UnboundedSender<GenerationEvent>,
) -> Result<u64> {
    debug!(phase = ?GenerationPhase::Deleting, "Clearing existing samples");
    let removed = match &plan.scope {
        TagScope::All => samples::delete_all_samples(pool).await?,
        TagScope::Single(tag) => samples::delete_samples_for_tag(pool, tag).await?,
    };
    info!("Removed {} existing samples", removed);

    debug!(phase = ?GenerationPhase::Generating, "Generating samples");
    let mut walk = ValueWalk::new(plan.seed, plan.range, plan.mode);
    let mut writer = BatchedWriter::new(pool.clone(), plan.batch_size);
    let interval_ms = plan.frequency.interval_ms();

    for tag in &plan.tags {
        walk.reset();
        let before = writer.applied();

        for tick in ticks(plan.start_ms, plan.end_ms, interval_ms) {
            let sample = Sample::new(tag.as_str(), tick, walk.next_value(), GOOD_QUALITY);
            writer
                .write(sample)
                .await
                .map_err(|e| tag_failure(tag, e))?;
        }
        writer.flush().await.map_err(|e| tag_failure(tag, e))?;
        tag_registry::touch(pool, tag).await?;

        let records = writer.applied() - before;
        debug!(tag = %tag, records, "Tag complete");
        let _ = events.send(GenerationEvent::TagComplete {
            tag: tag.clone(),
            records,
        });
    }

    writer.close().await
}

fn tag_failure(tag: &str, error: Error) -> Error {
    Error::Internal(format!("generation failed for tag '{}': {}", tag, error))
}

/// Run a prepared plan on a background task and return its event stream
pub fn spawn(pool: SqlitePool, plan: GenerationPlan) -> mpsc::UnboundedReceiver<GenerationEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        // Outcome is already reported through the channel
        let _ = run(pool, plan, tx).await;
    });
    rx
}
