use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::backend::GpuBackend;
use crate::manager::ShaderPipelineManager;
use crate::uniforms::UniformBlock;

/// Refresh rate assumed when the host reports nothing usable.
pub const DEFAULT_REFRESH_RATE: f32 = 60.0;

/// What a single [`RenderLoopDriver::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was drawn, submitted and presented.
    Presented,
    /// The host had no drawable for this tick (e.g. mid-reconfigure).
    SurfaceUnavailable,
    /// No ready pipeline; nothing was drawn and the clock did not move.
    PipelineNotReady,
}

/// Per-refresh driver that advances the simulated clock and draws.
///
/// The clock advances by `multiplier / refresh_rate` per presented frame
/// rather than by measured wall-clock time, so animation speed only depends
/// on the speed level.
#[derive(Debug)]
pub struct RenderLoopDriver {
    refresh_rate_hz: f32,
    width: f32,
    height: f32,
    frames_presented: u64,
    last_stats: Instant,
    frames_since_stats: u32,
}

impl RenderLoopDriver {
    pub fn new(width: u32, height: u32, refresh_rate_hz: f32) -> Self {
        let refresh_rate_hz = if refresh_rate_hz.is_finite() && refresh_rate_hz > 0.0 {
            refresh_rate_hz
        } else {
            warn!(
                requested = refresh_rate_hz,
                fallback = DEFAULT_REFRESH_RATE,
                "invalid refresh rate; using default"
            );
            DEFAULT_REFRESH_RATE
        };
        Self {
            refresh_rate_hz,
            width: width.max(1) as f32,
            height: height.max(1) as f32,
            frames_presented: 0,
            last_stats: Instant::now(),
            frames_since_stats: 0,
        }
    }

    pub fn refresh_rate_hz(&self) -> f32 {
        self.refresh_rate_hz
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Runs one presentation tick.
    ///
    /// `frame` is the drawable the host acquired for this refresh, or `None`
    /// when the surface could not provide one.
    pub fn tick<B: GpuBackend>(
        &mut self,
        manager: &mut ShaderPipelineManager<B>,
        frame: Option<B::Frame>,
    ) -> TickOutcome {
        let Some(frame) = frame else {
            trace!("no drawable available; skipping tick");
            return TickOutcome::SurfaceUnavailable;
        };
        let Some(parts) = manager.frame_parts() else {
            trace!("no ready pipeline; skipping tick");
            return TickOutcome::PipelineNotReady;
        };

        let time = parts.playback.advance(self.refresh_rate_hz);
        let block = UniformBlock::new(time as f32, self.width, self.height);
        parts.backend.write_uniforms(&block);
        parts.backend.submit(parts.pipeline, frame);

        self.frames_presented += 1;
        self.record_stats(time);
        TickOutcome::Presented
    }

    fn record_stats(&mut self, time: f64) {
        self.frames_since_stats += 1;
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_stats);
        if elapsed >= Duration::from_secs(1) {
            let fps = self.frames_since_stats as f32 / elapsed.as_secs_f32();
            debug!(
                fps = fps.round(),
                frames = self.frames_presented,
                time,
                "render stats"
            );
            self.frames_since_stats = 0;
            self.last_stats = now;
        }
    }
}

/// Spaces redraw requests one refresh interval apart.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    next_frame: Option<Instant>,
}

impl FramePacer {
    pub fn new(refresh_rate_hz: f32) -> Self {
        let hz = if refresh_rate_hz.is_finite() && refresh_rate_hz > 0.0 {
            refresh_rate_hz
        } else {
            DEFAULT_REFRESH_RATE
        };
        Self {
            interval: Duration::from_secs_f64(1.0 / f64::from(hz)),
            next_frame: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true when a frame is due at `now` and schedules the next one.
    pub fn ready_for_frame(&mut self, now: Instant) -> bool {
        match self.next_frame {
            Some(deadline) if now < deadline => false,
            Some(deadline) => {
                // Skip missed slots instead of bursting to catch up.
                let mut next = deadline + self.interval;
                if next <= now {
                    next = now + self.interval;
                }
                self.next_frame = Some(next);
                true
            }
            None => {
                self.next_frame = Some(now + self.interval);
                true
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_frame
    }
}
