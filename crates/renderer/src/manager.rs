//! Owner of the shader source, the compiled pipeline and playback state.
//!
//! All mutation happens on the thread that owns the manager; the host
//! marshals UI events and presentation callbacks onto that thread before
//! calling in. Recompilation is synchronous, so the render loop never sees a
//! pipeline halfway through replacement.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::backend::GpuBackend;
use crate::compile::{build_program, CompileError, DEFAULT_FRAGMENT_SOURCE};
use crate::speed::SpeedMapper;

/// Outcome of the most recent compile attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CompileState {
    /// No attempt has finished yet, or one is in progress.
    #[default]
    Loading,
    /// The last attempt failed; nothing is drawn until the next success.
    Error(CompileError),
    /// A pipeline is available for drawing.
    Ready,
}

impl CompileState {
    pub fn is_ready(&self) -> bool {
        matches!(self, CompileState::Ready)
    }

    pub fn error(&self) -> Option<&CompileError> {
        match self {
            CompileState::Error(err) => Some(err),
            _ => None,
        }
    }
}

/// Play/pause flag, speed level and the simulated clock fed to the shader.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub speed_level: f32,
    /// Simulated seconds; only grows while playing.
    pub accumulated_time: f64,
}

impl PlaybackState {
    /// Advances the clock by one refresh interval scaled by the speed level
    /// and returns the new time.
    pub fn advance(&mut self, refresh_rate_hz: f32) -> f64 {
        if self.is_playing {
            let multiplier = SpeedMapper::map_time(self.speed_level);
            self.accumulated_time += f64::from(multiplier) / f64::from(refresh_rate_hz);
        }
        self.accumulated_time
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: true,
            speed_level: SpeedMapper::DEFAULT_LEVEL,
            accumulated_time: 0.0,
        }
    }
}

/// State published to observers after every user-visible mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub compile_state: CompileState,
    pub is_playing: bool,
    pub speed_level: f32,
}

impl StateSnapshot {
    /// Time multiplier for the published speed level.
    pub fn multiplier(&self) -> f32 {
        SpeedMapper::map_time(self.speed_level)
    }
}

/// Identifies an observer registered with [`ShaderPipelineManager::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&StateSnapshot)>;

#[derive(Default)]
struct Observers {
    next_id: u64,
    entries: Vec<(SubscriptionId, Observer)>,
}

impl Observers {
    fn add(&mut self, observer: Observer) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    fn notify(&mut self, snapshot: &StateSnapshot) {
        for (_, observer) in &mut self.entries {
            observer(snapshot);
        }
    }
}

/// Borrowed view handed to the render loop for a single tick.
pub(crate) struct FrameParts<'a, B: GpuBackend> {
    pub pipeline: &'a B::Pipeline,
    pub backend: &'a mut B,
    pub playback: &'a mut PlaybackState,
}

/// Compiles editor text into a pipeline and tracks playback state.
pub struct ShaderPipelineManager<B: GpuBackend> {
    backend: B,
    source: String,
    state: CompileState,
    pipeline: Option<B::Pipeline>,
    playback: PlaybackState,
    observers: Observers,
}

impl<B: GpuBackend> ShaderPipelineManager<B> {
    /// Creates a manager holding the default fragment source.
    ///
    /// Nothing is compiled until [`recompile`](Self::recompile) is called.
    pub fn new(backend: B) -> Self {
        Self::with_source(backend, DEFAULT_FRAGMENT_SOURCE)
    }

    pub fn with_source(backend: B, source: impl Into<String>) -> Self {
        Self {
            backend,
            source: source.into(),
            state: CompileState::Loading,
            pipeline: None,
            playback: PlaybackState::default(),
            observers: Observers::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replaces the stored source without compiling it.
    pub fn set_source(&mut self, text: impl Into<String>) {
        self.source = text.into();
    }

    pub fn compile_state(&self) -> &CompileState {
        &self.state
    }

    /// Whether a pipeline is available for the next tick.
    pub fn is_ready(&self) -> bool {
        self.state.is_ready() && self.pipeline.is_some()
    }

    /// Builds the current source into a fresh pipeline.
    ///
    /// The previous pipeline is released before the attempt starts, so a
    /// failed compile stops drawing until the next successful one.
    pub fn recompile(&mut self) -> &CompileState {
        self.pipeline = None;
        self.transition(CompileState::Loading);

        let started = Instant::now();
        let result = build_program(&self.source)
            .and_then(|program| self.backend.create_pipeline(&program));
        let elapsed_ms = started.elapsed().as_secs_f32() * 1000.0;

        match result {
            Ok(pipeline) => {
                self.pipeline = Some(pipeline);
                info!(elapsed_ms, "shader pipeline ready");
                self.transition(CompileState::Ready);
            }
            Err(err) => {
                warn!(elapsed_ms, error = %err, "shader recompile failed");
                self.transition(CompileState::Error(err));
            }
        }
        &self.state
    }

    /// Restores the default source and recompiles it.
    pub fn reset(&mut self) -> &CompileState {
        debug!("restoring default fragment source");
        self.source = DEFAULT_FRAGMENT_SOURCE.to_string();
        self.recompile()
    }

    pub fn play(&mut self, flag: bool) {
        self.playback.is_playing = flag;
        self.publish();
    }

    pub fn toggle_play(&mut self) {
        self.play(!self.playback.is_playing);
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing
    }

    pub fn speed_level(&self) -> f32 {
        self.playback.speed_level
    }

    /// Sets the speed level, clamped into the mapper's range.
    ///
    /// Fractional levels are kept as-is and run at the fallback multiplier.
    pub fn set_speed_level(&mut self, level: f32) {
        self.playback.speed_level = if level.is_nan() {
            SpeedMapper::DEFAULT_LEVEL
        } else {
            level.clamp(SpeedMapper::MIN_LEVEL, SpeedMapper::MAX_LEVEL)
        };
        self.publish();
    }

    /// Moves the speed level by whole steps.
    pub fn step_speed(&mut self, delta: i32) {
        self.set_speed_level(SpeedMapper::step(self.playback.speed_level, delta));
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            compile_state: self.state.clone(),
            is_playing: self.playback.is_playing,
            speed_level: self.playback.speed_level,
        }
    }

    /// Registers `observer`; it runs after every published mutation.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&StateSnapshot) + 'static,
    {
        self.observers.add(Box::new(observer))
    }

    /// Removes an observer. Returns `false` when the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.remove(id)
    }

    pub(crate) fn frame_parts(&mut self) -> Option<FrameParts<'_, B>> {
        if !self.state.is_ready() {
            return None;
        }
        let pipeline = self.pipeline.as_ref()?;
        Some(FrameParts {
            pipeline,
            backend: &mut self.backend,
            playback: &mut self.playback,
        })
    }

    fn transition(&mut self, state: CompileState) {
        self.state = state;
        self.publish();
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        self.observers.notify(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::testing::RecordingBackend;

    fn manager() -> ShaderPipelineManager<RecordingBackend> {
        ShaderPipelineManager::new(RecordingBackend::default())
    }

    #[test]
    fn starts_loading_with_default_source() {
        let manager = manager();
        assert_eq!(manager.compile_state(), &CompileState::Loading);
        assert_eq!(manager.source(), DEFAULT_FRAGMENT_SOURCE);
        assert!(manager.is_playing());
        assert_eq!(manager.speed_level(), SpeedMapper::DEFAULT_LEVEL);
        assert!(!manager.is_ready());
    }

    #[test]
    fn default_source_compiles_to_ready() {
        let mut manager = manager();
        assert_eq!(manager.recompile(), &CompileState::Ready);
        assert!(manager.is_ready());
        assert_eq!(manager.backend().next_pipeline, 1);
    }

    #[test]
    fn set_source_round_trips_without_compiling() {
        let mut manager = manager();
        for text in ["", "fs_main vs_main", "@fragment fn fs_main_not_really() {}"] {
            manager.set_source(text);
            assert_eq!(manager.source(), text);
        }
        assert_eq!(manager.compile_state(), &CompileState::Loading);
        assert_eq!(manager.backend().next_pipeline, 0);
    }

    #[test]
    fn syntax_error_drops_previous_pipeline() {
        let mut manager = manager();
        manager.recompile();
        manager.set_source("@fragment fn fs_main( {");
        let state = manager.recompile().clone();
        assert!(matches!(state, CompileState::Error(CompileError::Build(_))));
        assert!(!manager.is_ready());
        assert!(manager.frame_parts().is_none());
    }

    #[test]
    fn missing_entry_point_is_reported() {
        let mut manager = manager();
        manager.set_source("fn helper() -> f32 { return 1.0; }");
        assert_eq!(
            manager.recompile(),
            &CompileState::Error(CompileError::MissingEntryPoint("fs_main".into()))
        );
    }

    #[test]
    fn assembly_failure_is_recoverable() {
        let mut manager = manager();
        manager.backend.fail_assembly = true;
        assert!(matches!(
            manager.recompile(),
            CompileState::Error(CompileError::PipelineAssembly(_))
        ));

        manager.backend.fail_assembly = false;
        assert_eq!(manager.recompile(), &CompileState::Ready);
    }

    #[test]
    fn error_then_fix_recovers() {
        let mut manager = manager();
        manager.set_source("not wgsl at all");
        assert!(manager.recompile().error().is_some());
        manager.set_source(DEFAULT_FRAGMENT_SOURCE);
        assert_eq!(manager.recompile(), &CompileState::Ready);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut manager = manager();
        manager.set_source("broken");
        manager.recompile();

        let first = manager.reset().clone();
        let first_source = manager.source().to_string();
        let second = manager.reset().clone();

        assert_eq!(first, CompileState::Ready);
        assert_eq!(first, second);
        assert_eq!(first_source, manager.source());
        assert_eq!(manager.source(), DEFAULT_FRAGMENT_SOURCE);
    }

    #[test]
    fn speed_level_is_clamped() {
        let mut manager = manager();
        manager.set_speed_level(40.0);
        assert_eq!(manager.speed_level(), SpeedMapper::MAX_LEVEL);
        manager.set_speed_level(-2.0);
        assert_eq!(manager.speed_level(), SpeedMapper::MIN_LEVEL);
        manager.set_speed_level(2.5);
        assert_eq!(manager.speed_level(), 2.5);
        manager.step_speed(2);
        assert_eq!(manager.speed_level(), 5.0);
    }

    #[test]
    fn observers_see_applied_state_in_order() {
        let mut manager = manager();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        manager.subscribe(move |snapshot| sink.borrow_mut().push(snapshot.clone()));

        manager.recompile();
        manager.play(false);
        manager.set_speed_level(8.0);

        let seen = seen.borrow();
        let states: Vec<_> = seen.iter().map(|s| s.compile_state.clone()).collect();
        assert_eq!(
            states,
            vec![
                CompileState::Loading,
                CompileState::Ready,
                CompileState::Ready,
                CompileState::Ready
            ]
        );
        assert!(!seen[2].is_playing);
        assert_eq!(seen[3].speed_level, 8.0);
        assert_eq!(seen[3].multiplier(), 1.0);
    }

    #[test]
    fn unsubscribed_observers_are_not_called() {
        let mut manager = manager();
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let id = manager.subscribe(move |_| *counter.borrow_mut() += 1);

        manager.toggle_play();
        assert!(manager.unsubscribe(id));
        assert!(!manager.unsubscribe(id));
        manager.toggle_play();

        assert_eq!(*calls.borrow(), 1);
        assert!(manager.is_playing());
    }

    #[test]
    fn paused_clock_does_not_advance() {
        let mut playback = PlaybackState {
            is_playing: false,
            ..PlaybackState::default()
        };
        for _ in 0..120 {
            playback.advance(60.0);
        }
        assert_eq!(playback.accumulated_time, 0.0);
    }
}
