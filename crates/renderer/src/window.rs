use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use tracing::{debug, error, info};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::gpu::{GpuContext, WgpuBackend};
use crate::manager::{CompileState, ShaderPipelineManager, StateSnapshot};
use crate::runtime::{FramePacer, RenderLoopDriver};
use crate::types::RendererConfig;

/// Requests applied on the event-loop thread, which owns all sandbox state.
#[derive(Debug, Clone, PartialEq)]
pub enum SandboxCommand {
    /// New editor text; recompiled immediately when auto-recompile is on.
    SetSource(String),
    Recompile,
    Reset,
    Play(bool),
    TogglePlay,
    SetSpeed(f32),
    StepSpeed(i32),
    Shutdown,
}

/// Thread-safe handle for driving the preview from outside the event loop.
#[derive(Clone)]
pub struct ControlHandle {
    proxy: EventLoopProxy<SandboxCommand>,
}

impl ControlHandle {
    pub fn send(&self, command: SandboxCommand) -> Result<()> {
        self.proxy
            .send_event(command)
            .map_err(|_| anyhow!("preview window has already closed"))
    }
}

/// Aggregates GPU and sandbox state for the preview window.
struct WindowState {
    window: Arc<Window>,
    context: GpuContext,
    manager: ShaderPipelineManager<WgpuBackend>,
    driver: RenderLoopDriver,
    auto_recompile: bool,
}

impl WindowState {
    fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let context = GpuContext::new(window.clone(), window.inner_size(), config.gpu_power)?;
        let backend = WgpuBackend::new(&context);

        let mut manager = ShaderPipelineManager::with_source(backend, config.initial_source.clone());

        let title_window = window.clone();
        let base_title = config.title.clone();
        manager.subscribe(move |snapshot| {
            title_window.set_title(&status_title(&base_title, snapshot));
        });
        manager.recompile();

        let driver = RenderLoopDriver::new(
            context.size.width,
            context.size.height,
            config.refresh_rate,
        );

        Ok(Self {
            window,
            context,
            manager,
            driver,
            auto_recompile: config.auto_recompile,
        })
    }

    /// Applies a command; returns false when the window should close.
    fn apply(&mut self, command: SandboxCommand) -> bool {
        match command {
            SandboxCommand::SetSource(text) => {
                self.manager.set_source(text);
                if self.auto_recompile {
                    self.manager.recompile();
                }
            }
            SandboxCommand::Recompile => {
                self.manager.recompile();
            }
            SandboxCommand::Reset => {
                self.manager.reset();
            }
            SandboxCommand::Play(flag) => self.manager.play(flag),
            SandboxCommand::TogglePlay => self.manager.toggle_play(),
            SandboxCommand::SetSpeed(level) => self.manager.set_speed_level(level),
            SandboxCommand::StepSpeed(delta) => self.manager.step_speed(delta),
            SandboxCommand::Shutdown => return false,
        }
        true
    }

    fn render(&mut self) -> Result<()> {
        let frame = self.context.acquire_frame()?;
        self.driver.tick(&mut self.manager, frame);
        Ok(())
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        // Uniform dimensions stay fixed; only the swapchain follows the window.
        debug!(width = new_size.width, height = new_size.height, "surface resized");
        self.context.resize(new_size);
    }
}

/// Opens the preview window and runs the event loop until it closes.
///
/// `setup` runs once the loop exists and receives a [`ControlHandle`]; the
/// value it returns is kept alive until the loop exits.
pub(crate) fn run<G, F>(config: RendererConfig, setup: F) -> Result<()>
where
    F: FnOnce(ControlHandle) -> Result<G>,
{
    let event_loop = EventLoopBuilder::<SandboxCommand>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let proxy = event_loop.create_proxy();

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(window_size)
        .with_resizable(false)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, &config)?;
    let _guard = setup(ControlHandle { proxy })?;
    let mut pacer = FramePacer::new(config.refresh_rate);
    let mut failure = None;

    info!("preview running: space play/pause, enter recompile, r reset, arrows speed");

    let run_result = event_loop.run(|event, elwt| match event {
        Event::UserEvent(command) => {
            if !state.apply(command) {
                elwt.exit();
            }
        }
        Event::WindowEvent { window_id, event } if window_id == state.window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    if let Some(command) = command_for_key(&event.logical_key) {
                        if !state.apply(command) {
                            elwt.exit();
                        }
                    }
                }
            }
            WindowEvent::Resized(new_size) => state.resize(new_size),
            WindowEvent::RedrawRequested => {
                if let Err(err) = state.render() {
                    error!(error = %err, "render loop stopped");
                    failure = Some(err);
                    elwt.exit();
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            if pacer.ready_for_frame(now) {
                state.window.request_redraw();
            }
            match pacer.next_deadline() {
                Some(deadline) => elwt.set_control_flow(ControlFlow::WaitUntil(deadline)),
                None => elwt.set_control_flow(ControlFlow::Wait),
            }
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))?;
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Maps preview keyboard shortcuts onto sandbox commands.
pub(crate) fn command_for_key(key: &Key) -> Option<SandboxCommand> {
    match key {
        Key::Named(NamedKey::Space) => Some(SandboxCommand::TogglePlay),
        Key::Named(NamedKey::Enter) | Key::Named(NamedKey::F5) => Some(SandboxCommand::Recompile),
        Key::Named(NamedKey::ArrowUp) | Key::Named(NamedKey::ArrowRight) => {
            Some(SandboxCommand::StepSpeed(1))
        }
        Key::Named(NamedKey::ArrowDown) | Key::Named(NamedKey::ArrowLeft) => {
            Some(SandboxCommand::StepSpeed(-1))
        }
        Key::Named(NamedKey::Escape) => Some(SandboxCommand::Shutdown),
        Key::Character(value) => match value.as_str() {
            " " => Some(SandboxCommand::TogglePlay),
            "r" | "R" => Some(SandboxCommand::Reset),
            "+" | "=" => Some(SandboxCommand::StepSpeed(1)),
            "-" => Some(SandboxCommand::StepSpeed(-1)),
            _ => None,
        },
        _ => None,
    }
}

/// Window title for a state snapshot, e.g. `shaderpad | ready | 0.75x | playing`.
///
/// Failed compiles show the first line of the error.
pub(crate) fn status_title(base: &str, snapshot: &StateSnapshot) -> String {
    let status = match &snapshot.compile_state {
        CompileState::Loading => "compiling".to_string(),
        CompileState::Error(err) => format!("error: {}", err.summary()),
        CompileState::Ready => "ready".to_string(),
    };
    let playback = if snapshot.is_playing {
        "playing"
    } else {
        "paused"
    };
    format!(
        "{base} | {status} | {:.2}x | {playback}",
        snapshot.multiplier()
    )
}
