use std::cell::RefCell;
use std::rc::Rc;

use renderer::{
    CompileError, CompileState, GpuBackend, RenderLoopDriver, ShaderPipelineManager,
    ShaderProgram, SpeedMapper, TickOutcome, UniformBlock, DEFAULT_FRAGMENT_SOURCE,
};

#[derive(Default)]
struct FakeGpu {
    compiled: Vec<String>,
    last_uniforms: Option<UniformBlock>,
    presented: usize,
}

impl GpuBackend for FakeGpu {
    type Pipeline = usize;
    type Frame = ();

    fn create_pipeline(&mut self, program: &ShaderProgram) -> Result<usize, CompileError> {
        self.compiled.push(program.source().to_string());
        Ok(self.compiled.len())
    }

    fn write_uniforms(&mut self, block: &UniformBlock) {
        self.last_uniforms = Some(*block);
    }

    fn submit(&mut self, _pipeline: &usize, _frame: ()) {
        self.presented += 1;
    }
}

fn run_ticks(
    driver: &mut RenderLoopDriver,
    manager: &mut ShaderPipelineManager<FakeGpu>,
    ticks: usize,
) {
    for _ in 0..ticks {
        driver.tick(manager, Some(()));
    }
}

#[test]
fn edit_session_keeps_clock_across_recompiles() {
    let mut manager = ShaderPipelineManager::new(FakeGpu::default());
    let mut driver = RenderLoopDriver::new(640, 480, 60.0);

    assert_eq!(manager.recompile(), &CompileState::Ready);
    manager.set_speed_level(SpeedMapper::MAX_LEVEL);
    run_ticks(&mut driver, &mut manager, 60);
    let after_first_second = manager.playback().accumulated_time;
    assert!((after_first_second - 10.0).abs() < 1e-9);

    // A broken edit stops drawing but leaves the clock untouched.
    manager.set_source("@fragment fn fs_main() -> @location(0) vec4<f32> { return 1.0; }");
    assert!(matches!(
        manager.recompile(),
        CompileState::Error(CompileError::Build(_))
    ));
    assert_eq!(
        driver.tick(&mut manager, Some(())),
        TickOutcome::PipelineNotReady
    );
    assert_eq!(manager.playback().accumulated_time, after_first_second);

    manager.set_source(DEFAULT_FRAGMENT_SOURCE);
    assert_eq!(manager.recompile(), &CompileState::Ready);
    run_ticks(&mut driver, &mut manager, 6);

    let gpu = manager.backend();
    assert_eq!(gpu.compiled.len(), 2);
    assert_eq!(gpu.presented, 66);
    let block = gpu.last_uniforms.expect("uniforms written");
    assert!((f64::from(block.time) - 11.0).abs() < 1e-4);
    assert_eq!((block.width, block.height), (640.0, 480.0));
}

#[test]
fn observers_track_playback_controls() {
    let mut manager = ShaderPipelineManager::new(FakeGpu::default());
    let titles = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&titles);
    manager.subscribe(move |snapshot| {
        sink.borrow_mut()
            .push(format!("{:?}/{}/{}", snapshot.compile_state, snapshot.is_playing, snapshot.multiplier()));
    });

    manager.recompile();
    manager.play(false);
    manager.step_speed(-4);

    assert_eq!(
        titles.borrow().as_slice(),
        [
            "Loading/true/0.75",
            "Ready/true/0.75",
            "Ready/false/0.75",
            "Ready/false/0.1",
        ]
    );
}

#[test]
fn composed_program_carries_preamble() {
    let mut manager = ShaderPipelineManager::new(FakeGpu::default());
    manager.recompile();
    let compiled = &manager.backend().compiled[0];
    assert!(compiled.starts_with(renderer::PREAMBLE));
    assert!(compiled.ends_with(DEFAULT_FRAGMENT_SOURCE));
}
