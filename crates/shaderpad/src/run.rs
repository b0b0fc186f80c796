use std::path::Path;

use anyhow::{anyhow, Context, Result};
use renderer::{
    build_program, Renderer, RendererConfig, SandboxCommand, DEFAULT_FRAGMENT_SOURCE,
};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::editor::{FileSource, SourceWatcher};
use crate::paths::AppPaths;

pub fn run(cli: Cli) -> Result<()> {
    if cli.print_default {
        print!("{DEFAULT_FRAGMENT_SOURCE}");
        return Ok(());
    }

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => AppPaths::discover()?.config_file(),
    };
    let mut config = AppConfig::load(&config_path)?;
    apply_overrides(&mut config, &cli);
    config.validate().with_context(|| {
        format!("invalid settings (config file {})", config_path.display())
    })?;
    tracing::debug!(config = %config_path.display(), ?config, "resolved shaderpad settings");

    if cli.check {
        return check_shader(config.editor.shader.as_deref());
    }

    run_preview(config)
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(shader) = &cli.shader {
        config.editor.shader = Some(shader.clone());
    }
    if let Some(level) = cli.speed {
        config.playback.speed_level = level;
    }
    if let Some(rate) = cli.fps {
        config.playback.refresh_rate = rate;
    }
    if let Some((width, height)) = cli.size {
        config.window.width = width;
        config.window.height = height;
    }
    if cli.paused {
        config.playback.start_paused = true;
    }
    if cli.no_watch {
        config.editor.watch = false;
    }
    if let Some(power) = cli.gpu_power {
        config.gpu.power = power;
    }
}

/// Validates a shader with the same front-end the preview uses, no GPU needed.
fn check_shader(path: Option<&Path>) -> Result<()> {
    let (label, source) = match path {
        Some(path) => {
            let source = FileSource::open(path)?;
            (path.display().to_string(), source.get().to_string())
        }
        None => ("<default>".to_string(), DEFAULT_FRAGMENT_SOURCE.to_string()),
    };

    match build_program(&source) {
        Ok(_) => {
            println!("{label}: ok");
            Ok(())
        }
        Err(err) => {
            eprintln!("{label}: {err}");
            Err(anyhow!("shader check failed for {label}"))
        }
    }
}

fn run_preview(config: AppConfig) -> Result<()> {
    let source = config
        .editor
        .shader
        .as_deref()
        .map(FileSource::open_or_create)
        .transpose()?;

    let renderer_config = RendererConfig {
        surface_size: (config.window.width, config.window.height),
        refresh_rate: config.playback.refresh_rate,
        initial_source: source
            .as_ref()
            .map(|source| source.get().to_string())
            .unwrap_or_else(|| DEFAULT_FRAGMENT_SOURCE.to_string()),
        auto_recompile: config.editor.auto_recompile,
        gpu_power: config.gpu.power,
        title: window_title(source.as_ref().map(FileSource::path)),
    };

    let startup = startup_commands(&config);
    let watch = config.editor.watch;
    let debounce = config.editor.debounce;
    tracing::info!(
        shader = ?source.as_ref().map(|source| source.path().to_path_buf()),
        watch,
        "starting shaderpad preview"
    );

    Renderer::new(renderer_config).run(move |control| {
        for command in startup {
            control.send(command)?;
        }
        let Some(source) = source.filter(|_| watch) else {
            return Ok(None);
        };
        let watcher = SourceWatcher::spawn(source, debounce, move |text| {
            control.send(SandboxCommand::SetSource(text))
        })?;
        Ok(Some(watcher))
    })
}

/// Playback state applied once the preview is up.
fn startup_commands(config: &AppConfig) -> Vec<SandboxCommand> {
    vec![
        SandboxCommand::SetSpeed(config.playback.speed_level),
        SandboxCommand::Play(!config.playback.start_paused),
    ]
}

fn window_title(path: Option<&Path>) -> String {
    match path.and_then(Path::file_name) {
        Some(name) => format!("shaderpad: {}", name.to_string_lossy()),
        None => "shaderpad".to_string(),
    }
}
