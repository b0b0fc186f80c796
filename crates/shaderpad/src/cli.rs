use std::path::PathBuf;

use clap::Parser;
use renderer::GpuPowerPreference;

#[derive(Parser, Debug)]
#[command(
    name = "shaderpad",
    author,
    version,
    about = "Live WGSL fragment shader sandbox",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Fragment shader file to edit; created with the default shader if missing.
    #[arg(value_name = "SHADER")]
    pub shader: Option<PathBuf>,

    /// Configuration file (defaults to `shaderpad.toml` in the config directory).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Initial speed level (1-17, 8 is real time).
    #[arg(long, value_name = "LEVEL")]
    pub speed: Option<f32>,

    /// Refresh rate the animation clock assumes.
    #[arg(long, value_name = "HZ")]
    pub fps: Option<f32>,

    /// Preview surface size in physical pixels (e.g. `800x800`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Start with the animation clock paused.
    #[arg(long)]
    pub paused: bool,

    /// Do not reload the shader file when it changes on disk.
    #[arg(long)]
    pub no_watch: bool,

    /// Adapter preference: `low` or `high`.
    #[arg(long, value_name = "POWER", value_parser = parse_gpu_power)]
    pub gpu_power: Option<GpuPowerPreference>,

    /// Validate the shader without opening a window, then exit.
    #[arg(long)]
    pub check: bool,

    /// Print the built-in default fragment shader and exit.
    #[arg(long, conflicts_with = "check")]
    pub print_default: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_gpu_power(value: &str) -> Result<GpuPowerPreference, String> {
    if value.trim().is_empty() {
        return Err("GPU power preference must not be empty".to_string());
    }
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_surface_sizes() {
        assert_eq!(parse_size("800x600").unwrap(), (800, 600));
        assert_eq!(parse_size(" 1024X768 ").unwrap(), (1024, 768));
        assert!(parse_size("800").is_err());
        assert!(parse_size("0x600").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "shaderpad",
            "demo.wgsl",
            "--speed",
            "8",
            "--size",
            "640x480",
            "--gpu-power",
            "low",
            "--paused",
        ])
        .unwrap();
        assert_eq!(cli.shader, Some(PathBuf::from("demo.wgsl")));
        assert_eq!(cli.speed, Some(8.0));
        assert_eq!(cli.size, Some((640, 480)));
        assert_eq!(cli.gpu_power, Some(GpuPowerPreference::Low));
        assert!(cli.paused);
        assert!(!cli.no_watch);
    }

    #[test]
    fn check_conflicts_with_print_default() {
        assert!(Cli::try_parse_from(["shaderpad", "--check", "--print-default"]).is_err());
    }
}
