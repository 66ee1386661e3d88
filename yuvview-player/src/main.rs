//! # yuvview
//!
//! Converts or plays raw interlaced YUV 4:2:0 frame dumps.

mod display;
mod inputs;
mod settings;

use std::path::{Path, PathBuf};

use anyhow::Result;
use yuvview_core::output::{field_output_paths, save_frame};
use yuvview_core::{decode_file, deinterlace_bob, to_rgb, DeinterlaceMode};

use settings::PlayerSettings;

// ============================================================================
// Command Line
// ============================================================================

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    inputs: Vec<String>,
    output: Option<PathBuf>,
    display: bool,
    fps: Option<f64>,
    deinterlace: Option<DeinterlaceMode>,
    threshold: Option<u64>,
    block_size: Option<usize>,
    config: Option<PathBuf>,
    help: bool,
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("Missing value for {}", flag))
}

fn parse_args(args: &[String]) -> Result<CliOptions> {
    let mut opts = CliOptions::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--output" | "-o" => {
                opts.output = Some(PathBuf::from(flag_value(args, i, "--output")?));
                i += 2;
            }
            "--display" | "-d" => {
                opts.display = true;
                i += 1;
            }
            "--fps" => {
                let value = flag_value(args, i, "--fps")?;
                opts.fps = Some(value.parse::<f64>().map_err(|e| {
                    anyhow::anyhow!("Invalid frame rate {}: {}", value, e)
                })?);
                i += 2;
            }
            "--deinterlace" => {
                let value = flag_value(args, i, "--deinterlace")?;
                let mode = match value.parse::<DeinterlaceMode>() {
                    Ok(DeinterlaceMode::Progressive) | Err(_) => {
                        anyhow::bail!("Invalid deinterlace mode {} (expected bob or adaptive)", value)
                    }
                    Ok(mode) => mode,
                };
                opts.deinterlace = Some(mode);
                i += 2;
            }
            "--threshold" => {
                let value = flag_value(args, i, "--threshold")?;
                opts.threshold = Some(value.parse::<u64>().map_err(|e| {
                    anyhow::anyhow!("Invalid threshold {}: {}", value, e)
                })?);
                i += 2;
            }
            "--block-size" => {
                let value = flag_value(args, i, "--block-size")?;
                opts.block_size = Some(value.parse::<usize>().map_err(|e| {
                    anyhow::anyhow!("Invalid block size {}: {}", value, e)
                })?);
                i += 2;
            }
            "--config" => {
                opts.config = Some(PathBuf::from(flag_value(args, i, "--config")?));
                i += 2;
            }
            "--help" | "-h" => {
                opts.help = true;
                i += 1;
            }
            flag if flag.starts_with("--") => {
                anyhow::bail!("Unknown option {}", flag);
            }
            input => {
                opts.inputs.push(input.to_string());
                i += 1;
            }
        }
    }

    Ok(opts)
}

fn print_usage() {
    eprintln!(
        "\nUsage:\n  yuvview [options] <inputs>...\n\n\
         Inputs containing * are glob patterns (* ? [...] in any path component).\n\n\
         Options:\n  \
         --output <file>        write the first input as PPM (or any image format by extension)\n  \
         --display              play all inputs in a window\n  \
         --fps <f>              playback frame rate (default 25)\n  \
         --deinterlace <mode>   bob | adaptive\n  \
         --threshold <n>        adaptive motion threshold, SAD per block (default 3000)\n  \
         --block-size <n>       adaptive block size (default 16)\n  \
         --config <file>        JSON settings file, overridden by flags\n"
    );
}

impl CliOptions {
    fn settings(&self) -> Result<PlayerSettings> {
        let mut settings = match &self.config {
            Some(path) => PlayerSettings::load(path)?,
            None => PlayerSettings::default(),
        };
        if let Some(fps) = self.fps {
            settings.fps = fps;
        }
        if let Some(mode) = self.deinterlace {
            settings.deinterlace = mode;
        }
        if let Some(threshold) = self.threshold {
            settings.threshold = threshold;
        }
        if let Some(block_size) = self.block_size {
            settings.block_size = block_size;
        }
        settings.validate()?;
        Ok(settings)
    }
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("yuvview=info,yuvview_core=info,wgpu=warn,eframe=warn")
        .init();

    let args: Vec<String> = std::env::args().collect();
    let opts = parse_args(&args).inspect_err(|_| print_usage())?;
    if opts.help {
        print_usage();
        return Ok(());
    }

    tracing::info!("yuvview v{}", yuvview_core::VERSION);

    let settings = opts.settings()?;
    let files = inputs::expand_inputs(&opts.inputs)?;
    if files.is_empty() {
        print_usage();
        anyhow::bail!("No input files found");
    }
    tracing::info!(
        "{} input file(s), deinterlace: {}",
        files.len(),
        settings.deinterlace.name()
    );

    if opts.display {
        return display::run_display(files, &settings);
    }

    match &opts.output {
        Some(output) => convert_first(&files, output, settings.deinterlace),
        None => {
            println!("No output file specified and --display not used.");
            Ok(())
        }
    }
}

/// Single-file output: only the first input is converted.
fn convert_first(files: &[PathBuf], output: &Path, mode: DeinterlaceMode) -> Result<()> {
    if files.len() > 1 {
        tracing::warn!(
            "Multiple inputs but single output file specified. Converting only first one."
        );
    }

    let frame = decode_file(&files[0])
        .map_err(|e| anyhow::anyhow!("Error decoding {}: {}", files[0].display(), e))?;

    if mode == DeinterlaceMode::Bob {
        tracing::info!("Bob deinterlacing for single file output: saving 2 files.");
        let (top, bottom) = deinterlace_bob(&frame);
        let (top_path, bottom_path) = field_output_paths(output);
        save_frame(&top_path, &top)?;
        save_frame(&bottom_path, &bottom)?;
    } else {
        save_frame(output, &to_rgb(&frame))?;
    }

    Ok(())
}
