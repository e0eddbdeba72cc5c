use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Instant;

use deltaview_core::{load_volumes, write_stats, write_synthetic_dataset, ProgressEvent, ProgressSink};
use render::ViewportSize;

use crate::config::AppConfig;
use crate::precompute::PrecomputeJob;

const DEFAULT_SYNTH_DIMS: usize = 48;

enum Command {
    Precompute,
    Synth { dims: usize },
}

/// Runs `--precompute` or `--synth` without opening a window. Returns
/// `Ok(false)` when neither was requested.
pub fn maybe_run_headless(args: &[String], config: &AppConfig) -> Result<bool, String> {
    let Some(command) = parse_headless_args(args)? else {
        return Ok(false);
    };
    match command {
        Command::Precompute => run_precompute(config)?,
        Command::Synth { dims } => run_synth(config, dims)?,
    }
    tracing::info!("headless: completed");
    Ok(true)
}

fn parse_headless_args(args: &[String]) -> Result<Option<Command>, String> {
    let mut command = None;
    let mut dims = DEFAULT_SYNTH_DIMS;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--precompute" => command = Some(Command::Precompute),
            "--synth" => command = Some(Command::Synth { dims }),
            "--dims" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--dims requires a value".to_string())?;
                dims = value
                    .parse()
                    .map_err(|_| format!("--dims expects a number, got {:?}", value))?;
            }
            "--help" | "-h" => {
                print_headless_help();
                process::exit(0);
            }
            _ => {}
        }
    }

    Ok(command.map(|command| match command {
        Command::Synth { .. } => Command::Synth { dims },
        other => other,
    }))
}

fn print_headless_help() {
    println!(
        "Usage: deltaview [options]\n\
         \n\
         Dataset options:\n  --config <file.json>\n  --data <dir>\n  --dataset <name>\n  --size <size>\n  --iterations <n>\n  --isovalue <value>\n  --bins <n>\n  --reference <image>\n\
         \n\
         Headless commands:\n  --precompute [--width <px> --height <px>]\n  --synth [--dims <n>]"
    );
}

fn run_precompute(config: &AppConfig) -> Result<(), String> {
    let paths = config.paths();
    let (opacity, uncertainty) = load_volumes(&paths).map_err(|err| err.to_string())?;
    let [width, height] = config.sampler_size;
    let job = PrecomputeJob {
        opacity,
        uncertainty,
        isovalue: config.isovalue,
        size: ViewportSize::new(width, height),
        step_degrees: config.step_degrees,
        view_angle: config.view_angle,
        home: None,
        transfer: None,
    };

    let started = Instant::now();
    let sink: ProgressSink = Arc::new(|event| match event {
        ProgressEvent::Start { total } => tracing::info!("precompute: {} views", total),
        ProgressEvent::Advance { done, fraction } if done % 25 == 0 => {
            tracing::info!("precompute: {:.0}% ({} views)", fraction * 100.0, done)
        }
        _ => {}
    });
    let grid = job.run(None, Some(sink)).map_err(|err| err.to_string())?;
    write_stats(&paths, &grid).map_err(|err| err.to_string())?;
    tracing::info!(
        "precompute: wrote {} and {} in {:.1}s",
        paths.means.display(),
        paths.stddevs.display(),
        started.elapsed().as_secs_f32()
    );
    Ok(())
}

fn run_synth(config: &AppConfig, dims: usize) -> Result<(), String> {
    let folder: PathBuf = config.data_folder.clone();
    std::fs::create_dir_all(&folder)
        .map_err(|err| format!("failed to create {}: {}", folder.display(), err))?;
    let paths = config.paths();
    write_synthetic_dataset(&paths, dims).map_err(|err| err.to_string())?;
    tracing::info!(
        "synth: wrote a {}^3 dataset to {}",
        dims.max(2),
        folder.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_command_means_ui() {
        assert!(parse_headless_args(&args(&["deltaview", "--data", "x"]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn dims_apply_in_any_order() {
        let parsed = parse_headless_args(&args(&["deltaview", "--dims", "12", "--synth"])).unwrap();
        assert!(matches!(parsed, Some(Command::Synth { dims: 12 })));
        let parsed = parse_headless_args(&args(&["deltaview", "--synth", "--dims", "10"])).unwrap();
        assert!(matches!(parsed, Some(Command::Synth { dims: 10 })));
        assert!(parse_headless_args(&args(&["deltaview", "--synth", "--dims"])).is_err());
    }

    #[test]
    fn synth_then_precompute_writes_tables() {
        let folder = std::env::temp_dir().join(format!("deltaview_headless_{}", process::id()));
        let mut config = AppConfig::default();
        config.data_folder = folder.clone();
        config.sampler_size = [4, 4];

        assert!(maybe_run_headless(&args(&["deltaview", "--synth", "--dims", "8"]), &config).unwrap());
        assert!(config.paths().opacity.exists());
        assert!(maybe_run_headless(&args(&["deltaview", "--precompute"]), &config).unwrap());
        let means = std::fs::read_to_string(config.paths().means).unwrap();
        assert_eq!(means.lines().count(), 25);

        let _ = std::fs::remove_dir_all(folder);
    }
}
