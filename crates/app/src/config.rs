use std::path::{Path, PathBuf};

use deltaview_core::{DatasetId, DatasetPaths, PoleBand, ANGLE_STEP_DEGREES};
use deltaview_scene::DEFAULT_VIEW_ANGLE;
use render::{DEFAULT_NUM_BINS, DEFAULT_UNCERTAINTY_FILTER};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub data_folder: PathBuf,
    pub dataset: DatasetId,
    pub isovalue: f64,
    pub uncertainty_filter: f64,
    pub num_bins: usize,
    pub step_degrees: f64,
    pub pole_band: PoleBand,
    pub sampler_size: [usize; 2],
    /// Interactive views render at this fraction of their on-screen size.
    pub render_scale: f32,
    pub view_angle: f64,
    pub reference_image: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_folder: PathBuf::from("data"),
            dataset: DatasetId::default(),
            isovalue: 0.90,
            uncertainty_filter: DEFAULT_UNCERTAINTY_FILTER,
            num_bins: DEFAULT_NUM_BINS,
            step_degrees: ANGLE_STEP_DEGREES,
            pole_band: PoleBand::default(),
            sampler_size: [128, 128],
            render_scale: 0.5,
            view_angle: DEFAULT_VIEW_ANGLE,
            reference_image: None,
        }
    }
}

impl AppConfig {
    /// `--config` first, then individual flags on top.
    pub(crate) fn from_args(args: &[String]) -> Result<Self, String> {
        let mut config = match flag_value(args, "--config")? {
            Some(path) => Self::load(Path::new(path))?,
            None => Self::default(),
        };
        config.apply_args(args)?;
        Ok(config)
    }

    pub(crate) fn load(path: &Path) -> Result<Self, String> {
        let data = std::fs::read(path)
            .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
        let mut config: Self = serde_json::from_slice(&data)
            .map_err(|err| format!("invalid config {}: {}", path.display(), err))?;
        config
            .validate()
            .map_err(|err| format!("invalid config {}: {}", path.display(), err))?;
        Ok(config)
    }

    pub(crate) fn save(&self, path: &Path) -> Result<(), String> {
        let data = serde_json::to_vec_pretty(self).map_err(|err| err.to_string())?;
        std::fs::write(path, data).map_err(|err| err.to_string())
    }

    pub(crate) fn apply_args(&mut self, args: &[String]) -> Result<(), String> {
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let mut value = |name: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| format!("{} requires a value", name))
            };
            match arg.as_str() {
                "--data" => self.data_folder = PathBuf::from(value("--data")?),
                "--dataset" => self.dataset.dataset = value("--dataset")?,
                "--size" => self.dataset.size = value("--size")?,
                "--iterations" => self.dataset.iterations = value("--iterations")?,
                "--isovalue" => self.isovalue = parse_number(&value("--isovalue")?, "--isovalue")?,
                "--bins" => self.num_bins = parse_number(&value("--bins")?, "--bins")?,
                "--width" => self.sampler_size[0] = parse_number(&value("--width")?, "--width")?,
                "--height" => {
                    self.sampler_size[1] = parse_number(&value("--height")?, "--height")?
                }
                "--reference" => self.reference_image = Some(PathBuf::from(value("--reference")?)),
                "--config" => {
                    value("--config")?;
                }
                _ => {}
            }
        }
        self.validate()
    }

    pub(crate) fn paths(&self) -> DatasetPaths {
        DatasetPaths::new(&self.data_folder, &self.dataset)
    }

    fn validate(&mut self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.isovalue) {
            return Err(format!("isovalue must be in [0, 1], got {}", self.isovalue));
        }
        // stored tables and heatmaps are laid out for this step only
        if self.step_degrees != ANGLE_STEP_DEGREES {
            return Err(format!(
                "angular step must be {} degrees, got {}",
                ANGLE_STEP_DEGREES, self.step_degrees
            ));
        }
        if self.pole_band.start > self.pole_band.end {
            return Err(format!(
                "pole band start {} is past its end {}",
                self.pole_band.start, self.pole_band.end
            ));
        }
        self.num_bins = self.num_bins.max(1);
        self.sampler_size = self.sampler_size.map(|v| v.max(1));
        self.render_scale = self.render_scale.clamp(0.1, 1.0);
        Ok(())
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>, String> {
    match args.iter().position(|arg| arg == flag) {
        Some(index) => args
            .get(index + 1)
            .map(|value| Some(value.as_str()))
            .ok_or_else(|| format!("{} requires a value", flag)),
        None => Ok(None),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("{} expects a number, got {:?}", flag, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_match_the_viewer() {
        let config = AppConfig::default();
        assert_eq!(config.isovalue, 0.90);
        assert_eq!(config.uncertainty_filter, 0.1);
        assert_eq!(config.num_bins, 20);
        assert_eq!(config.pole_band, PoleBand { start: 6, end: 19 });
        assert_eq!(
            config.paths().opacity,
            PathBuf::from("data/chair_full_200000_opacity.vtk")
        );
    }

    #[test]
    fn flags_override_defaults() {
        let config = AppConfig::from_args(&args(&[
            "deltaview",
            "--data",
            "scenes",
            "--dataset",
            "lego",
            "--bins",
            "32",
            "--width",
            "64",
        ]))
        .unwrap();
        assert_eq!(config.data_folder, PathBuf::from("scenes"));
        assert_eq!(config.dataset.dataset, "lego");
        assert_eq!(config.dataset.size, "full");
        assert_eq!(config.num_bins, 32);
        assert_eq!(config.sampler_size, [64, 128]);
    }

    #[test]
    fn bad_flags_are_reported() {
        assert!(AppConfig::from_args(&args(&["deltaview", "--bins"])).is_err());
        assert!(AppConfig::from_args(&args(&["deltaview", "--bins", "many"])).is_err());
        assert!(AppConfig::from_args(&args(&["deltaview", "--isovalue", "2"])).is_err());
    }

    #[test]
    fn only_the_stored_angular_step_is_accepted() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());
        config.step_degrees = 30.0;
        let err = config.validate().unwrap_err();
        assert!(err.contains("angular step"));

        let path = std::env::temp_dir().join(format!("deltaview_step_{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "step_degrees": 30.0 }"#).unwrap();
        let result = AppConfig::from_args(&args(&["deltaview", "--config", path.to_str().unwrap()]));
        assert!(result.is_err());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "isovalue": 0.5, "dataset": { "dataset": "ship" } }"#).unwrap();
        assert_eq!(config.isovalue, 0.5);
        assert_eq!(config.dataset.dataset, "ship");
        assert_eq!(config.dataset.iterations, "200000");
        assert_eq!(config.num_bins, 20);
    }

    #[test]
    fn config_file_round_trips() {
        let path = std::env::temp_dir().join(format!("deltaview_config_{}.json", std::process::id()));
        let mut config = AppConfig::default();
        config.num_bins = 32;
        config.save(&path).unwrap();
        let loaded = AppConfig::from_args(&args(&[
            "deltaview",
            "--config",
            path.to_str().unwrap(),
            "--size",
            "half",
        ]))
        .unwrap();
        assert_eq!(loaded.num_bins, 32);
        assert_eq!(loaded.dataset.size, "half");
        let _ = std::fs::remove_file(path);
    }
}
