use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ChartError;
use crate::renderer::cube::MAX_CUBES_PER_CHART;

//
// ──────────────────────────────────────────────────────────────
//   Runtime configuration
//
//   Looked up at $JEDI_CONFIG, then <exe dir>/jeditrader.json.
//   A missing file means defaults; a malformed one is fatal.
// ──────────────────────────────────────────────────────────────
//

pub const CONFIG_ENV: &str = "JEDI_CONFIG";
pub const CONFIG_FILE: &str = "jeditrader.json";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy
{
  /// Release every GPU object in dependency order.
  #[default]
  Full,
  /// Leak GPU objects and let process exit reclaim them.
  Skip,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
  pub window_width: u32,
  pub window_height: u32,

  pub fov_degrees: f32,
  pub z_near: f32,
  pub z_far: f32,

  pub move_speed: f32,
  pub look_speed: f32,
  pub couple_strafe_to_aspect: bool,

  pub cube_capacity: usize,
  pub initial_cubes: usize,

  pub shutdown: ShutdownPolicy,
  pub show_hud: bool,
  pub vsync: bool,
}

impl Default for Config
{
  fn default() -> Self
  {
    Self {
      window_width: 1920,
      window_height: 1080,

      fov_degrees: 45.0,
      z_near: 0.01,
      z_far: 100.0,

      move_speed: 5.0,
      look_speed: 0.25,
      couple_strafe_to_aspect: true,

      cube_capacity: MAX_CUBES_PER_CHART,
      initial_cubes: 1,

      shutdown: ShutdownPolicy::Full,
      show_hud: true,
      vsync: true,
    }
  }
}

impl Config
{
  /// Load from the first config file that exists, or fall back to defaults.
  pub fn load() -> Result<Self, ChartError>
  {
    match locate()
    {
      Some(path) => Self::from_file(&path),
      None =>
      {
        log::info!("No config file found, using defaults");
        Ok(Self::default())
      }
    }
  }

  pub fn from_file(path: &Path) -> Result<Self, ChartError>
  {
    let text = std::fs::read_to_string(path).map_err(|source| ChartError::ConfigIo { path: path.to_path_buf(), source })?;

    let config = Self::from_json(&text).map_err(|source| ChartError::Config { path: path.to_path_buf(), source })?;

    log::info!("Loaded config from {}", path.display());
    Ok(config)
  }

  pub fn from_json(text: &str) -> Result<Self, serde_json::Error>
  {
    let config: Self = serde_json::from_str(text)?;
    Ok(config.sanitized())
  }

  /// Replace values the renderer cannot work with.
  fn sanitized(mut self) -> Self
  {
    let defaults = Self::default();

    if self.cube_capacity > MAX_CUBES_PER_CHART
    {
      log::warn!("cube_capacity {} clamped to {}", self.cube_capacity, MAX_CUBES_PER_CHART);
      self.cube_capacity = MAX_CUBES_PER_CHART;
    }

    if self.initial_cubes > self.cube_capacity
    {
      log::warn!("initial_cubes {} clamped to capacity {}", self.initial_cubes, self.cube_capacity);
      self.initial_cubes = self.cube_capacity;
    }

    if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0)
    {
      log::warn!("fov_degrees {} out of range, using {}", self.fov_degrees, defaults.fov_degrees);
      self.fov_degrees = defaults.fov_degrees;
    }

    if !(self.z_near > 0.0 && self.z_far > self.z_near)
    {
      log::warn!("clip planes {}..{} invalid, using {}..{}", self.z_near, self.z_far, defaults.z_near, defaults.z_far);
      self.z_near = defaults.z_near;
      self.z_far = defaults.z_far;
    }

    if self.window_width == 0 || self.window_height == 0
    {
      self.window_width = defaults.window_width;
      self.window_height = defaults.window_height;
    }

    self
  }
}

fn locate() -> Option<PathBuf>
{
  if let Some(path) = std::env::var_os(CONFIG_ENV)
  {
    return Some(PathBuf::from(path));
  }

  let exe = std::env::current_exe().ok()?;
  let path = exe.parent()?.join(CONFIG_FILE);
  path.is_file().then_some(path)
}

#[cfg(test)]
mod tests
{
  use super::*;

  #[test]
  fn empty_object_is_all_defaults()
  {
    assert_eq!(Config::from_json("{}").unwrap(), Config::default());
  }

  #[test]
  fn partial_file_overrides_named_fields()
  {
    let config = Config::from_json(r#"{ "move_speed": 12.5, "shutdown": "skip", "show_hud": false }"#).unwrap();

    assert_eq!(config.move_speed, 12.5);
    assert_eq!(config.shutdown, ShutdownPolicy::Skip);
    assert!(!config.show_hud);
    assert_eq!(config.fov_degrees, 45.0);
  }

  #[test]
  fn capacity_is_clamped()
  {
    let config = Config::from_json(r#"{ "cube_capacity": 5000000, "initial_cubes": 9000000 }"#).unwrap();

    assert_eq!(config.cube_capacity, MAX_CUBES_PER_CHART);
    assert_eq!(config.initial_cubes, MAX_CUBES_PER_CHART);
  }

  #[test]
  fn bad_clip_planes_fall_back()
  {
    let config = Config::from_json(r#"{ "z_near": 10.0, "z_far": 10.0, "fov_degrees": 180.0 }"#).unwrap();

    assert_eq!((config.z_near, config.z_far), (0.01, 100.0));
    assert_eq!(config.fov_degrees, 45.0);
  }

  #[test]
  fn malformed_json_is_an_error()
  {
    assert!(Config::from_json("{ move_speed: }").is_err());
    assert!(Config::from_json(r#"{ "shutdown": "sometimes" }"#).is_err());
  }

  #[test]
  fn missing_file_reports_path()
  {
    let path = Path::new("/nonexistent/jeditrader.json");

    match Config::from_file(path)
    {
      Err(ChartError::ConfigIo { path: reported, .. }) => assert_eq!(reported, path),
      other => panic!("expected ConfigIo, got {other:?}"),
    }
  }
}
