use std::path::PathBuf;

use thiserror::Error;

//
// ──────────────────────────────────────────────────────────────
//   Chart errors
//
//   Everything here is fatal at init time except CapacityExceeded,
//   which callers may surface and keep running with the old count.
// ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
pub enum ChartError
{
  #[error("requested {requested} cube instances but the chart holds at most {capacity}")]
  CapacityExceeded
  {
    requested: usize, capacity: usize
  },

  #[error("cannot read shader asset {path}")]
  ShaderAsset
  {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("shader pipeline '{name}' failed to build:\n{log}")]
  ShaderCompile
  {
    name: String, log: String
  },

  #[error("cannot read config file {path}")]
  ConfigIo
  {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config file {path}")]
  Config
  {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}
