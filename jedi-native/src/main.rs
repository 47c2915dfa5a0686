mod app;
mod camera;
mod chart;
mod config;
mod error;
mod input;
mod math;
mod renderer;

use anyhow::Context;

use crate::config::Config;

const DEFAULT_TICKER: &str = "SPY";

fn main()
{
  // RUST_LOG wins when set. Otherwise keep wgpu's internals quiet so
  // validation errors and warnings still reach the console.
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info,wgpu_hal=off,naga=warn")).init();

  if let Err(err) = try_main()
  {
    log::error!("{err:#}");
    std::process::exit(1);
  }
}

fn try_main() -> anyhow::Result<()>
{
  let tickers = tickers_from_args(std::env::args().skip(1));
  let config = Config::load().context("loading configuration")?;

  log::info!("Opening {} chart window(s): {}", tickers.len(), tickers.join(", "));

  app::run(tickers, config)
}

/// One chart window per positional argument.
fn tickers_from_args(args: impl Iterator<Item = String>) -> Vec<String>
{
  let tickers: Vec<String> = args.map(|arg| arg.trim().to_uppercase()).filter(|arg| !arg.is_empty()).collect();

  if tickers.is_empty()
  {
    vec![DEFAULT_TICKER.to_owned()]
  }
  else
  {
    tickers
  }
}
