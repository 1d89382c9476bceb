//! Command-line entry point.
//!
//! ```bash
//! # 10 000 unperturbed trials
//! cargo run -p lio-race --release
//!
//! # Reproducible interleavings, with per-trial logging
//! LIO_RACE_SEED=0x2a RUST_LOG=lio_race=trace cargo run -p lio-race
//! ```
//!
//! Exit status: `0` when every trial is accepted, `1` on a rejected trial or
//! a failed setup, `2` on invalid configuration and `3` on a hang.

use std::process::ExitCode;

use lio_race::Config;

fn main() -> ExitCode {
  #[cfg(feature = "tracing")]
  {
    use tracing_subscriber::{EnvFilter, fmt};

    fmt()
      .with_env_filter(
        EnvFilter::try_from_default_env()
          .unwrap_or_else(|_| EnvFilter::new("lio_race=info")),
      )
      .init();
  }

  let config = match Config::from_env() {
    Ok(config) => config,
    Err(err) => {
      eprintln!("lio-race: {err}");
      return ExitCode::from(2);
    }
  };

  match lio_race::run(&config) {
    Ok(report) => {
      println!("{report}");
      ExitCode::SUCCESS
    }
    Err(err) => {
      eprintln!("lio-race: {err}");
      ExitCode::from(if err.is_hang() { 3 } else { 1 })
    }
  }
}
