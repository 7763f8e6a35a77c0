//! `terrasched config` – show where the config lives and what is in effect.

use anyhow::Result;
use terrasched_core::config::{self, SchedulerConfig};

pub fn run_config(cfg: &SchedulerConfig) -> Result<()> {
    let path = config::config_path()?;
    println!("config file:     {}", path.display());
    println!("worker threads:  {}", cfg.effective_worker_threads());
    println!("priority metric: {}", serde_json::to_string(&cfg.priority_metric)?);
    println!("chunk size:      {}", cfg.chunk_size);
    match cfg.max_rebuilds_per_tick {
        Some(n) => println!("rebuilds/tick:   {n}"),
        None => println!("rebuilds/tick:   unlimited"),
    }
    Ok(())
}
