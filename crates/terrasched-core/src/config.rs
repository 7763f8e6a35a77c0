use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pool::PriorityMetric;

/// Scheduler configuration loaded from `~/.config/terrasched/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Worker threads in the pool. `None` = available parallelism.
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// How runnable jobs are ranked against the priority chunks: "chebyshev" (default) or "euclidean".
    #[serde(default)]
    pub priority_metric: PriorityMetric,
    /// World cells per chunk side. Used to find the chunks a dig circle touches.
    pub chunk_size: u32,
    /// Cap on RebuildMesh admissions per terrain tick (None = no cap).
    #[serde(default)]
    pub max_rebuilds_per_tick: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            priority_metric: PriorityMetric::Chebyshev,
            chunk_size: 32,
            max_rebuilds_per_tick: None,
        }
    }
}

impl SchedulerConfig {
    /// Worker count to actually start: configured value, else processor count.
    pub fn effective_worker_threads(&self) -> usize {
        self.worker_threads
            .filter(|&n| n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            })
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("terrasched")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SchedulerConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SchedulerConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<SchedulerConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: SchedulerConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_values() {
        let cfg = SchedulerConfig::default();
        assert!(cfg.worker_threads.is_none());
        assert_eq!(cfg.priority_metric, PriorityMetric::Chebyshev);
        assert_eq!(cfg.chunk_size, 32);
        assert!(cfg.max_rebuilds_per_tick.is_none());
        assert!(cfg.effective_worker_threads() >= 1);
    }

    #[test]
    fn config_toml_roundtrip() {
        let mut cfg = SchedulerConfig::default();
        cfg.worker_threads = Some(3);
        cfg.priority_metric = PriorityMetric::Euclidean;
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: SchedulerConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.worker_threads, Some(3));
        assert_eq!(parsed.priority_metric, PriorityMetric::Euclidean);
        assert_eq!(parsed.chunk_size, cfg.chunk_size);
    }

    #[test]
    fn config_toml_minimal() {
        let toml = r#"
            chunk_size = 16
        "#;
        let cfg: SchedulerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.chunk_size, 16);
        assert!(cfg.worker_threads.is_none());
        assert_eq!(cfg.priority_metric, PriorityMetric::Chebyshev);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            worker_threads = 6
            priority_metric = "euclidean"
            chunk_size = 64
            max_rebuilds_per_tick = 8
        "#;
        let cfg: SchedulerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.worker_threads, Some(6));
        assert_eq!(cfg.effective_worker_threads(), 6);
        assert_eq!(cfg.priority_metric, PriorityMetric::Euclidean);
        assert_eq!(cfg.chunk_size, 64);
        assert_eq!(cfg.max_rebuilds_per_tick, Some(8));
    }

    #[test]
    fn zero_workers_falls_back_to_parallelism() {
        let mut cfg = SchedulerConfig::default();
        cfg.worker_threads = Some(0);
        assert!(cfg.effective_worker_threads() >= 1);
    }

    #[test]
    fn load_from_path_reads_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "chunk_size = 8\npriority_metric = \"euclidean\"").unwrap();
        let cfg = load_from_path(f.path()).unwrap();
        assert_eq!(cfg.chunk_size, 8);
        assert_eq!(cfg.priority_metric, PriorityMetric::Euclidean);
    }

    #[test]
    fn load_from_path_rejects_bad_metric() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "chunk_size = 8\npriority_metric = \"manhattan\"").unwrap();
        assert!(load_from_path(f.path()).is_err());
    }
}
