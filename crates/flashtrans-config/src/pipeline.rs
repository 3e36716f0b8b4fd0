use serde::{Deserialize, Serialize};

pub const MAX_WORKERS: usize = 8;

fn default_workers() -> usize {
    2
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of background workers running backend calls
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl PipelineConfig {
    pub fn worker_count(&self) -> usize {
        self.workers.clamp(1, MAX_WORKERS)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}
