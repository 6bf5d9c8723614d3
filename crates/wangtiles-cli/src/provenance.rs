//! Run records for `points`: which dataset was read, what was asked, what came
//! out. Written as `<stem>.provenance.json` beside a points table, or printed
//! as one JSON line when no table is written.

use anyhow::{Context, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use wangtiles::query::TraversalStats;
use wangtiles::TemplateSet;

use crate::output::Format;

/// Dataset a run read.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    Tiles { path: PathBuf },
    Synthetic { seed: u64 },
}

/// Shape of the loaded set, enough to tell two datasets apart at a glance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DatasetShape {
    pub templates: usize,
    pub base_instances: usize,
    pub min_rank: u64,
}

impl DatasetShape {
    pub fn of(set: &TemplateSet) -> Self {
        Self {
            templates: set.len(),
            base_instances: set.base_instances().len(),
            min_rank: set.min_rank(),
        }
    }
}

/// Query parameters after validation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct QueryParams {
    pub bbox: [f64; 4],
    pub max_rank: u64,
    pub batch_capacity: usize,
    pub lattice: Option<[f64; 2]>,
}

/// Traversal counters and the size of the result.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Outcome {
    pub points: usize,
    pub max_depth: Option<u32>,
    pub batches: u64,
    pub instances_visited: u64,
    pub rank_pruned: u64,
    pub spatial_pruned: u64,
    pub elapsed_ms: f64,
}

impl Outcome {
    pub fn new(
        points: usize,
        max_depth: Option<u32>,
        stats: &TraversalStats,
        elapsed_ms: f64,
    ) -> Self {
        Self {
            points,
            max_depth,
            batches: stats.batches,
            instances_visited: stats.instances_visited,
            rank_pruned: stats.rank_pruned,
            spatial_pruned: stats.spatial_pruned,
            elapsed_ms,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub format: Format,
}

/// One `points` run.
#[derive(Clone, Debug, Serialize)]
pub struct RunRecord {
    pub tool: &'static str,
    pub version: &'static str,
    pub code_rev: String,
    pub source: Source,
    pub dataset: DatasetShape,
    pub query: QueryParams,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
}

impl RunRecord {
    pub fn new(
        source: Source,
        dataset: DatasetShape,
        query: QueryParams,
        outcome: Outcome,
    ) -> Self {
        Self {
            tool: "wangtiles",
            version: wangtiles::VERSION,
            code_rev: current_git_rev(),
            source,
            dataset,
            query,
            outcome,
            artifact: None,
        }
    }

    pub fn with_artifact(mut self, path: &Path, format: Format) -> Self {
        self.artifact = Some(Artifact {
            path: path.to_path_buf(),
            format,
        });
        self
    }

    /// Write the record next to its artifact and return the sidecar path.
    pub fn write_sidecar(&self) -> Result<PathBuf> {
        let artifact = self
            .artifact
            .as_ref()
            .context("run record has no artifact to sit beside")?;
        let sidecar = sidecar_path(&artifact.path);
        fs::write(&sidecar, serde_json::to_vec_pretty(self)?)
            .with_context(|| format!("writing {}", sidecar.display()))?;
        Ok(sidecar)
    }
}

fn sidecar_path(artifact: &Path) -> PathBuf {
    let mut name = artifact
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| OsString::from("points"));
    name.push(".provenance.json");
    artifact.with_file_name(name)
}

/// `GIT_COMMIT` at build time, then at run time, then `git rev-parse HEAD`.
fn current_git_rev() -> String {
    if let Some(rev) = option_env!("GIT_COMMIT").filter(|s| !s.is_empty()) {
        return rev.to_string();
    }
    if let Ok(rev) = std::env::var("GIT_COMMIT") {
        if !rev.is_empty() {
            return rev;
        }
    }
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
