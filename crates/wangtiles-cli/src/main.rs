mod output;
mod provenance;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::time::Instant;
use tracing::Level;
use tracing_subscriber::fmt::SubscriberBuilder;
use wangtiles::prelude::*;

use crate::output::{depth_summary, write_points, PointTable};
use crate::provenance::{DatasetShape, Outcome, QueryParams, RunRecord, Source};

#[derive(Parser)]
#[command(name = "wangtiles")]
#[command(about = "Progressive blue-noise points from hierarchical Wang-tile datasets")]
struct Cmd {
    /// Log at DEBUG instead of INFO
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    action: Action,
}

/// Where the template set comes from.
#[derive(Args, Clone, Debug)]
struct SourceArgs {
    /// Binary `.dat` tile dataset
    #[arg(long, conflicts_with = "synthetic", required_unless_present = "synthetic")]
    tiles: Option<PathBuf>,
    /// Seed for a synthetic template set instead of a file
    #[arg(long)]
    synthetic: Option<u64>,
    /// Skip the rank-order precondition check while loading
    #[arg(long)]
    no_verify: bool,
}

impl SourceArgs {
    fn load(&self) -> Result<TemplateSet> {
        let cfg = LoadCfg {
            verify_rank_order: !self.no_verify,
        };
        match (&self.tiles, self.synthetic) {
            (Some(path), _) => load_tiles_file(path, cfg)
                .with_context(|| format!("loading tiles from {}", path.display())),
            (None, Some(seed)) => {
                synth_tileset(SynthCfg::default(), seed).context("building synthetic set")
            }
            (None, None) => anyhow::bail!("either --tiles or --synthetic is required"),
        }
    }

    fn describe(&self) -> String {
        match (&self.tiles, self.synthetic) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(seed)) => format!("synthetic:{seed}"),
            (None, None) => "none".to_string(),
        }
    }

    fn record(&self) -> Result<Source> {
        match (&self.tiles, self.synthetic) {
            (Some(path), _) => Ok(Source::Tiles { path: path.clone() }),
            (None, Some(seed)) => Ok(Source::Synthetic { seed }),
            (None, None) => anyhow::bail!("either --tiles or --synthetic is required"),
        }
    }
}

#[derive(Subcommand)]
enum Action {
    /// Query points in a box up to a rank threshold
    Points {
        #[command(flatten)]
        source: SourceArgs,
        /// Query box MIN_X MIN_Y MAX_X MAX_Y (half-open)
        #[arg(long, num_args = 4, allow_negative_numbers = true,
              value_names = ["MIN_X", "MIN_Y", "MAX_X", "MAX_Y"],
              default_values_t = [0.0, 0.0, 1.0, 1.0])]
        bbox: Vec<f64>,
        /// Keep points with rank <= N
        #[arg(long, allow_negative_numbers = true)]
        max_rank: i64,
        #[arg(long, default_value_t = wangtiles::query::DEFAULT_BATCH_CAPACITY)]
        batch_capacity: usize,
        /// Repeat the base instances with this period
        #[arg(long, num_args = 2, value_names = ["PX", "PY"])]
        lattice: Option<Vec<f64>>,
        /// Output table (.csv, .parquet or .json); prints a count summary when absent
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print a JSON summary of a dataset
    Info {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Point counts and rank ranges per depth of a written points table
    Summarize {
        /// CSV or Parquet file written by `points`
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cmd = Cmd::parse();
    let level = if cmd.verbose { Level::DEBUG } else { Level::INFO };
    SubscriberBuilder::default()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    match cmd.action {
        Action::Points {
            source,
            bbox,
            max_rank,
            batch_capacity,
            lattice,
            out,
        } => points(&source, &bbox, max_rank, batch_capacity, lattice.as_deref(), out),
        Action::Info { source } => info(&source),
        Action::Summarize { input } => summarize(input),
    }
}

fn bounds_arg(bbox: &[f64]) -> Result<[f64; 4]> {
    <[f64; 4]>::try_from(bbox)
        .map_err(|_| anyhow::anyhow!("--bbox takes 4 values, got {}", bbox.len()))
}

fn period_arg(lattice: Option<&[f64]>) -> Result<Option<[f64; 2]>> {
    lattice
        .map(|v| {
            <[f64; 2]>::try_from(v)
                .map_err(|_| anyhow::anyhow!("--lattice takes 2 values, got {}", v.len()))
        })
        .transpose()
}

fn layout_arg(period: Option<[f64; 2]>) -> Result<Box<dyn BaseLayout>> {
    let layout: Box<dyn BaseLayout> = match period {
        Some([px, py]) => Box::new(Lattice::new(Vec2::new(px, py))?),
        None => Box::new(SinglePeriod),
    };
    Ok(layout)
}

fn points(
    source: &SourceArgs,
    bbox: &[f64],
    max_rank: i64,
    batch_capacity: usize,
    lattice: Option<&[f64]>,
    out: Option<PathBuf>,
) -> Result<()> {
    let bounds = bounds_arg(bbox)?;
    let max_rank = max_rank_from_signed(max_rank)?;
    let period = period_arg(lattice)?;
    let layout = layout_arg(period)?;
    let set = source.load()?;
    let cfg = QueryCfg {
        batch_capacity,
        ..QueryCfg::default()
    };

    let start = Instant::now();
    let mut it = set.point_iter_with(bounds, max_rank, layout.as_ref(), cfg)?;
    let mut table = PointTable::default();
    for batch in it.by_ref() {
        table.push_batch(&batch);
    }
    let elapsed_ms = start.elapsed().as_secs_f64() * 1e3;
    let stats = *it.stats();
    tracing::info!(
        points = table.len(),
        batches = stats.batches,
        visited = stats.instances_visited,
        elapsed_ms,
        "query done"
    );

    let record = RunRecord::new(
        source.record()?,
        DatasetShape::of(&set),
        QueryParams {
            bbox: bounds,
            max_rank,
            batch_capacity,
            lattice: period,
        },
        Outcome::new(table.len(), table.max_depth(), &stats, elapsed_ms),
    );
    match out {
        Some(path) => {
            let format = write_points(&path, &table)?;
            let sidecar = record.with_artifact(&path, format).write_sidecar()?;
            tracing::info!(
                out = %path.display(),
                format = ?format,
                sidecar = %sidecar.display(),
                "wrote points"
            );
        }
        None => println!("{}", serde_json::to_string(&record)?),
    }
    Ok(())
}

fn info(source: &SourceArgs) -> Result<()> {
    let set = source.load()?;
    let templates: Vec<_> = set
        .templates()
        .iter()
        .map(|t| {
            json!({
                "id": t.id.0,
                "edges": [t.edge_colors.north, t.edge_colors.east, t.edge_colors.south, t.edge_colors.west],
                "points": t.own_points.len(),
                "children": t.children.len(),
                "min_own_rank": t.min_own_rank,
                "max_own_rank": t.max_own_rank,
                "level_rank_floor": t.level_rank_floor,
            })
        })
        .collect();
    let bases: Vec<_> = set
        .base_instances()
        .iter()
        .map(|b| {
            json!({
                "template": b.template.0,
                "scale": b.transform.scale,
                "symmetry": format!("{:?}", b.transform.symmetry),
                "origin": [b.transform.t.x, b.transform.t.y],
                "rank_scale": b.rank_scale,
            })
        })
        .collect();
    let doc = json!({
        "source": source.describe(),
        "version": wangtiles::VERSION,
        "templates": templates,
        "base_instances": bases,
        "min_rank": set.min_rank(),
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn summarize(input: PathBuf) -> Result<()> {
    tracing::info!(input = %input.display(), "summarize");
    let df = depth_summary(&input)?;
    println!("{df}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_points_flags() {
        let cmd = Cmd::try_parse_from([
            "wangtiles", "points", "--synthetic", "7", "--bbox", "-1", "0", "1", "2",
            "--max-rank", "50", "--lattice", "1", "1",
        ])
        .unwrap();
        let Action::Points { source, bbox, max_rank, lattice, .. } = cmd.action else {
            panic!("expected points");
        };
        assert_eq!(source.synthetic, Some(7));
        assert_eq!(bounds_arg(&bbox).unwrap(), [-1.0, 0.0, 1.0, 2.0]);
        assert_eq!(max_rank, 50);
        assert_eq!(lattice, Some(vec![1.0, 1.0]));
    }

    #[test]
    fn source_is_required_and_exclusive() {
        assert!(Cmd::try_parse_from(["wangtiles", "points", "--max-rank", "3"]).is_err());
        assert!(Cmd::try_parse_from([
            "wangtiles", "info", "--tiles", "a.dat", "--synthetic", "1"
        ])
        .is_err());
    }

    #[test]
    fn negative_rank_is_rejected_after_parsing() {
        let dir = tempdir().unwrap();
        let source = SourceArgs {
            tiles: None,
            synthetic: Some(1),
            no_verify: false,
        };
        let out = Some(dir.path().join("p.csv"));
        let err = points(&source, &[0.0, 0.0, 1.0, 1.0], -5, 16, None, out).unwrap_err();
        assert!(err.to_string().contains("non-negative"), "{err}");
    }

    #[test]
    fn bad_lattice_is_rejected() {
        assert!(layout_arg(Some([0.0, 1.0])).is_err());
        assert!(period_arg(Some(&[1.0][..])).is_err());
        assert_eq!(period_arg(Some(&[2.0, 1.0][..])).unwrap(), Some([2.0, 1.0]));
        assert!(layout_arg(None).is_ok());
    }

    #[test]
    fn points_writes_table_and_sidecar() {
        let dir = tempdir().unwrap();
        let source = SourceArgs {
            tiles: None,
            synthetic: Some(3),
            no_verify: false,
        };
        let out = dir.path().join("run/pts.csv");
        points(&source, &[0.0, 0.0, 1.0, 1.0], 100, 8, None, Some(out.clone())).unwrap();
        assert!(out.exists());
        let sidecar = std::fs::read(dir.path().join("run/pts.provenance.json")).unwrap();
        let record: serde_json::Value = serde_json::from_slice(&sidecar).unwrap();
        assert_eq!(record["source"]["kind"], "synthetic");
        assert_eq!(record["query"]["max_rank"], 100);
        assert_eq!(record["artifact"]["format"], "csv");
        let df = depth_summary(&out).unwrap();
        assert!(df.height() >= 1);
    }
}
