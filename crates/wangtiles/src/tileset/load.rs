//! Reader for the binary `.dat` tile format.
//!
//! Layout (little-endian):
//! ```text
//! u32 num_tiles, u32 num_subtiles, u32 num_subdivs
//! per tile:
//!   u32 n, e, s, w
//!   u32 subdivs[num_subdivs][num_subtiles][num_subtiles]   // [alternative][iy][ix]
//!   u32 num_points;    f32 points[num_points][6]           // x, y are columns 0..2
//!   u32 num_subpoints; f32 subpoints[num_subpoints][6]
//! ```
//!
//! Mapping onto the template model
//! - Tile `i` becomes template `i`. Its own points are the subpoints, ranked
//!   `num_points + k + 1`: they refine the tile's `num_points` base samples,
//!   which ancestors already emitted.
//! - Local ranks are the file's zero-based ranks plus one. At density `d` the
//!   world rank `1 + (num_points + k) · d` passes `rank <= max_rank` exactly when
//!   the file's own rank `(num_points + k) · d` is below `max_rank`.
//! - Children come from subdivision alternative 0 on the `s × s` grid with the
//!   identity symmetry and `rank_scale = s²` (density grows with the inverse area).
//! - A synthesized root template (id `num_tiles`) carries tile 0's points ranked
//!   `1..=num_points` followed by tile 0's subpoints, with tile 0's children. It is
//!   the single base instance, placed on the unit square.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use nalgebra::Vector2;
use tracing::info;

use crate::geom::{Box2, Symmetry};

use super::types::{
    BaseInstance, ChildSlot, DatasetFormatError, EdgeColors, LoadCfg, LocalPoint, Result,
    TemplateId, TemplateSet, TemplateSpec,
};

/// Floats stored per point; only the first two are positions.
const POINT_STRIDE: usize = 6;

struct RawTile {
    colors: EdgeColors,
    /// Alternative 0 only, row-major `[iy][ix]`.
    subdiv: Vec<u32>,
    points: Vec<Vector2<f64>>,
    sub_points: Vec<Vector2<f64>>,
}

/// Load a tile set from a `.dat` file.
pub fn load_tiles_file<P: AsRef<Path>>(path: P, cfg: LoadCfg) -> Result<TemplateSet> {
    let file = File::open(path.as_ref())?;
    load_tiles(BufReader::new(file), cfg)
}

/// Load a tile set from any byte stream in the `.dat` format.
pub fn load_tiles<R: Read>(mut reader: R, cfg: LoadCfg) -> Result<TemplateSet> {
    let num_tiles = read_u32(&mut reader, "header")?;
    let num_subtiles = read_u32(&mut reader, "header")?;
    let num_subdivs = read_u32(&mut reader, "header")?;
    if num_tiles == 0 {
        return Err(DatasetFormatError::BadHeader {
            field: "num_tiles",
            value: num_tiles,
        });
    }
    if num_subtiles < 2 {
        return Err(DatasetFormatError::BadHeader {
            field: "num_subtiles",
            value: num_subtiles,
        });
    }
    if num_subdivs == 0 {
        return Err(DatasetFormatError::BadHeader {
            field: "num_subdivs",
            value: num_subdivs,
        });
    }

    let cells = (num_subtiles as usize) * (num_subtiles as usize);
    let mut raw: Vec<RawTile> = Vec::with_capacity((num_tiles as usize).min(1 << 12));
    for _ in 0..num_tiles {
        let colors = EdgeColors {
            north: read_u32(&mut reader, "edge colours")?,
            east: read_u32(&mut reader, "edge colours")?,
            south: read_u32(&mut reader, "edge colours")?,
            west: read_u32(&mut reader, "edge colours")?,
        };
        let mut subdiv = Vec::with_capacity(cells);
        for alt in 0..num_subdivs {
            for _ in 0..cells {
                let id = read_u32(&mut reader, "subdivisions")?;
                if id >= num_tiles {
                    return Err(DatasetFormatError::DanglingTemplate {
                        target: id as usize,
                        referrer: format!("subdivision {alt} of tile {}", raw.len()),
                    });
                }
                if alt == 0 {
                    subdiv.push(id);
                }
            }
        }
        let n = read_u32(&mut reader, "point count")? as usize;
        let points = read_points(&mut reader, n, "points")?;
        let m = read_u32(&mut reader, "subpoint count")? as usize;
        let sub_points = read_points(&mut reader, m, "subpoints")?;
        raw.push(RawTile {
            colors,
            subdiv,
            points,
            sub_points,
        });
    }

    let s = num_subtiles as usize;
    let rank_scale = (s as u64) * (s as u64);
    let mut specs: Vec<TemplateSpec> = Vec::with_capacity(raw.len() + 1);
    for (i, tile) in raw.iter().enumerate() {
        let offset = tile.points.len() as u64;
        specs.push(TemplateSpec {
            id: i,
            edge_colors: tile.colors,
            points: ranked(&tile.sub_points, offset),
            children: grid_children(&tile.subdiv, s, rank_scale),
        });
    }
    let root_tile = &raw[0];
    let mut root_points = ranked(&root_tile.points, 0);
    root_points.extend(ranked(&root_tile.sub_points, root_tile.points.len() as u64));
    let root = TemplateId(specs.len());
    specs.push(TemplateSpec {
        id: root.0,
        edge_colors: root_tile.colors,
        points: root_points,
        children: specs[0].children.clone(),
    });

    info!(
        tiles = num_tiles,
        subdivision = num_subtiles,
        alternatives = num_subdivs,
        base_points = root_tile.points.len(),
        "tile data read"
    );
    TemplateSet::with_cfg(specs, vec![BaseInstance::unit(root)], cfg)
}

/// Points ranked `offset + 1, offset + 2, ...` in file order.
fn ranked(points: &[Vector2<f64>], offset: u64) -> Vec<LocalPoint> {
    points
        .iter()
        .enumerate()
        .map(|(k, p)| LocalPoint {
            pos: *p,
            rank: offset + k as u64 + 1,
        })
        .collect()
}

fn grid_children(subdiv: &[u32], s: usize, rank_scale: u64) -> Vec<ChildSlot> {
    let side = 1.0 / s as f64;
    let mut out = Vec::with_capacity(s * s);
    for ix in 0..s {
        for iy in 0..s {
            let min = Vector2::new(ix as f64 * side, iy as f64 * side);
            out.push(ChildSlot {
                template: TemplateId(subdiv[iy * s + ix] as usize),
                rect: Box2::new(min, min + Vector2::new(side, side)),
                symmetry: Symmetry::Identity,
                rank_scale,
            });
        }
    }
    out
}

fn read_u32<R: Read>(r: &mut R, what: &'static str) -> Result<u32> {
    let mut b = [0u8; 4];
    read_exact(r, &mut b, what)?;
    Ok(u32::from_le_bytes(b))
}

fn read_points<R: Read>(r: &mut R, n: usize, what: &'static str) -> Result<Vec<Vector2<f64>>> {
    let mut out = Vec::with_capacity(n.min(1 << 16));
    let mut rec = [0u8; 4 * POINT_STRIDE];
    for _ in 0..n {
        read_exact(r, &mut rec, what)?;
        let x = f32::from_le_bytes([rec[0], rec[1], rec[2], rec[3]]);
        let y = f32::from_le_bytes([rec[4], rec[5], rec[6], rec[7]]);
        out.push(Vector2::new(x as f64, y as f64));
    }
    Ok(out)
}

fn read_exact<R: Read>(r: &mut R, buf: &mut [u8], what: &'static str) -> Result<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => DatasetFormatError::UnexpectedEof { what },
        _ => DatasetFormatError::Io(e),
    })
}
