use gdal::Dataset;
use std::path::Path;
use tracing::debug;

use super::{TileMerger, TileSet};
use crate::error::{DemError, Result};
use crate::model::{GridGeometry, NodataPolicy, RasterGrid};
use crate::writer::RasterWriter;

/// GDALでタイルを読み込み、プロセス内で合成する
pub struct InProcessMerger {
    writer: RasterWriter,
}

impl InProcessMerger {
    pub fn new(writer: RasterWriter) -> Self {
        Self { writer }
    }
}

struct SourceTile {
    dataset: Dataset,
    transform: [f64; 6],
    size: (usize, usize),
}

impl SourceTile {
    fn open(path: &Path) -> Result<Self> {
        let dataset = Dataset::open(path)?;
        let transform = dataset.geo_transform()?;
        let size = dataset.raster_size();
        Ok(Self {
            dataset,
            transform,
            size,
        })
    }
}

/// 全タイルを覆う範囲のグリッドを求める。セルサイズは先頭タイルのもの。
///
/// `tiles` は (ジオトランスフォーム, (列数, 行数)) の並び。
pub fn union_geometry(tiles: &[([f64; 6], (usize, usize))]) -> Option<GridGeometry> {
    let (first, _) = tiles.first()?;
    let (cell_width, cell_height) = (first[1], first[5]);

    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for (transform, (cols, rows)) in tiles {
        let x0 = transform[0];
        let x1 = x0 + *cols as f64 * transform[1];
        let y0 = transform[3];
        let y1 = y0 + *rows as f64 * transform[5];

        min_x = min_x.min(x0.min(x1));
        max_x = max_x.max(x0.max(x1));
        min_y = min_y.min(y0.min(y1));
        max_y = max_y.max(y0.max(y1));
    }

    let origin_x = if cell_width >= 0.0 { min_x } else { max_x };
    let origin_y = if cell_height < 0.0 { max_y } else { min_y };

    Some(GridGeometry {
        origin_x,
        origin_y,
        cell_width,
        cell_height,
        cols: ((max_x - min_x) / cell_width.abs()).round() as usize,
        rows: ((max_y - min_y) / cell_height.abs()).round() as usize,
    })
}

/// タイルの左上が合成グリッドのどこに来るか
fn offset_in(geometry: &GridGeometry, transform: &[f64; 6]) -> (i64, i64) {
    let col = ((transform[0] - geometry.origin_x) / geometry.cell_width).round() as i64;
    let row = ((transform[3] - geometry.origin_y) / geometry.cell_height).round() as i64;
    (col, row)
}

fn paste(
    composite: &mut RasterGrid,
    (col_off, row_off): (i64, i64),
    (cols, rows): (usize, usize),
    values: &[f32],
    nodata: Option<f32>,
) {
    for r in 0..rows {
        let row = row_off + r as i64;
        if row < 0 || row >= composite.rows as i64 {
            continue;
        }
        for c in 0..cols {
            let col = col_off + c as i64;
            if col < 0 || col >= composite.cols as i64 {
                continue;
            }
            let value = values[r * cols + c];
            if Some(value) == nodata {
                continue;
            }
            composite.set(row as usize, col as usize, value);
        }
    }
}

impl TileMerger for InProcessMerger {
    fn merge(&self, tiles: &TileSet, destination: &Path, policy: NodataPolicy) -> Result<()> {
        let sources = tiles
            .paths()
            .iter()
            .map(|path| SourceTile::open(path))
            .collect::<Result<Vec<_>>>()?;

        let extents: Vec<_> = sources.iter().map(|s| (s.transform, s.size)).collect();
        let geometry = union_geometry(&extents)
            .ok_or_else(|| DemError::MergeExecution("no tiles to merge".to_string()))?;
        debug!(
            "Composite grid: {} x {} cells at ({}, {})",
            geometry.cols, geometry.rows, geometry.origin_x, geometry.origin_y
        );

        if geometry.rows.checked_mul(geometry.cols).is_none() {
            return Err(DemError::MergeExecution(format!(
                "composite grid too large: {} x {} cells",
                geometry.cols, geometry.rows
            )));
        }
        let mut composite = RasterGrid::filled(geometry.rows, geometry.cols, policy.fill_value());

        // 後のタイルが前のタイルを上書きする
        for source in &sources {
            let band = source.dataset.rasterband(1)?;
            let nodata = band.no_data_value().map(|v| v as f32);
            let buffer = band.read_band_as::<f32>()?;

            paste(
                &mut composite,
                offset_in(&geometry, &source.transform),
                source.size,
                buffer.data(),
                nodata,
            );
        }

        self.writer
            .write_grid(&composite, &geometry, None, destination)
    }
}
