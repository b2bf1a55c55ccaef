use tracing::debug;

use crate::error::{DemError, Result};
use crate::model::{GridGeometry, NodataPolicy, RasterGrid, ScanCursor};

/// この文字列を含む値はデータなしとして扱う
const NODATA_MARKER: &str = "-99";

/// タプル列をラスタ走査順にグリッドへ埋める。
///
/// 先頭のタプルは `cursor` の位置に置かれ、2行目以降は0列目から始まる。
/// タプルが尽きた時点で（行の途中でも）終了し、残りのセルは埋め値のまま。
pub fn rasterize(
    body: &str,
    geometry: &GridGeometry,
    cursor: ScanCursor,
    policy: NodataPolicy,
) -> Result<RasterGrid> {
    let mut grid = RasterGrid::filled(geometry.rows, geometry.cols, policy.fill_value());

    // 行末の\rは値を読むときにtrimされる
    let mut tuples = body.trim().split('\n').enumerate();
    let mut consumed = 0;

    let mut start_col = cursor.start_col;
    'rows: for row in cursor.start_row..geometry.rows {
        for col in start_col..geometry.cols {
            let Some((index, line)) = tuples.next() else {
                break 'rows;
            };
            if let Some(value) = parse_tuple(line, index)? {
                grid.set(row, col, value);
            }
            consumed += 1;
        }
        start_col = 0;
    }

    debug!(
        "Rasterized {} tuples into {} x {} grid",
        consumed, geometry.cols, geometry.rows
    );

    Ok(grid)
}

/// 1行を読む。値がない、または不正な形の行は `None`。
fn parse_tuple(line: &str, index: usize) -> Result<Option<f32>> {
    let mut fields = line.split(',');
    let (Some(_), Some(value), None) = (fields.next(), fields.next(), fields.next()) else {
        return Ok(None);
    };

    if value.contains(NODATA_MARKER) {
        return Ok(None);
    }

    let value = value.trim();
    value.parse::<f32>().map(Some).map_err(|e| {
        DemError::malformed(format!(
            "invalid elevation value {:?} at tuple {}: {}",
            value,
            index + 1,
            e
        ))
    })
}
