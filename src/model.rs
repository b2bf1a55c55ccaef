/// センチネル方式で使うNoData値
pub const NODATA_VALUE: f32 = -9999.0;

/// NoData値の扱い。実行ごとに一度だけ決まり、全ステージで共通に使われる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodataPolicy {
    /// -9999で埋め、バンドにNoData値として記録する
    #[default]
    Sentinel,
    /// 0で埋め、NoData値は記録しない
    ReplaceWithZero,
}

impl NodataPolicy {
    pub fn from_replace_by_zero(replace_nodata_by_zero: bool) -> Self {
        if replace_nodata_by_zero {
            NodataPolicy::ReplaceWithZero
        } else {
            NodataPolicy::Sentinel
        }
    }

    /// 値のないセルに入れる値
    pub fn fill_value(self) -> f32 {
        match self {
            NodataPolicy::Sentinel => NODATA_VALUE,
            NodataPolicy::ReplaceWithZero => 0.0,
        }
    }

    /// バンドに設定するNoData値
    pub fn nodata_marker(self) -> Option<f64> {
        match self {
            NodataPolicy::Sentinel => Some(NODATA_VALUE as f64),
            NodataPolicy::ReplaceWithZero => None,
        }
    }
}

/// グリッドの位置と大きさ。原点は左上隅、dyは通常負。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub origin_x: f64,
    pub origin_y: f64,
    pub cell_width: f64,
    pub cell_height: f64,
    pub cols: usize,
    pub rows: usize,
}

impl GridGeometry {
    /// 四隅の座標とグリッドサイズからセルサイズを導出する
    pub fn from_corners(
        ulx: f64,
        uly: f64,
        lrx: f64,
        lry: f64,
        cols: usize,
        rows: usize,
    ) -> Self {
        Self {
            origin_x: ulx,
            origin_y: uly,
            cell_width: (lrx - ulx) / cols as f64,
            cell_height: (lry - uly) / rows as f64,
            cols,
            rows,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// GDAL形式のジオトランスフォーム
    pub fn geo_transform(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.cell_width,
            0.0,
            self.origin_y,
            0.0,
            self.cell_height,
        ]
    }
}

/// タプル列の先頭が置かれるラスタ上の位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanCursor {
    pub start_col: usize,
    pub start_row: usize,
}

/// 行優先の標高グリッド
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    pub rows: usize,
    pub cols: usize,
    values: Vec<f32>,
}

impl RasterGrid {
    pub fn filled(rows: usize, cols: usize, value: f32) -> Self {
        Self {
            rows,
            cols,
            values: vec![value; rows * cols],
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row < self.rows && col < self.cols {
            Some(self.values[row * self.cols + col])
        } else {
            None
        }
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: f32) {
        self.values[row * self.cols + col] = value;
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// 診断出力専用の記述的メタデータ
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub name: Option<String>,
    pub fid: Option<String>,
    pub dem_type: Option<String>,
    pub mesh: Option<String>,
    pub crs_identifier: Option<String>,
}

/// ヘッダ/フッタから取り出した情報一式
#[derive(Debug, Clone, PartialEq)]
pub struct DemHeader {
    pub geometry: GridGeometry,
    pub cursor: ScanCursor,
    pub metadata: Metadata,
    /// 補正後の範囲 (lry, ulx, uly, lrx)
    pub bounds: (f64, f64, f64, f64),
}

/// 1タイル分の変換結果
#[derive(Debug, Clone, PartialEq)]
pub struct DemTile {
    pub header: DemHeader,
    pub grid: RasterGrid,
}

impl DemTile {
    pub fn shape(&self) -> (usize, usize) {
        self.grid.shape()
    }

    pub fn geo_transform(&self) -> [f64; 6] {
        self.header.geometry.geo_transform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_from_corners() {
        let geometry = GridGeometry::from_corners(139.0, 35.1, 139.1, 35.0, 2, 2);

        assert_eq!(geometry.shape(), (2, 2));
        assert!((geometry.cell_width - 0.05).abs() < 1e-12);
        assert!((geometry.cell_height + 0.05).abs() < 1e-12);

        let transform = geometry.geo_transform();
        assert_eq!(transform[0], 139.0);
        assert_eq!(transform[3], 35.1);
        assert_eq!(transform[2], 0.0);
        assert_eq!(transform[4], 0.0);
    }

    #[test]
    fn test_nodata_policy_values() {
        assert_eq!(NodataPolicy::Sentinel.fill_value(), -9999.0);
        assert_eq!(NodataPolicy::Sentinel.nodata_marker(), Some(-9999.0));
        assert_eq!(NodataPolicy::ReplaceWithZero.fill_value(), 0.0);
        assert_eq!(NodataPolicy::ReplaceWithZero.nodata_marker(), None);
        assert_eq!(
            NodataPolicy::from_replace_by_zero(true),
            NodataPolicy::ReplaceWithZero
        );
    }

    #[test]
    fn test_raster_grid_bounds() {
        let mut grid = RasterGrid::filled(2, 3, -9999.0);
        grid.set(1, 2, 5.0);

        assert_eq!(grid.get(1, 2), Some(5.0));
        assert_eq!(grid.get(0, 0), Some(-9999.0));
        assert_eq!(grid.get(2, 0), None);
        assert_eq!(grid.values().len(), 6);
    }
}
