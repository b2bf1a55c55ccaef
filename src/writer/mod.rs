use gdal::cpl::CslStringList;
use gdal::raster::Buffer;
use gdal::{Dataset, Driver, DriverManager, Metadata as _};
use std::path::Path;
use tracing::debug;

use crate::config::RunConfig;
use crate::error::{DemError, Result};
use crate::model::{DemTile, GridGeometry, Metadata, NodataPolicy, RasterGrid};

/// JGD2011 地理座標系 (EPSG:6668)
pub const JGD2011_WKT: &str = r#"GEOGCS["GRS 1980(IUGG, 1980)",DATUM["unknown",SPHEROID["GRS80",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["epsg","6668"]]"#;

/// GDALドライバー経由で単バンドFloat32ラスタを書き出す
pub struct RasterWriter {
    driver: Driver,
    driver_name: String,
    creation_options: Vec<String>,
    nodata: NodataPolicy,
}

impl RasterWriter {
    pub fn new(config: &RunConfig) -> Result<Self> {
        let driver = DriverManager::get_driver_by_name(&config.driver)
            .map_err(|_| DemError::UnsupportedDriver(config.driver.clone()))?;

        Ok(Self {
            driver,
            driver_name: config.driver.clone(),
            creation_options: config.creation_options.clone(),
            nodata: config.nodata,
        })
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    /// ドライバーの既定の拡張子（DMD_EXTENSIONSの先頭）
    pub fn extension(&self) -> String {
        self.driver
            .metadata_item("DMD_EXTENSIONS", "")
            .and_then(|exts| exts.split_whitespace().next().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn write(&self, dem_tile: &DemTile, output_path: &Path) -> Result<()> {
        self.write_grid(
            &dem_tile.grid,
            &dem_tile.header.geometry,
            Some(&dem_tile.header.metadata),
            output_path,
        )
    }

    pub fn write_grid(
        &self,
        grid: &RasterGrid,
        geometry: &GridGeometry,
        metadata: Option<&Metadata>,
        output_path: &Path,
    ) -> Result<()> {
        let mut dataset = self.create(output_path, grid)?;

        // 座標系とジオトランスフォームを設定
        dataset.set_projection(JGD2011_WKT)?;
        dataset.set_geo_transform(&geometry.geo_transform())?;

        let (rows, cols) = grid.shape();
        let mut band = dataset.rasterband(1)?;

        if let Some(nodata) = self.nodata.nodata_marker() {
            band.set_no_data_value(Some(nodata))?;
        }

        // GDALは行優先順を期待
        let mut buffer = Buffer::new((cols, rows), grid.values().to_vec());
        band.write((0, 0), (cols, rows), &mut buffer)?;

        if let Some(metadata) = metadata {
            if let Some(mesh) = &metadata.mesh {
                dataset.set_metadata_item("MESHCODE", mesh, "")?;
            }
            if let Some(dem_type) = &metadata.dem_type {
                dataset.set_metadata_item("DEM_TYPE", dem_type, "")?;
            }
        }

        dataset.flush_cache()?;
        debug!(
            "Written {} x {} {} raster: {:?}",
            cols,
            rows,
            self.driver_name(),
            output_path
        );

        Ok(())
    }

    fn create(&self, output_path: &Path, grid: &RasterGrid) -> Result<Dataset> {
        let (rows, cols) = grid.shape();

        let created = if self.creation_options.is_empty() {
            self.driver
                .create_with_band_type::<f32, _>(output_path, cols, rows, 1)
        } else {
            let mut options = CslStringList::new();
            for option in &self.creation_options {
                options.add_string(option)?;
            }
            self.driver.create_with_band_type_with_options::<f32, _>(
                output_path,
                cols,
                rows,
                1,
                &options,
            )
        };

        created.map_err(|source| DemError::DatasetCreation {
            path: output_path.to_path_buf(),
            source,
        })
    }
}
