//! 基盤地図情報 数値標高モデル (JPGIS GML) をGDALのラスタ形式に変換する。

pub mod config;
pub mod converter;
pub mod error;
pub mod merge;
pub mod model;
pub mod parser;
pub mod writer;
pub mod zip_handler;

pub use config::{MergeStrategy, RunConfig};
pub use converter::{collect_inputs, BatchReport, Converter, InputKind};
pub use error::{DemError, Result};
pub use merge::{ExternalMerger, InProcessMerger, TileMerger, TileSet};
pub use model::{DemHeader, DemTile, GridGeometry, Metadata, NodataPolicy, RasterGrid, ScanCursor};
pub use parser::parse_dem_xml;
pub use writer::RasterWriter;
pub use zip_handler::ZipHandler;
