use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemError {
    #[error("malformed DEM document: {0}")]
    MalformedDocument(String),

    #[error("cannot create file: {path}")]
    DatasetCreation {
        path: PathBuf,
        #[source]
        source: gdal::errors::GdalError,
    },

    #[error("merge failed: {0}")]
    MergeExecution(String),

    #[error("not supported file: {0}")]
    UnsupportedInput(PathBuf),

    #[error("zip file includes no xml file: {0}")]
    EmptyArchive(PathBuf),

    #[error("driver {0} not found")]
    UnsupportedDriver(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("invalid UTF-8 in {0}")]
    Utf8(String),
}

impl DemError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        DemError::MalformedDocument(msg.into())
    }

    /// 入力の種類を判別できなかった場合（空のZIPを含む）に真を返す
    pub fn is_unsupported_input(&self) -> bool {
        matches!(
            self,
            DemError::UnsupportedInput(_) | DemError::EmptyArchive(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DemError>;
