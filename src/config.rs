use crate::model::NodataPolicy;

pub const DEFAULT_DRIVER: &str = "GTiff";
pub const DEFAULT_MERGE_PROGRAM: &str = "gdalwarp";

/// 複数タイルの結合方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// 外部プログラム（gdalwarp）を呼び出す
    #[default]
    External,
    /// GDAL経由でプロセス内で合成する
    InProcess,
}

/// 1回の実行の設定。グローバル状態は持たず、各処理に明示的に渡す。
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub nodata: NodataPolicy,
    pub driver: String,
    pub creation_options: Vec<String>,
    pub merge_strategy: MergeStrategy,
    pub merge_program: String,
    pub verbose: bool,
    pub quiet: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            nodata: NodataPolicy::default(),
            driver: DEFAULT_DRIVER.to_string(),
            creation_options: Vec::new(),
            merge_strategy: MergeStrategy::default(),
            merge_program: DEFAULT_MERGE_PROGRAM.to_string(),
            verbose: false,
            quiet: false,
        }
    }
}

impl RunConfig {
    /// 進捗を表示するか
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}
