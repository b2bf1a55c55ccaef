use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use super::{is_printable_ascii, TileMerger, TileSet};
use crate::config::RunConfig;
use crate::error::{DemError, Result};
use crate::model::NodataPolicy;

/// 外部プログラム（既定は gdalwarp）でタイルを結合する。
///
/// シェルは経由しない。パスに出力可能なASCII以外の文字が含まれる場合は
/// 入力ファイルと出力先をファイルに書き、`--optfile` で渡す。
/// 子プロセスにタイムアウトはない。
#[derive(Debug, Clone)]
pub struct ExternalMerger {
    program: String,
    driver: String,
    verbose: bool,
}

impl ExternalMerger {
    pub fn new(program: impl Into<String>, driver: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            driver: driver.into(),
            verbose: false,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            program: config.merge_program.clone(),
            driver: config.driver.clone(),
            verbose: config.verbose,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// 実行するコマンドを組み立てる
    pub fn command(
        &self,
        tiles: &TileSet,
        destination: &Path,
        policy: NodataPolicy,
    ) -> Result<Command> {
        let mut command = Command::new(&self.program);

        if !self.verbose {
            command.arg("-q");
        }
        if let Some(nodata) = policy.nodata_marker() {
            command.arg("-dstnodata").arg(nodata.to_string());
        }
        command.arg("-of").arg(&self.driver).arg("-overwrite");

        let ascii_only = tiles
            .paths()
            .iter()
            .map(|p| p.as_path())
            .chain(std::iter::once(destination))
            .all(is_printable_ascii);

        if ascii_only {
            command.args(tiles.paths()).arg(destination);
        } else {
            let list = tiles.write_list_file("tiles.txt", true, &[destination])?;
            debug!("Non-ASCII path found, passing paths through {:?}", list);
            command.arg("--optfile").arg(list);
        }

        Ok(command)
    }
}

impl TileMerger for ExternalMerger {
    fn merge(&self, tiles: &TileSet, destination: &Path, policy: NodataPolicy) -> Result<()> {
        let mut command = self.command(tiles, destination, policy)?;

        if self.verbose {
            info!("execute {:?}", command);
        }

        let status = command.status().map_err(|e| {
            DemError::MergeExecution(format!("failed to run {}: {}", self.program, e))
        })?;

        if !status.success() {
            return Err(DemError::MergeExecution(format!(
                "{} exited with {}",
                self.program, status
            )));
        }

        Ok(())
    }
}
