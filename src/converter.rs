use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::config::{MergeStrategy, RunConfig};
use crate::error::{DemError, Result};
use crate::merge::{ExternalMerger, InProcessMerger, TileMerger, TileSet};
use crate::model::DemHeader;
use crate::parser::parse_dem_xml;
use crate::writer::RasterWriter;
use crate::zip_handler::{ZipHandler, METADATA_MARKER};

/// 入力ファイルの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Xml,
    Zip,
}

impl InputKind {
    /// 拡張子から種類を判定する。メタデータXMLは対象外。
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_lowercase);
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();

        match ext.as_deref() {
            Some("zip") => Some(InputKind::Zip),
            Some("xml") if !name.contains(METADATA_MARKER) => Some(InputKind::Xml),
            _ => None,
        }
    }
}

/// 一括変換の結果
#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, DemError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Converter {
    config: RunConfig,
    writer: RasterWriter,
    merger: Box<dyn TileMerger>,
}

impl Converter {
    pub fn new(config: RunConfig) -> Result<Self> {
        let merger: Box<dyn TileMerger> = match config.merge_strategy {
            MergeStrategy::External => Box::new(ExternalMerger::from_config(&config)),
            MergeStrategy::InProcess => Box::new(InProcessMerger::new(RasterWriter::new(&config)?)),
        };
        Self::with_merger(config, merger)
    }

    pub fn with_merger(config: RunConfig, merger: Box<dyn TileMerger>) -> Result<Self> {
        let writer = RasterWriter::new(&config)?;
        Ok(Self {
            config,
            writer,
            merger,
        })
    }

    /// 出力ファイルのパス。`out_dir` がなければ入力と同じ場所。
    pub fn output_path(&self, input: &Path, out_dir: Option<&Path>) -> PathBuf {
        let stem = input.file_stem().unwrap_or_default();
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(self.writer.extension());

        match out_dir {
            Some(dir) => dir.join(name),
            None => input.with_file_name(name),
        }
    }

    /// 入力ファイルを1つ変換する
    pub fn convert(&self, input: &Path, destination: &Path) -> Result<()> {
        match InputKind::detect(input) {
            Some(InputKind::Zip) => self.translate_zip(input, destination),
            Some(InputKind::Xml) => {
                let text = fs::read_to_string(input)?;
                self.translate_document(&text, destination)
            }
            None => Err(DemError::UnsupportedInput(input.to_path_buf())),
        }
    }

    /// XML文書1つを出力ラスタに変換する
    pub fn translate_document(&self, text: &str, destination: &Path) -> Result<()> {
        let tile = parse_dem_xml(text, self.config.nodata)?;
        self.writer.write(&tile, destination)?;
        self.report_tile(destination, &tile.header);
        Ok(())
    }

    /// ZIP内の各タイルを変換し、1枚のラスタにまとめる
    pub fn translate_zip(&self, source: &Path, destination: &Path) -> Result<()> {
        let handler = ZipHandler::new(source);
        let mut tiles = TileSet::new(source, destination)?;
        let extension = self.writer.extension();

        handler.for_each_tile(|entry| {
            let tile_path = tiles.next_tile_path(entry.name, &extension);
            self.translate_document(entry.text, &tile_path)?;
            tiles.push(tile_path);

            if self.config.show_progress() && !self.config.verbose {
                info!("({}/{}) {}", entry.index + 1, entry.total, entry.name);
            }
            Ok(())
        })?;

        if tiles.is_empty() {
            return Err(DemError::EmptyArchive(source.to_path_buf()));
        }

        if self.config.show_progress() && tiles.len() > 1 {
            info!("merging");
        }
        tiles.finish(destination, self.merger.as_ref(), self.config.nodata)?;
        if self.config.show_progress() {
            info!("temporary files removed");
        }

        Ok(())
    }

    /// 全入力を順に変換する。失敗したファイルがあっても残りは処理を続ける。
    pub fn convert_all(&self, inputs: &[PathBuf], out_dir: Option<&Path>) -> BatchReport {
        let mut report = BatchReport::default();

        for (i, input) in inputs.iter().enumerate() {
            if self.config.show_progress() {
                if inputs.len() > 1 {
                    info!("({}/{}): translating {:?}", i + 1, inputs.len(), input);
                } else {
                    info!("translating {:?}", input);
                }
            }

            let destination = self.output_path(input, out_dir);
            match self.convert(input, &destination) {
                Ok(()) => report.converted.push(destination),
                Err(e) => {
                    error!("{}: {}", input.display(), e);
                    report.failures.push((input.clone(), e));
                }
            }
        }

        if self.config.show_progress() && report.is_success() {
            info!("completed");
        }

        report
    }

    fn report_tile(&self, destination: &Path, header: &DemHeader) {
        let metadata = &header.metadata;
        let (lry, ulx, uly, lrx) = header.bounds;
        let geometry = &header.geometry;
        let unknown = || "-".to_string();

        let report = format!(
            "file: {}\nname: {}\nfid : {}\ntype: {}\nmesh: {}\nbounds : {:.6}, {:.6} - {:.6}, {:.6}\ncell size : {:.6}, {:.6}\nsize : {}, {}\nstart point : {}, {}",
            destination.display(),
            metadata.name.clone().unwrap_or_else(unknown),
            metadata.fid.clone().unwrap_or_else(unknown),
            metadata.dem_type.clone().unwrap_or_else(unknown),
            metadata.mesh.clone().unwrap_or_else(unknown),
            lry,
            ulx,
            uly,
            lrx,
            geometry.cell_width,
            geometry.cell_height,
            geometry.cols,
            geometry.rows,
            header.cursor.start_col,
            header.cursor.start_row,
        );

        if self.config.verbose {
            info!("{}", report);
        } else {
            debug!("{}", report);
        }
    }
}

/// 入力パスを展開する。ディレクトリは配下のXML/ZIPを再帰的に集める。
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            collect_directory(path, &mut found)?;
            found.sort();
            inputs.extend(found);
        } else {
            inputs.push(path.clone());
        }
    }
    Ok(inputs)
}

fn collect_directory(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            // サブディレクトリを再帰的に探索
            collect_directory(&path, files)?;
        } else if InputKind::detect(&path).is_some() {
            files.push(path);
        } else {
            debug!("Skipping {:?}", path);
        }
    }
    Ok(())
}
