mod external;
mod mosaic;

pub use external::ExternalMerger;
pub use mosaic::{union_geometry, InProcessMerger};

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::{DemError, Result};
use crate::model::NodataPolicy;

/// 複数のタイルラスタを1枚に合成する。後のタイルの値が優先される。
pub trait TileMerger {
    fn merge(&self, tiles: &TileSet, destination: &Path, policy: NodataPolicy) -> Result<()>;
}

/// 1回の変換で作られるタイルラスタの集合。
///
/// タイルは作業ディレクトリの中に置かれ、作業ディレクトリは
/// `finish` の結果にかかわらず、このセットと一緒に削除される。
pub struct TileSet {
    source: PathBuf,
    scratch: TempDir,
    tiles: Vec<PathBuf>,
}

impl TileSet {
    /// 出力先と同じディレクトリに作業ディレクトリを作る
    pub fn new(source: &Path, destination: &Path) -> Result<Self> {
        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let stem = destination
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("fgddem");

        let scratch = tempfile::Builder::new()
            .prefix(&format!("{}_temp", stem))
            .tempdir_in(parent)?;
        debug!("Created scratch directory: {:?}", scratch.path());

        Ok(Self {
            source: source.to_path_buf(),
            scratch,
            tiles: Vec::new(),
        })
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// 次のタイルの書き出し先。名前が重複しないよう通し番号を付ける。
    pub fn next_tile_path(&self, entry_name: &str, extension: &str) -> PathBuf {
        let basename = entry_name.rsplit('/').next().unwrap_or(entry_name);
        self.scratch.path().join(format!(
            "{:04}_{}.{}",
            self.tiles.len(),
            basename,
            extension
        ))
    }

    pub fn push(&mut self, tile: PathBuf) {
        self.tiles.push(tile);
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// タイルのパスを1行ずつ作業ディレクトリのファイルに書き出す。
    /// `trailing` のパスはタイルの後に続けて書かれる。
    pub fn write_list_file(&self, name: &str, quote: bool, trailing: &[&Path]) -> Result<PathBuf> {
        let mut contents = String::new();
        let paths = self.tiles.iter().map(PathBuf::as_path).chain(trailing.iter().copied());
        for tile in paths {
            let tile = tile.to_string_lossy();
            if quote {
                contents.push_str(&format!("\"{}\"\n", tile));
            } else {
                contents.push_str(&tile);
                contents.push('\n');
            }
        }

        let path = self.scratch.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// タイルを出力先にまとめ、作業ディレクトリを削除する。
    ///
    /// タイルが1枚なら結合せずに移動する。
    pub fn finish(
        self,
        destination: &Path,
        merger: &dyn TileMerger,
        policy: NodataPolicy,
    ) -> Result<()> {
        let result = match self.tiles.as_slice() {
            [] => Err(DemError::EmptyArchive(self.source.clone())),
            [single] => fs::rename(single, destination).map_err(DemError::from),
            tiles => {
                info!("Merging {} tiles into {:?}", tiles.len(), destination);
                merger.merge(&self, destination, policy)
            }
        };

        let scratch = self.scratch.path().to_path_buf();
        match self.scratch.close() {
            Ok(()) => debug!("Temporary files removed: {:?}", scratch),
            Err(e) => warn!("Failed to remove {:?}: {}", scratch, e),
        }

        result
    }
}

/// 出力可能なASCII文字 (0x20-0x7E) だけからなるパスか
pub fn is_printable_ascii(path: &Path) -> bool {
    path.as_os_str()
        .as_encoded_bytes()
        .iter()
        .all(|b| (0x20..=0x7e).contains(b))
}
