use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;

use crate::error::{DemError, Result};

/// この文字列を名前に含むXMLはメタデータとして扱う
pub const METADATA_MARKER: &str = "meta";

/// タイルとして扱うエントリ名か
pub fn is_tile_entry(name: &str) -> bool {
    name.to_lowercase().ends_with(".xml") && !name.contains(METADATA_MARKER)
}

/// ZIP内の1タイル分の文書
pub struct TileEntry<'a> {
    /// ZIP内でのエントリ番号（0始まり）
    pub index: usize,
    /// ZIP内の全エントリ数
    pub total: usize,
    pub name: &'a str,
    pub text: &'a str,
}

pub struct ZipHandler {
    path: PathBuf,
}

impl ZipHandler {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn open(&self) -> Result<ZipArchive<BufReader<File>>> {
        let file = File::open(&self.path)?;
        Ok(ZipArchive::new(BufReader::new(file))?)
    }

    /// タイルを格納順に1つずつ読み、`visit` に渡す。訪れたタイル数を返す。
    ///
    /// 読み込んだ文書は次のエントリを読む前に解放される。
    pub fn for_each_tile<F>(&self, mut visit: F) -> Result<usize>
    where
        F: FnMut(TileEntry<'_>) -> Result<()>,
    {
        let mut archive = self.open()?;
        let total = archive.len();
        let mut visited = 0;

        for index in 0..total {
            let mut entry = archive.by_index(index)?;
            let name = entry.name().to_string();

            if entry.is_dir() || !is_tile_entry(&name) {
                debug!("Skipping entry: {}", name);
                continue;
            }

            // 宣言サイズは信用せず、実際に読めた分だけ確保する
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            drop(entry);

            let text = String::from_utf8(bytes).map_err(|_| DemError::Utf8(name.clone()))?;

            visit(TileEntry {
                index,
                total,
                name: &name,
                text: &text,
            })?;
            visited += 1;
        }

        Ok(visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn create_zip(dir: &Path, entries: &[(&str, &str)]) -> PathBuf {
        let path = dir.join("test.zip");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        for (name, contents) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_is_tile_entry() {
        assert!(is_tile_entry("FG-GML-5339-46-DEM5A-20161001.xml"));
        assert!(is_tile_entry("dir/FG-GML-5339-46-DEM5A-20161001.XML"));
        assert!(!is_tile_entry("FG-GML-5339-46-DEM5A-20161001_meta.xml"));
        assert!(!is_tile_entry("readme.txt"));
        assert!(!is_tile_entry("dir/"));
    }

    #[test]
    fn test_tiles_in_listing_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_zip(
            temp_dir.path(),
            &[
                ("b.xml", "<b/>"),
                ("a_meta.xml", "<m/>"),
                ("readme.txt", "text"),
                ("a.xml", "<a/>"),
            ],
        );

        let mut names = Vec::new();
        ZipHandler::new(&path)
            .for_each_tile(|entry| {
                names.push(entry.name.to_string());
                Ok(())
            })
            .unwrap();
        assert_eq!(names, vec!["b.xml", "a.xml"]);
    }

    #[test]
    fn test_for_each_tile() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_zip(
            temp_dir.path(),
            &[("a.xml", "first"), ("meta.xml", "skip"), ("b.xml", "second")],
        );

        let mut seen = Vec::new();
        let visited = ZipHandler::new(&path)
            .for_each_tile(|entry| {
                seen.push((entry.index, entry.total, entry.name.to_string(), entry.text.to_string()));
                Ok(())
            })
            .unwrap();

        assert_eq!(visited, 2);
        assert_eq!(
            seen,
            vec![
                (0, 3, "a.xml".to_string(), "first".to_string()),
                (2, 3, "b.xml".to_string(), "second".to_string()),
            ]
        );
    }

    #[test]
    fn test_metadata_only_archive() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_zip(
            temp_dir.path(),
            &[("FG-GML-5339-meta.xml", "<m/>"), ("meta2.xml", "<m/>")],
        );

        let visited = ZipHandler::new(&path).for_each_tile(|_| Ok(())).unwrap();
        assert_eq!(visited, 0);
    }

    #[test]
    fn test_visitor_error_stops_iteration() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_zip(temp_dir.path(), &[("a.xml", "1"), ("b.xml", "2")]);

        let mut calls = 0;
        let err = ZipHandler::new(&path)
            .for_each_tile(|_| {
                calls += 1;
                Err(DemError::malformed("broken"))
            })
            .unwrap_err();

        assert_eq!(calls, 1);
        assert!(matches!(err, DemError::MalformedDocument(_)));
    }

    /// 全ヘッダーの展開後サイズを書き換える
    fn overstate_sizes(bytes: &mut [u8], size: u32) {
        let mut i = 0;
        while i + 4 <= bytes.len() {
            let offset = match &bytes[i..i + 4] {
                [0x50, 0x4b, 0x03, 0x04] => Some(22),
                [0x50, 0x4b, 0x01, 0x02] => Some(24),
                _ => None,
            };
            if let Some(offset) = offset {
                bytes[i + offset..i + offset + 4].copy_from_slice(&size.to_le_bytes());
            }
            i += 1;
        }
    }

    #[test]
    fn test_declared_size_is_not_trusted() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("oversized.zip");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("a.xml", options).unwrap();
        writer.write_all(b"<a/>").unwrap();
        writer.finish().unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        overstate_sizes(&mut bytes, 0xFFFF_FFF0);
        std::fs::write(&path, bytes).unwrap();

        // 宣言サイズ分を確保せずに読む。読めない場合もエラーで返る
        let mut texts = Vec::new();
        let result = ZipHandler::new(&path).for_each_tile(|entry| {
            texts.push(entry.text.to_string());
            Ok(())
        });
        match result {
            Ok(visited) => {
                assert_eq!(visited, 1);
                assert_eq!(texts, vec!["<a/>"]);
            }
            Err(err) => assert!(matches!(err, DemError::Zip(_) | DemError::Io(_))),
        }
    }

    #[test]
    fn test_not_a_zip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.zip");
        std::fs::write(&path, b"not a zip").unwrap();

        let err = ZipHandler::new(&path).for_each_tile(|_| Ok(())).unwrap_err();
        assert!(matches!(err, DemError::Zip(_)));
    }
}
