use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::decimal::float2;
use crate::error::{DemError, Result};
use crate::model::{DemHeader, GridGeometry, Metadata, ScanCursor};

const TUPLE_LIST: &[u8] = b"gml:tupleList";

/// ヘッダと、切り出したタプル列本体
#[derive(Debug)]
pub struct SplitDocument<'a> {
    pub header: DemHeader,
    pub tuples: Cow<'a, str>,
}

#[derive(Default)]
struct HeaderFields {
    lower_corner: Option<String>,
    upper_corner: Option<String>,
    high: Option<String>,
    start_point: Option<String>,
    metadata: Metadata,
}

impl HeaderFields {
    /// テキストを取り出す要素の格納先
    fn text_slot(&mut self, name: &[u8]) -> Option<&mut Option<String>> {
        match name {
            b"gml:lowerCorner" => Some(&mut self.lower_corner),
            b"gml:upperCorner" => Some(&mut self.upper_corner),
            b"gml:high" => Some(&mut self.high),
            b"gml:startPoint" => Some(&mut self.start_point),
            b"gml:name" => Some(&mut self.metadata.name),
            b"fid" => Some(&mut self.metadata.fid),
            b"type" => Some(&mut self.metadata.dem_type),
            b"mesh" => Some(&mut self.metadata.mesh),
            _ => None,
        }
    }
}

/// 文書を読み進め、ヘッダ要素を取り出しつつタプル列を読み飛ばす。
///
/// タプル列はXMLとして解釈せず、入力の部分文字列として保持する。
/// 各要素は最初に現れたものを使う。
pub fn extract(text: &str) -> Result<SplitDocument<'_>> {
    let mut reader = Reader::from_str(text);
    let mut fields = HeaderFields::default();
    let mut tuples: Option<Cow<'_, str>> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| xml_error(reader.buffer_position(), err))?;

        match event {
            Event::Start(e) => {
                let name = e.name();
                if name.as_ref() == TUPLE_LIST {
                    let body = reader
                        .read_text(name)
                        .map_err(|err| xml_error(reader.buffer_position(), err))?;
                    tuples.get_or_insert(body);
                } else if name.as_ref() == b"gml:Envelope" {
                    if fields.metadata.crs_identifier.is_none() {
                        fields.metadata.crs_identifier = srs_name(&e);
                    }
                } else if let Some(slot) = fields.text_slot(name.as_ref()) {
                    let body = reader
                        .read_text(name)
                        .map_err(|err| xml_error(reader.buffer_position(), err))?;
                    if slot.is_none() {
                        *slot = Some(body.trim().to_string());
                    }
                }
            }
            Event::Empty(e) => {
                if e.name().as_ref() == TUPLE_LIST {
                    tuples.get_or_insert(Cow::Borrowed(""));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let tuples = tuples.ok_or_else(|| DemError::malformed("gml:tupleList not found"))?;
    let header = build_header(fields)?;

    debug!(
        "Parsed header: {} x {} cells, start point {:?}",
        header.geometry.cols, header.geometry.rows, header.cursor
    );

    Ok(SplitDocument { header, tuples })
}

fn build_header(fields: HeaderFields) -> Result<DemHeader> {
    let lower = required(&fields.lower_corner, "gml:lowerCorner")?;
    let upper = required(&fields.upper_corner, "gml:upperCorner")?;
    let high = required(&fields.high, "gml:high")?;
    let start_point = required(&fields.start_point, "gml:startPoint")?;

    // 隅座標は (緯度, 経度) の順
    let (lry, ulx) = pair(lower, "gml:lowerCorner")?;
    let (lry, ulx) = (float2(lry)?, float2(ulx)?);
    let (uly, lrx) = pair(upper, "gml:upperCorner")?;
    let (uly, lrx) = (float2(uly)?, float2(lrx)?);

    let (high_x, high_y) = index_pair(high, "gml:high")?;
    let (start_x, start_y) = index_pair(start_point, "gml:startPoint")?;

    let (cols, rows) = grid_size(high_x, high_y)
        .ok_or_else(|| DemError::malformed(format!("grid size overflow: gml:high {}", high)))?;

    Ok(DemHeader {
        geometry: GridGeometry::from_corners(ulx, uly, lrx, lry, cols, rows),
        cursor: ScanCursor {
            start_col: start_x,
            start_row: start_y,
        },
        metadata: fields.metadata,
        bounds: (lry, ulx, uly, lrx),
    })
}

/// 上端インデックスから (列数, 行数) を求める。セル数がusizeに収まらなければ `None`。
fn grid_size(high_x: usize, high_y: usize) -> Option<(usize, usize)> {
    let cols = high_x.checked_add(1)?;
    let rows = high_y.checked_add(1)?;
    cols.checked_mul(rows)?;
    Some((cols, rows))
}

fn required<'f>(value: &'f Option<String>, element: &str) -> Result<&'f str> {
    value
        .as_deref()
        .ok_or_else(|| DemError::malformed(format!("{} not found", element)))
}

fn pair<'t>(text: &'t str, element: &str) -> Result<(&'t str, &'t str)> {
    let mut parts = text.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(first), Some(second)) => Ok((first, second)),
        _ => Err(DemError::malformed(format!(
            "{} must hold two values: {:?}",
            element, text
        ))),
    }
}

fn index_pair(text: &str, element: &str) -> Result<(usize, usize)> {
    let (first, second) = pair(text, element)?;
    let parse = |s: &str| {
        s.parse::<usize>().map_err(|e| {
            DemError::malformed(format!("invalid integer {:?} in {}: {}", s, element, e))
        })
    };
    Ok((parse(first)?, parse(second)?))
}

fn srs_name(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"srsName")
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

fn xml_error(position: impl std::fmt::Display, e: quick_xml::Error) -> DemError {
    DemError::malformed(format!("XML error at position {}: {}", position, e))
}
