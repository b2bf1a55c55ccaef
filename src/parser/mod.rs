pub mod decimal;
pub mod header;
pub mod tuples;

use crate::error::Result;
use crate::model::{DemTile, NodataPolicy};

pub use decimal::{float2, repair_decimal};
pub use header::{extract, SplitDocument};
pub use tuples::rasterize;

/// 基盤地図情報DEMのXML文書を1タイル分のグリッドに変換する
pub fn parse_dem_xml(text: &str, policy: NodataPolicy) -> Result<DemTile> {
    let SplitDocument { header, tuples } = extract(text)?;
    let grid = rasterize(&tuples, &header.geometry, header.cursor, policy)?;
    Ok(DemTile { header, grid })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DemError;
    use crate::model::NODATA_VALUE;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Dataset xmlns:gml="http://www.opengis.net/gml/3.2">
<DEM>
<mesh>53394640</mesh>
<coverage>
<gml:boundedBy>
<gml:Envelope srsName="fguuid:jgd2011.bl">
<gml:lowerCorner>35.0 139.0</gml:lowerCorner>
<gml:upperCorner>35.1 139.1</gml:upperCorner>
</gml:Envelope>
</gml:boundedBy>
<gml:domainSet><gml:Grid><gml:limits><gml:GridEnvelope>
<gml:low>0 0</gml:low>
<gml:high>1 1</gml:high>
</gml:GridEnvelope></gml:limits></gml:Grid></gml:domainSet>
<gml:rangeSet><gml:DataBlock>
<gml:tupleList>
0,10.0
1,20.0
2,30.0
3,-9999.0
</gml:tupleList>
</gml:DataBlock></gml:rangeSet>
<gml:coverageFunction><gml:GridFunction>
<gml:startPoint>0 0</gml:startPoint>
</gml:GridFunction></gml:coverageFunction>
</coverage>
</DEM>
</Dataset>
"#;

    #[test]
    fn test_parse_two_by_two() {
        let tile = parse_dem_xml(SAMPLE, NodataPolicy::Sentinel).unwrap();

        assert_eq!(tile.shape(), (2, 2));
        assert_eq!(tile.grid.get(0, 0), Some(10.0));
        assert_eq!(tile.grid.get(0, 1), Some(20.0));
        assert_eq!(tile.grid.get(1, 0), Some(30.0));
        assert_eq!(tile.grid.get(1, 1), Some(NODATA_VALUE));

        let transform = tile.geo_transform();
        assert_eq!(transform[0], 139.0);
        assert_eq!(transform[3], 35.1);
        assert!((transform[1] - 0.05).abs() < 1e-12);
        assert!((transform[5] + 0.05).abs() < 1e-12);
        assert_eq!(tile.header.metadata.mesh.as_deref(), Some("53394640"));
    }

    #[test]
    fn test_parse_zero_policy() {
        let tile = parse_dem_xml(SAMPLE, NodataPolicy::ReplaceWithZero).unwrap();
        assert_eq!(tile.grid.values(), &[10.0, 20.0, 30.0, 0.0]);
    }

    #[test]
    fn test_parse_rejects_plain_xml() {
        let err = parse_dem_xml("<root><child/></root>", NodataPolicy::Sentinel).unwrap_err();
        assert!(matches!(err, DemError::MalformedDocument(_)));
    }
}
