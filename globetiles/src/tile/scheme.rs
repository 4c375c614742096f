//! Root tile layouts.

use crate::crs::{mercator_half_extent, CrsId, EPSG_3857, EPSG_4326};
use crate::extent::Extent;

use super::TileId;

/// The fixed set of level-0 tiles covering a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemeTile {
    crs: CrsId,
    roots: Vec<(TileId, Extent)>,
}

impl SchemeTile {
    /// Global WGS84 scheme: two roots split at the prime meridian.
    pub fn global_geographic() -> Self {
        Self::from_extent(Extent::new(EPSG_4326, -180.0, 180.0, -90.0, 90.0), 2, 1)
    }

    /// Global Web Mercator scheme: one square root.
    pub fn global_mercator() -> Self {
        let half = mercator_half_extent();
        Self::from_extent(Extent::new(EPSG_3857, -half, half, -half, half), 1, 1)
    }

    /// Grid of `columns × rows` roots over `extent`.
    ///
    /// Rows count southward from the north edge. Zero counts are treated as
    /// one.
    pub fn from_extent(extent: Extent, columns: u32, rows: u32) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let (width, height) = extent.dimensions();
        let step_x = width / f64::from(columns);
        let step_y = height / f64::from(rows);

        let edge_x = |col: u32| {
            if col == columns {
                extent.east
            } else {
                extent.west + step_x * f64::from(col)
            }
        };
        let edge_y = |row: u32| {
            if row == rows {
                extent.south
            } else {
                extent.north - step_y * f64::from(row)
            }
        };

        let mut roots = Vec::with_capacity((columns * rows) as usize);
        for row in 0..rows {
            for col in 0..columns {
                let tile = Extent::new(
                    extent.crs().clone(),
                    edge_x(col),
                    edge_x(col + 1),
                    edge_y(row + 1),
                    edge_y(row),
                );
                roots.push((TileId::new(0, row, col), tile));
            }
        }

        Self {
            crs: extent.crs().clone(),
            roots,
        }
    }

    pub fn crs(&self) -> &CrsId {
        &self.crs
    }

    pub fn roots(&self) -> &[(TileId, Extent)] {
        &self.roots
    }

    /// Union of all root extents.
    pub fn extent(&self) -> Extent {
        let mut roots = self.roots.iter().map(|(_, e)| e);
        let first = roots
            .next()
            .cloned()
            .unwrap_or_else(|| Extent::new(self.crs.clone(), 0.0, 0.0, 0.0, 0.0));
        roots.fold(first, |acc, e| acc.cover(e))
    }
}
