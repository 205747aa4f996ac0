//! Grid cell ("bucket") arithmetic.
//!
//! The world is divided into one-degree bands of longitude and latitude, and
//! each band square is further split into an 8 x 8 grid of sub-cells. A
//! [`GridCell`] names one sub-cell. Cells are addressed linearly by a global
//! column (west to east, wrapping at the antimeridian) and row (south to
//! north, clamped at the poles), which is what the sliding window uses to
//! tell which way the viewpoint moved.

use std::fmt;

/// Number of sub-cells per degree along each axis.
pub const SUBDIVISIONS: i32 = 8;

/// Size of one cell along each axis, in degrees.
pub const CELL_SPAN_DEG: f64 = 1.0 / SUBDIVISIONS as f64;

/// Number of cell columns around the globe.
pub const COLUMNS: i64 = 360 * SUBDIVISIONS as i64;

/// Number of cell rows from pole to pole.
pub const ROWS: i64 = 180 * SUBDIVISIONS as i64;

/// Identity of one terrain cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GridCell {
    /// Longitude band in whole degrees, `-180..=179`.
    pub lon: i32,
    /// Latitude band in whole degrees, `-90..=89`.
    pub lat: i32,
    /// Sub-column within the band, `0..8`.
    pub x: i32,
    /// Sub-row within the band, `0..8`.
    pub y: i32,
}

impl GridCell {
    /// Create a cell from its four components.
    #[must_use]
    pub fn new(lon: i32, lat: i32, x: i32, y: i32) -> Self {
        Self { lon, lat, x, y }
    }

    /// Find the cell containing a geodetic position (degrees).
    ///
    /// Longitude is wrapped into `[-180, 180)`; latitude is clamped so that
    /// the poles fall into the outermost rows.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn containing(lon_deg: f64, lat_deg: f64) -> Self {
        let column = ((lon_deg + 180.0) * f64::from(SUBDIVISIONS)).floor() as i64;
        let row = ((lat_deg + 90.0) * f64::from(SUBDIVISIONS)).floor() as i64;
        Self::from_column_row(column, row)
    }

    /// Build a cell from a global column and row.
    ///
    /// Columns wrap around the globe, rows clamp at the poles.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_column_row(column: i64, row: i64) -> Self {
        let column = column.rem_euclid(COLUMNS);
        let row = row.clamp(0, ROWS - 1);
        let sub = i64::from(SUBDIVISIONS);
        Self {
            lon: (column / sub) as i32 - 180,
            lat: (row / sub) as i32 - 90,
            x: (column % sub) as i32,
            y: (row % sub) as i32,
        }
    }

    /// Global column of this cell, counting east from the antimeridian.
    #[must_use]
    pub fn column(&self) -> i64 {
        (i64::from(self.lon) + 180) * i64::from(SUBDIVISIONS) + i64::from(self.x)
    }

    /// Global row of this cell, counting north from the south pole.
    #[must_use]
    pub fn row(&self) -> i64 {
        (i64::from(self.lat) + 90) * i64::from(SUBDIVISIONS) + i64::from(self.y)
    }

    /// The cell `dx` columns east and `dy` rows north of this one.
    #[must_use]
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::from_column_row(self.column() + i64::from(dx), self.row() + i64::from(dy))
    }

    /// Signed number of columns from `self` east to `other`, taking the
    /// short way around the antimeridian.
    #[must_use]
    pub fn column_delta(&self, other: &GridCell) -> i64 {
        let delta = (other.column() - self.column()).rem_euclid(COLUMNS);
        if delta > COLUMNS / 2 {
            delta - COLUMNS
        } else {
            delta
        }
    }

    /// Signed number of rows from `self` north to `other`.
    #[must_use]
    pub fn row_delta(&self, other: &GridCell) -> i64 {
        other.row() - self.row()
    }

    /// Flat numeric index used in tile file names.
    #[must_use]
    pub fn index(&self) -> i64 {
        ((i64::from(self.lon) + 180) << 14)
            + ((i64::from(self.lat) + 90) << 6)
            + (i64::from(self.y) << 3)
            + i64::from(self.x)
    }

    /// Relative directory holding this cell's tile, e.g. `w130n30/w123n37`.
    ///
    /// The first component is the enclosing 10 x 10 degree block, the second
    /// the one-degree band. Hemisphere letters come from the block.
    #[must_use]
    pub fn base_path(&self) -> String {
        let top_lon = self.lon.div_euclid(10) * 10;
        let top_lat = self.lat.div_euclid(10) * 10;
        let hem = if top_lon >= 0 { 'e' } else { 'w' };
        let pole = if top_lat >= 0 { 'n' } else { 's' };
        format!(
            "{hem}{:03}{pole}{:02}/{hem}{:03}{pole}{:02}",
            top_lon.abs(),
            top_lat.abs(),
            self.lon.abs(),
            self.lat.abs()
        )
    }

    /// Geodetic centre of the cell as `(lon, lat)` in degrees.
    #[must_use]
    pub fn center_lon_lat(&self) -> (f64, f64) {
        (
            f64::from(self.lon) + (f64::from(self.x) + 0.5) * CELL_SPAN_DEG,
            f64::from(self.lat) + (f64::from(self.y) + 0.5) * CELL_SPAN_DEG,
        )
    }

    /// Size of the cell as `(lon, lat)` in degrees.
    #[must_use]
    pub fn span(&self) -> (f64, f64) {
        (CELL_SPAN_DEG, CELL_SPAN_DEG)
    }

    /// South-west corner of the cell as `(lon, lat)` in degrees.
    #[must_use]
    pub fn origin_lon_lat(&self) -> (f64, f64) {
        (
            f64::from(self.lon) + f64::from(self.x) * CELL_SPAN_DEG,
            f64::from(self.lat) + f64::from(self.y) * CELL_SPAN_DEG,
        )
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}:{},{}", self.lon, self.lat, self.x, self.y)
    }
}
