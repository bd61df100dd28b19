use crate::error::{OptimizerError, Result};
use crate::model::{Rect, Tileset};

/// Number of tile columns in a tileset image, honouring margin and spacing.
pub fn tileset_columns(tileset: &Tileset, tile_size: u32) -> Result<u32> {
    let image_width = tileset
        .imagewidth
        .ok_or_else(|| missing(tileset, "imagewidth"))?;
    let overflow = || out_of_bounds(tileset, tile_size);
    let spaced = tile_size
        .checked_add(tileset.spacing)
        .ok_or_else(overflow)?;
    let usable = image_width
        .checked_add(tileset.spacing)
        .ok_or_else(overflow)?
        .saturating_sub(tileset.margin);
    Ok(usable / spaced)
}

/// Pixel region of tile `base` (a global, unflipped id) inside `tileset`'s image.
///
/// Rows and columns are 1-based internally: index `n` of a tileset with `c`
/// columns sits on row `ceil(n / c)` and column `n - (row - 1) * c`.
pub fn tile_region(tileset: &Tileset, base: u32, tile_size: u32) -> Result<Rect> {
    let columns = tileset_columns(tileset, tile_size)?;
    let firstgid = tileset
        .firstgid
        .ok_or_else(|| missing(tileset, "firstgid"))?;
    if columns == 0 || base < firstgid {
        return Err(out_of_bounds(tileset, tile_size));
    }
    // columns > 0 implies tile_size + spacing did not overflow
    let spaced = tile_size + tileset.spacing;

    let index = base - firstgid + 1;
    let row = (index - 1) / columns + 1;
    let column = index - (row - 1) * columns;

    let offset = |cells: u32| {
        cells
            .checked_mul(spaced)
            .and_then(|px| px.checked_add(tileset.margin))
            .ok_or_else(|| out_of_bounds(tileset, tile_size))
    };
    let left = offset(column - 1)?;
    let top = offset(row - 1)?;
    let region = Rect::new(left, top, tile_size, tile_size);
    if region.x.checked_add(region.w).is_none() || region.y.checked_add(region.h).is_none() {
        return Err(out_of_bounds(tileset, tile_size));
    }
    Ok(region)
}

fn out_of_bounds(tileset: &Tileset, tile_size: u32) -> OptimizerError {
    OptimizerError::RegionOutOfBounds {
        x: 0,
        y: 0,
        w: tile_size,
        h: tile_size,
        width: tileset.imagewidth.unwrap_or(0),
        height: tileset.imageheight.unwrap_or(0),
    }
}

fn missing(tileset: &Tileset, field: &'static str) -> OptimizerError {
    OptimizerError::MissingGeometry {
        tileset: tileset.name.clone(),
        field,
    }
}
