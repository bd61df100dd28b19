use crate::error::Result;
use crate::model::{Layer, LayerData};

/// Visits the GID array of every tile layer in document order, descending
/// into group layers at any depth. Layers of other types, and tile layers
/// whose data is encoded as a string, are skipped.
pub fn visit_tile_layers<F>(layers: &mut [Layer], visit: &mut F) -> Result<()>
where
    F: FnMut(&mut [u64]) -> Result<()>,
{
    for layer in layers.iter_mut() {
        if layer.is_group() {
            if let Some(children) = layer.layers.as_mut() {
                visit_tile_layers(children, visit)?;
            }
            continue;
        }
        if !layer.is_tile_layer() {
            continue;
        }
        if let Some(LayerData::Tiles(data)) = layer.data.as_mut() {
            visit(data)?;
        }
    }
    Ok(())
}

/// Rewrites every nonzero cell of every tile layer through `rewrite`,
/// left to right. Empty cells are left untouched.
pub fn rewrite_tile_layers<F>(layers: &mut [Layer], rewrite: &mut F) -> Result<()>
where
    F: FnMut(u64) -> Result<u64>,
{
    visit_tile_layers(layers, &mut |data: &mut [u64]| {
        for cell in data.iter_mut() {
            if *cell == 0 {
                continue;
            }
            *cell = rewrite(*cell)?;
        }
        Ok(())
    })
}
