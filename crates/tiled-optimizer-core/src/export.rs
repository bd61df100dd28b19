use crate::pipeline::OptimizeOutput;
use serde_json::{Value, json};

/// Summary of a run as JSON: `{ atlases: [...], stats }`.
/// Each atlas lists its image, size and the global id range it covers.
pub fn to_manifest_json(output: &OptimizeOutput) -> Value {
    let atlases = output
        .atlases
        .iter()
        .map(|a| {
            let ts = &a.tileset;
            let firstgid = ts.firstgid.unwrap_or_default();
            let count = ts.tilecount.unwrap_or_default();
            json!({
                "image": a.name,
                "name": ts.name,
                "width": a.rgba.width(),
                "height": a.rgba.height(),
                "columns": ts.columns,
                "tilecount": count,
                "gids": {"first": firstgid, "last": firstgid + count.saturating_sub(1)},
            })
        })
        .collect::<Vec<_>>();
    json!({ "atlases": atlases, "stats": &output.stats })
}
