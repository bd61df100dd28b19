use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`), widened so it cannot overflow.
    pub fn right(&self) -> u64 {
        self.x as u64 + self.w as u64
    }
    /// Exclusive bottom edge (`y + h`), widened so it cannot overflow.
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.h as u64
    }
    /// Returns true if the rectangle lies inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width as u64 && self.bottom() <= height as u64
    }
}

/// Custom property attached to a map, tileset or tile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type", default = "default_property_type")]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_property_type() -> String {
    "string".into()
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        let kind = match &value {
            Value::Bool(_) => "bool",
            Value::Number(n) if n.is_f64() => "float",
            Value::Number(_) => "int",
            _ => "string",
        };
        Self {
            name: name.into(),
            kind: kind.into(),
            value,
            extra: Map::new(),
        }
    }
}

/// One frame of a tile animation. `tileid` is relative to the owning tileset's `firstgid`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnimationFrame {
    pub duration: u32,
    pub tileid: u32,
}

/// Per-tile record of a tileset (properties and animation).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TileRecord {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<Property>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<Vec<AnimationFrame>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TileRecord {
    pub fn has_property(&self, name: &str) -> bool {
        self.properties
            .as_ref()
            .is_some_and(|props| props.iter().any(|p| p.name == name))
    }
}

/// Embedded tileset, used both for the source tilesets and the emitted chunks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Tileset {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstgid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilecount: Option<u32>,
    #[serde(default)]
    pub columns: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagewidth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imageheight: Option<u32>,
    #[serde(default)]
    pub margin: u32,
    #[serde(default)]
    pub spacing: u32,
    pub tilewidth: u32,
    pub tileheight: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<Property>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiles: Option<Vec<TileRecord>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tileset {
    /// Whether `base` falls into `[firstgid, firstgid + tilecount)`.
    pub fn owns(&self, base: u32) -> bool {
        match (self.firstgid, self.tilecount) {
            (Some(first), Some(count)) => {
                base >= first && (base as u64) < first as u64 + count as u64
            }
            _ => false,
        }
    }

    /// Tile record for a tile id local to this tileset.
    pub fn tile(&self, local: u32) -> Option<&TileRecord> {
        self.tiles.as_ref()?.iter().find(|t| t.id == local)
    }
}

/// Tile layer payload: either a flat array of GIDs or an encoded string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LayerData {
    Tiles(Vec<u64>),
    Encoded(String),
}

/// A map layer. Group layers carry `layers`; tile layers carry `data`.
/// Every other field is preserved verbatim in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Layer {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<Layer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<LayerData>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Layer {
    pub fn tiles(data: Vec<u64>) -> Self {
        Self {
            kind: Some("tilelayer".into()),
            data: Some(LayerData::Tiles(data)),
            ..Default::default()
        }
    }

    pub fn group(layers: Vec<Layer>) -> Self {
        Self {
            kind: Some("group".into()),
            layers: Some(layers),
            ..Default::default()
        }
    }

    pub fn is_group(&self) -> bool {
        self.kind.as_deref() == Some("group")
    }

    pub fn is_tile_layer(&self) -> bool {
        self.kind.as_deref() == Some("tilelayer")
    }
}

/// A Tiled JSON map. Only the fields the optimizer touches are typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MapDocument {
    #[serde(rename = "type", default = "default_map_type")]
    pub kind: String,
    pub tilewidth: u32,
    pub tileheight: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<Property>>,
    pub layers: Vec<Layer>,
    pub tilesets: Vec<Tileset>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_map_type() -> String {
    "map".into()
}

impl MapDocument {
    pub fn from_json_str(s: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_slice(bytes: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Compact JSON, the form written next to the atlases.
    pub fn to_json_string(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Statistics about one optimization run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct OptimizeStats {
    /// Number of source tilesets the map referenced.
    pub source_tilesets: usize,
    /// Nonzero tile references rewritten across all tile layers.
    pub references: usize,
    /// Distinct tiles packed into atlases.
    pub unique_tiles: usize,
    /// References owned by no tileset, replaced with empty tiles.
    pub unresolved: usize,
    /// Number of atlas images emitted.
    pub atlases: usize,
    /// Total pixel area of all atlases.
    pub atlas_area: u64,
    /// Total pixel area of all source tileset images.
    pub source_area: u64,
}

impl OptimizeStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Tilesets: {} -> Atlases: {}, Unique tiles: {}, References: {}, Unresolved: {}, Area: {} px² -> {} px² ({:.2}%)",
            self.source_tilesets,
            self.atlases,
            self.unique_tiles,
            self.references,
            self.unresolved,
            self.source_area,
            self.atlas_area,
            self.area_ratio() * 100.0,
        )
    }

    /// Atlas area relative to the source area (0.0 when there was no source).
    pub fn area_ratio(&self) -> f64 {
        if self.source_area > 0 {
            self.atlas_area as f64 / self.source_area as f64
        } else {
            0.0
        }
    }
}
