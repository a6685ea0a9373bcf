//! Tiled JSON map parsing: layer tree, collision lookups, meeting zones.

use crate::error::MapError;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Layer group names that bucket tile layers into draw roles.
pub const FLOOR_GROUP: &str = "floor";
/// Wall layer group name.
pub const WALLS_GROUP: &str = "walls";
/// Furniture layer group name.
pub const FURNITURE_GROUP: &str = "furniture";
/// Name of the tile layer holding collision flags.
pub const COLLISION_LAYER: &str = "collisions";

/// Marker property identifying a meeting-room object.
const MEETING_ROOM_PROP: &str = "meetingRoom";

#[derive(Deserialize)]
struct JsonMap {
    width: u32,
    height: u32,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    tilesets: Vec<JsonTileset>,
    #[serde(default)]
    layers: Vec<JsonLayer>,
}

#[derive(Deserialize)]
struct JsonTileset {
    firstgid: u32,
    image: String,
    columns: u32,
    tilecount: u32,
    tilewidth: u32,
    tileheight: u32,
}

#[derive(Deserialize)]
struct JsonLayer {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    data: Vec<u32>,
    #[serde(default)]
    width: usize,
    #[serde(default)]
    height: usize,
    #[serde(default)]
    layers: Vec<JsonLayer>,
    #[serde(default)]
    objects: Option<Vec<JsonObject>>,
}

#[derive(Deserialize)]
struct JsonObject {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    properties: Vec<JsonProperty>,
}

#[derive(Deserialize)]
struct JsonProperty {
    name: String,
    value: JsonValue,
}

/// A typed object/zone property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Boolean property.
    Bool(bool),
    /// Integer property.
    I64(i64),
    /// Floating-point property.
    F32(f32),
    /// String property.
    String(String),
}

/// Open-ended key/value property bag attached to map objects.
#[derive(Debug, Clone, Default)]
pub struct Properties(HashMap<String, PropertyValue>);

impl Properties {
    /// Look up a string property.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(PropertyValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Look up a boolean property.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.0.get(name) {
            Some(PropertyValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    /// Look up a numeric property, converting integers as needed.
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        match self.0.get(name) {
            Some(PropertyValue::F32(v)) => Some(*v),
            Some(PropertyValue::I64(v)) => Some(*v as f32),
            _ => None,
        }
    }
}

fn properties_from_json(props: Vec<JsonProperty>) -> Properties {
    let mut out = HashMap::new();
    for p in props {
        let parsed = if let Some(v) = p.value.as_bool() {
            Some(PropertyValue::Bool(v))
        } else if let Some(v) = p.value.as_i64() {
            Some(PropertyValue::I64(v))
        } else if let Some(v) = p.value.as_f64() {
            Some(PropertyValue::F32(v as f32))
        } else {
            p.value.as_str().map(|s| PropertyValue::String(s.to_owned()))
        };
        if let Some(value) = parsed {
            let _ = out.insert(p.name, value);
        }
    }
    Properties(out)
}

/// One plane of flat tile GIDs (0 = empty), row-major.
#[derive(Debug, Clone)]
pub struct TileLayer {
    /// Layer name.
    pub name: String,
    /// Width in tiles.
    pub width: usize,
    /// Height in tiles.
    pub height: usize,
    /// Flat GID array, `width * height` long.
    pub data: Vec<u32>,
}

impl TileLayer {
    /// GID at a tile coordinate, or 0 when out of range.
    pub fn gid_at(&self, x: usize, y: usize) -> u32 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.data[y * self.width + x]
    }
}

/// A named object with rectangular pixel bounds and a property bag.
#[derive(Debug, Clone)]
pub struct MapObject {
    /// Object id, unique within the map document.
    pub id: u32,
    /// Object name (may be empty).
    pub name: String,
    /// X position in pixels.
    pub x: f32,
    /// Y position in pixels.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Key/value properties.
    pub properties: Properties,
}

/// A set of map objects.
#[derive(Debug, Clone)]
pub struct ObjectLayer {
    /// Layer name.
    pub name: String,
    /// Objects in document order.
    pub objects: Vec<MapObject>,
}

/// A named group nesting child layers.
#[derive(Debug, Clone)]
pub struct GroupLayer {
    /// Group name; role buckets match on this exactly.
    pub name: String,
    /// Child layers in document order.
    pub layers: Vec<Layer>,
}

/// One layer of the map document.
#[derive(Debug, Clone)]
pub enum Layer {
    /// Flat tile plane.
    Tiles(TileLayer),
    /// Object/zone metadata plane.
    Objects(ObjectLayer),
    /// Nested group of layers.
    Group(GroupLayer),
}

fn layer_from_json(l: JsonLayer) -> Result<Layer, MapError> {
    // Object layers are recognized by their declared type or, for older
    // documents, by the presence of an objects array.
    if l.kind.as_deref() == Some("group") {
        let layers = l
            .layers
            .into_iter()
            .map(layer_from_json)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Layer::Group(GroupLayer {
            name: l.name,
            layers,
        }));
    }
    if l.kind.as_deref() == Some("objectgroup") || l.objects.is_some() {
        let objects = l
            .objects
            .unwrap_or_default()
            .into_iter()
            .map(|o| MapObject {
                id: o.id,
                name: o.name,
                x: o.x,
                y: o.y,
                width: o.width,
                height: o.height,
                properties: properties_from_json(o.properties),
            })
            .collect();
        return Ok(Layer::Objects(ObjectLayer {
            name: l.name,
            objects,
        }));
    }
    if l.data.len() != l.width * l.height {
        return Err(MapError::InvalidLayerSize(l.name));
    }
    Ok(Layer::Tiles(TileLayer {
        name: l.name,
        width: l.width,
        height: l.height,
        data: l.data,
    }))
}

/// How a meeting zone is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneTrigger {
    /// The meeting view opens the moment the player enters the zone.
    OnEnter,
    /// Entering shows a prompt; the action key opens the view.
    OnAction,
}

/// A rectangular map region that opens a meeting view, derived once from
/// object-layer metadata at map load time.
#[derive(Debug, Clone)]
pub struct MeetingZone {
    /// Stable zone identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Meeting room name from the marker property.
    pub room: String,
    /// Left edge in tile units.
    pub x: f32,
    /// Top edge in tile units.
    pub y: f32,
    /// Width in tile units.
    pub width: f32,
    /// Height in tile units.
    pub height: f32,
    /// Trigger mode; defaults to entering automatically.
    pub trigger: ZoneTrigger,
    /// Optional prompt message for action-triggered zones.
    pub message: Option<String>,
    /// Optional overlay width as a percentage of the screen.
    pub width_pct: Option<f32>,
    /// Whether the open view can be closed; defaults to true.
    pub closable: bool,
}

impl MeetingZone {
    /// Whether a continuous tile-unit position lies inside the zone.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

/// Declaration of one tileset: a contiguous GID range mapped onto a sprite
/// sheet image with a known column count.
#[derive(Debug, Clone)]
pub struct TilesetDef {
    /// First GID of the range.
    pub firstgid: u32,
    /// Image path as written in the map document.
    pub image: String,
    /// Atlas column count.
    pub columns: u32,
    /// Number of tiles in the range.
    pub tilecount: u32,
    /// Source tile width in pixels.
    pub tile_width: u32,
    /// Source tile height in pixels.
    pub tile_height: u32,
}

/// Parsed map document: dimensions, tileset declarations and the layer tree.
#[derive(Debug, Clone)]
pub struct TileMap {
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Tile width in pixels; all tile layers share this grid.
    pub tile_width: u32,
    /// Tile height in pixels.
    pub tile_height: u32,
    /// Tileset declarations in document order.
    pub tilesets: Vec<TilesetDef>,
    /// Top-level layers in document (draw) order.
    pub layers: Vec<Layer>,
}

impl TileMap {
    /// Parse a map from an in-memory JSON string.
    pub fn load_from_str(json: &str) -> Result<Self, MapError> {
        let raw: JsonMap = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    /// Load a map from a `.tmj` / `.json` file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MapError> {
        let p = path.as_ref();
        match p.extension().and_then(|e| e.to_str()) {
            Some("json") | Some("tmj") => {}
            _ => return Err(MapError::UnsupportedFormat(p.display().to_string())),
        }
        let txt = fs::read_to_string(p).map_err(|source| MapError::Io {
            path: p.to_path_buf(),
            source,
        })?;
        let raw: JsonMap = serde_json::from_str(&txt).map_err(|source| MapError::Json {
            path: p.to_path_buf(),
            source,
        })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: JsonMap) -> Result<Self, MapError> {
        let layers = raw
            .layers
            .into_iter()
            .map(layer_from_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TileMap {
            width: raw.width,
            height: raw.height,
            tile_width: raw.tilewidth,
            tile_height: raw.tileheight,
            tilesets: raw
                .tilesets
                .into_iter()
                .map(|t| TilesetDef {
                    firstgid: t.firstgid,
                    image: t.image,
                    columns: t.columns,
                    tilecount: t.tilecount,
                    tile_width: t.tilewidth,
                    tile_height: t.tileheight,
                })
                .collect(),
            layers,
        })
    }

    /// First tile layer with the given name, searched depth-first.
    pub fn tile_layer(&self, name: &str) -> Option<&TileLayer> {
        fn find<'a>(layers: &'a [Layer], name: &str) -> Option<&'a TileLayer> {
            for layer in layers {
                match layer {
                    Layer::Tiles(t) if t.name == name => return Some(t),
                    Layer::Group(g) => {
                        if let Some(found) = find(&g.layers, name) {
                            return Some(found);
                        }
                    }
                    Layer::Tiles(_) | Layer::Objects(_) => {}
                }
            }
            None
        }
        find(&self.layers, name)
    }

    /// Direct tile-layer children of the first group named `role`, in
    /// document order (earlier = drawn first = visually behind).
    pub fn role_layers(&self, role: &str) -> Vec<&TileLayer> {
        fn find_group<'a>(layers: &'a [Layer], role: &str) -> Option<&'a GroupLayer> {
            for layer in layers {
                match layer {
                    Layer::Group(g) if g.name == role => return Some(g),
                    Layer::Group(g) => {
                        if let Some(found) = find_group(&g.layers, role) {
                            return Some(found);
                        }
                    }
                    Layer::Tiles(_) | Layer::Objects(_) => {}
                }
            }
            None
        }
        match find_group(&self.layers, role) {
            Some(group) => group
                .layers
                .iter()
                .filter_map(|l| match l {
                    Layer::Tiles(t) => Some(t),
                    _ => None,
                })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Floor tile layers in draw order.
    pub fn floor_layers(&self) -> Vec<&TileLayer> {
        self.role_layers(FLOOR_GROUP)
    }

    /// Wall tile layers in draw order.
    pub fn wall_layers(&self) -> Vec<&TileLayer> {
        self.role_layers(WALLS_GROUP)
    }

    /// Furniture tile layers in draw order.
    pub fn furniture_layers(&self) -> Vec<&TileLayer> {
        self.role_layers(FURNITURE_GROUP)
    }

    /// Whether the collision layer marks a tile as blocked.
    ///
    /// Out-of-range coordinates and a missing collision layer both resolve
    /// to "not blocked"; the shipped map asset relies on this default.
    pub fn is_collision_tile(&self, x: i32, y: i32) -> bool {
        let Some(layer) = self.tile_layer(COLLISION_LAYER) else {
            return false;
        };
        if x < 0 || y < 0 || x as usize >= layer.width || y as usize >= layer.height {
            return false;
        }
        layer.gid_at(x as usize, y as usize) > 0
    }

    /// All object layers in the tree, nested ones included, document order.
    pub fn object_layers(&self) -> Vec<&ObjectLayer> {
        fn collect<'a>(layers: &'a [Layer], out: &mut Vec<&'a ObjectLayer>) {
            for layer in layers {
                match layer {
                    Layer::Objects(o) => out.push(o),
                    Layer::Group(g) => collect(&g.layers, out),
                    Layer::Tiles(_) => {}
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.layers, &mut out);
        out
    }

    /// Meeting zones derived from object metadata, in document order.
    ///
    /// Objects qualify by carrying a string `meetingRoom` property. Pixel
    /// bounds are converted to tile units using the map tile size.
    pub fn meeting_zones(&self) -> Vec<MeetingZone> {
        let tw = self.tile_width.max(1) as f32;
        let th = self.tile_height.max(1) as f32;
        let mut zones = Vec::new();
        for layer in self.object_layers() {
            for obj in &layer.objects {
                let Some(room) = obj.properties.get_string(MEETING_ROOM_PROP) else {
                    continue;
                };
                let trigger = match obj.properties.get_string("meetingTrigger") {
                    Some("onaction") => ZoneTrigger::OnAction,
                    _ => ZoneTrigger::OnEnter,
                };
                zones.push(MeetingZone {
                    id: format!("meeting-{}", obj.id),
                    name: if obj.name.is_empty() {
                        format!("Room-{}", obj.id)
                    } else {
                        obj.name.clone()
                    },
                    room: room.to_owned(),
                    x: obj.x / tw,
                    y: obj.y / th,
                    width: obj.width / tw,
                    height: obj.height / th,
                    trigger,
                    message: obj
                        .properties
                        .get_string("meetingTriggerMessage")
                        .map(str::to_owned),
                    width_pct: obj.properties.get_f32("meetingWidth"),
                    closable: obj.properties.get_bool("meetingClosable") != Some(false),
                });
            }
        }
        zones
    }
}
