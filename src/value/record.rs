//! Serialized parameter records as they appear in template documents

use serde::{Deserialize, Serialize};

/// One parameter record, `{"id": …, "data": {…}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "id", content = "data")]
pub enum ItemValue {
    #[serde(rename = "txt")]
    Text { name: String },
    #[serde(rename = "num")]
    Number { name: String },
    #[serde(rename = "loc")]
    Location {
        #[serde(rename = "isBlock")]
        is_block: bool,
        loc: LocationData,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        world: Option<String>,
    },
    #[serde(rename = "vec")]
    Vector { x: f64, y: f64, z: f64 },
    #[serde(rename = "item")]
    Item { item: String },
    #[serde(rename = "snd")]
    Sound { sound: String, pitch: f64, vol: f64 },
    #[serde(rename = "pot")]
    Potion { pot: String, dur: u32, amp: u32 },
    #[serde(rename = "part")]
    Particle { particle: String },
    #[serde(rename = "var")]
    Variable { name: String, scope: String },
    #[serde(rename = "g_val")]
    GameValue {
        #[serde(rename = "type")]
        kind: String,
        target: String,
    },
    #[serde(rename = "bl_tag")]
    Tag {
        option: String,
        tag: String,
        action: String,
        block: String,
    },
    #[serde(rename = "list")]
    List { values: Vec<ItemValue> },
    #[serde(rename = "dict")]
    Dict { entries: Vec<DictEntry> },
}

/// Coordinates of a location record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub pitch: f64,
    pub yaw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictEntry {
    pub key: String,
    pub value: ItemValue,
}
