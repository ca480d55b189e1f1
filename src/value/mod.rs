//! Typed values carried by codeblock parameters
//!
//! Every value kind knows how to validate itself against [`Limits`] and how to
//! encode itself into the platform's parameter record ([`ItemValue`]).

mod item;
mod record;

pub use item::{Enchantment, Item, MAX_STACK_COUNT};
pub use record::{DictEntry, ItemValue, LocationData};

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::Target;
use crate::config::Limits;

/// Value-level validation failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("{field} is {value}, expected {min} to {max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} has {len} entries, at most {max} allowed")]
    TooMany {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{field} is {len} characters long, at most {max} allowed")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{field}: {reason}")]
    Malformed { field: &'static str, reason: String },

    #[error("duplicate dict key '{key}'")]
    DuplicateKey { key: String },
}

/// Storage class of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeClass {
    Local,
    Saved,
    Global,
}

impl ScopeClass {
    /// Platform spelling
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeClass::Local => "local",
            ScopeClass::Saved => "saved",
            ScopeClass::Global => "unsaved",
        }
    }
}

impl fmt::Display for ScopeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeClass::Local => f.write_str("local"),
            ScopeClass::Saved => f.write_str("saved"),
            ScopeClass::Global => f.write_str("global"),
        }
    }
}

/// A (name, class) pair naming a declared variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableRef {
    pub name: String,
    pub scope: ScopeClass,
}

impl VariableRef {
    pub fn new(name: impl Into<String>, scope: ScopeClass) -> Self {
        Self {
            name: name.into(),
            scope,
        }
    }
}

/// Fieldless discriminant of [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Number,
    Location,
    Vector,
    Item,
    Sound,
    Potion,
    Particle,
    GameValue,
    Variable,
    List,
    Dict,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Text => "text",
            ValueKind::Number => "number",
            ValueKind::Location => "location",
            ValueKind::Vector => "vector",
            ValueKind::Item => "item",
            ValueKind::Sound => "sound",
            ValueKind::Potion => "potion",
            ValueKind::Particle => "particle",
            ValueKind::GameValue => "game_value",
            ValueKind::Variable => "variable",
            ValueKind::List => "list",
            ValueKind::Dict => "dict",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        const ALL: [ValueKind; 12] = [
            ValueKind::Text,
            ValueKind::Number,
            ValueKind::Location,
            ValueKind::Vector,
            ValueKind::Item,
            ValueKind::Sound,
            ValueKind::Potion,
            ValueKind::Particle,
            ValueKind::GameValue,
            ValueKind::Variable,
            ValueKind::List,
            ValueKind::Dict,
        ];
        ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A position in the world
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub pitch: Option<f64>,
    pub yaw: Option<f64>,
    pub world: Option<String>,
    pub is_block: bool,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            pitch: None,
            yaw: None,
            world: None,
            is_block: false,
        }
    }

    pub fn with_rotation(mut self, pitch: f64, yaw: f64) -> Self {
        self.pitch = Some(pitch);
        self.yaw = Some(yaw);
        self
    }

    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn with_yaw(mut self, yaw: f64) -> Self {
        self.yaw = Some(yaw);
        self
    }

    pub fn with_world(mut self, world: impl Into<String>) -> Self {
        self.world = Some(world.into());
        self
    }

    /// Mark the location as a block position
    pub fn as_block(mut self) -> Self {
        self.is_block = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sound {
    pub name: String,
    pub pitch: f64,
    pub volume: f64,
}

impl Sound {
    pub const DEFAULT_PITCH: f64 = 1.0;
    pub const DEFAULT_VOLUME: f64 = 2.0;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pitch: Self::DEFAULT_PITCH,
            volume: Self::DEFAULT_VOLUME,
        }
    }

    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Potion {
    pub effect: String,
    pub amplifier: u32,
    /// Duration in ticks
    pub duration: u32,
}

impl Potion {
    pub const MAX_AMPLIFIER: u32 = 255;
    /// Durations at this bound display as infinite
    pub const MAX_DURATION: u32 = 1_000_000;

    pub fn new(effect: impl Into<String>) -> Self {
        Self {
            effect: effect.into(),
            amplifier: 0,
            duration: Self::MAX_DURATION,
        }
    }

    pub fn with_amplifier(mut self, amplifier: u32) -> Self {
        self.amplifier = amplifier;
        self
    }

    pub fn with_duration(mut self, ticks: u32) -> Self {
        self.duration = ticks;
        self
    }
}

/// A particle effect, named the way the platform lists it (`"Angry Villager"`)
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub name: String,
}

impl Particle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A platform-computed value such as a player's location
#[derive(Debug, Clone, PartialEq)]
pub struct GameValue {
    pub kind: String,
    pub target: Target,
}

impl GameValue {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            target: Target::Default,
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }
}

/// A parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Location(Location),
    Vector(Vector),
    Item(Item),
    Sound(Sound),
    Potion(Potion),
    Particle(Particle),
    GameValue(GameValue),
    Variable(VariableRef),
    List(Vec<Value>),
    Dict(Vec<(String, Value)>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn number(n: f64) -> Self {
        Value::Number(n)
    }

    pub fn list(values: impl IntoIterator<Item = Value>) -> Self {
        Value::List(values.into_iter().collect())
    }

    pub fn dict<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Dict(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Text(_) => ValueKind::Text,
            Value::Number(_) => ValueKind::Number,
            Value::Location(_) => ValueKind::Location,
            Value::Vector(_) => ValueKind::Vector,
            Value::Item(_) => ValueKind::Item,
            Value::Sound(_) => ValueKind::Sound,
            Value::Potion(_) => ValueKind::Potion,
            Value::Particle(_) => ValueKind::Particle,
            Value::GameValue(_) => ValueKind::GameValue,
            Value::Variable(_) => ValueKind::Variable,
            Value::List(_) => ValueKind::List,
            Value::Dict(_) => ValueKind::Dict,
        }
    }

    /// Every variable reference in this value, depth first
    pub fn variables(&self) -> Vec<&VariableRef> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a VariableRef>) {
        match self {
            Value::Variable(var) => out.push(var),
            Value::List(values) => values.iter().for_each(|v| v.collect_variables(out)),
            Value::Dict(entries) => entries.iter().for_each(|(_, v)| v.collect_variables(out)),
            _ => {}
        }
    }

    /// Validate and encode into the platform parameter record
    pub fn encode(&self, limits: &Limits) -> Result<ItemValue, ValueError> {
        match self {
            Value::Text(s) => Ok(ItemValue::Text {
                name: if limits.translate_color_codes {
                    translate_color_codes(s)
                } else {
                    s.clone()
                },
            }),
            Value::Number(n) => {
                finite("number", *n)?;
                Ok(ItemValue::Number {
                    name: format_number(*n),
                })
            }
            Value::Location(loc) => encode_location(loc, limits),
            Value::Vector(v) => {
                finite("vector x", v.x)?;
                finite("vector y", v.y)?;
                finite("vector z", v.z)?;
                Ok(ItemValue::Vector {
                    x: v.x,
                    y: v.y,
                    z: v.z,
                })
            }
            Value::Item(item) => {
                item.validate(limits)?;
                Ok(ItemValue::Item {
                    item: item.to_snbt(limits),
                })
            }
            Value::Sound(sound) => {
                non_empty("sound name", &sound.name)?;
                in_range("sound pitch", sound.pitch, 0.5, 2.0)?;
                finite("sound volume", sound.volume)?;
                if sound.volume < 0.0 {
                    return Err(ValueError::OutOfRange {
                        field: "sound volume",
                        value: sound.volume,
                        min: 0.0,
                        max: f64::MAX,
                    });
                }
                Ok(ItemValue::Sound {
                    sound: sound.name.clone(),
                    pitch: sound.pitch,
                    vol: sound.volume,
                })
            }
            Value::Potion(potion) => {
                non_empty("potion effect", &potion.effect)?;
                if potion.amplifier > Potion::MAX_AMPLIFIER {
                    return Err(ValueError::OutOfRange {
                        field: "potion amplifier",
                        value: f64::from(potion.amplifier),
                        min: 0.0,
                        max: f64::from(Potion::MAX_AMPLIFIER),
                    });
                }
                if potion.duration > Potion::MAX_DURATION {
                    return Err(ValueError::OutOfRange {
                        field: "potion duration",
                        value: f64::from(potion.duration),
                        min: 0.0,
                        max: f64::from(Potion::MAX_DURATION),
                    });
                }
                Ok(ItemValue::Potion {
                    pot: potion.effect.clone(),
                    dur: potion.duration,
                    amp: potion.amplifier,
                })
            }
            Value::Particle(particle) => {
                non_empty("particle type", &particle.name)?;
                Ok(ItemValue::Particle {
                    particle: particle.name.clone(),
                })
            }
            Value::GameValue(gv) => {
                non_empty("game value type", &gv.kind)?;
                Ok(ItemValue::GameValue {
                    kind: gv.kind.clone(),
                    target: gv.target.as_str().to_string(),
                })
            }
            Value::Variable(var) => {
                non_empty("variable name", &var.name)?;
                Ok(ItemValue::Variable {
                    name: var.name.clone(),
                    scope: var.scope.as_str().to_string(),
                })
            }
            Value::List(values) => Ok(ItemValue::List {
                values: values
                    .iter()
                    .map(|v| v.encode(limits))
                    .collect::<Result<_, _>>()?,
            }),
            Value::Dict(entries) => {
                let mut seen = HashSet::new();
                let mut encoded = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    if !seen.insert(key.as_str()) {
                        return Err(ValueError::DuplicateKey { key: key.clone() });
                    }
                    encoded.push(DictEntry {
                        key: key.clone(),
                        value: value.encode(limits)?,
                    });
                }
                Ok(ItemValue::Dict { entries: encoded })
            }
        }
    }
}

fn encode_location(loc: &Location, limits: &Limits) -> Result<ItemValue, ValueError> {
    for (field, coord) in [
        ("location x", loc.x),
        ("location y", loc.y),
        ("location z", loc.z),
    ] {
        finite(field, coord)?;
        in_range(
            field,
            coord,
            -limits.coordinate_bound,
            limits.coordinate_bound,
        )?;
    }
    let pitch = loc.pitch.unwrap_or(0.0);
    let yaw = loc.yaw.unwrap_or(0.0);
    in_range("location pitch", pitch, -90.0, 90.0)?;
    in_range("location yaw", yaw, -180.0, 180.0)?;
    Ok(ItemValue::Location {
        is_block: loc.is_block,
        loc: LocationData {
            x: loc.x,
            y: loc.y,
            z: loc.z,
            pitch,
            yaw,
        },
        world: loc.world.clone(),
    })
}

fn finite(field: &'static str, value: f64) -> Result<(), ValueError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValueError::NonFinite { field })
    }
}

fn in_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValueError> {
    finite(field, value)?;
    if value < min || value > max {
        return Err(ValueError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn non_empty(field: &'static str, value: &str) -> Result<(), ValueError> {
    if value.is_empty() {
        Err(ValueError::Empty { field })
    } else {
        Ok(())
    }
}

/// Integral values print without a fraction
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Replace `&` color codes with section signs
pub fn translate_color_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '&' && chars.peek().is_some_and(|next| is_color_code(*next)) {
            out.push('§');
            continue;
        }
        out.push(c);
    }
    out
}

fn is_color_code(c: char) -> bool {
    matches!(c, '0'..='9' | 'a'..='f' | 'k'..='o' | 'r')
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<Location> for Value {
    fn from(loc: Location) -> Self {
        Value::Location(loc)
    }
}

impl From<Vector> for Value {
    fn from(v: Vector) -> Self {
        Value::Vector(v)
    }
}

impl From<Item> for Value {
    fn from(item: Item) -> Self {
        Value::Item(item)
    }
}

impl From<Sound> for Value {
    fn from(sound: Sound) -> Self {
        Value::Sound(sound)
    }
}

impl From<Potion> for Value {
    fn from(potion: Potion) -> Self {
        Value::Potion(potion)
    }
}

impl From<Particle> for Value {
    fn from(particle: Particle) -> Self {
        Value::Particle(particle)
    }
}

impl From<GameValue> for Value {
    fn from(gv: GameValue) -> Self {
        Value::GameValue(gv)
    }
}

impl From<VariableRef> for Value {
    fn from(var: VariableRef) -> Self {
        Value::Variable(var)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Location(loc) => {
                write!(
                    f,
                    "loc({}, {}, {}",
                    format_number(loc.x),
                    format_number(loc.y),
                    format_number(loc.z)
                )?;
                if let Some(pitch) = loc.pitch {
                    write!(f, ", pitch: {}", format_number(pitch))?;
                }
                if let Some(yaw) = loc.yaw {
                    write!(f, ", yaw: {}", format_number(yaw))?;
                }
                if let Some(world) = &loc.world {
                    write!(f, ", world: {world:?}")?;
                }
                f.write_str(")")
            }
            Value::Vector(v) => write!(
                f,
                "vec({}, {}, {})",
                format_number(v.x),
                format_number(v.y),
                format_number(v.z)
            ),
            Value::Item(item) => {
                write!(f, "item({:?}", item.material)?;
                if item.count != 1 {
                    write!(f, ", count: {}", item.count)?;
                }
                if let Some(name) = &item.name {
                    write!(f, ", name: {name:?}")?;
                }
                f.write_str(")")
            }
            Value::Sound(s) => write!(
                f,
                "sound({:?}, pitch: {}, volume: {})",
                s.name,
                format_number(s.pitch),
                format_number(s.volume)
            ),
            Value::Potion(p) => write!(
                f,
                "potion({:?}, amplifier: {}, duration: {})",
                p.effect, p.amplifier, p.duration
            ),
            Value::Particle(p) => write!(f, "particle({:?})", p.name),
            Value::GameValue(gv) => write!(f, "gval({:?} @{})", gv.kind, gv.target),
            Value::Variable(var) => write!(f, "var({} {})", var.scope, var.name),
            Value::List(values) => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Value::Dict(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}
