//! Item stacks and their SNBT rendering

use super::{translate_color_codes, ValueError};
use crate::config::Limits;

/// Highest level a stored enchantment can carry (a short tag)
const MAX_ENCHANTMENT_LEVEL: u32 = i16::MAX as u32;

/// Largest count the byte `Count` tag can hold
pub const MAX_STACK_COUNT: u32 = i8::MAX as u32;

#[derive(Debug, Clone, PartialEq)]
pub struct Enchantment {
    pub id: String,
    pub level: u32,
}

/// An item stack
///
/// The material is a registry id such as `diamond_sword`; the `minecraft:`
/// namespace is added when missing. Raw `nbt` must be a compound (`{…}`) and
/// its entries are appended after the generated ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub material: String,
    pub count: u32,
    pub name: Option<String>,
    pub lore: Vec<String>,
    pub damage: u32,
    pub unbreakable: bool,
    pub enchantments: Vec<Enchantment>,
    pub nbt: Option<String>,
}

impl Item {
    pub fn new(material: impl Into<String>) -> Self {
        Self {
            material: material.into(),
            count: 1,
            name: None,
            lore: Vec::new(),
            damage: 0,
            unbreakable: false,
            enchantments: Vec::new(),
            nbt: None,
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_lore<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lore = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_damage(mut self, damage: u32) -> Self {
        self.damage = damage;
        self
    }

    pub fn unbreakable(mut self) -> Self {
        self.unbreakable = true;
        self
    }

    pub fn with_enchantment(mut self, id: impl Into<String>, level: u32) -> Self {
        self.enchantments.push(Enchantment {
            id: id.into(),
            level,
        });
        self
    }

    pub fn with_nbt(mut self, nbt: impl Into<String>) -> Self {
        self.nbt = Some(nbt.into());
        self
    }

    pub(crate) fn validate(&self, limits: &Limits) -> Result<(), ValueError> {
        if self.material.is_empty() {
            return Err(ValueError::Empty {
                field: "item material",
            });
        }
        if let Some(bad) = self.material.chars().find(|c| !is_id_char(*c)) {
            return Err(ValueError::Malformed {
                field: "item material",
                reason: format!("unexpected character '{bad}' in '{}'", self.material),
            });
        }
        let max_count = limits.max_stack_size.min(MAX_STACK_COUNT);
        if self.count == 0 || self.count > max_count {
            return Err(ValueError::OutOfRange {
                field: "item count",
                value: f64::from(self.count),
                min: 1.0,
                max: f64::from(max_count),
            });
        }
        if self.lore.len() > limits.max_lore_lines {
            return Err(ValueError::TooMany {
                field: "item lore",
                len: self.lore.len(),
                max: limits.max_lore_lines,
            });
        }
        for enchantment in &self.enchantments {
            if enchantment.id.is_empty() {
                return Err(ValueError::Empty {
                    field: "enchantment id",
                });
            }
            if enchantment.level == 0 || enchantment.level > MAX_ENCHANTMENT_LEVEL {
                return Err(ValueError::OutOfRange {
                    field: "enchantment level",
                    value: f64::from(enchantment.level),
                    min: 1.0,
                    max: f64::from(MAX_ENCHANTMENT_LEVEL),
                });
            }
        }
        if let Some(nbt) = &self.nbt {
            let trimmed = nbt.trim();
            if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
                return Err(ValueError::Malformed {
                    field: "item nbt",
                    reason: "expected a compound tag wrapped in braces".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Render the stack as SNBT with a fixed key order
    pub fn to_snbt(&self, limits: &Limits) -> String {
        let mut tag = Vec::new();
        if self.damage > 0 {
            tag.push(format!("Damage:{}", self.damage));
        }
        if self.unbreakable {
            tag.push("Unbreakable:1b".to_string());
        }
        if !self.enchantments.is_empty() {
            let list: Vec<String> = self
                .enchantments
                .iter()
                .map(|e| format!("{{id:\"{}\",lvl:{}s}}", namespaced(&e.id), e.level))
                .collect();
            tag.push(format!("Enchantments:[{}]", list.join(",")));
        }

        let mut display = Vec::new();
        if let Some(name) = &self.name {
            display.push(format!("Name:{}", text_component(name, limits)));
        }
        if !self.lore.is_empty() {
            let lines: Vec<String> = self
                .lore
                .iter()
                .map(|line| text_component(line, limits))
                .collect();
            display.push(format!("Lore:[{}]", lines.join(",")));
        }
        if !display.is_empty() {
            tag.push(format!("display:{{{}}}", display.join(",")));
        }

        if let Some(nbt) = &self.nbt {
            let trimmed = nbt.trim();
            let inner = trimmed[1..trimmed.len() - 1].trim();
            if !inner.is_empty() {
                tag.push(inner.to_string());
            }
        }

        let mut out = format!(
            "{{id:\"{}\",Count:{}b",
            namespaced(&self.material),
            self.count
        );
        if !tag.is_empty() {
            out.push_str(&format!(",tag:{{{}}}", tag.join(",")));
        }
        out.push('}');
        out
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | ':' | '.' | '/' | '-')
}

fn namespaced(id: &str) -> String {
    if id.contains(':') {
        id.to_string()
    } else {
        format!("minecraft:{id}")
    }
}

/// A JSON text component wrapped in a single-quoted SNBT string
fn text_component(text: &str, limits: &Limits) -> String {
    let text = if limits.translate_color_codes {
        translate_color_codes(text)
    } else {
        text.to_string()
    };
    let json = serde_json::Value::String(text).to_string();
    format!("'{}'", json.replace('\\', "\\\\").replace('\'', "\\'"))
}
