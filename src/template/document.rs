//! Serde model of the platform's template document

use serde::{Deserialize, Serialize};

use crate::value::ItemValue;

/// Top-level document, `{"blocks": [...]}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub blocks: Vec<BlockRecord>,
}

/// A codeblock or a bracket, tagged by `"id"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "id", rename_all = "lowercase")]
pub enum BlockRecord {
    Block(CodeBlock),
    Bracket(Bracket),
}

impl BlockRecord {
    pub fn is_bracket(&self) -> bool {
        matches!(self, BlockRecord::Bracket(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub block: String,
    #[serde(default)]
    pub args: Args,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(rename = "subAction", default, skip_serializing_if = "Option::is_none")]
    pub sub_action: Option<String>,
    /// Function or process name on definition and call blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverted: Option<String>,
}

impl CodeBlock {
    pub fn new(block: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            args: Args::default(),
            action: None,
            sub_action: None,
            data: None,
            target: None,
            inverted: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }
}

/// Parameter slots of a codeblock
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Args {
    pub items: Vec<ItemSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSlot {
    pub item: ItemValue,
    pub slot: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bracket {
    pub direct: BracketDirection,
    #[serde(rename = "type")]
    pub kind: BracketType,
}

impl Bracket {
    pub fn open(kind: BracketType) -> Self {
        Self {
            direct: BracketDirection::Open,
            kind,
        }
    }

    pub fn close(kind: BracketType) -> Self {
        Self {
            direct: BracketDirection::Close,
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BracketDirection {
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BracketType {
    #[serde(rename = "norm")]
    Normal,
    #[serde(rename = "repeat")]
    Repeat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_codeblock_field_order() {
        let record = BlockRecord::Block(CodeBlock {
            target: Some("Default".to_string()),
            ..CodeBlock::new("player_action").with_action("SendMessage")
        });
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"id":"block","block":"player_action","args":{"items":[]},"action":"SendMessage","target":"Default"}"#
        );
    }

    #[test]
    fn test_bracket_record() {
        let record = BlockRecord::Bracket(Bracket::open(BracketType::Repeat));
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"id":"bracket","direct":"open","type":"repeat"}"#
        );
    }

    #[test]
    fn test_document_parses_back() {
        let json = r#"{"blocks":[{"id":"block","block":"func","args":{"items":[]},"data":"setup"},{"id":"bracket","direct":"close","type":"norm"}]}"#;
        let document: TemplateDocument = serde_json::from_str(json).unwrap();
        assert_eq!(
            document.blocks,
            vec![
                BlockRecord::Block(CodeBlock::new("func").with_data("setup")),
                BlockRecord::Bracket(Bracket::close(BracketType::Normal)),
            ]
        );
        assert_eq!(serde_json::to_string(&document).unwrap(), json);
    }
}
