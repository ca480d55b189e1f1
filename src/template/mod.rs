//! Templates and their compact code encoding
//!
//! A template is the ordered list of block records plus header metadata. The
//! platform imports it as `base64(gzip(json + "\n"))`, usually wrapped in a
//! small JSON envelope carrying the author and name.
//!
//! # Example
//!
//! ```rust
//! use dftemplate::template::{decode, Template, TemplateHeader};
//! use dftemplate::CompilerConfig;
//!
//! let template = Template::new(TemplateHeader::new("empty", "someone"), Vec::new());
//! let encoded = template.encode(&CompilerConfig::default()).unwrap();
//! assert_eq!(decode(&encoded.code).unwrap(), *template.document());
//! ```

mod document;
pub mod dump;

pub use document::{
    Args, BlockRecord, Bracket, BracketDirection, BracketType, CodeBlock, ItemSlot,
    TemplateDocument,
};

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use tracing::debug;

use crate::config::CompilerConfig;
use crate::error::CompileError;

/// Metadata carried alongside the blocks
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateHeader {
    pub name: String,
    pub author: String,
    pub compiler_version: String,
}

impl TemplateHeader {
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            author: author.into(),
            compiler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// A compiled template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    header: TemplateHeader,
    document: TemplateDocument,
}

impl Template {
    pub fn new(header: TemplateHeader, blocks: Vec<BlockRecord>) -> Self {
        Self {
            header,
            document: TemplateDocument { blocks },
        }
    }

    pub fn header(&self) -> &TemplateHeader {
        &self.header
    }

    pub fn blocks(&self) -> &[BlockRecord] {
        &self.document.blocks
    }

    pub fn document(&self) -> &TemplateDocument {
        &self.document
    }

    /// The compact document JSON, exactly as it is compressed
    pub fn document_json(&self) -> Result<String, CompileError> {
        serde_json::to_string(&self.document)
            .map_err(|e| CompileError::encoding(format!("serializing document: {e}")))
    }

    /// Indented document JSON for inspection
    pub fn document_json_pretty(&self) -> Result<String, CompileError> {
        serde_json::to_string_pretty(&self.document)
            .map_err(|e| CompileError::encoding(format!("serializing document: {e}")))
    }

    /// Compress and encode into the platform's code string
    pub fn encode(&self, config: &CompilerConfig) -> Result<EncodedTemplate, CompileError> {
        let code = encode_document(&self.document, config)?;
        Ok(EncodedTemplate {
            header: self.header.clone(),
            code,
            format_version: config.format_version,
        })
    }
}

/// Encode a document as `base64(gzip(json + "\n"))`
pub fn encode_document(
    document: &TemplateDocument,
    config: &CompilerConfig,
) -> Result<String, CompileError> {
    let mut json = serde_json::to_string(document)
        .map_err(|e| CompileError::encoding(format!("serializing document: {e}")))?;
    json.push('\n');

    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(config.compression_level));
    encoder
        .write_all(json.as_bytes())
        .map_err(|e| CompileError::encoding(format!("compressing document: {e}")))?;
    let compressed = encoder
        .finish()
        .map_err(|e| CompileError::encoding(format!("compressing document: {e}")))?;

    let code = STANDARD.encode(compressed);
    if let Some(max) = config.max_code_length {
        if code.len() > max {
            return Err(CompileError::encoding(format!(
                "code is {} characters long, the limit is {max}",
                code.len()
            )));
        }
    }
    debug!(
        blocks = document.blocks.len(),
        json_bytes = json.len(),
        code_len = code.len(),
        "encoded template"
    );
    Ok(code)
}

/// Decode a code string back into its document
pub fn decode(code: &str) -> Result<TemplateDocument, CompileError> {
    let compressed = STANDARD
        .decode(code.trim())
        .map_err(|e| CompileError::decoding(format!("invalid base64: {e}")))?;
    let mut json = String::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_string(&mut json)
        .map_err(|e| CompileError::decoding(format!("invalid gzip data: {e}")))?;
    serde_json::from_str(&json)
        .map_err(|e| CompileError::decoding(format!("invalid document: {e}")))
}

/// The encoded template, ready to hand to the platform
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTemplate {
    pub header: TemplateHeader,
    pub code: String,
    pub format_version: u32,
}

#[derive(Serialize)]
struct Envelope<'a> {
    author: &'a str,
    name: &'a str,
    version: u32,
    code: &'a str,
}

impl EncodedTemplate {
    /// The `{author, name, version, code}` envelope the platform's template
    /// items carry
    pub fn envelope_json(&self) -> Result<String, CompileError> {
        let envelope = Envelope {
            author: &self.header.author,
            name: &self.header.name,
            version: self.format_version,
            code: &self.code,
        };
        serde_json::to_string(&envelope)
            .map_err(|e| CompileError::encoding(format!("serializing envelope: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ItemValue;
    use pretty_assertions::assert_eq;

    fn sample() -> Template {
        let send = CodeBlock::new("player_action")
            .with_action("SendMessage")
            .with_args(Args {
                items: vec![ItemSlot {
                    item: ItemValue::Text {
                        name: "Test".to_string(),
                    },
                    slot: 0,
                }],
            });
        Template::new(
            TemplateHeader::new("greeting", "tester"),
            vec![
                BlockRecord::Block(CodeBlock::new("event").with_action("Join")),
                BlockRecord::Block(send),
            ],
        )
    }

    #[test]
    fn test_document_json() {
        assert_eq!(
            sample().document_json().unwrap(),
            concat!(
                r#"{"blocks":[{"id":"block","block":"event","args":{"items":[]},"action":"Join"},"#,
                r#"{"id":"block","block":"player_action","args":{"items":[{"item":{"id":"txt","data":{"name":"Test"}},"slot":0}]},"action":"SendMessage"}]}"#
            )
        );
    }

    #[test]
    fn test_round_trip() {
        let template = sample();
        let config = CompilerConfig::default();
        let encoded = template.encode(&config).unwrap();
        let decoded = decode(&encoded.code).unwrap();
        assert_eq!(&decoded, template.document());
        // Re-encoding the decoded document gives the same code
        assert_eq!(encode_document(&decoded, &config).unwrap(), encoded.code);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let config = CompilerConfig::default();
        let a = sample().encode(&config).unwrap();
        let b = sample().encode(&config).unwrap();
        assert_eq!(a.code, b.code);
    }

    #[test]
    fn test_code_length_limit() {
        let config = CompilerConfig::default().with_max_code_length(10);
        assert!(matches!(
            sample().encode(&config),
            Err(CompileError::Encoding { .. })
        ));
    }

    #[test]
    fn test_envelope() {
        let encoded = sample().encode(&CompilerConfig::default()).unwrap();
        let envelope = encoded.envelope_json().unwrap();
        assert!(envelope.starts_with(r#"{"author":"tester","name":"greeting","version":1,"code":""#));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode("not base64!"),
            Err(CompileError::Decoding { .. })
        ));
        assert!(matches!(
            decode("aGVsbG8="),
            Err(CompileError::Decoding { .. })
        ));
    }
}
