//! Byte-encoding scheme classification from the decoder pipeline.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::metadata::DecoderStage;

/// How a tokenizer's decoder maps pieces back to bytes.
///
/// The discriminants are the integer codes the grammar engine expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum VocabType {
    #[default]
    None = 0,
    /// SentencePiece-style `<0xNN>` byte tokens.
    ByteFallback = 1,
    /// GPT-2 style byte-to-unicode remapping.
    ByteLevel = 2,
}

impl VocabType {
    /// Integer code passed to the grammar engine.
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Lowercase name used in logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ByteFallback => "byte_fallback",
            Self::ByteLevel => "byte_level",
        }
    }

    /// Classify a single decoder stage tag.
    fn from_stage_kind(kind: &str) -> Option<Self> {
        match kind {
            "ByteFallback" => Some(Self::ByteFallback),
            "ByteLevel" => Some(Self::ByteLevel),
            _ => None,
        }
    }
}

impl fmt::Display for VocabType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for VocabType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

/// First recognised byte-handling stage wins; `None` if there is none.
pub fn classify_decoder(stages: &[DecoderStage<'_>]) -> VocabType {
    stages
        .iter()
        .find_map(|stage| stage.kind().and_then(VocabType::from_stage_kind))
        .unwrap_or_default()
}
