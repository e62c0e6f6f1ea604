//! Read-only typed access to raw tokenizer metadata.
//!
//! A model ships three JSON documents that matter for vocabulary resolution:
//!
//! - `config.json` (model configuration, optional): `vocab_size`,
//!   `extra_eos_tokens`
//! - `tokenizer_config.json` (optional): `vocab_size`, `eos_token`
//! - `tokenizer.json` (required): `model.vocab`, `added_tokens`, `decoder`
//!
//! `TokenizerMetadata` owns the parsed documents; `MetadataView` borrows
//! them and exposes accessors that never fail. Missing or mistyped fields
//! come back as `None` or an empty collection.

use serde_json::Value;

/// Key in the model configuration holding additional end-of-sequence strings.
pub const EXTRA_EOS_TOKENS_KEY: &str = "extra_eos_tokens";

/// Owned metadata blobs for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizerMetadata {
    pub model_config: Option<Value>,
    pub tokenizer_config: Option<Value>,
    pub tokenizer_data: Value,
}

impl TokenizerMetadata {
    /// Metadata from the three parsed documents; the two configs are optional.
    pub fn new(
        model_config: Option<Value>,
        tokenizer_config: Option<Value>,
        tokenizer_data: Value,
    ) -> Self {
        Self {
            model_config,
            tokenizer_config,
            tokenizer_data,
        }
    }

    /// Metadata with only `tokenizer.json` available.
    pub fn from_tokenizer_data(tokenizer_data: Value) -> Self {
        Self::new(None, None, tokenizer_data)
    }

    /// Append end-of-sequence strings to the model configuration's
    /// `extra_eos_tokens` list, creating the configuration if absent.
    pub fn with_extra_eos_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens = tokens.into_iter().map(|t| Value::String(t.into())).peekable();
        if tokens.peek().is_none() {
            return self;
        }

        let config = self
            .model_config
            .get_or_insert_with(|| Value::Object(Default::default()));
        if !config.is_object() {
            *config = Value::Object(Default::default());
        }
        if let Some(map) = config.as_object_mut() {
            let entry = map
                .entry(EXTRA_EOS_TOKENS_KEY)
                .or_insert_with(|| Value::Array(Vec::new()));
            if !entry.is_array() {
                *entry = Value::Array(Vec::new());
            }
            if let Some(list) = entry.as_array_mut() {
                list.extend(tokens);
            }
        }
        self
    }

    /// Borrow the documents for resolution.
    pub fn view(&self) -> MetadataView<'_> {
        MetadataView {
            model_config: self.model_config.as_ref(),
            tokenizer_config: self.tokenizer_config.as_ref(),
            tokenizer_data: &self.tokenizer_data,
        }
    }
}

/// A vocabulary entry added after tokenizer training (special tokens etc).
///
/// `content` is `None` when the record carries an id but no usable string;
/// such ids still count toward the vocabulary size but write nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddedToken<'a> {
    pub id: u32,
    pub content: Option<&'a str>,
}

/// One stage of a tokenizer's decode pipeline, identified by its `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderStage<'a> {
    kind: Option<&'a str>,
}

impl<'a> DecoderStage<'a> {
    /// Stage with the given `type` tag.
    pub fn new(kind: Option<&'a str>) -> Self {
        Self { kind }
    }

    fn from_value(value: &'a Value) -> Self {
        Self::new(value.get("type").and_then(Value::as_str))
    }

    /// The stage's `type` tag, if it has one.
    pub fn kind(&self) -> Option<&'a str> {
        self.kind
    }
}

/// Top-level decoder descriptor: a `Sequence` container or a single stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderNode<'a> {
    Sequence(Vec<DecoderStage<'a>>),
    Single(DecoderStage<'a>),
}

impl<'a> DecoderNode<'a> {
    /// Parse a `decoder` object. Children of a `Sequence` are taken as
    /// leaves; a nested `Sequence` child is just a stage tagged `Sequence`.
    pub fn from_value(value: &'a Value) -> Self {
        match value.get("type").and_then(Value::as_str) {
            Some("Sequence") => Self::Sequence(
                value
                    .get("decoders")
                    .and_then(Value::as_array)
                    .map(|children| children.iter().map(DecoderStage::from_value).collect())
                    .unwrap_or_default(),
            ),
            _ => Self::Single(DecoderStage::from_value(value)),
        }
    }

    /// Flatten into the ordered stage list.
    pub fn into_stages(self) -> Vec<DecoderStage<'a>> {
        match self {
            Self::Sequence(stages) => stages,
            Self::Single(stage) => vec![stage],
        }
    }
}

/// Borrowed view over the three metadata blobs.
#[derive(Debug, Clone, Copy)]
pub struct MetadataView<'a> {
    model_config: Option<&'a Value>,
    tokenizer_config: Option<&'a Value>,
    tokenizer_data: &'a Value,
}

impl<'a> MetadataView<'a> {
    /// View over borrowed documents.
    pub fn new(
        model_config: Option<&'a Value>,
        tokenizer_config: Option<&'a Value>,
        tokenizer_data: &'a Value,
    ) -> Self {
        Self {
            model_config,
            tokenizer_config,
            tokenizer_data,
        }
    }

    /// Base vocabulary `(token, id)` pairs from `model.vocab`.
    ///
    /// Pairs come back in file order. Only the object form is read;
    /// entries whose id is not a non-negative integer fitting in `u32` are
    /// skipped.
    pub fn vocab_entries(&self) -> Vec<(&'a str, u32)> {
        self.tokenizer_data
            .get("model")
            .and_then(|model| model.get("vocab"))
            .and_then(Value::as_object)
            .map(|vocab| {
                vocab
                    .iter()
                    .filter_map(|(token, id)| Some((token.as_str(), as_token_id(id)?)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `added_tokens` records in file order. Records without a valid id
    /// are skipped.
    pub fn added_tokens(&self) -> Vec<AddedToken<'a>> {
        self.tokenizer_data
            .get("added_tokens")
            .and_then(Value::as_array)
            .map(|records| {
                records
                    .iter()
                    .filter_map(|record| {
                        Some(AddedToken {
                            id: as_token_id(record.get("id")?)?,
                            content: record.get("content").and_then(Value::as_str),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The decoder descriptor, or `None` if `decoder` is absent or null.
    pub fn decoder(&self) -> Option<DecoderNode<'a>> {
        self.tokenizer_data
            .get("decoder")
            .filter(|decoder| !decoder.is_null())
            .map(DecoderNode::from_value)
    }

    /// Decoder stages with a top-level `Sequence` flattened one level.
    pub fn decoder_stages(&self) -> Vec<DecoderStage<'a>> {
        self.decoder()
            .map(DecoderNode::into_stages)
            .unwrap_or_default()
    }

    /// `vocab_size` from `tokenizer_config.json`, if present and non-negative.
    pub fn tokenizer_config_vocab_size(&self) -> Option<usize> {
        self.tokenizer_config.and_then(vocab_size_field)
    }

    /// `vocab_size` from `config.json`, if present and non-negative.
    pub fn model_config_vocab_size(&self) -> Option<usize> {
        self.model_config.and_then(vocab_size_field)
    }

    /// `eos_token` from the tokenizer configuration, in either the plain
    /// string form or the `{"content": ...}` object form.
    pub fn tokenizer_config_eos_token(&self) -> Option<&'a str> {
        match self.tokenizer_config?.get("eos_token")? {
            Value::String(token) => Some(token.as_str()),
            Value::Object(map) => map.get("content").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Additional end-of-sequence strings from the model configuration.
    pub fn model_config_extra_eos_tokens(&self) -> Vec<&'a str> {
        self.model_config
            .and_then(|config| config.get(EXTRA_EOS_TOKENS_KEY))
            .and_then(Value::as_array)
            .map(|tokens| tokens.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

fn as_token_id(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|id| u32::try_from(id).ok())
}

fn vocab_size_field(config: &Value) -> Option<usize> {
    config
        .get("vocab_size")
        .and_then(Value::as_u64)
        .and_then(|size| usize::try_from(size).ok())
}
