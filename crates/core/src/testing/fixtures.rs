//! Metadata shaped after common tokenizer families.

use serde_json::json;

use crate::metadata::TokenizerMetadata;

/// SentencePiece-style tokenizer: `▁` word prefix, `<0xNN>` byte tokens
/// and a `Sequence` decoder containing `ByteFallback`.
///
/// Resolves to 8 slots (model config `vocab_size`), `ByteFallback`,
/// stop tokens `{2}`.
pub fn byte_fallback_metadata() -> TokenizerMetadata {
    TokenizerMetadata::new(
        Some(json!({ "model_type": "llama", "vocab_size": 8 })),
        Some(json!({
            "bos_token": "<s>",
            "eos_token": "</s>",
            "unk_token": "<unk>"
        })),
        json!({
            "version": "1.0",
            "added_tokens": [
                { "id": 0, "content": "<unk>", "special": true },
                { "id": 1, "content": "<s>", "special": true },
                { "id": 2, "content": "</s>", "special": true }
            ],
            "decoder": {
                "type": "Sequence",
                "decoders": [
                    { "type": "Replace", "pattern": { "String": "▁" }, "content": " " },
                    { "type": "ByteFallback" },
                    { "type": "Fuse" },
                    { "type": "Strip", "content": " ", "start": 1, "stop": 0 }
                ]
            },
            "model": {
                "type": "BPE",
                "byte_fallback": true,
                "vocab": {
                    "<unk>": 0, "<s>": 1, "</s>": 2,
                    "<0x0A>": 3, "▁a": 4, "b": 5
                },
                "merges": []
            }
        }),
    )
}

/// GPT-2 style byte-level BPE with ChatML special tokens added above the
/// base vocabulary and a stale configured size.
///
/// Resolves to 7 slots (calculated, config says 5), `ByteLevel`,
/// stop tokens `{5, 6}`.
pub fn byte_level_metadata() -> TokenizerMetadata {
    TokenizerMetadata::new(
        Some(json!({
            "model_type": "qwen2",
            "vocab_size": 5,
            "extra_eos_tokens": ["<|endoftext|>"]
        })),
        Some(json!({
            "eos_token": { "content": "<|im_end|>", "lstrip": false, "rstrip": false },
            "pad_token": "<|endoftext|>"
        })),
        json!({
            "added_tokens": [
                { "id": 5, "content": "<|endoftext|>", "special": true },
                { "id": 6, "content": "<|im_end|>", "special": true }
            ],
            "decoder": { "type": "ByteLevel", "add_prefix_space": false, "trim_offsets": false },
            "model": {
                "type": "BPE",
                "vocab": { "!": 0, "\"": 1, "Ġhello": 2, "Ġworld": 3, "Ċ": 4 },
                "merges": []
            }
        }),
    )
}
