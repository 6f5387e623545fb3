//! AI translation service abstraction
//!
//! A `WordTranslator` turns a batch of unique surface forms into a flat
//! word → translation map. Implementations exist for OpenAI chat
//! completions, a local Ollama server and a deterministic mock.
//!
//! # Example
//!
//! ```ignore
//! use interlinear::pipeline::{Script, WordTranslator, OllamaProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = OllamaProvider::from_env()?;
//!     let words = vec!["λόγος".to_string(), "ἀρχῇ".to_string()];
//!     let map = provider.translate_words(&words, Script::Greek).await?;
//!     println!("{:?}", map);
//!     Ok(())
//! }
//! ```

use super::data::Script;
use super::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use std::collections::HashMap;

/// Generic trait for word-level translation backends
#[async_trait]
pub trait WordTranslator: Send + Sync {
    /// Translate unique words of one script
    ///
    /// The returned map may omit words the service could not translate.
    /// Transport failures are `TransientService`; an answer that is not a
    /// flat JSON object is `MalformedResponse`.
    async fn translate_words(
        &self,
        words: &[String],
        script: Script,
    ) -> PipelineResult<HashMap<String, String>>;

    /// Identifies the provider (and model) in logs and learned glossary entries
    fn provider_name(&self) -> &str;
}

/// Instructions for a literal-rigid word translation
pub fn build_prompt(words: &[String], script: Script) -> String {
    let language = script.language_name();
    let list = serde_json::to_string_pretty(words).unwrap_or_else(|_| format!("{:?}", words));
    format!(
        "Você é um tradutor especialista em {language} para português brasileiro.

REGRAS ESTRITAS:
1. Tradução LITERAL e RÍGIDA - mantenha a estrutura gramatical original
2. Use hífens para palavras compostas (ex: \"em-o\" não \"no\", \"de-a\" não \"da\")
3. Mantenha artigos separados (o, a, os, as)
4. NÃO traduza nomes próprios de Deus (Θεός, יהוה, אֱלֹהִים) - mantenha no original
5. Mantenha a ordem das palavras do original quando possível
6. Responda APENAS com JSON válido, sem markdown, sem explicações

Traduza cada palavra para português literal:

{list}

Responda SOMENTE com JSON no formato:
{{
  \"palavra_original\": \"tradução_literal\"
}}"
    )
}

/// Parse a service answer into a flat word → translation map
///
/// Finds the outermost `{...}` block (models like to wrap JSON in prose or
/// code fences) and keeps only string values.
pub fn extract_word_map(text: &str) -> PipelineResult<HashMap<String, String>> {
    let candidate = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    };

    let value: serde_json::Value = serde_json::from_str(candidate).map_err(|e| {
        PipelineError::MalformedResponse(format!("{} in response: {}", e, preview(text)))
    })?;

    let object = value.as_object().ok_or_else(|| {
        PipelineError::MalformedResponse(format!("Expected a JSON object, got: {}", preview(text)))
    })?;

    Ok(object
        .iter()
        .filter_map(|(word, translation)| {
            translation
                .as_str()
                .map(|t| (word.clone(), t.to_string()))
        })
        .collect())
}

/// Clean a translation returned by the service
///
/// Trims whitespace and uses the typographic apostrophe. Empty answers are
/// dropped.
pub fn sanitize_translation(text: &str) -> Option<String> {
    let cleaned = text.trim().replace('\'', "\u{2019}");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn preview(text: &str) -> String {
    text.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_object() {
        let map = extract_word_map(r#"{"λόγος": "palavra", "ἀρχῇ": "princípio"}"#).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["λόγος"], "palavra");
    }

    #[test]
    fn test_extract_object_wrapped_in_prose_and_fences() {
        let text = "Aqui está:\n```json\n{\"ἐν\": \"em\"}\n```\nEspero ter ajudado.";
        let map = extract_word_map(text).unwrap();
        assert_eq!(map["ἐν"], "em");
    }

    #[test]
    fn test_extract_skips_non_string_values() {
        let map = extract_word_map(r#"{"ἐν": "em", "ὁ": 1, "καὶ": null}"#).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_extract_garbage_is_malformed() {
        assert!(matches!(
            extract_word_map("I cannot translate that."),
            Err(PipelineError::MalformedResponse(_))
        ));
        assert!(matches!(
            extract_word_map("{not json}"),
            Err(PipelineError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_extract_array_is_malformed() {
        assert!(extract_word_map(r#"["em", "o"]"#).is_err());
    }

    #[test]
    fn test_sanitize_translation() {
        assert_eq!(sanitize_translation("  palavra "), Some("palavra".to_string()));
        assert_eq!(sanitize_translation("d'água"), Some("d\u{2019}água".to_string()));
        assert_eq!(sanitize_translation("   "), None);
    }

    #[test]
    fn test_prompt_mentions_language_and_words() {
        let prompt = build_prompt(&["λόγος".to_string()], Script::Greek);
        assert!(prompt.contains("grego koiné"));
        assert!(prompt.contains("\"λόγος\""));
        assert!(prompt.contains("\"palavra_original\""));

        let prompt = build_prompt(&["שָׁנָה".to_string()], Script::Hebrew);
        assert!(prompt.contains("hebraico bíblico"));
    }
}
