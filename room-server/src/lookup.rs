use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use room_types::LookupKind;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Lookup request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("No {kind:?} found for {word}")]
    NoResult { word: String, kind: LookupKind },
    #[error("Lookups are disabled")]
    Disabled,
}

/// External word knowledge: hints for power-ups and dictionary checks for
/// submitted words. Callers treat every error as "unavailable" and fall back.
#[async_trait]
pub trait WordLookup: Send + Sync {
    async fn hint(&self, word: &str, kind: LookupKind) -> Result<String, LookupError>;

    async fn is_word(&self, word: &str) -> Result<bool, LookupError>;
}

pub struct NoopLookup;

#[async_trait]
impl WordLookup for NoopLookup {
    async fn hint(&self, _word: &str, _kind: LookupKind) -> Result<String, LookupError> {
        Err(LookupError::Disabled)
    }

    async fn is_word(&self, _word: &str) -> Result<bool, LookupError> {
        Err(LookupError::Disabled)
    }
}

#[derive(Debug, Deserialize)]
struct DatamuseWord {
    word: String,
}

#[derive(Debug, Deserialize)]
struct DictionaryEntry {
    #[serde(default)]
    meanings: Vec<Meaning>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Meaning {
    #[serde(default)]
    part_of_speech: Option<String>,
    #[serde(default)]
    definitions: Vec<Definition>,
}

#[derive(Debug, Deserialize)]
struct Definition {
    definition: String,
}

/// Datamuse for related words and rhymes, dictionaryapi.dev for definitions.
pub struct HttpWordLookup {
    client: Client,
    datamuse_url: String,
    dictionary_url: String,
}

impl HttpWordLookup {
    pub fn new(
        datamuse_url: &str,
        dictionary_url: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            datamuse_url: datamuse_url.trim_end_matches('/').to_string(),
            dictionary_url: dictionary_url.trim_end_matches('/').to_string(),
        })
    }

    async fn datamuse(&self, relation: &str, word: &str) -> Result<Vec<DatamuseWord>, LookupError> {
        let words = self
            .client
            .get(format!("{}/words", self.datamuse_url))
            .query(&[(relation, word), ("max", "20")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(words)
    }

    async fn definition(&self, word: &str) -> Result<Option<String>, LookupError> {
        let response = self
            .client
            .get(format!("{}/{}", self.dictionary_url, word))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let entries: Vec<DictionaryEntry> = response.error_for_status()?.json().await?;

        let text = entries
            .iter()
            .flat_map(|entry| &entry.meanings)
            .find_map(|meaning| {
                meaning.definitions.first().map(|d| match &meaning.part_of_speech {
                    Some(pos) => format!("({pos}) {}", d.definition),
                    None => d.definition.clone(),
                })
            });
        Ok(text.map(|text| mask_word(&text, word)))
    }
}

/// Hide the answer if the definition happens to quote it.
fn mask_word(text: &str, word: &str) -> String {
    let lower = text.to_lowercase();
    if lower.len() != text.len() {
        return text.replace(word, &"_".repeat(word.len()));
    }
    let mut masked = String::with_capacity(text.len());
    let mut rest = 0;
    for (start, _) in lower.match_indices(word) {
        if start < rest {
            continue;
        }
        masked.push_str(&text[rest..start]);
        masked.push_str(&"_".repeat(word.len()));
        rest = start + word.len();
    }
    masked.push_str(&text[rest..]);
    masked
}

/// First candidate that does not give the answer away.
fn pick_candidate(candidates: Vec<DatamuseWord>, word: &str) -> Option<String> {
    candidates
        .into_iter()
        .map(|c| c.word.to_lowercase())
        .find(|c| !c.contains(word) && !word.contains(c.as_str()))
}

#[async_trait]
impl WordLookup for HttpWordLookup {
    async fn hint(&self, word: &str, kind: LookupKind) -> Result<String, LookupError> {
        let found = match kind {
            LookupKind::Definition => self.definition(word).await?,
            LookupKind::Related => pick_candidate(self.datamuse("ml", word).await?, word),
            LookupKind::Rhyme => pick_candidate(self.datamuse("rel_rhy", word).await?, word),
        };
        debug!(word, ?kind, found = found.is_some(), "Word lookup finished");
        found.ok_or_else(|| LookupError::NoResult {
            word: word.to_string(),
            kind,
        })
    }

    async fn is_word(&self, word: &str) -> Result<bool, LookupError> {
        Ok(self.definition(word).await?.is_some())
    }
}
