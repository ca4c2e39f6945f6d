use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Result, anyhow};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::info;

/// File stem holding the untheme'd list when loading a directory.
pub const DEFAULT_LIST: &str = "default";

const BUILTIN_WORDS: &str = "anchor\napple\nbanjo\nbeacon\nblossom\ncactus\ncandle\ncanyon\n\
castle\ncircus\ncobalt\ncomet\ncopper\ncrayon\ndragon\nember\nfalcon\nfossil\ngarden\nglacier\n\
goblet\nharbor\nhelmet\nisland\njigsaw\nkettle\nlantern\nlemon\nmagnet\nmeadow\nmirror\nnectar\n\
orbit\noyster\npebble\npepper\nplanet\npuzzle\nquartz\nrocket\nsaddle\nsilver\nspiral\ntimber\n\
tunnel\nvelvet\nwalnut\nwizard\nzephyr";

const BUILTIN_ANIMALS: &str = "badger\nbeaver\ncamel\ncheetah\nferret\ngecko\ngiraffe\nhedgehog\n\
jaguar\nkoala\nlobster\nmongoose\nnarwhal\notter\npanther\npelican\npenguin\nrabbit\nraccoon\n\
salmon\nturtle\nwalrus\nweasel\nzebra";

/// Source of challenge words for ghost re-entry, optionally grouped by theme.
#[derive(Debug, Clone, Default)]
pub struct WordBank {
    words: Vec<String>,
    themes: HashMap<String, Vec<String>>,
}

fn parse_list(word_list: &str) -> Vec<String> {
    let mut words: Vec<String> = word_list
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
        .filter(|word| word.len() >= 3 && word.chars().all(|c| c.is_ascii_lowercase()))
        .collect();
    words.sort();
    words.dedup();
    words
}

impl WordBank {
    /// Build an untheme'd bank from newline-separated words. Comments (`#`),
    /// blank lines and anything that isn't plain a-z are skipped.
    pub fn from_word_list(word_list: &str) -> Self {
        Self {
            words: parse_list(word_list),
            themes: HashMap::new(),
        }
    }

    pub fn with_theme(mut self, theme: &str, word_list: &str) -> Self {
        self.themes
            .insert(theme.trim().to_lowercase(), parse_list(word_list));
        self
    }

    /// Small bank compiled into the binary.
    pub fn builtin() -> Self {
        Self::from_word_list(BUILTIN_WORDS).with_theme("animals", BUILTIN_ANIMALS)
    }

    /// Load every `*.txt` file in a directory. `default.txt` becomes the
    /// untheme'd list; every other file is a theme named after its stem.
    pub fn load_directory<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut bank = Self::default();

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let contents = fs::read_to_string(&path)?;
            if stem == DEFAULT_LIST {
                bank.words = parse_list(&contents);
            } else {
                bank = bank.with_theme(stem, &contents);
            }
        }

        if bank.words.is_empty() {
            bank.words = bank.themes.values().flatten().cloned().collect();
            bank.words.sort();
            bank.words.dedup();
        }
        if bank.words.is_empty() {
            return Err(anyhow!("No words found in {}", dir.display()));
        }

        info!(
            words = bank.words.len(),
            themes = bank.themes.len(),
            "Loaded word bank from {}",
            dir.display()
        );
        Ok(bank)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn has_theme(&self, theme: &str) -> bool {
        self.themes.contains_key(&theme.to_lowercase())
    }

    pub fn contains(&self, word: &str) -> bool {
        let word = word.trim().to_lowercase();
        self.words.contains(&word) || self.themes.values().any(|list| list.contains(&word))
    }

    /// Random word from the theme when it exists (falling back to the general
    /// list), never equal to `exclude`.
    pub fn random_word(
        &self,
        theme: Option<&str>,
        exclude: Option<&str>,
        rng: &mut impl Rng,
    ) -> Result<String> {
        let themed = theme
            .and_then(|t| self.themes.get(&t.to_lowercase()))
            .filter(|list| list.iter().any(|w| Some(w.as_str()) != exclude));
        let source = themed.unwrap_or(&self.words);

        let candidates: Vec<&String> = source
            .iter()
            .filter(|w| Some(w.as_str()) != exclude)
            .collect();
        candidates
            .choose(rng)
            .map(|w| w.to_string())
            .ok_or_else(|| anyhow!("No challenge words available"))
    }
}
