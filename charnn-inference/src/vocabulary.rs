use std::{
    collections::{BTreeSet, HashMap},
    fs,
    path::Path,
};

use tracing::{info, instrument};

use crate::error::{InferenceError, Result};

/// Symbol identifier, a dense index into the [`Vocabulary`].
pub type SymbolId = u32;

/// The fixed, ordered character set the model reads and writes.
///
/// Ids are dense (`0..len`) and assigned in code point order, which is the
/// ordering the model was trained against. The table is built once and only
/// read afterwards, so it can be shared freely across requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocabulary {
    id_to_char: Vec<char>,
    char_to_id: HashMap<char, SymbolId>,
}

impl Vocabulary {
    /// Builds the vocabulary from the text of a reference corpus.
    ///
    /// Whitespace runs are collapsed to a single space before the unique
    /// characters are collected, so the only whitespace symbol that can ever
    /// appear is `' '`.
    pub fn build(corpus_text: &str) -> Result<Self> {
        let normalized = corpus_text.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return Err(InferenceError::Configuration(
                "reference corpus is empty".to_string(),
            ));
        }
        let id_to_char = normalized
            .chars()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let char_to_id = id_to_char
            .iter()
            .enumerate()
            .map(|(id, c)| (*c, id as SymbolId))
            .collect();
        Ok(Self {
            id_to_char,
            char_to_id,
        })
    }

    /// Reads the corpus at `path` and builds the vocabulary from it.
    #[instrument(level = "info", skip_all, fields(corpus_path = %path.as_ref().display()))]
    pub fn from_corpus_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let corpus_text = fs::read_to_string(path).map_err(|e| {
            InferenceError::Configuration(format!(
                "failed to read reference corpus {}: {e}",
                path.display()
            ))
        })?;
        let vocabulary = Self::build(&corpus_text)?;
        info!(
            target = "charnn-inference",
            event = "vocabulary_built",
            vocab_size = vocabulary.len(),
            "Built vocabulary from reference corpus"
        );
        Ok(vocabulary)
    }

    /// Maps every character of `text` to its id.
    ///
    /// The whole string is checked before anything is returned; the first
    /// character outside the vocabulary is reported with its position.
    pub fn encode(&self, text: &str) -> Result<Vec<SymbolId>> {
        text.chars()
            .enumerate()
            .map(|(position, symbol)| {
                self.id_of(symbol)
                    .ok_or(InferenceError::UnknownSymbol { symbol, position })
            })
            .collect()
    }

    /// Inverse lookup of [`Vocabulary::encode`].
    ///
    /// # Panics
    ///
    /// Panics if `id` is not below [`Vocabulary::len`]. Ids coming out of the
    /// sampler are always in range.
    pub fn decode(&self, id: SymbolId) -> char {
        self.id_to_char[id as usize]
    }

    /// Returns the id of `symbol`, if it belongs to the vocabulary.
    pub fn id_of(&self, symbol: char) -> Option<SymbolId> {
        self.char_to_id.get(&symbol).copied()
    }

    pub fn contains(&self, symbol: char) -> bool {
        self.char_to_id.contains_key(&symbol)
    }

    pub fn len(&self) -> usize {
        self.id_to_char.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_char.is_empty()
    }

    /// All symbols, in id order.
    pub fn symbols(&self) -> &[char] {
        &self.id_to_char
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_build_sorts_and_deduplicates() {
        let vocabulary = Vocabulary::build("cab bca").unwrap();
        assert_eq!(vocabulary.symbols(), &[' ', 'a', 'b', 'c']);
        assert_eq!(vocabulary.len(), 4);
        for (id, symbol) in vocabulary.symbols().iter().enumerate() {
            assert_eq!(vocabulary.id_of(*symbol), Some(id as SymbolId));
            assert_eq!(vocabulary.decode(id as SymbolId), *symbol);
        }
    }

    #[test]
    fn test_build_collapses_whitespace() {
        let vocabulary = Vocabulary::build("  the\tsea\n\n  wolf \r\n").unwrap();
        assert!(vocabulary.contains(' '));
        assert!(!vocabulary.contains('\t'));
        assert!(!vocabulary.contains('\n'));
        assert!(!vocabulary.contains('\r'));
        assert_eq!(
            vocabulary.symbols(),
            &[' ', 'a', 'e', 'f', 'h', 'l', 'o', 's', 't', 'w']
        );
    }

    #[test]
    fn test_single_word_corpus_has_no_space() {
        let vocabulary = Vocabulary::build("\n  buck\n").unwrap();
        assert_eq!(vocabulary.symbols(), &['b', 'c', 'k', 'u']);
    }

    #[test]
    fn test_build_orders_by_code_point() {
        let vocabulary = Vocabulary::build("é a Z z 9 !").unwrap();
        assert_eq!(vocabulary.symbols(), &[' ', '!', '9', 'Z', 'a', 'z', 'é']);
    }

    #[test]
    fn test_empty_corpus_is_configuration_error() {
        for corpus in ["", "   \n\t  "] {
            let result = Vocabulary::build(corpus);
            assert!(matches!(result, Err(InferenceError::Configuration(_))));
        }
    }

    #[test]
    fn test_encode_maps_every_character() {
        let vocabulary = Vocabulary::build("abc d").unwrap();
        assert_eq!(vocabulary.encode("dab c").unwrap(), vec![4, 1, 2, 0, 3]);
        assert_eq!(vocabulary.encode("").unwrap(), Vec::<SymbolId>::new());
    }

    #[test]
    fn test_encode_reports_unknown_symbol() {
        let vocabulary = Vocabulary::build("abc").unwrap();
        match vocabulary.encode("abc€a") {
            Err(InferenceError::UnknownSymbol { symbol, position }) => {
                assert_eq!(symbol, '€');
                assert_eq!(position, 3);
            }
            other => panic!("expected unknown symbol error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_corpus_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "It was the\n\nwolf").unwrap();
        let vocabulary = Vocabulary::from_corpus_file(file.path()).unwrap();
        assert_eq!(vocabulary, Vocabulary::build("It was the wolf").unwrap());
    }

    #[test]
    fn test_missing_corpus_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Vocabulary::from_corpus_file(dir.path().join("missing.txt"));
        assert!(matches!(result, Err(InferenceError::Configuration(_))));
    }
}
