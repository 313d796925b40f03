//! Label alphabet with a reserved blank token.

use serde::Serialize;

use crate::errors::{RecognitionError, Result};

/// Ordered label set the model was trained with.
///
/// Label `i` of the model output corresponds to `symbols[i]`. The symbol at
/// the blank index is never emitted into decoded text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelAlphabet {
    symbols: Vec<String>,
    blank_index: usize,
}

impl LabelAlphabet {
    /// Build an alphabet from symbols and the blank position.
    ///
    /// Needs at least one non-blank symbol and an in-range blank index.
    pub fn new(symbols: Vec<String>, blank_index: usize) -> Result<Self> {
        if symbols.len() < 2 {
            return Err(RecognitionError::Config(format!(
                "alphabet needs a blank and at least one symbol, got {} entries",
                symbols.len()
            )));
        }
        if blank_index >= symbols.len() {
            return Err(RecognitionError::Config(format!(
                "blank index {blank_index} out of range for alphabet of {}",
                symbols.len()
            )));
        }
        Ok(Self {
            symbols,
            blank_index,
        })
    }

    /// Parse `alphabet.txt` content: one symbol per line, line number = label index.
    ///
    /// Lines are not trimmed: a line holding a single space is the space symbol.
    pub fn from_text(content: &str, blank_index: usize) -> Result<Self> {
        let symbols = content.lines().map(String::from).collect();
        Self::new(symbols, blank_index)
    }

    /// Number of labels, blank included.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Always `false`: construction requires at least two labels.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Index of the blank label.
    pub fn blank_index(&self) -> usize {
        self.blank_index
    }

    /// Whether `index` is the blank label.
    pub fn is_blank(&self, index: usize) -> bool {
        index == self.blank_index
    }

    /// Symbol text for a label.
    pub fn symbol(&self, index: usize) -> Option<&str> {
        self.symbols.get(index).map(String::as_str)
    }

    /// All symbols in label order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Concatenate the symbols of already-collapsed labels, skipping blank
    /// and out-of-range indices.
    pub fn render(&self, labels: &[usize]) -> String {
        labels
            .iter()
            .filter(|&&l| !self.is_blank(l))
            .filter_map(|&l| self.symbol(l))
            .collect()
    }
}
