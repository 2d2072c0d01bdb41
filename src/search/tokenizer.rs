//! N-gram analysis for infrastructure element identifiers
//!
//! Identifier text is split on whitespace, lower-cased and shingled into
//! fixed-width grams of [`NGRAM_SIZE`] characters. Words shorter than a gram
//! produce no tokens. Indexing identifiers this way lets a plain query such as
//! `rout` match `core-router-01` without a leading wildcard.

use tantivy::tokenizer::{TextAnalyzer, Token, TokenStream, Tokenizer};
use tantivy::Index;

/// Name the identifier analyzer is registered under
pub const IDENTIFIER_TOKENIZER: &str = "identifier";

/// Gram width (both minimum and maximum)
pub const NGRAM_SIZE: usize = 3;

/// Register the analyzers the event schema refers to
///
/// Tokenizers are not persisted with the index, so this must run after every open.
pub fn register_tokenizers(index: &Index) {
    index
        .tokenizers()
        .register(IDENTIFIER_TOKENIZER, identifier_analyzer());
}

/// Analyzer producing identifier n-grams
pub fn identifier_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(IdentifierTokenizer).build()
}

/// Whitespace + lower-case + 3-gram tokenizer
#[derive(Debug, Clone, Default)]
pub struct IdentifierTokenizer;

impl Tokenizer for IdentifierTokenizer {
    type TokenStream<'a> = IdentifierTokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> IdentifierTokenStream<'a> {
        IdentifierTokenStream {
            text,
            cursor: 0,
            word: Vec::new(),
            gram_start: 0,
            position: 0,
            token: Token::default(),
        }
    }
}

/// Lazily produced grams for one field value
pub struct IdentifierTokenStream<'a> {
    text: &'a str,
    // byte offset of the first unread character
    cursor: usize,
    // lower-cased characters of the current word with their source byte span
    word: Vec<(usize, usize, char)>,
    gram_start: usize,
    position: usize,
    token: Token,
}

impl IdentifierTokenStream<'_> {
    fn next_word(&mut self) -> bool {
        let rest = &self.text[self.cursor..];
        let Some(relative_start) = rest.find(|c: char| !c.is_whitespace()) else {
            self.cursor = self.text.len();
            self.word.clear();
            return false;
        };

        let start = self.cursor + relative_start;
        let end = self.text[start..]
            .find(char::is_whitespace)
            .map(|i| start + i)
            .unwrap_or(self.text.len());

        self.word.clear();
        for (offset, ch) in self.text[start..end].char_indices() {
            let from = start + offset;
            let to = from + ch.len_utf8();
            for lower in ch.to_lowercase() {
                self.word.push((from, to, lower));
            }
        }

        self.cursor = end;
        self.gram_start = 0;
        true
    }
}

impl TokenStream for IdentifierTokenStream<'_> {
    fn advance(&mut self) -> bool {
        loop {
            if self.gram_start + NGRAM_SIZE <= self.word.len() {
                let gram = &self.word[self.gram_start..self.gram_start + NGRAM_SIZE];

                self.token.text.clear();
                self.token.text.extend(gram.iter().map(|&(_, _, ch)| ch));
                self.token.offset_from = gram[0].0;
                self.token.offset_to = gram[NGRAM_SIZE - 1].1;
                self.token.position = self.position;
                self.token.position_length = 1;

                self.position += 1;
                self.gram_start += 1;
                return true;
            }

            // Leave a positional gap between words so phrases never span them
            if self.gram_start > 0 {
                self.position += 1;
            }

            if !self.next_word() {
                return false;
            }
        }
    }

    fn token(&self) -> &Token {
        &self.token
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.token
    }
}
