use std::fmt::Display;

use derive_more::Display;

pub const EPSILON: &str = "ε";

#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        let s = s.into();
        debug_assert!(!s.is_empty());
        Symbol(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An ordered sequence of symbols. The empty word is ε.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Word<S>(pub Vec<S>);

impl<S> Word<S> {
    pub fn new(symbols: impl IntoIterator<Item = S>) -> Self {
        Word(symbols.into_iter().collect())
    }

    pub fn empty() -> Self {
        Word(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.0.iter()
    }
}

impl<S> FromIterator<S> for Word<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Word(iter.into_iter().collect())
    }
}

impl<S: Display> Display for Word<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "{EPSILON}");
        }

        let names = self.0.iter().map(ToString::to_string).collect::<Vec<_>>();

        // Multi-character names would be ambiguous when glued together.
        let separator = if names.iter().all(|name| name.chars().count() == 1) {
            ""
        } else {
            " "
        };

        write!(f, "{}", names.join(separator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_word_displays_as_epsilon() {
        assert_eq!(Word::<Symbol>::empty().to_string(), EPSILON);
    }

    #[test]
    fn single_character_names_are_concatenated() {
        let word = Word::new(["a", "X"].map(Symbol::new));
        assert_eq!(word.to_string(), "aX");
    }

    #[test]
    fn long_names_are_space_separated() {
        let word = Word::new(["a", "T_b", "N_1"].map(Symbol::new));
        assert_eq!(word.to_string(), "a T_b N_1");
    }
}
