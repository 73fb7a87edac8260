use std::{borrow::Cow, fmt::Display, hash::Hash};

use derive_more::Display;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;

use crate::language::{Symbol, Word, EPSILON};

#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Terminal(pub Symbol);

#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonTerminal(pub Symbol);

impl Terminal {
    pub fn new(name: impl Into<String>) -> Self {
        Terminal(Symbol::new(name))
    }
}

impl NonTerminal {
    pub fn new(name: impl Into<String>) -> Self {
        NonTerminal(Symbol::new(name))
    }
}

#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProductionSymbol {
    Terminal(Terminal),
    NonTerminal(NonTerminal),
}

impl ProductionSymbol {
    pub fn as_non_terminal(&self) -> Option<&NonTerminal> {
        match self {
            ProductionSymbol::NonTerminal(nt) => Some(nt),
            ProductionSymbol::Terminal(_) => None,
        }
    }

    pub fn as_terminal(&self) -> Option<&Terminal> {
        match self {
            ProductionSymbol::Terminal(t) => Some(t),
            ProductionSymbol::NonTerminal(_) => None,
        }
    }
}

impl Word<ProductionSymbol> {
    /// The non-terminal this word consists of, if it is exactly one.
    pub fn as_non_terminal(&self) -> Option<&NonTerminal> {
        match self.0.as_slice() {
            [symbol] => symbol.as_non_terminal(),
            _ => None,
        }
    }

    pub fn is_unit(&self) -> bool {
        self.as_non_terminal().is_some()
    }

    pub fn non_terminals(&self) -> impl Iterator<Item = &NonTerminal> {
        self.0.iter().filter_map(ProductionSymbol::as_non_terminal)
    }

    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> {
        self.0.iter().filter_map(ProductionSymbol::as_terminal)
    }
}

pub trait ProductionWord: Display + Clone + Eq + Hash {
    fn to_word(&self) -> Word<ProductionSymbol>;
}

impl ProductionWord for NonTerminal {
    fn to_word(&self) -> Word<ProductionSymbol> {
        Word(vec![ProductionSymbol::NonTerminal(self.clone())])
    }
}

impl ProductionWord for Word<ProductionSymbol> {
    fn to_word(&self) -> Word<ProductionSymbol> {
        Word(self.0.clone())
    }
}

pub trait Grammar<L: ProductionWord, R: ProductionWord> {
    fn start_symbols(&self) -> &IndexSet<NonTerminal>;
    fn non_terminals(&self) -> Cow<'_, IndexSet<NonTerminal>>;
    fn terminals(&self) -> Cow<'_, IndexSet<Terminal>>;
    fn erasing_productions(&self) -> Cow<'_, IndexSet<L>>;
    fn productions(&self) -> &IndexMap<L, IndexSet<R>>;

    fn production_count(&self) -> usize {
        self.productions().values().map(IndexSet::len).sum::<usize>()
            + self.erasing_productions().len()
    }

    fn definition(&self) -> String {
        let start_symbols = self.start_symbols();
        let erasing_productions = self.erasing_productions();
        let productions = self.productions();

        let mut string_productions =
            IndexMap::with_capacity(productions.len() + erasing_productions.len());

        for (lhs, rhs) in productions {
            string_productions
                .entry(lhs.to_string())
                .or_insert_with(Vec::new)
                .extend(rhs.iter().map(|word| word.to_string()));
        }

        for lhs in erasing_productions.as_ref() {
            string_productions
                .entry(lhs.to_string())
                .or_insert_with(Vec::new)
                .push(EPSILON.to_owned());
        }

        let mut non_terminals = start_symbols.clone();
        non_terminals.extend(self.non_terminals().iter().cloned());

        let mut definition = format!(
            "G = ({{{}}}, {{{}}}, P, {{{}}})\n\n",
            non_terminals.iter().join(", "),
            self.terminals().iter().join(", "),
            start_symbols.iter().join(", "),
        );

        definition += "P = {\n";

        for (lhs, rhs) in string_productions {
            definition += &format!("  {} → {}\n", lhs, rhs.join(" | "));
        }

        definition += "}\n";

        definition
    }
}
