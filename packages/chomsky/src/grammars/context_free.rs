use std::{borrow::Cow, collections::BTreeSet, fmt::Display};

use indexmap::{IndexMap, IndexSet};

use crate::{
    error::ValidationError,
    grammars::types::{Grammar, NonTerminal, ProductionSymbol, Terminal},
    language::{Symbol, Word},
};

/// The plain collections a grammar is built from. An empty alternative is ε.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrammarDefinition {
    pub non_terminals: Vec<String>,
    pub terminals: Vec<String>,
    pub productions: Vec<(Vec<String>, Vec<Vec<String>>)>,
    pub start_symbols: Vec<String>,
}

impl GrammarDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn non_terminals<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.non_terminals.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn terminals<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.terminals.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn start_symbols<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.start_symbols.extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds the alternatives of `lhs`, each given as whitespace-separated
    /// symbol names. `""` is the empty body.
    pub fn rule(mut self, lhs: &str, alternatives: &[&str]) -> Self {
        let split = |s: &str| s.split_whitespace().map(str::to_owned).collect::<Vec<_>>();

        self.productions
            .push((split(lhs), alternatives.iter().map(|alt| split(alt)).collect()));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarType {
    RightLinear,
    LeftLinear,
    ContextFree,
    ContextSensitive,
    Unrestricted,
}

impl GrammarType {
    pub fn level(&self) -> u8 {
        match self {
            GrammarType::RightLinear | GrammarType::LeftLinear => 3,
            GrammarType::ContextFree => 2,
            GrammarType::ContextSensitive => 1,
            GrammarType::Unrestricted => 0,
        }
    }
}

impl Display for GrammarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let description = match self {
            GrammarType::RightLinear => "Right Linear Regular Grammar",
            GrammarType::LeftLinear => "Left Linear Regular Grammar",
            GrammarType::ContextFree => "Context-Free Grammar",
            GrammarType::ContextSensitive => "Context-Sensitive Grammar",
            GrammarType::Unrestricted => "Unrestricted Grammar",
        };

        write!(f, "Type {} - {}", self.level(), description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFreeGrammar {
    pub(super) non_terminals: IndexSet<NonTerminal>,
    pub(super) terminals: IndexSet<Terminal>,
    pub(super) start_symbols: IndexSet<NonTerminal>,
    pub(super) productions: IndexMap<Word<ProductionSymbol>, IndexSet<Word<ProductionSymbol>>>,
}

impl Grammar<Word<ProductionSymbol>, Word<ProductionSymbol>> for ContextFreeGrammar {
    fn start_symbols(&self) -> &IndexSet<NonTerminal> {
        &self.start_symbols
    }

    fn non_terminals(&self) -> Cow<'_, IndexSet<NonTerminal>> {
        Cow::Borrowed(&self.non_terminals)
    }

    fn terminals(&self) -> Cow<'_, IndexSet<Terminal>> {
        Cow::Borrowed(&self.terminals)
    }

    fn erasing_productions(&self) -> Cow<'_, IndexSet<Word<ProductionSymbol>>> {
        // Empty bodies live in the production table itself.
        Cow::Owned(IndexSet::new())
    }

    fn productions(&self) -> &IndexMap<Word<ProductionSymbol>, IndexSet<Word<ProductionSymbol>>> {
        &self.productions
    }
}

impl TryFrom<GrammarDefinition> for ContextFreeGrammar {
    type Error = ValidationError;

    fn try_from(definition: GrammarDefinition) -> Result<Self, Self::Error> {
        let mut non_terminals = IndexSet::new();
        for name in &definition.non_terminals {
            if name.is_empty() {
                return Err(ValidationError::EmptySymbolName);
            }
            non_terminals.insert(NonTerminal::new(name.as_str()));
        }

        let mut terminals = IndexSet::new();
        for name in &definition.terminals {
            if name.is_empty() {
                return Err(ValidationError::EmptySymbolName);
            }
            if definition.non_terminals.contains(name) {
                return Err(ValidationError::AmbiguousSymbol(name.clone()));
            }
            terminals.insert(Terminal::new(name.as_str()));
        }

        if definition.start_symbols.is_empty() {
            return Err(ValidationError::MissingStartSymbol);
        }

        let mut start_symbols = IndexSet::new();
        for name in &definition.start_symbols {
            let start_symbol = NonTerminal::new(name.as_str());
            if !non_terminals.contains(&start_symbol) {
                return Err(ValidationError::UndeclaredStartSymbol(name.clone()));
            }
            start_symbols.insert(start_symbol);
        }

        let mut grammar = ContextFreeGrammar {
            non_terminals,
            terminals,
            start_symbols,
            productions: IndexMap::new(),
        };

        for (lhs, alternatives) in &definition.productions {
            if lhs.is_empty() {
                return Err(ValidationError::EmptyLeftHandSide);
            }

            let undeclared = |rhs: &[String], symbol: &str| ValidationError::UndeclaredSymbol {
                lhs: lhs.join(" "),
                rhs: rhs.join(" "),
                symbol: symbol.to_owned(),
            };

            let lhs_word = lhs
                .iter()
                .map(|name| grammar.resolve(name).ok_or_else(|| undeclared(&[], name)))
                .collect::<Result<Word<_>, _>>()?;

            let mut bodies = IndexSet::new();
            for rhs in alternatives {
                let body = rhs
                    .iter()
                    .map(|name| grammar.resolve(name).ok_or_else(|| undeclared(rhs, name)))
                    .collect::<Result<Word<_>, _>>()?;
                bodies.insert(body);
            }

            grammar
                .productions
                .entry(lhs_word)
                .or_insert_with(IndexSet::new)
                .extend(bodies);
        }

        Ok(grammar)
    }
}

impl ContextFreeGrammar {
    fn resolve(&self, name: &str) -> Option<ProductionSymbol> {
        if name.is_empty() {
            return None;
        }

        let symbol = Symbol::new(name);

        let non_terminal = NonTerminal(symbol);
        if self.non_terminals.contains(&non_terminal) {
            return Some(ProductionSymbol::NonTerminal(non_terminal));
        }

        let terminal = Terminal(non_terminal.0);
        if self.terminals.contains(&terminal) {
            return Some(ProductionSymbol::Terminal(terminal));
        }

        None
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn productions_of(&self, lhs: &NonTerminal) -> Option<&IndexSet<Word<ProductionSymbol>>> {
        self.productions.get(&Word(vec![ProductionSymbol::NonTerminal(lhs.clone())]))
    }

    pub fn set_productions(&mut self, lhs: &NonTerminal, bodies: IndexSet<Word<ProductionSymbol>>) {
        self.productions
            .insert(Word(vec![ProductionSymbol::NonTerminal(lhs.clone())]), bodies);
    }

    pub fn remove_productions(
        &mut self,
        lhs: &NonTerminal,
    ) -> Option<IndexSet<Word<ProductionSymbol>>> {
        self.productions
            .shift_remove(&Word(vec![ProductionSymbol::NonTerminal(lhs.clone())]))
    }

    pub fn add_non_terminal(&mut self, nt: NonTerminal) -> bool {
        self.non_terminals.insert(nt)
    }

    /// Removes `nt` from the grammar: its declaration, its production entry,
    /// its start-symbol membership and every body that mentions it.
    pub fn remove_non_terminal(&mut self, nt: &NonTerminal) {
        self.non_terminals.shift_remove(nt);
        self.start_symbols.shift_remove(nt);
        self.remove_productions(nt);

        for rhs in self.productions.values_mut() {
            rhs.retain(|word| word.non_terminals().all(|symbol| symbol != nt));
        }
    }

    /// Declares a new non-terminal named after `base`, priming the name until
    /// it clashes with no existing symbol.
    pub fn fresh_non_terminal(&mut self, base: &str) -> NonTerminal {
        let mut name = base.to_owned();
        while self.is_declared(&name) {
            name.push('\'');
        }

        let nt = NonTerminal::new(name);
        self.add_non_terminal(nt.clone());
        nt
    }

    pub fn classify(&self) -> GrammarType {
        let mut is_type_3 = true;
        let mut is_type_2 = true;
        let mut is_type_1 = true;

        let mut is_left_linear = true;
        let mut is_right_linear = true;

        for (lhs, rhs) in &self.productions {
            if lhs.as_non_terminal().is_none() {
                is_type_3 = false;
                is_type_2 = false;
            }

            for word in rhs {
                if word.len() < lhs.len() {
                    is_type_1 = false;
                }

                match word.0.as_slice() {
                    [ProductionSymbol::Terminal(_)] => {}
                    [ProductionSymbol::Terminal(_), ProductionSymbol::NonTerminal(_)] => {
                        is_left_linear = false;
                    }
                    [ProductionSymbol::NonTerminal(_), ProductionSymbol::Terminal(_)] => {
                        is_right_linear = false;
                    }
                    _ => is_type_3 = false,
                }
            }
        }

        if is_type_3 && is_left_linear {
            GrammarType::LeftLinear
        } else if is_type_3 && is_right_linear {
            GrammarType::RightLinear
        } else if is_type_2 {
            GrammarType::ContextFree
        } else if is_type_1 {
            GrammarType::ContextSensitive
        } else {
            GrammarType::Unrestricted
        }
    }

    /// Every terminal string of length at most `max_len` derivable from a
    /// start symbol.
    pub fn words_up_to(&self, max_len: usize) -> BTreeSet<Word<Terminal>> {
        let mut languages: IndexMap<NonTerminal, BTreeSet<Vec<Terminal>>> = IndexMap::new();

        loop {
            let mut changed = false;

            for (lhs, rhs) in &self.productions {
                let Some(lhs) = lhs.as_non_terminal() else {
                    continue;
                };

                for word in rhs {
                    let mut derived = BTreeSet::from([Vec::new()]);

                    for symbol in word.iter() {
                        let mut next = BTreeSet::new();

                        match symbol {
                            ProductionSymbol::Terminal(t) => {
                                for prefix in derived.iter().filter(|p| p.len() < max_len) {
                                    let mut extended = prefix.clone();
                                    extended.push(t.clone());
                                    next.insert(extended);
                                }
                            }
                            ProductionSymbol::NonTerminal(nt) => {
                                if let Some(language) = languages.get(nt) {
                                    for prefix in &derived {
                                        for suffix in language {
                                            if prefix.len() + suffix.len() <= max_len {
                                                next.insert(
                                                    prefix.iter().chain(suffix).cloned().collect(),
                                                );
                                            }
                                        }
                                    }
                                }
                            }
                        }

                        derived = next;
                        if derived.is_empty() {
                            break;
                        }
                    }

                    let language = languages.entry(lhs.clone()).or_default();
                    for terminals in derived {
                        changed |= language.insert(terminals);
                    }
                }
            }

            if !changed {
                break;
            }
        }

        self.start_symbols
            .iter()
            .filter_map(|start_symbol| languages.get(start_symbol))
            .flatten()
            .map(|terminals| Word(terminals.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GrammarDefinition {
        GrammarDefinition::new()
            .non_terminals(["S", "A"])
            .terminals(["a", "b"])
            .start_symbols(["S"])
            .rule("S", &["a A", ""])
            .rule("A", &["b", "b"])
    }

    #[test]
    fn builds_from_definition() {
        let grammar = ContextFreeGrammar::try_from(sample()).unwrap();

        let s = NonTerminal::new("S");
        let a = NonTerminal::new("A");
        assert_eq!(grammar.productions_of(&s).unwrap().len(), 2);
        // Duplicate alternatives collapse.
        assert_eq!(grammar.productions_of(&a).unwrap().len(), 1);
        assert!(grammar.productions_of(&s).unwrap().contains(&Word::empty()));
    }

    #[test]
    fn rejects_undeclared_symbols() {
        let definition = sample().rule("A", &["a c"]);

        assert_eq!(
            ContextFreeGrammar::try_from(definition),
            Err(ValidationError::UndeclaredSymbol {
                lhs: "A".to_owned(),
                rhs: "a c".to_owned(),
                symbol: "c".to_owned(),
            })
        );
    }

    #[test]
    fn rejects_bad_start_symbols() {
        let mut definition = sample();
        definition.start_symbols = vec!["a".to_owned()];
        assert_eq!(
            ContextFreeGrammar::try_from(definition.clone()),
            Err(ValidationError::UndeclaredStartSymbol("a".to_owned()))
        );

        definition.start_symbols.clear();
        assert_eq!(
            ContextFreeGrammar::try_from(definition),
            Err(ValidationError::MissingStartSymbol)
        );
    }

    #[test]
    fn rejects_symbols_declared_twice() {
        let definition = sample().terminals(["A"]);
        assert_eq!(
            ContextFreeGrammar::try_from(definition),
            Err(ValidationError::AmbiguousSymbol("A".to_owned()))
        );
    }

    #[test]
    fn rejects_empty_names() {
        let definition = sample().non_terminals([""]);
        assert_eq!(
            ContextFreeGrammar::try_from(definition),
            Err(ValidationError::EmptySymbolName)
        );

        let definition = sample().terminals([""]);
        assert_eq!(
            ContextFreeGrammar::try_from(definition),
            Err(ValidationError::EmptySymbolName)
        );

        let definition = sample().rule("", &["a"]);
        assert_eq!(
            ContextFreeGrammar::try_from(definition),
            Err(ValidationError::EmptyLeftHandSide)
        );
    }

    #[test]
    fn tolerates_multi_symbol_keys() {
        let definition = GrammarDefinition::new()
            .non_terminals(["S", "A"])
            .terminals(["a", "b"])
            .start_symbols(["S"])
            .rule("S", &["a A"])
            .rule("a A", &["a b"]);
        let grammar = ContextFreeGrammar::try_from(definition).unwrap();

        assert_eq!(grammar.productions().len(), 2);
        assert_eq!(grammar.classify(), GrammarType::ContextSensitive);
    }

    #[test]
    fn removing_a_non_terminal_drops_every_trace_of_it() {
        let mut grammar = ContextFreeGrammar::try_from(sample()).unwrap();
        let a = NonTerminal::new("A");

        grammar.remove_non_terminal(&a);

        assert!(!grammar.non_terminals.contains(&a));
        assert!(grammar.productions_of(&a).is_none());
        let s_bodies = grammar.productions_of(&NonTerminal::new("S")).unwrap();
        assert_eq!(s_bodies.len(), 1);
        assert!(s_bodies.contains(&Word::empty()));
    }

    #[test]
    fn fresh_non_terminals_avoid_clashes() {
        let mut grammar = ContextFreeGrammar::try_from(sample()).unwrap();

        assert_eq!(grammar.fresh_non_terminal("A").to_string(), "A'");
        assert_eq!(grammar.fresh_non_terminal("A").to_string(), "A''");
        assert_eq!(grammar.fresh_non_terminal("B").to_string(), "B");

        assert!(grammar.non_terminals.contains(&NonTerminal::new("A''")));
        assert!(grammar.non_terminals.contains(&NonTerminal::new("B")));
        assert!(!grammar.add_non_terminal(NonTerminal::new("B")));
        assert!(grammar.add_non_terminal(NonTerminal::new("C")));
    }

    #[test]
    fn classifies_the_chomsky_hierarchy() {
        let regular = GrammarDefinition::new()
            .non_terminals(["S", "A"])
            .terminals(["a", "b"])
            .start_symbols(["S"])
            .rule("S", &["a A", "b"])
            .rule("A", &["b S", "a"]);
        assert_eq!(
            ContextFreeGrammar::try_from(regular).unwrap().classify(),
            GrammarType::RightLinear
        );

        let left = GrammarDefinition::new()
            .non_terminals(["S"])
            .terminals(["a"])
            .start_symbols(["S"])
            .rule("S", &["S a", "a"]);
        assert_eq!(
            ContextFreeGrammar::try_from(left).unwrap().classify(),
            GrammarType::LeftLinear
        );

        assert_eq!(
            ContextFreeGrammar::try_from(sample()).unwrap().classify(),
            GrammarType::ContextFree
        );

        let contracting = sample().rule("A S", &["a"]);
        assert_eq!(
            ContextFreeGrammar::try_from(contracting).unwrap().classify(),
            GrammarType::Unrestricted
        );
    }

    #[test]
    fn enumerates_bounded_words() {
        let definition = GrammarDefinition::new()
            .non_terminals(["S"])
            .terminals(["a", "b"])
            .start_symbols(["S"])
            .rule("S", &["a S b", ""]);
        let grammar = ContextFreeGrammar::try_from(definition).unwrap();

        let words = grammar
            .words_up_to(4)
            .into_iter()
            .map(|word| word.to_string())
            .collect::<Vec<_>>();

        assert_eq!(words, vec!["ε", "aabb", "ab"]);
    }

    #[test]
    fn enumeration_survives_nullable_cycles() {
        let definition = GrammarDefinition::new()
            .non_terminals(["S"])
            .terminals(["a"])
            .start_symbols(["S"])
            .rule("S", &["S S", "a", ""]);
        let grammar = ContextFreeGrammar::try_from(definition).unwrap();

        assert_eq!(grammar.words_up_to(3).len(), 4);
    }
}
