use std::{borrow::Cow, fmt::Display};

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use tabled::{builder::Builder, settings::Style};

use crate::{
    error::NormalFormError,
    grammars::{
        context_free::ContextFreeGrammar,
        normalization::{Normalization, Normalizer, NormalizerConfig},
        types::{Grammar, NonTerminal, ProductionSymbol, ProductionWord, Terminal},
    },
    language::Word,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CnfWord {
    Terminal(Terminal),
    NonTerminals(NonTerminal, NonTerminal),
}

impl Display for CnfWord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_word())
    }
}

impl TryFrom<&Word<ProductionSymbol>> for CnfWord {
    type Error = String;

    fn try_from(value: &Word<ProductionSymbol>) -> Result<Self, Self::Error> {
        match value.0.as_slice() {
            [ProductionSymbol::Terminal(t)] => Ok(CnfWord::Terminal(t.clone())),
            [ProductionSymbol::NonTerminal(nt1), ProductionSymbol::NonTerminal(nt2)] => {
                Ok(CnfWord::NonTerminals(nt1.clone(), nt2.clone()))
            }
            _ => Err(
                "CnfWord can only be created from a word with one terminal or two non-terminals"
                    .to_string(),
            ),
        }
    }
}

impl ProductionWord for CnfWord {
    fn to_word(&self) -> Word<ProductionSymbol> {
        match self {
            CnfWord::Terminal(t) => Word(vec![ProductionSymbol::Terminal(t.clone())]),
            CnfWord::NonTerminals(nt1, nt2) => Word(vec![
                ProductionSymbol::NonTerminal(nt1.clone()),
                ProductionSymbol::NonTerminal(nt2.clone()),
            ]),
        }
    }
}

/// A grammar whose shape is guaranteed by construction: every body is one
/// terminal or two non-terminals, and only start symbols may be erasable.
#[derive(Debug, Clone)]
pub struct ChomskyNormalFormGrammar {
    pub(super) non_terminals: IndexSet<NonTerminal>,
    pub(super) terminals: IndexSet<Terminal>,
    pub(super) start_symbols: IndexSet<NonTerminal>,
    pub(super) erasable_start_symbols: IndexSet<NonTerminal>,
    pub(super) productions: IndexMap<NonTerminal, IndexSet<CnfWord>>,
}

impl Grammar<NonTerminal, CnfWord> for ChomskyNormalFormGrammar {
    fn start_symbols(&self) -> &IndexSet<NonTerminal> {
        &self.start_symbols
    }

    fn non_terminals(&self) -> Cow<'_, IndexSet<NonTerminal>> {
        Cow::Borrowed(&self.non_terminals)
    }

    fn terminals(&self) -> Cow<'_, IndexSet<Terminal>> {
        Cow::Borrowed(&self.terminals)
    }

    fn erasing_productions(&self) -> Cow<'_, IndexSet<NonTerminal>> {
        Cow::Borrowed(&self.erasable_start_symbols)
    }

    fn productions(&self) -> &IndexMap<NonTerminal, IndexSet<CnfWord>> {
        &self.productions
    }
}

impl TryFrom<&ContextFreeGrammar> for ChomskyNormalFormGrammar {
    type Error = NormalFormError;

    fn try_from(cfg: &ContextFreeGrammar) -> Result<Self, Self::Error> {
        let mut cnf = Self {
            non_terminals: cfg.non_terminals.clone(),
            terminals: cfg.terminals.clone(),
            start_symbols: cfg.start_symbols.clone(),
            erasable_start_symbols: IndexSet::new(),
            productions: IndexMap::new(),
        };

        for (lhs, rhs) in &cfg.productions {
            let nt = lhs
                .as_non_terminal()
                .ok_or_else(|| NormalFormError::NonContextFreeKey(lhs.to_string()))?;

            let entry = cnf.productions.entry(nt.clone()).or_insert_with(IndexSet::new);

            for word in rhs {
                if word.is_empty() {
                    if !cfg.start_symbols.contains(nt) {
                        return Err(NormalFormError::ErasingNonStart(nt.to_string()));
                    }
                    cnf.erasable_start_symbols.insert(nt.clone());
                } else if word.is_unit() {
                    return Err(NormalFormError::UnitProduction {
                        lhs: nt.to_string(),
                        rhs: word.to_string(),
                    });
                } else {
                    let cnf_word =
                        CnfWord::try_from(word).map_err(|_| NormalFormError::InvalidBody {
                            lhs: nt.to_string(),
                            rhs: word.to_string(),
                        })?;
                    entry.insert(cnf_word);
                }
            }
        }

        cnf.productions.retain(|_, rhs| !rhs.is_empty());

        for (_, rhs) in &cnf.productions {
            for word in rhs {
                if let CnfWord::NonTerminals(nt1, nt2) = word {
                    if let Some(nt) = [nt1, nt2]
                        .into_iter()
                        .find(|nt| cnf.erasable_start_symbols.contains(*nt))
                    {
                        return Err(NormalFormError::ErasableStartOnRhs(nt.to_string()));
                    }
                }
            }
        }

        let productive = cnf.productive_non_terminals();
        if let Some(nt) = cnf.non_terminals.iter().find(|nt| !productive.contains(*nt)) {
            return Err(NormalFormError::NonProductive(nt.to_string()));
        }

        let accessible = cnf.accessible_non_terminals();
        if let Some(nt) = cnf.non_terminals.iter().find(|nt| !accessible.contains(*nt)) {
            return Err(NormalFormError::Inaccessible(nt.to_string()));
        }

        Ok(cnf)
    }
}

#[derive(Debug)]
pub struct CykTable {
    table: Vec<Vec<IndexSet<NonTerminal>>>,
    word: Word<Terminal>,
    start_symbols: IndexSet<NonTerminal>,
    accepts_empty_word: bool,
}

impl CykTable {
    pub fn new(word: Word<Terminal>, cnf: &ChomskyNormalFormGrammar) -> Self {
        let size = word.len();

        CykTable {
            table: vec![vec![IndexSet::new(); size]; size],
            word,
            start_symbols: cnf.start_symbols.clone(),
            accepts_empty_word: !cnf.erasable_start_symbols.is_empty(),
        }
    }

    pub fn contains(&self, i: usize, j: usize, value: &NonTerminal) -> bool {
        self.table[i][j].contains(value)
    }

    pub fn insert(&mut self, i: usize, j: usize, value: NonTerminal) {
        self.table[i][j].insert(value);
    }

    pub fn is_word_in_language(&self) -> bool {
        match self.table.len() {
            0 => self.accepts_empty_word,
            n => self.table[0][n - 1]
                .iter()
                .any(|nt| self.start_symbols.contains(nt)),
        }
    }
}

impl Display for CykTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = if self.is_word_in_language() {
            "accepted"
        } else {
            "not accepted"
        };

        if self.table.is_empty() {
            return writeln!(
                f,
                "The empty word is {} in the language defined by the grammar.",
                verdict
            );
        }

        writeln!(f, "CYK Table for word \"{}\":", self.word)?;

        let mut builder = Builder::default();

        for (i, row) in self.table.iter().enumerate() {
            builder.push_record(row.iter().enumerate().map(|(j, s)| {
                if j >= i {
                    format!(
                        "V_{},{} = {}",
                        i + 1,
                        j + 1,
                        if s.is_empty() {
                            "∅".to_string()
                        } else {
                            format!("{{{}}}", s.iter().join(", "))
                        }
                    )
                } else {
                    String::new()
                }
            }));
        }

        builder.insert_record(0, (1..=self.table.len()).map(|j| format!("j = {}", j)));
        builder.insert_column(
            0,
            std::iter::once(String::new())
                .chain((1..=self.table.len()).map(|i| format!("i = {}", i))),
        );

        let mut table = builder.build();
        table.with(Style::rounded());

        writeln!(f, "{}", table)?;

        writeln!(
            f,
            "The word \"{}\" is {} in the language defined by the grammar, as {} start symbol is in the top-right cell.",
            self.word,
            verdict,
            if self.is_word_in_language() { "a" } else { "no" },
        )
    }
}

impl ChomskyNormalFormGrammar {
    /// Normalizes `cfg` and checks the result.
    pub fn from_context_free_grammar(
        cfg: &ContextFreeGrammar,
        config: NormalizerConfig,
    ) -> Result<(Self, Normalization), NormalFormError> {
        let normalization = Normalizer::new(config).normalize(cfg.clone());
        let cnf = Self::try_from(&normalization.grammar)?;

        Ok((cnf, normalization))
    }

    pub fn to_context_free_grammar(&self) -> ContextFreeGrammar {
        let mut productions = self
            .productions
            .iter()
            .map(|(lhs, rhs)| {
                let rhs = rhs.iter().map(CnfWord::to_word).collect::<IndexSet<_>>();
                (lhs.to_word(), rhs)
            })
            .collect::<IndexMap<_, _>>();

        for start_symbol in &self.erasable_start_symbols {
            productions
                .entry(start_symbol.to_word())
                .or_insert_with(IndexSet::new)
                .insert(Word::empty());
        }

        ContextFreeGrammar {
            non_terminals: self.non_terminals.clone(),
            terminals: self.terminals.clone(),
            start_symbols: self.start_symbols.clone(),
            productions,
        }
    }

    pub fn is_start_symbol_erasable(&self) -> bool {
        !self.erasable_start_symbols.is_empty()
    }

    fn productive_non_terminals(&self) -> IndexSet<&NonTerminal> {
        let mut productive = self.erasable_start_symbols.iter().collect::<IndexSet<_>>();

        loop {
            let mut changed = false;

            for (lhs, rhs) in &self.productions {
                if productive.contains(lhs) {
                    continue;
                }

                let is_lhs_productive = rhs.iter().any(|word| match word {
                    CnfWord::Terminal(_) => true,
                    CnfWord::NonTerminals(nt1, nt2) => {
                        productive.contains(nt1) && productive.contains(nt2)
                    }
                });

                if is_lhs_productive {
                    productive.insert(lhs);
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        productive
    }

    fn accessible_non_terminals(&self) -> IndexSet<&NonTerminal> {
        let mut accessible = self.start_symbols.iter().collect::<IndexSet<_>>();
        let mut stack = accessible.iter().copied().collect::<Vec<_>>();

        while let Some(nt) = stack.pop() {
            for word in self.productions.get(nt).into_iter().flatten() {
                if let CnfWord::NonTerminals(nt1, nt2) = word {
                    for child in [nt1, nt2] {
                        if accessible.insert(child) {
                            stack.push(child);
                        }
                    }
                }
            }
        }

        accessible
    }

    pub fn cyk(&self, word: &Word<Terminal>) -> CykTable {
        let n = word.len();
        let mut table = CykTable::new(word.clone(), self);

        for (lhs, rhs) in &self.productions {
            for cnf_word in rhs {
                if let CnfWord::Terminal(t) = cnf_word {
                    for (i, terminal) in word.iter().enumerate() {
                        if terminal == t {
                            table.insert(i, i, lhs.clone());
                        }
                    }
                }
            }
        }

        for d in 0..n.saturating_sub(1) {
            for i in 0..n - d - 1 {
                let j = i + d + 1;

                for k in i..j {
                    for (lhs, rhs) in &self.productions {
                        for cnf_word in rhs {
                            if let CnfWord::NonTerminals(nt1, nt2) = cnf_word {
                                if table.contains(i, k, nt1) && table.contains(k + 1, j, nt2) {
                                    table.insert(i, j, lhs.clone());
                                }
                            }
                        }
                    }
                }
            }
        }

        table
    }
}

impl Display for ChomskyNormalFormGrammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.definition())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammars::{context_free::GrammarDefinition, normalization::EpsilonPolicy};

    fn cfg(definition: GrammarDefinition) -> ContextFreeGrammar {
        ContextFreeGrammar::try_from(definition).unwrap()
    }

    fn terminals(word: &str) -> Word<Terminal> {
        word.chars().map(|c| Terminal::new(c)).collect()
    }

    fn balanced() -> ContextFreeGrammar {
        cfg(GrammarDefinition::new()
            .non_terminals(["S"])
            .terminals(["a", "b"])
            .start_symbols(["S"])
            .rule("S", &["a S b", ""]))
    }

    #[test]
    fn rejects_grammars_outside_normal_form() {
        let unit = cfg(GrammarDefinition::new()
            .non_terminals(["S", "A"])
            .terminals(["a"])
            .start_symbols(["S"])
            .rule("S", &["A"])
            .rule("A", &["a"]));
        assert_eq!(
            ChomskyNormalFormGrammar::try_from(&unit).unwrap_err(),
            NormalFormError::UnitProduction {
                lhs: "S".to_owned(),
                rhs: "A".to_owned()
            }
        );

        assert!(matches!(
            ChomskyNormalFormGrammar::try_from(&balanced()),
            Err(NormalFormError::InvalidBody { .. })
        ));

        let erasing = cfg(GrammarDefinition::new()
            .non_terminals(["S", "A"])
            .terminals(["a"])
            .start_symbols(["S"])
            .rule("S", &["A A"])
            .rule("A", &["a", ""]));
        assert_eq!(
            ChomskyNormalFormGrammar::try_from(&erasing).unwrap_err(),
            NormalFormError::ErasingNonStart("A".to_owned())
        );

        let unreachable = cfg(GrammarDefinition::new()
            .non_terminals(["S", "A"])
            .terminals(["a"])
            .start_symbols(["S"])
            .rule("S", &["a"])
            .rule("A", &["a"]));
        assert_eq!(
            ChomskyNormalFormGrammar::try_from(&unreachable).unwrap_err(),
            NormalFormError::Inaccessible("A".to_owned())
        );

        let legacy_key = cfg(GrammarDefinition::new()
            .non_terminals(["S"])
            .terminals(["a"])
            .start_symbols(["S"])
            .rule("S", &["a"])
            .rule("S a", &["a"]));
        assert_eq!(
            ChomskyNormalFormGrammar::try_from(&legacy_key).unwrap_err(),
            NormalFormError::NonContextFreeKey("Sa".to_owned())
        );

        let recursive_erasable = cfg(GrammarDefinition::new()
            .non_terminals(["S"])
            .terminals(["a"])
            .start_symbols(["S"])
            .rule("S", &["S S", "a", ""]));
        assert_eq!(
            ChomskyNormalFormGrammar::try_from(&recursive_erasable).unwrap_err(),
            NormalFormError::ErasableStartOnRhs("S".to_owned())
        );

        // `B` never terminates, so neither does `S`.
        let looping = cfg(GrammarDefinition::new()
            .non_terminals(["S", "A", "B"])
            .terminals(["a"])
            .start_symbols(["S"])
            .rule("S", &["A B"])
            .rule("A", &["a"])
            .rule("B", &["B B"]));
        assert_eq!(
            ChomskyNormalFormGrammar::try_from(&looping).unwrap_err(),
            NormalFormError::NonProductive("S".to_owned())
        );
    }

    #[test]
    fn normalizes_and_verifies() {
        let (cnf, normalization) = ChomskyNormalFormGrammar::from_context_free_grammar(
            &balanced(),
            NormalizerConfig::default(),
        )
        .unwrap();

        assert!(cnf.is_start_symbol_erasable());
        assert_eq!(normalization.snapshots.len(), 7);
        assert_eq!(
            cnf.to_context_free_grammar().words_up_to(6),
            balanced().words_up_to(6)
        );
    }

    #[test]
    fn discarding_epsilon_drops_the_empty_word() {
        let config = NormalizerConfig {
            epsilon_policy: EpsilonPolicy::Discard,
            ..NormalizerConfig::default()
        };
        let (cnf, _) =
            ChomskyNormalFormGrammar::from_context_free_grammar(&balanced(), config).unwrap();

        assert!(!cnf.is_start_symbol_erasable());
        assert!(!cnf.cyk(&Word::empty()).is_word_in_language());
        assert!(cnf.cyk(&terminals("aabb")).is_word_in_language());
    }

    #[test]
    fn cyk_decides_membership() {
        let (cnf, _) = ChomskyNormalFormGrammar::from_context_free_grammar(
            &balanced(),
            NormalizerConfig::default(),
        )
        .unwrap();

        assert!(cnf.cyk(&Word::empty()).is_word_in_language());
        assert!(cnf.cyk(&terminals("ab")).is_word_in_language());
        assert!(cnf.cyk(&terminals("aaabbb")).is_word_in_language());
        assert!(!cnf.cyk(&terminals("aab")).is_word_in_language());
        assert!(!cnf.cyk(&terminals("ba")).is_word_in_language());
    }

    #[test]
    fn cyk_table_renders() {
        let (cnf, _) = ChomskyNormalFormGrammar::from_context_free_grammar(
            &balanced(),
            NormalizerConfig::default(),
        )
        .unwrap();

        let rendered = cnf.cyk(&terminals("ab")).to_string();
        assert!(rendered.contains("V_1,2"));
        assert!(rendered.contains("is accepted"));

        let empty = cnf.cyk(&Word::empty()).to_string();
        assert!(empty.contains("empty word is accepted"));
    }
}
