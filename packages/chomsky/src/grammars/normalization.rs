use std::fmt::Display;

use indexmap::{indexset, IndexMap, IndexSet};
use itertools::Itertools;
use log::{debug, info, trace, warn};

use crate::{
    grammars::{
        context_free::ContextFreeGrammar,
        types::{Grammar, NonTerminal, ProductionSymbol, ProductionWord, Terminal},
    },
    language::Word,
};

/// What happens to ε when the start symbol can derive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EpsilonPolicy {
    /// Keep ε in the language through a single `S → ε`.
    #[default]
    Preserve,
    /// Drop every empty body, ε included.
    Discard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerConfig {
    pub epsilon_policy: EpsilonPolicy,
    /// Prefix of the non-terminals standing in for terminals, as in `T_a`.
    pub terminal_prefix: String,
    /// Prefix of the non-terminals introduced while splitting long bodies.
    pub helper_prefix: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            epsilon_policy: EpsilonPolicy::default(),
            terminal_prefix: "T_".to_owned(),
            helper_prefix: "N_".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    NullableAnalysis,
    EpsilonElimination,
    UnitElimination,
    ProductivityPruning,
    AccessibilityPruning,
    TerminalIsolation,
    LongProductionSplitting,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::NullableAnalysis,
        Phase::EpsilonElimination,
        Phase::UnitElimination,
        Phase::ProductivityPruning,
        Phase::AccessibilityPruning,
        Phase::TerminalIsolation,
        Phase::LongProductionSplitting,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Phase::NullableAnalysis => "Nullable Analysis",
            Phase::EpsilonElimination => "Epsilon Elimination",
            Phase::UnitElimination => "Unit Elimination",
            Phase::ProductivityPruning => "Productivity Pruning",
            Phase::AccessibilityPruning => "Accessibility Pruning",
            Phase::TerminalIsolation => "Terminal Isolation",
            Phase::LongProductionSplitting => "Long-Production Splitting",
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: Phase,
    pub definition: String,
}

#[derive(Debug, Clone)]
pub struct Normalization {
    pub grammar: ContextFreeGrammar,
    pub nullable: IndexSet<NonTerminal>,
    pub snapshots: Vec<Snapshot>,
}

impl Normalization {
    pub fn snapshot(&self, phase: Phase) -> Option<&str> {
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.phase == phase)
            .map(|snapshot| snapshot.definition.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Runs every phase in order on `grammar`, recording the grammar after
    /// each one.
    pub fn normalize(&self, mut grammar: ContextFreeGrammar) -> Normalization {
        let mut snapshots = Vec::with_capacity(Phase::ALL.len());
        let mut record = |phase: Phase, grammar: &ContextFreeGrammar| {
            info!(
                "{}: {} non-terminals, {} productions",
                phase,
                grammar.non_terminals.len(),
                grammar.production_count()
            );
            snapshots.push(Snapshot {
                phase,
                definition: grammar.definition(),
            });
        };

        let nullable = grammar.nullable_non_terminals();
        record(Phase::NullableAnalysis, &grammar);

        grammar.eliminate_erasing_productions(&nullable, self.config.epsilon_policy);
        record(Phase::EpsilonElimination, &grammar);

        grammar.eliminate_unit_productions();
        record(Phase::UnitElimination, &grammar);

        grammar.eliminate_non_productive_symbols();
        record(Phase::ProductivityPruning, &grammar);

        grammar.eliminate_inaccessible_symbols();
        record(Phase::AccessibilityPruning, &grammar);

        grammar.replace_terminals(&self.config.terminal_prefix);
        record(Phase::TerminalIsolation, &grammar);

        grammar.split_long_productions(&self.config.helper_prefix);
        record(Phase::LongProductionSplitting, &grammar);

        Normalization {
            grammar,
            nullable,
            snapshots,
        }
    }
}

impl ContextFreeGrammar {
    pub fn normalize(self) -> Normalization {
        Normalizer::default().normalize(self)
    }

    pub fn nullable_non_terminals(&self) -> IndexSet<NonTerminal> {
        let mut nullable = IndexSet::new();

        loop {
            let mut changed = false;

            for (lhs, rhs) in &self.productions {
                let Some(lhs) = lhs.as_non_terminal() else {
                    continue;
                };
                if nullable.contains(lhs) {
                    continue;
                }

                let is_lhs_nullable = rhs.iter().any(|word| {
                    word.iter().all(|symbol| match symbol {
                        ProductionSymbol::NonTerminal(nt) => nullable.contains(nt),
                        ProductionSymbol::Terminal(_) => false,
                    })
                });

                if is_lhs_nullable {
                    trace!("{} is nullable", lhs);
                    nullable.insert(lhs.clone());
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        debug!("nullable non-terminals: {{{}}}", nullable.iter().join(", "));

        nullable
    }

    pub fn eliminate_erasing_productions(
        &mut self,
        nullable: &IndexSet<NonTerminal>,
        policy: EpsilonPolicy,
    ) {
        for rhs in self.productions.values_mut() {
            let mut next_productions = IndexSet::new();

            for word in rhs.iter() {
                let words = word
                    .iter()
                    .cloned()
                    .map(|symbol| {
                        let is_nullable = symbol
                            .as_non_terminal()
                            .is_some_and(|nt| nullable.contains(nt));

                        if is_nullable {
                            vec![Some(symbol), None]
                        } else {
                            vec![Some(symbol)]
                        }
                    })
                    .multi_cartesian_product()
                    .map(|word| word.into_iter().flatten().collect::<Word<_>>())
                    .filter(|word| !word.is_empty());

                next_productions.extend(words);
            }

            *rhs = next_productions;
        }

        if policy == EpsilonPolicy::Discard {
            return;
        }

        let erasable_start_symbols = self
            .start_symbols
            .iter()
            .filter(|start_symbol| nullable.contains(*start_symbol))
            .cloned()
            .collect::<Vec<_>>();

        for start_symbol in erasable_start_symbols {
            let occurs_on_rhs = self
                .productions
                .values()
                .flatten()
                .any(|word| word.non_terminals().any(|nt| nt == &start_symbol));

            if !occurs_on_rhs {
                debug!("keeping {} → ε", start_symbol);
                self.productions
                    .entry(start_symbol.to_word())
                    .or_insert_with(IndexSet::new)
                    .insert(Word::empty());
                continue;
            }

            // The start symbol must not appear on a right-hand side once it
            // is erasable, so a fresh one takes its place.
            let new_start_symbol = self.fresh_non_terminal(start_symbol.0.as_str());
            debug!(
                "{} occurs on a right-hand side, introducing {} → {} | ε",
                start_symbol, new_start_symbol, start_symbol
            );

            self.productions.shift_insert(
                0,
                new_start_symbol.to_word(),
                indexset! {start_symbol.to_word(), Word::empty()},
            );

            if let Some(index) = self.start_symbols.get_index_of(&start_symbol) {
                self.start_symbols.shift_remove(&start_symbol);
                self.start_symbols.shift_insert(index, new_start_symbol);
            }
        }
    }

    pub fn eliminate_unit_productions(&mut self) {
        let productions = self.productions.clone();

        for (lhs, rhs) in &productions {
            let Some(nt) = lhs.as_non_terminal() else {
                continue;
            };

            let mut unit_closure = IndexSet::new();
            let mut worklist = vec![nt];

            while let Some(closure_nt) = worklist.pop() {
                let Some(closure_rhs) = productions.get(&closure_nt.to_word()) else {
                    continue;
                };

                for child_nt in closure_rhs.iter().filter_map(Word::as_non_terminal) {
                    if child_nt != nt && unit_closure.insert(child_nt) {
                        worklist.push(child_nt);
                    }
                }
            }

            if unit_closure.is_empty() && !rhs.iter().any(Word::is_unit) {
                continue;
            }

            trace!("unit closure of {}: {{{}}}", nt, unit_closure.iter().join(", "));

            let new_productions = std::iter::once(rhs)
                .chain(
                    unit_closure
                        .iter()
                        .filter_map(|child_nt| productions.get(&child_nt.to_word())),
                )
                .flatten()
                .filter(|word| !word.is_unit())
                .cloned()
                .collect::<IndexSet<_>>();

            self.productions.insert(lhs.clone(), new_productions);
        }
    }

    pub fn eliminate_non_productive_symbols(&mut self) {
        let mut productive = IndexSet::new();

        loop {
            let mut changed = false;

            for (lhs, rhs) in &self.productions {
                let Some(lhs) = lhs.as_non_terminal() else {
                    continue;
                };
                if productive.contains(lhs) {
                    continue;
                }

                let is_lhs_productive = rhs.iter().any(|word| {
                    word.iter().all(|symbol| match symbol {
                        ProductionSymbol::NonTerminal(nt) => productive.contains(nt),
                        ProductionSymbol::Terminal(_) => true,
                    })
                });

                if is_lhs_productive {
                    productive.insert(lhs.clone());
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        self.productions.retain(|lhs, _| {
            let is_context_free = lhs.as_non_terminal().is_some();
            if !is_context_free {
                warn!("dropping productions of {}, which is not a single non-terminal", lhs);
            }
            is_context_free
        });

        self.remove_non_terminals(|nt| !productive.contains(nt), "non-productive");
    }

    pub fn eliminate_inaccessible_symbols(&mut self) {
        let mut accessible = self.start_symbols.clone();
        let mut worklist = accessible.iter().cloned().collect::<Vec<_>>();

        while let Some(nt) = worklist.pop() {
            let Some(rhs) = self.productions_of(&nt) else {
                continue;
            };

            for child_nt in rhs.iter().flat_map(Word::non_terminals) {
                if accessible.insert(child_nt.clone()) {
                    worklist.push(child_nt.clone());
                }
            }
        }

        self.remove_non_terminals(|nt| !accessible.contains(nt), "inaccessible");
    }

    fn remove_non_terminals(
        &mut self,
        mut predicate: impl FnMut(&NonTerminal) -> bool,
        reason: &str,
    ) {
        let doomed = self
            .non_terminals
            .iter()
            .filter(|nt| predicate(nt))
            .cloned()
            .collect::<Vec<_>>();

        for nt in &doomed {
            debug!("removing {} non-terminal {}", reason, nt);
            self.remove_non_terminal(nt);
        }
    }

    /// Gives every terminal occurring in a body of two or more symbols its
    /// own non-terminal.
    pub fn replace_terminals(&mut self, prefix: &str) -> IndexMap<Terminal, NonTerminal> {
        let terminals = self
            .productions
            .values()
            .flatten()
            .filter(|word| word.len() > 1)
            .flat_map(Word::terminals)
            .cloned()
            .collect::<IndexSet<_>>();

        let replacements = terminals
            .into_iter()
            .map(|t| {
                let nt = self.fresh_non_terminal(&format!("{}{}", prefix, t));
                debug!("introducing {} → {}", nt, t);
                (t, nt)
            })
            .collect::<IndexMap<_, _>>();

        for rhs in self.productions.values_mut() {
            *rhs = rhs
                .iter()
                .map(|word| {
                    if word.len() == 1 {
                        word.clone()
                    } else {
                        Word::new(word.iter().map(|symbol| match symbol {
                            ProductionSymbol::Terminal(t) => {
                                ProductionSymbol::NonTerminal(replacements[t].clone())
                            }
                            ProductionSymbol::NonTerminal(_) => symbol.clone(),
                        }))
                    }
                })
                .collect::<IndexSet<_>>();
        }

        for (t, nt) in &replacements {
            self.set_productions(
                nt,
                indexset! {Word::new([ProductionSymbol::Terminal(t.clone())])},
            );
        }

        replacements
    }

    /// Rewrites every body longer than two symbols into a chain of binary
    /// bodies. Identical tails share one helper non-terminal.
    pub fn split_long_productions(
        &mut self,
        prefix: &str,
    ) -> IndexMap<Word<ProductionSymbol>, NonTerminal> {
        let mut helpers = IndexMap::new();
        let mut idx = 0;

        while self.productions.values().flatten().any(|word| word.len() > 2) {
            let productions = std::mem::take(&mut self.productions);
            let mut helper_productions = Vec::new();

            for (lhs, rhs) in productions {
                let mut next_productions = IndexSet::with_capacity(rhs.len());

                for word in rhs {
                    if word.len() <= 2 {
                        next_productions.insert(word);
                        continue;
                    }

                    let tail = Word(word.0[1..].to_vec());
                    let helper = match helpers.get(&tail) {
                        Some(helper) => {
                            trace!("reusing {} for {}", helper, tail);
                            NonTerminal::clone(helper)
                        }
                        None => {
                            idx += 1;
                            let helper = self.fresh_non_terminal(&format!("{}{}", prefix, idx));
                            debug!("introducing {} → {}", helper, tail);
                            helpers.insert(tail.clone(), helper.clone());
                            helper_productions.push((helper.clone(), tail));
                            helper
                        }
                    };

                    next_productions.insert(Word(vec![
                        word.0[0].clone(),
                        ProductionSymbol::NonTerminal(helper),
                    ]));
                }

                self.productions.insert(lhs, next_productions);
            }

            for (helper, tail) in helper_productions {
                self.set_productions(&helper, indexset! {tail});
            }
        }

        helpers
    }
}
