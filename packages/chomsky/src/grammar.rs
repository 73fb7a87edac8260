pub use crate::grammars::{
    chomsky_normal_form::{ChomskyNormalFormGrammar, CnfWord, CykTable},
    context_free::{ContextFreeGrammar, GrammarDefinition, GrammarType},
    normalization::{EpsilonPolicy, Normalization, Normalizer, NormalizerConfig, Phase, Snapshot},
    types::{Grammar, NonTerminal, ProductionSymbol, ProductionWord, Terminal},
};
