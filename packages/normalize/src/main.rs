use std::{fs, path::PathBuf};

use anyhow::Context;
use chomsky::{
    grammar::{
        ChomskyNormalFormGrammar, ContextFreeGrammar, EpsilonPolicy, Grammar, NormalizerConfig,
        Terminal,
    },
    input::{parse_grammar_file, tokenize, GrammarForm},
    language::Word,
};
use clap::Parser;
use indexmap::IndexSet;
use log::info;

/// Normalizes a context-free grammar into Chomsky normal form, printing the
/// grammar after every phase.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Grammar file with `N:`, `T:` and `S:` headers followed by productions.
    /// The built-in sample grammar is used when omitted.
    file: Option<PathBuf>,

    /// Drop ε from the language instead of keeping a `S → ε` production.
    #[arg(long)]
    discard_epsilon: bool,

    /// Print the words of length at most K before and after normalization.
    #[arg(long, value_name = "K")]
    words: Option<usize>,

    /// Run the CYK algorithm on WORD against the normalized grammar.
    #[arg(long, value_name = "WORD")]
    cyk: Vec<String>,

    /// Print the Chomsky hierarchy class of the input grammar.
    #[arg(long)]
    classify: bool,
}

fn sample_grammar() -> GrammarForm {
    GrammarForm {
        non_terminals: "S, A, B, C, D, X".to_owned(),
        terminals: "a, b".to_owned(),
        start_symbols: "S".to_owned(),
        productions: [
            "S -> A",
            "A -> aX | bX",
            "X -> ε | BX | b",
            "B -> AD",
            "D -> aD | a",
            "C -> Ca",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect(),
    }
}

fn load(args: &Args) -> anyhow::Result<ContextFreeGrammar> {
    let Some(path) = &args.file else {
        info!("no grammar file given, using the sample grammar");
        return Ok(sample_grammar().parse()?);
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    parse_grammar_file(&text).with_context(|| format!("invalid grammar in {}", path.display()))
}

fn print_words(label: &str, grammar: &ContextFreeGrammar, max_len: usize) {
    let words = grammar.words_up_to(max_len);

    println!("Words up to length {} {} ({}):", max_len, label, words.len());
    for word in &words {
        println!("  {}", word);
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let grammar = load(&args)?;

    println!("Input grammar:\n{}", grammar.definition());

    if args.classify {
        println!("Classification: {}", grammar.classify());
    }

    if let Some(max_len) = args.words {
        print_words("before normalization", &grammar, max_len);
    }

    let config = NormalizerConfig {
        epsilon_policy: if args.discard_epsilon {
            EpsilonPolicy::Discard
        } else {
            EpsilonPolicy::Preserve
        },
        ..NormalizerConfig::default()
    };

    let (cnf, normalization) = ChomskyNormalFormGrammar::from_context_free_grammar(&grammar, config)
        .context("normalization produced a grammar outside Chomsky normal form")?;

    for snapshot in &normalization.snapshots {
        println!("\n{}:\n{}", snapshot.phase, snapshot.definition);
    }

    println!("\nChomsky Normal Form:\n{}", cnf);

    if let Some(max_len) = args.words {
        print_words("after normalization", &normalization.grammar, max_len);
    }

    let terminals = cnf.terminals();
    let vocabulary = terminals
        .iter()
        .map(|t| t.0.as_str())
        .collect::<IndexSet<_>>();

    for word in &args.cyk {
        let symbols = tokenize(word.trim(), &vocabulary, word)
            .with_context(|| format!("cannot run CYK on {:?}", word))?;

        let word = symbols.into_iter().map(Terminal::new).collect::<Word<_>>();
        println!("\n{}", cnf.cyk(&word));
    }

    Ok(())
}
