//! Text front end: turns form-shaped or file-shaped grammar text into a
//! validated [`ContextFreeGrammar`].
//!
//! Declarations are comma or semicolon separated name lists, optionally
//! wrapped in braces. Productions read `A -> aB | b` (or `→`, or `,` between
//! alternatives); `ε`, `eps` and empty alternatives are the empty body.

use indexmap::IndexSet;
use winnow::{
    ascii::space0,
    combinator::{alt, delimited, opt, separated, separated_pair},
    token::{one_of, rest, take_till, take_until, take_while},
    ModalResult, Parser,
};

use crate::{
    error::ConfigurationError,
    grammars::context_free::{ContextFreeGrammar, GrammarDefinition},
};

const EPSILON_SPELLINGS: [&str; 3] = ["ε", "eps", "epsilon"];

/// The raw fields a user fills in to describe a grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrammarForm {
    pub non_terminals: String,
    pub terminals: String,
    pub start_symbols: String,
    pub productions: Vec<String>,
}

impl GrammarForm {
    pub fn parse(&self) -> Result<ContextFreeGrammar, ConfigurationError> {
        let lines = self
            .productions
            .iter()
            .enumerate()
            .map(|(i, line)| (i + 1, line.as_str()))
            .collect::<Vec<_>>();

        build(
            &self.non_terminals,
            &self.terminals,
            &self.start_symbols,
            &lines,
        )
    }
}

/// Parses the block format:
///
/// ```text
/// N: S, A
/// T: a, b
/// S: S
/// S -> aA | ε
/// A -> b
/// ```
///
/// Blank lines and lines starting with `#` are ignored.
pub fn parse_grammar_file(text: &str) -> Result<ContextFreeGrammar, ConfigurationError> {
    let mut form = GrammarForm::default();
    let mut lines = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line_number = i + 1;
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if trimmed.contains("->") || trimmed.contains('→') {
            lines.push((line_number, trimmed));
            continue;
        }

        let (key, value) =
            header
                .parse(trimmed)
                .map_err(|_| ConfigurationError::UnexpectedLine {
                    line: line_number,
                    text: trimmed.to_owned(),
                })?;

        let field = match key {
            'N' => &mut form.non_terminals,
            'T' => &mut form.terminals,
            _ => &mut form.start_symbols,
        };
        if !field.is_empty() {
            field.push(',');
        }
        field.push_str(value);
    }

    build(
        &form.non_terminals,
        &form.terminals,
        &form.start_symbols,
        &lines,
    )
}

fn build(
    non_terminals: &str,
    terminals: &str,
    start_symbols: &str,
    lines: &[(usize, &str)],
) -> Result<ContextFreeGrammar, ConfigurationError> {
    let non_terminals = declaration(non_terminals, "non-terminals", true)?;
    let terminals = declaration(terminals, "terminals", false)?;
    let start_symbols = declaration(start_symbols, "start symbols", true)?;

    let vocabulary = non_terminals
        .iter()
        .chain(&terminals)
        .map(String::as_str)
        .collect::<IndexSet<_>>();

    let mut definition = GrammarDefinition::new()
        .non_terminals(non_terminals.iter().cloned())
        .terminals(terminals.iter().cloned())
        .start_symbols(start_symbols);

    for &(line, text) in lines {
        let (lhs, alternatives) = production.parse(text).map_err(|_| {
            if text.contains("->") || text.contains('→') {
                ConfigurationError::UnexpectedLine {
                    line,
                    text: text.to_owned(),
                }
            } else {
                ConfigurationError::MissingArrow {
                    line,
                    text: text.to_owned(),
                }
            }
        })?;

        let lhs = lhs.trim();
        if lhs.is_empty() {
            return Err(ConfigurationError::EmptyLeftHandSide {
                line,
                text: text.to_owned(),
            });
        }

        let lhs = tokenize(lhs, &vocabulary, text)?;
        let bodies = alternatives
            .into_iter()
            .map(|alternative| tokenize(alternative.trim(), &vocabulary, text))
            .collect::<Result<Vec<_>, _>>()?;

        definition.productions.push((lhs, bodies));
    }

    Ok(ContextFreeGrammar::try_from(definition)?)
}

fn declaration(
    text: &str,
    what: &'static str,
    required: bool,
) -> Result<Vec<String>, ConfigurationError> {
    let names = name_list
        .parse(text.trim())
        .map_err(|_| ConfigurationError::MalformedDeclaration {
            what,
            text: text.trim().to_owned(),
        })?;

    if required && names.is_empty() {
        return Err(ConfigurationError::EmptyDeclaration(what));
    }

    Ok(names.into_iter().map(str::to_owned).collect())
}

/// Splits a body into declared symbol names. Bodies containing whitespace are
/// split on it. Otherwise the body is cut into declared names, preferring the
/// longest name at each position that still lets the rest split.
pub fn tokenize(
    body: &str,
    vocabulary: &IndexSet<&str>,
    production: &str,
) -> Result<Vec<String>, ConfigurationError> {
    let unknown = |symbol: &str| ConfigurationError::UnknownSymbol {
        symbol: symbol.to_owned(),
        production: production.to_owned(),
    };

    if body.is_empty() || EPSILON_SPELLINGS.contains(&body) {
        return Ok(Vec::new());
    }

    if body.contains(char::is_whitespace) {
        return body
            .split_whitespace()
            .map(|name| {
                if vocabulary.contains(name) {
                    Ok(name.to_owned())
                } else {
                    Err(unknown(name))
                }
            })
            .collect();
    }

    // `next[i]` is the longest name starting at byte `i` after which the
    // rest of the body still splits into declared names.
    let mut next: Vec<Option<&str>> = vec![None; body.len()];
    for i in (0..body.len()).rev().filter(|&i| body.is_char_boundary(i)) {
        let choice = vocabulary
            .iter()
            .filter(|name| !name.is_empty() && body[i..].starts_with(**name))
            .filter(|name| i + name.len() == body.len() || next[i + name.len()].is_some())
            .max_by_key(|name| name.len())
            .copied();
        next[i] = choice;
    }

    if next[0].is_none() {
        let mut reachable = vec![false; body.len() + 1];
        reachable[0] = true;
        let mut furthest = 0;

        for i in 0..body.len() {
            if !reachable[i] {
                continue;
            }
            furthest = i;
            for name in vocabulary.iter().filter(|name| !name.is_empty()) {
                if body[i..].starts_with(*name) {
                    reachable[i + name.len()] = true;
                }
            }
        }

        let symbol = body[furthest..].chars().next().map(String::from).unwrap_or_default();
        return Err(unknown(&symbol));
    }

    let mut symbols = Vec::new();
    let mut i = 0;

    while i < body.len() {
        let Some(name) = next[i] else {
            return Err(unknown(&body[i..]));
        };
        symbols.push(name.to_owned());
        i += name.len();
    }

    Ok(symbols)
}

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ',' | ';' | '|' | '{' | '}')
}

fn name<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., is_name_char).parse_next(input)
}

fn name_list<'s>(input: &mut &'s str) -> ModalResult<Vec<&'s str>> {
    delimited(
        (opt('{'), space0),
        separated(0.., name, (space0, one_of([',', ';']), space0)),
        (space0, opt('}')),
    )
    .parse_next(input)
}

fn header<'s>(input: &mut &'s str) -> ModalResult<(char, &'s str)> {
    separated_pair(one_of(['N', 'T', 'S']), (space0, ':', space0), rest).parse_next(input)
}

fn production<'s>(input: &mut &'s str) -> ModalResult<(&'s str, Vec<&'s str>)> {
    separated_pair(
        take_until(0.., ("->", "→")),
        alt(("->", "→")),
        separated(1.., take_till(0.., ['|', ',']), one_of(['|', ','])),
    )
    .parse_next(input)
}
