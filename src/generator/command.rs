//! Normalization of user-typed commands into Docker exec form.
//!
//! The recognised shapes are checked in a fixed order and the first one that
//! matches decides how the text is rewritten:
//!
//! | Shape | Example | Result |
//! |---|---|---|
//! | [`CommandShape::ExecForm`] | `["npm", "start"]` | unchanged |
//! | [`CommandShape::BracketedWithoutCommas`] | `["npm" "start"]` | commas inserted |
//! | [`CommandShape::UnbracketedList`] | `"npm", "start"` | brackets added |
//! | [`CommandShape::UnbracketedWords`] | `"npm" "start"` | brackets and commas added |
//! | [`CommandShape::Shell`] | `npm start` | every word quoted |
//!
//! This is a heuristic, not a shell lexer: embedded quotes and escaped
//! whitespace are not understood.

/// The form a command string was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandShape {
    ExecForm,
    BracketedWithoutCommas,
    UnbracketedList,
    UnbracketedWords,
    Shell,
}

/// Quoted tokens recovered from a command string
#[derive(Debug)]
struct Scanned<'a> {
    bracketed: bool,
    comma_separated: bool,
    tokens: Vec<&'a str>,
}

#[derive(Debug, Clone, Copy)]
enum State {
    ExpectToken,
    InToken { start: usize },
    AfterToken { seen_comma: bool, seen_separator: bool },
}

/// Classify a command string.
pub fn detect(input: &str) -> CommandShape {
    match scan(input) {
        Some(scanned) => shape_of(&scanned),
        None => CommandShape::Shell,
    }
}

/// Rewrite a command string into bracketed, quoted, comma-separated form.
pub fn normalize(input: &str) -> String {
    let trimmed = input.trim();
    let Some(scanned) = scan(trimmed) else {
        return quote_words(trimmed);
    };

    match shape_of(&scanned) {
        CommandShape::ExecForm => trimmed.to_string(),
        CommandShape::UnbracketedList => format!("[{}]", trimmed),
        CommandShape::BracketedWithoutCommas | CommandShape::UnbracketedWords => {
            format!("[{}]", join_quoted(&scanned.tokens))
        }
        CommandShape::Shell => quote_words(trimmed),
    }
}

fn shape_of(scanned: &Scanned<'_>) -> CommandShape {
    match (scanned.bracketed, scanned.comma_separated) {
        (true, true) => CommandShape::ExecForm,
        (true, false) => CommandShape::BracketedWithoutCommas,
        (false, true) => CommandShape::UnbracketedList,
        (false, false) => CommandShape::UnbracketedWords,
    }
}

fn quote_words(input: &str) -> String {
    let words: Vec<&str> = input.split_whitespace().collect();
    format!("[{}]", join_quoted(&words))
}

fn join_quoted(tokens: &[&str]) -> String {
    tokens
        .iter()
        .map(|token| format!("\"{}\"", token))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Walk the input once, accepting only a list of `"word"` tokens separated by
/// whitespace and at most one comma each, optionally wrapped in brackets.
fn scan(input: &str) -> Option<Scanned<'_>> {
    let input = input.trim();
    let (bracketed, inner) = match (input.starts_with('['), input.ends_with(']')) {
        (true, true) if input.len() >= 2 => (true, input[1..input.len() - 1].trim()),
        (false, false) => (false, input),
        _ => return None,
    };

    let mut tokens = Vec::new();
    let mut comma_separated = true;
    let mut state = State::ExpectToken;

    for (idx, ch) in inner.char_indices() {
        state = match state {
            State::ExpectToken if ch == '"' => State::InToken { start: idx + 1 },
            State::ExpectToken => return None,
            State::InToken { start } if ch == '"' => {
                if idx == start {
                    return None;
                }
                tokens.push(&inner[start..idx]);
                State::AfterToken {
                    seen_comma: false,
                    seen_separator: false,
                }
            }
            State::InToken { .. } if ch.is_whitespace() => return None,
            State::InToken { start } => State::InToken { start },
            State::AfterToken { seen_comma, .. } if ch == ',' => {
                if seen_comma {
                    return None;
                }
                State::AfterToken {
                    seen_comma: true,
                    seen_separator: true,
                }
            }
            State::AfterToken { seen_comma, .. } if ch.is_whitespace() => State::AfterToken {
                seen_comma,
                seen_separator: true,
            },
            State::AfterToken {
                seen_comma,
                seen_separator,
            } if ch == '"' => {
                if !seen_separator {
                    return None;
                }
                comma_separated &= seen_comma;
                State::InToken { start: idx + 1 }
            }
            State::AfterToken { .. } => return None,
        };
    }

    match state {
        State::AfterToken {
            seen_separator: false,
            ..
        } if !tokens.is_empty() => Some(Scanned {
            bracketed,
            comma_separated,
            tokens,
        }),
        _ => None,
    }
}
