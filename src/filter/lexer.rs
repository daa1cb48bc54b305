//! Pre-parse pass: classify every character of the filter text.
//!
//! The parser walks the text and this classification side by side, so all
//! the tolerance of the language lives here. A token is only recognised at a
//! position where it can start an operand; anywhere else it is ignored.

use super::{FilterError, check_len};

/// Category of one filter character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// Whitespace between tokens
    Separator,
    Ignored,
    FreeWord,
    /// Opening or closing `"` of a quoted literal
    Quote,
    /// Inside a quoted literal
    Quoted,
    Or,
    Not,
    GroupOpen,
    GroupClose,
}

impl CharClass {
    /// One-character rendering used by `format_mask`
    pub fn code(&self) -> char {
        match self {
            CharClass::Separator => ' ',
            CharClass::Ignored => '.',
            CharClass::FreeWord => 'w',
            CharClass::Quote => '"',
            CharClass::Quoted => 'q',
            CharClass::Or => 'O',
            CharClass::Not => '!',
            CharClass::GroupOpen => '(',
            CharClass::GroupClose => ')',
        }
    }
}

pub(crate) fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_word_char(c: char) -> bool {
    !is_separator(c) && !matches!(c, '"' | '(' | ')' | '!')
}

/// Classify `text`, one [`CharClass`] per `char`.
pub fn pre_parse(text: &str) -> Result<Vec<CharClass>, FilterError> {
    check_len(text.len())?;
    let chars: Vec<char> = text.chars().collect();
    Ok(classify(&chars))
}

/// Render a mask as a string aligned with the filter text
pub fn format_mask(mask: &[CharClass]) -> String {
    mask.iter().map(CharClass::code).collect()
}

pub(crate) fn classify(chars: &[char]) -> Vec<CharClass> {
    let len = chars.len();
    let mut mask = vec![CharClass::Separator; len];
    let mut open_groups: Vec<usize> = Vec::new();
    // Separator doubles as "start of input / after whitespace"
    let mut previous = CharClass::Separator;
    let mut i = 0;

    while i < len {
        if is_separator(chars[i]) {
            while i < len && is_separator(chars[i]) {
                i += 1;
            }
            previous = CharClass::Separator;
            continue;
        }

        match chars[i] {
            '(' => {
                if matches!(previous, CharClass::Separator | CharClass::GroupOpen | CharClass::Not) {
                    mask[i] = CharClass::GroupOpen;
                    previous = CharClass::GroupOpen;
                    open_groups.push(i);
                } else {
                    mask[i] = CharClass::Ignored;
                }
                i += 1;
            }
            ')' => {
                if open_groups.pop().is_some() {
                    mask[i] = CharClass::GroupClose;
                    previous = CharClass::GroupClose;
                } else {
                    mask[i] = CharClass::Ignored;
                }
                i += 1;
            }
            '"' => match find_closing_quote(chars, i + 1) {
                Some(end) => {
                    if matches!(
                        previous,
                        CharClass::Separator
                            | CharClass::GroupOpen
                            | CharClass::Not
                            | CharClass::Quote
                            | CharClass::FreeWord
                    ) {
                        mask[i] = CharClass::Quote;
                        mask[end] = CharClass::Quote;
                        for m in &mut mask[i + 1..end] {
                            *m = CharClass::Quoted;
                        }
                        previous = CharClass::Quote;
                    } else {
                        for m in &mut mask[i..=end] {
                            *m = CharClass::Ignored;
                        }
                    }
                    i = end + 1;
                }
                None => {
                    mask[i] = CharClass::Ignored;
                    i += 1;
                }
            },
            '!' => {
                if matches!(previous, CharClass::Separator | CharClass::Not | CharClass::GroupOpen) {
                    mask[i] = CharClass::Not;
                    previous = CharClass::Not;
                } else {
                    mask[i] = CharClass::Ignored;
                }
                i += 1;
            }
            _ => {
                if let Some(next) = classify_or(chars, i, &mut mask, &mut previous) {
                    i = next;
                    continue;
                }

                if matches!(
                    previous,
                    CharClass::Separator
                        | CharClass::GroupOpen
                        | CharClass::Not
                        | CharClass::Quote
                        | CharClass::FreeWord
                ) {
                    while i < len && is_word_char(chars[i]) {
                        mask[i] = CharClass::FreeWord;
                        i += 1;
                    }
                    previous = CharClass::FreeWord;
                } else {
                    mask[i] = CharClass::Ignored;
                    i += 1;
                }
            }
        }
    }

    for pos in open_groups {
        mask[pos] = CharClass::Ignored;
    }

    demote_dangling_or(&mut mask);
    mask
}

/// Position of the quote closing a literal whose body starts at `start`.
///
/// A doubled quote is an escaped literal quote and does not terminate.
fn find_closing_quote(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start;
    loop {
        while j < chars.len() && chars[j] != '"' {
            j += 1;
        }
        if j + 1 < chars.len() && chars[j + 1] == '"' {
            j += 2;
            continue;
        }
        return (j < chars.len()).then_some(j);
    }
}

/// Try to read a whole-word `OR` at `i`. Returns the next position to scan
/// when the two letters were consumed (as OR or ignored).
fn classify_or(
    chars: &[char],
    i: usize,
    mask: &mut [CharClass],
    previous: &mut CharClass,
) -> Option<usize> {
    if !matches!(
        *previous,
        CharClass::Separator | CharClass::GroupOpen | CharClass::Not | CharClass::GroupClose
    ) {
        return None;
    }
    if i + 1 >= chars.len()
        || !chars[i].eq_ignore_ascii_case(&'o')
        || !chars[i + 1].eq_ignore_ascii_case(&'r')
    {
        return None;
    }

    let after = i + 2;
    if after == chars.len() || is_separator(chars[after]) {
        let class = if *previous == CharClass::Separator {
            CharClass::Or
        } else {
            CharClass::Ignored
        };
        mask[i] = class;
        mask[i + 1] = class;
        *previous = CharClass::Separator;
        // the separator right after the keyword is consumed with it
        Some((after + 1).min(chars.len()))
    } else if matches!(chars[after], '(' | ')' | '!') {
        mask[i] = CharClass::Ignored;
        mask[i + 1] = CharClass::Ignored;
        Some(after)
    } else {
        None
    }
}

/// An OR with nothing on its left (start, after `!`, `(` or another OR)
/// binds to nothing and is dropped.
fn demote_dangling_or(mask: &mut [CharClass]) {
    let mut last: Option<CharClass> = None;
    let mut i = 0;
    while i < mask.len() {
        let class = mask[i];
        match class {
            CharClass::Ignored | CharClass::Separator => {}
            CharClass::Or => {
                if matches!(
                    last,
                    None | Some(CharClass::Not) | Some(CharClass::GroupOpen) | Some(CharClass::Or)
                ) {
                    mask[i] = CharClass::Ignored;
                    if i + 1 < mask.len() {
                        mask[i + 1] = CharClass::Ignored;
                    }
                }
                last = Some(CharClass::Or);
                i += 1;
            }
            _ => last = Some(class),
        }
        i += 1;
    }
}
