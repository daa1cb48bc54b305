use super::lexer::{CharClass, classify, is_separator};
use super::tree::{BinaryOp, Filter, FilterNode};
use super::{FilterError, check_len};

/// Parse a filter expression.
///
/// Never fails on syntax; see the [module docs](super) for the language.
pub fn parse(text: &str) -> Result<Filter, FilterError> {
    parse_with_mask(text).map(|(filter, _)| filter)
}

/// Parse a filter expression and also return the lexer classification,
/// one entry per `char` of `text`.
pub fn parse_with_mask(text: &str) -> Result<(Filter, Vec<CharClass>), FilterError> {
    check_len(text.len())?;
    let chars: Vec<char> = text.chars().collect();
    let mask = classify(&chars);

    let mut parser = Parser {
        chars: &chars,
        mask: &mask,
        pos: 0,
    };
    let nodes = parser.expression();
    Ok((Filter::from_chain(nodes), mask))
}

/// Literal mode: whitespace-separated words, all joined by AND.
///
/// Quotes, `!`, `OR` and parentheses have no meaning here.
pub fn parse_no_operators(text: &str) -> Result<Filter, FilterError> {
    check_len(text.len())?;
    let nodes = text
        .split(is_separator)
        .filter(|word| !word.is_empty())
        .enumerate()
        .flat_map(|(i, word)| {
            let op = (i > 0).then_some(FilterNode::Operator(BinaryOp::And));
            op.into_iter().chain(std::iter::once(FilterNode::leaf(word)))
        })
        .collect();
    Ok(Filter::from_chain(nodes))
}

struct Parser<'a> {
    chars: &'a [char],
    mask: &'a [CharClass],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<CharClass> {
        self.mask.get(self.pos).copied()
    }

    fn skip_while(&mut self, pred: impl Fn(CharClass) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn skip_ignored(&mut self) {
        self.skip_while(|c| c == CharClass::Ignored);
    }

    /// One chain, up to the end of input or the closing parenthesis of the
    /// enclosing group (left unconsumed).
    fn expression(&mut self) -> Vec<FilterNode> {
        let mut chain = Vec::new();
        let mut pending_op: Option<BinaryOp> = None;
        let mut negate = false;

        self.skip_while(|c| matches!(c, CharClass::Ignored | CharClass::Separator));

        loop {
            let node = match self.peek() {
                None | Some(CharClass::GroupClose) => break,
                Some(CharClass::GroupOpen) => {
                    self.pos += 1;
                    let children = self.expression();
                    if self.peek() == Some(CharClass::GroupClose) {
                        self.pos += 1;
                    }
                    let negated = std::mem::take(&mut negate);
                    Some(FilterNode::Group { children, negated })
                }
                Some(CharClass::Not) => {
                    self.pos += 1;
                    negate = !negate;
                    None
                }
                Some(CharClass::Separator) => {
                    self.skip_while(|c| matches!(c, CharClass::Ignored | CharClass::Separator));
                    pending_op.get_or_insert(BinaryOp::And);
                    None
                }
                Some(CharClass::Or) => {
                    self.skip_while(|c| c == CharClass::Or);
                    pending_op = Some(BinaryOp::Or);
                    None
                }
                Some(CharClass::FreeWord | CharClass::Quote) => {
                    let value = self.literal();
                    let negated = std::mem::take(&mut negate);
                    Some(FilterNode::Leaf { value, negated })
                }
                Some(CharClass::Ignored | CharClass::Quoted) => {
                    self.pos += 1;
                    None
                }
            };

            if let Some(node) = node {
                if !chain.is_empty() {
                    chain.push(FilterNode::Operator(pending_op.unwrap_or(BinaryOp::And)));
                }
                chain.push(node);
                pending_op = None;
            }
            self.skip_ignored();
        }

        chain
    }

    /// Concatenate adjacent quoted and free spans separated only by ignored
    /// characters into one literal.
    fn literal(&mut self) -> String {
        let mut value = String::new();
        loop {
            match self.peek() {
                Some(CharClass::Quote) => {
                    self.pos += 1;
                    let start = self.pos;
                    self.skip_while(|c| c == CharClass::Quoted);
                    let body: String = self.chars[start..self.pos].iter().collect();
                    value.push_str(&body.replace("\"\"", "\""));
                    if self.peek() == Some(CharClass::Quote) {
                        self.pos += 1;
                    }
                }
                Some(CharClass::FreeWord) => {
                    let start = self.pos;
                    self.skip_while(|c| c == CharClass::FreeWord);
                    value.extend(&self.chars[start..self.pos]);
                }
                _ => break,
            }
            self.skip_ignored();
        }
        value
    }
}
