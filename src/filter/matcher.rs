use super::tree::{BinaryOp, Filter, FilterNode};

/// How a leaf literal is searched for in the candidate text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseSensitivity {
    #[default]
    Sensitive,
    /// ASCII-only case-insensitive search.
    ///
    /// For full Unicode matching fold both sides instead, see
    /// [`Filter::case_folded`] and [`fold_text`].
    InsensitiveAscii,
}

/// Unicode full case folding of `text`
pub fn fold_text(text: &str) -> String {
    caseless::default_case_fold_str(text)
}

/// Check whether `text` passes `filter`.
///
/// Operators combine strictly left to right, without precedence. The empty
/// filter matches everything.
pub fn is_filtered(filter: &Filter, text: &str, case: CaseSensitivity) -> bool {
    eval_chain(filter.nodes(), text, case)
}

fn eval_chain(nodes: &[FilterNode], text: &str, case: CaseSensitivity) -> bool {
    let mut filtered = true;
    let mut pending: Option<BinaryOp> = None;

    for node in nodes {
        match node {
            FilterNode::Operator(op) => pending = Some(*op),
            operand => {
                let decided = match pending {
                    Some(BinaryOp::And) => !filtered,
                    Some(BinaryOp::Or) => filtered,
                    None => false,
                };
                if !decided {
                    filtered = eval_operand(operand, text, case);
                }
            }
        }
    }

    filtered
}

fn eval_operand(node: &FilterNode, text: &str, case: CaseSensitivity) -> bool {
    match node {
        FilterNode::Leaf { value, negated } => contains(text, value, case) != *negated,
        FilterNode::Group { children, negated } => eval_chain(children, text, case) != *negated,
        FilterNode::Operator(_) => true,
    }
}

fn contains(haystack: &str, needle: &str, case: CaseSensitivity) -> bool {
    match case {
        CaseSensitivity::Sensitive => haystack.contains(needle),
        CaseSensitivity::InsensitiveAscii => {
            let (h, n) = (haystack.as_bytes(), needle.as_bytes());
            n.is_empty() || h.windows(n.len()).any(|w| w.eq_ignore_ascii_case(n))
        }
    }
}
