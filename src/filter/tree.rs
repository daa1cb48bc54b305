use super::{FilterError, check_len};

/// Binary operator joining two neighbours of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
}

/// One element of a filter chain.
///
/// A chain alternates operands and operators: operand, operator, operand...
/// Groups own a nested chain of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterNode {
    /// Substring to look for, optionally negated
    Leaf { value: String, negated: bool },
    Operator(BinaryOp),
    /// Parenthesised sub-expression; an empty chain matches everything
    Group {
        children: Vec<FilterNode>,
        negated: bool,
    },
}

impl FilterNode {
    pub fn leaf(value: impl Into<String>) -> Self {
        FilterNode::Leaf {
            value: value.into(),
            negated: false,
        }
    }

    pub fn not_leaf(value: impl Into<String>) -> Self {
        FilterNode::Leaf {
            value: value.into(),
            negated: true,
        }
    }
}

/// A parsed filter: the top-level chain.
///
/// The empty filter is the vacuous filter and matches every text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    nodes: Vec<FilterNode>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_chain(nodes: Vec<FilterNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a literal at the end of the top-level chain, joined by `op`
    /// unless the filter is empty.
    pub fn add_operand(
        &mut self,
        op: BinaryOp,
        negated: bool,
        value: impl Into<String>,
    ) -> Result<&mut Self, FilterError> {
        let value = value.into();
        check_len(value.len())?;
        self.push(op, FilterNode::Leaf { value, negated });
        Ok(self)
    }

    /// Append a group holding `children`'s chain, joined by `op` unless the
    /// filter is empty.
    pub fn add_group(&mut self, op: BinaryOp, negated: bool, children: Filter) -> &mut Self {
        self.push(
            op,
            FilterNode::Group {
                children: children.nodes,
                negated,
            },
        );
        self
    }

    fn push(&mut self, op: BinaryOp, node: FilterNode) {
        if !self.nodes.is_empty() {
            self.nodes.push(FilterNode::Operator(op));
        }
        self.nodes.push(node);
    }

    /// Deep copy with every literal Unicode case-folded.
    ///
    /// Match the result against text folded with
    /// [`fold_text`](super::fold_text).
    pub fn case_folded(&self) -> Result<Filter, FilterError> {
        Ok(Filter {
            nodes: fold_chain(&self.nodes)?,
        })
    }
}

fn fold_chain(nodes: &[FilterNode]) -> Result<Vec<FilterNode>, FilterError> {
    nodes
        .iter()
        .map(|node| {
            Ok(match node {
                FilterNode::Leaf { value, negated } => {
                    let value = super::fold_text(value);
                    check_len(value.len())?;
                    FilterNode::Leaf {
                        value,
                        negated: *negated,
                    }
                }
                FilterNode::Operator(op) => FilterNode::Operator(*op),
                FilterNode::Group { children, negated } => FilterNode::Group {
                    children: fold_chain(children)?,
                    negated: *negated,
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_operand_joins_with_operator() {
        let mut filter = Filter::new();
        filter.add_operand(BinaryOp::And, false, "a").unwrap();
        filter.add_operand(BinaryOp::Or, true, "b").unwrap();

        assert_eq!(
            filter.nodes(),
            &[
                FilterNode::leaf("a"),
                FilterNode::Operator(BinaryOp::Or),
                FilterNode::not_leaf("b"),
            ]
        );
    }

    #[test]
    fn test_add_group_to_empty_filter() {
        let mut children = Filter::new();
        children.add_operand(BinaryOp::Or, false, "x").unwrap();
        let mut filter = Filter::new();
        filter.add_group(BinaryOp::And, true, children);

        assert_eq!(
            filter.nodes(),
            &[FilterNode::Group {
                children: vec![FilterNode::leaf("x")],
                negated: true,
            }]
        );
    }

    #[test]
    fn test_case_folded_is_deep() {
        let mut inner = Filter::new();
        inner.add_operand(BinaryOp::Or, false, "HTTPS").unwrap();
        let mut filter = Filter::new();
        filter.add_operand(BinaryOp::And, true, "Straße").unwrap();
        filter.add_group(BinaryOp::And, false, inner);

        let folded = filter.case_folded().unwrap();

        assert_eq!(
            folded.nodes(),
            &[
                FilterNode::not_leaf("strasse"),
                FilterNode::Operator(BinaryOp::And),
                FilterNode::Group {
                    children: vec![FilterNode::leaf("https")],
                    negated: false,
                },
            ]
        );
        // source tree untouched
        assert_eq!(filter.nodes()[0], FilterNode::not_leaf("Straße"));
    }
}
