use std::fmt;

use super::tree::{BinaryOp, Filter, FilterNode};

/// Canonical filter text for `filter`.
///
/// Every literal is quoted, so the output parses back to the same tree.
pub fn print_filter(filter: &Filter) -> String {
    filter.to_string()
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_chain(f, self.nodes())
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::And => write!(f, " "),
            BinaryOp::Or => write!(f, " OR "),
        }
    }
}

fn write_chain(f: &mut fmt::Formatter<'_>, nodes: &[FilterNode]) -> fmt::Result {
    for node in nodes {
        match node {
            FilterNode::Leaf { value, negated } => {
                if *negated {
                    write!(f, "!")?;
                }
                write!(f, "\"{}\"", value.replace('"', "\"\""))?;
            }
            FilterNode::Operator(op) => write!(f, "{op}")?,
            FilterNode::Group { children, negated } => {
                if *negated {
                    write!(f, "!")?;
                }
                write!(f, "(")?;
                write_chain(f, children)?;
                write!(f, ")")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse;

    #[test]
    fn test_print_canonical_form() {
        let filter = parse(r#"a OR !b (c !(d e)) "x""y""#).unwrap();
        assert_eq!(
            print_filter(&filter),
            r#""a" OR !"b" ("c" !("d" "e")) "x""y""#
        );
    }

    #[test]
    fn test_print_empty() {
        assert_eq!(print_filter(&Filter::new()), "");
        assert_eq!(print_filter(&parse("()").unwrap()), "()");
    }

    #[test]
    fn test_round_trip_preserves_tree() {
        let corpus = [
            "a b c",
            "a OR b c",
            "!(a OR b) !c",
            r#""with space" OR "quote "" inside""#,
            "((a)) OR (b (c OR !d))",
            "OR ( broken ) \"unterminated",
            r#"""#,
            "tcp6 OR udp6 !LISTEN",
            "a(b)c!d",
            "żółw OR Straße",
        ];
        for text in corpus {
            let tree = parse(text).unwrap();
            let printed = print_filter(&tree);
            assert_eq!(parse(&printed).unwrap(), tree, "round trip of {text:?} via {printed:?}");
        }
    }

    #[test]
    fn test_round_trip_of_built_tree() {
        let mut values = Filter::new();
        values.add_operand(BinaryOp::Or, false, "OR").unwrap();
        values.add_operand(BinaryOp::Or, false, "(a)").unwrap();
        values.add_operand(BinaryOp::Or, false, "").unwrap();
        let mut filter = parse("tcp").unwrap();
        filter.add_group(BinaryOp::And, true, values);

        let printed = print_filter(&filter);
        assert_eq!(printed, r#""tcp" !("OR" OR "(a)" OR "")"#);
        assert_eq!(parse(&printed).unwrap(), filter);
    }
}
