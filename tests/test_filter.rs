use connview::connection::{Column, ConnectionRecord, Protocol, TcpState};
use connview::filter::{
    BinaryOp, CaseSensitivity, Filter, FilterError, FilterNode, FilterState, MAX_FILTER_LEN,
    fold_text, is_filtered, parse, parse_no_operators, print_filter,
};

const CANDIDATES: [&str; 8] = [
    "",
    "a",
    "b c",
    "a b c",
    "   tcp   10.0.0.1   443   ESTABLISHED   ",
    "   udp   *   53      ",
    "x\"y",
    "OR ( ) !",
];

fn eval(filter: &Filter, text: &str) -> bool {
    is_filtered(filter, text, CaseSensitivity::Sensitive)
}

#[test]
fn test_print_parse_round_trip_evaluates_identically() {
    let filters = [
        "a",
        "a OR b c",
        "!(a OR b) c",
        r#""x""y" OR tcp"#,
        "(a (b OR !c)) OR udp",
        "((( a",
        "a )) OR OR b",
        r#"" 443 " ESTABLISHED"#,
        "!!(!a)",
        "a OR(b)",
    ];

    for text in filters {
        let tree = parse(text).expect("parse should succeed");
        let reparsed = parse(&print_filter(&tree)).expect("reparse should succeed");
        for candidate in CANDIDATES {
            assert_eq!(
                eval(&tree, candidate),
                eval(&reparsed, candidate),
                "filter {text:?} on {candidate:?}"
            );
        }
    }
}

#[test]
fn test_escaped_quote_is_one_literal() {
    let tree = parse(r#""a""b""#).expect("parse should succeed");
    assert_eq!(tree.nodes(), &[FilterNode::leaf("a\"b")]);
}

#[test]
fn test_unbalanced_open_is_flat() {
    let tree = parse("(a").expect("parse should succeed");
    assert_eq!(tree.nodes(), &[FilterNode::leaf("a")]);
}

#[test]
fn test_no_precedence() {
    let tree = parse("a OR b c").expect("parse should succeed");

    // (a OR b) AND c
    assert!(!eval(&tree, "a"));
    assert!(eval(&tree, "a c"));
    assert!(eval(&tree, "b c"));
    assert!(!eval(&tree, "c"));
}

#[test]
fn test_empty_tree_matches_every_text() {
    let tree = parse("").expect("parse should succeed");
    for candidate in CANDIDATES {
        assert!(eval(&tree, candidate));
    }
}

#[test]
fn test_unicode_case_folding() {
    let tree = parse("İ").expect("parse should succeed");
    let folded = tree.case_folded().expect("fold should succeed");

    // İ folds to i + combining dot, so a plain i does not match
    assert!(!eval(&folded, &fold_text("pid")));
    assert!(eval(&folded, &fold_text("i\u{307}")));
    assert!(eval(&folded, &fold_text("İ")));

    let tree = parse("ǅ").expect("parse should succeed");
    let folded = tree.case_folded().expect("fold should succeed");
    assert!(eval(&folded, &fold_text("Ǆ")));
    assert!(eval(&folded, &fold_text("ǆ")));
}

#[test]
fn test_literal_mode() {
    let tree = parse_no_operators("a OR b").expect("parse should succeed");
    assert!(eval(&tree, "a OR b"));
    assert!(!eval(&tree, "a"));
}

#[test]
fn test_programmatic_construction_prints_reparseable_text() {
    let mut ports = Filter::new();
    ports.add_operand(BinaryOp::Or, false, "443").expect("short literal");
    ports.add_operand(BinaryOp::Or, false, "80").expect("short literal");
    let mut filter = parse("tcp").expect("parse should succeed");
    filter.add_group(BinaryOp::And, false, ports);
    filter.add_operand(BinaryOp::And, true, "LISTEN").expect("short literal");

    let text = print_filter(&filter);
    assert_eq!(text, r#""tcp" ("443" OR "80") !"LISTEN""#);
    assert_eq!(parse(&text).expect("parse should succeed"), filter);
}

#[test]
fn test_filter_state_on_connection_rows() {
    let columns = Column::ALL;
    let https = ConnectionRecord::new(Protocol::Tcp, "10.0.0.1", 50000, "93.184.216.34", 443)
        .with_state(TcpState::Established)
        .with_process(4242, Some("Firefox"), None);
    let dns = ConnectionRecord::new(Protocol::Udp, "*", 53, "*", 0);

    let mut state = FilterState::new("firefox", true, false).expect("valid filter");
    assert!(!state.matches(&https.filter_text(&columns)));

    state.set_case_sensitive(false).expect("valid filter");
    assert!(state.matches(&https.filter_text(&columns)));
    assert!(!state.matches(&dns.filter_text(&columns)));

    state.set_text(r#"" 53 " OR " 443 ""#).expect("valid filter");
    state.set_operators(true).expect("valid filter");
    assert!(state.matches(&https.filter_text(&columns)));
    assert!(state.matches(&dns.filter_text(&columns)));

    state
        .add_column_values(&[https.column_text(Column::Protocol)], true)
        .expect("valid filter");
    assert!(!state.matches(&https.filter_text(&columns)));
    assert!(state.matches(&dns.filter_text(&columns)));
    assert_eq!(state.text(), r#"" 53 " OR " 443 " !"tcp""#);
}

#[test]
fn test_oversized_text_is_rejected() {
    let huge = "a".repeat(MAX_FILTER_LEN + 1);
    let too_long = FilterError::TooLong {
        len: MAX_FILTER_LEN + 1,
        max: MAX_FILTER_LEN,
    };

    assert_eq!(parse(&huge), Err(too_long.clone()));
    assert_eq!(parse_no_operators(&huge), Err(too_long.clone()));

    let mut filter = parse("tcp").expect("parse should succeed");
    let err = filter
        .add_operand(BinaryOp::And, false, huge)
        .expect_err("oversized literal should fail");
    assert_eq!(err, too_long);
    assert_eq!(filter.nodes(), &[FilterNode::leaf("tcp")]);
}
