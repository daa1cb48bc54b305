use log::debug;

use super::lexer::CharClass;
use super::matcher::{CaseSensitivity, fold_text, is_filtered};
use super::parser::{parse_no_operators, parse_with_mask};
use super::printer::print_filter;
use super::tree::{BinaryOp, Filter};
use super::FilterError;

/// The live filter of a view: its text, mode switches and parsed trees.
///
/// Every setter re-parses, so `filter()` always reflects the current text.
#[derive(Debug, Clone)]
pub struct FilterState {
    text: String,
    enabled: bool,
    case_sensitive: bool,
    operators: bool,
    tree: Filter,
    folded: Option<Filter>,
    mask: Vec<CharClass>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            text: String::new(),
            enabled: false,
            case_sensitive: true,
            operators: false,
            tree: Filter::new(),
            folded: None,
            mask: Vec::new(),
        }
    }
}

impl FilterState {
    /// An enabled filter over `text`
    pub fn new(text: &str, case_sensitive: bool, operators: bool) -> Result<Self, FilterError> {
        let mut state = Self {
            text: text.to_string(),
            enabled: true,
            case_sensitive,
            operators,
            ..Self::default()
        };
        state.rebuild()?;
        Ok(state)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn filter(&self) -> &Filter {
        &self.tree
    }

    /// Lexer classification of the text; empty in literal mode
    pub fn mask(&self) -> &[CharClass] {
        &self.mask
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn uses_operators(&self) -> bool {
        self.operators
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_text(&mut self, text: &str) -> Result<(), FilterError> {
        self.text = text.to_string();
        self.rebuild()
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) -> Result<(), FilterError> {
        self.case_sensitive = case_sensitive;
        self.rebuild()
    }

    pub fn set_operators(&mut self, operators: bool) -> Result<(), FilterError> {
        self.operators = operators;
        self.rebuild()
    }

    /// Whether `candidate` passes. A disabled filter passes everything.
    pub fn matches(&self, candidate: &str) -> bool {
        if !self.enabled {
            return true;
        }
        match &self.folded {
            Some(folded) => is_filtered(folded, &fold_text(candidate), CaseSensitivity::Sensitive),
            None => is_filtered(&self.tree, candidate, CaseSensitivity::Sensitive),
        }
    }

    /// Narrow the filter to (or, with `negate`, exclude) rows holding any of
    /// `values`, typically the cells of one column across selected rows.
    ///
    /// Empty values are skipped and duplicates collapse to their last
    /// occurrence. One value is ANDed on as a leaf, several as a group of
    /// ORed leaves. Enables the filter in operator mode and rewrites the
    /// text from the tree.
    pub fn add_column_values<S: AsRef<str>>(
        &mut self,
        values: &[S],
        negate: bool,
    ) -> Result<(), FilterError> {
        let distinct: Vec<&str> = values
            .iter()
            .enumerate()
            .map(|(i, v)| (i, v.as_ref()))
            .filter(|(i, v)| !v.is_empty() && !values[i + 1..].iter().any(|later| later.as_ref() == *v))
            .map(|(_, v)| v)
            .collect();

        match distinct.as_slice() {
            [] => {}
            [single] => {
                self.tree.add_operand(BinaryOp::And, negate, *single)?;
            }
            several => {
                let mut group = Filter::new();
                for value in several {
                    group.add_operand(BinaryOp::Or, false, *value)?;
                }
                self.tree.add_group(BinaryOp::And, negate, group);
            }
        }

        self.enabled = true;
        self.operators = true;
        let text = print_filter(&self.tree);
        self.set_text(&text)
    }

    fn rebuild(&mut self) -> Result<(), FilterError> {
        if self.operators {
            let (tree, mask) = parse_with_mask(&self.text)?;
            self.tree = tree;
            self.mask = mask;
        } else {
            self.tree = parse_no_operators(&self.text)?;
            self.mask.clear();
        }
        self.folded = if self.case_sensitive {
            None
        } else {
            Some(self.tree.case_folded()?)
        };
        debug!(
            "Filter rebuilt: {:?} (operators: {}, case sensitive: {})",
            self.text, self.operators, self.case_sensitive
        );
        Ok(())
    }
}
