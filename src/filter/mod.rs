//! Connection filter expressions
//!
//! A small boolean text-filter language, edited live in the viewer and
//! therefore never rejected: whatever cannot be placed is ignored.
//!
//! # Syntax
//!
//! ```text
//! word                 Row text contains "word"
//! "two words"          Quoted literal; "" inside quotes is a literal quote
//! a b                  Both (implicit AND)
//! a OR b               Either (case-insensitive, whole word)
//! !a                   Does not contain "a"
//! (a OR b) !(c d)      Groups, optionally negated
//! ```
//!
//! Operators combine strictly left to right: `a OR b c` is `(a OR b) AND c`.
//!
//! # Examples
//!
//! ```text
//! tcp ESTABLISHED                      Established TCP rows
//! firefox OR chrome                    Rows of either browser
//! !LISTEN !"127.0.0.1"                 Hide listeners and loopback
//! (" 443 " OR " 80 ") !192.168.       Web ports, excluding the LAN
//! ```

pub mod error;
pub mod lexer;
pub mod matcher;
pub mod parser;
pub mod printer;
pub mod state;
pub mod tree;

pub use error::FilterError;
pub use lexer::{CharClass, format_mask, pre_parse};
pub use matcher::{CaseSensitivity, fold_text, is_filtered};
pub use parser::{parse, parse_no_operators, parse_with_mask};
pub use printer::print_filter;
pub use state::FilterState;
pub use tree::{BinaryOp, Filter, FilterNode};

/// Hard ceiling on filter text and on any literal built from it
pub const MAX_FILTER_LEN: usize = 100_100_100;

pub(crate) fn check_len(len: usize) -> Result<(), FilterError> {
    if len > MAX_FILTER_LEN {
        Err(FilterError::TooLong {
            len,
            max: MAX_FILTER_LEN,
        })
    } else {
        Ok(())
    }
}
