//! Source wrapper
//!
//! Instruments user source with a two-line prelude: a strict-mode
//! pragma and a `debugger;` marker whose break arms single-stepping.
//! Every runtime-reported line number is later shifted back by
//! [`PRELUDE_LINES`]; any change to the prelude must update that
//! constant.

/// Number of lines the prelude adds in front of the user source.
pub const PRELUDE_LINES: usize = 2;

/// Instrumented source plus the trimmed user text it was built from.
#[derive(Debug, Clone)]
pub struct WrappedSource {
    /// The text handed to the parser/runtime
    pub text: String,
    /// User source with trailing whitespace trimmed (what the trace
    /// blob reports as `code`)
    pub user_source: String,
}

/// Wrap user source for tracing.
pub fn wrap_source(user_source: &str) -> WrappedSource {
    let trimmed = user_source.trim_end();
    WrappedSource {
        text: format!("'use strict';\ndebugger;\n{}", trimmed),
        user_source: trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prelude_is_exactly_two_lines() {
        let wrapped = wrap_source("var x = 1;");
        let prelude: Vec<&str> = wrapped.text.lines().take(PRELUDE_LINES).collect();
        assert_eq!(prelude, vec!["'use strict';", "debugger;"]);
        assert_eq!(wrapped.text.lines().nth(PRELUDE_LINES), Some("var x = 1;"));
    }

    #[test]
    fn trailing_whitespace_is_trimmed() {
        let wrapped = wrap_source("var x = 1;\n\n  \n");
        assert_eq!(wrapped.user_source, "var x = 1;");
    }
}
