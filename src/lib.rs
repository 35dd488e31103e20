//! Extended CSS selector engine.
//!
//! Parses selectors that mix standard CSS with extended pseudo-classes
//! (`:contains()`, `:has()`, `:matches-css()`, `:xpath()`, `:upward()` and friends),
//! evaluates them against any document implementing [`HostDocument`], and applies
//! style or removal rules that stay in place while the page keeps mutating.
//!
//! [`Page`] is an in-memory document shipped with the crate; it is what the tests
//! run against and what embedders can use to try rules without a browser.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

mod core_impl;
mod js_regex;
mod selector;

pub use core_impl::{
    AffectedElement, AstNode, BeforeStyleApplied, Configuration, DebugMode, ElementAttribute,
    ExtendedCss, HostDocument, InputEvent, MutationKind, MutationRecord, NodeId, NodeKind, Page,
    PseudoClass, RemoveSelector, Rule, RuleTimings, Style, StyleDeclaration, StyleTarget,
    TextContentGetter, TimingStats, Validation, parse, parse_remove_selector, parse_rule,
    parse_rules, parse_style_block, parse_stylesheet, select_elements_by_ast,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Extended selector text could not be parsed into an AST.
    #[error("{0}")]
    SelectorParse(String),
    /// Stylesheet, rule or style block could not be parsed.
    #[error("{0}")]
    StyleParse(String),
    /// Selection failed while evaluating an AST against a document.
    #[error("{0}")]
    Matching(String),
    /// Engine configuration or hook contract violation.
    #[error("{0}")]
    Configuration(String),
    /// Plain CSS rejected by the document's native selector engine.
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("xpath error: {0}")]
    XPath(String),
    #[error("html parse error: {0}")]
    HtmlParse(String),
    /// Invalid operation on the in-memory page.
    #[error("runtime error: {0}")]
    Runtime(String),
}

#[cfg(test)]
mod tests;
