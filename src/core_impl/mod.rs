use super::*;

mod ast;
mod dom;
mod engine;
mod host;
mod html;
mod matching;
mod parser;
mod stylesheet;
mod tokenizer;
mod xpath;

pub use ast::{AstNode, NodeKind, PseudoClass};
pub use dom::{NodeId, Page};
pub use engine::{
    AffectedElement, BeforeStyleApplied, Configuration, ExtendedCss, RuleTimings, StyleTarget,
    TimingStats, Validation,
};
pub use host::{
    ElementAttribute, HostDocument, InputEvent, MutationKind, MutationRecord, TextContentGetter,
};
pub use matching::select_elements_by_ast;
pub use parser::parse;
pub use stylesheet::{
    DebugMode, RemoveSelector, Rule, Style, StyleDeclaration, parse_remove_selector, parse_rule,
    parse_rules, parse_style_block, parse_stylesheet,
};

#[cfg(test)]
pub(crate) fn tokenize_selector(selector: &str) -> Result<Vec<tokenizer::Token>> {
    tokenizer::tokenize_selector(selector)
}
