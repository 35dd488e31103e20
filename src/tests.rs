use super::*;

mod engine;
mod matching;
mod page;
mod parser;
mod style_block;
mod stylesheet;
mod tokenizer;

fn ids_of(page: &Page, nodes: &[NodeId]) -> Vec<String> {
    nodes
        .iter()
        .map(|node| page.attribute(*node, "id").unwrap_or_default())
        .collect()
}

/// Ids of the elements `selector` selects, in selection order.
fn select_ids(page: &Page, selector: &str) -> Result<Vec<String>> {
    let ast = parse(selector)?;
    let nodes = select_elements_by_ast(page, &ast)?;
    Ok(ids_of(page, &nodes))
}

fn regular(value: &str) -> AstNode {
    AstNode {
        kind: NodeKind::RegularSelector {
            value: value.to_string(),
        },
        children: Vec::new(),
    }
}

fn absolute(name: PseudoClass, value: &str) -> AstNode {
    AstNode {
        kind: NodeKind::ExtendedSelector,
        children: vec![AstNode {
            kind: NodeKind::AbsolutePseudoClass {
                name,
                value: value.to_string(),
            },
            children: Vec::new(),
        }],
    }
}

fn relative(name: PseudoClass, list: AstNode) -> AstNode {
    AstNode {
        kind: NodeKind::ExtendedSelector,
        children: vec![AstNode {
            kind: NodeKind::RelativePseudoClass { name },
            children: vec![list],
        }],
    }
}

fn selector(children: Vec<AstNode>) -> AstNode {
    AstNode {
        kind: NodeKind::Selector,
        children,
    }
}

fn selector_list(selectors: Vec<AstNode>) -> AstNode {
    AstNode {
        kind: NodeKind::SelectorList,
        children: selectors,
    }
}

fn expect_selector_error(selector: &str, expected: &str) {
    match parse(selector) {
        Err(Error::SelectorParse(msg)) => {
            assert!(msg.contains(expected), "{selector}: {msg}")
        }
        other => panic!("{selector}: unexpected result {other:?}"),
    }
}
