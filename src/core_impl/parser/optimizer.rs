use super::*;

/// Root used for `:is()`/`:not()` that stay extended after a bare `*`,
/// since matching them needs a parent element and `html` has none.
const IS_OR_NOT_SELECTING_ROOT: &str = "html *";

/// Folds `:is()`/`:not()` whose arguments are plain CSS back into the preceding
/// regular selector so the native engine evaluates them.
pub(super) fn optimize_ast(ast: AstNode) -> Result<AstNode> {
    optimize_selector_list(ast)
}

fn optimize_selector_list(mut list: AstNode) -> Result<AstNode> {
    let selectors = std::mem::take(&mut list.children);
    let mut optimized = Vec::with_capacity(selectors.len());
    for selector in selectors {
        optimized.push(optimize_selector(selector)?);
    }
    list.children = optimized;
    Ok(list)
}

fn optimize_selector(mut selector: AstNode) -> Result<AstNode> {
    let raw_children = std::mem::take(&mut selector.children);
    let mut optimized: Vec<AstNode> = Vec::with_capacity(raw_children.len());

    for (index, child) in raw_children.into_iter().enumerate() {
        if index == 0 {
            optimized.push(child);
            continue;
        }

        if child.is_extended() {
            let mut current = Some(child);
            while current
                .as_ref()
                .is_some_and(should_optimize_extended_selector)
            {
                let Some(extended) = current.take() else {
                    break;
                };
                let previous = last_regular(&mut optimized)?;
                current = optimized_extended_selector(extended, previous)?;
            }

            if let Some(extended) = current {
                let name = extended
                    .children
                    .first()
                    .and_then(AstNode::pseudo_class);
                let previous = last_regular(&mut optimized)?;
                if previous.required_value()? == "*" && name.is_some_and(PseudoClass::is_optimizable)
                {
                    if let Some(value) = previous.value_mut() {
                        *value = IS_OR_NOT_SELECTING_ROOT.to_string();
                    }
                }
                optimized.push(extended);
            }
        } else if child.is_regular() {
            if optimized.last().is_some_and(AstNode::is_regular) {
                let previous = last_regular(&mut optimized)?;
                let merged = format!("{} {}", previous.required_value()?, child.required_value()?);
                if let Some(value) = previous.value_mut() {
                    *value = merged;
                }
            } else {
                optimized.push(child);
            }
        }
    }

    selector.children = optimized;
    Ok(selector)
}

fn last_regular(children: &mut [AstNode]) -> Result<&mut AstNode> {
    children
        .iter_mut()
        .rev()
        .find(|child| child.is_regular())
        .ok_or_else(|| Error::SelectorParse("No RegularSelector node found".into()))
}

fn relative_selector_list(extended: &AstNode) -> Option<&AstNode> {
    let pseudo = extended.children.first()?;
    if !matches!(pseudo.kind, NodeKind::RelativePseudoClass { .. }) {
        return None;
    }
    pseudo.children.first()
}

fn has_extended_selector(list: &AstNode) -> bool {
    list.children
        .iter()
        .any(|selector| selector.children.iter().any(AstNode::is_extended))
}

fn should_optimize_extended_selector(extended: &AstNode) -> bool {
    stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
        let Some(name) = extended.children.first().and_then(AstNode::pseudo_class) else {
            return false;
        };
        if name.is_absolute() {
            return false;
        }
        let Some(list) = relative_selector_list(extended) else {
            return false;
        };

        if name.is_optimizable() {
            let all_regular = list.children.iter().all(|selector| {
                selector.children.len() == 1 && selector.children[0].is_regular()
            });
            if all_regular {
                return true;
            }
        }

        list.children.iter().any(|selector| {
            selector
                .children
                .iter()
                .any(|child| child.is_extended() && should_optimize_extended_selector(child))
        })
    })
}

/// Returns `None` when the extended selector was folded into `previous`.
fn optimized_extended_selector(
    mut extended: AstNode,
    previous: &mut AstNode,
) -> Result<Option<AstNode>> {
    let list = relative_selector_list(&extended)
        .ok_or_else(|| Error::SelectorParse("Relative pseudo-class should have a SelectorList".into()))?;

    if !has_extended_selector(list) {
        let name = extended
            .children
            .first()
            .and_then(AstNode::pseudo_class)
            .ok_or_else(|| Error::SelectorParse("Extended selector should have a pseudo-class".into()))?;
        let folded = format!(
            "{}:{}({})",
            previous.required_value()?,
            name.name(),
            list.regular_list_to_string()?
        );
        if let Some(value) = previous.value_mut() {
            *value = folded;
        }
        return Ok(None);
    }

    let pseudo = extended
        .children
        .first_mut()
        .ok_or_else(|| Error::SelectorParse("Extended selector should have a pseudo-class".into()))?;
    let list = std::mem::take(&mut pseudo.children);
    let mut optimized_lists = Vec::with_capacity(list.len());
    for inner in list {
        optimized_lists.push(stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            optimize_selector_list(inner)
        })?);
    }
    pseudo.children = optimized_lists;
    Ok(Some(extended))
}
