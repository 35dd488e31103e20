use super::*;
use crate::core_impl::stylesheet::CONTENT_PROPERTY;

/// Cap on style restorations per element and on removals per element path.
pub(crate) const MAX_STYLE_PROTECTION_COUNT: usize = 50;

const CONTENT_PASSTHROUGH_PREFIXES: [&str; 2] = ["\"adguard", "'adguard"];

/// Element currently styled or removed by the engine.
#[derive(Debug, Clone)]
pub struct AffectedElement<N> {
    pub node: N,
    pub rules: Vec<Rule>,
    /// Inline style text the element had before the engine touched it.
    pub original_style: String,
    pub removed: bool,
    pub(crate) protection: Option<ProtectionObserver>,
}

impl<N> AffectedElement<N> {
    pub(crate) fn new(node: N, rule: Rule, original_style: String) -> Self {
        Self {
            node,
            rules: vec![rule],
            original_style,
            removed: false,
            protection: None,
        }
    }

    /// Identity of the style protection observer; stable across apply passes.
    pub fn protection_observer_id(&self) -> Option<u64> {
        self.protection.as_ref().map(|observer| observer.id)
    }

    /// Whether external style changes are still being reverted.
    pub fn is_protected(&self) -> bool {
        self.protection
            .as_ref()
            .is_some_and(|observer| observer.connected)
    }

    /// Number of times the protection observer restored the styles.
    pub fn protection_count(&self) -> usize {
        self.protection
            .as_ref()
            .map_or(0, |observer| observer.protection_count)
    }
}

/// Watches one element's `style` attribute and puts the rule styles back.
#[derive(Debug, Clone)]
pub(crate) struct ProtectionObserver {
    pub(crate) id: u64,
    pub(crate) styles: Vec<Style>,
    pub(crate) protection_count: usize,
    pub(crate) connected: bool,
}

impl ProtectionObserver {
    pub(crate) fn new(id: u64, rules: &[Rule]) -> Self {
        Self {
            id,
            styles: rules.iter().filter_map(|rule| rule.style.clone()).collect(),
            protection_count: 0,
            connected: true,
        }
    }

    /// Restores the styles after an external change, then reconnects unless
    /// the restoration cap was reached.
    pub(crate) fn protect<D: HostDocument>(&mut self, doc: &mut D, node: D::Node) {
        if !self.connected {
            return;
        }
        self.protection_count += 1;
        self.connected = false;
        for style in &self.styles {
            set_style_to_element(doc, node, style);
        }
        if self.protection_count < MAX_STYLE_PROTECTION_COUNT {
            self.connected = true;
        } else {
            log::error!("ExtendedCss: infinite loop protection for style");
        }
    }

    pub(crate) fn disconnect(&mut self) {
        self.connected = false;
    }
}

/// Applies every declaration of `style` with `!important` priority.
///
/// Unsupported properties and passthrough `content` markers are skipped.
pub(crate) fn set_style_to_element<D: HostDocument>(doc: &mut D, node: D::Node, style: &Style) {
    if !doc.is_element(node) {
        return;
    }
    for (property, value) in style.iter() {
        if !doc.supports_style_property(node, property) || value.is_empty() {
            continue;
        }
        if property == CONTENT_PROPERTY
            && CONTENT_PASSTHROUGH_PREFIXES
                .iter()
                .any(|prefix| value.len() > prefix.len() && value.starts_with(prefix))
        {
            continue;
        }
        let trimmed = value.trim();
        let value = trimmed.strip_suffix("!important").unwrap_or(trimmed).trim();
        doc.set_style_property(node, property, value, true);
    }
}

pub(crate) fn revert_style<D: HostDocument>(doc: &mut D, affected: &mut AffectedElement<D::Node>) {
    if let Some(observer) = affected.protection.as_mut() {
        observer.disconnect();
    }
    doc.set_style_text(affected.node, &affected.original_style);
}

/// `tag#id > tag:nth-of-type(n)` path of `node`, used to count removals of
/// elements the page keeps re-inserting.
pub(crate) fn element_selector_path<D: HostDocument>(doc: &D, node: D::Node) -> String {
    let mut path = Vec::new();
    let mut current = Some(node);
    while let Some(element) = current.filter(|element| doc.is_element(*element)) {
        let tag = doc.tag_name(element);
        let id = doc
            .attributes(element)
            .into_iter()
            .find(|attribute| attribute.name == "id")
            .map(|attribute| attribute.value)
            .filter(|id| !id.is_empty());
        if let Some(id) = id {
            path.push(format!("{tag}#{id}"));
            break;
        }

        let mut nth = 1;
        let mut sibling = doc.previous_element_sibling(element);
        while let Some(previous) = sibling {
            if doc.tag_name(previous) == tag {
                nth += 1;
            }
            sibling = doc.previous_element_sibling(previous);
        }
        if nth == 1 {
            path.push(tag);
        } else {
            path.push(format!("{tag}:nth-of-type({nth})"));
        }
        current = doc.parent_element(element);
    }
    path.reverse();
    path.join(" > ")
}
