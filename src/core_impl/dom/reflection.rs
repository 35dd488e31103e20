use super::*;

use serde_json::{Map, Value, json};

fn css_name_to_js_prop(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

impl Page {
    /// Builds the object `:matches-property()` walks: a handful of reflected
    /// element properties overlaid with page-assigned expando values.
    pub(crate) fn reflect_element(&self, node: NodeId) -> Value {
        let Some(element) = self.dom.element(node) else {
            return Value::Null;
        };

        let mut dataset = Map::new();
        for (name, value) in &element.attrs {
            if let Some(key) = name.strip_prefix("data-") {
                dataset.insert(css_name_to_js_prop(key), Value::String(value.clone()));
            }
        }

        let declarations = parse_style_declarations(element.attr("style"));
        let mut style = Map::new();
        for (name, value) in &declarations {
            style.insert(css_name_to_js_prop(name), Value::String(value.clone()));
        }
        style.insert(
            "cssText".into(),
            Value::String(serialize_style_declarations(&declarations)),
        );

        let tag_upper = element.tag_name.to_ascii_uppercase();
        let mut reflected = json!({
            "tagName": tag_upper,
            "nodeName": tag_upper,
            "localName": element.tag_name,
            "id": element.attr("id").unwrap_or_default(),
            "className": element.attr("class").unwrap_or_default(),
            "textContent": self.visible_text_content(node),
            "childElementCount": self.dom.child_elements(node).len(),
            "attributes": { "length": element.attrs.len() },
            "dataset": dataset,
            "style": style,
        });

        if let (Value::Object(target), Some(expandos)) =
            (&mut reflected, self.properties.get(&node))
        {
            for (key, value) in expandos {
                target.insert(key.clone(), value.clone());
            }
        }
        reflected
    }
}
