use super::*;

use serde_json::json;

fn node(page: &Page, id: &str) -> Result<NodeId> {
    page.element_by_id(id)
        .ok_or_else(|| Error::Runtime(format!("missing #{id}")))
}

#[test]
fn from_html_builds_queryable_tree() -> Result<()> {
    let page = Page::from_html(
        r#"<div id="a" class="x"><p id="b">one</p><p id="c" class="x">two</p></div>"#,
    )?;
    assert!(page.body().is_some());
    assert_eq!(ids_of(&page, &page.query_selector_all(".x")?), vec!["a", "c"]);
    assert_eq!(page.query_selector("div > p")?, Some(node(&page, "b")?));
    assert_eq!(page.query_selector("table")?, None);
    assert_eq!(page.tag_name(node(&page, "c")?), Some("p"));
    assert_eq!(page.parent(node(&page, "b")?), Some(node(&page, "a")?));
    Ok(())
}

#[test]
fn scope_binds_to_query_root() -> Result<()> {
    let page = Page::from_html(r#"<div id="a"><p id="b"><span id="c"></span></p></div>"#)?;
    let a = node(&page, "a")?;
    let direct = HostDocument::query_selector_all(&page, a, ":scope > p")?;
    assert_eq!(ids_of(&page, &direct), vec!["b"]);
    let nested = HostDocument::query_selector_all(&page, a, ":scope > span")?;
    assert!(nested.is_empty());
    Ok(())
}

#[test]
fn invalid_native_selector_is_rejected() -> Result<()> {
    let page = Page::from_html("<div></div>")?;
    assert!(page.query_selector_all("div:unknown").is_err());
    assert!(page.query_selector_all("div::before").is_err());
    assert!(page.query_selector_all("a[href").is_err());
    Ok(())
}

#[test]
fn page_script_changes_are_recorded() -> Result<()> {
    let mut page = Page::from_html(r#"<div id="root"></div>"#)?;
    let root = node(&page, "root")?;

    let created = page.append_html(root, r#"<span id="s">hi</span>"#)?;
    assert_eq!(created.len(), 1);
    let span = node(&page, "s")?;
    page.set_attribute(span, "Class", "ad")?;
    page.remove_attribute(span, "missing")?;
    page.set_text_content(span, "bye")?;

    assert_eq!(
        page.pending_mutations(),
        &[
            MutationRecord::child_list(root),
            MutationRecord::attribute(span, "class"),
            MutationRecord::child_list(span),
        ]
    );
    assert_eq!(page.take_mutations().len(), 3);
    assert!(page.pending_mutations().is_empty());

    page.remove_node(span)?;
    assert!(!page.is_connected(span));
    assert_eq!(page.take_mutations(), vec![MutationRecord::child_list(root)]);
    assert!(page.remove_node(page.document()).is_err());
    Ok(())
}

#[test]
fn moving_a_node_records_both_parents() -> Result<()> {
    let mut page = Page::from_html(r#"<div id="a"><i id="i"></i></div><div id="b"><b id="r"></b></div>"#)?;
    let (a, b, i, r) = (
        node(&page, "a")?,
        node(&page, "b")?,
        node(&page, "i")?,
        node(&page, "r")?,
    );
    page.insert_before(b, i, r)?;
    assert_eq!(
        page.take_mutations(),
        vec![MutationRecord::child_list(a), MutationRecord::child_list(b)]
    );
    assert_eq!(page.parent(i), Some(b));

    let fresh = page.create_element("em");
    assert!(!page.is_connected(fresh));
    page.append_child(a, fresh)?;
    assert!(page.is_connected(fresh));
    Ok(())
}

#[test]
fn computed_style_layers_inline_rules_and_defaults() -> Result<()> {
    let mut page = Page::from_html(r#"<div id="d" style="color: red !important"></div><span id="s"></span>"#)?;
    let d = node(&page, "d")?;
    let s = node(&page, "s")?;
    page.add_style_rule("div", None, "color: blue; opacity: 0.5")?;
    page.add_style_rule("#d", Some("::after"), "content: 'x'")?;

    assert_eq!(page.computed_style(d, None, "color"), "red");
    assert_eq!(page.computed_style(d, None, "opacity"), "0.5");
    assert_eq!(page.computed_style(d, None, "display"), "block");
    assert_eq!(page.computed_style(s, None, "display"), "inline");
    assert_eq!(page.computed_style(s, None, "visibility"), "visible");
    assert_eq!(page.computed_style(d, Some(":after"), "content"), "'x'");
    assert_eq!(page.computed_style(d, Some("before"), "content"), "");
    Ok(())
}

#[test]
fn style_properties_are_written_inline() -> Result<()> {
    let mut page = Page::from_html(r#"<div id="d" style="color: red"></div>"#)?;
    let d = node(&page, "d")?;
    assert!(page.supports_style_property(d, "display"));
    assert!(page.supports_style_property(d, "--custom"));
    assert!(!page.supports_style_property(d, "Display"));

    page.set_style_property(d, "display", "none", true);
    assert_eq!(page.inline_style(d), "color: red; display: none !important;");
    assert_eq!(page.inline_style_property(d, "display").as_deref(), Some("none"));
    assert_eq!(
        page.take_mutations(),
        vec![MutationRecord::attribute(d, "style")]
    );
    Ok(())
}

#[test]
fn xpath_evaluates_from_context_node() -> Result<()> {
    let page = Page::from_html(r#"<div id="a"><p id="b" data-x="1"></p></div><p id="c"></p>"#)?;
    let a = node(&page, "a")?;
    let found = page.evaluate_xpath(page.document(), "//p")?;
    assert_eq!(ids_of(&page, &found), vec!["b", "c"]);
    let found = page.evaluate_xpath(a, "./p[@data-x]")?;
    assert_eq!(ids_of(&page, &found), vec!["b"]);
    assert!(page.validate_xpath("//p[").is_err());
    assert!(page.validate_xpath("//p[@id='c']").is_ok());
    Ok(())
}

#[test]
fn text_override_hides_from_page_but_not_native_getter() -> Result<()> {
    let mut page = Page::from_html(r#"<div id="a">Sponsored <b>ad</b></div>"#)?;
    let a = node(&page, "a")?;
    let native = page.native_text_content_getter();
    assert_eq!(page.text_content(a), "Sponsored ad");

    page.override_text_content(a, "");
    assert_eq!(page.text_content(a), "");
    assert_eq!(native(&page, a), "Sponsored ad");
    assert!(page.pending_mutations().is_empty());
    Ok(())
}

#[test]
fn element_reflection_exposes_dataset_and_expandos() -> Result<()> {
    let mut page = Page::from_html(
        r#"<div id="a" class="x y" data-ad-slot="top" style="margin-top: 1px">t</div>"#,
    )?;
    let a = node(&page, "a")?;
    page.set_property(a, "adConfig", json!({ "id": 1 }))?;

    let props = page.element_properties(a);
    assert_eq!(props["tagName"], "DIV");
    assert_eq!(props["className"], "x y");
    assert_eq!(props["textContent"], "t");
    assert_eq!(props["dataset"]["adSlot"], "top");
    assert_eq!(props["style"]["marginTop"], "1px");
    assert_eq!(props["adConfig"]["id"], 1);
    assert!(page.set_property(page.document(), "x", json!(1)).is_err());
    Ok(())
}

#[test]
fn input_events_and_clock_are_deterministic() -> Result<()> {
    let mut page = Page::from_html("<div></div>")?;
    assert_eq!(page.now(), 0);
    assert!(page.is_ready());
    page.advance_time(40);
    page.dispatch_input_event("mousemove");
    page.advance_time(5);
    assert_eq!(page.now_ms(), 45);
    assert_eq!(
        page.last_input_event(),
        Some(InputEvent {
            event_type: "mousemove".into(),
            time_ms: 40,
        })
    );
    page.set_ready(false);
    assert!(!page.is_ready());
    Ok(())
}
