use super::*;

use std::cell::Cell;
use std::rc::Rc;

fn element(page: &Page, id: &str) -> Result<NodeId> {
    page.element_by_id(id)
        .ok_or_else(|| Error::Runtime(format!("missing #{id}")))
}

fn engine(html: &str, style_sheet: &str) -> Result<ExtendedCss<Page>> {
    let page = Page::from_html(html)?;
    ExtendedCss::new(page, Configuration::new().style_sheet(style_sheet))
}

#[test]
fn apply_removes_and_styles_matched_elements() -> Result<()> {
    let mut css = engine(
        r#"<div id="ad">ad</div><div id="b" class="banner">x</div><div id="keep">x</div>"#,
        "#ad:contains(ad) { remove: true; } .banner { display: none !important; }",
    )?;
    let ad = element(css.document(), "ad")?;
    let banner = element(css.document(), "b")?;
    let keep = element(css.document(), "keep")?;

    css.apply()?;

    assert!(!css.document().is_connected(ad));
    assert_eq!(
        css.document().inline_style_property(banner, "display").as_deref(),
        Some("none")
    );
    assert_eq!(css.document().inline_style(keep), "");
    assert_eq!(css.affected_elements().len(), 2);
    Ok(())
}

#[test]
fn css_rules_are_merged_with_stylesheet() -> Result<()> {
    let page = Page::from_html(r#"<p id="p" class="x">text</p>"#)?;
    let p = element(&page, "p")?;
    let mut css = ExtendedCss::new(
        page,
        Configuration::new()
            .style_sheet(".x { color: red }")
            .css_rules(["p:contains(text) { visibility: hidden }", "{ broken"]),
    )?;
    css.apply()?;
    assert_eq!(
        css.document().inline_style_property(p, "color").as_deref(),
        Some("red")
    );
    assert_eq!(
        css.document().inline_style_property(p, "visibility").as_deref(),
        Some("hidden")
    );
    Ok(())
}

#[test]
fn configuration_needs_rules() -> Result<()> {
    let page = Page::from_html("<p></p>")?;
    match ExtendedCss::new(page, Configuration::new()) {
        Err(Error::Configuration(msg)) => {
            assert!(msg.contains("should have 'styleSheet' or 'cssRules' defined"), "{msg}")
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let page = Page::from_html("<p></p>")?;
    match ExtendedCss::new(page, Configuration::new().style_sheet("p { color }")) {
        Err(Error::Configuration(msg)) => assert!(
            msg.starts_with("Pass the rules as configuration.cssRules"),
            "{msg}"
        ),
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[test]
fn mutations_schedule_throttled_passes() -> Result<()> {
    let mut css = engine(
        r#"<div id="root"></div>"#,
        ".banner { display: none }",
    )?;
    let root = element(css.document(), "root")?;
    css.apply()?;
    assert_eq!(css.pending_pass_at(), None);

    let first = css.document_mut().append_html(root, r#"<div class="banner"></div>"#)?[0];
    assert_eq!(css.pump()?, 1);
    assert_eq!(
        css.document().inline_style_property(first, "display").as_deref(),
        Some("none")
    );

    css.document_mut().advance_time(50);
    let second = css.document_mut().append_html(root, r#"<div class="banner"></div>"#)?[0];
    assert_eq!(css.pump()?, 0);
    assert_eq!(css.pending_pass_at(), Some(150));
    assert_eq!(css.document().inline_style(second), "");

    css.document_mut().advance_time(99);
    assert_eq!(css.pump()?, 0);
    css.document_mut().advance_time(1);
    assert_eq!(css.pump()?, 1);
    assert_eq!(css.pending_pass_at(), None);
    assert_eq!(
        css.document().inline_style_property(second, "display").as_deref(),
        Some("none")
    );
    Ok(())
}

#[test]
fn pending_pass_absorbs_further_mutations() -> Result<()> {
    let mut css = engine(r#"<div id="root"></div>"#, ".banner { display: none }")?;
    let root = element(css.document(), "root")?;
    css.apply()?;

    css.document_mut().append_html(root, "<i></i>")?;
    assert_eq!(css.pump()?, 1);

    css.document_mut().advance_time(10);
    css.document_mut().append_html(root, "<i></i>")?;
    css.pump()?;
    css.document_mut().advance_time(10);
    css.document_mut().append_html(root, "<i></i>")?;
    css.pump()?;
    assert_eq!(css.pending_pass_at(), Some(150));
    Ok(())
}

#[test]
fn unobserved_attributes_do_not_schedule_passes() -> Result<()> {
    let mut css = engine(r#"<div id="x"></div>"#, ".banner { display: none }")?;
    let x = element(css.document(), "x")?;
    css.apply()?;

    css.document_mut().set_attribute(x, "title", "changed")?;
    assert_eq!(css.pump()?, 0);
    assert_eq!(css.pending_pass_at(), None);

    css.document_mut().set_attribute(x, "class", "banner")?;
    assert_eq!(css.pump()?, 1);
    assert_eq!(
        css.document().inline_style_property(x, "display").as_deref(),
        Some("none")
    );
    Ok(())
}

#[test]
fn attribute_changes_right_after_hover_are_ignored() -> Result<()> {
    let mut css = engine(r#"<div id="x"></div>"#, ".banner { display: none }")?;
    let x = element(css.document(), "x")?;
    css.apply()?;

    css.document_mut().advance_time(20);
    css.document_mut().dispatch_input_event("mouseover");
    css.document_mut().advance_time(5);
    css.document_mut().set_attribute(x, "class", "banner")?;
    assert_eq!(css.pump()?, 0);
    assert_eq!(css.pending_pass_at(), None);

    // a click is not hover-like
    css.document_mut().dispatch_input_event("click");
    css.document_mut().set_attribute(x, "class", "banner x")?;
    assert_eq!(css.pump()?, 1);
    assert_eq!(
        css.document().inline_style_property(x, "display").as_deref(),
        Some("none")
    );
    Ok(())
}

#[test]
fn hover_does_not_hide_added_nodes() -> Result<()> {
    let mut css = engine(r#"<div id="root"></div>"#, ".banner { display: none }")?;
    let root = element(css.document(), "root")?;
    css.apply()?;

    css.document_mut().dispatch_input_event("mouseenter");
    let banner = css
        .document_mut()
        .append_html(root, r#"<div class="banner"></div>"#)?[0];
    assert_eq!(css.pump()?, 1);
    assert_eq!(
        css.document().inline_style_property(banner, "display").as_deref(),
        Some("none")
    );
    Ok(())
}

#[test]
fn hover_suppression_expires() -> Result<()> {
    let mut css = engine(r#"<div id="x"></div>"#, ".banner { display: none }")?;
    let x = element(css.document(), "x")?;
    css.apply()?;

    css.document_mut().dispatch_input_event("mouseout");
    css.document_mut().advance_time(10);
    css.document_mut().set_attribute(x, "class", "banner")?;
    assert_eq!(css.pump()?, 1);
    Ok(())
}

#[test]
fn removal_stops_after_repeated_reinsertion() -> Result<()> {
    let page = Page::from_html(r#"<div id="root"></div>"#)?;
    let root = element(&page, "root")?;
    let mut css = ExtendedCss::new(page, Configuration::new().css_rules(["#ad { remove: true }"]))?;
    css.apply()?;

    for _ in 0..60 {
        css.document_mut().advance_time(200);
        css.document_mut().append_html(root, r#"<div id="ad"></div>"#)?;
        css.pump()?;
    }

    assert_eq!(css.document().query_selector_all("#ad")?.len(), 9);
    Ok(())
}

#[test]
fn protection_restores_style_until_cap() -> Result<()> {
    let mut css = engine(r#"<div id="b" class="banner"></div>"#, ".banner { display: none }")?;
    let banner = element(css.document(), "b")?;
    css.apply()?;
    assert!(css.affected_elements()[0].is_protected());

    css.document_mut().set_style_text(banner, "display: block")?;
    assert_eq!(css.pump()?, 0);
    assert_eq!(
        css.document().inline_style_property(banner, "display").as_deref(),
        Some("none")
    );

    for _ in 0..59 {
        css.document_mut().set_style_text(banner, "display: block")?;
        css.pump()?;
    }

    let affected = &css.affected_elements()[0];
    assert_eq!(affected.protection_count(), 50);
    assert!(!affected.is_protected());
    assert_eq!(
        css.document().inline_style_property(banner, "display").as_deref(),
        Some("block")
    );
    Ok(())
}

#[test]
fn repeated_apply_is_idempotent() -> Result<()> {
    let mut css = engine(r#"<div id="b" class="banner"></div>"#, ".banner { display: none }")?;
    let banner = element(css.document(), "b")?;
    css.apply()?;
    let style = css.document().inline_style(banner);
    let observer = css.affected_elements()[0].protection_observer_id();
    assert!(observer.is_some());

    css.apply()?;
    assert_eq!(css.affected_elements().len(), 1);
    assert_eq!(css.affected_elements()[0].rules.len(), 1);
    assert_eq!(css.affected_elements()[0].protection_observer_id(), observer);
    assert_eq!(css.document().inline_style(banner), style);
    Ok(())
}

#[test]
fn unmatched_elements_are_reverted() -> Result<()> {
    let mut css = engine(
        r#"<div id="b" class="banner" style="color: blue;"></div>"#,
        ".banner { display: none }",
    )?;
    let banner = element(css.document(), "b")?;
    css.apply()?;
    assert_eq!(
        css.document().inline_style_property(banner, "display").as_deref(),
        Some("none")
    );

    css.document_mut().set_attribute(banner, "class", "plain")?;
    assert_eq!(css.pump()?, 1);
    assert_eq!(css.document().inline_style(banner), "color: blue;");
    assert!(css.affected_elements().is_empty());
    Ok(())
}

#[test]
fn dispose_restores_original_styles_and_stops_observing() -> Result<()> {
    let mut css = engine(
        r#"<div id="root"><div id="b" class="banner" style="color: blue;"></div></div>"#,
        ".banner { display: none }",
    )?;
    let root = element(css.document(), "root")?;
    let banner = element(css.document(), "b")?;
    css.apply()?;

    css.dispose();
    assert_eq!(css.document().inline_style(banner), "color: blue;");
    assert!(css.affected_elements().is_empty());

    css.document_mut().append_html(root, r#"<div class="banner"></div>"#)?;
    assert_eq!(css.pump()?, 0);
    assert_eq!(css.pending_pass_at(), None);

    let page = css.into_document();
    assert!(page.pending_mutations().is_empty());
    Ok(())
}

#[test]
fn contains_uses_native_text_after_init() -> Result<()> {
    let html = r#"<p id="p">ad</p>"#;
    let mut with_init = engine(html, "p:contains(ad) { display: none }")?;
    with_init.init();
    let p = element(with_init.document(), "p")?;
    with_init.document_mut().override_text_content(p, "clean");
    with_init.apply()?;
    assert_eq!(
        with_init.document().inline_style_property(p, "display").as_deref(),
        Some("none")
    );

    let mut without_init = engine(html, "p:contains(ad) { display: none }")?;
    let p = element(without_init.document(), "p")?;
    without_init.document_mut().override_text_content(p, "clean");
    without_init.apply()?;
    assert_eq!(without_init.document().inline_style(p), "");
    Ok(())
}

#[test]
fn before_style_applied_can_rewrite_rules() -> Result<()> {
    let page = Page::from_html(r#"<p id="p" class="x"></p>"#)?;
    let p = element(&page, "p")?;
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    let configuration = Configuration::new()
        .style_sheet(".x { display: none }")
        .before_style_applied(move |mut target: StyleTarget<NodeId>| {
            seen.set(seen.get() + 1);
            for rule in &mut target.rules {
                rule.style = Some([("color", "green")].into_iter().collect());
            }
            Some(target)
        });
    let mut css = ExtendedCss::new(page, configuration)?;
    css.apply()?;

    assert_eq!(calls.get(), 1);
    assert_eq!(
        css.document().inline_style_property(p, "color").as_deref(),
        Some("green")
    );
    assert_eq!(css.document().inline_style_property(p, "display"), None);
    Ok(())
}

#[test]
fn before_style_applied_must_return_target() -> Result<()> {
    let page = Page::from_html(r#"<p class="x"></p>"#)?;
    let configuration = Configuration::new()
        .style_sheet(".x { display: none }")
        .before_style_applied(|_| None);
    let mut css = ExtendedCss::new(page, configuration)?;
    match css.apply() {
        Err(Error::Configuration(msg)) => assert!(msg.contains("beforeStyleApplied"), "{msg}"),
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[test]
fn apply_runs_again_once_document_is_ready() -> Result<()> {
    let mut page = Page::from_html(r#"<div id="root"></div>"#)?;
    page.set_ready(false);
    let root = element(&page, "root")?;
    let mut css = ExtendedCss::new(page, Configuration::new().style_sheet(".late { color: red }"))?;
    css.apply()?;
    assert_eq!(css.pump()?, 0);

    let late = css.document_mut().create_element("span");
    css.document_mut().set_attribute(late, "class", "late")?;
    css.document_mut().append_child(root, late)?;
    css.document_mut().take_mutations();
    css.document_mut().set_ready(true);
    assert_eq!(css.pump()?, 1);
    assert_eq!(
        css.document().inline_style_property(late, "color").as_deref(),
        Some("red")
    );
    assert_eq!(css.pump()?, 0);
    Ok(())
}

#[test]
fn debug_rules_collect_timings() -> Result<()> {
    let mut css = engine(
        r#"<div id="b" class="banner"></div><div id="ad"></div>"#,
        ".banner { display: none; debug: true } #ad { remove: true }",
    )?;
    let banner = element(css.document(), "b")?;
    css.apply()?;

    let report = css.timings_report();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].selector, ".banner");
    assert_eq!(report[0].timings.applies_count, 1);
    assert_eq!(report[0].matched_elements, vec![banner]);
    assert!(!report[0].removed);
    Ok(())
}

#[test]
fn global_debug_reports_every_rule() -> Result<()> {
    let mut css = engine(
        r#"<div class="banner"></div><div id="ad"></div>"#,
        ".banner { display: none; debug: global } #ad { remove: true }",
    )?;
    css.apply()?;
    css.apply()?;

    let report = css.timings_report();
    assert_eq!(report.len(), 2);
    let removal = report
        .iter()
        .find(|entry| entry.selector == "#ad")
        .ok_or_else(|| Error::Runtime("missing #ad report".into()))?;
    assert!(removal.removed);
    assert!(removal.matched_elements.is_empty());
    assert_eq!(removal.style_applied, None);
    assert!(report.iter().all(|entry| entry.timings.applies_count == 2));
    Ok(())
}

#[test]
fn query_selects_with_cached_ast() -> Result<()> {
    let page = Page::from_html(r#"<p id="a">ad</p><p id="b">news</p>"#)?;
    let first = ExtendedCss::query(&page, "p:contains(ad)", false)?;
    let second = ExtendedCss::query(&page, "p:contains(ad)", true)?;
    assert_eq!(first, second);
    assert_eq!(ids_of(&page, &first), vec!["a"]);
    Ok(())
}

#[test]
fn validate_reports_parse_and_matching_errors() -> Result<()> {
    let page = Page::from_html(r#"<div><a></a></div>"#)?;
    assert_eq!(
        ExtendedCss::validate(&page, "div:has(> a)"),
        Validation {
            ok: true,
            error: None
        }
    );
    assert!(ExtendedCss::validate(&page, "div:contains(ad):remove()").ok);

    let missing_arg = ExtendedCss::validate(&page, "div:contains()");
    assert!(!missing_arg.ok);
    assert_eq!(
        missing_arg.error.as_deref(),
        Some("Error: Invalid selector: 'div:contains()' -- Missing arg for :contains() pseudo-class")
    );

    let bad_remove = ExtendedCss::validate(&page, "div:remove(0)");
    assert!(!bad_remove.ok);
    assert!(
        bad_remove
            .error
            .as_deref()
            .is_some_and(|error| error.contains("Invalid :remove() pseudo-class")),
        "{bad_remove:?}"
    );

    assert!(!ExtendedCss::validate(&page, "div:has(a").ok);
    Ok(())
}
