use super::*;

fn expect_style_error(result: Result<Vec<Rule>>, expected: &str) {
    match result {
        Err(Error::StyleParse(msg)) => assert!(msg.contains(expected), "{msg}"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn stylesheet_rules_keep_source_order_and_merge_duplicates() -> Result<()> {
    let rules = parse_stylesheet(
        "
        .a { color: red }
        div:has(> .b) { display: none !important; }
        .a { visibility: hidden; }
        ",
    )?;
    let selectors = rules.iter().map(|rule| rule.selector.as_str()).collect::<Vec<_>>();
    assert_eq!(selectors, vec![".a", "div:has(> .b)"]);

    let style = rules[0].style.as_ref().ok_or_else(|| Error::Runtime("no style".into()))?;
    assert_eq!(style.get("color"), Some("red"));
    assert_eq!(style.get("visibility"), Some("hidden"));
    assert_eq!(
        rules[1].style.as_ref().and_then(|style| style.get("display")),
        Some("none !important")
    );
    assert_eq!(rules[1].ast, parse("div:has(> .b)")?);
    Ok(())
}

#[test]
fn stylesheet_accepts_braces_inside_pseudo_class_arguments() -> Result<()> {
    let rules = parse_stylesheet("div:contains({) { display: none }")?;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].selector, "div:contains({)");
    Ok(())
}

#[test]
fn stylesheet_quoted_values_keep_separators() -> Result<()> {
    let rules = parse_stylesheet(r#"p { content: "a;b}c" } div { color: red }"#)?;
    assert_eq!(rules.len(), 2);
    assert_eq!(
        rules[0].style.as_ref().and_then(|style| style.get("content")),
        Some(r#""a;b}c""#)
    );
    Ok(())
}

#[test]
fn trailing_remove_selector_needs_no_style_block() -> Result<()> {
    let rules = parse_stylesheet(".b { color: red } #ad:contains(ad):remove()")?;
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[1].selector, "#ad:contains(ad)");
    assert!(rules[1].style.as_ref().is_some_and(Style::is_remove));
    Ok(())
}

#[test]
fn remove_declaration_keeps_only_content() -> Result<()> {
    let rules = parse_stylesheet("#ad { remove: true; color: red; content: 'x' }")?;
    let style = rules[0].style.as_ref().ok_or_else(|| Error::Runtime("no style".into()))?;
    assert!(style.is_remove());
    assert_eq!(style.get("content"), Some("'x'"));
    assert_eq!(style.get("color"), None);
    Ok(())
}

#[test]
fn debug_property_is_extracted() -> Result<()> {
    let rules = parse_stylesheet(
        ".a { display: none; debug: true } .b { display: none; debug: global } .c { debug: nope; color: red }",
    )?;
    assert_eq!(rules[0].debug, Some(DebugMode::Rule));
    assert_eq!(rules[1].debug, Some(DebugMode::Global));
    assert_eq!(rules[2].debug, None);
    for rule in &rules {
        assert!(rule.style.as_ref().is_some_and(|style| style.get("debug").is_none()));
    }

    let rules = parse_stylesheet(".a { debug: true }")?;
    assert_eq!(rules[0].style, None);
    assert_eq!(rules[0].debug, Some(DebugMode::Rule));
    Ok(())
}

#[test]
fn reports_malformed_stylesheets() {
    expect_style_error(
        parse_stylesheet("{ color: red }"),
        "Selector should be defined before style declaration in stylesheet",
    );
    expect_style_error(
        parse_stylesheet("div { color: red } /* note */"),
        "Comments are not supported in stylesheet",
    );
    expect_style_error(
        parse_stylesheet("@media print { div { color: red } }"),
        "At-rules are not supported",
    );
    expect_style_error(parse_stylesheet("div { color }"), "Invalid style declaration");
    expect_style_error(parse_stylesheet("div { }"), "No style declaration found");
    expect_style_error(parse_stylesheet("div { : red }"), "Missing style property in declaration");
    expect_style_error(parse_stylesheet("div { color: ; }"), "Missing style value in declaration");
    expect_style_error(parse_stylesheet("div { color: red"), "Unclosed style declaration");
    expect_style_error(
        parse_stylesheet("div { color: red } span"),
        "Style should be declared or :remove() pseudo-class should used",
    );
    expect_style_error(
        parse_stylesheet("div:remove():remove() { color: red }"),
        "Invalid :remove() pseudo-class in selector",
    );
}

#[test]
fn single_rule_parsing() -> Result<()> {
    let rule = parse_rule("div:contains(ad):remove()")?;
    assert_eq!(rule.selector, "div:contains(ad)");
    assert!(rule.style.as_ref().is_some_and(Style::is_remove));

    let rule = parse_rule("  div > a { color: red; }  ")?;
    assert_eq!(rule.selector, "div > a");
    assert_eq!(rule.style.as_ref().and_then(|style| style.get("color")), Some("red"));

    let rule = parse_rule("div:contains({) { color: red }")?;
    assert_eq!(rule.selector, "div:contains({)");
    Ok(())
}

#[test]
fn single_rule_errors() {
    let cases = [
        ("div", "Style should be declared or :remove() pseudo-class should used"),
        ("{ color: red }", "Selector should be defined"),
        ("div { color: red", "No style declaration found OR Unclosed style declaration"),
        ("div /* x */ { color: red }", "Comments are not supported"),
        ("div:has(a { color: red }", "Selector is not valid"),
    ];
    for (rule, expected) in cases {
        match parse_rule(rule) {
            Err(Error::StyleParse(msg)) => assert!(msg.contains(expected), "{rule}: {msg}"),
            other => panic!("{rule}: unexpected result {other:?}"),
        }
    }
}

#[test]
fn rule_list_skips_invalid_and_merges_duplicates() {
    let rules = parse_rules(&[
        "div { color: red }",
        "  div { color: red }  ",
        "{ broken",
        "div { display: none }",
        "span:remove()",
    ]);
    assert_eq!(rules.len(), 2);
    let style = rules[0].style.clone().unwrap_or_default();
    assert_eq!(style.get("color"), Some("red"));
    assert_eq!(style.get("display"), Some("none"));
    assert_eq!(rules[1].selector, "span");
}

#[test]
fn remove_pseudo_class_position_is_validated() -> Result<()> {
    let parsed = parse_remove_selector("div:remove()")?;
    assert_eq!(parsed.selector, "div");
    assert!(parsed.should_remove());

    let parsed = parse_remove_selector("div > a")?;
    assert_eq!(parsed.selector, "div > a");
    assert!(!parsed.should_remove());

    let cases = [
        (":remove()", "Selector should be defined before :remove() pseudo-class"),
        ("div:remove():remove()", "appears more than once"),
        ("div:remove() span", "should be at the end of selector"),
        ("div:remove(0)", "Invalid :remove() pseudo-class in selector"),
    ];
    for (selector, expected) in cases {
        match parse_remove_selector(selector) {
            Err(Error::SelectorParse(msg)) => assert!(msg.contains(expected), "{selector}: {msg}"),
            other => panic!("{selector}: unexpected result {other:?}"),
        }
    }
    Ok(())
}

#[test]
fn style_map_keeps_insertion_order() {
    let mut style: Style = [("display", "none"), ("color", "red")].into_iter().collect();
    style.insert("display", "block");
    assert_eq!(
        style.iter().collect::<Vec<_>>(),
        vec![("display", "block"), ("color", "red")]
    );
    assert_eq!(style.len(), 2);
    assert!(!style.is_remove());
}
