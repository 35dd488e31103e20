use super::*;

use serde_json::json;

const CARDS_HTML: &str = r#"
    <div id="root">
      <div id="a" class="card"><span id="a1">Sponsored</span></div>
      <div id="b" class="card"><p id="b1"><span id="b2">news</span></p></div>
      <div id="c" class="card" data-ad="yes">plain</div>
    </div>
"#;

fn cards() -> Result<Page> {
    Page::from_html(CARDS_HTML)
}

fn expect_matching_error(page: &Page, selector: &str, expected: &str) {
    let result = parse(selector).and_then(|ast| select_elements_by_ast(page, &ast));
    match result {
        Err(Error::Matching(msg)) => assert!(msg.contains(expected), "{selector}: {msg}"),
        other => panic!("{selector}: unexpected result {other:?}"),
    }
}

#[test]
fn has_distinguishes_direct_children_from_descendants() -> Result<()> {
    let page = cards()?;
    assert_eq!(select_ids(&page, "div:has(> span)")?, vec!["a"]);
    assert_eq!(select_ids(&page, "div:has(span)")?, vec!["root", "a", "b"]);
    assert_eq!(select_ids(&page, "div:-abp-has(> p > span)")?, vec!["b"]);
    Ok(())
}

#[test]
fn has_with_sibling_combinator_looks_after_the_element() -> Result<()> {
    let page = cards()?;
    assert_eq!(select_ids(&page, ".card:has(+ .card[data-ad])")?, vec!["b"]);
    assert_eq!(select_ids(&page, ".card:has(~ #c)")?, vec!["a", "b"]);
    Ok(())
}

#[test]
fn has_requires_every_selector_of_its_list() -> Result<()> {
    let page = cards()?;
    assert_eq!(select_ids(&page, "div:has(span, p)")?, vec!["root", "b"]);
    assert!(select_ids(&page, "div:has(span, table, p)")?.is_empty());
    Ok(())
}

#[test]
fn is_and_not_with_extended_arguments() -> Result<()> {
    let page = cards()?;
    assert_eq!(
        select_ids(&page, ".card:is(:contains(plain), #a, .missing)")?,
        vec!["a", "c"]
    );
    assert_eq!(
        select_ids(&page, ".card:not(:contains(news), #c, .missing)")?,
        vec!["a"]
    );
    Ok(())
}

#[test]
fn contains_matches_substring_and_regexp() -> Result<()> {
    let page = cards()?;
    assert_eq!(select_ids(&page, ".card:contains(Sponsored)")?, vec!["a"]);
    assert_eq!(select_ids(&page, ".card:has-text(/news|plain/)")?, vec!["b", "c"]);
    assert_eq!(select_ids(&page, ".card:-abp-contains(/^sponsored$/i)")?, vec!["a"]);
    assert!(select_ids(&page, ".card:contains(sponsored)")?.is_empty());
    Ok(())
}

#[test]
fn contains_reads_page_visible_text() -> Result<()> {
    let mut page = cards()?;
    let c = page.element_by_id("c").ok_or_else(|| Error::Runtime("missing #c".into()))?;
    page.override_text_content(c, "Sponsored");
    assert_eq!(select_ids(&page, ".card:contains(Sponsored)")?, vec!["a", "c"]);
    Ok(())
}

#[test]
fn following_regular_selector_is_scoped_to_matched_elements() -> Result<()> {
    let page = cards()?;
    assert_eq!(select_ids(&page, "div:contains(news) > p")?, vec!["b1"]);
    assert_eq!(select_ids(&page, "div:contains(news) span")?, vec!["a1", "b2"]);
    assert_eq!(select_ids(&page, ".card:contains(Sponsored) + div")?, vec!["b"]);
    assert_eq!(select_ids(&page, ".card:contains(Sponsored) ~ div")?, vec!["b", "c"]);
    Ok(())
}

#[test]
fn selector_list_results_are_distinct() -> Result<()> {
    let page = cards()?;
    assert_eq!(
        select_ids(&page, ".card:contains(plain), #c, div[data-ad]")?,
        vec!["c"]
    );
    Ok(())
}

#[test]
fn matches_css_compares_computed_style() -> Result<()> {
    let mut page = cards()?;
    let a = page.element_by_id("a").ok_or_else(|| Error::Runtime("missing #a".into()))?;
    let c = page.element_by_id("c").ok_or_else(|| Error::Runtime("missing #c".into()))?;
    page.set_style_text(a, "display: none")?;
    page.set_style_text(c, "background-image: url(a.png)")?;
    page.add_style_rule("#b", Some("::before"), "content: \"ad\"")?;
    page.add_style_rule(".card", None, "opacity: 0.5")?;

    assert_eq!(select_ids(&page, ".card:matches-css(display: none)")?, vec!["a"]);
    assert_eq!(select_ids(&page, ".card:matches-css(display: /^(none|flex)$/)")?, vec!["a"]);
    assert_eq!(select_ids(&page, ".card:matches-css(opacity: 0.5)")?, vec!["a", "b", "c"]);
    assert_eq!(select_ids(&page, ".card:matches-css(opacity: 0.*)")?, vec!["a", "b", "c"]);
    assert_eq!(
        select_ids(&page, ".card:matches-css(background-image: url(a.png))")?,
        vec!["c"]
    );
    assert_eq!(select_ids(&page, ".card:matches-css(before, content: ad)")?, vec!["b"]);
    assert_eq!(select_ids(&page, ".card:matches-css-before(content: ad)")?, vec!["b"]);
    assert!(select_ids(&page, ".card:matches-css(after, content: ad)")?.is_empty());
    Ok(())
}

#[test]
fn matches_css_requires_property_and_value() -> Result<()> {
    let page = cards()?;
    expect_matching_error(
        &page,
        ".card:matches-css(display)",
        "Error while matching element style, may be invalid :matches-css() pseudo-class arg: 'display'",
    );
    Ok(())
}

#[test]
fn matches_attr_matches_names_and_values() -> Result<()> {
    let page = cards()?;
    assert_eq!(select_ids(&page, r#".card:matches-attr("data-ad"="yes")"#)?, vec!["c"]);
    assert_eq!(select_ids(&page, ".card:matches-attr(/^data-/)")?, vec!["c"]);
    assert_eq!(select_ids(&page, ".card:matches-attr(data-*=y*)")?, vec!["c"]);
    assert!(select_ids(&page, ".card:matches-attr(data-ad=no)")?.is_empty());
    expect_matching_error(
        &page,
        ".card:matches-attr(*)",
        "Error while matching element attributes",
    );
    Ok(())
}

#[test]
fn matches_property_walks_property_chains() -> Result<()> {
    let mut page = cards()?;
    let a = page.element_by_id("a").ok_or_else(|| Error::Runtime("missing #a".into()))?;
    page.set_property(
        a,
        "adConfig",
        json!({ "id": 5, "tags": ["x"], "inner.key": { "enabled": true }, "empty": null }),
    )?;

    assert_eq!(select_ids(&page, ".card:matches-property(adConfig.id=5)")?, vec!["a"]);
    assert_eq!(select_ids(&page, ".card:matches-property(adConfig.tags.0=x)")?, vec!["a"]);
    assert_eq!(select_ids(&page, ".card:matches-property(/^ad/)")?, vec!["a"]);
    assert_eq!(
        select_ids(&page, ".card:matches-property(adConfig./inner.key/.enabled=true)")?,
        vec!["a"]
    );
    assert_eq!(select_ids(&page, ".card:matches-property(adConfig.empty=null)")?, vec!["a"]);
    assert_eq!(select_ids(&page, ".card:matches-property(dataset.ad=yes)")?, vec!["c"]);
    assert!(select_ids(&page, ".card:matches-property(adConfig.id=6)")?.is_empty());
    Ok(())
}

#[test]
fn upward_and_nth_ancestor_select_ancestors() -> Result<()> {
    let page = cards()?;
    assert_eq!(select_ids(&page, "span:nth-ancestor(1)")?, vec!["a", "b1"]);
    assert_eq!(select_ids(&page, "span:upward(2)")?, vec!["root", "b"]);
    assert_eq!(select_ids(&page, "span:upward(.card)")?, vec!["a", "b"]);
    assert_eq!(select_ids(&page, "#root:upward(#root)")?, Vec::<String>::new());
    Ok(())
}

#[test]
fn ancestor_depth_is_validated() -> Result<()> {
    let page = cards()?;
    expect_matching_error(
        &page,
        "span:upward(0)",
        "Invalid argument of :upward pseudo-class: '0'",
    );
    expect_matching_error(
        &page,
        "span:nth-ancestor(256)",
        "Invalid argument of :nth-ancestor pseudo-class: '256'",
    );
    assert!(select_ids(&page, "span:nth-ancestor(100)")?.is_empty());
    Ok(())
}

#[test]
fn upward_rejects_invalid_selector() -> Result<()> {
    let page = cards()?;
    expect_matching_error(
        &page,
        "span:upward(.card[)",
        "Invalid argument of :upward pseudo-class",
    );
    Ok(())
}

#[test]
fn xpath_selects_from_each_element() -> Result<()> {
    let page = cards()?;
    assert_eq!(select_ids(&page, ":xpath(//div[@data-ad])")?, vec!["c"]);
    assert_eq!(select_ids(&page, "#b:xpath(.//span)")?, vec!["b2"]);
    assert_eq!(select_ids(&page, "#a1:xpath(../..)")?, vec!["root"]);
    expect_matching_error(
        &page,
        "div:xpath(//div[)",
        "Invalid argument of :xpath() pseudo-class: '//div['",
    );
    Ok(())
}

#[test]
fn missing_argument_is_reported() -> Result<()> {
    let page = cards()?;
    expect_matching_error(&page, "div:contains()", "Missing arg for :contains() pseudo-class");
    Ok(())
}

#[test]
fn invalid_regular_selector_is_reported() -> Result<()> {
    let page = cards()?;
    expect_matching_error(&page, "div:unknown(x)", "Error: unable to select by 'div:unknown(x)'");
    Ok(())
}

#[test]
fn upward_accepts_non_ascii_selector() -> Result<()> {
    let page = Page::from_html(r#"<div id="日本"><p><span id="s">x</span></p></div>"#)?;
    assert_eq!(select_ids(&page, "span:upward(#日本)")?, vec!["日本"]);
    assert!(ExtendedCss::validate(&page, "div:upward(.ü)").ok);
    Ok(())
}

#[test]
fn is_skips_invalid_arguments_while_not_and_has_fail() -> Result<()> {
    let page = cards()?;
    assert_eq!(
        select_ids(&page, ".card:is(:contains(plain), .x:foo)")?,
        vec!["c"]
    );
    expect_matching_error(
        &page,
        ".card:not(:contains(news), .x:foo)",
        "Invalid selector for :not() pseudo-class: '.x:foo'",
    );
    expect_matching_error(
        &page,
        "div:has(.x:foo)",
        "Invalid selector for :has() pseudo-class: '.x:foo'",
    );
    Ok(())
}
