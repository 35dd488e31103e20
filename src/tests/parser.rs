use super::*;

#[test]
fn regular_selector_stays_a_single_node() -> Result<()> {
    let ast = parse("div.banner > a[href^='x']")?;
    assert_eq!(
        ast,
        selector_list(vec![selector(vec![regular("div.banner > a[href^='x']")])])
    );
    Ok(())
}

#[test]
fn splits_selector_list_on_top_level_commas() -> Result<()> {
    let ast = parse("div, a[title='a,b']")?;
    assert_eq!(
        ast,
        selector_list(vec![
            selector(vec![regular("div")]),
            selector(vec![regular("a[title='a,b']")]),
        ])
    );
    Ok(())
}

#[test]
fn absolute_pseudo_class_keeps_raw_argument() -> Result<()> {
    let ast = parse("div > p:contains(ad) + span")?;
    assert_eq!(
        ast,
        selector_list(vec![selector(vec![
            regular("div > p"),
            absolute(PseudoClass::Contains, "ad"),
            regular("+ span"),
        ])])
    );
    Ok(())
}

#[test]
fn nested_parentheses_belong_to_argument() -> Result<()> {
    let ast = parse("h3:contains((Ads))")?;
    assert_eq!(
        ast,
        selector_list(vec![selector(vec![
            regular("h3"),
            absolute(PseudoClass::Contains, "(Ads)"),
        ])])
    );

    let ast = parse("div:contains(/ad(s)/)")?;
    assert_eq!(
        ast,
        selector_list(vec![selector(vec![
            regular("div"),
            absolute(PseudoClass::Contains, "/ad(s)/"),
        ])])
    );
    Ok(())
}

#[test]
fn relative_pseudo_class_gets_own_selector_list() -> Result<()> {
    let ast = parse("div:has(> a, span)")?;
    assert_eq!(
        ast,
        selector_list(vec![selector(vec![
            regular("div"),
            relative(
                PseudoClass::Has,
                selector_list(vec![
                    selector(vec![regular("> a")]),
                    selector(vec![regular("span")]),
                ])
            ),
        ])])
    );
    Ok(())
}

#[test]
fn leading_pseudo_class_gets_implicit_root() -> Result<()> {
    let ast = parse(":has(a)")?;
    assert_eq!(
        ast,
        selector_list(vec![selector(vec![
            regular("*"),
            relative(
                PseudoClass::Has,
                selector_list(vec![selector(vec![regular("a")])])
            ),
        ])])
    );

    let ast = parse(":xpath(//div[@data-ad])")?;
    assert_eq!(
        ast,
        selector_list(vec![selector(vec![
            regular("body"),
            absolute(PseudoClass::XPath, "//div[@data-ad]"),
        ])])
    );
    Ok(())
}

#[test]
fn aliases_parse_to_their_own_pseudo_classes() -> Result<()> {
    let cases = [
        ("div:-abp-contains(ad)", PseudoClass::AbpContains),
        ("div:has-text(ad)", PseudoClass::HasText),
        ("div:-abp-has(a)", PseudoClass::AbpHas),
        ("div:matches-attr(class)", PseudoClass::MatchesAttr),
        ("div:matches-property(id)", PseudoClass::MatchesProperty),
        ("div:nth-ancestor(2)", PseudoClass::NthAncestor),
        ("div:upward(2)", PseudoClass::Upward),
    ];
    for (source, expected) in cases {
        let ast = parse(source)?;
        let pseudo = ast.children[0].children[1].children[0].pseudo_class();
        assert_eq!(pseudo, Some(expected), "{source}");
    }
    Ok(())
}

#[test]
fn matches_css_before_is_normalized_to_pseudo_element_argument() -> Result<()> {
    let ast = parse("p:matches-css-before(content: ad)")?;
    assert_eq!(
        ast,
        selector_list(vec![selector(vec![
            regular("p"),
            absolute(PseudoClass::MatchesCss, "before,content: ad"),
        ])])
    );
    Ok(())
}

#[test]
fn standard_pseudo_class_after_extended_one_continues_regular_selector() -> Result<()> {
    let ast = parse("input:matches-css(padding: 10):checked")?;
    assert_eq!(ast.children[0].children.len(), 2);
    assert_eq!(
        ast.children[0].children[0],
        regular("input:checked")
    );
    Ok(())
}

#[test]
fn reports_malformed_selectors() {
    let cases = [
        ("div:", "Invalid colon ':' at the end of selector"),
        ("div: contains(a)", "No white space is allowed"),
        ("div:contains (a)", "No white space is allowed"),
        ("div:has(a", "Unbalanced brackets for extended pseudo-class: 'has'"),
        ("a[href", "Unbalanced attribute brackets in selector"),
        ("div]", "is not a valid selector due to ']'"),
        ("div:remove()", "Invalid :remove() pseudo-class in selector"),
        (":upward(2)", "Selector should be defined before :upward() pseudo-class"),
        (
            ":nth-ancestor(2)",
            "Selector should be defined before :nth-ancestor() pseudo-class",
        ),
        (
            "div:where(:has(a))",
            "Usage of :has() pseudo-class is not allowed inside regular pseudo: 'where'",
        ),
        (
            "p::part(foo):has(a)",
            "not allowed after any regular pseudo-element: 'part'",
        ),
        (
            "div:xpath(//h3:contains(x))",
            ":xpath() pseudo-class should be the last in selector",
        ),
        (
            "div:matches-attr(//)",
            "Invalid regexp pattern for :matches-attr() pseudo-class",
        ),
        (", div", "is not a valid selector"),
        ("div,", "is not a valid selector"),
    ];
    for (selector, expected) in cases {
        expect_selector_error(selector, expected);
    }
}

#[test]
fn attribute_validation_rejects_broken_brackets() {
    expect_selector_error("a[=x]", "is not a valid attribute due to '='");
    expect_selector_error("a[title=]", "is not a valid attribute due to '='");
}

#[test]
fn deep_nesting_does_not_overflow() -> Result<()> {
    let depth = 200;
    let mut selector = String::from("div");
    for _ in 0..depth {
        selector.push_str(":has(div");
    }
    for _ in 0..depth {
        selector.push(')');
    }
    let ast = parse(&selector)?;
    assert!(ast.is_selector_list());
    Ok(())
}
