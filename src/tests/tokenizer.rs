use super::*;

fn token_values(selector: &str) -> Result<Vec<String>> {
    Ok(core_impl::tokenize_selector(selector)?
        .into_iter()
        .map(|token| token.value)
        .collect())
}

#[test]
fn splits_marks_and_words() -> Result<()> {
    assert_eq!(
        token_values("div.banner > a[href^='x']")?,
        vec![
            "div", ".", "banner", " ", ">", " ", "a", "[", "href", "^", "=", "'", "x", "'", "]"
        ]
    );
    Ok(())
}

#[test]
fn words_are_maximal_runs_between_marks() -> Result<()> {
    let tokens = core_impl::tokenize_selector("div:contains(some text)")?;
    let words = tokens
        .iter()
        .filter(|token| token.is_word())
        .map(|token| token.value.as_str())
        .collect::<Vec<_>>();
    assert_eq!(words, vec!["div", "contains", "some", "text"]);
    Ok(())
}

#[test]
fn concatenated_tokens_reproduce_normalized_selector() -> Result<()> {
    let selector = "  #main  .ad:has(> span:contains(/a\\/b/i)) + p  ";
    assert_eq!(token_values(selector)?.concat(), selector.trim());
    Ok(())
}

#[test]
fn rewrites_old_attribute_syntax() -> Result<()> {
    assert_eq!(
        token_values(r#"div[-ext-has=".banner"]"#)?.concat(),
        "div:has(.banner)"
    );
    assert_eq!(
        token_values(r#"div[-ext-contains='it\'s']"#)?.concat(),
        "div:contains(it's)"
    );
    Ok(())
}

#[test]
fn rewrites_scope_and_matches_css_shorthands() -> Result<()> {
    assert_eq!(
        token_values("div:has(:scope > a)")?.concat(),
        "div:has(> a)"
    );
    assert_eq!(
        token_values("p:matches-css-before(content: ad)")?.concat(),
        "p:matches-css(before,content: ad)"
    );
    assert_eq!(
        token_values("p:matches-css-after(content: ad)")?.concat(),
        "p:matches-css(after,content: ad)"
    );
    Ok(())
}

#[test]
fn rejects_unconvertible_old_syntax() {
    match core_impl::tokenize_selector("div[-ext-has=.banner]") {
        Err(Error::SelectorParse(msg)) => {
            assert!(msg.contains("Invalid extended-css old syntax selector"), "{msg}")
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn old_syntax_rewrite_is_stable_across_calls() -> Result<()> {
    for _ in 0..3 {
        assert_eq!(
            token_values(r#" a[-ext-contains="say \"hi\""] "#)?.concat(),
            r#"a:contains(say "hi")"#
        );
        assert_eq!(token_values("div > p")?.concat(), "div > p");
    }
    Ok(())
}
