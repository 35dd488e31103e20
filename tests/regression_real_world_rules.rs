use extended_css::{Configuration, ExtendedCss, HostDocument, NodeId, Page};

const FEED_HTML: &str = r#"
<main id="feed">
  <article id="post-1" class="post">
    <header><span class="label">Sponsored</span></header>
    <p>Buy now</p>
  </article>
  <article id="post-2" class="post">
    <header><span class="label">Friend</span></header>
    <p>Holiday photos</p>
  </article>
  <article id="post-3" class="post">
    <div class="promo"><a href="https://track.example/c?id=1">Learn more</a></div>
  </article>
</main>
"#;

fn node(page: &Page, id: &str) -> extended_css::Result<NodeId> {
    page.element_by_id(id)
        .ok_or_else(|| extended_css::Error::Runtime(format!("missing #{id}")))
}

fn display(css: &ExtendedCss<Page>, id: &str) -> extended_css::Result<Option<String>> {
    let node = node(css.document(), id)?;
    Ok(css.document().inline_style_property(node, "display"))
}

#[test]
fn sponsored_posts_are_hidden_by_has_and_contains() -> extended_css::Result<()> {
    let page = Page::from_html(FEED_HTML)?;
    let mut css = ExtendedCss::new(
        page,
        Configuration::new()
            .style_sheet("article.post:has(> header > .label:contains(/^Sponsored$/)) { display: none !important; }"),
    )?;
    css.init();
    css.apply()?;

    assert_eq!(display(&css, "post-1")?.as_deref(), Some("none"));
    assert_eq!(display(&css, "post-2")?, None);
    assert_eq!(display(&css, "post-3")?, None);
    Ok(())
}

#[test]
fn tracking_link_container_is_removed_through_upward() -> extended_css::Result<()> {
    let page = Page::from_html(FEED_HTML)?;
    let post = node(&page, "post-3")?;
    let mut css = ExtendedCss::new(
        page,
        Configuration::new().style_sheet(r#"a[href*="track."]:upward(article):remove()"#),
    )?;
    css.apply()?;

    assert!(!css.document().is_connected(post));
    assert!(css.document().element_by_id("post-1").is_some());
    Ok(())
}

#[test]
fn old_attribute_syntax_behaves_like_has() -> extended_css::Result<()> {
    let page = Page::from_html(FEED_HTML)?;
    let selected = ExtendedCss::query(&page, r#"article[-ext-has=".promo"]"#, false)?;
    assert_eq!(selected, vec![node(&page, "post-3")?]);
    Ok(())
}

#[test]
fn pseudo_element_content_is_matched_via_computed_style() -> extended_css::Result<()> {
    let mut page = Page::from_html(FEED_HTML)?;
    page.add_style_rule("#post-2 .label", Some("::before"), r#"content: "Promoted""#)?;
    let selected = ExtendedCss::query(
        &page,
        "article:has(.label:matches-css-before(content: /Promoted/))",
        false,
    )?;
    assert_eq!(selected, vec![node(&page, "post-2")?]);
    Ok(())
}

#[test]
fn posts_loaded_later_are_hidden_after_throttled_pass() -> extended_css::Result<()> {
    let page = Page::from_html(FEED_HTML)?;
    let feed = node(&page, "feed")?;
    let mut css = ExtendedCss::new(
        page,
        Configuration::new().style_sheet(".post:contains(Buy now) { display: none; }"),
    )?;
    css.apply()?;

    css.document_mut().append_html(
        feed,
        r#"<article id="post-4" class="post"><p>Buy now, pay later</p></article>"#,
    )?;
    css.document_mut().advance_time(20);
    assert_eq!(css.pump()?, 1);
    assert_eq!(display(&css, "post-4")?.as_deref(), Some("none"));

    css.document_mut().append_html(
        feed,
        r#"<article id="post-5" class="post"><p>Buy now</p></article>"#,
    )?;
    css.document_mut().advance_time(10);
    assert_eq!(css.pump()?, 0);
    assert_eq!(display(&css, "post-5")?, None);
    assert_eq!(css.pending_pass_at(), Some(170));

    css.document_mut().advance_time(140);
    assert_eq!(css.pump()?, 1);
    assert_eq!(display(&css, "post-5")?.as_deref(), Some("none"));
    Ok(())
}

#[test]
fn page_script_reverting_style_is_undone() -> extended_css::Result<()> {
    let page = Page::from_html(FEED_HTML)?;
    let mut css = ExtendedCss::new(
        page,
        Configuration::new().style_sheet("#post-1:contains(Sponsored) { display: none !important; }"),
    )?;
    css.apply()?;
    let post = node(css.document(), "post-1")?;

    css.document_mut().set_style_text(post, "display: block")?;
    css.pump()?;
    assert_eq!(display(&css, "post-1")?.as_deref(), Some("none"));
    assert_eq!(
        css.affected_elements()
            .iter()
            .find(|affected| affected.node == post)
            .map(|affected| affected.protection_count()),
        Some(1)
    );
    Ok(())
}

#[test]
fn dispose_restores_original_inline_style() -> extended_css::Result<()> {
    let page = Page::from_html(r#"<div id="ad" style="color: blue;">Sponsored</div>"#)?;
    let mut css = ExtendedCss::new(
        page,
        Configuration::new().style_sheet("div:contains(Sponsored) { display: none; }"),
    )?;
    css.apply()?;
    let ad = node(css.document(), "ad")?;
    assert_eq!(css.document().inline_style(ad), "color: blue; display: none !important;");

    let mut page = css.into_document();
    assert_eq!(page.inline_style(ad), "color: blue;");
    assert!(page.take_mutations().is_empty());
    Ok(())
}

#[test]
fn validation_reports_broken_selectors() -> extended_css::Result<()> {
    let page = Page::from_html(FEED_HTML)?;
    assert!(ExtendedCss::validate(&page, "article:has(.promo):remove()").ok);
    assert!(ExtendedCss::validate(&page, ".post:xpath(../main)").ok);

    let invalid = ExtendedCss::validate(&page, "article:has(.promo");
    assert!(!invalid.ok);
    assert!(
        invalid
            .error
            .as_deref()
            .is_some_and(|msg| msg.starts_with("Error: Invalid selector: 'article:has(.promo'"))
    );
    Ok(())
}
