use super::*;

#[test]
fn collects_declarations_with_and_without_trailing_semicolon() -> Result<()> {
    let styles = parse_style_block(" display: none !important; color : red ")?;
    assert_eq!(
        styles,
        vec![
            StyleDeclaration::new("display", "none !important"),
            StyleDeclaration::new("color", "red"),
        ]
    );
    Ok(())
}

#[test]
fn keeps_marks_inside_quoted_values() -> Result<()> {
    let styles = parse_style_block(r#"content: "a:b;c\"d""#)?;
    assert_eq!(styles[0].value, r#""a:b;c\"d""#);
    Ok(())
}

#[test]
fn reports_malformed_blocks() {
    let cases = [
        ("padding top: 0", "Invalid style property in style block"),
        (": none", "Missing style property before ':'"),
        ("display: none: block", "Invalid style value for property 'display'"),
        ("content: \"open", "Unbalanced style declaration quotes"),
        ("display:", "Missing style value for property 'display'"),
        ("remove", "Missing style value for property 'remove'"),
        ("   ", "No style declaration found"),
    ];
    for (block, expected) in cases {
        match parse_style_block(block) {
            Err(Error::StyleParse(msg)) => {
                assert!(msg.contains(expected), "{block}: {msg}")
            }
            other => panic!("{block}: unexpected result {other:?}"),
        }
    }
}
