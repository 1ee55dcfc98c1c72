//! logos-based markup tokenizer.
//!
//! Markup lexing is modal: outside a tag everything up to the next `<` is
//! text, inside a tag we need names, `=`, quoted values and the closing `>`.
//! Two logos enums cover the two modes and the lexer is morphed between them
//! at every tag boundary.
//!
//! Token priority follows logos rules (longest match, then definition order):
//! - `</` matches [`ContentToken::CloseTagOpen`], not `TagOpen` + text
//! - `<!-- ... -->` matches [`ContentToken::Comment`] as a whole
//! - `/>` matches [`TagToken::SelfClose`], not a name followed by `>`

use logos::{Lexer, Logos};

use super::MarkupError;

/// Tokens recognised between tags.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum ContentToken {
    /// `<!-- ... -->`, dropped by the tokenizer.
    #[regex(r"<!--([^-]|-[^-])*-->")]
    Comment,

    /// `</`
    #[token("</")]
    CloseTagOpen,

    /// `<`
    #[token("<")]
    TagOpen,

    /// Character data.
    #[regex(r"[^<]+")]
    Text,
}

/// Tokens recognised inside a tag.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
pub enum TagToken {
    /// Tag name, attribute name or unquoted attribute value.
    #[regex(r"[A-Za-z0-9_:.@-]+")]
    Name,

    /// `=`
    #[token("=")]
    Equals,

    /// `"..."`
    #[regex(r#""[^"]*""#)]
    DoubleQuoted,

    /// `'...'`
    #[regex(r"'[^']*'")]
    SingleQuoted,

    /// `/>`
    #[token("/>")]
    SelfClose,

    /// `>`
    #[token(">")]
    TagClose,
}

/// A markup token with its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupToken {
    /// Character data with entities decoded.
    Text { text: String, offset: usize },
    /// `<name attr="value" ...>` or `<name ... />`.
    StartTag {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
        offset: usize,
    },
    /// `</name>`.
    EndTag { name: String, offset: usize },
}

/// Tokenize markup into start tags, end tags and text. Comments are dropped.
pub fn tokenize(input: &str) -> Result<Vec<MarkupToken>, MarkupError> {
    let mut tokens = Vec::new();
    let mut content = ContentToken::lexer(input);

    while let Some(result) = content.next() {
        let offset = content.span().start;
        match result {
            Ok(ContentToken::Comment) => {}
            Ok(ContentToken::Text) => tokens.push(MarkupToken::Text {
                text: decode_entities(content.slice()),
                offset,
            }),
            Ok(ContentToken::TagOpen) => {
                let (token, tag) = read_start_tag(content.morph(), offset)?;
                tokens.push(token);
                content = tag.morph();
            }
            Ok(ContentToken::CloseTagOpen) => {
                let (token, tag) = read_end_tag(content.morph(), offset)?;
                tokens.push(token);
                content = tag.morph();
            }
            Err(()) => {
                return Err(MarkupError::UnexpectedToken {
                    position: offset,
                    message: format!("unrecognized input `{}`", content.slice()),
                })
            }
        }
    }

    Ok(tokens)
}

fn read_start_tag(
    mut lex: Lexer<'_, TagToken>,
    offset: usize,
) -> Result<(MarkupToken, Lexer<'_, TagToken>), MarkupError> {
    let name = expect_name(&mut lex, "expected tag name after `<`")?;
    let mut attributes = Vec::new();
    let mut pending: Option<String> = None;

    let self_closing = loop {
        match lex.next() {
            Some(Ok(TagToken::Name)) => {
                let attr = lex.slice().to_ascii_lowercase();
                if let Some(previous) = pending.replace(attr) {
                    attributes.push((previous, String::new()));
                }
            }
            Some(Ok(TagToken::Equals)) => {
                let Some(attr) = pending.take() else {
                    return Err(unexpected(&lex, "`=` without an attribute name"));
                };
                let value = match lex.next() {
                    Some(Ok(TagToken::DoubleQuoted | TagToken::SingleQuoted)) => {
                        let quoted = lex.slice();
                        decode_entities(&quoted[1..quoted.len() - 1])
                    }
                    Some(Ok(TagToken::Name)) => lex.slice().to_owned(),
                    None => {
                        return Err(MarkupError::UnexpectedEof(format!(
                            "value of attribute `{attr}` in <{name}>"
                        )))
                    }
                    Some(_) => {
                        return Err(unexpected(&lex, &format!("expected value for `{attr}`")))
                    }
                };
                attributes.push((attr, value));
            }
            Some(Ok(TagToken::TagClose)) => break false,
            Some(Ok(TagToken::SelfClose)) => break true,
            Some(_) => return Err(unexpected(&lex, &format!("inside <{name}>"))),
            None => {
                return Err(MarkupError::UnexpectedEof(format!(
                    "unterminated start tag <{name}>"
                )))
            }
        }
    };
    if let Some(last) = pending {
        attributes.push((last, String::new()));
    }

    Ok((
        MarkupToken::StartTag {
            name,
            attributes,
            self_closing,
            offset,
        },
        lex,
    ))
}

fn read_end_tag(
    mut lex: Lexer<'_, TagToken>,
    offset: usize,
) -> Result<(MarkupToken, Lexer<'_, TagToken>), MarkupError> {
    let name = expect_name(&mut lex, "expected tag name after `</`")?;
    match lex.next() {
        Some(Ok(TagToken::TagClose)) => Ok((MarkupToken::EndTag { name, offset }, lex)),
        None => Err(MarkupError::UnexpectedEof(format!(
            "unterminated end tag </{name}"
        ))),
        Some(_) => Err(unexpected(&lex, &format!("expected `>` to close </{name}"))),
    }
}

fn expect_name(lex: &mut Lexer<'_, TagToken>, message: &str) -> Result<String, MarkupError> {
    match lex.next() {
        Some(Ok(TagToken::Name)) => Ok(lex.slice().to_ascii_lowercase()),
        None => Err(MarkupError::UnexpectedEof(message.to_owned())),
        Some(_) => Err(unexpected(lex, message)),
    }
}

fn unexpected(lex: &Lexer<'_, TagToken>, message: &str) -> MarkupError {
    MarkupError::UnexpectedToken {
        position: lex.span().start,
        message: format!("`{}`: {message}", lex.slice()),
    }
}

/// Decode the handful of character references markup templates use.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn start(name: &str, attributes: &[(&str, &str)], self_closing: bool, offset: usize) -> MarkupToken {
        MarkupToken::StartTag {
            name: name.to_owned(),
            attributes: attributes
                .iter()
                .map(|(n, v)| ((*n).to_owned(), (*v).to_owned()))
                .collect(),
            self_closing,
            offset,
        }
    }

    // ── Content mode ─────────────────────────────────────────────────

    #[test]
    fn text_only() {
        let tokens = tokenize("hello world").unwrap();
        assert_eq!(
            tokens,
            vec![MarkupToken::Text {
                text: "hello world".into(),
                offset: 0
            }]
        );
    }

    #[test]
    fn comment_is_dropped() {
        let tokens = tokenize("<!-- note -->x").unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(matches!(&tokens[0], MarkupToken::Text { text, .. } if text == "x"));
    }

    #[test]
    fn simple_element() {
        let tokens = tokenize("<div>hi</div>").unwrap();
        assert_eq!(
            tokens,
            vec![
                start("div", &[], false, 0),
                MarkupToken::Text {
                    text: "hi".into(),
                    offset: 5
                },
                MarkupToken::EndTag {
                    name: "div".into(),
                    offset: 7
                },
            ]
        );
    }

    // ── Tag mode ─────────────────────────────────────────────────────

    #[test]
    fn attribute_forms() {
        let tokens = tokenize(r#"<input type="text" name='q' tabindex=0 disabled>"#).unwrap();
        assert_eq!(
            tokens,
            vec![start(
                "input",
                &[
                    ("type", "text"),
                    ("name", "q"),
                    ("tabindex", "0"),
                    ("disabled", "")
                ],
                false,
                0
            )]
        );
    }

    #[test]
    fn binding_attribute_value_kept_verbatim() {
        let tokens = tokenize(r#"<div bind="textContent: headerTxt; title: user.name"></div>"#)
            .unwrap();
        match &tokens[0] {
            MarkupToken::StartTag { attributes, .. } => {
                assert_eq!(attributes[0].1, "textContent: headerTxt; title: user.name");
            }
            other => panic!("expected start tag, got {other:?}"),
        }
    }

    #[test]
    fn self_closing() {
        let tokens = tokenize("<br/>").unwrap();
        assert_eq!(tokens, vec![start("br", &[], true, 0)]);
    }

    #[test]
    fn names_are_lowercased() {
        let tokens = tokenize("<DIV Slot=header></Div>").unwrap();
        assert_eq!(tokens[0], start("div", &[("slot", "header")], false, 0));
        assert!(matches!(&tokens[1], MarkupToken::EndTag { name, .. } if name == "div"));
    }

    #[test]
    fn entities_decoded() {
        let tokens = tokenize(r#"<p title="a &quot;b&quot;">1 &lt; 2 &amp;&amp; 3</p>"#).unwrap();
        assert_eq!(tokens[0], start("p", &[("title", "a \"b\"")], false, 0));
        assert!(matches!(&tokens[1], MarkupToken::Text { text, .. } if text == "1 < 2 && 3"));
    }

    // ── Errors ───────────────────────────────────────────────────────

    #[test]
    fn unterminated_tag() {
        assert!(matches!(
            tokenize("<div class=\"x\""),
            Err(MarkupError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn equals_without_name() {
        assert!(matches!(
            tokenize("<div =\"x\">"),
            Err(MarkupError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn missing_tag_name() {
        assert!(tokenize("< >").is_err());
    }
}
