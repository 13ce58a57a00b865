//! Event-level helpers over `quick_xml` for OOXML parts

use crate::error::ReadError;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;

/// Reader over one part. Text is not trimmed: runs may start or end with spaces.
pub(crate) fn reader(xml: &str) -> Reader<&[u8]> {
    Reader::from_str(xml)
}

/// Unescaped value of attribute `name`, if present
pub(crate) fn attr(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, ReadError> {
    match element.try_get_attribute(name)? {
        Some(a) => Ok(Some(a.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Unescaped character data
pub(crate) fn text(t: &BytesText<'_>) -> Result<String, ReadError> {
    Ok(t.unescape()?.into_owned())
}

/// First `tag` element, in document order, accepted by `matches`
pub(crate) fn find_element<F>(
    xml: &str,
    tag: &str,
    mut matches: F,
) -> Result<Option<BytesStart<'static>>, ReadError>
where
    F: FnMut(&BytesStart<'_>) -> Result<bool, ReadError>,
{
    let mut reader = reader(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == tag.as_bytes() => {
                if matches(&e)? {
                    return Ok(Some(e.into_owned()));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_element_matches_exact_tag_name() {
        let xml = r#"<w:r><w:tab/><w:t xml:space="preserve"> world</w:t></w:r>"#;
        let found = find_element(xml, "w:t", |_| Ok(true)).unwrap().unwrap();
        assert_eq!(attr(&found, "xml:space").unwrap().as_deref(), Some("preserve"));
    }

    #[test]
    fn test_find_element_with_predicate() {
        let xml = r#"<Rels><Rel Id="rId1" Target="a.xml"/><Rel Id="rId3" Target="b&amp;c.xml"/></Rels>"#;
        let found = find_element(xml, "Rel", |e| Ok(attr(e, "Id")?.as_deref() == Some("rId3")))
            .unwrap()
            .unwrap();
        assert_eq!(attr(&found, "Target").unwrap().as_deref(), Some("b&c.xml"));
        assert!(find_element(xml, "Rel", |_| Ok(false)).unwrap().is_none());
    }

    #[test]
    fn test_attr_lookup_requires_whole_name() {
        let xml = r#"<c r="B2" t="s"><v>3</v></c>"#;
        let cell = find_element(xml, "c", |_| Ok(true)).unwrap().unwrap();
        assert_eq!(attr(&cell, "t").unwrap().as_deref(), Some("s"));
        assert_eq!(attr(&cell, "r").unwrap().as_deref(), Some("B2"));
        assert_eq!(attr(&cell, "s").unwrap(), None);
    }

    #[test]
    fn test_text_resolves_entities() {
        let mut reader = reader("<t>a &amp; b &lt;c&gt; &#65;&#x42;</t>");
        let mut collected = String::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Text(t) => collected.push_str(&text(&t).unwrap()),
                Event::Eof => break,
                _ => {}
            }
        }
        assert_eq!(collected, "a & b <c> AB");
    }

    #[test]
    fn test_mismatched_end_tag_is_malformed() {
        let result = find_element("<a><b></a>", "z", |_| Ok(true));
        assert!(matches!(result, Err(ReadError::Malformed(_))));
    }
}
