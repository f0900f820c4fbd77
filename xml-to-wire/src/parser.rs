use {
    crate::ast::{Attribute, Element},
    quick_xml::{
        Reader,
        events::{
            BytesStart, Event,
            attributes::{AttrError, Attributes},
        },
    },
    std::string::FromUtf8Error,
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("Could not read the next event")]
    ReadEvent(#[from] quick_xml::Error),
    #[error("Could not parse an attribute of element `{0}`")]
    Attribute(String, #[source] AttributeError),
    #[error("Could not decode the name of an element as UTF-8")]
    ElementName(#[source] FromUtf8Error),
    #[error("Could not decode the body of element `{0}` as UTF-8")]
    DecodeUtf8(String, #[source] FromUtf8Error),
    #[error("The document ended inside element `{0}`")]
    UnexpectedEof(String),
    #[error("Unknown entity reference `&{0};`")]
    UnknownEntity(String),
}

#[derive(Debug, Error)]
pub enum AttributeError {
    #[error("quick_xml returned an error")]
    QuickXml(#[from] AttrError),
    #[error("Could not decode the value as UTF-8")]
    DecodeUtf8(#[from] quick_xml::Error),
    #[error("Could not decode the name as UTF-8")]
    Name(#[source] FromUtf8Error),
}

/// Parses a document and returns its top-level elements.
pub fn parse(input: &[u8]) -> Result<Vec<Element>, ParserError> {
    let mut reader = Reader::from_reader(input);
    let mut roots = Vec::new();
    loop {
        let event = reader.read_event()?;
        let (start, empty) = match event {
            Event::Start(s) => (s, false),
            Event::Empty(s) => (s, true),
            Event::Eof => break,
            _ => continue,
        };
        roots.push(parse_element(&mut reader, &start, empty)?);
    }
    Ok(roots)
}

fn parse_attributes(name: &str, attributes: Attributes) -> Result<Vec<Attribute>, ParserError> {
    let mut res = vec![];
    for attr in attributes {
        let attr: Result<_, AttributeError> = (|| {
            let attr = attr?;
            let key = String::from_utf8(attr.key.local_name().into_inner().to_vec())
                .map_err(AttributeError::Name)?;
            let value = attr.unescape_value()?;
            Ok(Attribute {
                name: key,
                value: value.into_owned(),
            })
        })();
        res.push(attr.map_err(|e| ParserError::Attribute(name.to_string(), e))?);
    }
    Ok(res)
}

fn resolve_entity(name: &[u8]) -> Option<char> {
    let c = match name {
        b"amp" => '&',
        b"lt" => '<',
        b"gt" => '>',
        b"quot" => '"',
        b"apos" => '\'',
        [b'#', b'x', hex @ ..] => {
            let hex = std::str::from_utf8(hex).ok()?;
            return char::from_u32(u32::from_str_radix(hex, 16).ok()?);
        }
        [b'#', dec @ ..] => {
            let dec = std::str::from_utf8(dec).ok()?;
            return char::from_u32(dec.parse().ok()?);
        }
        _ => return None,
    };
    Some(c)
}

fn parse_element(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    empty: bool,
) -> Result<Element, ParserError> {
    let name = String::from_utf8(start.local_name().as_ref().to_vec())
        .map_err(ParserError::ElementName)?;
    let attributes = parse_attributes(&name, start.attributes())?;
    let mut text = Vec::new();
    let mut children = Vec::new();
    if !empty {
        loop {
            let event = reader.read_event()?;
            match event {
                Event::Start(s) => children.push(parse_element(reader, &s, false)?),
                Event::Empty(s) => children.push(parse_element(reader, &s, true)?),
                Event::Text(s) => text.extend_from_slice(s.as_ref()),
                Event::CData(s) => text.extend_from_slice(&s),
                Event::GeneralRef(r) => match resolve_entity(&r) {
                    Some(c) => {
                        let mut buf = [0; 4];
                        text.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    }
                    _ => {
                        let entity = String::from_utf8_lossy(&r).into_owned();
                        return Err(ParserError::UnknownEntity(entity));
                    }
                },
                Event::End(_) => break,
                Event::Eof => return Err(ParserError::UnexpectedEof(name)),
                _ => continue,
            }
        }
    }
    let text = match String::from_utf8(text) {
        Ok(t) => t,
        Err(e) => return Err(ParserError::DecodeUtf8(name, e)),
    };
    Ok(Element {
        name,
        attributes,
        text,
        children,
    })
}
