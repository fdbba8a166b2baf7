//! Helpers for walking lopdf object graphs

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Limit for reference chains and page-tree inheritance walks
const MAX_CHAIN: usize = 16;

/// Follow indirect references until a direct object is reached
///
/// Dangling references resolve to the reference itself.
pub(crate) fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> &'a Object {
    for _ in 0..MAX_CHAIN {
        match obj {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => obj = target,
                Err(_) => return obj,
            },
            _ => return obj,
        }
    }
    obj
}

/// Resolve a dictionary entry
pub(crate) fn get<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    dict.get(key).ok().map(|obj| resolve(doc, obj))
}

pub(crate) fn get_dict<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Dictionary> {
    match get(doc, dict, key)? {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

pub(crate) fn get_array<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Vec<Object>> {
    match get(doc, dict, key)? {
        Object::Array(a) => Some(a),
        _ => None,
    }
}

pub(crate) fn get_name<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a [u8]> {
    match get(doc, dict, key)? {
        Object::Name(n) => Some(n.as_slice()),
        _ => None,
    }
}

pub(crate) fn get_number(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<f64> {
    get(doc, dict, key).and_then(number)
}

/// Numeric value of an integer or real object
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Look up a page attribute, following the `/Parent` chain for inheritable
/// keys such as `/Resources`, `/MediaBox` and `/CropBox`
pub(crate) fn inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_CHAIN {
        if let Ok(value) = current.get(key) {
            return Some(resolve(doc, value));
        }
        match current.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => current = doc.get_dictionary(*parent_id).ok()?,
            _ => return None,
        }
    }

    None
}

/// Decoded bytes of a stream, falling back to the raw content when the
/// filter is not supported
pub(crate) fn stream_bytes(obj: &Object) -> Option<Vec<u8>> {
    match obj {
        Object::Stream(stream) => Some(
            stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone()),
        ),
        _ => None,
    }
}

/// Concatenated, decoded content streams of a page
///
/// `/Contents` may be a single stream, a reference to one, or an array of
/// either.
pub(crate) fn page_content(doc: &Document, page_dict: &Dictionary) -> Vec<u8> {
    let Ok(contents) = page_dict.get(b"Contents") else {
        return Vec::new();
    };

    match resolve(doc, contents) {
        Object::Array(parts) => {
            let mut combined = Vec::new();
            for part in parts {
                if let Some(data) = stream_bytes(resolve(doc, part)) {
                    combined.extend_from_slice(&data);
                    // Streams may split between tokens
                    combined.push(b'\n');
                }
            }
            combined
        }
        other => stream_bytes(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    #[test]
    fn test_resolve_reference_chain() {
        let mut doc = Document::with_version("1.5");
        let target = doc.add_object(Object::Integer(42));
        let middle = doc.add_object(Object::Reference(target));
        let start = Object::Reference(middle);

        assert_eq!(resolve(&doc, &start).as_i64().unwrap(), 42);
    }

    #[test]
    fn test_resolve_dangling_reference() {
        let doc = Document::with_version("1.5");
        let dangling = Object::Reference((99, 0));
        assert!(matches!(
            resolve(&doc, &dangling),
            Object::Reference((99, 0))
        ));
    }

    #[test]
    fn test_number() {
        assert_eq!(number(&Object::Integer(3)), Some(3.0));
        assert_eq!(number(&Object::Real(1.5)), Some(1.5));
        assert_eq!(number(&Object::Name(b"x".to_vec())), None);
    }

    #[test]
    fn test_inherited_media_box() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );

        let media_box = inherited(&doc, page_id, b"MediaBox").unwrap();
        assert_eq!(media_box.as_array().unwrap().len(), 4);
        assert!(inherited(&doc, page_id, b"CropBox").is_none());
    }

    #[test]
    fn test_page_content_array() {
        let mut doc = Document::with_version("1.5");
        let first = doc.add_object(Stream::new(dictionary! {}, b"BT".to_vec()));
        let second = doc.add_object(Stream::new(dictionary! {}, b"ET".to_vec()));
        let page = dictionary! {
            "Contents" => vec![first.into(), second.into()],
        };

        assert_eq!(page_content(&doc, &page), b"BT\nET\n".to_vec());
    }
}
