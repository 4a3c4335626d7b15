use std::cell::OnceCell;
use std::collections::HashSet;

use log::{error, warn};

use crate::object_table::{IndirectObject, ObjectTable};
use crate::{Dictionary, Error, Object, ObjectId, Result};

/// Page attributes a `/Page` takes from its nearest ancestor when it lacks its own.
pub const INHERITABLE_KEYS: [&[u8]; 6] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate", b"Annots", b"Contents"];

/// A leaf of the page tree with inherited attributes filled in.
#[derive(Debug, Clone)]
pub struct Page {
    pub id: ObjectId,
    /// The page dictionary, including values inherited from `/Pages` ancestors.
    pub dict: Dictionary,
    /// Content streams in drawing order.
    pub contents: Vec<ObjectId>,
    content: OnceCell<Vec<u8>>,
}

impl Page {
    fn new(table: &ObjectTable, id: ObjectId, dict: Dictionary) -> Result<Page> {
        let contents = content_streams(table, &dict)?;
        Ok(Page {
            id,
            dict,
            contents,
            content: OnceCell::new(),
        })
    }

    pub fn media_box(&self) -> Result<&Vec<Object>> {
        self.dict.get(b"MediaBox").and_then(Object::as_array)
    }

    pub fn rotate(&self) -> i64 {
        self.dict.find_value(b"Rotate").as_i64().unwrap_or(0)
    }

    /// Joined content bytes, decoded on first use with `decode`.
    pub(crate) fn content_with<F>(&self, table: &ObjectTable, decode: F) -> Result<&[u8]>
    where
        F: Fn(&IndirectObject) -> Result<Vec<u8>>,
    {
        if let Some(content) = self.content.get() {
            return Ok(content);
        }
        let content = join_contents(table, &self.contents, decode)?;
        Ok(self.content.get_or_init(|| content))
    }
}

/// Walk the page tree below the catalog's `/Pages` in document order.
pub fn collect_pages(table: &ObjectTable, catalog: &Dictionary) -> Result<Vec<Page>> {
    let root = catalog.get(b"Pages").and_then(Object::as_reference).map_err(|_| {
        error!("catalog has no /Pages reference");
        Error::PageTree("catalog /Pages must be a reference".to_string())
    })?;

    let mut pages = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![(root, Dictionary::new())];

    while let Some((id, inherited)) = stack.pop() {
        if !visited.insert(id) {
            warn!("page tree node {} {} visited twice, skipped", id.0, id.1);
            continue;
        }
        let Some(dict) = table.resolve(id).and_then(|object| object.dict().ok()) else {
            warn!("page tree node {} {} is not a dictionary, skipped", id.0, id.1);
            continue;
        };

        if dict.type_is(b"Pages") {
            let mut inherited = inherited;
            for key in INHERITABLE_KEYS {
                if let Ok(value) = dict.get(key) {
                    inherited.set(key, value.clone());
                }
            }

            let kids = table.get_in(dict, b"Kids").and_then(Object::as_array).map_err(|_| {
                error!("pages node {} {} has no /Kids array", id.0, id.1);
                Error::PageTree(format!("pages node {} {} has no /Kids", id.0, id.1))
            })?;
            // Reversed so the first kid is visited first.
            for kid in kids.iter().rev() {
                match kid {
                    Object::Reference(kid) => stack.push((*kid, inherited.clone())),
                    _ => warn!("direct /Kids entry in pages node {} {} skipped", id.0, id.1),
                }
            }
        } else if dict.type_is(b"Page") {
            let mut dict = dict.clone();
            for (key, value) in &inherited {
                if !dict.has(key) {
                    dict.set(key.clone(), value.clone());
                }
            }
            if !dict.has(b"MediaBox") {
                error!("page {} {} has no /MediaBox", id.0, id.1);
                return Err(Error::PageTree(format!("page {} {} has no /MediaBox", id.0, id.1)));
            }
            pages.push(Page::new(table, id, dict)?);
        }
    }
    Ok(pages)
}

/// Content stream ids named by `/Contents`.
fn content_streams(table: &ObjectTable, dict: &Dictionary) -> Result<Vec<ObjectId>> {
    let page_error = |message: String| {
        error!("{}", message);
        Error::PageContents(message)
    };

    let parts = match dict.get(b"Contents") {
        Err(_) | Ok(Object::Null) => return Ok(Vec::new()),
        Ok(Object::Reference(id)) => match table.resolve(*id) {
            Some(object) if object.is_stream() => return Ok(vec![*id]),
            Some(object) => object.value.as_array().map_err(|_| {
                page_error(format!("/Contents {} {} is neither a stream nor an array", id.0, id.1))
            })?,
            None => return Err(page_error(format!("/Contents {} {} is missing", id.0, id.1))),
        },
        Ok(Object::Array(parts)) => parts,
        Ok(other) => return Err(page_error(format!("/Contents is a {}", other.enum_variant()))),
    };

    parts
        .iter()
        .map(|part| {
            let id = part
                .as_reference()
                .map_err(|_| page_error("/Contents array entry is not a reference".to_string()))?;
            match table.resolve(id) {
                Some(object) if object.is_stream() => Ok(id),
                _ => Err(page_error(format!("/Contents entry {} {} is not a stream", id.0, id.1))),
            }
        })
        .collect()
}

/// Decode and concatenate content streams, separated by a newline.
///
/// With several streams, empty ones are skipped.
fn join_contents<F>(table: &ObjectTable, contents: &[ObjectId], decode: F) -> Result<Vec<u8>>
where
    F: Fn(&IndirectObject) -> Result<Vec<u8>>,
{
    let streams = contents
        .iter()
        .map(|&id| table.resolve(id).ok_or(Error::ObjectNotFound(id)))
        .collect::<Result<Vec<_>>>()?;

    if let [single] = streams.as_slice() {
        return decode(single);
    }

    let mut joined = Vec::new();
    for (index, stream) in streams.into_iter().filter(|stream| stream.stream_length() > 0).enumerate() {
        if index > 0 {
            joined.push(b'\n');
        }
        joined.extend(decode(stream)?);
    }
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;
    use crate::object_table::{ObjectKind, ObjectLocation, StreamSpan};

    fn insert(table: &mut ObjectTable, number: u32, dict: Dictionary) {
        let mut object = IndirectObject::new((number, 0), ObjectLocation::Offset(0));
        object.set_value(Object::Dictionary(dict));
        table.insert(object);
    }

    fn insert_stream(table: &mut ObjectTable, number: u32, length: usize) {
        let mut object = IndirectObject::new((number, 0), ObjectLocation::Offset(0));
        object.set_value(Object::Dictionary(dictionary! { "Length" => length as i64 }));
        object.kind = ObjectKind::Stream;
        object.stream = Some(StreamSpan { start: 0, length });
        table.insert(object);
    }

    fn refs(numbers: &[u32]) -> Object {
        Object::Array(numbers.iter().map(|&n| Object::Reference((n, 0))).collect())
    }

    fn media_box() -> Object {
        Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()])
    }

    fn catalog() -> Dictionary {
        dictionary! { "Type" => "Catalog", "Pages" => Object::Reference((2, 0)) }
    }

    #[test]
    fn inherits_media_box_and_keeps_own_rotate() {
        let mut table = ObjectTable::new();
        insert(&mut table, 2, dictionary! {
            "Type" => "Pages",
            "Kids" => refs(&[3, 4]),
            "MediaBox" => media_box(),
            "Rotate" => 0,
        });
        insert(&mut table, 3, dictionary! { "Type" => "Page", "Rotate" => 90 });
        insert(&mut table, 4, dictionary! { "Type" => "Pages", "Kids" => refs(&[5]), "Rotate" => 180 });
        insert(&mut table, 5, dictionary! { "Type" => "Page" });

        let pages = collect_pages(&table, &catalog()).unwrap();
        assert_eq!(pages.iter().map(|page| page.id).collect::<Vec<_>>(), vec![(3, 0), (5, 0)]);
        assert_eq!(pages[0].dict.get(b"MediaBox").unwrap(), &media_box());
        assert_eq!(pages[0].rotate(), 90);
        assert_eq!(pages[1].rotate(), 180);
        assert_eq!(pages[1].media_box().unwrap().len(), 4);
    }

    #[test]
    fn page_without_media_box_is_rejected() {
        let mut table = ObjectTable::new();
        insert(&mut table, 2, dictionary! { "Type" => "Pages", "Kids" => refs(&[3]) });
        insert(&mut table, 3, dictionary! { "Type" => "Page" });
        assert!(matches!(collect_pages(&table, &catalog()), Err(Error::PageTree(_))));
    }

    #[test]
    fn pages_node_requires_kids() {
        let mut table = ObjectTable::new();
        insert(&mut table, 2, dictionary! { "Type" => "Pages", "MediaBox" => media_box() });
        assert!(matches!(collect_pages(&table, &catalog()), Err(Error::PageTree(_))));
        assert!(matches!(
            collect_pages(&table, &dictionary! { "Pages" => 2 }),
            Err(Error::PageTree(_))
        ));
    }

    #[test]
    fn cycles_are_cut() {
        let mut table = ObjectTable::new();
        insert(&mut table, 2, dictionary! {
            "Type" => "Pages",
            "Kids" => refs(&[3, 2, 3]),
            "MediaBox" => media_box(),
        });
        insert(&mut table, 3, dictionary! { "Type" => "Page" });
        assert_eq!(collect_pages(&table, &catalog()).unwrap().len(), 1);
    }

    #[test]
    fn contents_forms() {
        let mut table = ObjectTable::new();
        insert_stream(&mut table, 10, 3);
        insert_stream(&mut table, 11, 0);
        insert_stream(&mut table, 12, 2);
        let mut array = IndirectObject::new((13, 0), ObjectLocation::Offset(0));
        array.set_value(refs(&[10, 12]));
        table.insert(array);
        insert(&mut table, 14, dictionary! {});

        let streams = |contents: Object| content_streams(&table, &dictionary! { "Contents" => contents });
        assert!(content_streams(&table, &dictionary! {}).unwrap().is_empty());
        assert_eq!(streams(Object::Reference((10, 0))).unwrap(), vec![(10, 0)]);
        assert_eq!(streams(Object::Reference((13, 0))).unwrap(), vec![(10, 0), (12, 0)]);
        assert_eq!(streams(refs(&[10, 11, 12])).unwrap().len(), 3);
        assert!(matches!(streams(refs(&[10, 14])), Err(Error::PageContents(_))));
        assert!(matches!(streams(Object::Reference((14, 0))), Err(Error::PageContents(_))));
        assert!(matches!(streams(Object::Integer(1)), Err(Error::PageContents(_))));
    }

    #[test]
    fn joins_non_empty_parts_with_newlines() {
        let mut table = ObjectTable::new();
        insert_stream(&mut table, 10, 3);
        insert_stream(&mut table, 11, 0);
        insert_stream(&mut table, 12, 2);
        let decode = |object: &IndirectObject| Ok(format!("part{}", object.id.0).into_bytes());

        let joined = join_contents(&table, &[(10, 0), (11, 0), (12, 0)], decode).unwrap();
        assert_eq!(joined, b"part10\npart12");
        assert_eq!(join_contents(&table, &[(11, 0)], decode).unwrap(), b"part11");
        assert!(join_contents(&table, &[], decode).unwrap().is_empty());
    }

    #[test]
    fn content_is_decoded_once() {
        let mut table = ObjectTable::new();
        insert_stream(&mut table, 10, 3);
        let page = Page::new(&table, (3, 0), dictionary! { "Contents" => Object::Reference((10, 0)) }).unwrap();
        let calls = std::cell::Cell::new(0);
        let decode = |_: &IndirectObject| {
            calls.set(calls.get() + 1);
            Ok(b"BT ET".to_vec())
        };
        assert_eq!(page.content_with(&table, decode).unwrap(), b"BT ET");
        assert_eq!(page.content_with(&table, decode).unwrap(), b"BT ET");
        assert_eq!(calls.get(), 1);
    }
}
