use std::collections::{BTreeMap, HashSet};

use log::warn;

use crate::object::TOMBSTONE_GENERATION;
use crate::{Dictionary, Error, Object, ObjectId, Result};

/// Where the bytes of an indirect object live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectLocation {
    /// Absolute byte offset of the `n g obj` header.
    Offset(u64),
    /// Member `index` of the object stream numbered `container`.
    Compressed { container: u32, index: u32 },
    /// Deleted object, no bytes.
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Not parsed yet, or parsing failed.
    Unresolved,
    /// Deleted object.
    Free,
    /// Any value other than a dictionary.
    Other,
    Dictionary,
    /// Dictionary followed by stream data.
    Stream,
}

/// Position of stream data inside the file buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpan {
    pub start: usize,
    pub length: usize,
}

impl StreamSpan {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.length
    }
}

/// One version of an indirect object.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    pub id: ObjectId,
    pub location: ObjectLocation,
    pub kind: ObjectKind,
    pub value: Object,
    pub stream: Option<StreamSpan>,
}

impl IndirectObject {
    pub fn new(id: ObjectId, location: ObjectLocation) -> Self {
        IndirectObject {
            id,
            location,
            kind: ObjectKind::Unresolved,
            value: Object::Null,
            stream: None,
        }
    }

    pub fn tombstone(number: u32) -> Self {
        IndirectObject {
            id: (number, TOMBSTONE_GENERATION),
            location: ObjectLocation::Deleted,
            kind: ObjectKind::Free,
            value: Object::Null,
            stream: None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.kind == ObjectKind::Free || self.id.1 == TOMBSTONE_GENERATION
    }

    pub fn is_stream(&self) -> bool {
        self.kind == ObjectKind::Stream
    }

    /// Dictionary of a dictionary or stream object.
    pub fn dict(&self) -> Result<&Dictionary> {
        self.value.as_dict()
    }

    /// The `/Type` name of a dictionary or stream object.
    pub fn type_name(&self) -> Option<&str> {
        self.value.type_name().ok()
    }

    /// Resolved `/Length` of stream data, 0 for other objects.
    pub fn stream_length(&self) -> usize {
        self.stream.map_or(0, |span| span.length)
    }

    /// One word summary used in object listings.
    pub fn description(&self) -> &'static str {
        match self.kind {
            ObjectKind::Unresolved => "Unresolved",
            ObjectKind::Free => "Free",
            ObjectKind::Dictionary => "Dictionary",
            ObjectKind::Stream => "Stream",
            ObjectKind::Other => self.value.enum_variant(),
        }
    }

    pub(crate) fn set_value(&mut self, value: Object) {
        self.kind = match value {
            Object::Dictionary(_) => ObjectKind::Dictionary,
            _ => ObjectKind::Other,
        };
        self.value = value;
    }
}

/// Object number to versions, in the order the cross reference chain was read.
///
/// The newest section is read first, so the first version with a matching
/// generation is the live one. Later sections never replace it.
#[derive(Debug, Default, Clone)]
pub struct ObjectTable {
    objects: BTreeMap<u32, Vec<IndirectObject>>,
}

impl ObjectTable {
    pub fn new() -> Self {
        ObjectTable::default()
    }

    pub fn insert(&mut self, object: IndirectObject) {
        self.objects.entry(object.id.0).or_default().push(object);
    }

    /// Number of object versions.
    pub fn len(&self) -> usize {
        self.objects.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Every version of one object number.
    pub fn versions(&self, number: u32) -> &[IndirectObject] {
        self.objects.get(&number).map_or(&[][..], Vec::as_slice)
    }

    fn slot(&self, id: ObjectId) -> Option<usize> {
        let versions = self.objects.get(&id.0)?;
        if let Some(slot) = versions.iter().position(|object| object.id.1 == id.1) {
            return (!versions[slot].is_tombstone()).then_some(slot);
        }
        if versions.iter().any(IndirectObject::is_tombstone) {
            return None;
        }

        // Highest generation, earliest inserted on ties.
        versions
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|(_, object)| object.id.1)
            .map(|(slot, _)| slot)
    }

    /// Find the live version of `id`.
    ///
    /// An exact generation match wins. Without one, a deleted entry for the
    /// same number hides every other version; otherwise the highest generation
    /// is used.
    pub fn resolve(&self, id: ObjectId) -> Option<&IndirectObject> {
        let slot = self.slot(id)?;
        self.objects.get(&id.0).map(|versions| &versions[slot])
    }

    pub fn resolve_mut(&mut self, id: ObjectId) -> Option<&mut IndirectObject> {
        let slot = self.slot(id)?;
        self.objects.get_mut(&id.0).map(|versions| &mut versions[slot])
    }

    /// Value of a resolved object.
    pub fn get(&self, id: ObjectId) -> Result<&Object> {
        self.resolve(id)
            .map(|object| &object.value)
            .ok_or(Error::ObjectNotFound(id))
    }

    /// Follow references until a direct value is reached.
    pub fn dereference<'a>(&'a self, mut object: &'a Object) -> Result<&'a Object> {
        let mut seen = HashSet::new();
        while let Object::Reference(id) = *object {
            if !seen.insert(id) {
                warn!("reference cycle detected resolving object {} {}", id.0, id.1);
                return Err(Error::ReferenceCycle(id));
            }
            object = self.get(id)?;
        }
        Ok(object)
    }

    /// Look up `key` in `dict` and dereference the value.
    pub fn get_in<'a>(&'a self, dict: &'a Dictionary, key: &[u8]) -> Result<&'a Object> {
        self.dereference(dict.get(key)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndirectObject> {
        self.objects.values().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut IndirectObject> {
        self.objects.values_mut().flatten()
    }
}
