use std::collections::{BTreeSet, HashMap, HashSet};

use log::{debug, error, warn};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::encryption::SecurityHandler;
use crate::error::{ParseError, XrefError};
use crate::filters::{self, DecodedStream};
use crate::load_options::{LoadOptions, MIN_FILE_SIZE};
use crate::object::TOMBSTONE_GENERATION;
use crate::object_table::{IndirectObject, ObjectKind, ObjectLocation, ObjectTable, StreamSpan};
use crate::parser::{self, ParsedObject, Tokenizer};
use crate::xref::{self, XrefEntry, XrefRecord};
use crate::{Dictionary, Error, Keyword, Object, Result};

/// Bytes at the end of the file searched for `startxref` and `%%EOF`.
const TAIL_LENGTH: usize = 1024;

/// Steps of a load, in order. Each step requires the previous one to be complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadPhase {
    Created,
    Validated,
    XrefChain,
    Classified,
    StreamLengths,
    Decrypted,
    ObjectStreams,
}

/// Everything a load produces.
pub struct LoadedFile {
    pub version: String,
    pub trailer: Dictionary,
    pub table: ObjectTable,
    pub security: Option<SecurityHandler>,
    pub invalid: bool,
    /// Bytes before the `%PDF-` signature. Stream positions are relative to it.
    pub header_offset: usize,
}

pub struct Reader<'a> {
    buffer: &'a [u8],
    options: &'a LoadOptions,
    phase: LoadPhase,
    header_offset: usize,
    version: String,
    trailer: Dictionary,
    table: ObjectTable,
    security: Option<SecurityHandler>,
    invalid: bool,
}

impl<'a> Reader<'a> {
    pub fn new(buffer: &'a [u8], options: &'a LoadOptions) -> Self {
        Reader {
            buffer,
            options,
            phase: LoadPhase::Created,
            header_offset: 0,
            version: String::new(),
            trailer: Dictionary::new(),
            table: ObjectTable::new(),
            security: None,
            invalid: false,
        }
    }

    /// Read whole document.
    pub fn read(mut self) -> Result<LoadedFile> {
        let start = self.validate()?;
        self.read_xref_chain(start)?;
        self.classify_objects();
        self.resolve_stream_lengths();
        self.setup_security()?;
        self.expand_object_streams();

        Ok(LoadedFile {
            version: self.version,
            trailer: self.trailer,
            table: self.table,
            security: self.security,
            invalid: self.invalid,
            header_offset: self.header_offset,
        })
    }

    fn advance(&mut self, from: LoadPhase, to: LoadPhase) {
        debug_assert_eq!(self.phase, from, "load phase {:?} entered out of order", to);
        debug!("load phase {:?}", to);
        self.phase = to;
    }

    /// Check size and signature, and return the `startxref` offset.
    fn validate(&mut self) -> Result<usize> {
        let size = self.buffer.len() as u64;
        if !(MIN_FILE_SIZE..=self.options.file_size_limit()).contains(&size) {
            error!("file size {} is out of range", size);
            return Err(XrefError::FileSize(size).into());
        }

        let (version, header_offset) = parser::header(self.buffer).ok_or_else(|| {
            error!("missing %PDF-1.x signature");
            XrefError::Header
        })?;
        if header_offset > 0 {
            debug!("{} bytes before the signature, offsets are counted from it", header_offset);
        }
        self.version = version;
        self.header_offset = header_offset;
        let buffer = self.buffer;
        self.buffer = &buffer[header_offset..];

        let start = xref_start(self.buffer).inspect_err(|err| error!("{}", err))?;
        self.advance(LoadPhase::Created, LoadPhase::Validated);
        Ok(start)
    }

    /// Walk the sections from newest to oldest through `/Prev`.
    fn read_xref_chain(&mut self, start: usize) -> Result<()> {
        let mut seen = HashSet::new();
        let mut newest = None;
        let mut position = start;
        loop {
            if !seen.insert(position) {
                warn!("cross reference chain loops back to offset {}", position);
                break;
            }

            let section_trailer = self.read_xref_section(position)?;
            let prev = self.offset_entry(&section_trailer, b"Prev", XrefError::PrevStart)?;
            if newest.is_none() {
                newest = Some(section_trailer);
            }
            match prev {
                Some(prev) => position = prev,
                None => break,
            }
        }

        let trailer = newest.ok_or(XrefError::Trailer)?;
        match trailer.get(b"Size").and_then(Object::as_i64) {
            Ok(size) if size > 0 => {
                let expected = self.table.iter().map(|object| i64::from(object.id.0) + 1).max().unwrap_or(0);
                if size != expected {
                    warn!("Size entry of trailer dictionary is {}, correct value is {}.", size, expected);
                }
            }
            _ => {
                error!("trailer has no valid /Size");
                return Err(XrefError::Trailer.into());
            }
        }
        if !trailer.has(b"Root") {
            error!("trailer has no /Root");
            return Err(XrefError::Root.into());
        }

        self.trailer = trailer;
        self.advance(LoadPhase::Validated, LoadPhase::XrefChain);
        Ok(())
    }

    /// Read a table or stream section and return its trailer dictionary.
    fn read_xref_section(&mut self, position: usize) -> Result<Dictionary> {
        let mut tokenizer = Tokenizer::new(&self.buffer[position..]);
        tokenizer.skip_space();
        let position = position + tokenizer.offset();

        if !matches!(tokenizer.peek_token(), Ok(Some(Object::Keyword(Keyword::Xref)))) {
            return self.read_xref_stream(position);
        }

        let (records, trailer) = parser::xref_and_trailer(&self.buffer[position..], position)
            .inspect_err(|err| error!("{}", err))?;
        debug!("xref table at {} with {} records", position, records.len());
        self.insert_records(records);

        // Hybrid file: the stream section belongs to this table section.
        if let Some(stream_position) = self.offset_entry(&trailer, b"XRefStm", XrefError::StreamStart)? {
            let stream_trailer = self.read_xref_stream(stream_position)?;
            if self.offset_entry(&stream_trailer, b"Prev", XrefError::StreamStart)?.is_some() {
                error!("/XRefStm section at {} has its own /Prev", stream_position);
                return Err(XrefError::StreamStart.into());
            }
        }
        Ok(trailer)
    }

    fn read_xref_stream(&mut self, position: usize) -> Result<Dictionary> {
        let mut tokenizer = Tokenizer::new(self.buffer);
        tokenizer.seek(position);
        let number = match tokenizer.next_token() {
            Ok(Some(Object::Integer(number))) => u32::try_from(number).ok(),
            _ => None,
        }
        .ok_or_else(|| {
            error!("no xref table or stream at offset {}", position);
            XrefError::Parse
        })?;

        let ParsedObject { value, stream_start, .. } = parser::indirect_object(self.buffer, position, number)?;
        let (Object::Dictionary(dict), Some(start)) = (value, stream_start) else {
            error!("object at offset {} is not a cross reference stream", position);
            return Err(XrefError::Parse.into());
        };

        let length = self.xref_stream_length(&dict, start)?;
        let stages = filters::filter_chain(&self.table, &dict)?;
        let data = filters::decode(&stages, &self.buffer[start..start + length])?.data;
        let records = xref::decode_xref_stream(&dict, &data)?;
        debug!("xref stream {} at {} with {} records", number, position, records.len());
        self.insert_records(records);
        Ok(dict)
    }

    /// `/Length` of a cross reference stream. Objects are not classified yet, so an
    /// indirect length is replaced by a scan for `endstream`.
    fn xref_stream_length(&self, dict: &Dictionary, start: usize) -> Result<usize> {
        let data = &self.buffer[start..];
        if let Ok(length) = dict.get(b"Length").and_then(Object::as_i64) {
            return usize::try_from(length)
                .ok()
                .filter(|&length| length <= data.len())
                .ok_or_else(|| XrefError::Parse.into());
        }

        warn!("cross reference stream at {} has no direct /Length", start);
        let end = data
            .windows(9)
            .position(|window| window == b"endstream")
            .ok_or(XrefError::Parse)?;
        let data = &data[..end];
        let data = data.strip_suffix(b"\n").unwrap_or(data);
        let data = data.strip_suffix(b"\r").unwrap_or(data);
        Ok(data.len())
    }

    /// Offset stored under `key`; absent or zero means none.
    fn offset_entry(&self, dict: &Dictionary, key: &[u8], err: XrefError) -> Result<Option<usize>> {
        let Ok(value) = dict.get(key) else {
            return Ok(None);
        };
        match value.as_i64() {
            Ok(0) => Ok(None),
            Ok(offset) if offset > 0 && (offset as u64) < self.buffer.len() as u64 => Ok(Some(offset as usize)),
            _ => {
                error!("invalid /{} value {:?}", String::from_utf8_lossy(key), value);
                Err(err.into())
            }
        }
    }

    fn insert_records(&mut self, records: Vec<XrefRecord>) {
        for XrefRecord { number, entry } in records {
            let object = match entry {
                XrefEntry::Free { generation: TOMBSTONE_GENERATION }
                | XrefEntry::Normal { generation: TOMBSTONE_GENERATION, .. } => IndirectObject::tombstone(number),
                XrefEntry::Free { .. } => continue,
                XrefEntry::Normal { offset, generation } => {
                    IndirectObject::new((number, generation), ObjectLocation::Offset(offset))
                }
                XrefEntry::Compressed { container, index } => {
                    IndirectObject::new((number, 0), ObjectLocation::Compressed { container, index })
                }
            };
            self.table.insert(object);
        }
    }

    /// Parse every object stored at a file offset, shadowed versions included.
    fn classify_objects(&mut self) {
        self.advance(LoadPhase::XrefChain, LoadPhase::Classified);

        let jobs: Vec<Option<(u32, u64)>> = self
            .table
            .iter()
            .map(|object| match object.location {
                ObjectLocation::Offset(offset) => Some((object.id.0, offset)),
                _ => None,
            })
            .collect();
        let buffer = self.buffer;
        let parse = |job: &Option<(u32, u64)>| job.map(|(number, offset)| parse_object_at(buffer, number, offset));

        #[cfg(feature = "rayon")]
        let results: Vec<_> = jobs.par_iter().map(parse).collect();
        #[cfg(not(feature = "rayon"))]
        let results: Vec<_> = jobs.iter().map(parse).collect();

        let mut invalid = false;
        for (object, result) in self.table.iter_mut().zip(results) {
            match result {
                None => {}
                Some(Ok(parsed)) => {
                    if parsed.id.1 != object.id.1 {
                        warn!(
                            "object {} has generation {} in its header but {} in the cross reference",
                            object.id.0, parsed.id.1, object.id.1
                        );
                    }
                    object.set_value(parsed.value);
                    if let Some(start) = parsed.stream_start {
                        object.kind = ObjectKind::Stream;
                        object.stream = Some(StreamSpan { start, length: 0 });
                    }
                }
                Some(Err(err)) => {
                    error!("Object load error for {} {}: {}", object.id.0, object.id.1, err);
                    invalid = true;
                }
            }
        }
        self.invalid |= invalid;
    }

    /// Resolve `/Length` of every stream and check that `endstream endobj` follows.
    fn resolve_stream_lengths(&mut self) {
        self.advance(LoadPhase::Classified, LoadPhase::StreamLengths);

        let lengths: Vec<Option<Result<usize>>> = self
            .table
            .iter()
            .map(|object| object.stream.map(|span| self.verified_length(object, span.start)))
            .collect();

        let mut invalid = false;
        for (object, length) in self.table.iter_mut().zip(lengths) {
            let id = object.id;
            let (Some(span), Some(length)) = (object.stream.as_mut(), length) else {
                continue;
            };
            span.length = length.unwrap_or_else(|err| {
                warn!("stream {} {} demoted to zero length: {}", id.0, id.1, err);
                invalid = true;
                0
            });
        }
        self.invalid |= invalid;
    }

    fn verified_length(&self, object: &IndirectObject, start: usize) -> Result<usize> {
        let length = self.table.get_in(object.dict()?, b"Length")?.as_i64()?;
        let length = usize::try_from(length).map_err(|_| Error::NumericRange("Length"))?;
        let end = start
            .checked_add(length)
            .filter(|&end| end <= self.buffer.len())
            .ok_or(ParseError::Expected {
                expected: "stream data",
                offset: start,
            })?;
        if !parser::stream_terminated(&self.buffer[end..]) {
            return Err(ParseError::Expected {
                expected: "endstream endobj",
                offset: end,
            }
            .into());
        }
        Ok(length)
    }

    /// Authenticate the password and decrypt all strings.
    fn setup_security(&mut self) -> Result<()> {
        self.advance(LoadPhase::StreamLengths, LoadPhase::Decrypted);

        let Ok(encrypt) = self.trailer.get(b"Encrypt") else {
            return Ok(());
        };
        let encrypt_id = encrypt.as_reference().ok();
        let dict = self.table.dereference(encrypt).and_then(Object::as_dict)?;
        let document_id = self
            .trailer
            .get(b"ID")
            .and_then(|id| self.table.dereference(id))
            .and_then(Object::as_array)
            .ok()
            .and_then(|ids| ids.first())
            .and_then(|id| id.as_str().ok())
            .ok_or_else(|| {
                error!("encrypted document has no /ID");
                XrefError::MissingId
            })?;

        let handler = SecurityHandler::new(dict, document_id, self.options.password())?;
        debug!("authenticated with {}", handler.status());

        for object in self.table.iter_mut() {
            let is_xref_stream = object.is_stream() && object.dict().is_ok_and(|dict| dict.type_is(b"XRef"));
            if Some(object.id) == encrypt_id || is_xref_stream {
                continue;
            }
            handler.decrypt_strings(object.id, &mut object.value);
        }
        self.security = Some(handler);
        Ok(())
    }

    /// Parse the members of every object stream that a compressed entry points into.
    fn expand_object_streams(&mut self) {
        self.advance(LoadPhase::Decrypted, LoadPhase::ObjectStreams);

        let containers: BTreeSet<u32> = self
            .table
            .iter()
            .filter_map(|object| match object.location {
                ObjectLocation::Compressed { container, .. } => Some(container),
                _ => None,
            })
            .collect();

        let mut members = HashMap::new();
        for container in containers {
            match self.read_object_stream(container) {
                Ok(objects) => {
                    for (index, member) in objects.into_iter().enumerate() {
                        members.insert((container, index as u32), member);
                    }
                }
                Err(err) => {
                    error!("{}", err);
                    self.invalid = true;
                }
            }
        }

        let mut invalid = false;
        for object in self.table.iter_mut() {
            let ObjectLocation::Compressed { container, index } = object.location else {
                continue;
            };
            match members.get(&(container, index)) {
                Some((number, Ok(value))) => {
                    if *number != object.id.0 {
                        warn!(
                            "object stream {} index {} holds object {}, expected {}",
                            container, index, number, object.id.0
                        );
                    }
                    object.set_value(value.clone());
                }
                Some((number, Err(err))) => {
                    error!("object {} in object stream {}: {}", number, container, err);
                    invalid = true;
                }
                None => {
                    warn!("object {} not found in object stream {} at index {}", object.id.0, container, index);
                }
            }
        }
        self.invalid |= invalid;
    }

    fn read_object_stream(&self, container: u32) -> Result<Vec<(u32, std::result::Result<Object, ParseError>)>> {
        let invalid = |reason: &str| Error::ObjectStream(container, reason.to_string());

        let object = self
            .table
            .resolve((container, 0))
            .filter(|object| object.is_stream())
            .ok_or_else(|| invalid("container is not a stream"))?;
        let dict = object.dict()?;
        let data = decode_stream(self.buffer, &self.table, self.security.as_ref(), object)?.data;

        let count = self.table.get_in(dict, b"N")?.as_i64()?;
        let first = self.table.get_in(dict, b"First")?.as_i64()?;
        let (count, first) = match (usize::try_from(count), usize::try_from(first)) {
            (Ok(count), Ok(first)) if count > 0 && first <= data.len() => (count, first),
            _ => return Err(invalid("invalid /N or /First")),
        };

        let header = parser::object_stream_header(&data[..first], count).ok_or_else(|| invalid("invalid header"))?;
        let mut tokenizer = Tokenizer::new(&data);
        Ok(header
            .into_iter()
            .map(|(number, offset)| {
                tokenizer.seek(first.saturating_add(offset));
                (number, tokenizer.next_value())
            })
            .collect())
    }
}

/// Offset of `startxref` value, searched in the last kilobyte.
fn xref_start(buffer: &[u8]) -> Result<usize> {
    let tail = &buffer[buffer.len().saturating_sub(TAIL_LENGTH)..];
    let eof = rfind(tail, b"%%EOF").ok_or(XrefError::Start)?;
    let keyword = rfind(&tail[..eof], b"startxref").ok_or(XrefError::Start)?;
    let offset = parser::xref_start(&tail[keyword..]).ok_or(XrefError::Start)?;
    usize::try_from(offset)
        .ok()
        .filter(|&offset| offset < buffer.len())
        .ok_or_else(|| XrefError::Start.into())
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|window| window == needle)
}

fn parse_object_at(buffer: &[u8], number: u32, offset: u64) -> Result<ParsedObject> {
    if offset >= buffer.len() as u64 {
        return Err(ParseError::IndirectObject(offset as usize).into());
    }
    parser::indirect_object(buffer, offset as usize, number)
}

/// Stream data as stored in the file, decrypted unless it is a cross reference stream.
pub(crate) fn stream_bytes(
    buffer: &[u8], security: Option<&SecurityHandler>, object: &IndirectObject,
) -> Result<Vec<u8>> {
    let span = object.stream.ok_or(Error::ObjectType {
        expected: "Stream",
        found: object.description(),
    })?;
    let raw = buffer.get(span.range()).ok_or(ParseError::EndOfInput)?;
    match security {
        Some(handler) if !object.dict().is_ok_and(|dict| dict.type_is(b"XRef")) => {
            Ok(handler.decrypt_stream(object.id, raw)?)
        }
        _ => Ok(raw.to_vec()),
    }
}

/// Stream data after decryption and the `/Filter` chain.
pub(crate) fn decode_stream(
    buffer: &[u8], table: &ObjectTable, security: Option<&SecurityHandler>, object: &IndirectObject,
) -> Result<DecodedStream> {
    let raw = stream_bytes(buffer, security, object)?;
    let stages = filters::filter_chain(table, object.dict()?)?;
    filters::decode(&stages, &raw)
}
