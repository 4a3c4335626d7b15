use thiserror::Error;

use crate::encryption::{DecryptionError, DecryptionStatus};
use crate::ObjectId;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// An Object has the wrong type, e.g. the Object is an Array where a Name would be expected.
    #[error("object has wrong type; expected type {expected} but found type {found}")]
    ObjectType {
        expected: &'static str,
        found: &'static str,
    },
    /// Dictionary key was not found.
    #[error("missing required dictionary key \"{0}\"")]
    DictKey(String),
    /// The stream couldn't be decompressed.
    #[error("couldn't decompress stream: {0}")]
    Decompress(#[from] DecompressError),
    /// Failed to parse input.
    #[error("couldn't parse input: {0}")]
    Parse(#[from] ParseError),
    /// Error while validating the file or walking the cross reference chain.
    #[error("invalid cross-reference structure: {0}")]
    Xref(#[from] XrefError),
    /// Error inside the standard security handler.
    #[error("decryption error: {0}")]
    Decryption(#[from] DecryptionError),
    /// The document could not be opened with the supplied password or encryption method.
    #[error("document is protected ({0})")]
    Protected(DecryptionStatus),
    /// IO error
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
    /// Found object header does not match the cross reference entry.
    #[error("object header {found:?} does not match expected object number {expected}")]
    ObjectIdMismatch { expected: u32, found: ObjectId },
    /// The object was not found, or it was deleted.
    #[error("object {0:?} is not available")]
    ObjectNotFound(ObjectId),
    /// Page index is out of range.
    #[error("page index {0} is out of range")]
    PageIndex(usize),
    /// The page tree is malformed.
    #[error("invalid page tree: {0}")]
    PageTree(String),
    /// A page contents entry is malformed.
    #[error("invalid page contents: {0}")]
    PageContents(String),
    /// An object stream container is malformed.
    #[error("invalid object stream {0}: {1}")]
    ObjectStream(u32, String),
    /// Dereferencing object failed due to a reference cycle.
    #[error("reference cycle detected at object {0:?}")]
    ReferenceCycle(ObjectId),
    /// A numeric value is out of the range accepted for its key.
    #[error("numeric value of /{0} is out of range")]
    NumericRange(&'static str),
}

impl Error {
    /// The protection status carried by a failed load, if the failure came from the security handler.
    pub fn status(&self) -> Option<DecryptionStatus> {
        match self {
            Error::Protected(status) => Some(*status),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum DecompressError {
    #[error("unknown filter /{0}")]
    UnknownFilter(String),
    #[error("invalid zlib header")]
    ZlibHeader,
    #[error("inflate failed: {0}")]
    Inflate(String),
    #[error("adler-32 mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    Adler32 { stored: u32, computed: u32 },
    #[error("decoding LZW failed: {0}")]
    Lzw(String),
    #[error("decoding ASCII85 failed: {0}")]
    Ascii85(&'static str),
    #[error("unsupported predictor: {0}")]
    Predictor(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("unexpected end of input")]
    EndOfInput,
    #[error("invalid token at offset {0}")]
    InvalidToken(usize),
    #[error("unknown keyword \"{0}\"")]
    UnknownKeyword(String),
    #[error("expected {expected} at offset {offset}")]
    Expected { expected: &'static str, offset: usize },
    #[error("invalid indirect object header at offset {0}")]
    IndirectObject(usize),
}

#[derive(Debug, PartialEq)]
pub enum XrefError {
    /// File is larger than the configured limit or smaller than a minimal document.
    FileSize(u64),
    /// The `%PDF-1.x` signature is missing.
    Header,
    /// Could not find `startxref` and its offset.
    Start,
    /// Could not parse cross reference table or stream.
    Parse,
    /// The trailer is missing or has no valid `/Size`.
    Trailer,
    /// The trailer's "Prev" field was invalid.
    PrevStart,
    /// The trailer's "XRefStm" field was invalid.
    StreamStart,
    /// Cross reference stream has an unknown record type.
    RecordType(u64),
    /// The trailer has no `/Root` catalog.
    Root,
    /// The trailer of an encrypted document has no `/ID`.
    MissingId,
}

impl fmt::Display for XrefError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            XrefError::FileSize(size) => write!(f, "file size {} is out of range", size),
            XrefError::Header => write!(f, "invalid file signature"),
            XrefError::Start => write!(f, "invalid start value"),
            XrefError::Parse => write!(f, "could not parse xref"),
            XrefError::Trailer => write!(f, "missing or invalid trailer"),
            XrefError::PrevStart => write!(f, "invalid start value in Prev field"),
            XrefError::StreamStart => write!(f, "invalid stream start value"),
            XrefError::RecordType(kind) => write!(f, "unknown xref stream record type {}", kind),
            XrefError::Root => write!(f, "missing catalog"),
            XrefError::MissingId => write!(f, "encrypted document without /ID"),
        }
    }
}

impl std::error::Error for XrefError {}
