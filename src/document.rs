use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::error;

use crate::content::Content;
use crate::encryption::{DecryptionStatus, Permissions, SecurityHandler};
use crate::error::XrefError;
use crate::filters::DecodedStream;
use crate::load_options::LoadOptions;
use crate::object_table::{IndirectObject, ObjectTable};
use crate::pages::{self, Page};
use crate::reader::{self, Reader};
use crate::xobject::ImageXObject;
use crate::{Dictionary, Error, Object, ObjectId, Result};

/// A loaded PDF file.
///
/// Everything is read and checked by the time a `Document` exists; the
/// accessors only look things up. Stream data stays in the file buffer and is
/// decrypted and decoded on request.
pub struct Document {
    buffer: Vec<u8>,
    version: String,
    trailer: Dictionary,
    table: ObjectTable,
    security: Option<SecurityHandler>,
    invalid: bool,
    pages: Vec<Page>,
}

impl Document {
    /// Load a PDF document from a file, with an optional owner or user password.
    ///
    /// A wrong password or an unsupported encryption method fails with
    /// [`Error::Protected`]; see [`Error::status`].
    pub fn open<P: AsRef<Path>>(path: P, password: Option<&str>) -> Result<Document> {
        let options = LoadOptions {
            password: password.map(str::to_string),
            ..LoadOptions::default()
        };
        Self::load_with_options(path, &options)
    }

    pub fn load_with_options<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Document> {
        let mut file = File::open(path)?;
        let size = file.metadata()?.len();
        if size > options.file_size_limit() {
            error!("file size {} exceeds the limit of {} bytes", size, options.file_size_limit());
            return Err(XrefError::FileSize(size).into());
        }

        let mut buffer = Vec::with_capacity(size as usize);
        file.read_to_end(&mut buffer)?;
        Self::load_buffer(buffer, options)
    }

    /// Load a PDF document from a memory slice.
    pub fn load_mem(buffer: &[u8], options: &LoadOptions) -> Result<Document> {
        Self::load_buffer(buffer.to_vec(), options)
    }

    fn load_buffer(mut buffer: Vec<u8>, options: &LoadOptions) -> Result<Document> {
        let loaded = Reader::new(&buffer, options).read()?;
        // Stream positions are relative to the signature.
        buffer.drain(..loaded.header_offset);
        let catalog = loaded.table.get_in(&loaded.trailer, b"Root").and_then(Object::as_dict)?;
        let pages = pages::collect_pages(&loaded.table, catalog)?;

        Ok(Document {
            version: loaded.version,
            trailer: loaded.trailer,
            table: loaded.table,
            security: loaded.security,
            invalid: loaded.invalid,
            pages,
            buffer,
        })
    }

    /// PDF version from the file header, such as "1.7".
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Trailer of the newest cross reference section.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn catalog(&self) -> Result<&Dictionary> {
        self.table.get_in(&self.trailer, b"Root").and_then(Object::as_dict)
    }

    /// The `/Info` dictionary, if the trailer has one.
    pub fn info(&self) -> Option<&Dictionary> {
        self.table.get_in(&self.trailer, b"Info").and_then(Object::as_dict).ok()
    }

    /// First element of the trailer `/ID` array.
    pub fn document_id(&self) -> Option<&[u8]> {
        let id = self.table.get_in(&self.trailer, b"ID").and_then(Object::as_array).ok()?;
        id.first().and_then(|first| first.as_str().ok())
    }

    /// True when a recoverable defect was found while loading.
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn is_encrypted(&self) -> bool {
        self.security.is_some()
    }

    pub fn decryption_status(&self) -> DecryptionStatus {
        self.security
            .as_ref()
            .map_or(DecryptionStatus::FileNotProtected, SecurityHandler::status)
    }

    /// Access rights granted by `/P`, everything for unencrypted files.
    pub fn permissions(&self) -> Permissions {
        self.security
            .as_ref()
            .map_or(Permissions::all(), SecurityHandler::permissions)
    }

    pub fn object_table(&self) -> &ObjectTable {
        &self.table
    }

    /// Every object version in object number order.
    pub fn objects(&self) -> impl Iterator<Item = &IndirectObject> {
        self.table.iter()
    }

    /// The live version of an indirect object.
    pub fn resolve(&self, id: ObjectId) -> Result<&IndirectObject> {
        self.table.resolve(id).ok_or(Error::ObjectNotFound(id))
    }

    pub fn get_object(&self, id: ObjectId) -> Result<&Object> {
        self.table.get(id)
    }

    /// Follow references until a direct value is reached.
    pub fn dereference<'a>(&'a self, object: &'a Object) -> Result<&'a Object> {
        self.table.dereference(object)
    }

    pub fn get_dictionary(&self, id: ObjectId) -> Result<&Dictionary> {
        self.get_object(id).and_then(Object::as_dict)
    }

    /// Stream data as stored in the file, decrypted but still filtered.
    pub fn raw_stream(&self, id: ObjectId) -> Result<Vec<u8>> {
        reader::stream_bytes(&self.buffer, self.security.as_ref(), self.resolve(id)?)
    }

    /// Stream data with the `/Filter` chain applied.
    pub fn decoded_stream(&self, id: ObjectId) -> Result<DecodedStream> {
        self.decode(self.resolve(id)?)
    }

    fn decode(&self, object: &IndirectObject) -> Result<DecodedStream> {
        reader::decode_stream(&self.buffer, &self.table, self.security.as_ref(), object)
    }

    /// Describe an image XObject and decode its data.
    pub fn image_xobject(&self, id: ObjectId) -> Result<ImageXObject> {
        let object = self.resolve(id)?;
        let decoded = self.decode(object)?;
        ImageXObject::new(&self.table, object, decoded)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Page by zero based index.
    pub fn page(&self, index: usize) -> Result<&Page> {
        self.pages.get(index).ok_or(Error::PageIndex(index))
    }

    /// Decoded content of a page, all content streams joined.
    pub fn page_content(&self, index: usize) -> Result<&[u8]> {
        let page = self.page(index)?;
        page.content_with(&self.table, |object| self.decode(object).map(|decoded| decoded.data))
    }

    pub fn page_operations(&self, index: usize) -> Result<Content> {
        Ok(Content::decode(self.page_content(index)?)?)
    }
}
