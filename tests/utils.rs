use std::collections::BTreeMap;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use ropdf::{Document, LoadOptions, Result};
use tempfile::NamedTempFile;

#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[allow(dead_code)]
pub fn load(bytes: &[u8]) -> Result<Document> {
    init_logger();
    Document::load_mem(bytes, &LoadOptions::default())
}

#[allow(dead_code)]
pub fn load_with_password(bytes: &[u8], password: &str) -> Result<Document> {
    init_logger();
    Document::load_mem(bytes, &LoadOptions::builder().password(password).build())
}

/// Write `bytes` to a temporary file that lives as long as the handle.
#[allow(dead_code)]
pub fn temp_file(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

enum Pending {
    InUse { generation: u16, offset: usize },
    Free { generation: u16 },
}

/// Builds PDF files section by section, tracking byte offsets.
///
/// Objects written since the last cross reference section are listed in the
/// next one, so incremental updates chain naturally through `/Prev`.
pub struct PdfBuilder {
    bytes: Vec<u8>,
    pending: BTreeMap<u32, Pending>,
}

#[allow(dead_code)]
impl PdfBuilder {
    pub fn new(version: &str) -> PdfBuilder {
        PdfBuilder {
            bytes: format!("%PDF-{}\n%\u{e2}\u{e3}\n", version).into_bytes(),
            pending: BTreeMap::new(),
        }
    }

    pub fn offset(&self) -> usize {
        self.bytes.len()
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    fn header(&mut self, number: u32, generation: u16) {
        let offset = self.offset();
        self.pending.insert(number, Pending::InUse { generation, offset });
        self.raw(format!("{} {} obj\n", number, generation).as_bytes());
    }

    pub fn object(&mut self, number: u32, generation: u16, body: &str) -> &mut Self {
        self.header(number, generation);
        self.raw(body.as_bytes()).raw(b"\nendobj\n")
    }

    /// A stream object; `/Length` is appended to `dict_entries`.
    pub fn stream(&mut self, number: u32, generation: u16, dict_entries: &str, data: &[u8]) -> &mut Self {
        self.header(number, generation);
        self.raw(format!("<< {} /Length {} >>\nstream\n", dict_entries, data.len()).as_bytes())
            .raw(data)
            .raw(b"\nendstream\nendobj\n")
    }

    pub fn free(&mut self, number: u32, generation: u16) -> &mut Self {
        self.pending.insert(number, Pending::Free { generation });
        self
    }

    /// Write a cross reference table listing the pending objects and return its offset.
    pub fn xref_table(&mut self, trailer: &str) -> usize {
        let start = self.offset();
        let mut table = String::from("xref\n");
        for (number, entry) in std::mem::take(&mut self.pending) {
            let line = match entry {
                Pending::InUse { generation, offset } => format!("{:010} {:05} n \n", offset, generation),
                Pending::Free { generation } => format!("{:010} {:05} f \n", 0, generation),
            };
            table.push_str(&format!("{} 1\n{}", number, line));
        }
        table.push_str(&format!("trailer\n{}\n", trailer));
        self.raw(table.as_bytes());
        start
    }

    /// Write an uncompressed cross reference stream with `/W [1 4 2]`.
    ///
    /// `extra` holds `(number, type, field2, field3)` records for compressed
    /// objects; pending objects are listed as type 1 records.
    pub fn xref_stream(&mut self, number: u32, extra: &[(u32, u8, u32, u16)], dict_entries: &str) -> usize {
        let start = self.offset();
        let mut records: BTreeMap<u32, (u8, u32, u16)> = extra
            .iter()
            .map(|&(number, kind, field2, field3)| (number, (kind, field2, field3)))
            .collect();
        for (number, entry) in std::mem::take(&mut self.pending) {
            let record = match entry {
                Pending::InUse { generation, offset } => (1, offset as u32, generation),
                Pending::Free { generation } => (0, 0, generation),
            };
            records.insert(number, record);
        }
        records.insert(number, (1, start as u32, 0));

        let mut data = Vec::new();
        let mut index = String::new();
        for (&number, &(kind, field2, field3)) in &records {
            index.push_str(&format!("{} 1 ", number));
            data.push(kind);
            data.extend_from_slice(&field2.to_be_bytes());
            data.extend_from_slice(&field3.to_be_bytes());
        }

        let size = records.keys().max().map_or(1, |max| max + 1);
        let dict = format!(
            "/Type /XRef /Size {} /W [1 4 2] /Index [{}] {}",
            size,
            index.trim_end(),
            dict_entries
        );
        self.stream(number, 0, &dict, &data);
        self.pending.clear();
        start
    }

    pub fn finish(&mut self, startxref: usize) -> Vec<u8> {
        self.raw(format!("startxref\n{}\n%%EOF\n", startxref).as_bytes());
        self.bytes.clone()
    }
}

/// Catalog (1), page tree root (2) and one page (3) with content stream 4.
#[allow(dead_code)]
pub fn single_page(builder: &mut PdfBuilder, content: &[u8]) {
    builder
        .object(1, 0, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, 0, "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>")
        .object(3, 0, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>")
        .stream(4, 0, "", content);
}
