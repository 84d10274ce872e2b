//! The XML codec
//!
//! Reading is tolerant (documented repairs, raw passthrough of
//! uninterpreted elements); writing is strict and byte-compatible with
//! the GnuCash v2 dialect. Files compress transparently: reading sniffs
//! the gzip magic, writing gzips on a `.gz` suffix.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::Utc;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::book::Book;
use crate::error::{BookError, BookResult};

pub mod dom;
pub mod encode;
pub mod reader;
pub mod writer;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Read a book from any byte stream, decompressing when gzipped
pub fn read_book(mut input: impl Read) -> BookResult<Book> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoder = GzDecoder::new(bytes.as_slice());
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        bytes = decompressed;
    }
    let root = reader::parse_dom(bytes.as_slice())?;
    reader::decode_book(&root)
}

/// Open a book file
pub fn open_book(path: impl AsRef<Path>) -> BookResult<Book> {
    read_book(File::open(path.as_ref())?)
}

/// Serialize a book to a string, for diffing and tests
pub fn write_book_to_string(book: &Book) -> BookResult<String> {
    let mut buffer = Vec::new();
    let elements = encode::encode_book(book)?;
    writer::write_document(&mut buffer, &elements)?;
    String::from_utf8(buffer).map_err(|_| BookError::Schema("writer produced non-UTF-8".into()))
}

/// Write a book to a new file
///
/// Refuses to overwrite an existing path: callers remove or rename
/// first. A `.gz` suffix selects gzip compression. The document is
/// fully encoded (including the count and ordering checks) before the
/// file is created, and the book's last-write timestamp is recorded on
/// success.
pub fn write_book(book: &mut Book, path: impl AsRef<Path>) -> BookResult<()> {
    let path = path.as_ref();
    if path.exists() {
        return Err(BookError::FileExists(path.to_path_buf()));
    }
    let mut buffer = Vec::new();
    let elements = encode::encode_book(book)?;
    writer::write_document(&mut buffer, &elements)?;

    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let file = File::create(path)?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(&buffer)?;
        encoder.finish()?;
    } else {
        std::fs::write(path, &buffer)?;
    }
    book.last_write = Some(Utc::now());
    Ok(())
}
