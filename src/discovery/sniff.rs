//! Root-element sniffing.
//!
//! Reads only as far as the first start tag of a configuration payload. The
//! streaming reader never resolves DTDs or external entities, and reads at
//! most [`SNIFF_LIMIT`] bytes, so hostile payloads from an uploaded archive
//! cannot make it fetch or expand anything.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;

/// Maximum number of payload bytes examined while looking for the root element.
pub const SNIFF_LIMIT: u64 = 64 * 1024;

/// Local name of the first element in `reader`, or `None` if there is none
/// or the payload is malformed before reaching it.
pub fn root_element<R: BufRead>(reader: R) -> Option<String> {
    let mut xml = Reader::from_reader(reader);
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                return Some(name);
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
        buf.clear();
    }
}

/// Sniff the root element of an in-memory payload.
#[must_use]
pub fn root_element_of_bytes(bytes: &[u8]) -> Option<String> {
    let limit = usize::try_from(SNIFF_LIMIT).unwrap_or(usize::MAX);
    let prefix = &bytes[..bytes.len().min(limit)];
    root_element(prefix)
}

/// Sniff the root element of a file; unreadable files yield `None`.
#[must_use]
pub fn root_element_of_file(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    root_element(BufReader::new(file.take(SNIFF_LIMIT)))
}
