//! Content loader: bytes on disk to decoded text.
//!
//! Never returns an error to the caller. Every failure is a
//! [`FileStatus`]: oversized files are rejected from metadata alone, binary
//! content is a decode error, and I/O failures map to the three read-error
//! kinds.

use chardetng::EncodingDetector;
use chrono::{DateTime, Utc};
use confluence_core::models::FileStatus;
use encoding_rs::Encoding;
use std::fs;
use std::io::{self, ErrorKind, Read};
use std::path::Path;
use tracing::debug;

/// Bytes inspected by the binary sniff.
pub const BINARY_SNIFF_BYTES: usize = 1024;

/// Share of control characters above which a prefix counts as binary.
const CONTROL_RATIO: f64 = 0.20;

/// Decoded file text and the encoding that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static str,
}

/// Everything the loader learned about one file.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub size_bytes: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
    pub content: Result<Decoded, FileStatus>,
}

impl Loaded {
    fn failed(status: FileStatus) -> Self {
        Loaded {
            size_bytes: None,
            modified: None,
            content: Err(status),
        }
    }
}

pub fn read_error_status(kind: ErrorKind) -> FileStatus {
    match kind {
        ErrorKind::NotFound => FileStatus::SkippedReadErrorNotFound,
        ErrorKind::PermissionDenied => FileStatus::SkippedReadErrorPermission,
        _ => FileStatus::SkippedReadErrorGeneric,
    }
}

/// Load `path`, refusing files strictly larger than `max_size` bytes.
pub fn load_file(path: &Path, max_size: u64) -> Loaded {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "stat failed");
            return Loaded::failed(read_error_status(e.kind()));
        }
    };
    let size = metadata.len();
    let mut loaded = Loaded {
        size_bytes: Some(size),
        modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        content: Err(FileStatus::SkippedSize),
    };

    if size > max_size {
        debug!(path = %path.display(), size, max_size, "file too large");
        return loaded;
    }
    if size == 0 {
        loaded.content = Ok(Decoded {
            text: String::new(),
            encoding: "UTF-8",
        });
        return loaded;
    }

    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "read failed");
            loaded.content = Err(read_error_status(e.kind()));
            return loaded;
        }
    };

    let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_BYTES)];
    // UTF-16 text is full of NUL bytes; a BOM vouches for it
    let has_bom = Encoding::for_bom(&bytes).is_some();
    loaded.content = if !has_bom && looks_binary(sniff) {
        debug!(path = %path.display(), "binary content");
        Err(FileStatus::SkippedDecodeError)
    } else {
        Ok(decode(&bytes))
    };
    loaded
}

/// Decode trying, in order: BOM or statistically detected encoding, UTF-8,
/// then Latin-1.
///
/// Latin-1 maps every byte (ASCII included), so decoding itself cannot fail;
/// binary content is caught by the sniff before this runs. Files with a BOM
/// skip the sniff.
pub fn decode(bytes: &[u8]) -> Decoded {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(&bytes[bom_len..]) {
            return Decoded {
                text: text.into_owned(),
                encoding: encoding.name(),
            };
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guess = detector.guess(None, true);
    if let Some(text) = guess.decode_without_bom_handling_and_without_replacement(bytes) {
        return Decoded {
            text: text.into_owned(),
            encoding: guess.name(),
        };
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Decoded {
            text: text.to_string(),
            encoding: "UTF-8",
        };
    }

    Decoded {
        text: bytes.iter().map(|&b| b as char).collect(),
        encoding: "ISO-8859-1",
    }
}

/// NUL anywhere, or more than 20% control bytes other than TAB, LF and CR.
pub fn looks_binary(prefix: &[u8]) -> bool {
    if prefix.is_empty() {
        return false;
    }
    let mut control = 0usize;
    for &b in prefix {
        if b == 0 {
            return true;
        }
        if b < 32 && !matches!(b, b'\t' | b'\n' | b'\r') {
            control += 1;
        }
    }
    control as f64 > prefix.len() as f64 * CONTROL_RATIO
}

/// Sniff the first [`BINARY_SNIFF_BYTES`] of a file.
pub fn is_likely_binary(path: &Path) -> io::Result<bool> {
    let mut buf = Vec::with_capacity(BINARY_SNIFF_BYTES);
    fs::File::open(path)?
        .take(BINARY_SNIFF_BYTES as u64)
        .read_to_end(&mut buf)?;
    Ok(looks_binary(&buf))
}
