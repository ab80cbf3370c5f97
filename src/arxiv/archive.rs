//! Unpacking of arXiv source downloads.
//!
//! arXiv serves either a gzipped tarball, a single gzipped `.tex` file, or
//! (rarely) an uncompressed tarball or plain text. Everything is unpacked into an
//! in-memory [`SourceTree`]; nothing touches the disk.

use std::collections::BTreeMap;
use std::io::Read;

use flate2::read::GzDecoder;

use crate::error::SourceError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const USTAR_OFFSET: usize = 257;
const PDF_MAGIC: &[u8] = b"%PDF";

/// Name given to a source that arrives as a single file
pub const SINGLE_FILE_NAME: &str = "main.tex";

/// Text files of a source archive, keyed by normalized relative path
#[derive(Debug, Clone, Default)]
pub struct SourceTree {
    files: BTreeMap<String, String>,
}

impl SourceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, contents: String) {
        self.files.insert(normalize_path(path), contents);
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for SourceTree {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut tree = SourceTree::new();
        for (path, contents) in iter {
            tree.insert(path, contents.to_string());
        }
        tree
    }
}

/// Unpack a downloaded source into memory
pub fn unpack(bytes: &[u8]) -> Result<SourceTree, SourceError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut decoded)
            .map_err(|e| SourceError::Archive {
                message: format!("gzip: {}", e),
            })?;
        return unpack_plain(&decoded);
    }
    unpack_plain(bytes)
}

fn unpack_plain(bytes: &[u8]) -> Result<SourceTree, SourceError> {
    if is_tar(bytes) {
        return read_tar(bytes);
    }
    if bytes.starts_with(PDF_MAGIC) {
        return Err(SourceError::Archive {
            message: "only a PDF is available for this paper".to_string(),
        });
    }

    let mut tree = SourceTree::new();
    tree.insert(SINGLE_FILE_NAME, decode_text(bytes));
    Ok(tree)
}

fn is_tar(bytes: &[u8]) -> bool {
    bytes
        .get(USTAR_OFFSET..USTAR_OFFSET + 5)
        .is_some_and(|magic| magic == b"ustar")
}

fn read_tar(bytes: &[u8]) -> Result<SourceTree, SourceError> {
    let archive_error = |e: std::io::Error| SourceError::Archive {
        message: format!("tar: {}", e),
    };

    let mut archive = tar::Archive::new(bytes);
    let mut tree = SourceTree::new();

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path().map_err(archive_error)?.to_string_lossy().into_owned();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).map_err(archive_error)?;

        if is_text_file(&path) {
            tree.insert(&path, decode_text(&contents));
        } else if let Ok(text) = String::from_utf8(contents) {
            tree.insert(&path, text);
        }
    }

    Ok(tree)
}

/// LaTeX sources are not always UTF-8; keep what can be read
fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn is_text_file(path: &str) -> bool {
    const TEXT_EXTENSIONS: [&str; 7] = [".tex", ".ltx", ".bbl", ".bib", ".sty", ".cls", ".txt"];
    let lower = path.to_ascii_lowercase();
    TEXT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Collapse `./` and `..` segments; archive paths are always relative
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
