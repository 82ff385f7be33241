//! Shared identifiers used as both storage and lock-table keys.

use std::fmt;

/// Identifier for a file, drawn from the URL segment after `/wopi/files/`.
///
/// Always lower-cased at construction time so it can be compared and hashed
/// case-insensitively without the caller having to remember to normalize it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(String);

impl FileId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        FileId(raw.as_ref().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for a folder, drawn from the URL segment after `/wopi/folders/`.
///
/// Unlike [`FileId`] this is *not* lower-cased on construction; folder ids are
/// only ever compared case-insensitively against the configured root name, so
/// normalizing eagerly would just discard information for no benefit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderId(String);

impl FolderId {
    pub fn new(raw: impl Into<String>) -> Self {
        FolderId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access level an access token grants a user over a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    None,
    Read,
    Write,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_lowercases() {
        assert_eq!(FileId::new("Doc.DOCX").as_str(), "doc.docx");
        assert_eq!(FileId::new("Doc.DOCX"), FileId::new("doc.docx"));
    }

    #[test]
    fn folder_id_preserves_case_but_compares_loosely() {
        let id = FolderId::new("Root");
        assert_eq!(id.as_str(), "Root");
        assert!(id.eq_ignore_case("root"));
        assert!(id.eq_ignore_case("ROOT"));
        assert!(!id.eq_ignore_case("other"));
    }
}
