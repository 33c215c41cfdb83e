use std::{collections::HashMap, ops::Deref, sync::Arc};

use bstr::ByteSlice;

/// One submitted key with every value that was sent for it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FormEntry {
    key: Arc<str>,
    values: Vec<String>,
}

/// The flat key/value namespace of one form submission.
///
/// Keys keep the order in which they were first submitted; repeating a key
/// appends to its values (`tags=a&tags=b`). Uploaded files travel alongside the
/// fields as a [`FormFileCollection`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<FormEntry>,
    index: HashMap<Arc<str>, usize>,
    files: Option<FormFileCollection>,
}

impl FormData {
    /// An empty store without uploads.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from `(key, value)` pairs, merging repeated keys.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut data = Self::new();
        for (key, value) in pairs {
            data.append(key.as_ref(), value);
        }
        data
    }

    /// Parses an `application/x-www-form-urlencoded` body.
    ///
    /// Pairs are separated by `&`, keys from values by the first `=`. `+`
    /// decodes to a space and `%XX` to the byte `XX`; malformed escapes are
    /// kept literally and invalid UTF-8 is replaced with U+FFFD.
    ///
    /// ```rust
    /// use formmap::FormData;
    ///
    /// let data = FormData::from_urlencoded(b"name=J%C3%BCrgen+M&tags=a&tags=b");
    /// assert_eq!(data.get("name").unwrap(), ["Jürgen M"]);
    /// assert_eq!(data.get("tags").unwrap(), ["a", "b"]);
    /// ```
    #[must_use]
    pub fn from_urlencoded(body: &[u8]) -> Self {
        let mut data = Self::new();
        for pair in body.split_str("&") {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = match pair.find_byte(b'=') {
                Some(at) => (&pair[..at], &pair[at + 1..]),
                None => (pair, &b""[..]),
            };
            let key = decode_component(key);
            if key.is_empty() {
                continue;
            }
            data.append(&key, decode_component(value));
        }
        data
    }

    /// Adds a value for `key`, after any values already submitted for it.
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        if let Some(&at) = self.index.get(key) {
            self.entries[at].values.push(value.into());
            return;
        }

        let key: Arc<str> = key.into();
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push(FormEntry {
            key,
            values: vec![value.into()],
        });
    }

    /// Attaches the uploaded files of the submission.
    #[must_use]
    pub fn with_files(mut self, files: FormFileCollection) -> Self {
        self.files = Some(files);
        self
    }

    /// Every value submitted under exactly `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.index
            .get(key)
            .map(|&at| self.entries[at].values.as_slice())
    }

    /// Whether `key` was submitted.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Keys in submission order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| &*e.key)
    }

    /// The uploads attached with [`with_files`](Self::with_files).
    #[must_use]
    pub fn files(&self) -> Option<&FormFileCollection> {
        self.files.as_ref()
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no key was submitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

fn decode_component(raw: &[u8]) -> String {
    let mut decoded = Vec::with_capacity(raw.len());
    let mut at = 0;
    while at < raw.len() {
        match raw[at] {
            b'+' => decoded.push(b' '),
            b'%' if at + 2 < raw.len() => {
                match (hex_value(raw[at + 1]), hex_value(raw[at + 2])) {
                    (Some(hi), Some(lo)) => {
                        decoded.push((hi << 4) | lo);
                        at += 2;
                    }
                    _ => decoded.push(b'%'),
                }
            }
            b => decoded.push(b),
        }
        at += 1;
    }
    decoded.to_str_lossy().into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFile {
    name: Arc<str>,
    file_name: Arc<str>,
    content_type: Option<Arc<str>>,
    content: Arc<[u8]>,
}

impl FormFile {
    /// Creates a file submitted under the form field `name`.
    pub fn new(
        name: impl Into<Arc<str>>,
        file_name: impl Into<Arc<str>>,
        content: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: file_name.into(),
            content_type: None,
            content: content.into(),
        }
    }

    /// Sets the declared MIME type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<Arc<str>>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// The form field the file was submitted under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The client-side file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The declared MIME type, if the client sent one.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The file's bytes.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Size of the content in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the file has no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Every file uploaded with a submission. Cloning is cheap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFileCollection {
    files: Arc<[FormFile]>,
}

impl FormFileCollection {
    /// Wraps the uploaded `files`, in submission order.
    #[must_use]
    pub fn new(files: Vec<FormFile>) -> Self {
        Self {
            files: files.into(),
        }
    }

    /// The first file submitted under `name`.
    #[must_use]
    pub fn get_file(&self, name: &str) -> Option<&FormFile> {
        self.files.iter().find(|f| f.name() == name)
    }

    /// Every file submitted under `name`.
    pub fn get_files<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormFile> + 'a {
        self.files.iter().filter(move |f| f.name() == name)
    }

    /// Iterates over every upload.
    pub fn iter(&self) -> impl Iterator<Item = &FormFile> {
        self.files.iter()
    }

    /// Number of uploads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing was uploaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<FormFile> for FormFileCollection {
    fn from_iter<T: IntoIterator<Item = FormFile>>(iter: T) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// The files submitted under one field name, e.g. an `<input type="file" multiple>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFileList(pub Vec<FormFile>);

impl Deref for FormFileList {
    type Target = [FormFile];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_keep_submission_order() {
        let data = FormData::from_pairs([("b", "1"), ("a", "2"), ("b", "3")]);
        assert_eq!(data.keys().collect::<Vec<_>>(), ["b", "a"]);
        assert_eq!(data.get("b").unwrap(), ["1", "3"]);
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn urlencoded_decoding() {
        let data = FormData::from_urlencoded(b"a=1+2&b=%7Bx%7D&c&d=100%&&=skipped&e=%zz");
        assert_eq!(data.get("a").unwrap(), ["1 2"]);
        assert_eq!(data.get("b").unwrap(), ["{x}"]);
        assert_eq!(data.get("c").unwrap(), [""]);
        assert_eq!(data.get("d").unwrap(), ["100%"]);
        assert_eq!(data.get("e").unwrap(), ["%zz"]);
        assert_eq!(data.len(), 5);
    }

    #[test]
    fn urlencoded_replaces_invalid_utf8() {
        let data = FormData::from_urlencoded(b"k=%FF");
        assert_eq!(data.get("k").unwrap(), ["\u{FFFD}"]);
    }

    #[test]
    fn files_are_found_by_field_name() {
        let files = FormFileCollection::new(vec![
            FormFile::new("avatar", "me.png", &b"png"[..]).with_content_type("image/png"),
            FormFile::new("docs", "a.txt", &b"a"[..]),
            FormFile::new("docs", "b.txt", &b"bb"[..]),
        ]);

        assert_eq!(files.get_file("avatar").unwrap().content_type(), Some("image/png"));
        assert_eq!(files.get_files("docs").map(FormFile::len).collect::<Vec<_>>(), [1, 2]);
        assert!(files.get_file("missing").is_none());
    }
}
