use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{
    Culture, FormData, FormFile, FormFileCollection,
    error::{ErrorContainer, FormDataMappingError, MappingErrorKind, MappingErrors, MappingFault},
};

const DEFAULT_MAX_RECURSION_DEPTH: usize = 64;
const DEFAULT_MAX_ERROR_COUNT: usize = 200;

/// Lookup tables derived from the submitted keys, built on first use.
#[derive(Debug, Default)]
struct KeyIndex {
    /// `prefix -> ["[a]", "[b]", ...]`, in submission order.
    keys_by_prefix: HashMap<Box<str>, Arc<[Arc<str>]>>,
    /// Every key and every proper prefix of a key that ends before a `.` or
    /// `[`. Upload field names count as keys.
    prefixes: HashSet<Box<str>>,
}

type SegmentsByPrefix = HashMap<Box<str>, (Vec<Arc<str>>, HashSet<Arc<str>>)>;

impl KeyIndex {
    fn build(data: &FormData) -> Self {
        let mut prefixes: HashSet<Box<str>> = HashSet::new();
        let mut segments = SegmentsByPrefix::new();

        let upload_names = data
            .files()
            .into_iter()
            .flat_map(|files| files.iter().map(FormFile::name));
        for key in data.keys().chain(upload_names) {
            Self::index_key(key, &mut prefixes, &mut segments);
        }

        Self {
            keys_by_prefix: segments
                .into_iter()
                .map(|(prefix, (ordered, _))| (prefix, ordered.into()))
                .collect(),
            prefixes,
        }
    }

    fn index_key(key: &str, prefixes: &mut HashSet<Box<str>>, segments: &mut SegmentsByPrefix) {
        prefixes.insert(Box::from(key));
        let bytes = key.as_bytes();
        let mut at = 0;
        while at < bytes.len() {
            match bytes[at] {
                b'.' => {
                    prefixes.insert(Box::from(&key[..at]));
                    at += 1;
                }
                b'[' => {
                    let Some(close) = key[at..].find(']') else {
                        break;
                    };
                    let prefix = &key[..at];
                    prefixes.insert(Box::from(prefix));
                    let segment: Arc<str> = Arc::from(&key[at..=at + close]);
                    let (ordered, seen) = segments.entry(Box::from(prefix)).or_default();
                    if seen.insert(segment.clone()) {
                        ordered.push(segment);
                    }
                    at += close + 1;
                }
                _ => at += 1,
            }
        }
    }
}

/// Walks a [`FormData`] store on behalf of the converters.
///
/// The reader owns the current key prefix. Converters descend by pushing a
/// segment (`Name`, `[3]`, `[key]`) and must pop it again before returning;
/// [`with_prefix`](Self::with_prefix) does both around a closure. The reader
/// also accumulates every mapping error of the decode pass.
///
/// A reader serves exactly one decode pass at a time and is never shared.
#[derive(Debug)]
pub struct FormDataReader<'a> {
    data: &'a FormData,
    culture: Culture,
    prefix: String,
    /// Prefix length before each push.
    pushed: Vec<usize>,
    errors: MappingErrors,
    max_recursion_depth: usize,
    index: Option<KeyIndex>,
}

impl<'a> FormDataReader<'a> {
    /// Creates a reader at the root prefix. Numbers and dates are parsed with
    /// `culture`.
    #[must_use]
    pub fn new(data: &'a FormData, culture: Culture) -> Self {
        Self {
            data,
            culture,
            prefix: String::new(),
            pushed: Vec::new(),
            errors: MappingErrors::new(DEFAULT_MAX_ERROR_COUNT),
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            index: None,
        }
    }

    /// The culture scalar converters parse with.
    #[must_use]
    pub fn culture(&self) -> &Culture {
        &self.culture
    }

    /// Uploaded files of the submission, if any were attached.
    #[must_use]
    pub fn files(&self) -> Option<&'a FormFileCollection> {
        self.data.files()
    }

    /// The full current prefix, e.g. `order.items[2]`.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The most recently pushed segment, without its `.` separator.
    #[must_use]
    pub fn last_prefix_segment(&self) -> &str {
        let start = self.pushed.last().copied().unwrap_or(0);
        let segment = &self.prefix[start..];
        segment.strip_prefix('.').unwrap_or(segment)
    }

    /// Number of segments currently pushed.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.pushed.len()
    }

    /// Limits the number of segments that may be pushed at once.
    pub fn set_max_recursion_depth(&mut self, max: usize) {
        self.max_recursion_depth = max;
    }

    /// Limits the number of stored errors.
    pub fn set_max_error_count(&mut self, max: usize) {
        self.errors.set_limit(max);
    }

    /// Descends into `segment`.
    ///
    /// Segments starting with `[` are appended as-is; member names are joined
    /// with a `.` unless the prefix is empty.
    ///
    /// # Errors
    ///
    /// Fails without changing the prefix when the push would exceed the
    /// configured maximum recursion depth.
    pub fn push_prefix(&mut self, segment: &str) -> Result<(), MappingFault> {
        if self.pushed.len() >= self.max_recursion_depth {
            let mut path = self.prefix.clone();
            append_segment(&mut path, segment);
            return Err(MappingFault::MaxRecursionDepthExceeded {
                max: self.max_recursion_depth,
                path,
            });
        }

        self.pushed.push(self.prefix.len());
        append_segment(&mut self.prefix, segment);
        Ok(())
    }

    /// Undoes the matching [`push_prefix`](Self::push_prefix).
    pub fn pop_prefix(&mut self, segment: &str) {
        debug_assert!(
            self.prefix.ends_with(segment),
            "popped '{segment}' but the prefix is '{}'",
            self.prefix
        );
        if let Some(len) = self.pushed.pop() {
            self.prefix.truncate(len);
        }
    }

    /// Runs `read` with `segment` pushed, popping it again whether `read`
    /// succeeds or fails.
    ///
    /// # Errors
    ///
    /// Propagates the push failure or whatever `read` returns.
    pub fn with_prefix<R>(
        &mut self,
        segment: &str,
        read: impl FnOnce(&mut Self) -> Result<R, MappingFault>,
    ) -> Result<R, MappingFault> {
        self.push_prefix(segment)?;
        let result = read(self);
        self.pop_prefix(segment);
        result
    }

    /// The first value submitted at the current prefix.
    #[must_use]
    pub fn try_get_value(&self) -> Option<&'a str> {
        let data: &'a FormData = self.data;
        data.get(&self.prefix)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value submitted at the current prefix.
    #[must_use]
    pub fn try_get_values(&self) -> Option<&'a [String]> {
        let data: &'a FormData = self.data;
        data.get(&self.prefix)
    }

    /// The bracketed key segments (`[a]`, `[b]`, ...) submitted directly under
    /// the current prefix, in submission order.
    pub fn keys(&mut self) -> Arc<[Arc<str>]> {
        let data = self.data;
        let index = self.index.get_or_insert_with(|| KeyIndex::build(data));
        index
            .keys_by_prefix
            .get(self.prefix.as_str())
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Whether any submitted key or upload name is the current prefix or lies
    /// under it.
    pub fn current_prefix_exists(&mut self) -> bool {
        if self.prefix.is_empty() {
            return !self.data.is_empty() || self.files().is_some_and(|files| !files.is_empty());
        }
        let data = self.data;
        let index = self.index.get_or_insert_with(|| KeyIndex::build(data));
        index.prefixes.contains(self.prefix.as_str())
    }

    /// Records a failure against the current prefix and keeps going.
    pub fn add_mapping_error(&mut self, kind: MappingErrorKind, attempted_value: Option<&str>) {
        self.errors.push(FormDataMappingError {
            path: self.prefix.as_str().into(),
            kind,
            attempted_value: attempted_value.map(str::to_owned),
            container: None,
        });
    }

    /// Associates every not yet attached error with the `T` being built at
    /// the current prefix.
    pub fn attach_instance_to_errors<T: ?Sized>(&mut self) {
        self.errors.attach(&ErrorContainer {
            type_name: core::any::type_name::<T>(),
            path: self.prefix.as_str().into(),
        });
    }

    /// The errors recorded so far.
    #[must_use]
    pub fn errors(&self) -> &MappingErrors {
        &self.errors
    }

    /// Removes and returns the recorded errors, leaving the reader ready for
    /// another pass.
    pub fn take_errors(&mut self) -> Vec<FormDataMappingError> {
        self.errors.take()
    }
}

fn append_segment(prefix: &mut String, segment: &str) {
    if !prefix.is_empty() && !segment.starts_with('[') {
        prefix.push('.');
    }
    prefix.push_str(segment);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_pop_restore_the_prefix() {
        let data = FormData::new();
        let mut reader = FormDataReader::new(&data, Culture::invariant());

        reader.push_prefix("order").unwrap();
        reader.push_prefix("items").unwrap();
        reader.push_prefix("[3]").unwrap();
        reader.push_prefix("Name").unwrap();
        assert_eq!(reader.prefix(), "order.items[3].Name");
        assert_eq!(reader.last_prefix_segment(), "Name");

        reader.pop_prefix("Name");
        assert_eq!(reader.last_prefix_segment(), "[3]");
        reader.pop_prefix("[3]");
        reader.pop_prefix("items");
        assert_eq!(reader.prefix(), "order");
        reader.pop_prefix("order");
        assert_eq!(reader.prefix(), "");
        assert_eq!(reader.depth(), 0);
    }

    #[test]
    fn with_prefix_pops_on_failure() {
        let data = FormData::new();
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("root").unwrap();

        let result: Result<(), _> = reader.with_prefix("child", |r| {
            assert_eq!(r.prefix(), "root.child");
            Err(MappingFault::Converter("boom".into()))
        });

        assert!(result.is_err());
        assert_eq!(reader.prefix(), "root");
    }

    #[test]
    fn push_beyond_max_depth_is_a_fault() {
        let data = FormData::new();
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.set_max_recursion_depth(2);
        reader.push_prefix("a").unwrap();
        reader.push_prefix("b").unwrap();

        let fault = reader.push_prefix("c").unwrap_err();
        assert_eq!(
            fault.to_string(),
            "The maximum recursion depth of '2' was exceeded for 'a.b.c'."
        );
        assert_eq!(reader.prefix(), "a.b");
    }

    #[test]
    fn keys_are_discovered_per_prefix() {
        let data = FormData::from_pairs([
            ("scores[x]", "1"),
            ("scores[y].Low", "2"),
            ("scores[y].High", "3"),
            ("nested[a][b]", "4"),
            ("other", "5"),
            ("[root]", "6"),
        ]);
        let mut reader = FormDataReader::new(&data, Culture::invariant());

        assert_eq!(&*reader.keys(), [Arc::<str>::from("[root]")]);

        reader.push_prefix("scores").unwrap();
        let keys = reader.keys();
        let keys: Vec<&str> = keys.iter().map(|k| &**k).collect();
        assert_eq!(keys, ["[x]", "[y]"]);
        reader.pop_prefix("scores");

        reader.push_prefix("nested").unwrap();
        assert_eq!(reader.keys().len(), 1);
        reader.push_prefix("[a]").unwrap();
        assert_eq!(&*reader.keys(), [Arc::<str>::from("[b]")]);
        reader.pop_prefix("[a]");
        reader.pop_prefix("nested");

        reader.push_prefix("other").unwrap();
        assert!(reader.keys().is_empty());
    }

    #[test]
    fn prefix_existence_follows_key_structure() {
        let data = FormData::from_pairs([("customer.address.city", "Oslo"), ("items[0]", "x")]);
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        assert!(reader.current_prefix_exists());

        for (segments, exists) in [
            (&["customer"][..], true),
            (&["customer", "address"][..], true),
            (&["customer", "addr"][..], false),
            (&["items"][..], true),
            (&["items", "[0]"][..], true),
            (&["items", "[1]"][..], false),
        ] {
            for segment in segments {
                reader.push_prefix(segment).unwrap();
            }
            assert_eq!(reader.current_prefix_exists(), exists, "{}", reader.prefix());
            for segment in segments.iter().rev() {
                reader.pop_prefix(segment);
            }
        }
    }

    #[test]
    fn upload_names_count_as_keys() {
        let data = FormData::new().with_files(FormFileCollection::new(vec![FormFile::new(
            "profile.Image",
            "me.png",
            b"png".to_vec(),
        )]));
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        assert!(reader.current_prefix_exists());

        reader.push_prefix("profile").unwrap();
        assert!(reader.current_prefix_exists());
        reader.push_prefix("Image").unwrap();
        assert!(reader.current_prefix_exists());
        reader.pop_prefix("Image");
        reader.push_prefix("Banner").unwrap();
        assert!(!reader.current_prefix_exists());
    }

    #[test]
    fn values_are_read_at_the_current_prefix() {
        let data = FormData::from_pairs([("tags", "a"), ("tags", "b")]);
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        assert_eq!(reader.try_get_value(), None);

        reader.push_prefix("tags").unwrap();
        assert_eq!(reader.try_get_value(), Some("a"));
        assert_eq!(reader.try_get_values().unwrap(), ["a", "b"]);
    }

    #[test]
    fn errors_carry_the_current_path() {
        let data = FormData::new();
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("age").unwrap();
        reader.add_mapping_error(
            MappingErrorKind::InvalidValue {
                value: "abc".into(),
                field: "age".into(),
            },
            Some("abc"),
        );
        reader.attach_instance_to_errors::<u32>();

        let errors = reader.take_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), "age");
        assert_eq!(errors[0].attempted_value(), Some("abc"));
        assert_eq!(errors[0].container().unwrap().type_name, "u32");
        assert!(reader.errors().is_empty());
    }
}
