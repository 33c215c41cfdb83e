use std::{fmt, sync::Arc};

use log::{debug, warn};
use thiserror::Error;

/// An unexpected failure raised while decoding.
///
/// Faults are not ordinary validation errors: they abort the converter that
/// raised them and travel up as `Err` until a collection, dictionary or
/// complex-type boundary turns them into a recorded [`FormDataMappingError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingFault {
    /// A prefix push would have gone deeper than the configured limit.
    #[error("The maximum recursion depth of '{max}' was exceeded for '{path}'.")]
    MaxRecursionDepthExceeded {
        /// The configured maximum depth.
        max: usize,
        /// The prefix the push would have produced.
        path: String,
    },
    /// Raised by user-provided converters.
    #[error("{0}")]
    Converter(String),
}

/// What went wrong while mapping a single value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingErrorKind {
    /// A scalar value did not parse.
    #[error("The value '{value}' is not valid for '{field}'.")]
    InvalidValue {
        /// The submitted text.
        value: String,
        /// The last segment of the field's path.
        field: String,
    },
    /// A value matched none of an enum's variant names.
    #[error("The value '{value}' is not a valid option for '{field}'.")]
    InvalidEnumValue {
        /// The submitted text.
        value: String,
        /// The last segment of the field's path.
        field: String,
    },
    /// A dictionary key did not parse; the entry was left out.
    #[error("The value '{key}' is not a valid key for '{field}'.")]
    InvalidKey {
        /// The key text without its brackets.
        key: String,
        /// The last segment of the dictionary's path.
        field: String,
    },
    /// More indexed or repeated elements were submitted than allowed.
    #[error(
        "The number of elements in the collection exceeded the maximum number of '{max}' elements allowed."
    )]
    CollectionTooLarge {
        /// [`FormDataMapperOptions::max_collection_size`](crate::FormDataMapperOptions::max_collection_size)
        max: usize,
    },
    /// More dictionary keys were submitted than allowed.
    #[error(
        "The number of elements in the dictionary exceeded the maximum number of '{max}' elements allowed."
    )]
    DictionaryTooLarge {
        /// [`FormDataMapperOptions::max_collection_size`](crate::FormDataMapperOptions::max_collection_size)
        max: usize,
    },
    /// A fault caught at a collection, dictionary or object boundary.
    #[error("{0}")]
    Fault(#[from] MappingFault),
}

/// The object a failed member belonged to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContainer {
    /// [`core::any::type_name`] of the object.
    pub type_name: &'static str,
    /// The object's prefix; empty at the root.
    pub path: Arc<str>,
}

/// A recorded mapping failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDataMappingError {
    pub(crate) path: Arc<str>,
    pub(crate) kind: MappingErrorKind,
    pub(crate) attempted_value: Option<String>,
    pub(crate) container: Option<ErrorContainer>,
}

impl FormDataMappingError {
    /// Full key of the field that failed, e.g. `items[3].price`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// What went wrong.
    #[must_use]
    pub fn kind(&self) -> &MappingErrorKind {
        &self.kind
    }

    /// The raw submitted text, when there was one.
    #[must_use]
    pub fn attempted_value(&self) -> Option<&str> {
        self.attempted_value.as_deref()
    }

    /// The innermost object being built when the error was recorded.
    #[must_use]
    pub fn container(&self) -> Option<&ErrorContainer> {
        self.container.as_ref()
    }
}

impl fmt::Display for FormDataMappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)
    }
}

impl core::error::Error for FormDataMappingError {}

/// Bounded accumulator of mapping errors.
///
/// Once `limit` errors are stored, later errors are only counted.
#[derive(Debug, Clone)]
pub struct MappingErrors {
    errors: Vec<FormDataMappingError>,
    limit: usize,
    dropped: usize,
}

impl MappingErrors {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            errors: Vec::new(),
            limit,
            dropped: 0,
        }
    }

    pub(crate) fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    pub(crate) fn push(&mut self, error: FormDataMappingError) {
        if self.errors.len() >= self.limit {
            if self.dropped == 0 {
                warn!(
                    "mapping error limit of {} reached; further errors are dropped",
                    self.limit
                );
            }
            self.dropped += 1;
            return;
        }

        debug!("mapping error at '{}': {}", error.path, error.kind);
        self.errors.push(error);
    }

    /// Attaches `container` to the unattached errors at or below its path.
    pub(crate) fn attach(&mut self, container: &ErrorContainer) {
        for error in self
            .errors
            .iter_mut()
            .filter(|e| e.container.is_none() && is_under(&e.path, &container.path))
        {
            error.container = Some(container.clone());
        }
    }

    /// The stored errors in the order they were recorded.
    #[must_use]
    pub fn as_slice(&self) -> &[FormDataMappingError] {
        &self.errors
    }

    /// Number of stored errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no error was stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of errors that were not stored because the limit was reached.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Iterates over the stored errors.
    pub fn iter(&self) -> impl Iterator<Item = &FormDataMappingError> {
        self.errors.iter()
    }

    pub(crate) fn take(&mut self) -> Vec<FormDataMappingError> {
        self.dropped = 0;
        std::mem::take(&mut self.errors)
    }
}

fn is_under(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(['.', '[']),
        None => false,
    }
}

#[cfg(any(test, feature = "serde"))]
mod serde_impls {
    use serde::{Serialize, Serializer, ser::SerializeStruct};

    use super::{ErrorContainer, FormDataMappingError};

    impl Serialize for ErrorContainer {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut state = serializer.serialize_struct("ErrorContainer", 2)?;
            state.serialize_field("type_name", self.type_name)?;
            state.serialize_field("path", &*self.path)?;
            state.end()
        }
    }

    // Errors render their message rather than the tagged kind so that the
    // output is what a form would show next to the field.
    impl Serialize for FormDataMappingError {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut state = serializer.serialize_struct("FormDataMappingError", 4)?;
            state.serialize_field("path", &*self.path)?;
            state.serialize_field("message", &self.kind.to_string())?;
            state.serialize_field("attempted_value", &self.attempted_value)?;
            state.serialize_field("container", &self.container)?;
            state.end()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(path: &str) -> FormDataMappingError {
        FormDataMappingError {
            path: path.into(),
            kind: MappingErrorKind::InvalidValue {
                value: "x".into(),
                field: path.into(),
            },
            attempted_value: Some("x".into()),
            container: None,
        }
    }

    #[test]
    fn accumulator_counts_errors_past_the_limit() {
        let mut errors = MappingErrors::new(2);
        errors.push(error("a"));
        errors.push(error("b"));
        errors.push(error("c"));

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.dropped(), 1);
        assert_eq!(errors.as_slice()[1].path(), "b");
    }

    #[test]
    fn attach_only_fills_unattached_errors() {
        let mut errors = MappingErrors::new(10);
        errors.push(error("inner.a"));
        errors.attach(&ErrorContainer {
            type_name: "Inner",
            path: "inner".into(),
        });
        errors.push(error("b"));
        errors.attach(&ErrorContainer {
            type_name: "Outer",
            path: "".into(),
        });

        let containers: Vec<_> = errors
            .iter()
            .map(|e| e.container().map(|c| c.type_name))
            .collect();
        assert_eq!(containers, [Some("Inner"), Some("Outer")]);
    }

    #[test]
    fn attach_skips_errors_outside_the_container() {
        let mut errors = MappingErrors::new(10);
        errors.push(error("age"));
        errors.push(error("address.zip"));
        errors.push(error("addressee"));
        errors.attach(&ErrorContainer {
            type_name: "Address",
            path: "address".into(),
        });

        let attached: Vec<bool> = errors.iter().map(|e| e.container().is_some()).collect();
        assert_eq!(attached, [false, true, false]);
    }

    #[test]
    fn serializes_message_text() {
        let rendered = serde_json::to_string(&error("age")).unwrap();
        insta::assert_snapshot!(rendered, @r#"{"path":"age","message":"The value 'x' is not valid for 'age'.","attempted_value":"x","container":null}"#);
    }
}
