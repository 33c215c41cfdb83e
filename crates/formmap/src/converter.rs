use std::sync::Arc;

use crate::{FormDataMapperOptions, FormDataReader, MappingFault};

/// The three independent signals every converter call produces.
///
/// `found` tells whether anything was submitted for the target at all;
/// `succeeded` whether it decoded without errors. `value` may hold a partial
/// result even when decoding failed, so that sibling data is not thrown away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome<T> {
    /// The decoded value, possibly partial.
    pub value: Option<T>,
    /// Whether anything was submitted for the target.
    pub found: bool,
    /// Whether decoding recorded no error.
    pub succeeded: bool,
}

impl<T> ReadOutcome<T> {
    /// Nothing was submitted. Absence is never an error.
    #[must_use]
    pub fn absent() -> Self {
        Self {
            value: None,
            found: false,
            succeeded: true,
        }
    }

    /// A clean decode.
    #[must_use]
    pub fn success(value: T) -> Self {
        Self {
            value: Some(value),
            found: true,
            succeeded: true,
        }
    }

    /// Something was submitted but did not decode cleanly.
    #[must_use]
    pub fn failure(value: Option<T>) -> Self {
        Self {
            value,
            found: true,
            succeeded: false,
        }
    }

    /// Maps the value, keeping both flags.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ReadOutcome<U> {
        ReadOutcome {
            value: self.value.map(f),
            found: self.found,
            succeeded: self.succeeded,
        }
    }
}

/// Decodes one target shape from the reader's current prefix.
///
/// Implementations must leave the reader's prefix as they found it, on every
/// return path. Validation problems are recorded on the reader and reported
/// through [`ReadOutcome::succeeded`]; `Err` is reserved for faults.
pub trait FormDataConverter<T>: Send + Sync {
    /// Reads a `T` at the current prefix.
    ///
    /// # Errors
    ///
    /// Returns a [`MappingFault`] for failures that are not plain validation
    /// errors, such as exceeding the maximum recursion depth.
    fn try_read(
        &self,
        reader: &mut FormDataReader<'_>,
        options: &FormDataMapperOptions,
    ) -> Result<ReadOutcome<T>, MappingFault>;

    /// Whether [`try_convert_value`](Self::try_convert_value) is supported.
    ///
    /// Single-value converters let a collection bind a repeated field
    /// (`tags=a&tags=b`) in addition to indexed keys (`tags[0]=a`).
    fn can_convert_single_value(&self) -> bool {
        false
    }

    /// Converts one raw value, recording any error against the current
    /// prefix. The outcome is always found; a failed conversion may still
    /// carry a value, e.g. the `None` of an `Option<T>`.
    fn try_convert_value(&self, reader: &mut FormDataReader<'_>, value: &str) -> ReadOutcome<T> {
        let _ = (reader, value);
        ReadOutcome::failure(None)
    }
}

impl<T, C> FormDataConverter<T> for Arc<C>
where
    C: FormDataConverter<T> + ?Sized,
{
    #[inline]
    fn try_read(
        &self,
        reader: &mut FormDataReader<'_>,
        options: &FormDataMapperOptions,
    ) -> Result<ReadOutcome<T>, MappingFault> {
        (**self).try_read(reader, options)
    }

    #[inline]
    fn can_convert_single_value(&self) -> bool {
        (**self).can_convert_single_value()
    }

    #[inline]
    fn try_convert_value(&self, reader: &mut FormDataReader<'_>, value: &str) -> ReadOutcome<T> {
        (**self).try_convert_value(reader, value)
    }
}

/// A type the mapper knows how to decode.
///
/// `create_converter` is called at most once per type per
/// [`FormDataMapperOptions`]; the result is cached and shared by every later
/// decode. Container converters resolve their element converters through
/// `options` so that registered overrides apply at any depth.
pub trait FormValue: Sized + 'static {
    /// Builds the default converter for `Self`.
    fn create_converter(options: &FormDataMapperOptions) -> Arc<dyn FormDataConverter<Self>>;
}
