use log::debug;

use crate::{FormDataMapperOptions, FormDataReader, FormValue, MappingFault, ReadOutcome};

/// Entry point of a decode pass.
///
/// The target is decoded at the reader's current prefix, which is usually
/// empty. Mapping errors end up on the reader; inspect
/// [`FormDataReader::errors`] after the call.
#[derive(Debug, Clone, Copy)]
pub struct FormDataMapper;

impl FormDataMapper {
    /// Decodes a `T`, returning whatever was bound even when some fields
    /// failed.
    ///
    /// # Errors
    ///
    /// Returns a [`MappingFault`] raised outside of any collection,
    /// dictionary or struct, e.g. when `T` is a scalar read past the maximum
    /// recursion depth. Faults raised inside those are recorded as errors on
    /// the reader instead.
    pub fn map<T: FormValue>(
        reader: &mut FormDataReader<'_>,
        options: &FormDataMapperOptions,
    ) -> Result<Option<T>, MappingFault> {
        Ok(Self::try_map(reader, options)?.value)
    }

    /// Like [`map`](Self::map), but also reports whether anything was
    /// submitted for `T` and whether it bound cleanly.
    ///
    /// # Errors
    ///
    /// See [`map`](Self::map).
    pub fn try_map<T: FormValue>(
        reader: &mut FormDataReader<'_>,
        options: &FormDataMapperOptions,
    ) -> Result<ReadOutcome<T>, MappingFault> {
        reader.set_max_recursion_depth(options.max_recursion_depth);
        reader.set_max_error_count(options.max_error_count);

        let converter = options.resolve_converter::<T>();
        let outcome = converter.try_read(reader, options)?;
        debug!(
            "mapped {} at '{}': found={} succeeded={} errors={}",
            core::any::type_name::<T>(),
            reader.prefix(),
            outcome.found,
            outcome.succeeded,
            reader.errors().len()
        );
        Ok(outcome)
    }
}
