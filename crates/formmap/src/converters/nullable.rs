use crate::{
    FormDataConverter, FormDataMapperOptions, FormDataReader, FormValue, MappingFault, ReadOutcome,
};

/// Wraps the converter of `T` to produce `Option<T>`.
///
/// Nothing submitted reads as absent. A submitted value that fails to convert
/// reads as a failed `None`, which keeps positions intact inside
/// collections such as `Vec<Option<i32>>`.
pub struct NullableConverter<C> {
    inner: C,
}

impl<C> NullableConverter<C> {
    /// Wraps the converter of the inner type.
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<T, C> FormDataConverter<Option<T>> for NullableConverter<C>
where
    C: FormDataConverter<T>,
{
    fn try_read(
        &self,
        reader: &mut FormDataReader<'_>,
        options: &FormDataMapperOptions,
    ) -> Result<ReadOutcome<Option<T>>, MappingFault> {
        let outcome = self.inner.try_read(reader, options)?;
        if !outcome.found {
            return Ok(ReadOutcome::absent());
        }
        Ok(wrap(outcome))
    }

    fn can_convert_single_value(&self) -> bool {
        self.inner.can_convert_single_value()
    }

    fn try_convert_value(
        &self,
        reader: &mut FormDataReader<'_>,
        value: &str,
    ) -> ReadOutcome<Option<T>> {
        wrap(self.inner.try_convert_value(reader, value))
    }
}

/// A found inner outcome as an `Option`; failures without a value bind `None`.
fn wrap<T>(outcome: ReadOutcome<T>) -> ReadOutcome<Option<T>> {
    match outcome.value {
        Some(value) if outcome.succeeded => ReadOutcome::success(Some(value)),
        Some(value) => ReadOutcome::failure(Some(Some(value))),
        None => ReadOutcome::failure(Some(None)),
    }
}

impl<T: FormValue> FormValue for Option<T> {
    fn create_converter(
        options: &FormDataMapperOptions,
    ) -> crate::Arc<dyn FormDataConverter<Self>> {
        crate::Arc::new(NullableConverter::new(options.resolve_converter::<T>()))
    }
}

/// Boxes the value of the converter of `T`. Lets recursive types such as
/// `Option<Box<Node>>` bind.
pub(crate) struct BoxConverter<C>(C);

impl<T, C> FormDataConverter<Box<T>> for BoxConverter<C>
where
    C: FormDataConverter<T>,
{
    fn try_read(
        &self,
        reader: &mut FormDataReader<'_>,
        options: &FormDataMapperOptions,
    ) -> Result<ReadOutcome<Box<T>>, MappingFault> {
        Ok(self.0.try_read(reader, options)?.map(Box::new))
    }

    fn can_convert_single_value(&self) -> bool {
        self.0.can_convert_single_value()
    }

    fn try_convert_value(
        &self,
        reader: &mut FormDataReader<'_>,
        value: &str,
    ) -> ReadOutcome<Box<T>> {
        self.0.try_convert_value(reader, value).map(Box::new)
    }
}

impl<T: FormValue> FormValue for Box<T> {
    fn create_converter(
        options: &FormDataMapperOptions,
    ) -> crate::Arc<dyn FormDataConverter<Self>> {
        crate::Arc::new(BoxConverter(options.resolve_converter::<T>()))
    }
}
