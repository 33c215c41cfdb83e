use std::marker::PhantomData;

use log::trace;

use crate::{
    Arc, FormDataConverter, FormDataMapperOptions, FormDataReader, FormFile, FormFileCollection,
    FormFileList, FormValue, MappingFault, ReadOutcome,
};

/// Binds uploaded files by field name.
///
/// The file name is the full current prefix, so a `FormFile` member `Avatar`
/// of a `profile` object binds the upload named `profile.Avatar`. Missing
/// uploads read as absent; there is no failure mode.
pub struct FileConverter<T>(PhantomData<fn() -> T>);

impl<T> FileConverter<T> {
    /// A converter for `T`.
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for FileConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn found<T>(value: Option<T>) -> ReadOutcome<T> {
    value.map_or_else(ReadOutcome::absent, ReadOutcome::success)
}

impl FormDataConverter<FormFile> for FileConverter<FormFile> {
    fn try_read(
        &self,
        reader: &mut FormDataReader<'_>,
        _options: &FormDataMapperOptions,
    ) -> Result<ReadOutcome<FormFile>, MappingFault> {
        trace!("looking up file '{}'", reader.prefix());
        let file = reader
            .files()
            .and_then(|files| files.get_file(reader.prefix()))
            .cloned();
        Ok(found(file))
    }
}

impl FormDataConverter<FormFileList> for FileConverter<FormFileList> {
    fn try_read(
        &self,
        reader: &mut FormDataReader<'_>,
        _options: &FormDataMapperOptions,
    ) -> Result<ReadOutcome<FormFileList>, MappingFault> {
        trace!("looking up files '{}'", reader.prefix());
        let list = reader
            .files()
            .map(|files| {
                files
                    .get_files(reader.prefix())
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .map(FormFileList);
        Ok(found(list))
    }
}

impl FormDataConverter<FormFileCollection> for FileConverter<FormFileCollection> {
    fn try_read(
        &self,
        reader: &mut FormDataReader<'_>,
        _options: &FormDataMapperOptions,
    ) -> Result<ReadOutcome<FormFileCollection>, MappingFault> {
        let files = reader.files().filter(|files| !files.is_empty()).cloned();
        Ok(found(files))
    }
}

macro_rules! impl_form_value_for_files {
    ($($t:ty),+) => {
        $(
            impl FormValue for $t {
                fn create_converter(
                    _options: &FormDataMapperOptions,
                ) -> Arc<dyn FormDataConverter<Self>> {
                    Arc::new(FileConverter::<$t>::new())
                }
            }
        )+
    };
}

impl_form_value_for_files!(FormFile, FormFileList, FormFileCollection);
