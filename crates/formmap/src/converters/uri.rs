use http::Uri;
use log::trace;

use crate::{
    Arc, FormDataConverter, FormDataMapperOptions, FormDataReader, FormValue, MappingErrorKind,
    MappingFault, ReadOutcome,
};

/// Binds [`http::Uri`] values, absolute or relative.
#[derive(Debug, Default)]
pub struct UriConverter;

impl FormDataConverter<Uri> for UriConverter {
    fn try_read(
        &self,
        reader: &mut FormDataReader<'_>,
        _options: &FormDataMapperOptions,
    ) -> Result<ReadOutcome<Uri>, MappingFault> {
        let Some(value) = reader.try_get_value() else {
            return Ok(ReadOutcome::absent());
        };
        trace!("parsing uri '{}' at '{}'", value, reader.prefix());

        Ok(self.try_convert_value(reader, value))
    }

    fn can_convert_single_value(&self) -> bool {
        true
    }

    fn try_convert_value(&self, reader: &mut FormDataReader<'_>, value: &str) -> ReadOutcome<Uri> {
        match value.trim().parse::<Uri>() {
            Ok(uri) => ReadOutcome::success(uri),
            Err(_) => {
                let field = reader.last_prefix_segment().to_owned();
                reader.add_mapping_error(
                    MappingErrorKind::InvalidValue {
                        value: value.to_owned(),
                        field,
                    },
                    Some(value),
                );
                ReadOutcome::failure(None)
            }
        }
    }
}

impl FormValue for Uri {
    fn create_converter(_options: &FormDataMapperOptions) -> Arc<dyn FormDataConverter<Self>> {
        Arc::new(UriConverter)
    }
}
