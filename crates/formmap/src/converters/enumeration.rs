use std::marker::PhantomData;

use log::trace;

use crate::{
    FormDataConverter, FormDataMapperOptions, FormDataReader, MappingErrorKind, MappingFault,
    ReadOutcome,
};

/// A fieldless enum bound by variant name.
///
/// Names are matched ignoring ASCII case, so `color=red` and `color=Red`
/// both bind `Color::Red`.
///
/// ```rust
/// use formmap::converters::FormEnum;
///
/// #[derive(Clone, Debug, PartialEq)]
/// enum Color {
///     Red,
///     Green,
/// }
///
/// impl FormEnum for Color {
///     const VARIANTS: &'static [(&'static str, Self)] =
///         &[("Red", Color::Red), ("Green", Color::Green)];
/// }
///
/// formmap::form_value!(enum Color);
/// ```
pub trait FormEnum: Clone + 'static {
    /// Every variant with the name it binds from.
    const VARIANTS: &'static [(&'static str, Self)];

    /// The variant named `name`, ignoring surrounding whitespace and ASCII
    /// case.
    fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::VARIANTS
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, variant)| variant.clone())
    }
}

/// Reads one value at the current prefix and matches it with
/// [`FormEnum::from_name`].
pub struct EnumConverter<T>(PhantomData<fn() -> T>);

impl<T> EnumConverter<T> {
    /// A converter for `T`.
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for EnumConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FormEnum> FormDataConverter<T> for EnumConverter<T> {
    fn try_read(
        &self,
        reader: &mut FormDataReader<'_>,
        _options: &FormDataMapperOptions,
    ) -> Result<ReadOutcome<T>, MappingFault> {
        let Some(value) = reader.try_get_value() else {
            return Ok(ReadOutcome::absent());
        };
        trace!("matching '{}' at '{}'", value, reader.prefix());

        Ok(self.try_convert_value(reader, value))
    }

    fn can_convert_single_value(&self) -> bool {
        true
    }

    fn try_convert_value(&self, reader: &mut FormDataReader<'_>, value: &str) -> ReadOutcome<T> {
        if let Some(variant) = T::from_name(value) {
            return ReadOutcome::success(variant);
        }

        let field = reader.last_prefix_segment().to_owned();
        reader.add_mapping_error(
            MappingErrorKind::InvalidEnumValue {
                value: value.to_owned(),
                field,
            },
            Some(value),
        );
        ReadOutcome::failure(None)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{Culture, FormData, FormDataMapper};

    #[derive(Clone, Debug, PartialEq)]
    enum Color {
        Red,
        Green,
        Blue,
    }

    impl FormEnum for Color {
        const VARIANTS: &'static [(&'static str, Self)] =
            &[("Red", Color::Red), ("Green", Color::Green), ("Blue", Color::Blue)];
    }

    crate::form_value!(enum Color);

    #[rstest]
    #[case("Red", Color::Red)]
    #[case("red", Color::Red)]
    #[case("GREEN", Color::Green)]
    #[case(" blue ", Color::Blue)]
    fn variants_match_ignoring_case(#[case] input: &str, #[case] expected: Color) {
        let data = FormData::from_pairs([("color", input)]);
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("color").unwrap();

        let color = FormDataMapper::map::<Color>(&mut reader, &FormDataMapperOptions::default());
        assert_eq!(color.unwrap(), Some(expected));
        assert!(reader.errors().is_empty());
    }

    #[test]
    fn unknown_names_are_one_error() {
        let data = FormData::from_pairs([("color", "Purple")]);
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("color").unwrap();

        let outcome =
            FormDataMapper::try_map::<Color>(&mut reader, &FormDataMapperOptions::default())
                .unwrap();
        assert_eq!(outcome, ReadOutcome::failure(None));

        let errors = reader.take_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), "color");
        assert_eq!(
            errors[0].kind().to_string(),
            "The value 'Purple' is not a valid option for 'color'."
        );
    }
}
