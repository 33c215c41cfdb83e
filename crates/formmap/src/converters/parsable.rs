use std::{marker::PhantomData, sync::Arc};

use log::trace;

use crate::{
    Culture, FormDataConverter, FormDataMapperOptions, FormDataReader, MappingErrorKind,
    MappingFault, ReadOutcome,
};

/// A type that can be parsed from one submitted string.
pub trait FormParsable: Sized {
    /// Parses `value` using the conventions of `culture`.
    fn try_parse(value: &str, culture: &Culture) -> Option<Self>;
}

/// Reads one value at the current prefix and parses it with
/// [`FormParsable`].
pub struct ParsableConverter<T>(PhantomData<fn() -> T>);

impl<T> ParsableConverter<T> {
    /// A converter for `T`.
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for ParsableConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FormParsable> FormDataConverter<T> for ParsableConverter<T> {
    fn try_read(
        &self,
        reader: &mut FormDataReader<'_>,
        _options: &FormDataMapperOptions,
    ) -> Result<ReadOutcome<T>, MappingFault> {
        let Some(value) = reader.try_get_value() else {
            return Ok(ReadOutcome::absent());
        };
        trace!("parsing '{}' at '{}'", value, reader.prefix());

        Ok(self.try_convert_value(reader, value))
    }

    fn can_convert_single_value(&self) -> bool {
        true
    }

    fn try_convert_value(&self, reader: &mut FormDataReader<'_>, value: &str) -> ReadOutcome<T> {
        if let Some(parsed) = T::try_parse(value, reader.culture()) {
            return ReadOutcome::success(parsed);
        }

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

macro_rules! impl_parsable_for_integers {
    ($($t:ty),+) => {
        $(
            impl FormParsable for $t {
                fn try_parse(value: &str, _culture: &Culture) -> Option<Self> {
                    value.trim().parse().ok()
                }
            }
        )+
    };
}

impl_parsable_for_integers!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize
);

macro_rules! impl_parsable_for_floats {
    ($($t:ty),+) => {
        $(
            impl FormParsable for $t {
                fn try_parse(value: &str, culture: &Culture) -> Option<Self> {
                    culture.normalize_number(value.trim()).parse().ok()
                }
            }
        )+
    };
}

impl_parsable_for_floats!(f32, f64);

impl FormParsable for bool {
    fn try_parse(value: &str, _culture: &Culture) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("true") {
            Some(true)
        } else if value.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

impl FormParsable for char {
    fn try_parse(value: &str, _culture: &Culture) -> Option<Self> {
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }
}

impl FormParsable for String {
    fn try_parse(value: &str, _culture: &Culture) -> Option<Self> {
        Some(value.to_owned())
    }
}

impl FormParsable for Box<str> {
    fn try_parse(value: &str, _culture: &Culture) -> Option<Self> {
        Some(value.into())
    }
}

impl FormParsable for Arc<str> {
    fn try_parse(value: &str, _culture: &Culture) -> Option<Self> {
        Some(value.into())
    }
}

crate::form_value!(
    parsable i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool,
    char, String, Box<str>, Arc<str>
);

#[cfg(feature = "uuid")]
impl FormParsable for uuid::Uuid {
    fn try_parse(value: &str, _culture: &Culture) -> Option<Self> {
        uuid::Uuid::try_parse(value.trim()).ok()
    }
}

#[cfg(feature = "uuid")]
crate::form_value!(parsable uuid::Uuid);

#[cfg(feature = "time")]
mod time_impls {
    use time::{Date, Month, PrimitiveDateTime, Time};

    use super::FormParsable;
    use crate::{Culture, DateOrder};

    fn parse_date(value: &str, order: DateOrder) -> Option<Date> {
        let mut parts = value.split(['/', '-', '.']);
        let (a, b, c) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }

        // Four leading digits always mean an ISO-style year first date, which
        // is what `<input type="date">` submits.
        let (year, month, day) = if a.len() == 4 {
            (a, b, c)
        } else {
            match order {
                DateOrder::MonthDayYear => (c, a, b),
                DateOrder::DayMonthYear => (c, b, a),
                DateOrder::YearMonthDay => (a, b, c),
            }
        };

        let month = Month::try_from(month.parse::<u8>().ok()?).ok()?;
        Date::from_calendar_date(year.parse().ok()?, month, day.parse().ok()?).ok()
    }

    fn parse_time(value: &str) -> Option<Time> {
        let mut parts = value.split(':');
        let hour = parts.next()?.parse().ok()?;
        let minute = parts.next()?.parse().ok()?;
        let second = match parts.next() {
            Some(second) => second.parse().ok()?,
            None => 0,
        };
        if parts.next().is_some() {
            return None;
        }
        Time::from_hms(hour, minute, second).ok()
    }

    impl FormParsable for Date {
        fn try_parse(value: &str, culture: &Culture) -> Option<Self> {
            parse_date(value.trim(), culture.date_order())
        }
    }

    impl FormParsable for Time {
        fn try_parse(value: &str, _culture: &Culture) -> Option<Self> {
            parse_time(value.trim())
        }
    }

    impl FormParsable for PrimitiveDateTime {
        fn try_parse(value: &str, culture: &Culture) -> Option<Self> {
            let (date, time) = value.trim().split_once(['T', ' '])?;
            Some(PrimitiveDateTime::new(
                parse_date(date, culture.date_order())?,
                parse_time(time.trim())?,
            ))
        }
    }

    crate::form_value!(parsable Date, Time, PrimitiveDateTime);
}
