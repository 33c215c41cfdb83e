use std::borrow::Cow;

/// Order of the day, month and year components in a short date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateOrder {
    /// `04/20/2023`
    #[default]
    MonthDayYear,
    /// `20/04/2023`
    DayMonthYear,
    /// `2023/04/20`
    YearMonthDay,
}

/// Formatting conventions used when parsing submitted values.
///
/// Form values are typed by people, so numbers and dates follow the
/// conventions of the page that rendered the form. A `Culture` carries the
/// handful of conventions the built-in parsers care about.
///
/// # Examples
///
/// ```rust
/// use formmap::{Culture, DateOrder};
///
/// let german = Culture::new("de-DE", ',', '.', DateOrder::DayMonthYear);
/// assert_eq!(german.decimal_separator(), ',');
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Culture {
    name: Cow<'static, str>,
    decimal_separator: char,
    group_separator: char,
    date_order: DateOrder,
}

impl Culture {
    /// Creates a culture with the given conventions.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        decimal_separator: char,
        group_separator: char,
        date_order: DateOrder,
    ) -> Self {
        Self {
            name: name.into(),
            decimal_separator,
            group_separator,
            date_order,
        }
    }

    /// The locale-independent culture: `.` decimals, `,` groups and
    /// month/day/year dates.
    #[must_use]
    pub const fn invariant() -> Self {
        Self {
            name: Cow::Borrowed(""),
            decimal_separator: '.',
            group_separator: ',',
            date_order: DateOrder::MonthDayYear,
        }
    }

    /// The culture name; empty for the invariant culture.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Separates the integral and fractional parts of a number.
    #[must_use]
    pub fn decimal_separator(&self) -> char {
        self.decimal_separator
    }

    /// Separates digit groups; ignored when parsing.
    #[must_use]
    pub fn group_separator(&self) -> char {
        self.group_separator
    }

    /// Component order of dates that do not start with a four-digit year.
    #[must_use]
    pub fn date_order(&self) -> DateOrder {
        self.date_order
    }

    /// Rewrites a culture-formatted number into the form accepted by Rust's
    /// float parsers: group separators dropped, decimal separator mapped to
    /// `.`.
    pub(crate) fn normalize_number<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.decimal_separator == '.' && !text.contains(self.group_separator) {
            return Cow::Borrowed(text);
        }

        let mut normalized = String::with_capacity(text.len());
        for c in text.chars() {
            if c == self.group_separator {
                continue;
            }
            if c == self.decimal_separator {
                normalized.push('.');
            } else {
                normalized.push(c);
            }
        }
        Cow::Owned(normalized)
    }
}

impl Default for Culture {
    fn default() -> Self {
        Self::invariant()
    }
}
