/// Implements [`FormValue`](crate::FormValue) for a struct by listing the
/// members to bind.
///
/// Each entry names the submitted key segment, the field and its type. The
/// struct must implement [`Default`], which provides the value of every
/// member that was not submitted.
///
/// ```rust
/// #[derive(Debug, Default)]
/// struct Address {
///     city: String,
///     zip: Option<u32>,
/// }
///
/// formmap::form_object!(Address {
///     "City" => city: String,
///     "Zip" => zip: Option<u32>,
/// });
/// ```
#[macro_export]
macro_rules! form_object {
    ($target:ident { $($name:literal => $field:ident : $member:ty),* $(,)? }) => {
        impl $crate::FormValue for $target {
            fn create_converter(
                _options: &$crate::FormDataMapperOptions,
            ) -> $crate::Arc<dyn $crate::FormDataConverter<Self>> {
                let plan = $crate::converters::ComplexTypePlan::<$target>::builder(
                    <$target as ::core::default::Default>::default,
                )
                $(
                    .member($name, |target: &mut $target, value: $member| target.$field = value)
                )*
                .build();
                $crate::Arc::new($crate::converters::ComplexTypeConverter::new(plan))
            }
        }
    };
}

/// Implements [`FormValue`](crate::FormValue) for types that bind from a
/// single submitted string.
///
/// - `form_value!(parsable T, U)` for types implementing
///   [`FormParsable`](crate::converters::FormParsable)
/// - `form_value!(enum T, U)` for types implementing
///   [`FormEnum`](crate::converters::FormEnum)
#[macro_export]
macro_rules! form_value {
    (parsable $($target:ty),+ $(,)?) => {
        $(
            impl $crate::FormValue for $target {
                fn create_converter(
                    _options: &$crate::FormDataMapperOptions,
                ) -> $crate::Arc<dyn $crate::FormDataConverter<Self>> {
                    $crate::Arc::new($crate::converters::ParsableConverter::<$target>::new())
                }
            }
        )+
    };
    (enum $($target:ty),+ $(,)?) => {
        $(
            impl $crate::FormValue for $target {
                fn create_converter(
                    _options: &$crate::FormDataMapperOptions,
                ) -> $crate::Arc<dyn $crate::FormDataConverter<Self>> {
                    $crate::Arc::new($crate::converters::EnumConverter::<$target>::new())
                }
            }
        )+
    };
}
