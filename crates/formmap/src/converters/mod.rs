//! The converter strategies and the buffer adapters they are parameterised
//! with.
//!
//! Most code never names these types: [`FormValue`](crate::FormValue) picks a
//! converter for every supported type. They are public so that custom shapes
//! can be registered with
//! [`FormDataMapperOptions::add_converter`](crate::FormDataMapperOptions::add_converter).

mod collection;
mod complex;
mod dictionary;
mod enumeration;
mod file;
mod nullable;
mod parsable;
#[cfg(feature = "http")]
mod uri;

pub use collection::{CollectionBufferAdapter, CollectionConverter, ExtendAdapter, VecBufferAdapter};
pub use complex::{ComplexTypeConverter, ComplexTypePlan, ComplexTypePlanBuilder};
pub use dictionary::{DictionaryBufferAdapter, DictionaryConverter, MapAdapter};
pub use enumeration::{EnumConverter, FormEnum};
pub use file::FileConverter;
pub use nullable::NullableConverter;
pub use parsable::{FormParsable, ParsableConverter};
#[cfg(feature = "http")]
pub use uri::UriConverter;
