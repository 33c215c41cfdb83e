//! Maps flat, prefix-keyed form submissions onto strongly typed values.
//!
//! A submission such as `items[0].name=a&items[1].name=b&tags=x&tags=y` is held
//! by a [`FormData`] store and walked by a [`FormDataReader`], which tracks the
//! current key prefix. Every target type resolves to a [`FormDataConverter`]
//! that is built once per [`FormDataMapperOptions`] and reused; nested structs
//! are decoded by a precompiled member plan rather than by runtime reflection.
//!
//! Decoding never stops at the first bad field. Errors are accumulated on the
//! reader together with the path and raw value that caused them, and the
//! converters keep going over sibling fields, elements and keys.
//!
//! ```rust
//! use formmap::{Culture, FormData, FormDataMapper, FormDataMapperOptions, FormDataReader};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Order {
//!     id: u32,
//!     tags: Vec<String>,
//! }
//!
//! formmap::form_object!(Order {
//!     "Id" => id: u32,
//!     "Tags" => tags: Vec<String>,
//! });
//!
//! let data = FormData::from_urlencoded(b"Id=7&Tags=a&Tags=b");
//! let mut reader = FormDataReader::new(&data, Culture::invariant());
//! let options = FormDataMapperOptions::default();
//!
//! let order: Option<Order> = FormDataMapper::map(&mut reader, &options).unwrap();
//! assert_eq!(
//!     order,
//!     Some(Order {
//!         id: 7,
//!         tags: vec!["a".into(), "b".into()],
//!     })
//! );
//! assert!(reader.errors().is_empty());
//! ```

mod converter;
pub mod converters;
mod culture;
mod error;
mod form_data;
mod macros;
mod mapper;
mod options;
mod reader;


pub use converter::{FormDataConverter, FormValue, ReadOutcome};
pub use culture::{Culture, DateOrder};
pub use error::{
    ErrorContainer, FormDataMappingError, MappingErrorKind, MappingErrors, MappingFault,
};
pub use form_data::{FormData, FormFile, FormFileCollection, FormFileList};
pub use mapper::FormDataMapper;
pub use options::FormDataMapperOptions;
pub use reader::FormDataReader;

#[doc(hidden)]
pub use std::sync::Arc;
