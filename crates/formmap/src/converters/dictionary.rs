use std::{
    collections::{BTreeMap, HashMap},
    hash::Hash,
    marker::PhantomData,
};

use log::trace;

use super::FormParsable;
use crate::{
    Arc, Culture, FormDataConverter, FormDataMapperOptions, FormDataReader, FormValue,
    MappingErrorKind, MappingFault, ReadOutcome,
};

/// How a dictionary is accumulated while its entries are decoded.
pub trait DictionaryBufferAdapter {
    /// The map handed to the caller.
    type Dictionary;
    /// What entries are accumulated into.
    type Buffer;
    /// The key type, parsed from the bracketed segment.
    type Key;
    /// The value type.
    type Value;

    /// An empty buffer.
    fn create_buffer() -> Self::Buffer;
    /// Inserts one entry.
    fn add(buffer: &mut Self::Buffer, key: Self::Key, value: Self::Value);
    /// Turns the finished buffer into the map.
    fn to_result(buffer: Self::Buffer) -> Self::Dictionary;
}

/// Maps that are their own buffer. A repeated key keeps the last value.
pub struct MapAdapter<M, K, V>(PhantomData<fn() -> (M, K, V)>);

impl<M: Default + Extend<(K, V)>, K, V> DictionaryBufferAdapter for MapAdapter<M, K, V> {
    type Dictionary = M;
    type Buffer = M;
    type Key = K;
    type Value = V;

    fn create_buffer() -> M {
        M::default()
    }

    fn add(buffer: &mut M, key: K, value: V) {
        buffer.extend(Some((key, value)));
    }

    fn to_result(buffer: M) -> M {
        buffer
    }
}

/// Decodes a dictionary from bracketed keys: `scores[math]=1&scores[art]=2`.
///
/// Keys are parsed with the invariant culture so that the same submission
/// binds the same keys everywhere. Entries whose key does not parse are
/// reported and skipped; entries whose value fails still bind the default
/// value.
pub struct DictionaryConverter<A, C> {
    value: C,
    _adapter: PhantomData<fn() -> A>,
}

impl<A, C> DictionaryConverter<A, C> {
    /// Decodes every entry's value with `value`.
    pub fn new(value: C) -> Self {
        Self {
            value,
            _adapter: PhantomData,
        }
    }
}

impl<A, C> FormDataConverter<A::Dictionary> for DictionaryConverter<A, C>
where
    A: DictionaryBufferAdapter,
    A::Key: FormParsable,
    A::Value: Default,
    C: FormDataConverter<A::Value>,
{
    fn try_read(
        &self,
        reader: &mut FormDataReader<'_>,
        options: &FormDataMapperOptions,
    ) -> Result<ReadOutcome<A::Dictionary>, MappingFault> {
        let keys = reader.keys();
        if keys.is_empty() {
            return Ok(ReadOutcome::absent());
        }
        trace!("reading {} dictionary keys at '{}'", keys.len(), reader.prefix());

        let max = options.max_collection_size;
        let invariant = Culture::invariant();
        let mut buffer = A::create_buffer();
        let mut count = 0;
        let mut succeeded = true;

        for segment in keys.iter() {
            let segment: &str = segment;
            if count >= max {
                reader.add_mapping_error(MappingErrorKind::DictionaryTooLarge { max }, None);
                reader.attach_instance_to_errors::<A::Dictionary>();
                succeeded = false;
                break;
            }

            let value =
                match reader.with_prefix(segment, |reader| self.value.try_read(reader, options)) {
                    Ok(value) => value,
                    Err(fault) => {
                        reader.add_mapping_error(MappingErrorKind::Fault(fault), None);
                        succeeded = false;
                        break;
                    }
                };
            succeeded &= value.succeeded;

            let key = segment
                .strip_prefix('[')
                .and_then(|key| key.strip_suffix(']'))
                .unwrap_or(segment);
            let Some(parsed) = A::Key::try_parse(key, &invariant) else {
                let field = reader.last_prefix_segment().to_owned();
                reader.add_mapping_error(
                    MappingErrorKind::InvalidKey {
                        key: key.to_owned(),
                        field,
                    },
                    Some(key),
                );
                succeeded = false;
                continue;
            };

            A::add(&mut buffer, parsed, value.value.unwrap_or_default());
            count += 1;
        }

        Ok(ReadOutcome {
            value: Some(A::to_result(buffer)),
            found: true,
            succeeded,
        })
    }
}

impl<K, V> FormValue for HashMap<K, V>
where
    K: FormParsable + Eq + Hash + 'static,
    V: FormValue + Default,
{
    fn create_converter(options: &FormDataMapperOptions) -> Arc<dyn FormDataConverter<Self>> {
        Arc::new(DictionaryConverter::<MapAdapter<Self, K, V>, _>::new(
            options.resolve_converter::<V>(),
        ))
    }
}

impl<K, V> FormValue for BTreeMap<K, V>
where
    K: FormParsable + Ord + 'static,
    V: FormValue + Default,
{
    fn create_converter(options: &FormDataMapperOptions) -> Arc<dyn FormDataConverter<Self>> {
        Arc::new(DictionaryConverter::<MapAdapter<Self, K, V>, _>::new(
            options.resolve_converter::<V>(),
        ))
    }
}
