use std::{
    collections::{BTreeSet, BinaryHeap, HashSet, LinkedList, VecDeque},
    hash::Hash,
    marker::PhantomData,
};

use log::trace;

use crate::{
    Arc, FormDataConverter, FormDataMapperOptions, FormDataReader, FormValue, MappingErrorKind,
    MappingFault, ReadOutcome,
};

/// How a collection is accumulated while its elements are decoded.
///
/// A collection is built through an intermediate buffer so that shapes
/// which cannot grow in place (`Box<[T]>`, `Arc<[T]>`) are supported by the
/// same converter as `Vec<T>`.
pub trait CollectionBufferAdapter {
    /// The collection handed to the caller.
    type Collection;
    /// What elements are accumulated into.
    type Buffer;
    /// The element type.
    type Element;

    /// An empty buffer.
    fn create_buffer() -> Self::Buffer;
    /// Appends one decoded element.
    fn add(buffer: &mut Self::Buffer, element: Self::Element);
    /// Turns the finished buffer into the collection.
    fn to_result(buffer: Self::Buffer) -> Self::Collection;
}

/// Collections that are their own buffer.
pub struct ExtendAdapter<C, T>(PhantomData<fn() -> (C, T)>);

impl<C: Default + Extend<T>, T> CollectionBufferAdapter for ExtendAdapter<C, T> {
    type Collection = C;
    type Buffer = C;
    type Element = T;

    fn create_buffer() -> C {
        C::default()
    }

    fn add(buffer: &mut C, element: T) {
        buffer.extend(Some(element));
    }

    fn to_result(buffer: C) -> C {
        buffer
    }
}

/// Collections built from a finished `Vec`.
pub struct VecBufferAdapter<C, T>(PhantomData<fn() -> (C, T)>);

impl<C: From<Vec<T>>, T> CollectionBufferAdapter for VecBufferAdapter<C, T> {
    type Collection = C;
    type Buffer = Vec<T>;
    type Element = T;

    fn create_buffer() -> Vec<T> {
        Vec::new()
    }

    fn add(buffer: &mut Vec<T>, element: T) {
        buffer.push(element);
    }

    fn to_result(buffer: Vec<T>) -> C {
        C::from(buffer)
    }
}

#[rustfmt::skip]
static INDEX_PREFIXES: [&str; 100] = [
    "[0]", "[1]", "[2]", "[3]", "[4]", "[5]", "[6]", "[7]", "[8]", "[9]",
    "[10]", "[11]", "[12]", "[13]", "[14]", "[15]", "[16]", "[17]", "[18]", "[19]",
    "[20]", "[21]", "[22]", "[23]", "[24]", "[25]", "[26]", "[27]", "[28]", "[29]",
    "[30]", "[31]", "[32]", "[33]", "[34]", "[35]", "[36]", "[37]", "[38]", "[39]",
    "[40]", "[41]", "[42]", "[43]", "[44]", "[45]", "[46]", "[47]", "[48]", "[49]",
    "[50]", "[51]", "[52]", "[53]", "[54]", "[55]", "[56]", "[57]", "[58]", "[59]",
    "[60]", "[61]", "[62]", "[63]", "[64]", "[65]", "[66]", "[67]", "[68]", "[69]",
    "[70]", "[71]", "[72]", "[73]", "[74]", "[75]", "[76]", "[77]", "[78]", "[79]",
    "[80]", "[81]", "[82]", "[83]", "[84]", "[85]", "[86]", "[87]", "[88]", "[89]",
    "[90]", "[91]", "[92]", "[93]", "[94]", "[95]", "[96]", "[97]", "[98]", "[99]",
];

/// Longest `[n]` for a `usize`.
const MAX_INDEX_PREFIX_LEN: usize = 2 + 20;

/// The `[n]` segment of an element.
enum IndexPrefix {
    Cached(&'static str),
    Formatted {
        buf: [u8; MAX_INDEX_PREFIX_LEN],
        len: usize,
    },
}

impl IndexPrefix {
    fn new(index: usize) -> Self {
        if let Some(cached) = INDEX_PREFIXES.get(index) {
            return Self::Cached(cached);
        }

        let mut digits = itoa::Buffer::new();
        let digits = digits.format(index).as_bytes();
        let mut buf = [0; MAX_INDEX_PREFIX_LEN];
        buf[0] = b'[';
        buf[1..=digits.len()].copy_from_slice(digits);
        buf[digits.len() + 1] = b']';
        Self::Formatted {
            buf,
            len: digits.len() + 2,
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Self::Cached(prefix) => prefix,
            Self::Formatted { buf, len } => std::str::from_utf8(&buf[..*len]).unwrap_or_default(),
        }
    }
}

/// Decodes a sequence from indexed keys (`items[0]`, `items[1]`, ...) or,
/// for single-value elements, from a repeated field (`items=a&items=b`).
///
/// Indices are read in order starting at zero; the first missing index ends
/// the sequence. At most
/// [`max_collection_size`](FormDataMapperOptions::max_collection_size)
/// elements are bound.
pub struct CollectionConverter<A, C> {
    element: C,
    _adapter: PhantomData<fn() -> A>,
}

impl<A, C> CollectionConverter<A, C> {
    /// Decodes every element with `element`.
    pub fn new(element: C) -> Self {
        Self {
            element,
            _adapter: PhantomData,
        }
    }
}

impl<A, C> CollectionConverter<A, C>
where
    A: CollectionBufferAdapter,
    C: FormDataConverter<A::Element>,
{
    /// Whether the element converter would find something at the current
    /// prefix, without decoding it.
    fn element_submitted(&self, reader: &mut FormDataReader<'_>) -> bool {
        if self.element.can_convert_single_value() {
            reader.try_get_value().is_some()
        } else {
            reader.current_prefix_exists()
        }
    }

    fn read_indexed(
        &self,
        reader: &mut FormDataReader<'_>,
        options: &FormDataMapperOptions,
    ) -> Option<ReadOutcome<A::Collection>> {
        let max = options.max_collection_size;
        let mut buffer = None;
        let mut succeeded = true;

        for index in 0.. {
            let prefix = IndexPrefix::new(index);
            let prefix = prefix.as_str();

            if index >= max {
                // Only an error when the submission really goes on.
                match reader.with_prefix(prefix, |reader| Ok(self.element_submitted(reader))) {
                    Ok(false) => {}
                    Ok(true) => {
                        buffer.get_or_insert_with(A::create_buffer);
                        reader.add_mapping_error(MappingErrorKind::CollectionTooLarge { max }, None);
                        reader.attach_instance_to_errors::<A::Collection>();
                        succeeded = false;
                    }
                    Err(fault) => {
                        buffer.get_or_insert_with(A::create_buffer);
                        reader.add_mapping_error(MappingErrorKind::Fault(fault), None);
                        succeeded = false;
                    }
                }
                break;
            }

            let element =
                match reader.with_prefix(prefix, |reader| self.element.try_read(reader, options)) {
                    Ok(element) => element,
                    Err(fault) => {
                        reader.add_mapping_error(MappingErrorKind::Fault(fault), None);
                        buffer.get_or_insert_with(A::create_buffer);
                        succeeded = false;
                        break;
                    }
                };
            if !element.found {
                break;
            }

            succeeded &= element.succeeded;
            let buffer = buffer.get_or_insert_with(A::create_buffer);
            if let Some(value) = element.value {
                A::add(buffer, value);
            }
        }

        buffer.map(|buffer| ReadOutcome {
            value: Some(A::to_result(buffer)),
            found: true,
            succeeded,
        })
    }

    fn read_repeated(
        &self,
        reader: &mut FormDataReader<'_>,
        options: &FormDataMapperOptions,
    ) -> ReadOutcome<A::Collection> {
        let Some(values) = reader
            .try_get_values()
            .filter(|_| self.element.can_convert_single_value())
        else {
            return ReadOutcome::absent();
        };

        let max = options.max_collection_size;
        let mut buffer = A::create_buffer();
        let mut succeeded = true;
        for (position, value) in values.iter().enumerate() {
            if position >= max {
                reader.add_mapping_error(MappingErrorKind::CollectionTooLarge { max }, None);
                reader.attach_instance_to_errors::<A::Collection>();
                succeeded = false;
                break;
            }
            let element = self.element.try_convert_value(reader, value);
            succeeded &= element.succeeded;
            if let Some(element) = element.value {
                A::add(&mut buffer, element);
            }
        }

        ReadOutcome {
            value: Some(A::to_result(buffer)),
            found: true,
            succeeded,
        }
    }
}

impl<A, C> FormDataConverter<A::Collection> for CollectionConverter<A, C>
where
    A: CollectionBufferAdapter,
    C: FormDataConverter<A::Element>,
{
    fn try_read(
        &self,
        reader: &mut FormDataReader<'_>,
        options: &FormDataMapperOptions,
    ) -> Result<ReadOutcome<A::Collection>, MappingFault> {
        trace!("reading collection at '{}'", reader.prefix());
        if let Some(outcome) = self.read_indexed(reader, options) {
            return Ok(outcome);
        }
        Ok(self.read_repeated(reader, options))
    }
}

macro_rules! impl_form_value_for_sequences {
    ($($adapter:ident => $collection:ty where [$($bound:tt)*]),+ $(,)?) => {
        $(
            impl<T: FormValue $($bound)*> FormValue for $collection {
                fn create_converter(
                    options: &FormDataMapperOptions,
                ) -> Arc<dyn FormDataConverter<Self>> {
                    Arc::new(CollectionConverter::<$adapter<$collection, T>, _>::new(
                        options.resolve_converter::<T>(),
                    ))
                }
            }
        )+
    };
}

impl_form_value_for_sequences!(
    ExtendAdapter => Vec<T> where [],
    ExtendAdapter => VecDeque<T> where [],
    ExtendAdapter => LinkedList<T> where [],
    ExtendAdapter => BTreeSet<T> where [+ Ord],
    ExtendAdapter => HashSet<T> where [+ Eq + Hash],
    ExtendAdapter => BinaryHeap<T> where [+ Ord],
    VecBufferAdapter => Box<[T]> where [],
    VecBufferAdapter => Arc<[T]> where [],
);

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{Culture, FormData, FormDataMapper};

    fn numbered(prefix: &str, count: usize) -> FormData {
        (0..count)
            .map(|i| (format!("{prefix}[{i}]"), i.to_string()))
            .collect()
    }

    fn options(max: usize) -> FormDataMapperOptions {
        FormDataMapperOptions {
            max_collection_size: max,
            ..FormDataMapperOptions::default()
        }
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(99)]
    #[case(100)]
    #[case(101)]
    #[case(1000)]
    fn index_prefixes(#[case] index: usize) {
        assert_eq!(IndexPrefix::new(index).as_str(), format!("[{index}]"));
    }

    #[test]
    fn index_prefixes_fit_usize_max() {
        let prefix = IndexPrefix::new(usize::MAX);
        assert_eq!(prefix.as_str(), format!("[{}]", usize::MAX));
    }

    #[rstest]
    #[case::below_default(99, 100, 99, 0)]
    #[case::at_default(100, 100, 100, 0)]
    #[case::above_default(101, 100, 100, 1)]
    #[case::ninety_nine_custom(99, 110, 99, 0)]
    #[case::hundred_custom(100, 110, 100, 0)]
    #[case::hundred_one_custom(101, 110, 101, 0)]
    #[case::at_custom(110, 110, 110, 0)]
    #[case::above_custom(120, 110, 110, 1)]
    fn collections_are_capped(
        #[case] submitted: usize,
        #[case] max: usize,
        #[case] bound: usize,
        #[case] errors: usize,
    ) {
        let data = numbered("values", submitted);
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("values").unwrap();

        let outcome = FormDataMapper::try_map::<Vec<usize>>(&mut reader, &options(max)).unwrap();
        let values = outcome.value.unwrap();
        assert_eq!(values.len(), bound);
        assert_eq!(values, (0..bound).collect::<Vec<_>>());
        assert_eq!(outcome.succeeded, errors == 0);
        assert_eq!(reader.errors().len(), errors);

        if errors == 1 {
            let error = &reader.errors().as_slice()[0];
            assert_eq!(error.path(), "values");
            assert_eq!(
                error.kind().to_string(),
                format!(
                    "The number of elements in the collection exceeded the maximum number of '{max}' elements allowed."
                )
            );
            assert!(error.container().unwrap().type_name.ends_with("Vec<usize>"));
        }
    }

    #[test]
    fn indexed_keys_bind_in_order() {
        let data = FormData::from_urlencoded(b"items[0]=a&items[1]=b&items[2]=c");
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("items").unwrap();

        let outcome =
            FormDataMapper::try_map::<Vec<String>>(&mut reader, &FormDataMapperOptions::default())
                .unwrap();
        assert_eq!(
            outcome,
            ReadOutcome::success(vec!["a".to_owned(), "b".to_owned(), "c".to_owned()])
        );
    }

    #[test]
    fn repeated_fields_bind_as_a_sequence() {
        let data = FormData::from_urlencoded(b"tags=a&tags=b&tags=c");
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("tags").unwrap();

        let tags = FormDataMapper::map::<Vec<String>>(&mut reader, &FormDataMapperOptions::default())
            .unwrap();
        assert_eq!(tags, Some(vec!["a".into(), "b".into(), "c".into()]));
    }

    #[test]
    fn repeated_fields_are_capped() {
        let data = FormData::from_urlencoded(b"n=1&n=2&n=3");
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("n").unwrap();

        let outcome = FormDataMapper::try_map::<Vec<u8>>(&mut reader, &options(2)).unwrap();
        assert_eq!(outcome, ReadOutcome::failure(Some(vec![1, 2])));
        assert_eq!(reader.errors().len(), 1);
    }

    #[test]
    fn keys_below_the_next_index_are_not_an_element() {
        let data = FormData::from_pairs([("n[0]", "1"), ("n[1]", "2"), ("n[2].x", "3")]);
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("n").unwrap();

        let outcome = FormDataMapper::try_map::<Vec<u8>>(&mut reader, &options(2)).unwrap();
        assert_eq!(outcome, ReadOutcome::success(vec![1, 2]));
        assert!(reader.errors().is_empty());
    }

    #[test]
    fn depth_faults_at_the_limit_are_not_capacity_errors() {
        let data = FormData::from_pairs([("n[0]", "1")]);
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("n").unwrap();
        let options = FormDataMapperOptions {
            max_collection_size: 0,
            max_recursion_depth: 1,
            ..FormDataMapperOptions::default()
        };

        let outcome = FormDataMapper::try_map::<Vec<u8>>(&mut reader, &options).unwrap();
        assert_eq!(outcome, ReadOutcome::failure(Some(Vec::new())));
        let errors = reader.take_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), "n");
        assert_eq!(
            errors[0].kind(),
            &MappingErrorKind::Fault(MappingFault::MaxRecursionDepthExceeded {
                max: 1,
                path: "n[0]".into(),
            })
        );
    }

    #[test]
    fn indexed_keys_win_over_repeated_fields() {
        let data = FormData::from_pairs([("n[0]", "1"), ("n", "5"), ("n", "6")]);
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("n").unwrap();

        let n = FormDataMapper::map::<Vec<u8>>(&mut reader, &FormDataMapperOptions::default());
        assert_eq!(n.unwrap(), Some(vec![1]));
    }

    #[test]
    fn a_gap_ends_the_sequence() {
        let data = FormData::from_pairs([("n[0]", "1"), ("n[1]", "2"), ("n[3]", "4")]);
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("n").unwrap();

        let n = FormDataMapper::map::<Vec<u8>>(&mut reader, &FormDataMapperOptions::default());
        assert_eq!(n.unwrap(), Some(vec![1, 2]));
    }

    #[test]
    fn bad_elements_are_skipped_and_reported() {
        let data = FormData::from_pairs([("n[0]", "1"), ("n[1]", "two"), ("n[2]", "3")]);
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("n").unwrap();

        let outcome =
            FormDataMapper::try_map::<Vec<u8>>(&mut reader, &FormDataMapperOptions::default())
                .unwrap();
        assert_eq!(outcome, ReadOutcome::failure(Some(vec![1, 3])));

        let error = &reader.errors().as_slice()[0];
        assert_eq!(error.path(), "n[1]");
        assert_eq!(error.attempted_value(), Some("two"));
        assert_eq!(error.kind().to_string(), "The value 'two' is not valid for '[1]'.");
    }

    #[test]
    fn nothing_submitted_is_absent() {
        let data = FormData::from_pairs([("other", "1")]);
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("n").unwrap();

        let outcome =
            FormDataMapper::try_map::<Vec<u8>>(&mut reader, &FormDataMapperOptions::default())
                .unwrap();
        assert_eq!(outcome, ReadOutcome::absent());
        assert!(reader.errors().is_empty());
    }

    #[test]
    fn every_sequence_shape_binds() {
        let data = FormData::from_urlencoded(b"n[0]=3&n[1]=1&n[2]=3&n[3]=2");
        let options = FormDataMapperOptions::default();
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("n").unwrap();

        let deque = FormDataMapper::map::<VecDeque<u8>>(&mut reader, &options).unwrap();
        assert_eq!(deque.unwrap(), [3, 1, 3, 2]);
        let list = FormDataMapper::map::<LinkedList<u8>>(&mut reader, &options).unwrap();
        assert_eq!(list.unwrap().into_iter().collect::<Vec<_>>(), [3, 1, 3, 2]);
        let set = FormDataMapper::map::<BTreeSet<u8>>(&mut reader, &options).unwrap();
        assert_eq!(set.unwrap().into_iter().collect::<Vec<_>>(), [1, 2, 3]);
        let hashed = FormDataMapper::map::<HashSet<u8>>(&mut reader, &options).unwrap();
        assert_eq!(hashed.unwrap().len(), 3);
        let heap = FormDataMapper::map::<BinaryHeap<u8>>(&mut reader, &options).unwrap();
        assert_eq!(heap.unwrap().into_sorted_vec(), [1, 2, 3, 3]);
        let boxed = FormDataMapper::map::<Box<[u8]>>(&mut reader, &options).unwrap();
        assert_eq!(boxed.as_deref(), Some(&[3, 1, 3, 2][..]));
        let shared = FormDataMapper::map::<Arc<[u8]>>(&mut reader, &options).unwrap();
        assert_eq!(shared.as_deref(), Some(&[3, 1, 3, 2][..]));
    }

    #[test]
    fn nested_sequences() {
        let data = FormData::from_urlencoded(b"m[0][0]=1&m[0][1]=2&m[1][0]=3");
        let mut reader = FormDataReader::new(&data, Culture::invariant());
        reader.push_prefix("m").unwrap();

        let m = FormDataMapper::map::<Vec<Vec<u8>>>(&mut reader, &FormDataMapperOptions::default());
        assert_eq!(m.unwrap(), Some(vec![vec![1, 2], vec![3]]));
    }
}
