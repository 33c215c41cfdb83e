#![no_main]
use std::collections::{BTreeMap, HashMap};

use arbitrary::Arbitrary;
use formmap::{
    Culture, DateOrder, FormData, FormDataMapper, FormDataMapperOptions, FormDataReader,
    form_object,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Default)]
struct Node {
    name: String,
    weight: Option<f64>,
    children: Vec<Node>,
    next: Option<Box<Node>>,
    labels: HashMap<String, Vec<i16>>,
    seen: Option<time::Date>,
    id: Option<uuid::Uuid>,
    link: Option<http::Uri>,
    ranks: BTreeMap<u8, char>,
}

form_object!(Node {
    "Name" => name: String,
    "Weight" => weight: Option<f64>,
    "Children" => children: Vec<Node>,
    "Next" => next: Option<Box<Node>>,
    "Labels" => labels: HashMap<String, Vec<i16>>,
    "Seen" => seen: Option<time::Date>,
    "Id" => id: Option<uuid::Uuid>,
    "Link" => link: Option<http::Uri>,
    "Ranks" => ranks: BTreeMap<u8, char>,
});

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    max_collection_size: u8,
    max_recursion_depth: u8,
    max_error_count: u8,
    german: bool,
    prefix: Option<&'a str>,
    body: &'a [u8],
    pairs: Vec<(&'a str, &'a str)>,
}

fn mapper(input: &Input<'_>) {
    let mut data = FormData::from_urlencoded(input.body);
    for (key, value) in &input.pairs {
        data.append(key, *value);
    }

    let options = FormDataMapperOptions {
        max_collection_size: usize::from(input.max_collection_size),
        max_recursion_depth: usize::from(input.max_recursion_depth),
        max_error_count: usize::from(input.max_error_count),
        ..FormDataMapperOptions::default()
    };
    let culture = if input.german {
        Culture::new("de-DE", ',', '.', DateOrder::DayMonthYear)
    } else {
        Culture::invariant()
    };

    let mut reader = FormDataReader::new(&data, culture);
    if let Some(prefix) = input.prefix {
        if reader.push_prefix(prefix).is_err() {
            return;
        }
    }
    let before = reader.prefix().to_owned();

    // Faults may only escape when nothing caught them, which a struct always
    // does.
    let outcome = FormDataMapper::try_map::<Node>(&mut reader, &options)
        .expect("struct decoding never raises");

    assert_eq!(reader.prefix(), before, "prefix not restored");
    assert!(reader.errors().len() <= options.max_error_count);
    if outcome.succeeded {
        assert!(reader.errors().is_empty() && reader.errors().dropped() == 0);
    }
    if let Some(node) = outcome.value {
        assert!(node.children.len() <= options.max_collection_size);
        assert!(node.labels.len() <= options.max_collection_size);
    }
}

fuzz_target!(|input: Input<'_>| mapper(&input));
