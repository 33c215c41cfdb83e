#![allow(missing_docs)]
#![allow(dead_code)]

use core::fmt::Write;

use formmap::{
    Culture, FormData, FormDataMapper, FormDataMapperOptions, FormDataMappingError,
    FormDataReader, FormValue,
};

/// Maps a urlencoded body at the root prefix.
pub fn map_body<T: FormValue>(
    body: &str,
    options: &FormDataMapperOptions,
) -> (Option<T>, Vec<FormDataMappingError>) {
    let data = FormData::from_urlencoded(body.as_bytes());
    let mut reader = FormDataReader::new(&data, Culture::invariant());
    let value = FormDataMapper::map::<T>(&mut reader, options).expect("mapping fault");
    (value, reader.take_errors())
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

/// One line per error: `path | message | attempted value | container path`.
pub fn render_errors(errors: &[FormDataMappingError]) -> String {
    let mut out = String::new();
    for error in errors {
        writeln!(
            out,
            "{} | {} | {} | {}",
            display_path(error.path()),
            error.kind(),
            error.attempted_value().unwrap_or("-"),
            error.container().map_or("-", |c| display_path(&c.path)),
        )
        .unwrap();
    }
    out
}
