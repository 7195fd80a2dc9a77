pub mod error;
pub mod flatten;
pub mod options;
pub mod path;
pub mod reader;
pub mod render;
pub mod shape;
pub mod template;
pub mod tree;

pub use crate::error::{BoxError, Error, ErrorKind};
pub use crate::flatten::{flatten, json_to_flat, leaf_text, Flattened};
pub use crate::options::{
    infer_type, FieldOptions, OptionHooks, Options, Predicate, Render, Transform,
};
pub use crate::path::{Path, PathCursor, Segment};
pub use crate::reader::{csv_to_json, csv_to_json_with_config, ReaderConfig, Records};
pub use crate::render::{render, Collect, Hooks, Rendered, TreeView};
pub use crate::shape::{ResolveHooks, Shape, ShapeHooks};
pub use crate::template::Template;

pub type Result<T> = std::result::Result<T, Error>;

/// Bind `headers` to a fresh [`Template`] rendered with `options`.
///
/// # Examples
/// ```
/// use csv2json::{headers_to_template, FieldOptions, Options};
/// use serde_json::json;
///
/// let options = Options::new().with("abc.1", FieldOptions::new().with_infer_type(true));
/// let mut template = headers_to_template(["abc.0", "abc.1"], options).unwrap();
/// assert_eq!(template.render(["1", "2"]).unwrap(), json!({"abc": ["1", 2]}));
/// ```
pub fn headers_to_template<I, S>(headers: I, options: Options) -> Result<Template>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Template::with_options(headers, options)
}
