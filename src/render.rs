//! The recursive tree-to-nested renderer.
//!
//! One algorithm drives every pass: it walks any [`TreeView`], renders leaves
//! and collections through a [`Hooks`] implementation, and decides for each
//! collection whether it becomes a sequence or a mapping.

use serde_json::{Map, Value};
use smol_str::SmolStr;

use crate::path::{segment_index, PathCursor};
use crate::Result;

/// Outcome of rendering one value: keep it, or remove it from its parent.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered<T> {
    Keep(T),
    Drop,
}

impl<T> Rendered<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Rendered::Keep(value) => Some(value),
            Rendered::Drop => None,
        }
    }
}

/// Children of a collection node.
pub enum Children<'a, N, E> {
    /// Children addressed by segment strings.
    Keyed(E),
    /// Children addressed by position.
    Indexed(&'a [N]),
}

/// A tree the renderer can walk.
pub trait TreeView: Sized {
    type Entries<'a>: Iterator<Item = (&'a str, &'a Self)>
    where
        Self: 'a;

    /// `None` for leaves.
    fn children(&self) -> Option<Children<'_, Self, Self::Entries<'_>>>;
}

/// Values the renderer can assemble collections of.
pub trait Collect: Sized + Clone {
    /// The explicit empty marker used for unfilled sequence positions.
    fn empty() -> Self;

    fn sequence(items: Vec<Self>) -> Self;

    fn mapping(entries: Vec<(SmolStr, Self)>) -> Self;
}

/// Leaf and collection behavior for one render pass.
///
/// `path` is the dotted path of the visited node, `""` at the root.
pub trait Hooks<N: TreeView> {
    type Output: Collect;

    /// Whether the collection at `path` is walked into. When false it is
    /// handed to `on_leaf` whole.
    fn descend(&self, path: &str) -> bool {
        let _ = path;
        true
    }

    fn on_leaf(&self, leaf: &N, path: &str) -> Result<Rendered<Self::Output>>;

    fn on_collection(
        &self,
        collection: Self::Output,
        path: &str,
    ) -> Result<Rendered<Self::Output>> {
        let _ = path;
        Ok(Rendered::Keep(collection))
    }

    fn fill_value(&self, path: &str) -> Self::Output {
        let _ = path;
        Self::Output::empty()
    }
}

pub fn render<N, H>(node: &N, hooks: &H) -> Result<Rendered<H::Output>>
where
    N: TreeView,
    H: Hooks<N> + ?Sized,
{
    let mut cursor = PathCursor::new();
    render_node(node, &mut cursor, hooks)
}

struct Entry<T> {
    key: SmolStr,
    index: Option<usize>,
    value: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Sequence(usize),
    Mapping,
}

fn render_node<N, H>(node: &N, cursor: &mut PathCursor, hooks: &H) -> Result<Rendered<H::Output>>
where
    N: TreeView,
    H: Hooks<N> + ?Sized,
{
    let children = match node.children() {
        Some(children) if hooks.descend(cursor.as_str()) => children,
        _ => return hooks.on_leaf(node, cursor.as_str()),
    };

    let mut entries = Vec::new();
    let layout = match children {
        Children::Keyed(iter) => {
            for (key, child) in iter {
                cursor.push(key);
                let rendered = render_node(child, cursor, hooks)?;
                cursor.pop();
                if let Rendered::Keep(value) = rendered {
                    entries.push(Entry {
                        key: SmolStr::new(key),
                        index: segment_index(key),
                        value,
                    });
                }
            }
            classify(&entries)
        }
        Children::Indexed(items) => {
            for (index, child) in items.iter().enumerate() {
                cursor.push_index(index);
                let rendered = render_node(child, cursor, hooks)?;
                cursor.pop();
                if let Rendered::Keep(value) = rendered {
                    entries.push(Entry {
                        key: SmolStr::default(),
                        index: Some(index),
                        value,
                    });
                }
            }
            Layout::Sequence(entries.last().map_or(0, |entry| entry.index.map_or(0, |i| i + 1)))
        }
    };

    let collection = match layout {
        Layout::Sequence(len) => {
            let mut items = vec![hooks.fill_value(cursor.as_str()); len];
            for entry in entries {
                if let Some(index) = entry.index {
                    items[index] = entry.value;
                }
            }
            H::Output::sequence(items)
        }
        Layout::Mapping => H::Output::mapping(
            entries
                .into_iter()
                .map(|entry| (entry.key, entry.value))
                .collect(),
        ),
    };
    hooks.on_collection(collection, cursor.as_str())
}

/// A keyed collection is a sequence when it is non-empty and every key is an
/// index segment; its length is then the highest index plus one. Any key
/// segment, including digits above `MAX_INDEX`, makes it a mapping.
fn classify<T>(entries: &[Entry<T>]) -> Layout {
    if entries.is_empty() {
        return Layout::Mapping;
    }
    let mut len = 0usize;
    for entry in entries {
        match entry.index {
            Some(index) => len = len.max(index + 1),
            None => return Layout::Mapping,
        }
    }
    Layout::Sequence(len)
}

pub struct ObjectEntries<'a>(serde_json::map::Iter<'a>);

impl<'a> Iterator for ObjectEntries<'a> {
    type Item = (&'a str, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(key, value)| (key.as_str(), value))
    }
}

impl TreeView for Value {
    type Entries<'a> = ObjectEntries<'a>;

    fn children(&self) -> Option<Children<'_, Self, ObjectEntries<'_>>> {
        match self {
            Value::Object(map) => Some(Children::Keyed(ObjectEntries(map.iter()))),
            Value::Array(items) => Some(Children::Indexed(items)),
            _ => None,
        }
    }
}

impl Collect for Value {
    fn empty() -> Self {
        Value::Null
    }

    fn sequence(items: Vec<Self>) -> Self {
        Value::Array(items)
    }

    fn mapping(entries: Vec<(SmolStr, Self)>) -> Self {
        let mut map = Map::with_capacity(entries.len());
        for (key, value) in entries {
            map.insert(key.to_string(), value);
        }
        Value::Object(map)
    }
}
