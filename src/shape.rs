//! Cached template shapes and the base hooks that produce and resolve them.
//!
//! The shape pass renders the sparse tree with placeholders left unresolved:
//! it decides once which nodes are sequences and which are mappings. The
//! resolve pass then substitutes the current placeholder values into that
//! shape for every row.

use serde_json::Value;
use smol_str::SmolStr;

use crate::options::Options;
use crate::path::SEPARATOR;
use crate::render::{Children, Collect, Hooks, Rendered, TreeView};
use crate::tree::{Node, Slot};
use crate::Result;

/// A rendered tree whose leaves are still placeholders.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Slot(Slot),
    Fill(Value),
    Sequence(Vec<Shape>),
    Mapping(Vec<(SmolStr, Shape)>),
}

impl Shape {
    pub fn is_sequence(&self) -> bool {
        matches!(self, Shape::Sequence(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Shape::Mapping(_))
    }

    /// Child shape under `segment`, by key for mappings and by position for
    /// sequences.
    pub fn get(&self, segment: &str) -> Option<&Shape> {
        match self {
            Shape::Mapping(entries) => entries
                .iter()
                .find(|(key, _)| key.as_str() == segment)
                .map(|(_, shape)| shape),
            Shape::Sequence(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            Shape::Slot(_) | Shape::Fill(_) => None,
        }
    }

    /// Shape at a dotted path, `self` for `""`.
    pub fn at(&self, path: &str) -> Option<&Shape> {
        if path.is_empty() {
            return Some(self);
        }
        path.split(SEPARATOR)
            .try_fold(self, |shape, segment| shape.get(segment))
    }
}

pub struct NodeEntries<'a>(indexmap::map::Iter<'a, SmolStr, Node>);

impl<'a> Iterator for NodeEntries<'a> {
    type Item = (&'a str, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(key, node)| (key.as_str(), node))
    }
}

impl TreeView for Node {
    type Entries<'a> = NodeEntries<'a>;

    fn children(&self) -> Option<Children<'_, Self, NodeEntries<'_>>> {
        match self {
            Node::Branch(branch) => Some(Children::Keyed(NodeEntries(branch.iter()))),
            Node::Leaf(_) => None,
        }
    }
}

pub struct ShapeEntries<'a>(std::slice::Iter<'a, (SmolStr, Shape)>);

impl<'a> Iterator for ShapeEntries<'a> {
    type Item = (&'a str, &'a Shape);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(key, shape)| (key.as_str(), shape))
    }
}

impl TreeView for Shape {
    type Entries<'a> = ShapeEntries<'a>;

    fn children(&self) -> Option<Children<'_, Self, ShapeEntries<'_>>> {
        match self {
            Shape::Mapping(entries) => Some(Children::Keyed(ShapeEntries(entries.iter()))),
            Shape::Sequence(items) => Some(Children::Indexed(items)),
            Shape::Slot(_) | Shape::Fill(_) => None,
        }
    }
}

impl Collect for Shape {
    fn empty() -> Self {
        Shape::Fill(Value::Null)
    }

    fn sequence(items: Vec<Self>) -> Self {
        Shape::Sequence(items)
    }

    fn mapping(entries: Vec<(SmolStr, Self)>) -> Self {
        Shape::Mapping(entries)
    }
}

/// Base hooks with placeholder resolution off.
///
/// Leaves stay placeholders; sequence gaps take the configured fill value so
/// the resolve pass never has to consult options again.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeHooks<'o> {
    options: Option<&'o Options>,
}

impl<'o> ShapeHooks<'o> {
    pub fn new(options: Option<&'o Options>) -> Self {
        Self { options }
    }
}

impl Hooks<Node> for ShapeHooks<'_> {
    type Output = Shape;

    fn on_leaf(&self, leaf: &Node, _path: &str) -> Result<Rendered<Shape>> {
        match leaf {
            Node::Leaf(slot) => Ok(Rendered::Keep(Shape::Slot(*slot))),
            // The renderer only hands leaves to `on_leaf`.
            Node::Branch(_) => Ok(Rendered::Keep(Shape::empty())),
        }
    }

    fn fill_value(&self, path: &str) -> Shape {
        let fill = self
            .options
            .and_then(|options| options.fill_value(path))
            .cloned()
            .unwrap_or(Value::Null);
        Shape::Fill(fill)
    }
}

/// Base hooks with placeholder resolution on: every slot is replaced by the
/// value currently bound to it.
#[derive(Debug, Clone, Copy)]
pub struct ResolveHooks<'s> {
    slots: &'s [Value],
}

impl<'s> ResolveHooks<'s> {
    pub fn new(slots: &'s [Value]) -> Self {
        Self { slots }
    }
}

impl Hooks<Shape> for ResolveHooks<'_> {
    type Output = Value;

    fn on_leaf(&self, leaf: &Shape, _path: &str) -> Result<Rendered<Value>> {
        let value = match leaf {
            Shape::Slot(slot) => self.slots.get(*slot).cloned().unwrap_or(Value::Null),
            Shape::Fill(value) => value.clone(),
            Shape::Sequence(_) | Shape::Mapping(_) => Value::Null,
        };
        Ok(Rendered::Keep(value))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::options::FieldOptions;
    use crate::path::Path;
    use crate::render::render;
    use crate::tree::Branch;

    fn tree(headers: &[&str]) -> Node {
        let mut root = Branch::new();
        for (slot, header) in headers.iter().enumerate() {
            root.set(&Path::parse(header), slot).unwrap();
        }
        Node::Branch(root)
    }

    fn shape_of(headers: &[&str], options: Option<&Options>) -> Shape {
        render(&tree(headers), &ShapeHooks::new(options))
            .unwrap()
            .into_option()
            .unwrap()
    }

    #[test]
    fn shape_keeps_placeholders() {
        let shape = shape_of(&["abc.1", "abc.0", "status"], None);
        assert_eq!(
            shape,
            Shape::Mapping(vec![
                (
                    SmolStr::new("abc"),
                    Shape::Sequence(vec![Shape::Slot(1), Shape::Slot(0)])
                ),
                (SmolStr::new("status"), Shape::Slot(2)),
            ])
        );
    }

    #[test]
    fn shape_fill_comes_from_options() {
        let mut options = Options::new();
        options.insert("abc", FieldOptions::new().with_fill_value(json!(0)));
        let shape = shape_of(&["abc.2"], Some(&options));
        let abc = shape.get("abc").unwrap();
        assert!(abc.is_sequence());
        assert_eq!(abc.get("0"), Some(&Shape::Fill(json!(0))));
        assert_eq!(abc.get("2"), Some(&Shape::Slot(0)));
    }

    #[test]
    fn lookup_by_dotted_path() {
        let shape = shape_of(&["abc.1.def", "status"], None);
        assert!(shape.at("").unwrap().is_mapping());
        assert!(shape.at("abc").unwrap().is_sequence());
        assert_eq!(shape.at("abc.0"), Some(&Shape::Fill(Value::Null)));
        assert!(shape.at("abc.1").unwrap().is_mapping());
        assert_eq!(shape.at("abc.1.def"), Some(&Shape::Slot(0)));
        assert_eq!(shape.at("status.x"), None);
        assert_eq!(shape.at("missing"), None);
    }

    #[test]
    fn resolve_substitutes_current_values() {
        let shape = shape_of(&["abc.5.3.def", "abc.1", "status"], None);
        let slots = vec![json!("3"), json!("1"), json!(true)];
        let value = render(&shape, &ResolveHooks::new(&slots))
            .unwrap()
            .into_option()
            .unwrap();
        assert_eq!(
            value,
            json!({
                "abc": [null, "1", null, null, null, [null, null, null, {"def": "3"}]],
                "status": true,
            })
        );
    }
}
