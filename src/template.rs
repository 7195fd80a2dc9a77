use serde_json::Value;

use crate::options::{OptionHooks, Options};
use crate::path::Path;
use crate::render::render as render_tree;
use crate::shape::{ResolveHooks, Shape, ShapeHooks};
use crate::tree::{Branch, Node, Slot};
use crate::{Error, Result};

/// Placeholders bound to the paths of a fixed header list.
///
/// The tree shape is computed on the first render and reused for every row;
/// each render only overwrites the placeholder values.
///
/// # Examples
/// ```
/// use csv2json::Template;
/// use serde_json::json;
///
/// let mut template = Template::new(["abc.0.def", "abc.1", "status"]).unwrap();
/// let record = template.render([3, 1, 2]).unwrap();
/// assert_eq!(record, json!({"abc": [{"def": 3}, 1], "status": 2}));
/// ```
#[derive(Debug, Clone)]
pub struct Template {
    headers: Vec<String>,
    tree: Branch,
    slots: Vec<Value>,
    options: Options,
    shape: Option<Shape>,
}

impl Template {
    pub fn new<I, S>(headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_options(headers, Options::default())
    }

    pub fn with_options<I, S>(headers: I, options: Options) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut template = Self {
            headers: Vec::new(),
            tree: Branch::new(),
            slots: Vec::new(),
            options,
            shape: None,
        };
        for header in headers {
            template.add_header(header.as_ref())?;
        }
        log::debug!(
            "built template with {} headers and {} option entries",
            template.headers.len(),
            template.options.len()
        );
        Ok(template)
    }

    /// Bind one more header to a new placeholder and invalidate the cached
    /// shape. Returns the placeholder's slot.
    pub fn add_header(&mut self, header: &str) -> Result<Slot> {
        let slot = self.headers.len();
        self.tree.set(&Path::parse(header), slot)?;
        self.headers.push(header.to_string());
        self.slots.push(Value::Null);
        self.shape = None;
        log::trace!("bound header `{header}` to slot {slot}");
        Ok(slot)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The cached shape, computed on first use.
    pub fn shape(&mut self) -> Result<&Shape> {
        cached_shape(&mut self.shape, &self.tree, &self.options)
    }

    /// Render one row. `values` must hold exactly one value per header.
    pub fn render<I, V>(&mut self, values: I) -> Result<Value>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.bind(values)?;
        let shape = cached_shape(&mut self.shape, &self.tree, &self.options)?;
        let resolved = render_tree(shape, &ResolveHooks::new(&self.slots))?
            .into_option()
            .unwrap_or(Value::Null);
        if self.options.is_empty() {
            return Ok(resolved);
        }
        let hooks = OptionHooks::new(&self.options).with_shape(shape);
        let rendered = render_tree(&resolved, &hooks)?;
        Ok(rendered.into_option().unwrap_or(Value::Null))
    }

    fn bind<I, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let expected = self.slots.len();
        let mut actual = 0;
        for value in values {
            if let Some(slot) = self.slots.get_mut(actual) {
                *slot = value.into();
            }
            actual += 1;
        }
        if actual != expected {
            return Err(Error::Arity { expected, actual });
        }
        Ok(())
    }
}

fn cached_shape<'a>(
    cache: &'a mut Option<Shape>,
    tree: &Branch,
    options: &Options,
) -> Result<&'a Shape> {
    let shape = match cache.take() {
        Some(shape) => shape,
        None => {
            let fills = (!options.is_empty()).then_some(options);
            let root = Node::Branch(tree.clone());
            let shape = render_tree(&root, &ShapeHooks::new(fills))?
                .into_option()
                .unwrap_or(Shape::Mapping(Vec::new()));
            log::debug!("computed template shape");
            shape
        }
    };
    Ok(cache.insert(shape))
}
