use serde_json::{Map, Value};
use crate::errors::{Error, Result};

/// The capability set a template needs from its variable scope.
///
/// Both the plain [`Context`] and the tracking proxy implement it, so a
/// template renders the same way whether or not it is being observed.
pub trait RenderContext {
    /// Write one key into the innermost scope.
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
    /// Resolve one key, innermost scope first.
    fn get(&mut self, key: &str) -> Option<&Value>;
    /// Merge every scope into one mapping, inner scopes winning.
    fn flatten(&self) -> Result<Map<String, Value>>;
}

/// Layered variable scope. Layers are stored outermost first; lookups walk
/// them from the top of the stack down.
///
/// A layer is any JSON value so that a misbehaving caller can push something
/// that is not a mapping; such a context still resolves keys from its other
/// layers but refuses to flatten.
#[derive(Debug, Clone)]
pub struct Context {
    layers: Vec<Value>,
}

impl Default for Context {
    fn default() -> Self {
        Self { layers: vec![Value::Object(Map::new())] }
    }
}

impl Context {
    pub fn new() -> Self { Self::default() }

    /// Build a context whose only layer is `map`.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self { layers: vec![Value::Object(map)] }
    }

    /// Build a context from a JSON object; anything else becomes its own layer.
    pub fn from_value(value: Value) -> Self {
        Self { layers: vec![value] }
    }

    /// Push a new innermost layer.
    pub fn push(&mut self, layer: Value) {
        self.layers.push(layer);
    }

    /// Drop the innermost layer. The outermost layer is never removed.
    pub fn pop(&mut self) -> Option<Value> {
        if self.layers.len() > 1 {
            self.layers.pop()
        } else {
            None
        }
    }

    /// Push `layer` on top of the stack, like `push` but only for mappings.
    pub fn update(&mut self, layer: Map<String, Value>) {
        self.layers.push(Value::Object(layer));
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        self.layers
            .iter()
            .rev()
            .filter_map(Value::as_object)
            .find_map(|layer| layer.get(key))
    }
}

impl RenderContext for Context {
    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        match self.layers.last_mut() {
            Some(Value::Object(top)) => {
                top.insert(key.to_string(), value);
                Ok(())
            }
            Some(other) => Err(Error::Flatten(format!(
                "cannot set `{key}`: innermost layer is not a mapping ({other})"
            ))),
            None => {
                let mut top = Map::new();
                top.insert(key.to_string(), value);
                self.layers.push(Value::Object(top));
                Ok(())
            }
        }
    }

    fn get(&mut self, key: &str) -> Option<&Value> {
        self.lookup(key)
    }

    fn flatten(&self) -> Result<Map<String, Value>> {
        let mut flat = Map::new();
        for (depth, layer) in self.layers.iter().enumerate() {
            match layer {
                Value::Object(map) => {
                    for (k, v) in map {
                        flat.insert(k.clone(), v.clone());
                    }
                }
                other => {
                    return Err(Error::Flatten(format!(
                        "layer {depth} is not a mapping: {other}"
                    )))
                }
            }
        }
        Ok(flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn layered() -> Context {
        let mut ctx = Context::from_value(json!({"a": 1, "b": 2}));
        ctx.push(json!({"b": 3, "c": 4}));
        ctx
    }

    #[test]
    fn get_prefers_innermost_layer() {
        let mut ctx = layered();
        assert_eq!(ctx.get("b"), Some(&json!(3)));
        assert_eq!(ctx.get("a"), Some(&json!(1)));
        assert_eq!(ctx.get("zzz"), None);
    }

    #[test]
    fn flatten_merges_inner_over_outer() {
        let flat = layered().flatten().unwrap();
        assert_eq!(Value::Object(flat), json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn set_writes_top_layer_and_pop_discards_it() {
        let mut ctx = layered();
        ctx.set("a", json!("shadow")).unwrap();
        assert_eq!(ctx.get("a"), Some(&json!("shadow")));
        ctx.pop();
        assert_eq!(ctx.get("a"), Some(&json!(1)));
        assert!(ctx.pop().is_none());
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn update_shadows_until_popped() {
        let mut ctx = layered();
        let mut layer = Map::new();
        layer.insert("c".into(), json!("updated"));
        ctx.update(layer);
        assert_eq!(ctx.depth(), 3);
        assert_eq!(ctx.get("c"), Some(&json!("updated")));
        assert_eq!(ctx.flatten().unwrap().get("c"), Some(&json!("updated")));
        assert_eq!(ctx.pop(), Some(json!({"c": "updated"})));
        assert_eq!(ctx.get("c"), Some(&json!(4)));
    }

    #[test]
    fn flatten_rejects_non_mapping_layer() {
        let mut ctx = layered();
        ctx.push(json!(["not", "a", "map"]));
        assert!(matches!(ctx.flatten(), Err(Error::Flatten(_))));
        // lookups still skip the bad layer
        assert_eq!(ctx.get("c"), Some(&json!(4)));
        assert!(ctx.set("x", json!(1)).is_err());
    }
}
