//! Reference Resolver
//!
//! Resolves `$ref` fragments within a schema document and across schema files.
//! A reference pointing at another reference is chased until a concrete node is
//! reached; the chain of URIs being followed lives on a [`ResolutionScope`] so
//! that cycles are reported instead of recursing forever.

use parking_lot::RwLock;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use url::Url;

use crate::error::{Error, Result};

/// Scheme the `jsonschema` crate gives to references of a schema without an `$id`
const JSON_SCHEMA_SCHEME: &str = "json-schema";

// =============================================================================
// Resolution Scope
// =============================================================================

/// Stack of URIs whose `$ref` is currently being followed.
///
/// Created per top-level resolve call, starting with the resolver's base URI.
#[derive(Debug, Clone)]
pub struct ResolutionScope {
    stack: Vec<Url>,
}

impl ResolutionScope {
    pub fn new(base: Url) -> Self {
        Self { stack: vec![base] }
    }

    /// URI new references are joined against
    pub fn current(&self) -> &Url {
        // The base URI is never popped
        &self.stack[self.stack.len() - 1]
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.stack.contains(url)
    }

    pub fn push(&mut self, url: Url) {
        tracing::trace!(%url, depth = self.stack.len(), "push scope");
        self.stack.push(url);
    }

    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            if let Some(url) = self.stack.pop() {
                tracing::trace!(%url, depth = self.stack.len(), "pop scope");
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Render the stack, optionally followed by `current`, for error messages
    pub fn format(&self, current: Option<&Url>) -> String {
        let entries: Vec<String> = self
            .stack
            .iter()
            .chain(current)
            .map(Url::to_string)
            .collect();
        format_stack(&entries)
    }
}

/// Join scopes with ` => `, dropping the prefix they all share
pub fn format_stack(stack: &[String]) -> String {
    if stack.len() <= 1 {
        return stack.join(" => ");
    }

    let mut prefix = common_prefix(stack);
    if prefix.ends_with('/') {
        prefix.pop();
    }
    stack
        .iter()
        .map(|scope| &scope[prefix.len()..])
        .collect::<Vec<_>>()
        .join(" => ")
}

/// Character-wise longest common prefix
fn common_prefix(items: &[String]) -> String {
    let Some(first) = items.first() else {
        return String::new();
    };
    let mut end = first.len();
    for item in &items[1..] {
        end = first
            .char_indices()
            .zip(item.chars())
            .take_while(|((_, a), b)| a == b)
            .map(|((i, a), _)| i + a.len_utf8())
            .last()
            .unwrap_or(0)
            .min(end);
    }
    first[..end].to_string()
}

// =============================================================================
// JSON Pointer
// =============================================================================

/// Resolve a URI fragment (`/definitions/foo`) inside `document`
pub fn resolve_fragment<'a>(document: &'a Value, fragment: &str) -> Result<&'a Value> {
    let fragment = fragment.trim_start_matches('/');
    if fragment.is_empty() {
        return Ok(document);
    }

    let unresolvable = || Error::Schema(format!("Unresolvable JSON pointer: '{fragment}'"));
    let mut node = document;
    for part in percent_decode_str(fragment).decode_utf8_lossy().split('/') {
        let part = part.replace("~1", "/").replace("~0", "~");
        node = match node {
            Value::Object(map) => map.get(&part),
            Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
        .ok_or_else(unresolvable)?;
    }
    Ok(node)
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves references relative to a base URI (`file:///schemas/`).
///
/// Documents other than the base document are loaded from `file://` URIs as
/// YAML (a superset of JSON) and cached for the lifetime of the resolver and
/// its clones.
#[derive(Debug, Clone)]
pub struct RefResolver {
    base_uri: Url,
    document: Arc<Value>,
    cache: Arc<RwLock<HashMap<String, Arc<Value>>>>,
    cache_documents: bool,
}

impl RefResolver {
    pub fn new(base_uri: Url, document: Arc<Value>) -> Self {
        Self {
            base_uri,
            document,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_documents: true,
        }
    }

    /// Disable caching of loaded documents
    pub fn without_cache(mut self) -> Self {
        self.cache_documents = false;
        self
    }

    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    /// Number of cached external documents
    pub fn cached_documents(&self) -> usize {
        self.cache.read().len()
    }

    /// Resolve `reference` against the base URI.
    ///
    /// With `document`, only the fragment of the reference is looked up in it.
    /// Returns the final URI after following any chain of references, and the
    /// node it points at.
    pub fn resolve(&self, reference: &str, document: Option<&Value>) -> Result<(Url, Value)> {
        let mut scope = ResolutionScope::new(self.base_uri.clone());
        self.resolve_in_scope(reference, document, &mut scope)
    }

    /// Resolve `reference` within an existing scope
    pub fn resolve_in_scope(
        &self,
        reference: &str,
        document: Option<&Value>,
        scope: &mut ResolutionScope,
    ) -> Result<(Url, Value)> {
        let url = scope.current().join(reference).map_err(|e| {
            Error::Schema(format!(
                "Invalid reference '{reference}': {e} (from {})",
                scope.format(None)
            ))
        })?;
        let fragment = url.fragment().unwrap_or_default();

        let found = match document {
            Some(document) => resolve_fragment(document, fragment).cloned(),
            None => self
                .document_for(&url)
                .and_then(|doc| resolve_fragment(&doc, fragment).cloned()),
        };
        let resolved = found.map_err(|e| match e {
            Error::Schema(message) => {
                Error::Schema(format!("{message} (from {})", scope.format(None)))
            }
            other => other,
        })?;

        let next = match next_reference(&resolved) {
            Next::Reference(next) => next,
            Next::Node(node) => return Ok((url, node)),
        };

        if scope.contains(&url) {
            return Err(Error::Schema(format!(
                "Circular reference in schema: {}",
                scope.format(Some(&url))
            )));
        }
        scope.push(url);
        let result = self.resolve_in_scope(&next, None, scope);
        scope.pop();
        result
    }

    /// Whole document for `url`, ignoring its fragment
    fn document_for(&self, url: &Url) -> Result<Arc<Value>> {
        let mut resource = url.clone();
        resource.set_fragment(None);
        if resource == self.base_uri {
            return Ok(Arc::clone(&self.document));
        }

        let key = resource.to_string();
        if let Some(cached) = self.cache.read().get(&key) {
            return Ok(Arc::clone(cached));
        }

        tracing::debug!(uri = %key, "loading schema document");
        let document = Arc::new(self.load(&resource)?);
        if self.cache_documents {
            self.cache.write().insert(key, Arc::clone(&document));
        }
        Ok(document)
    }

    fn load(&self, resource: &Url) -> Result<Value> {
        if resource.scheme() != "file" {
            return Err(Error::Schema(format!(
                "Unresolvable reference '{resource}': only file:// documents can be loaded"
            )));
        }
        let path = resource
            .to_file_path()
            .map_err(|()| Error::Schema(format!("Invalid file URI '{resource}'")))?;
        let text = fs::read_to_string(&path).map_err(|e| {
            Error::Schema(format!("Unresolvable reference '{resource}': {e}"))
        })?;
        serde_yaml::from_str(&text).map_err(|e| {
            tracing::debug!(uri = %resource, error = %e, "error parsing schema document as YAML");
            Error::Schema(format!("Unresolvable reference '{resource}': {e}"))
        })
    }

    /// Map a URI given by the `jsonschema` crate onto the base URI
    fn to_document_uri(&self, url: &Url) -> Result<Url> {
        if url.scheme() != JSON_SCHEMA_SCHEME {
            return Ok(url.clone());
        }
        self.base_uri
            .join(url.path().trim_start_matches('/'))
            .map_err(|e| Error::Schema(format!("Invalid reference '{url}': {e}")))
    }
}

enum Next {
    Reference(String),
    Node(Value),
}

/// A node that is itself a `$ref`, or a `oneOf`/`anyOf` whose first
/// alternative is one, continues the chain. Only the first alternative of a
/// composition is ever considered.
fn next_reference(node: &Value) -> Next {
    if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
        return Next::Reference(reference.to_string());
    }
    let first = ["oneOf", "anyOf"]
        .iter()
        .find_map(|keyword| node.get(*keyword).and_then(Value::as_array))
        .and_then(|alternatives| alternatives.first());
    match first {
        Some(alternative) => match alternative.get("$ref").and_then(Value::as_str) {
            Some(reference) => Next::Reference(reference.to_string()),
            None => Next::Node(alternative.clone()),
        },
        None => Next::Node(node.clone()),
    }
}

impl jsonschema::SchemaResolver for RefResolver {
    fn resolve(
        &self,
        _root_schema: &Value,
        url: &Url,
        _original_reference: &str,
    ) -> std::result::Result<Arc<Value>, jsonschema::SchemaResolverError> {
        let url = self.to_document_uri(url)?;
        Ok(self.document_for(&url)?)
    }
}
