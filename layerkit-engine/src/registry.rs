//! Binding registry, dissector, and stack builder
//!
//! Protocols register their header types and binding rules during an
//! explicit startup phase; afterwards the registry is queried read-only, so
//! concurrent dissection and construction calls can share one `&Registry`
//! freely. Rules are evaluated in registration order and the first match
//! wins — overlapping predicates are expected (content sniffing), and the
//! ordered tie-break is the documented contract, not an error.

use crate::header::{Body, Header, HeaderType};
use crate::packet::Packet;
use crate::value::Options;
use layerkit_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Hard cap on dissection depth; a binding cycle over a cheap header type
/// must not turn a long buffer into unbounded recursion
const MAX_DISSECT_DEPTH: usize = 32;

/// What selects the inner layer under a given outer layer
#[derive(Clone)]
pub enum Discriminator {
    /// A named field on the outer instance carries this exact value
    FieldValue { field: &'static str, value: u64 },
    /// A predicate over the outer body's leading raw bytes
    Content(fn(&[u8]) -> bool),
}

impl std::fmt::Debug for Discriminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Discriminator::FieldValue { field, value } => {
                write!(f, "FieldValue({field} == {value:#x})")
            }
            Discriminator::Content(_) => write!(f, "Content"),
        }
    }
}

/// One (outer type, discriminator) -> inner type association
#[derive(Debug, Clone)]
pub struct BindingRule {
    outer: &'static str,
    discriminator: Discriminator,
    inner: &'static str,
}

impl BindingRule {
    fn matches(&self, outer: &Header, body: &[u8]) -> bool {
        if self.outer != outer.type_name() {
            return false;
        }
        match &self.discriminator {
            Discriminator::FieldValue { field, value } => outer.uint(field) == Some(*value),
            Discriminator::Content(predicate) => predicate(body),
        }
    }
}

/// The set of registered header types and binding rules
///
/// Populated once at process start, then shared immutably by every parse and
/// build call.
#[derive(Debug, Default)]
pub struct Registry {
    types: HashMap<&'static str, Arc<HeaderType>>,
    rules: Vec<BindingRule>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a header type, returning the shared handle
    pub fn register(&mut self, ty: HeaderType) -> Arc<HeaderType> {
        let ty = Arc::new(ty);
        debug!(name = ty.name(), "registered header type");
        self.types.insert(ty.name(), Arc::clone(&ty));
        ty
    }

    /// Register an already-shared header type (container element types are
    /// built early and embedded in their array codecs)
    pub fn register_shared(&mut self, ty: &Arc<HeaderType>) {
        debug!(name = ty.name(), "registered header type");
        self.types.insert(ty.name(), Arc::clone(ty));
    }

    /// Bind `inner` under `outer` keyed on a discriminator field value
    pub fn bind_value(
        &mut self,
        outer: &'static str,
        field: &'static str,
        value: u64,
        inner: &'static str,
    ) {
        debug!(outer, field, value, inner, "registered binding");
        self.rules.push(BindingRule {
            outer,
            discriminator: Discriminator::FieldValue { field, value },
            inner,
        });
    }

    /// Bind `inner` under `outer` keyed on a content predicate over the
    /// outer body's leading bytes
    pub fn bind_content(
        &mut self,
        outer: &'static str,
        predicate: fn(&[u8]) -> bool,
        inner: &'static str,
    ) {
        debug!(outer, inner, "registered content binding");
        self.rules.push(BindingRule {
            outer,
            discriminator: Discriminator::Content(predicate),
            inner,
        });
    }

    /// Look up a registered header type
    pub fn get(&self, name: &str) -> Option<&Arc<HeaderType>> {
        self.types.get(name)
    }

    /// Registered binding rules, in registration order
    pub fn rules(&self) -> &[BindingRule] {
        &self.rules
    }

    /// First rule matching this outer layer and its raw body, in
    /// registration order
    fn resolve_inner(&self, outer: &Header, body: &[u8]) -> Option<&Arc<HeaderType>> {
        self.rules
            .iter()
            .find(|rule| rule.matches(outer, body))
            .and_then(|rule| self.types.get(rule.inner))
    }

    /// The field-valued discriminator registered for an (outer, inner)
    /// adjacency, used by the build reconciliation pass
    fn adjacency_value(&self, outer: &str, inner: &str) -> Option<(&'static str, u64)> {
        self.rules.iter().find_map(|rule| {
            if rule.outer != outer || rule.inner != inner {
                return None;
            }
            match rule.discriminator {
                Discriminator::FieldValue { field, value } => Some((field, value)),
                Discriminator::Content(_) => None,
            }
        })
    }

    /// Dissect raw bytes into an ordered layer stack, starting from the
    /// given first-layer type
    ///
    /// The first layer must parse; inner layers are descended into as long
    /// as a binding rule matches and the inner type accepts its bytes. A
    /// non-matching or rejecting inner layer is not an error: descent stops
    /// and the current body stays raw.
    pub fn dissect(&self, data: &[u8], first: &str) -> Result<Packet> {
        let ty = self
            .get(first)
            .ok_or_else(|| Error::UnknownHeaderType(first.to_string()))?;
        let mut root = Header::parse(ty, data)?;
        self.descend(&mut root, 1);
        Ok(Packet::new(root))
    }

    fn descend(&self, outer: &mut Header, depth: usize) {
        if depth >= MAX_DISSECT_DEPTH {
            trace!(layer = outer.type_name(), "descent depth cap reached");
            return;
        }
        let body = match outer.body().raw() {
            Some(raw) if !raw.is_empty() => raw,
            _ => return,
        };
        let Some(inner_ty) = self.resolve_inner(outer, body) else {
            trace!(layer = outer.type_name(), "no binding matched, stopping");
            return;
        };
        match Header::parse(inner_ty, body) {
            Ok(mut inner) => {
                trace!(
                    outer = outer.type_name(),
                    inner = inner.type_name(),
                    "descended one layer"
                );
                self.descend(&mut inner, depth + 1);
                outer.set_body(Body::Nested(Box::new(inner)));
            }
            Err(err) => {
                // Keep the body raw; partial progress is never discarded
                trace!(
                    outer = outer.type_name(),
                    inner = inner_ty.name(),
                    %err,
                    "inner layer rejected, keeping raw body"
                );
            }
        }
    }

    /// Build a layer stack from `(type name, options)` pairs, outermost
    /// first
    ///
    /// After instantiation, a reconciliation pass walks each adjacency and
    /// fills in the outer layer's field-valued discriminator when the caller
    /// did not set it explicitly; adjacencies without a registered rule are
    /// left at their defaults rather than failing the build.
    pub fn build(&self, layers: &[(&str, Options)]) -> Result<Packet> {
        if layers.is_empty() {
            return Err(Error::codec("cannot build an empty layer stack"));
        }

        let mut headers = Vec::with_capacity(layers.len());
        for (name, opts) in layers {
            let ty = self
                .get(name)
                .ok_or_else(|| Error::UnknownHeaderType(name.to_string()))?;
            headers.push(Header::from_type(ty, opts));
        }

        for i in 0..headers.len() - 1 {
            let outer_name = headers[i].type_name();
            let inner_name = headers[i + 1].type_name();
            match self.adjacency_value(outer_name, inner_name) {
                Some((field, value)) if !layers[i].1.contains(field) => {
                    trace!(
                        outer = outer_name,
                        inner = inner_name,
                        field,
                        value,
                        "reconciled discriminator"
                    );
                    headers[i].set(field, value)?;
                }
                _ => {}
            }
        }

        let root = headers
            .into_iter()
            .rev()
            .reduce(|current, mut outer| {
                outer.set_body(Body::Nested(Box::new(current)));
                outer
            })
            .ok_or_else(|| Error::codec("cannot build an empty layer stack"))?;
        Ok(Packet::new(root))
    }
}
