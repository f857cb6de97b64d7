use std::collections::BTreeMap;

use thiserror::Error;

use crate::types::Method;

/// One catalog entry: a dotted metric name, one tag tuple per segment and
/// the aggregation method.
#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub tags: &'static [&'static [&'static str]],
    pub method: Method,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("metric `{name}` has {segments} segments but {tuples} tag tuples")]
    TagArity {
        name: &'static str,
        segments: usize,
        tuples: usize,
    },
    #[error("metric `{name}` declares tags for `{segment}` that conflict with an earlier one")]
    ConflictingTags {
        name: &'static str,
        segment: &'static str,
    },
    #[error("metric `{0}` is defined twice")]
    Duplicate(&'static str),
}

/// A level of the definition tree.
///
/// `tags` names the instance values that may follow this segment before the
/// next literal one; `method` is set on nodes that end a metric definition.
#[derive(Debug, Default, PartialEq)]
pub struct Node {
    pub(crate) children: BTreeMap<&'static str, Node>,
    pub(crate) tags: Option<&'static [&'static str]>,
    pub(crate) method: Option<Method>,
}

impl Node {
    pub fn child(&self, segment: &str) -> Option<&Node> {
        self.children.get(segment)
    }

    pub fn tag_names(&self) -> &'static [&'static str] {
        self.tags.unwrap_or(&[])
    }

    pub fn method(&self) -> Option<Method> {
        self.method
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Read-only tree of metric definitions
#[derive(Debug, Default, PartialEq)]
pub struct MetricTree {
    root: Node,
}

impl MetricTree {
    pub fn from_catalog(catalog: &[MetricDef]) -> Result<Self, CatalogError> {
        let mut root = Node::default();

        for def in catalog {
            let segments: Vec<&'static str> = def.name.split('.').collect();
            if segments.len() != def.tags.len() {
                return Err(CatalogError::TagArity {
                    name: def.name,
                    segments: segments.len(),
                    tuples: def.tags.len(),
                });
            }

            let mut node = &mut root;
            for (segment, tags) in segments.into_iter().zip(def.tags.iter().copied()) {
                node = node.children.entry(segment).or_default();
                match node.tags {
                    None => node.tags = Some(tags),
                    Some(existing) if existing == tags => {}
                    Some(_) => {
                        return Err(CatalogError::ConflictingTags { name: def.name, segment });
                    }
                }
            }

            if node.method.replace(def.method).is_some() {
                return Err(CatalogError::Duplicate(def.name));
            }
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTTP: &[&str] = &["stat_prefix"];

    #[test]
    fn builds_shared_prefixes() {
        let tree = MetricTree::from_catalog(&[
            MetricDef { name: "http.rq_total", tags: &[HTTP, &[]], method: Method::Rate },
            MetricDef {
                name: "http.downstream_cx_active",
                tags: &[HTTP, &[]],
                method: Method::Gauge,
            },
        ])
        .unwrap();

        let http = tree.root().child("http").unwrap();
        assert_eq!(http.tag_names(), HTTP);
        assert_eq!(http.method(), None);
        assert_eq!(http.child("rq_total").unwrap().method(), Some(Method::Rate));
        assert!(http.child("downstream_cx_active").unwrap().is_leaf());
    }

    #[test]
    fn rejects_arity_mismatch() {
        let err = MetricTree::from_catalog(&[MetricDef {
            name: "runtime.num_keys",
            tags: &[&[]],
            method: Method::Gauge,
        }])
        .unwrap_err();
        assert_eq!(
            err,
            CatalogError::TagArity { name: "runtime.num_keys", segments: 2, tuples: 1 }
        );
    }

    #[test]
    fn rejects_conflicting_prefix_tags() {
        let err = MetricTree::from_catalog(&[
            MetricDef { name: "http.rq_total", tags: &[HTTP, &[]], method: Method::Rate },
            MetricDef { name: "http.rq_redirect", tags: &[&[], &[]], method: Method::Rate },
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::ConflictingTags { segment: "http", .. }));
    }

    #[test]
    fn rejects_duplicates() {
        let def = MetricDef { name: "server.live", tags: &[&[], &[]], method: Method::Gauge };
        assert_eq!(
            MetricTree::from_catalog(&[def, def]).unwrap_err(),
            CatalogError::Duplicate("server.live")
        );
    }
}
