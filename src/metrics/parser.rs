use thiserror::Error;

use super::tree::MetricTree;
use super::METRIC_PREFIX;
use crate::types::Method;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("unknown metric `{0}`")]
    UnknownMetric(String),
    #[error("unexpected or missing tags in metric `{0}`")]
    UnknownTags(String),
}

/// Normalized form of a raw dotted stat name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMetric {
    pub name: String,
    pub tags: Vec<String>,
    pub method: Method,
}

/// Classify `metric` against the built-in catalog.
pub fn parse_metric(metric: &str) -> Result<ParsedMetric, ClassifyError> {
    parse_metric_with(super::metric_tree(), metric)
}

/// Walk `tree` one dotted segment at a time.
///
/// Literal children take precedence. Any other segment is bound to the next
/// free tag slot of the current node, so `http.ingress.rq_total` yields
/// `http.rq_total` with `stat_prefix:ingress`.
pub fn parse_metric_with(tree: &MetricTree, metric: &str) -> Result<ParsedMetric, ClassifyError> {
    let unknown_metric = || ClassifyError::UnknownMetric(metric.to_string());
    let unknown_tags = || ClassifyError::UnknownTags(metric.to_string());

    let segments: Vec<&str> = metric.split('.').collect();
    let mut node = tree.root();
    let mut path: Vec<&str> = Vec::with_capacity(segments.len());
    let mut tags = Vec::new();
    let mut bound = 0usize;

    for (i, segment) in segments.iter().copied().enumerate() {
        if segment.is_empty() {
            return Err(unknown_metric());
        }

        if let Some(child) = node.child(segment) {
            if bound != node.tag_names().len() {
                return Err(unknown_tags());
            }
            node = child;
            path.push(segment);
            bound = 0;
            continue;
        }

        if path.is_empty() {
            return Err(unknown_metric());
        }

        let names = node.tag_names();
        if let Some(tag_name) = names.get(bound) {
            tags.push(format!("{}:{}", tag_name, segment));
            bound += 1;
            continue;
        }

        // No free slot: a stray qualifier on a known metric, or no such metric
        let known_later = segments[i + 1..].iter().any(|s| node.child(s).is_some());
        return Err(if node.is_leaf() || known_later {
            unknown_tags()
        } else {
            unknown_metric()
        });
    }

    let method = node.method().ok_or_else(unknown_metric)?;
    if bound != node.tag_names().len() {
        return Err(unknown_tags());
    }

    Ok(ParsedMetric {
        name: format!("{}{}", METRIC_PREFIX, path.join(".")),
        tags,
        method,
    })
}
