//! Identity extraction from distinguished names.
//!
//! Controller objects carry their ancestry in a path-like `dn` such as
//! `topology/pod-1/node-101/sys/phys-[eth1/1]` or
//! `uni/tn-acme/ap-web/epg-frontend/cep-00:50:56:AA:BB:CC/ip-[10.0.0.1]`.
//! Every helper here treats a missing segment as the normal case and returns
//! `None` rather than an error.

use std::sync::LazyLock;

use regex::Regex;

/// Segment kinds that can be read out of a distinguished name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityKind {
    Pod,
    Node,
    App,
    EndpointGroup,
    BridgeDomain,
    ClientEndpoint,
    Ip,
}

static POD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"pod-([0-9]+)").unwrap());
static NODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"node-([0-9]+)").unwrap());
static APP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/ap-([^/]+)/").unwrap());
static EPG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/epg-([^/]+)/").unwrap());
static BD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/BD-([^/]+)/").unwrap());
static CEP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/cep-([^/]+)/").unwrap());
static IP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/ip-([^/]+)/").unwrap());

impl IdentityKind {
    fn pattern(self) -> &'static Regex {
        match self {
            IdentityKind::Pod => &POD,
            IdentityKind::Node => &NODE,
            IdentityKind::App => &APP,
            IdentityKind::EndpointGroup => &EPG,
            IdentityKind::BridgeDomain => &BD,
            IdentityKind::ClientEndpoint => &CEP,
            IdentityKind::Ip => &IP,
        }
    }

    /// Tag key used when this identity is reported on an event
    pub fn tag_key(self) -> &'static str {
        match self {
            IdentityKind::Pod => "pod",
            IdentityKind::Node => "node",
            IdentityKind::App => "app",
            IdentityKind::EndpointGroup => "epg",
            IdentityKind::BridgeDomain => "bd",
            IdentityKind::ClientEndpoint => "mac",
            IdentityKind::Ip => "ip",
        }
    }
}

/// Leftmost identifier of the given kind, if the path has one
pub fn extract(kind: IdentityKind, dn: &str) -> Option<&str> {
    kind.pattern()
        .captures(dn)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

const EVENT_TAG_ORDER: [IdentityKind; 6] = [
    IdentityKind::Node,
    IdentityKind::App,
    IdentityKind::BridgeDomain,
    IdentityKind::ClientEndpoint,
    IdentityKind::Ip,
    IdentityKind::EndpointGroup,
];

/// All identities found in `dn` as `kind:value` tags, in a fixed kind order
pub fn event_tags(dn: &str) -> Vec<String> {
    EVENT_TAG_ORDER
        .iter()
        .filter_map(|kind| extract(*kind, dn).map(|v| format!("{}:{}", kind.tag_key(), v)))
        .collect()
}

/// Pod and node tags used for capacity objects
pub fn capacity_tags(dn: &str) -> Vec<String> {
    let mut tags = Vec::with_capacity(2);
    if let Some(pod) = extract(IdentityKind::Pod, dn) {
        tags.push(format!("fabric_pod_id:{}", pod));
    }
    if let Some(node) = extract(IdentityKind::Node, dn) {
        tags.push(format!("node_id:{}", node));
    }
    tags
}

/// Synthesized `pod-<P>-node-<N>` hostname; both parts are required
pub fn hostname(pod: Option<&str>, node: Option<&str>) -> Option<String> {
    match (pod, node) {
        (Some(pod), Some(node)) => Some(format!("pod-{}-node-{}", pod, node)),
        _ => None,
    }
}

pub fn hostname_from_dn(dn: &str) -> Option<String> {
    hostname(
        extract(IdentityKind::Pod, dn),
        extract(IdentityKind::Node, dn),
    )
}

/// Hostname for a raw controller object, read from its `dn` attribute
pub fn fabric_hostname(obj: &serde_json::Value) -> Option<String> {
    let attrs = crate::attributes::extract_attributes(obj);
    attrs.get("dn")?.as_str().and_then(hostname_from_dn)
}
