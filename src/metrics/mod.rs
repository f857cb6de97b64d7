//! Metric catalog for the secrets-server stats endpoint.
//!
//! Stat names arrive as dotted paths with instance values spliced in, e.g.
//! `http.ingress_http.downstream_rq_total`. The catalog below lists every
//! supported metric in its untagged form together with the tag names that
//! may follow each segment; [`parse_metric`] maps a raw name back to it.

pub mod parser;
pub mod tree;

use std::sync::LazyLock;

use crate::types::Method;

pub use parser::{parse_metric, parse_metric_with, ClassifyError, ParsedMetric};
pub use tree::{CatalogError, MetricDef, MetricTree};

pub const METRIC_PREFIX: &str = "vault.";

const NONE: &[&str] = &[];
const STAT_PREFIX: &[&str] = &["stat_prefix"];
const CLUSTER: &[&str] = &["cluster_name"];
const LISTENER: &[&str] = &["address"];
const VHOST: &[&str] = &["virtual_host_name"];
const VCLUSTER: &[&str] = &["virtual_cluster_name"];

const fn plain(name: &'static str, method: Method) -> MetricDef {
    MetricDef { name, tags: &[NONE, NONE], method }
}

const fn http(name: &'static str, method: Method) -> MetricDef {
    MetricDef { name, tags: &[STAT_PREFIX, NONE], method }
}

const fn cluster(name: &'static str, method: Method) -> MetricDef {
    MetricDef { name, tags: &[CLUSTER, NONE], method }
}

pub static METRICS: &[MetricDef] = &[
    plain("runtime.load_error", Method::Rate),
    plain("runtime.load_success", Method::Rate),
    plain("runtime.num_keys", Method::Gauge),
    plain("runtime.override_dir_exists", Method::Rate),
    plain("runtime.override_dir_not_exists", Method::Rate),
    plain("stats.overflow", Method::Rate),
    plain("server.live", Method::Gauge),
    plain("server.uptime", Method::Gauge),
    plain("server.memory_allocated", Method::Gauge),
    plain("server.memory_heap_size", Method::Gauge),
    plain("server.parent_connections", Method::Gauge),
    plain("server.total_connections", Method::Gauge),
    plain("server.days_until_first_cert_expiring", Method::Gauge),
    plain("server.watchdog_miss", Method::Rate),
    plain("server.watchdog_mega_miss", Method::Rate),
    plain("filesystem.write_buffered", Method::Rate),
    plain("filesystem.write_completed", Method::Rate),
    plain("filesystem.flushed_by_timer", Method::Rate),
    plain("filesystem.reopen_failed", Method::Rate),
    plain("cluster_manager.cluster_added", Method::Rate),
    plain("cluster_manager.cluster_modified", Method::Rate),
    plain("cluster_manager.cluster_removed", Method::Rate),
    plain("cluster_manager.active_clusters", Method::Gauge),
    plain("cluster_manager.warming_clusters", Method::Gauge),
    plain("listener_manager.listener_added", Method::Rate),
    plain("listener_manager.listener_removed", Method::Rate),
    plain("listener_manager.total_listeners_active", Method::Gauge),
    plain("listener_manager.total_listeners_warming", Method::Gauge),
    http("http.downstream_cx_total", Method::Rate),
    http("http.downstream_cx_active", Method::Gauge),
    http("http.downstream_cx_destroy", Method::Rate),
    http("http.downstream_cx_protocol_error", Method::Rate),
    http("http.downstream_rq_total", Method::Rate),
    http("http.downstream_rq_active", Method::Gauge),
    http("http.downstream_rq_2xx", Method::Rate),
    http("http.downstream_rq_3xx", Method::Rate),
    http("http.downstream_rq_4xx", Method::Rate),
    http("http.downstream_rq_5xx", Method::Rate),
    http("http.downstream_rq_time", Method::Gauge),
    http("http.rq_total", Method::Rate),
    http("http.rq_redirect", Method::Rate),
    http("http.rq_direct_response", Method::Rate),
    http("http.no_route", Method::Rate),
    http("http.no_cluster", Method::Rate),
    cluster("cluster.upstream_cx_total", Method::Rate),
    cluster("cluster.upstream_cx_active", Method::Gauge),
    cluster("cluster.upstream_cx_connect_fail", Method::Rate),
    cluster("cluster.upstream_cx_connect_timeout", Method::Rate),
    cluster("cluster.upstream_rq_total", Method::Rate),
    cluster("cluster.upstream_rq_active", Method::Gauge),
    cluster("cluster.upstream_rq_pending_active", Method::Gauge),
    cluster("cluster.upstream_rq_timeout", Method::Rate),
    cluster("cluster.upstream_rq_retry", Method::Rate),
    cluster("cluster.membership_healthy", Method::Gauge),
    cluster("cluster.membership_total", Method::Gauge),
    MetricDef {
        name: "listener.downstream_cx_total",
        tags: &[LISTENER, NONE],
        method: Method::Rate,
    },
    MetricDef {
        name: "listener.downstream_cx_active",
        tags: &[LISTENER, NONE],
        method: Method::Gauge,
    },
    MetricDef {
        name: "listener.downstream_cx_destroy",
        tags: &[LISTENER, NONE],
        method: Method::Rate,
    },
    MetricDef {
        name: "vhost.vcluster.upstream_rq_time",
        tags: &[VHOST, VCLUSTER, NONE],
        method: Method::Gauge,
    },
    MetricDef {
        name: "vhost.vcluster.upstream_rq_retry",
        tags: &[VHOST, VCLUSTER, NONE],
        method: Method::Rate,
    },
    MetricDef {
        name: "vhost.vcluster.upstream_rq_timeout",
        tags: &[VHOST, VCLUSTER, NONE],
        method: Method::Rate,
    },
];

static METRIC_TREE: LazyLock<MetricTree> = LazyLock::new(|| {
    MetricTree::from_catalog(METRICS).expect("built-in metric catalog is well-formed")
});

/// The tree built from [`METRICS`], shared by every check
pub fn metric_tree() -> &'static MetricTree {
    &METRIC_TREE
}
