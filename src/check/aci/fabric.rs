use tracing::debug;

use super::metrics::{FABRIC_NODE_STATS, FABRIC_POD_STATS, FABRIC_PORT_STATS, FABRIC_PROC_STATS};
use super::Collection;
use crate::api::ApiError;
use crate::attributes::{attr_str, extract_attributes};
use crate::dn::{self, IdentityKind};

/// Pod health, node health and per-port traffic for the whole fabric
pub async fn collect(ctx: &mut Collection<'_>) -> Result<(), ApiError> {
    let pods = ctx.api.get_fabric_pods().await?;
    for pod in &pods {
        let attrs = extract_attributes(pod);
        let Some(pod_id) = attr_str(&attrs, "id") else {
            continue;
        };
        let tags = vec![format!("fabric_pod_id:{}", pod_id)];
        let stats = ctx.api.get_pod_stats(&pod_id).await?;
        ctx.submit_stats(&stats, FABRIC_POD_STATS, "fabric.pod", &tags, None);
    }

    let nodes = ctx.api.get_fabric_nodes().await?;
    for node in &nodes {
        let attrs = extract_attributes(node);
        let Some(dn) = attr_str(&attrs, "dn") else {
            continue;
        };
        let node_from_dn = || dn::extract(IdentityKind::Node, &dn).map(str::to_string);
        let (Some(pod_id), Some(node_id)) = (
            dn::extract(IdentityKind::Pod, &dn).map(str::to_string),
            attr_str(&attrs, "id").or_else(node_from_dn),
        ) else {
            debug!(dn = %dn, "Skipping node without pod or node id");
            continue;
        };
        let role = attr_str(&attrs, "role").unwrap_or_default();
        let hostname = dn::fabric_hostname(node);
        let tags = vec![
            format!("fabric_pod_id:{}", pod_id),
            format!("node_id:{}", node_id),
            format!("node_role:{}", role),
        ];

        let stats = ctx.api.get_node_stats(&pod_id, &node_id).await?;
        ctx.submit_stats(&stats, FABRIC_NODE_STATS, "fabric.node", &tags, hostname.as_deref());

        let host = hostname.as_deref();
        match role.as_str() {
            "controller" => {
                let procs = ctx.api.get_controller_proc_metrics(&pod_id, &node_id).await?;
                ctx.submit_stats(&procs, FABRIC_PROC_STATS, "fabric.node", &tags, host);
            }
            "leaf" | "spine" => {
                let procs = ctx.api.get_spine_proc_metrics(&pod_id, &node_id).await?;
                ctx.submit_stats(&procs, FABRIC_PROC_STATS, "fabric.node", &tags, host);
                collect_ports(ctx, &pod_id, &node_id, &tags, host).await?;
            }
            other => debug!(role = other, node = %node_id, "No process stats for role"),
        }
    }

    debug!(pods = pods.len(), nodes = nodes.len(), "Collected fabric");
    Ok(())
}

async fn collect_ports(
    ctx: &mut Collection<'_>,
    pod_id: &str,
    node_id: &str,
    node_tags: &[String],
    hostname: Option<&str>,
) -> Result<(), ApiError> {
    for eth in ctx.api.get_eth_list(pod_id, node_id).await? {
        let Some(port) = attr_str(&extract_attributes(&eth), "id") else {
            continue;
        };
        let mut tags = node_tags.to_vec();
        tags.push(format!("port:{}", port));

        let stats = ctx.api.get_eth_stats(pod_id, node_id, &port).await?;
        ctx.submit_stats(&stats, FABRIC_PORT_STATS, "fabric.port", &tags, hostname);
    }
    Ok(())
}
