use tracing::debug;

use super::metrics::{APIC_CAPACITY_CLASSES, LEAF_CAPACITY_STATS};
use super::Collection;
use crate::api::ApiError;
use crate::attributes::{attr_str, extract_attributes};
use crate::dn;

/// Hardware table usage on the leaves and object counts on the controller
pub async fn collect(ctx: &mut Collection<'_>) -> Result<(), ApiError> {
    collect_leaf_capacity(ctx).await?;
    collect_contexts(ctx).await?;
    collect_apic_limits(ctx).await?;
    collect_apic_usage(ctx).await
}

async fn collect_leaf_capacity(ctx: &mut Collection<'_>) -> Result<(), ApiError> {
    for class in LEAF_CAPACITY_STATS {
        for entity in ctx.api.get_eqpt_capacity(class.class).await? {
            let Some(dn) = attr_str(&extract_attributes(&entity), "dn") else {
                continue;
            };
            let tags = dn::capacity_tags(&dn);
            let hostname = dn::hostname_from_dn(&dn);
            ctx.submit_stats(
                std::slice::from_ref(&entity),
                LEAF_CAPACITY_STATS,
                "capacity.leaf",
                &tags,
                hostname.as_deref(),
            );
        }
    }
    Ok(())
}

async fn collect_contexts(ctx: &mut Collection<'_>) -> Result<(), ApiError> {
    for counter in ctx.api.get_capacity_contexts("l3Dom").await? {
        let attrs = extract_attributes(&counter);
        let Some(dn) = attr_str(&attrs, "dn") else {
            continue;
        };
        let Some(count) = attr_str(&attrs, "count").and_then(|c| c.parse::<f64>().ok()) else {
            continue;
        };
        let tags = dn::capacity_tags(&dn);
        let hostname = dn::hostname_from_dn(&dn);
        ctx.gauge("capacity.leaf.vrf.utilized", count, &tags, hostname.as_deref());
    }
    Ok(())
}

async fn collect_apic_limits(ctx: &mut Collection<'_>) -> Result<(), ApiError> {
    for rule in ctx.api.get_apic_capacity_limits().await? {
        let attrs = extract_attributes(&rule);
        let Some(subject) = attr_str(&attrs, "subj") else {
            continue;
        };
        let known = APIC_CAPACITY_CLASSES.iter().find(|(class, _)| *class == subject);
        let Some((_, name)) = known else {
            debug!(subject = %subject, "Ignoring capacity rule");
            continue;
        };
        let Some(limit) = attr_str(&attrs, "constraint").and_then(|c| c.parse::<f64>().ok()) else {
            continue;
        };
        ctx.gauge(&format!("capacity.apic.{}.limit", name), limit, &[], None);
    }
    Ok(())
}

async fn collect_apic_usage(ctx: &mut Collection<'_>) -> Result<(), ApiError> {
    for (class, name) in APIC_CAPACITY_CLASSES {
        let counts = ctx.api.get_apic_capacity_metrics(class, None).await?;
        // The count query answers with a single moCount object
        let Some(count) = counts
            .first()
            .map(extract_attributes)
            .and_then(|attrs| attr_str(&attrs, "count"))
            .and_then(|c| c.parse::<f64>().ok())
        else {
            continue;
        };
        ctx.gauge(&format!("capacity.apic.{}.utilized", name), count, &[], None);
    }
    Ok(())
}
