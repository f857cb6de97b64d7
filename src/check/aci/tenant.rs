use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use super::metrics::TENANT_STATS;
use super::Collection;
use crate::api::ApiError;
use crate::attributes::{attr_str, children, extract_attributes, object_class};
use crate::dn;
use crate::types::{AlertType, Event};

const EVENT_PAGE_SIZE: u32 = 15;

/// Newest event already forwarded for each tenant.
///
/// A tenant seen for the first time only gets events created after `start`,
/// so history is not replayed when the agent starts.
#[derive(Debug)]
pub struct EventCursor {
    start: DateTime<Utc>,
    seen: HashMap<String, DateTime<Utc>>,
}

impl EventCursor {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            seen: HashMap::new(),
        }
    }

    pub fn since(&self, tenant: &str) -> DateTime<Utc> {
        self.seen.get(tenant).copied().unwrap_or(self.start)
    }

    fn advance(&mut self, tenant: &str, newest: DateTime<Utc>) {
        self.seen.insert(tenant.to_string(), newest);
    }
}

/// Tenant, application and endpoint-group stats for every configured tenant
pub async fn collect(
    ctx: &mut Collection<'_>,
    tenants: &[String],
    events: &mut EventCursor,
) -> Result<(), ApiError> {
    if tenants.is_empty() {
        warn!("No tenants were listed in the config, skipping tenant collection");
        return Ok(());
    }

    for tenant in tenants {
        let tenant_tags = vec![format!("tenant:{}", tenant)];
        let stats = ctx.api.get_tenant_stats(tenant).await?;
        ctx.submit_stats(&stats, TENANT_STATS, "tenant", &tenant_tags, None);

        for app in ctx.api.get_apps(tenant).await? {
            let Some(app_name) = attr_str(&extract_attributes(&app), "name") else {
                continue;
            };
            let mut app_tags = tenant_tags.clone();
            app_tags.push(format!("application:{}", app_name));

            let stats = ctx.api.get_app_stats(tenant, &app_name).await?;
            ctx.submit_stats(&stats, TENANT_STATS, "tenant.application", &app_tags, None);

            for epg in ctx.api.get_epgs(tenant, &app_name).await? {
                let Some(epg_name) = attr_str(&extract_attributes(&epg), "name") else {
                    continue;
                };
                let mut epg_tags = app_tags.clone();
                epg_tags.push(format!("endpoint_group:{}", epg_name));

                let stats = ctx.api.get_epg_stats(tenant, &app_name, &epg_name).await?;
                let scope = "tenant.application.endpoint_group";
                ctx.submit_stats(&stats, TENANT_STATS, scope, &epg_tags, None);

                let endpoints = ctx.api.get_epg_meta(tenant, &app_name, &epg_name).await?;
                ctx.gauge(&format!("{}.endpoints", scope), endpoints.len() as f64, &epg_tags, None);
                let paths = ctx.api.get_eth_list_for_epg(tenant, &app_name, &epg_name).await?;
                ctx.gauge(&format!("{}.paths", scope), paths.len() as f64, &epg_tags, None);
            }
        }

        collect_events(ctx, tenant, &tenant_tags, events).await?;
        debug!(tenant = %tenant, "Collected tenant");
    }

    Ok(())
}

/// Forward event records newer than the cursor, tagged with the identities
/// found in each record's dn
async fn collect_events(
    ctx: &mut Collection<'_>,
    tenant: &str,
    tenant_tags: &[String],
    cursor: &mut EventCursor,
) -> Result<(), ApiError> {
    let since = cursor.since(tenant);
    let mut newest = since;

    let page = ctx.api.get_tenant_events(tenant, 0, EVENT_PAGE_SIZE).await?;
    let mut records = Vec::new();
    find_records(&page, &mut records);

    for record in records {
        let attrs = extract_attributes(record);
        let Some(created) = attr_str(&attrs, "created")
            .and_then(|c| DateTime::parse_from_rfc3339(&c).ok())
            .map(|c| c.with_timezone(&Utc))
        else {
            continue;
        };
        if created <= since {
            continue;
        }
        newest = newest.max(created);

        let dn = attr_str(&attrs, "dn").unwrap_or_default();
        let mut tags = tenant_tags.to_vec();
        tags.extend(dn::event_tags(&dn));

        let code = attr_str(&attrs, "code").unwrap_or_default();
        let cause = attr_str(&attrs, "cause").unwrap_or_default();
        let hostname = dn::hostname_from_dn(&dn);
        ctx.event(
            Event {
                timestamp: created,
                title: format!("{}: {}", code, cause),
                text: attr_str(&attrs, "descr").unwrap_or_default(),
                alert_type: alert_type(attr_str(&attrs, "severity").as_deref()),
                tags: Default::default(),
                hostname: None,
            },
            &tags,
            hostname.as_deref(),
        );
    }

    cursor.advance(tenant, newest);
    Ok(())
}

fn find_records<'a>(objects: &'a [Value], out: &mut Vec<&'a Value>) {
    for obj in objects {
        if object_class(obj) == Some("eventRecord") {
            out.push(obj);
        }
        find_records(children(obj), out);
    }
}

fn alert_type(severity: Option<&str>) -> AlertType {
    match severity {
        Some("critical" | "major") => AlertType::Error,
        Some("minor" | "warning") => AlertType::Warning,
        _ => AlertType::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn records_are_found_at_any_depth() {
        let body = vec![json!({"fvTenant": {
            "attributes": {"name": "acme"},
            "children": [
                {"eventRecord": {"attributes": {"code": "E1"}}},
                {"fvAp": {"attributes": {}, "children": [
                    {"eventRecord": {"attributes": {"code": "E2"}}}
                ]}}
            ]
        }})];
        let mut records = Vec::new();
        find_records(&body, &mut records);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn cursor_starts_at_creation_time() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut cursor = EventCursor::new(start);
        assert_eq!(cursor.since("acme"), start);

        let later = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        cursor.advance("acme", later);
        assert_eq!(cursor.since("acme"), later);
        assert_eq!(cursor.since("other"), start);
    }

    #[test]
    fn severity_mapping() {
        assert_eq!(alert_type(Some("major")), AlertType::Error);
        assert_eq!(alert_type(Some("warning")), AlertType::Warning);
        assert_eq!(alert_type(Some("info")), AlertType::Info);
        assert_eq!(alert_type(None), AlertType::Info);
    }
}
