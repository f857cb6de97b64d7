//! Stat classes reported by the controller and the metrics read from them.
//!
//! Each table maps a stats object class (e.g. `fvOverallHealthHist15min`) to
//! the attributes worth reporting. Metric names are built as
//! `cisco_aci.<scope>.<suffix>` where the scope depends on which object the
//! stats hang off (tenant, application, port...).

use crate::types::Method;

pub const METRIC_PREFIX: &str = "cisco_aci";

#[derive(Debug, Clone, Copy)]
pub struct StatMetric {
    pub attribute: &'static str,
    pub suffix: &'static str,
    pub method: Method,
}

#[derive(Debug, Clone, Copy)]
pub struct StatClass {
    pub class: &'static str,
    pub metrics: &'static [StatMetric],
}

const fn gauge(attribute: &'static str, suffix: &'static str) -> StatMetric {
    StatMetric { attribute, suffix, method: Method::Gauge }
}

const fn rate(attribute: &'static str, suffix: &'static str) -> StatMetric {
    StatMetric { attribute, suffix, method: Method::Rate }
}

pub fn lookup(table: &'static [StatClass], class: &str) -> Option<&'static [StatMetric]> {
    table.iter().find(|c| c.class == class).map(|c| c.metrics)
}

pub fn metric_name(scope: &str, suffix: &str) -> String {
    format!("{}.{}.{}", METRIC_PREFIX, scope, suffix)
}

/// Stats shared by tenants, applications and endpoint groups
pub static TENANT_STATS: &[StatClass] = &[
    StatClass {
        class: "fvOverallHealthHist15min",
        metrics: &[
            gauge("healthAvg", "health.avg"),
            gauge("healthMax", "health.max"),
            gauge("healthMin", "health.min"),
        ],
    },
    StatClass {
        class: "fvOverallHealth15min",
        metrics: &[gauge("healthLast", "health.cur")],
    },
    StatClass {
        class: "fvFltCounter15min",
        metrics: &[
            gauge("critcountLast", "fault_counter.critical"),
            gauge("majcountLast", "fault_counter.major"),
            gauge("minorcountLast", "fault_counter.minor"),
            gauge("warncountLast", "fault_counter.warning"),
        ],
    },
    StatClass {
        class: "l2IngrBytesAg15min",
        metrics: &[
            gauge("unicastRate", "ingress_bytes.unicast.rate"),
            rate("unicastCum", "ingress_bytes.unicast.cum"),
            gauge("multicastRate", "ingress_bytes.multicast.rate"),
            rate("multicastCum", "ingress_bytes.multicast.cum"),
            gauge("floodRate", "ingress_bytes.flood.rate"),
            rate("floodCum", "ingress_bytes.flood.cum"),
            gauge("dropRate", "ingress_bytes.drop.rate"),
            rate("dropCum", "ingress_bytes.drop.cum"),
        ],
    },
    StatClass {
        class: "l2EgrBytesAg15min",
        metrics: &[
            gauge("unicastRate", "egress_bytes.unicast.rate"),
            rate("unicastCum", "egress_bytes.unicast.cum"),
            gauge("multicastRate", "egress_bytes.multicast.rate"),
            rate("multicastCum", "egress_bytes.multicast.cum"),
            gauge("floodRate", "egress_bytes.flood.rate"),
            rate("floodCum", "egress_bytes.flood.cum"),
        ],
    },
    StatClass {
        class: "l2IngrPktsAg15min",
        metrics: &[
            gauge("unicastRate", "ingress_pkts.unicast.rate"),
            gauge("multicastRate", "ingress_pkts.multicast.rate"),
            gauge("floodRate", "ingress_pkts.flood.rate"),
            gauge("dropRate", "ingress_pkts.drop.rate"),
        ],
    },
    StatClass {
        class: "l2EgrPktsAg15min",
        metrics: &[
            gauge("unicastRate", "egress_pkts.unicast.rate"),
            gauge("multicastRate", "egress_pkts.multicast.rate"),
            gauge("floodRate", "egress_pkts.flood.rate"),
        ],
    },
];

pub static FABRIC_POD_STATS: &[StatClass] = &[
    StatClass {
        class: "fabricOverallHealthHist5min",
        metrics: &[
            gauge("healthAvg", "health.avg"),
            gauge("healthMax", "health.max"),
            gauge("healthMin", "health.min"),
        ],
    },
    StatClass {
        class: "fabricOverallHealth5min",
        metrics: &[gauge("healthLast", "health.cur")],
    },
    StatClass {
        class: "eqptEgrTotalAg5min",
        metrics: &[
            gauge("bytesRateAvg", "egr_total.bytes.rate"),
            rate("bytesCum", "egr_total.bytes.cum"),
            gauge("pktsRateAvg", "egr_total.pkts.rate"),
        ],
    },
    StatClass {
        class: "eqptIngrTotalAg5min",
        metrics: &[
            gauge("bytesRateAvg", "ingr_total.bytes.rate"),
            rate("bytesCum", "ingr_total.bytes.cum"),
            gauge("pktsRateAvg", "ingr_total.pkts.rate"),
        ],
    },
];

pub static FABRIC_NODE_STATS: &[StatClass] = &[
    StatClass {
        class: "fabricNodeHealth5min",
        metrics: &[
            gauge("healthLast", "health.cur"),
            gauge("healthAvg", "health.avg"),
            gauge("healthMax", "health.max"),
            gauge("healthMin", "health.min"),
        ],
    },
    StatClass {
        class: "eqptEgrTotal5min",
        metrics: &[
            gauge("bytesRateAvg", "egr_total.bytes.rate"),
            rate("bytesCum", "egr_total.bytes.cum"),
            gauge("pktsRateAvg", "egr_total.pkts.rate"),
        ],
    },
    StatClass {
        class: "eqptIngrTotal5min",
        metrics: &[
            gauge("bytesRateAvg", "ingr_total.bytes.rate"),
            rate("bytesCum", "ingr_total.bytes.cum"),
            gauge("pktsRateAvg", "ingr_total.pkts.rate"),
        ],
    },
];

/// Process stats for controllers (`proc*`) and switches (`procSys*`)
pub static FABRIC_PROC_STATS: &[StatClass] = &[
    StatClass {
        class: "procCPUHist5min",
        metrics: &[
            gauge("currentAvg", "cpu.avg"),
            gauge("currentMax", "cpu.max"),
            gauge("currentMin", "cpu.min"),
        ],
    },
    StatClass {
        class: "procMemHist5min",
        metrics: &[
            gauge("currentAvg", "mem.avg"),
            gauge("currentMax", "mem.max"),
            gauge("currentMin", "mem.min"),
        ],
    },
    StatClass {
        class: "procSysCPUHist5min",
        metrics: &[
            gauge("userAvg", "cpu.user.avg"),
            gauge("kernelAvg", "cpu.kernel.avg"),
            gauge("idleAvg", "cpu.idle.avg"),
        ],
    },
    StatClass {
        class: "procSysMemHist5min",
        metrics: &[gauge("usedAvg", "mem.used.avg"), gauge("freeAvg", "mem.free.avg")],
    },
];

pub static FABRIC_PORT_STATS: &[StatClass] = &[
    StatClass {
        class: "eqptEgrTotal5min",
        metrics: &[
            gauge("bytesRateAvg", "egr_total.bytes.rate"),
            rate("bytesCum", "egr_total.bytes.cum"),
            gauge("pktsRateAvg", "egr_total.pkts.rate"),
        ],
    },
    StatClass {
        class: "eqptIngrTotal5min",
        metrics: &[
            gauge("bytesRateAvg", "ingr_total.bytes.rate"),
            rate("bytesCum", "ingr_total.bytes.cum"),
            gauge("pktsRateAvg", "ingr_total.pkts.rate"),
        ],
    },
    StatClass {
        class: "eqptEgrDropPkts5min",
        metrics: &[
            gauge("errorLast", "egr_drop_pkts.error"),
            gauge("bufferLast", "egr_drop_pkts.buffer"),
            gauge("afdWredLast", "egr_drop_pkts.afd_wred"),
        ],
    },
    StatClass {
        class: "eqptIngrDropPkts5min",
        metrics: &[
            gauge("errorLast", "ingr_drop_pkts.error"),
            gauge("bufferLast", "ingr_drop_pkts.buffer"),
            gauge("forwardingLast", "ingr_drop_pkts.forwarding"),
        ],
    },
    StatClass {
        class: "eqptEgrBytes5min",
        metrics: &[
            gauge("unicastRate", "egr_bytes.unicast.rate"),
            rate("unicastCum", "egr_bytes.unicast.cum"),
            gauge("multicastRate", "egr_bytes.multicast.rate"),
            gauge("floodRate", "egr_bytes.flood.rate"),
        ],
    },
    StatClass {
        class: "eqptIngrBytes5min",
        metrics: &[
            gauge("unicastRate", "ingr_bytes.unicast.rate"),
            rate("unicastCum", "ingr_bytes.unicast.cum"),
            gauge("multicastRate", "ingr_bytes.multicast.rate"),
            gauge("floodRate", "ingr_bytes.flood.rate"),
        ],
    },
];

/// Per-leaf hardware table usage
pub static LEAF_CAPACITY_STATS: &[StatClass] = &[
    StatClass {
        class: "eqptcapacityPolUsage5min",
        metrics: &[
            gauge("polUsageCum", "policy_cam.utilized"),
            gauge("polUsageCapCum", "policy_cam.limit"),
        ],
    },
    StatClass {
        class: "eqptcapacityVlanUsage5min",
        metrics: &[gauge("totalCum", "vlan.utilized"), gauge("totalCapCum", "vlan.limit")],
    },
    StatClass {
        class: "eqptcapacityMcastUsage5min",
        metrics: &[
            gauge("localEpCum", "multicast.utilized"),
            gauge("localEpCapCum", "multicast.limit"),
        ],
    },
    StatClass {
        class: "eqptcapacityL2Usage5min",
        metrics: &[
            gauge("localEpCum", "endpoint.utilized"),
            gauge("localEpCapCum", "endpoint.limit"),
        ],
    },
];

/// Controller object classes counted against the fabric-wide limits
pub static APIC_CAPACITY_CLASSES: &[(&str, &str)] = &[
    ("fvTenant", "tenant"),
    ("fvCtx", "private_network"),
    ("fvBD", "bridge_domain"),
    ("fvAEPg", "endpoint_group"),
    ("fvCEp", "endpoint"),
    ("fabricNode", "fabric_node"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn classes_are_unique_per_table() {
        for table in [
            TENANT_STATS,
            FABRIC_POD_STATS,
            FABRIC_NODE_STATS,
            FABRIC_PROC_STATS,
            FABRIC_PORT_STATS,
            LEAF_CAPACITY_STATS,
        ] {
            let mut seen = HashSet::new();
            for c in table {
                assert!(seen.insert(c.class), "duplicate class {}", c.class);
            }
        }
    }

    #[test]
    fn lookup_by_class() {
        let metrics = lookup(FABRIC_NODE_STATS, "fabricNodeHealth5min").unwrap();
        assert_eq!(metrics[0].attribute, "healthLast");
        assert!(lookup(FABRIC_NODE_STATS, "fvTenant").is_none());
        assert_eq!(metric_name("fabric.node", "health.cur"), "cisco_aci.fabric.node.health.cur");
    }
}
