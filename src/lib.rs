pub mod aggregator;
pub mod api;
pub mod attributes;
pub mod check;
pub mod config;
pub mod dn;
pub mod emitter;
pub mod metrics;
pub mod zero;

/// Common types used across modules
pub mod types {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use smallvec::SmallVec;

    /// Tag list in `key:value` form
    pub type Tags = SmallVec<[String; 8]>;

    /// How the host agent should aggregate a sample
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Method {
        Gauge,
        Rate,
    }

    /// A single metric measurement
    #[derive(Debug, Clone, Serialize)]
    pub struct MetricSample {
        pub timestamp: DateTime<Utc>,
        pub name: String,
        pub value: f64,
        pub tags: Tags,
        pub method: Method,
        pub hostname: Option<String>,
    }

    /// Service-health status levels
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum Status {
        Ok,
        Critical,
    }

    /// A service-health report for one check instance
    #[derive(Debug, Clone, Serialize)]
    pub struct ServiceCheck {
        pub timestamp: DateTime<Utc>,
        pub name: String,
        pub status: Status,
        pub message: Option<String>,
        pub tags: Tags,
    }

    /// Severity of a forwarded event
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum AlertType {
        Info,
        Warning,
        Error,
    }

    /// Something that happened on a monitored system, forwarded as-is
    #[derive(Debug, Clone, Serialize)]
    pub struct Event {
        pub timestamp: DateTime<Utc>,
        pub title: String,
        pub text: String,
        pub alert_type: AlertType,
        pub tags: Tags,
        pub hostname: Option<String>,
    }

    /// Anything a check hands to the submission layer
    #[derive(Debug, Clone, Serialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    pub enum Submission {
        Metric(MetricSample),
        ServiceCheck(ServiceCheck),
        Event(Event),
    }

    impl std::fmt::Display for Method {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Method::Gauge => write!(f, "gauge"),
                Method::Rate => write!(f, "rate"),
            }
        }
    }

    impl std::fmt::Display for AlertType {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                AlertType::Info => write!(f, "info"),
                AlertType::Warning => write!(f, "warning"),
                AlertType::Error => write!(f, "error"),
            }
        }
    }

    impl std::fmt::Display for Status {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Status::Ok => write!(f, "OK"),
                Status::Critical => write!(f, "CRITICAL"),
            }
        }
    }
}
