use chrono::Utc;

use crate::types::{Event, MetricSample, Method, ServiceCheck, Status, Submission, Tags};

/// Buffer a check run writes its samples and service checks into.
///
/// The scheduler drains it after every run and hands the batch to the
/// emitters.
#[derive(Debug, Default)]
pub struct Aggregator {
    submissions: Vec<Submission>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(
        &mut self,
        name: &str,
        value: f64,
        tags: &[String],
        method: Method,
        hostname: Option<&str>,
    ) {
        self.submissions.push(Submission::Metric(MetricSample {
            timestamp: Utc::now(),
            name: name.to_string(),
            value,
            tags: tags.iter().cloned().collect(),
            method,
            hostname: hostname.map(str::to_string),
        }));
    }

    pub fn gauge(&mut self, name: &str, value: f64, tags: &[String], hostname: Option<&str>) {
        self.submit(name, value, tags, Method::Gauge, hostname);
    }

    pub fn rate(&mut self, name: &str, value: f64, tags: &[String], hostname: Option<&str>) {
        self.submit(name, value, tags, Method::Rate, hostname);
    }

    pub fn service_check(
        &mut self,
        name: &str,
        status: Status,
        message: Option<String>,
        tags: &[String],
    ) {
        self.submissions.push(Submission::ServiceCheck(ServiceCheck {
            timestamp: Utc::now(),
            name: name.to_string(),
            status,
            message,
            tags: tags.iter().cloned().collect::<Tags>(),
        }));
    }

    pub fn event(&mut self, event: Event) {
        self.submissions.push(Submission::Event(event));
    }

    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    /// Take everything submitted so far
    pub fn drain(&mut self) -> Vec<Submission> {
        std::mem::take(&mut self.submissions)
    }

    pub fn metrics(&self) -> impl Iterator<Item = &MetricSample> {
        self.submissions.iter().filter_map(|s| match s {
            Submission::Metric(m) => Some(m),
            _ => None,
        })
    }

    pub fn metrics_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetricSample> {
        self.metrics().filter(move |m| m.name == name)
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.submissions.iter().filter_map(|s| match s {
            Submission::Event(e) => Some(e),
            _ => None,
        })
    }

    pub fn service_checks<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ServiceCheck> {
        self.submissions.iter().filter_map(move |s| match s {
            Submission::ServiceCheck(sc) if sc.name == name => Some(sc),
            _ => None,
        })
    }
}
