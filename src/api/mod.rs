pub mod cache;
pub mod error;
pub mod session;
pub mod transport;

use std::sync::Arc;

use rand::seq::SliceRandom;
use serde_json::Value;
use tracing::info;

pub use cache::{SessionCache, SharedPool};
pub use error::ApiError;
pub use session::{Credentials, Session};
pub use transport::{
    ClientFactory, Endpoint, HttpClient, HttpResponse, ReqwestFactory, TransportError,
};

const STATS_QUERY: &str = "rsp-subtree-include=stats,no-scoped";
const SUBTREE_CLASS: &str = "query-target=subtree&target-subtree-class";

/// One authenticated session per configured controller.
///
/// Every request goes to a session picked uniformly at random; there is no
/// stickiness and no failover inside a single request. Transport handles are
/// built at login and owned by the sessions, so `close` releases them.
pub struct SessionPool {
    endpoints: Vec<Endpoint>,
    factory: Arc<dyn ClientFactory>,
    credentials: Credentials,
    sessions: Vec<Session>,
}

impl SessionPool {
    pub fn new(
        endpoints: Vec<Endpoint>,
        credentials: Credentials,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            endpoints,
            factory,
            credentials,
            sessions: Vec::new(),
        }
    }

    /// Re-authenticate against every endpoint.
    ///
    /// The pool is emptied first; it only holds sessions again once every
    /// endpoint has accepted the credentials.
    pub async fn login(&mut self) -> Result<(), ApiError> {
        self.sessions.clear();

        let mut fresh = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            let client = self.factory.build(endpoint).map_err(|e| ApiError::Client {
                url: endpoint.url.clone(),
                reason: e.to_string(),
            })?;
            fresh.push(Session::login(endpoint, &self.credentials, client).await?);
        }

        info!(sessions = fresh.len(), "Logged in to all controllers");
        self.sessions = fresh;
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        !self.sessions.is_empty()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Endpoint URLs of the live sessions, in configuration order
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.sessions.iter().map(Session::url)
    }

    /// GET `path` through a randomly chosen session
    pub async fn request(&self, path: &str) -> Result<Value, ApiError> {
        let session = self
            .sessions
            .choose(&mut rand::thread_rng())
            .ok_or(ApiError::NotLoggedIn)?;
        session.get_json(path).await
    }

    /// Drop every session together with its transport handle. Calling it
    /// again is a no-op.
    pub fn close(&mut self) {
        if !self.sessions.is_empty() {
            tracing::debug!(sessions = self.sessions.len(), "Closing sessions");
            self.sessions.clear();
        }
    }

    async fn query(&self, path: String) -> Result<Vec<Value>, ApiError> {
        let body = self.request(&path).await?;
        parse_response(&path, body)
    }

    pub async fn get_tenant_stats(&self, tenant: &str) -> Result<Vec<Value>, ApiError> {
        self.query(format!("/api/mo/uni/tn-{}.json?{}", tenant, STATS_QUERY)).await
    }

    pub async fn get_apps(&self, tenant: &str) -> Result<Vec<Value>, ApiError> {
        self.query(format!("/api/mo/uni/tn-{}.json?{}=fvAp", tenant, SUBTREE_CLASS)).await
    }

    pub async fn get_app_stats(&self, tenant: &str, app: &str) -> Result<Vec<Value>, ApiError> {
        self.query(format!("/api/mo/uni/tn-{}/ap-{}.json?{}", tenant, app, STATS_QUERY))
            .await
    }

    pub async fn get_epgs(&self, tenant: &str, app: &str) -> Result<Vec<Value>, ApiError> {
        self.query(format!(
            "/api/mo/uni/tn-{}/ap-{}.json?{}=fvAEPg",
            tenant, app, SUBTREE_CLASS
        ))
        .await
    }

    pub async fn get_epg_stats(
        &self,
        tenant: &str,
        app: &str,
        epg: &str,
    ) -> Result<Vec<Value>, ApiError> {
        self.query(format!(
            "/api/mo/uni/tn-{}/ap-{}/epg-{}.json?{}",
            tenant, app, epg, STATS_QUERY
        ))
        .await
    }

    pub async fn get_epg_meta(
        &self,
        tenant: &str,
        app: &str,
        epg: &str,
    ) -> Result<Vec<Value>, ApiError> {
        self.query(format!(
            "/api/mo/uni/tn-{}/ap-{}/epg-{}.json?{}=fvCEp",
            tenant, app, epg, SUBTREE_CLASS
        ))
        .await
    }

    pub async fn get_eth_list_for_epg(
        &self,
        tenant: &str,
        app: &str,
        epg: &str,
    ) -> Result<Vec<Value>, ApiError> {
        self.query(format!(
            "/api/mo/uni/tn-{}/ap-{}/epg-{}.json?{}=fvRsCEpToPathEp",
            tenant, app, epg, SUBTREE_CLASS
        ))
        .await
    }

    /// One page of a tenant's event log, newest first
    pub async fn get_tenant_events(
        &self,
        tenant: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Value>, ApiError> {
        self.query(format!(
            "/api/node/mo/uni/tn-{}.json?rsp-subtree-include=event-logs,no-scoped,subtree\
             &order-by=eventRecord.created|desc&page={}&page-size={}",
            tenant, page, page_size
        ))
        .await
    }

    pub async fn get_fabric_pods(&self) -> Result<Vec<Value>, ApiError> {
        self.query(format!("/api/mo/topology.json?{}=fabricPod", SUBTREE_CLASS)).await
    }

    pub async fn get_pod_stats(&self, pod: &str) -> Result<Vec<Value>, ApiError> {
        self.query(format!("/api/mo/topology/pod-{}.json?{}&page-size=20", pod, STATS_QUERY))
            .await
    }

    pub async fn get_fabric_nodes(&self) -> Result<Vec<Value>, ApiError> {
        self.query(format!("/api/mo/topology.json?{}=fabricNode", SUBTREE_CLASS)).await
    }

    pub async fn get_node_stats(&self, pod: &str, node: &str) -> Result<Vec<Value>, ApiError> {
        self.query(format!(
            "/api/mo/topology/pod-{}/node-{}/sys.json?{}&page-size=20",
            pod, node, STATS_QUERY
        ))
        .await
    }

    pub async fn get_controller_proc_metrics(
        &self,
        pod: &str,
        node: &str,
    ) -> Result<Vec<Value>, ApiError> {
        self.query(format!(
            "/api/node/mo/topology/pod-{}/node-{}/sys/proc.json?{}\
             &rsp-subtree-class=procMemHist5min,procCPUHist5min",
            pod, node, STATS_QUERY
        ))
        .await
    }

    pub async fn get_spine_proc_metrics(
        &self,
        pod: &str,
        node: &str,
    ) -> Result<Vec<Value>, ApiError> {
        self.query(format!(
            "/api/node/mo/topology/pod-{}/node-{}/sys/procsys.json?{}\
             &rsp-subtree-class=procSysMemHist5min,procSysCPUHist5min",
            pod, node, STATS_QUERY
        ))
        .await
    }

    pub async fn get_eth_list(&self, pod: &str, node: &str) -> Result<Vec<Value>, ApiError> {
        self.query(format!(
            "/api/mo/topology/pod-{}/node-{}/sys.json?{}=l1PhysIf",
            pod, node, SUBTREE_CLASS
        ))
        .await
    }

    pub async fn get_eth_stats(
        &self,
        pod: &str,
        node: &str,
        eth: &str,
    ) -> Result<Vec<Value>, ApiError> {
        self.query(format!(
            "/api/mo/topology/pod-{}/node-{}/sys/phys-[{}].json?{}&page-size=50",
            pod, node, eth, STATS_QUERY
        ))
        .await
    }

    pub async fn get_eqpt_capacity(&self, class: &str) -> Result<Vec<Value>, ApiError> {
        self.query(format!(
            "/api/class/eqptcapacityEntity.json?query-target=self&rsp-subtree-include=stats\
             &rsp-subtree-class={}",
            class
        ))
        .await
    }

    pub async fn get_capacity_contexts(&self, class: &str) -> Result<Vec<Value>, ApiError> {
        self.query(format!("/api/node/class/ctxClassCnt.json?rsp-subtree-class={}", class))
            .await
    }

    pub async fn get_apic_capacity_limits(&self) -> Result<Vec<Value>, ApiError> {
        self.query(
            "/api/mo/uni/fabric/compcat-default/fvsw-default/capabilities.json\
             ?query-target=children&target-subtree-class=fvcapRule"
                .to_string(),
        )
        .await
    }

    pub async fn get_apic_capacity_metrics(
        &self,
        class: &str,
        query: Option<&str>,
    ) -> Result<Vec<Value>, ApiError> {
        let query = query.unwrap_or("rsp-subtree-include=count");
        self.query(format!("/api/class/{}.json?{}", class, query)).await
    }
}

/// Object list from a controller response: either the body itself or the
/// list under `imdata`
pub fn parse_response(path: &str, body: Value) -> Result<Vec<Value>, ApiError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("imdata") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ApiError::Decode {
                url: path.to_string(),
                reason: "response has no imdata list".to_string(),
            }),
        },
        _ => Err(ApiError::Decode {
            url: path.to_string(),
            reason: "response is neither a list nor an object".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone)]
    enum Behavior {
        Ok(String),
        RejectLogin,
        Unreachable,
        Status(u16),
        Garbage,
    }

    struct FakeClient {
        behavior: Behavior,
        gets: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl HttpClient for FakeClient {
        async fn get(
            &self,
            url: &str,
            headers: &[(&str, &str)],
        ) -> Result<HttpResponse, TransportError> {
            let cookie = headers
                .iter()
                .find(|(k, _)| *k == "Cookie")
                .map(|(_, v)| v.to_string())
                .unwrap_or_default();
            self.gets.lock().unwrap().push((url.to_string(), cookie));
            match &self.behavior {
                Behavior::Ok(_) | Behavior::RejectLogin => Ok(HttpResponse {
                    status: 200,
                    set_cookies: vec![],
                    body: body_of(&self.behavior),
                }),
                Behavior::Unreachable => Err(TransportError("connection refused".into())),
                Behavior::Status(code) => Ok(HttpResponse { status: *code, ..Default::default() }),
                Behavior::Garbage => Ok(HttpResponse {
                    status: 200,
                    body: "<html>not json</html>".into(),
                    ..Default::default()
                }),
            }
        }

        async fn post(&self, url: &str, _body: String) -> Result<HttpResponse, TransportError> {
            match self.behavior {
                Behavior::RejectLogin => Ok(HttpResponse { status: 401, ..Default::default() }),
                _ => Ok(HttpResponse {
                    status: 200,
                    set_cookies: vec![format!("APIC-cookie=token-for-{}; path=/", url)],
                    body: String::new(),
                }),
            }
        }
    }

    fn body_of(b: &Behavior) -> String {
        match b {
            Behavior::Ok(body) => body.clone(),
            _ => "{}".into(),
        }
    }

    #[derive(Default)]
    struct FakeFactory {
        behaviors: HashMap<String, Behavior>,
        built: Mutex<Vec<Arc<FakeClient>>>,
    }

    impl FakeFactory {
        fn with(mut self, url: &str, behavior: Behavior) -> Self {
            self.behaviors.insert(url.to_string(), behavior);
            self
        }

        fn gets(&self) -> Vec<(String, String)> {
            self.built
                .lock()
                .unwrap()
                .iter()
                .flat_map(|c| c.gets.lock().unwrap().clone())
                .collect()
        }
    }

    impl ClientFactory for FakeFactory {
        fn build(&self, endpoint: &Endpoint) -> Result<Arc<dyn HttpClient>, TransportError> {
            let behavior = self
                .behaviors
                .get(&endpoint.url)
                .cloned()
                .ok_or_else(|| TransportError("unknown endpoint".into()))?;
            let client = Arc::new(FakeClient { behavior, gets: Mutex::new(Vec::new()) });
            self.built.lock().unwrap().push(client.clone());
            Ok(client)
        }
    }

    fn endpoints(urls: &[&str]) -> Vec<Endpoint> {
        urls.iter()
            .map(|u| Endpoint::new(*u, false, Duration::from_secs(5)))
            .collect()
    }

    fn creds() -> Credentials {
        Credentials { username: "admin".into(), password: "secret".into() }
    }

    const IMDATA: &str = r#"{"totalCount":"1","imdata":[{"fvAp":{"attributes":{"name":"web"}}}]}"#;

    fn single_apic() -> Arc<FakeFactory> {
        Arc::new(FakeFactory::default().with("https://apic1", Behavior::Ok(IMDATA.into())))
    }

    #[tokio::test]
    async fn login_then_request_attaches_cookie() {
        let factory = single_apic();
        let mut pool = SessionPool::new(endpoints(&["https://apic1"]), creds(), factory.clone());

        assert!(matches!(pool.request("/api/x.json").await, Err(ApiError::NotLoggedIn)));

        pool.login().await.unwrap();
        assert_eq!(pool.session_count(), 1);

        let apps = pool.get_apps("acme").await.unwrap();
        assert_eq!(apps, vec![json!({"fvAp": {"attributes": {"name": "web"}}})]);

        let gets = factory.gets();
        assert_eq!(gets.len(), 1);
        assert_eq!(
            gets[0].0,
            "https://apic1/api/mo/uni/tn-acme.json?query-target=subtree&target-subtree-class=fvAp"
        );
        assert_eq!(gets[0].1, "APIC-Cookie=token-for-https://apic1/api/aaaLogin.xml");
    }

    #[tokio::test]
    async fn failed_login_leaves_no_sessions() {
        let factory = Arc::new(
            FakeFactory::default()
                .with("https://apic1", Behavior::Ok(IMDATA.into()))
                .with("https://apic2", Behavior::RejectLogin)
                .with("https://apic3", Behavior::Ok(IMDATA.into())),
        );
        let mut pool = SessionPool::new(
            endpoints(&["https://apic1", "https://apic2", "https://apic3"]),
            creds(),
            factory.clone(),
        );

        let err = pool.login().await.unwrap_err();
        assert!(matches!(err, ApiError::Authentication { ref url, .. } if url == "https://apic2"));
        assert_eq!(pool.session_count(), 0);
        assert!(!pool.is_logged_in());
    }

    #[tokio::test]
    async fn relogin_replaces_sessions() {
        let factory = Arc::new(
            FakeFactory::default()
                .with("https://apic1", Behavior::Ok(IMDATA.into()))
                .with("https://apic2", Behavior::Ok(IMDATA.into())),
        );
        let both = endpoints(&["https://apic1", "https://apic2"]);
        let mut pool = SessionPool::new(both, creds(), factory.clone());

        pool.login().await.unwrap();
        pool.login().await.unwrap();
        assert_eq!(pool.session_count(), 2);
        assert_eq!(pool.urls().collect::<Vec<_>>(), vec!["https://apic1", "https://apic2"]);
    }

    #[tokio::test]
    async fn requests_spread_across_endpoints() {
        let factory = Arc::new(
            FakeFactory::default()
                .with("https://apic1", Behavior::Ok(IMDATA.into()))
                .with("https://apic2", Behavior::Ok(IMDATA.into())),
        );
        let both = endpoints(&["https://apic1", "https://apic2"]);
        let mut pool = SessionPool::new(both, creds(), factory.clone());
        pool.login().await.unwrap();

        for _ in 0..64 {
            pool.request("/api/x.json").await.unwrap();
        }
        let gets = factory.gets();
        assert_eq!(gets.len(), 64);
        assert!(gets.iter().any(|(u, _)| u.starts_with("https://apic1/")));
        assert!(gets.iter().any(|(u, _)| u.starts_with("https://apic2/")));
        // each request carries the token of the session it went through
        for (url, cookie) in gets {
            let base = &url[..url.find("/api").unwrap()];
            assert!(cookie.contains(base));
        }
    }

    #[tokio::test]
    async fn transport_and_decode_failures_are_distinct() {
        let factory = Arc::new(
            FakeFactory::default()
                .with("https://down", Behavior::Unreachable)
                .with("https://err", Behavior::Status(503))
                .with("https://bad", Behavior::Garbage),
        );

        let cases = [("https://down", true), ("https://err", true), ("https://bad", false)];
        for (url, transport) in cases {
            let mut pool = SessionPool::new(endpoints(&[url]), creds(), factory.clone());
            pool.login().await.unwrap();
            let err = pool.request("/api/x.json").await.unwrap_err();
            assert_eq!(err.is_transport(), transport, "{}", url);
            assert_eq!(err.is_decode(), !transport, "{}", url);
        }
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let factory = single_apic();
        let mut pool = SessionPool::new(endpoints(&["https://apic1"]), creds(), factory.clone());
        pool.login().await.unwrap();

        pool.close();
        pool.close();
        assert!(!pool.is_logged_in());
        assert!(matches!(pool.request("/api/x.json").await, Err(ApiError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn close_releases_transport_handles() {
        let factory = single_apic();
        let mut pool = SessionPool::new(endpoints(&["https://apic1"]), creds(), factory.clone());
        pool.login().await.unwrap();

        let client = factory.built.lock().unwrap()[0].clone();
        // the factory's record, the session and this test
        assert_eq!(Arc::strong_count(&client), 3);

        pool.close();
        assert_eq!(Arc::strong_count(&client), 2);
    }

    #[tokio::test]
    async fn client_build_failure_fails_login() {
        let factory = single_apic();
        let listed = endpoints(&["https://apic1", "https://nowhere"]);
        let mut pool = SessionPool::new(listed, creds(), factory.clone());

        let err = pool.login().await.unwrap_err();
        assert!(matches!(err, ApiError::Client { ref url, .. } if url == "https://nowhere"));
        assert!(!pool.is_logged_in());
    }

    #[test]
    fn response_shapes() {
        let list = parse_response("/p", json!([{"a": 1}])).unwrap();
        assert_eq!(list.len(), 1);

        let wrapped = parse_response("/p", json!({"totalCount": "0", "imdata": []})).unwrap();
        assert!(wrapped.is_empty());

        assert!(parse_response("/p", json!({"error": "x"})).unwrap_err().is_decode());
        assert!(parse_response("/p", json!("text")).unwrap_err().is_decode());
    }
}
