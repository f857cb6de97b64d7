use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::error::ApiError;
use super::transport::{Endpoint, HttpClient};

const LOGIN_PATH: &str = "/api/aaaLogin.xml";
const TOKEN_COOKIE: &str = "APIC-cookie";

/// Username and password shared by every endpoint of a pool
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// An authenticated session against exactly one endpoint
pub struct Session {
    endpoint: Endpoint,
    cookie: String,
    client: Arc<dyn HttpClient>,
}

impl Session {
    pub async fn login(
        endpoint: &Endpoint,
        credentials: &Credentials,
        client: Arc<dyn HttpClient>,
    ) -> Result<Self, ApiError> {
        let url = format!("{}{}", endpoint.url, LOGIN_PATH);
        let body = format!(
            "<aaaUser name=\"{}\" pwd=\"{}\"/>\n",
            xml_escape(&credentials.username),
            xml_escape(&credentials.password)
        );
        let auth_err = |reason: String| ApiError::Authentication {
            url: endpoint.url.clone(),
            reason,
        };

        let resp = client.post(&url, body).await.map_err(|e| auth_err(e.to_string()))?;
        if !resp.is_success() {
            return Err(auth_err(format!("login returned status {}", resp.status)));
        }
        let token = find_cookie(&resp.set_cookies, TOKEN_COOKIE)
            .ok_or_else(|| auth_err(format!("no {} in login response", TOKEN_COOKIE)))?;

        debug!(url = %endpoint.url, "Logged in");
        Ok(Self {
            endpoint: endpoint.clone(),
            cookie: format!("APIC-Cookie={}", token),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.endpoint.url
    }

    /// GET `path` on this session's endpoint and decode the body as JSON
    pub async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.endpoint.url, path);

        let resp = match self.client.get(&url, &[("Cookie", self.cookie.as_str())]).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(url = %url, error = %e, "Error making request");
                return Err(ApiError::Transport { url, reason: e.to_string() });
            }
        };
        if !resp.is_success() {
            warn!(url = %url, status = resp.status, "Error making request");
            return Err(ApiError::Status { url, status: resp.status });
        }

        serde_json::from_str(&resp.body).map_err(|e| {
            warn!(url = %url, error = %e, "Failed to parse response body");
            ApiError::Decode { url, reason: e.to_string() }
        })
    }
}

fn find_cookie<'a>(set_cookies: &'a [String], name: &str) -> Option<&'a str> {
    set_cookies.iter().find_map(|header| {
        let pair = header.split(';').next()?.trim();
        let (k, v) = pair.split_once('=')?;
        (k == name && !v.is_empty()).then_some(v)
    })
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_lookup() {
        let headers = vec![
            "JSESSIONID=abc; Path=/".to_string(),
            "APIC-cookie=tok123; path=/; HttpOnly; HttpOnly; Secure".to_string(),
        ];
        assert_eq!(find_cookie(&headers, TOKEN_COOKIE), Some("tok123"));
        assert_eq!(find_cookie(&headers, "missing"), None);
        assert_eq!(find_cookie(&["APIC-cookie=; path=/".to_string()], TOKEN_COOKIE), None);
    }

    #[test]
    fn login_body_is_escaped() {
        assert_eq!(xml_escape(r#"p<w>"d&'"#), "p&lt;w&gt;&quot;d&amp;&apos;");
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials { username: "admin".into(), password: "hunter2".into() };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
