use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::warn;
use tide::http::StatusCode;
use tide::{Middleware, Next, Request, Response};

pub const ADMIN_USERNAME: &str = "admin";

/// Restricts every route to staff when an admin password is configured.
///
/// Staff authenticate with HTTP Basic credentials `admin:<password>`.
/// Without a password the surface is open, which is only meant for local
/// development.
pub struct StaffOnly {
    password: Option<String>,
}

impl StaffOnly {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }

    fn authorized(&self, header: Option<&str>) -> bool {
        let Some(password) = &self.password else {
            return true;
        };
        let Some(encoded) = header.and_then(|h| h.strip_prefix("Basic ")) else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let expected = format!("{}:{}", ADMIN_USERNAME, password);
        decoded == expected.as_bytes()
    }
}

#[async_trait]
impl<State: Clone + Send + Sync + 'static> Middleware<State> for StaffOnly {
    async fn handle(&self, req: Request<State>, next: Next<'_, State>) -> tide::Result {
        let header = req.header("Authorization").map(|values| values.last().as_str().to_string());
        if self.authorized(header.as_deref()) {
            return Ok(next.run(req).await);
        }
        warn!("rejected unauthenticated request to {}", req.url().path());
        let mut response = Response::new(StatusCode::Unauthorized);
        response.insert_header("WWW-Authenticate", "Basic realm=\"admin\"");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(credentials: &str) -> String {
        format!("Basic {}", STANDARD.encode(credentials))
    }

    #[test]
    fn test_open_without_password() {
        let staff = StaffOnly::new(None);
        assert!(staff.authorized(None));
    }

    #[test]
    fn test_requires_matching_credentials() {
        let staff = StaffOnly::new(Some("s3cret".to_string()));
        assert!(staff.authorized(Some(&basic("admin:s3cret"))));
        assert!(!staff.authorized(Some(&basic("admin:wrong"))));
        assert!(!staff.authorized(Some(&basic("root:s3cret"))));
        assert!(!staff.authorized(Some("Bearer s3cret")));
        assert!(!staff.authorized(None));
    }
}
