// Link service: the typed operation set commands call. Each method builds
// one `Operation`, hands it to the dispatcher with the active instance and
// token, and pulls the one field it cares about out of the reply.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use crate::api::{Dispatcher, HttpTransport, Operation, Payload, Transport, TOKEN_PATH};
use crate::config::{effective_instance_url, effective_token, validate_scheme, Configuration};
use crate::error::ApiError;

pub const SIGNUP_PATH: &str = "/signup";
pub const LINKS_PATH: &str = "/links";
pub const PING_PATH: &str = "/ping";

/// Operations against the configured link-shortening instance.
pub struct LinkService<'a, T: Transport = HttpTransport> {
    config: &'a Configuration,
    dispatcher: Dispatcher<T>,
}

impl<'a, T: Transport> LinkService<'a, T> {
    pub fn new(config: &'a Configuration, dispatcher: Dispatcher<T>) -> Self {
        LinkService { config, dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    /// The instance URL all operations (except `ping_instance`) talk to.
    pub fn instance_url(&self) -> &str {
        effective_instance_url(self.config)
    }

    fn send(&self, op: Operation) -> Result<Payload, ApiError> {
        self.dispatcher
            .send(op, self.instance_url(), effective_token(self.config))
    }

    /// Create an account. Returns the service's confirmation message.
    pub fn register_user(&self, username: &str, password: &str, email: &str) -> Result<String, ApiError> {
        let op = Operation::new(Method::POST, SIGNUP_PATH).json(json!({
            "username": username,
            "password": password,
            "email": email,
        }));
        let payload = self.send(op)?;
        string_field(&payload, "message")
    }

    /// Exchange credentials for a bearer token. Persisting the token is the
    /// caller's job.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let op = Operation::new(Method::POST, TOKEN_PATH)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&[("username", username), ("password", password)]);
        let payload = self.send(op)?;
        let token = string_field(&payload, "access_token")?;
        if token.is_empty() {
            return Err(ApiError::Unexpected("the service issued an empty access token".into()));
        }
        info!(username, "authenticated");
        Ok(token)
    }

    /// Shorten `url`, optionally under `custom_path`.
    ///
    /// Returns the shortened path exactly as the service reports it,
    /// relative to the instance. Use [`resolve_short_url`] to turn it into
    /// a full link.
    pub fn create_link(&self, url: &str, custom_path: Option<&str>) -> Result<String, ApiError> {
        let custom_path = custom_path.filter(|p| !p.is_empty());
        let op = Operation::new(Method::POST, LINKS_PATH)
            .json(json!({ "url": url, "custom_path": custom_path }))
            .authenticated();
        let payload = self.send(op)?;
        string_field(&payload, "shortened_url")
    }

    /// Delete the link behind a full short URL. Only its path is used as the
    /// key; query and fragment are ignored.
    pub fn delete_link(&self, short_url: &str) -> Result<String, ApiError> {
        let key = link_key(short_url)?;
        let op = Operation::new(Method::DELETE, format!("{LINKS_PATH}{key}")).authenticated();
        let payload = self.send(op)?;
        string_field(&payload, "message")
    }

    /// Check whether `candidate` is a live instance.
    ///
    /// Unreachable instances and error responses give `Ok(false)`. A bad
    /// scheme or an unexpected failure is still an error.
    pub fn ping_instance(&self, candidate: &str) -> Result<bool, ApiError> {
        validate_scheme(candidate)?;
        let op = Operation::new(Method::GET, PING_PATH);
        match self.dispatcher.send(op, candidate, None) {
            Ok(_) => Ok(true),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(instance = candidate, error = %err, "ping failed");
                Ok(false)
            }
        }
    }
}

/// Path component of a full short URL, used as the deletion key.
pub fn link_key(short_url: &str) -> Result<String, ApiError> {
    let parsed = Url::parse(short_url).map_err(|e| match e {
        url::ParseError::RelativeUrlWithoutBase => ApiError::MissingScheme,
        other => ApiError::InvalidUrl { url: short_url.to_string(), reason: other.to_string() },
    })?;
    Ok(parsed.path().to_string())
}

/// Join a shortened path returned by `create_link` onto the instance URL.
pub fn resolve_short_url(instance_url: &str, shortened: &str) -> Result<String, ApiError> {
    let base = Url::parse(instance_url).map_err(|e| ApiError::InvalidUrl {
        url: instance_url.to_string(),
        reason: e.to_string(),
    })?;
    let full = base.join(shortened).map_err(|e| ApiError::InvalidUrl {
        url: shortened.to_string(),
        reason: e.to_string(),
    })?;
    Ok(full.to_string())
}

fn string_field(payload: &Payload, field: &str) -> Result<String, ApiError> {
    payload
        .get(field)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ApiError::Unexpected(format!("response is missing '{field}'")))
}
