use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating credentials before any browser work starts.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("credentials require a password or at least one usable cookie")]
    NotLoginable,
    #[error("credentials require an email address")]
    MissingEmail,
}

/// A browser cookie in the heterogeneous export format produced by common
/// cookie-dump extensions. Only `name` and `value` are mandatory; cookies
/// missing either are dropped during injection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub secure: bool,
    #[serde(alias = "httpOnly")]
    pub http_only: bool,
    #[serde(alias = "hostOnly")]
    pub host_only: bool,
    /// Expiration epoch seconds; informational only, never enforced here.
    #[serde(alias = "expirationDate", skip_serializing_if = "Option::is_none")]
    pub expiration: Option<f64>,
}

impl Cookie {
    /// A cookie can be injected only when both name and value are present.
    pub fn is_injectable(&self) -> bool {
        !self.name.trim().is_empty() && !self.value.trim().is_empty()
    }

    /// Normalize the cookie domain for injection.
    ///
    /// Host-only cookies are stored without a leading separator; every other
    /// cookie is forced to a leading `.` so it covers subdomains. When the
    /// export omitted the domain entirely, the site's canonical cookie domain
    /// is used.
    pub fn normalized_domain(&self, canonical_domain: &str) -> String {
        let raw = self
            .domain
            .as_deref()
            .map(str::trim)
            .filter(|domain| !domain.is_empty())
            .unwrap_or(canonical_domain);

        if self.host_only {
            raw.trim_start_matches('.').to_string()
        } else if raw.starts_with('.') {
            raw.to_string()
        } else {
            format!(".{raw}")
        }
    }

    pub fn normalized_path(&self) -> String {
        self.path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .unwrap_or("/")
            .to_string()
    }
}

/// Login material for one publish/verify/track request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Credentials {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<Cookie>,
}

impl Credentials {
    /// Cookies that carry both a name and a value.
    pub fn usable_cookies(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.iter().filter(|cookie| cookie.is_injectable())
    }

    pub fn has_usable_cookies(&self) -> bool {
        self.usable_cookies().next().is_some()
    }

    pub fn has_password(&self) -> bool {
        self.password
            .as_deref()
            .map(|password| !password.is_empty())
            .unwrap_or(false)
    }

    /// Validate that a login is possible at all. Performed before any
    /// navigation so impossible requests fail fast without a browser trip.
    pub fn ensure_loginable(&self) -> Result<(), CredentialsError> {
        if self.email.trim().is_empty() {
            return Err(CredentialsError::MissingEmail);
        }
        if !self.has_password() && !self.has_usable_cookies() {
            return Err(CredentialsError::NotLoginable);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(name: &str, value: &str) -> Cookie {
        Cookie {
            name: name.to_string(),
            value: value.to_string(),
            ..Cookie::default()
        }
    }

    #[test]
    fn host_only_cookie_keeps_bare_domain() {
        let mut c = cookie("sid", "abc");
        c.domain = Some("example.com".to_string());
        c.host_only = true;
        assert_eq!(c.normalized_domain(".fallback.com"), "example.com");
    }

    #[test]
    fn shared_cookie_gets_leading_separator() {
        let mut c = cookie("sid", "abc");
        c.domain = Some("example.com".to_string());
        assert_eq!(c.normalized_domain(".fallback.com"), ".example.com");

        c.domain = Some(".example.com".to_string());
        assert_eq!(c.normalized_domain(".fallback.com"), ".example.com");
    }

    #[test]
    fn missing_domain_falls_back_to_canonical() {
        let c = cookie("sid", "abc");
        assert_eq!(c.normalized_domain(".medium.com"), ".medium.com");
    }

    #[test]
    fn cookies_without_name_or_value_are_not_injectable() {
        assert!(!cookie("", "abc").is_injectable());
        assert!(!cookie("sid", "  ").is_injectable());
        assert!(cookie("sid", "abc").is_injectable());
    }

    #[test]
    fn loginable_requires_password_or_usable_cookie() {
        let mut creds = Credentials {
            email: "user@example.com".to_string(),
            ..Credentials::default()
        };
        assert!(matches!(
            creds.ensure_loginable(),
            Err(CredentialsError::NotLoginable)
        ));

        creds.cookies = vec![cookie("", "")];
        assert!(creds.ensure_loginable().is_err());

        creds.password = Some("hunter2".to_string());
        assert!(creds.ensure_loginable().is_ok());

        creds.password = None;
        creds.cookies = vec![cookie("sid", "abc")];
        assert!(creds.ensure_loginable().is_ok());
    }

    #[test]
    fn deserializes_extension_export_shape() {
        let json = r#"{
            "name": "sid",
            "value": "abc",
            "domain": "medium.com",
            "hostOnly": false,
            "httpOnly": true,
            "secure": true,
            "expirationDate": 1924905600.5
        }"#;
        let c: Cookie = serde_json::from_str(json).expect("cookie parses");
        assert!(c.http_only);
        assert!(!c.host_only);
        assert_eq!(c.expiration, Some(1924905600.5));
    }
}
