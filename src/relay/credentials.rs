//! HTTP Basic credentials for the upstream login probe.
//!
//! Both components are form-urlencoded before they are joined, so a `:` or a
//! non-ASCII byte in either one cannot break the `user:pass` framing.

use axum::http::{header::InvalidHeaderValue, HeaderValue};
use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretString};
use url::form_urlencoded::byte_serialize;

/// A username/password pair that lives only for the duration of one login request.
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(username: String, password: SecretString) -> Self {
        Self { username, password }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Build the `Authorization: Basic <token>` header value, marked sensitive.
    ///
    /// # Errors
    /// Returns an error if the header value is not valid (cannot happen for base64 output).
    pub fn authorization(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let token = encode(&self.username, self.password.expose_secret());
        let mut value = HeaderValue::from_str(&format!("Basic {token}"))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// `base64(escape(username) + ":" + escape(password))`
#[must_use]
pub fn encode(username: &str, password: &str) -> String {
    let joined = format!("{}:{}", escape(username), escape(password));
    Base64::encode_string(joined.as_bytes())
}

/// Query-component escaping: form encoding, except that `~` stays literal and
/// `*` is percent-encoded, leaving only `A-Z a-z 0-9 - _ . ~` unescaped.
fn escape(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for chunk in byte_serialize(component.as_bytes()) {
        if chunk == "%7E" {
            out.push('~');
            continue;
        }
        // unreserved bytes arrive as whole runs
        for c in chunk.chars() {
            if c == '*' {
                out.push_str("%2A");
            } else {
                out.push(c);
            }
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn decode_pair(token: &str) -> (String, String) {
        let bytes = Base64::decode_vec(token).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let (user, pass) = text.split_once(':').unwrap();
        (user.to_string(), pass.to_string())
    }

    #[test]
    fn encode_plain_ascii() {
        assert_eq!(encode("alice", "hunter2"), "YWxpY2U6aHVudGVyMg==");
    }

    #[test]
    fn decoded_token_reconstructs_escaped_components() {
        let cases = [
            ("alice", "hunter2"),
            ("bob:admin", "pa:ss:word"),
            ("Zoë", "päss wörd"),
            ("user@example.com", "100%&=+/?#"),
            ("", ""),
            ("名前", "パスワード"),
        ];
        for (user, pass) in cases {
            let (decoded_user, decoded_pass) = decode_pair(&encode(user, pass));
            assert_eq!(decoded_user, escape(user));
            assert_eq!(decoded_pass, escape(pass));
        }
    }

    #[test]
    fn colons_are_escaped_before_joining() {
        let token = encode("a:b", "c:d");
        let text = String::from_utf8(Base64::decode_vec(&token).unwrap()).unwrap();
        assert_eq!(text, "a%3Ab:c%3Ad");
        assert_eq!(text.matches(':').count(), 1);
    }

    #[test]
    fn tilde_is_kept_and_star_is_escaped() {
        assert_eq!(escape("a*b~c"), "a%2Ab~c");
        assert_eq!(escape("%7E"), "%257E");
        assert_eq!(encode("a*b", "c~d"), "YSUyQWI6Y35k");
    }

    #[test]
    fn spaces_use_form_encoding() {
        assert_eq!(escape("two words"), "two+words");
    }

    #[test]
    fn authorization_header_is_sensitive() {
        let credentials = Credentials::new(
            "alice".to_string(),
            SecretString::from("hunter2".to_string()),
        );
        let value = credentials.authorization().unwrap();
        assert!(value.is_sensitive());
        assert_eq!(value.to_str().unwrap(), "Basic YWxpY2U6aHVudGVyMg==");
    }

    #[test]
    fn debug_hides_password() {
        let credentials = Credentials::new(
            "alice".to_string(),
            SecretString::from("hunter2".to_string()),
        );
        let debug = format!("{credentials:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }
}
