//! Voice platform client authentication.

use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};

use super::LinkError;
use crate::config::VoiceClientConfig;

/// Client credentials presented at the token endpoint.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone, Default)]
pub struct ClientCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Compare two strings without short-circuiting on the first difference.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl ClientCredentials {
    /// Check these credentials against the configured voice client.
    ///
    /// Returns the authenticated client id.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::InvalidClient` if either value is missing or wrong.
    pub fn authenticate(&self, voice: &VoiceClientConfig) -> Result<String, LinkError> {
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret) else {
            return Err(LinkError::InvalidClient);
        };

        let id_ok = constant_time_eq(client_id, &voice.client_id);
        let secret_ok = constant_time_eq(client_secret, voice.client_secret.expose_secret());
        if !(id_ok & secret_ok) {
            tracing::warn!("Voice client authentication failed");
            return Err(LinkError::InvalidClient);
        }

        Ok(client_id.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use url::Url;

    use super::*;

    fn voice() -> VoiceClientConfig {
        VoiceClientConfig {
            client_id: "v1".to_string(),
            client_secret: SecretString::from("voice-secret"),
            redirect_uris: vec![Url::parse("https://voice.example/cb").unwrap()],
        }
    }

    fn creds(id: Option<&str>, secret: Option<&str>) -> ClientCredentials {
        ClientCredentials {
            client_id: id.map(String::from),
            client_secret: secret.map(String::from),
        }
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn test_authenticate() {
        assert_eq!(
            creds(Some("v1"), Some("voice-secret"))
                .authenticate(&voice())
                .unwrap(),
            "v1"
        );

        for bad in [
            creds(Some("v1"), Some("wrong")),
            creds(Some("v2"), Some("voice-secret")),
            creds(None, Some("voice-secret")),
            creds(Some("v1"), None),
            ClientCredentials::default(),
        ] {
            assert!(matches!(
                bad.authenticate(&voice()),
                Err(LinkError::InvalidClient)
            ));
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug_output = format!("{:?}", creds(Some("v1"), Some("voice-secret")));
        assert!(debug_output.contains("v1"));
        assert!(!debug_output.contains("voice-secret"));
    }
}
