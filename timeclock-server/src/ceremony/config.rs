//! Relying Party configuration
//!
//! Configures the WebAuthn library with Relying Party (RP) identity.

use url::Url;
use webauthn_rs::prelude::*;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum RelyingPartyError {
    #[error("Invalid origin URL: {0}")]
    InvalidOrigin(String),
    #[error("WebAuthn error: {0:?}")]
    Webauthn(WebauthnError),
}

/// Relying Party wrapper around the Webauthn instance
pub struct RelyingParty {
    webauthn: Webauthn,
}

impl RelyingParty {
    /// Create a new Relying Party
    ///
    /// # Arguments
    ///
    /// * `rp_id` - Relying Party ID (typically the domain name)
    /// * `rp_origin` - Relying Party origin URL
    /// * `rp_name` - Human-readable name for the Relying Party
    pub fn new(rp_id: &str, rp_origin: &Url, rp_name: &str) -> Result<Self, WebauthnError> {
        let builder = WebauthnBuilder::new(rp_id, rp_origin)?
            .rp_name(rp_name)
            .allow_subdomains(false);

        Ok(Self {
            webauthn: builder.build()?,
        })
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `WEBAUTHN_RP_ID` - Relying Party ID (default: "localhost")
    /// - `WEBAUTHN_RP_ORIGIN` - RP origin URL (default: "http://localhost:3000")
    /// - `WEBAUTHN_RP_NAME` - RP display name (default: "Timeclock")
    pub fn from_env() -> Result<Self, RelyingPartyError> {
        let rp_id = std::env::var("WEBAUTHN_RP_ID").unwrap_or_else(|_| "localhost".to_string());
        let rp_origin = std::env::var("WEBAUTHN_RP_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let rp_name =
            std::env::var("WEBAUTHN_RP_NAME").unwrap_or_else(|_| "Timeclock".to_string());

        let origin =
            Url::parse(&rp_origin).map_err(|e| RelyingPartyError::InvalidOrigin(format!("{}", e)))?;

        Self::new(&rp_id, &origin, &rp_name).map_err(RelyingPartyError::Webauthn)
    }

    /// Get a reference to the Webauthn instance
    pub fn webauthn(&self) -> &Webauthn {
        &self.webauthn
    }
}

impl std::fmt::Debug for RelyingParty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelyingParty")
            .field("webauthn", &"<Webauthn instance>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relying_party_creation() {
        let origin = Url::parse("http://localhost:3000").unwrap();
        let rp = RelyingParty::new("localhost", &origin, "Test").unwrap();
        assert!(rp.webauthn().get_allowed_origins().contains(&origin));
    }

    #[test]
    fn test_invalid_origin_rejected() {
        let err = match Url::parse("not a url") {
            Err(e) => RelyingPartyError::InvalidOrigin(format!("{}", e)),
            Ok(_) => panic!("expected parse failure"),
        };
        assert!(matches!(err, RelyingPartyError::InvalidOrigin(_)));
    }
}
