use url::Url;
use crate::model::token::RawToken;
use crate::utils::errors::{ErrorCode, RecoveryError};

pub const TOKEN_PARAM: &str = "token";

///
/// Builds the link that goes in the reset email. The raw token rides as a query parameter - never
/// the digest.
///
pub trait ResetUrlBuilder: Send + Sync {
    fn build_reset_url(&self, raw_token: &RawToken) -> Result<String, RecoveryError>;
}

///
/// Public URLs of the web app.
///
#[derive(Clone, Debug)]
pub struct AppUrls {
    base: Url,
    reset_path: String,
}

impl AppUrls {
    ///
    /// The base must be an absolute https URL. Plain http is tolerated for localhost only.
    ///
    pub fn new(base_url: &str, reset_path: &str) -> Result<Self, RecoveryError> {
        let base = Url::parse(base_url)?;

        let local = matches!(base.host_str(), Some("localhost") | Some("127.0.0.1"));
        match base.scheme() {
            "https" => {},
            "http" if local => {},
            scheme => return Err(ErrorCode::InvalidUrl
                .with_msg(&format!("The reset url base must use https, not {}", scheme))),
        }

        if base.cannot_be_a_base() {
            return Err(ErrorCode::InvalidUrl.with_msg(&format!("{} cannot be used as a base url", base_url)))
        }

        Ok(AppUrls { base, reset_path: reset_path.to_string() })
    }

    ///
    /// Resolve path against the base and append the query parameters, URL-encoded.
    ///
    pub fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<String, RecoveryError> {
        let mut url = self.base.join(path)?;

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter());
        }

        Ok(url.to_string())
    }
}

impl ResetUrlBuilder for AppUrls {
    fn build_reset_url(&self, raw_token: &RawToken) -> Result<String, RecoveryError> {
        self.build_url(&self.reset_path, &[(TOKEN_PARAM, raw_token.expose())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_url_embeds_the_raw_token() -> Result<(), RecoveryError> {
        let urls = AppUrls::new("https://tickets.example.com", "/auth/reset-password")?;
        let url = urls.build_reset_url(&RawToken::from("abc-DEF_123"))?;

        assert_eq!(url, "https://tickets.example.com/auth/reset-password?token=abc-DEF_123");
        Ok(())
    }

    #[test]
    fn test_build_url_encodes_params() -> Result<(), RecoveryError> {
        let urls = AppUrls::new("https://tickets.example.com/", "/auth/reset-password")?;
        let url = urls.build_url("/search", &[("q", "a b&c")])?;

        assert_eq!(url, "https://tickets.example.com/search?q=a+b%26c");
        Ok(())
    }

    #[test]
    fn test_plain_http_is_rejected_off_localhost() {
        let err = AppUrls::new("http://tickets.example.com", "/auth/reset-password").unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidUrl);

        assert!(AppUrls::new("http://localhost:8080", "/auth/reset-password").is_ok());
    }

    #[test]
    fn test_relative_base_is_rejected() {
        let err = AppUrls::new("tickets.example.com", "/auth/reset-password").unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidUrl);
    }
}
