//! Provider authorization URLs
//!
//! Builds `{auth_base}?response_type=code&client_id=..&redirect_uri=..&state=..&scope=..`
//! and appends each provider's dialect parameters. Per-provider `extra_params`
//! from configuration override the dialect defaults.

use std::collections::{BTreeMap, HashMap};

use devassist_domain::{AuthConfig, Provider, ProviderConfig};
use url::Url;

use super::error::{AuthFlowError, AuthFlowResult};

/// Builds authorization URLs for configured providers
#[derive(Debug, Clone)]
pub struct AuthorizeUrlBuilder {
    origin: String,
    providers: HashMap<Provider, ProviderConfig>,
}

impl AuthorizeUrlBuilder {
    /// # Errors
    /// Returns `Configuration` if the app origin is invalid.
    pub fn new(config: &AuthConfig) -> AuthFlowResult<Self> {
        Ok(Self { origin: config.origin()?, providers: config.providers.clone() })
    }

    /// Redirect URI registered with the provider
    #[must_use]
    pub fn redirect_uri(&self, provider: Provider) -> String {
        format!("{}{}/{provider}", self.origin, devassist_domain::constants::CALLBACK_ROUTE_PREFIX)
    }

    /// Authorization URL carrying `state`
    ///
    /// # Errors
    /// Returns `UnknownProvider` if the provider has no client configured and
    /// `InvalidUrl` if its endpoint does not parse.
    pub fn build(&self, provider: Provider, state: &str) -> AuthFlowResult<Url> {
        let settings = self
            .providers
            .get(&provider)
            .ok_or_else(|| AuthFlowError::UnknownProvider(provider.to_string()))?;

        let mut url = Url::parse(&settings.authorize_url(provider))?;
        let scope = settings.scopes(provider).join(provider.scope_separator());

        let mut extras = dialect_params(provider);
        extras.extend(settings.extra_params.iter().map(|(k, v)| (k.clone(), v.clone())));

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &settings.client_id)
                .append_pair("redirect_uri", &self.redirect_uri(provider))
                .append_pair("state", state)
                .append_pair("scope", &scope);
            for (key, value) in &extras {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

fn dialect_params(provider: Provider) -> BTreeMap<String, String> {
    let pairs: &[(&str, &str)] = match provider {
        Provider::Google => &[("access_type", "online"), ("prompt", "select_account")],
        Provider::Yandex => &[("force_confirm", "yes")],
        Provider::Vk => &[("display", "popup"), ("v", "5.131")],
    };
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::authorize.
    use super::*;

    fn builder() -> AuthorizeUrlBuilder {
        let config = AuthConfig::new("https://app.devassist.pro")
            .with_provider(Provider::Google, ProviderConfig::new("google-id"))
            .with_provider(Provider::Vk, ProviderConfig::new("vk-id"));
        AuthorizeUrlBuilder::new(&config).unwrap()
    }

    fn query(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    /// Validates `AuthorizeUrlBuilder::build` behavior for the Google dialect
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the endpoint, client id, redirect URI and state.
    /// - Confirms scopes are space separated and dialect extras present.
    #[test]
    fn test_build_google() {
        let url = builder().build(Provider::Google, "abc123").unwrap();
        let params = query(&url);

        assert!(url.as_str().starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "google-id");
        assert_eq!(params["redirect_uri"], "https://app.devassist.pro/auth/callback/google");
        assert_eq!(params["state"], "abc123");
        assert_eq!(params["scope"], "openid email profile");
        assert_eq!(params["prompt"], "select_account");
        assert_eq!(params["access_type"], "online");
    }

    #[test]
    fn test_build_vk_uses_comma_scopes() {
        let url = builder().build(Provider::Vk, "s").unwrap();
        let params = query(&url);

        assert_eq!(params["scope"], "email");
        assert_eq!(params["display"], "popup");
        assert_eq!(params["v"], "5.131");
    }

    #[test]
    fn test_unconfigured_provider() {
        let err = builder().build(Provider::Yandex, "s").unwrap_err();
        assert_eq!(err, AuthFlowError::UnknownProvider("yandex".to_string()));
    }

    #[test]
    fn test_extra_params_override_dialect() {
        let mut settings = ProviderConfig::new("y-id");
        settings.extra_params.insert("force_confirm".to_string(), "no".to_string());
        let config = AuthConfig::new("http://localhost:3000").with_provider(Provider::Yandex, settings);

        let url = AuthorizeUrlBuilder::new(&config).unwrap().build(Provider::Yandex, "s").unwrap();
        let params = query(&url);

        assert_eq!(params["force_confirm"], "no");
        assert_eq!(params["scope"], "login:email login:info");
        assert_eq!(params["redirect_uri"], "http://localhost:3000/auth/callback/yandex");
    }
}
