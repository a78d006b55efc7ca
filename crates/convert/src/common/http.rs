//! HTTP client settings: authentication, TLS and proxying.

use crate::builder::{BlockOf, Secret};
use crate::diag::Diagnostics;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<Secret>,
    pub password_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Authorization {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub credentials: Option<Secret>,
    pub credentials_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub ca_file: Option<String>,
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
    pub server_name: Option<String>,
    pub insecure_skip_verify: bool,
    pub min_version: Option<String>,
}

/// Client settings as the scrape, discovery and push configurations embed
/// them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    pub basic_auth: Option<BasicAuth>,
    pub authorization: Option<Authorization>,
    pub bearer_token: Option<Secret>,
    pub bearer_token_file: Option<String>,
    pub tls_config: Option<TlsConfig>,
    pub proxy_url: Option<String>,
    pub follow_redirects: Option<bool>,
    pub enable_http2: Option<bool>,
    pub oauth2: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicAuthArgs {
    pub username: String,
    pub password: Option<Secret>,
    pub password_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorizationArgs {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub credentials: Option<Secret>,
    pub credentials_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TlsArgs {
    pub ca_file: Option<String>,
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
    pub server_name: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub insecure_skip_verify: bool,
    pub min_version: Option<String>,
}

/// Client attributes and blocks, flattened into the owning component.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HttpClientArgs {
    pub bearer_token: Option<Secret>,
    pub bearer_token_file: Option<String>,
    pub proxy_url: Option<String>,
    pub follow_redirects: Option<bool>,
    pub enable_http2: Option<bool>,
    pub basic_auth: Option<BlockOf<BasicAuthArgs>>,
    pub authorization: Option<BlockOf<AuthorizationArgs>>,
    pub tls_config: Option<BlockOf<TlsArgs>>,
}

impl BasicAuth {
    pub fn to_args(&self) -> BlockOf<BasicAuthArgs> {
        BlockOf(BasicAuthArgs {
            username: self.username.clone(),
            password: self.password.clone().filter(|p| !p.is_empty()),
            password_file: self.password_file.clone(),
        })
    }
}

impl TlsConfig {
    pub fn to_args(&self) -> BlockOf<TlsArgs> {
        BlockOf(TlsArgs {
            ca_file: self.ca_file.clone(),
            cert_file: self.cert_file.clone(),
            key_file: self.key_file.clone(),
            server_name: self.server_name.clone(),
            insecure_skip_verify: self.insecure_skip_verify,
            min_version: self.min_version.clone(),
        })
    }
}

impl HttpClientConfig {
    pub fn to_args(&self) -> HttpClientArgs {
        HttpClientArgs {
            bearer_token: self.bearer_token.clone(),
            bearer_token_file: self.bearer_token_file.clone(),
            proxy_url: self.proxy_url.clone(),
            follow_redirects: self.follow_redirects,
            enable_http2: self.enable_http2,
            basic_auth: self.basic_auth.as_ref().map(BasicAuth::to_args),
            authorization: self.authorization.as_ref().map(|a| {
                BlockOf(AuthorizationArgs {
                    kind: a.kind.clone(),
                    credentials: a.credentials.clone(),
                    credentials_file: a.credentials_file.clone(),
                })
            }),
            tls_config: self.tls_config.as_ref().map(TlsConfig::to_args),
        }
    }

    /// Report settings with no counterpart in the converted client.
    pub fn validate(&self, context: &str, diags: &mut Diagnostics) {
        if self.oauth2.is_some() {
            diags.error(format!("{}: oauth2 is not supported", context));
        }
        if self.bearer_token.is_some() && self.authorization.is_some() {
            diags.error(format!(
                "{}: at most one of bearer_token and authorization may be set",
                context
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_and_validates() {
        let cfg: HttpClientConfig = serde_yaml::from_str(
            "basic_auth:\n  username: admin\n  password: p@ss\noauth2:\n  client_id: x\n",
        )
        .unwrap();
        let args = cfg.to_args();
        let auth = args.basic_auth.unwrap();
        assert_eq!(auth.0.password.unwrap().expose(), "p@ss");

        let mut diags = Diagnostics::new();
        cfg.validate("job \"node\"", &mut diags);
        assert_eq!(
            diags.to_string(),
            "(Error) job \"node\": oauth2 is not supported\n"
        );
    }
}
