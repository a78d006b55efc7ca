//! Listener settings: the agent's own `server` section and the embedded
//! servers of push-based log sources.

use crate::builder::BlockOf;
use crate::diag::Diagnostics;
use crate::duration::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub http_listen_address: Option<String>,
    pub http_listen_port: Option<u16>,
    pub grpc_listen_address: Option<String>,
    pub grpc_listen_port: Option<u16>,
    pub http_tls_config: Option<serde_yaml::Value>,
    pub grpc_tls_config: Option<serde_yaml::Value>,
    pub http_server_read_timeout: Option<Duration>,
    pub http_server_write_timeout: Option<Duration>,
    pub http_server_idle_timeout: Option<Duration>,
    pub grpc_server_max_recv_msg_size: Option<u64>,
    pub grpc_server_max_send_msg_size: Option<u64>,
    pub grpc_server_max_concurrent_streams: Option<u64>,
    pub graceful_shutdown_timeout: Option<Duration>,
    pub register_instrumentation: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoggingArgs {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl ServerConfig {
    /// The `logging` block arguments, or `None` when both settings are at
    /// their defaults.
    pub fn logging(&self) -> Option<LoggingArgs> {
        let level = self
            .log_level
            .as_deref()
            .map(str::to_lowercase)
            .filter(|l| l != "info");
        let format = self.log_format.clone().filter(|f| f != "logfmt");
        if level.is_none() && format.is_none() {
            return None;
        }
        Some(LoggingArgs { level, format })
    }

    /// Settings of the agent's own server that move to command-line flags.
    pub fn validate_agent(&self, diags: &mut Diagnostics) {
        let flagged = [
            ("http_listen_address", self.http_listen_address.is_some()),
            ("http_listen_port", self.http_listen_port.is_some()),
            ("grpc_listen_address", self.grpc_listen_address.is_some()),
            ("grpc_listen_port", self.grpc_listen_port.is_some()),
            ("http_tls_config", self.http_tls_config.is_some()),
            ("grpc_tls_config", self.grpc_tls_config.is_some()),
        ];
        for (key, set) in flagged {
            if set {
                diags.warning(format!(
                    "server.{} is not converted; set the equivalent command-line flag instead",
                    key
                ));
            }
        }
    }

    pub fn validate_push(&self, context: &str, diags: &mut Diagnostics) {
        if self.register_instrumentation == Some(true) {
            diags.warning(format!(
                "{}: server.register_instrumentation is not supported and was ignored",
                context
            ));
        }
    }

    /// The `http` and `grpc` blocks of a push-based source.
    pub fn to_args(&self) -> ServerArgs {
        ServerArgs {
            http: Some(BlockOf(HttpServerArgs {
                listen_address: self.http_listen_address.clone(),
                listen_port: self.http_listen_port,
                server_read_timeout: self.http_server_read_timeout,
                server_write_timeout: self.http_server_write_timeout,
                server_idle_timeout: self.http_server_idle_timeout,
            }))
            .filter(|b| !b.0.is_empty()),
            grpc: Some(BlockOf(GrpcServerArgs {
                listen_address: self.grpc_listen_address.clone(),
                listen_port: self.grpc_listen_port,
                server_max_recv_msg_size: self.grpc_server_max_recv_msg_size,
                server_max_send_msg_size: self.grpc_server_max_send_msg_size,
                server_max_concurrent_streams: self.grpc_server_max_concurrent_streams,
            }))
            .filter(|b| !b.0.is_empty()),
            graceful_shutdown_timeout: self.graceful_shutdown_timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpServerArgs {
    pub listen_address: Option<String>,
    pub listen_port: Option<u16>,
    pub server_read_timeout: Option<Duration>,
    pub server_write_timeout: Option<Duration>,
    pub server_idle_timeout: Option<Duration>,
}

impl HttpServerArgs {
    fn is_empty(&self) -> bool {
        self.listen_address.is_none()
            && self.listen_port.is_none()
            && self.server_read_timeout.is_none()
            && self.server_write_timeout.is_none()
            && self.server_idle_timeout.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrpcServerArgs {
    pub listen_address: Option<String>,
    pub listen_port: Option<u16>,
    pub server_max_recv_msg_size: Option<u64>,
    pub server_max_send_msg_size: Option<u64>,
    pub server_max_concurrent_streams: Option<u64>,
}

impl GrpcServerArgs {
    fn is_empty(&self) -> bool {
        self.listen_address.is_none()
            && self.listen_port.is_none()
            && self.server_max_recv_msg_size.is_none()
            && self.server_max_send_msg_size.is_none()
            && self.server_max_concurrent_streams.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerArgs {
    pub http: Option<BlockOf<HttpServerArgs>>,
    pub grpc: Option<BlockOf<GrpcServerArgs>>,
    pub graceful_shutdown_timeout: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_only_when_not_default() {
        let cfg = ServerConfig {
            log_level: Some("INFO".into()),
            ..ServerConfig::default()
        };
        assert_eq!(cfg.logging(), None);

        let cfg = ServerConfig {
            log_level: Some("debug".into()),
            log_format: Some("logfmt".into()),
            ..ServerConfig::default()
        };
        assert_eq!(
            cfg.logging(),
            Some(LoggingArgs {
                level: Some("debug".into()),
                format: None,
            })
        );
    }

    #[test]
    fn agent_listeners_warn() {
        let cfg: ServerConfig =
            serde_yaml::from_str("http_listen_port: 12345\nlog_level: debug\n").unwrap();
        let mut diags = Diagnostics::new();
        cfg.validate_agent(&mut diags);
        assert_eq!(diags.len(), 1);
        assert!(diags.to_string().contains("server.http_listen_port"));
    }

    #[test]
    fn push_server_blocks_are_omitted_when_empty() {
        let cfg: ServerConfig = serde_yaml::from_str("http_listen_port: 8080\n").unwrap();
        let args = cfg.to_args();
        assert!(args.grpc.is_none());
        assert_eq!(args.http.unwrap().0.listen_port, Some(8080));
    }
}
