//! Log sources other than tailed files.

use crate::builder::{BlockOf, Placeholder, Reference, Secret};
use crate::common::http::{TlsArgs, TlsConfig};
use crate::common::server::{ServerArgs, ServerConfig};
use crate::duration::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Google Cloud Pub/Sub, pulled or pushed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GcplogConfig {
    pub subscription_type: String,
    pub project_id: Option<String>,
    pub subscription: Option<String>,
    pub server: ServerConfig,
    pub push_timeout: Option<Duration>,
    pub labels: BTreeMap<String, String>,
    pub use_incoming_timestamp: bool,
    pub use_full_line: bool,
}

/// The two shapes a gcplog source takes.
pub(super) enum GcplogMode {
    Pull,
    Push,
}

impl GcplogConfig {
    /// Resolve `subscription_type`; the empty string means pull.
    pub(super) fn mode(&self) -> Result<GcplogMode, String> {
        match self.subscription_type.as_str() {
            "" | "pull" => Ok(GcplogMode::Pull),
            "push" => Ok(GcplogMode::Push),
            other => Err(format!(
                "gcplog.subscription_type must be one of 'pull' or 'push', got '{}'",
                other
            )),
        }
    }

    pub(super) fn to_args(&self, mode: GcplogMode, forward_to: Vec<Reference>) -> GcplogArgs {
        let (pull, push) = match mode {
            GcplogMode::Pull => (
                Some(BlockOf(GcplogPullArgs {
                    project_id: self.project_id.clone(),
                    subscription: self.subscription.clone(),
                    labels: self.labels.clone(),
                    use_incoming_timestamp: self.use_incoming_timestamp,
                    use_full_line: self.use_full_line,
                })),
                None,
            ),
            GcplogMode::Push => (
                None,
                Some(BlockOf(GcplogPushArgs {
                    server: self.server.to_args(),
                    push_timeout: self.push_timeout,
                    labels: self.labels.clone(),
                    use_incoming_timestamp: self.use_incoming_timestamp,
                    use_full_line: self.use_full_line,
                })),
            ),
        };
        GcplogArgs {
            pull,
            push,
            forward_to,
            relabel_rules: None,
        }
    }
}

#[derive(Serialize)]
pub(super) struct GcplogPullArgs {
    project_id: Option<String>,
    subscription: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    use_incoming_timestamp: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    use_full_line: bool,
}

#[derive(Serialize)]
pub(super) struct GcplogPushArgs {
    #[serde(flatten)]
    server: ServerArgs,
    push_timeout: Option<Duration>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    use_incoming_timestamp: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    use_full_line: bool,
}

#[derive(Serialize)]
pub(super) struct GcplogArgs {
    pull: Option<BlockOf<GcplogPullArgs>>,
    push: Option<BlockOf<GcplogPushArgs>>,
    forward_to: Vec<Reference>,
    pub relabel_rules: Option<Placeholder>,
}

/// GELF over UDP.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GelfConfig {
    pub listen_address: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub use_incoming_timestamp: bool,
}

#[derive(Serialize)]
pub(super) struct GelfArgs {
    listen_address: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    use_incoming_timestamp: bool,
    pub relabel_rules: Option<Placeholder>,
    forward_to: Vec<Reference>,
}

impl GelfConfig {
    pub(super) fn to_args(&self, forward_to: Vec<Reference>) -> GelfArgs {
        GelfArgs {
            listen_address: self.listen_address.clone(),
            use_incoming_timestamp: self.use_incoming_timestamp,
            relabel_rules: None,
            forward_to,
        }
    }
}

/// Heroku log drain.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HerokuDrainConfig {
    pub server: ServerConfig,
    pub labels: BTreeMap<String, String>,
    pub use_incoming_timestamp: bool,
}

/// Loki push API receiver.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PushApiConfig {
    pub server: ServerConfig,
    pub labels: BTreeMap<String, String>,
    pub use_incoming_timestamp: bool,
}

/// Arguments of the HTTP push receivers (`loki.source.heroku`,
/// `loki.source.api`).
#[derive(Serialize)]
pub(super) struct PushReceiverArgs {
    #[serde(flatten)]
    server: ServerArgs,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    use_incoming_timestamp: bool,
    forward_to: Vec<Reference>,
    pub relabel_rules: Option<Placeholder>,
}

impl HerokuDrainConfig {
    pub(super) fn to_args(&self, forward_to: Vec<Reference>) -> PushReceiverArgs {
        PushReceiverArgs {
            server: self.server.to_args(),
            labels: self.labels.clone(),
            use_incoming_timestamp: self.use_incoming_timestamp,
            forward_to,
            relabel_rules: None,
        }
    }
}

impl PushApiConfig {
    pub(super) fn to_args(&self, forward_to: Vec<Reference>) -> PushReceiverArgs {
        PushReceiverArgs {
            server: self.server.to_args(),
            labels: self.labels.clone(),
            use_incoming_timestamp: self.use_incoming_timestamp,
            forward_to,
            relabel_rules: None,
        }
    }
}

/// Syslog listener.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyslogConfig {
    pub listen_address: Option<String>,
    pub listen_protocol: Option<String>,
    pub idle_timeout: Option<Duration>,
    pub label_structured_data: bool,
    pub labels: BTreeMap<String, String>,
    pub use_incoming_timestamp: bool,
    pub use_rfc5424_message: bool,
    pub max_message_length: Option<u64>,
    pub tls_config: Option<TlsConfig>,
}

#[derive(Serialize)]
pub(super) struct SyslogListenerArgs {
    address: Option<String>,
    protocol: Option<String>,
    idle_timeout: Option<Duration>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    label_structured_data: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    use_incoming_timestamp: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    use_rfc5424_message: bool,
    max_message_length: Option<u64>,
    tls_config: Option<BlockOf<TlsArgs>>,
}

#[derive(Serialize)]
pub(super) struct SyslogArgs {
    listener: BlockOf<SyslogListenerArgs>,
    forward_to: Vec<Reference>,
    pub relabel_rules: Option<Placeholder>,
}

impl SyslogConfig {
    pub(super) fn to_args(&self, forward_to: Vec<Reference>) -> SyslogArgs {
        SyslogArgs {
            listener: BlockOf(SyslogListenerArgs {
                address: self.listen_address.clone(),
                protocol: self.listen_protocol.clone(),
                idle_timeout: self.idle_timeout,
                label_structured_data: self.label_structured_data,
                labels: self.labels.clone(),
                use_incoming_timestamp: self.use_incoming_timestamp,
                use_rfc5424_message: self.use_rfc5424_message,
                max_message_length: self.max_message_length,
                tls_config: self.tls_config.as_ref().map(TlsConfig::to_args),
            }),
            forward_to,
            relabel_rules: None,
        }
    }
}

/// Cloudflare logpull.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CloudflareConfig {
    pub api_token: Secret,
    pub zone_id: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub workers: Option<u32>,
    pub pull_range: Option<Duration>,
    pub fields_type: Option<String>,
}

#[derive(Serialize)]
pub(super) struct CloudflareArgs {
    api_token: Secret,
    zone_id: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
    workers: Option<u32>,
    pull_range: Option<Duration>,
    fields_type: Option<String>,
    forward_to: Placeholder,
}

impl CloudflareConfig {
    pub(super) fn to_args(&self) -> CloudflareArgs {
        CloudflareArgs {
            api_token: self.api_token.clone(),
            zone_id: self.zone_id.clone(),
            labels: self.labels.clone(),
            workers: self.workers,
            pull_range: self.pull_range,
            fields_type: self.fields_type.clone(),
            forward_to: Placeholder::LogsReceivers,
        }
    }
}

/// Windows event log.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowsEventsConfig {
    pub locale: Option<u32>,
    pub eventlog_name: Option<String>,
    pub xpath_query: Option<String>,
    pub bookmark_path: Option<String>,
    pub poll_interval: Option<Duration>,
    pub exclude_event_data: bool,
    pub exclude_user_data: bool,
    pub exclude_event_message: bool,
    pub use_incoming_timestamp: bool,
    pub labels: BTreeMap<String, String>,
}

#[derive(Serialize)]
pub(super) struct WindowsEventArgs {
    locale: Option<u32>,
    eventlog_name: Option<String>,
    xpath_query: Option<String>,
    legacy_bookmark_path: Option<String>,
    poll_interval: Option<Duration>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    exclude_event_data: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    exclude_user_data: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    exclude_event_message: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    use_incoming_timestamp: bool,
    forward_to: Placeholder,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
}

impl WindowsEventsConfig {
    pub(super) fn to_args(&self) -> WindowsEventArgs {
        WindowsEventArgs {
            locale: self.locale,
            eventlog_name: self.eventlog_name.clone(),
            xpath_query: self.xpath_query.clone(),
            legacy_bookmark_path: self.bookmark_path.clone(),
            poll_interval: self.poll_interval,
            exclude_event_data: self.exclude_event_data,
            exclude_user_data: self.exclude_user_data,
            exclude_event_message: self.exclude_event_message,
            use_incoming_timestamp: self.use_incoming_timestamp,
            forward_to: Placeholder::LogsReceivers,
            labels: self.labels.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gcplog_modes() {
        let mut cfg = GcplogConfig::default();
        assert!(matches!(cfg.mode(), Ok(GcplogMode::Pull)));
        cfg.subscription_type = "push".into();
        assert!(matches!(cfg.mode(), Ok(GcplogMode::Push)));
        cfg.subscription_type = "invalid-mode".into();
        assert_eq!(
            cfg.mode().err().as_deref(),
            Some("gcplog.subscription_type must be one of 'pull' or 'push', got 'invalid-mode'")
        );
    }

    #[test]
    fn windows_bookmark_becomes_legacy_path() {
        let cfg: WindowsEventsConfig = serde_yaml::from_str(
            "eventlog_name: Application\nbookmark_path: C:/bookmark.xml\nexclude_user_data: true\n",
        )
        .unwrap();
        let args = cfg.to_args();
        assert_eq!(args.legacy_bookmark_path.as_deref(), Some("C:/bookmark.xml"));
        assert!(args.exclude_user_data);
        assert_eq!(args.forward_to, Placeholder::LogsReceivers);
    }
}
