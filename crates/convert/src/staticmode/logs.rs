//! Embedded log configs, converted through the promtail front-end.

use crate::diag::Diagnostics;
use crate::label::label_for_parts;
use crate::promtail::{self, ClientConfig, PositionsConfig, ScrapeConfig, TargetConfig};
use crate::state::State;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogsConfig {
    pub positions_directory: Option<String>,
    pub global: LogsGlobal,
    pub configs: Vec<LogsInstance>,
}

/// Settings inherited by every log instance.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogsGlobal {
    pub clients: Vec<ClientConfig>,
}

/// One log instance: a promtail configuration without a server.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogsInstance {
    pub name: String,
    pub clients: Vec<ClientConfig>,
    pub positions: PositionsConfig,
    pub scrape_configs: Vec<ScrapeConfig>,
    pub target_config: TargetConfig,
    pub limits_config: Option<serde_yaml::Value>,
}

impl LogsInstance {
    /// The equivalent standalone configuration.
    fn to_promtail(&self, logs: &LogsConfig) -> promtail::Config {
        let clients = if self.clients.is_empty() {
            logs.global.clients.clone()
        } else {
            self.clients.clone()
        };
        let mut positions = self.positions.clone();
        if positions.filename.is_none() {
            positions.filename = logs
                .positions_directory
                .as_ref()
                .map(|dir| format!("{}/{}.yml", dir.trim_end_matches('/'), self.name));
        }
        promtail::Config {
            clients,
            positions,
            scrape_configs: self.scrape_configs.clone(),
            target_config: self.target_config.clone(),
            limits_config: self.limits_config.clone(),
            ..promtail::Config::default()
        }
    }
}

pub(super) fn append_logs(state: &mut State, logs: &LogsConfig, diags: &mut Diagnostics) {
    for instance in &logs.configs {
        let prefix = label_for_parts(&["logs", instance.name.as_str()]);
        let config = instance.to_promtail(logs);
        diags.add_all(promtail::append(state, &prefix, &config));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telescope_syntax::write_file;

    #[test]
    fn instances_inherit_global_clients_and_positions() {
        let logs: LogsConfig = serde_yaml::from_str(concat!(
            "positions_directory: /var/lib/agent/\n",
            "global:\n  clients:\n    - url: http://loki/push\n",
            "configs:\n  - name: default\n    scrape_configs:\n",
            "      - job_name: varlogs\n        static_configs:\n",
            "          - targets: [localhost]\n            labels: {__path__: /var/log/*.log}\n",
        ))
        .unwrap();
        let mut state = State::new();
        let mut diags = Diagnostics::new();
        append_logs(&mut state, &logs, &mut diags);
        assert!(diags.is_empty(), "{}", diags);
        let out = write_file(state.file());
        assert!(out.contains("loki.source.file \"logs_default_varlogs\" {"));
        assert!(out.contains("forward_to = [loki.write.logs_default.receiver]"));
        assert!(out.contains("legacy_positions_file = \"/var/lib/agent/default.yml\""));
        assert!(out.contains("loki.write \"logs_default\" {"));
    }
}
