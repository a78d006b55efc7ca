use super::Config;
use crate::diag::Diagnostics;

pub(super) fn validate(config: &Config) -> Diagnostics {
    let mut diags = Diagnostics::new();

    if config.clients.is_empty() {
        diags.warning("no clients are configured; converted log sources forward nowhere");
    }
    if config.limits_config.is_some() {
        diags.warning("limits_config is not supported and was not converted");
    }
    if config.tracing.is_some() {
        diags.warning("tracing is not supported and was not converted");
    }
    if config.positions.ignore_invalid_yaml {
        diags.warning("positions.ignore_invalid_yaml is not supported and was ignored");
    }

    for (i, client) in config.clients.iter().enumerate() {
        client.http.validate(&format!("clients[{}]", i), &mut diags);
    }

    for job in &config.scrape_configs {
        for key in job.other.keys() {
            diags.error(format!(
                "unsupported scrape config '{}' in job {:?} was not converted",
                key, job.job_name
            ));
        }
    }
    diags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_unsupported_sections() {
        let config: Config = serde_yaml::from_str(concat!(
            "limits_config:\n  readline_rate: 10\n",
            "scrape_configs:\n  - job_name: k8s\n    kubernetes_sd_configs:\n      - role: pod\n",
            "    journal:\n      max_age: 12h\n",
        ))
        .unwrap();
        assert_eq!(
            validate(&config).to_string(),
            concat!(
                "(Warning) no clients are configured; converted log sources forward nowhere\n",
                "(Warning) limits_config is not supported and was not converted\n",
                "(Error) unsupported scrape config 'journal' in job \"k8s\" was not converted\n",
                "(Error) unsupported scrape config 'kubernetes_sd_configs' in job \"k8s\" was not converted\n",
            )
        );
    }

    #[test]
    fn quiet_for_supported_config() {
        let config: Config = serde_yaml::from_str(
            "clients:\n  - url: http://loki/push\nscrape_configs:\n  - job_name: a\n    gelf: {}\n",
        )
        .unwrap();
        assert!(validate(&config).is_empty());
    }
}
