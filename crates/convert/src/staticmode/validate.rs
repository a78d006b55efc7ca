use super::Config;
use crate::diag::Diagnostics;

pub(super) fn validate(config: &Config) -> Diagnostics {
    let mut diags = Diagnostics::new();

    config.server.validate_agent(&mut diags);
    if config.metrics.wal_directory.is_some() {
        diags.warning(
            "metrics.wal_directory is not converted; set the storage path command-line flag instead",
        );
    }
    if config.traces.is_some() {
        diags.error("traces are not supported and were not converted");
    }
    if config.agent_management.is_some() {
        diags.error("agent_management is not supported and was not converted");
    }
    for name in config.integrations.other.keys() {
        diags.error(format!("unsupported integration '{}' was not converted", name));
    }
    for rw in &config.integrations.prometheus_remote_write {
        validate_remote_write(rw, &mut diags);
    }
    for rw in &config.metrics.global.remote_write {
        validate_remote_write(rw, &mut diags);
    }

    for instance in &config.metrics.configs {
        for rw in &instance.remote_write {
            validate_remote_write(rw, &mut diags);
        }
        for job in &instance.scrape_configs {
            for key in job.other.keys() {
                let message = format!(
                    "unsupported scrape config '{}' in job {:?} was not converted",
                    key, job.job_name
                );
                if key.ends_with("_sd_configs") {
                    diags.error(message);
                } else {
                    diags.warning(message);
                }
            }
        }
    }
    diags
}

fn validate_remote_write(rw: &super::RemoteWriteConfig, diags: &mut Diagnostics) {
    let context = format!("remote_write {:?}", rw.url);
    if rw.sigv4.is_some() {
        diags.warning(format!("{}: sigv4 is not supported and was ignored", context));
    }
    rw.http.validate(&context, diags);
}
