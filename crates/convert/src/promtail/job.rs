//! One promtail scrape job, staged as a unit.

use super::sources::GcplogMode;
use super::stages::{self, Stage};
use super::{GlobalContext, ScrapeConfig};
use crate::builder::{BlockOf, ComponentKind, Placeholder, Reference, SpecialValue, Targets};
use crate::common::relabel::{self, RuleArgs};
use crate::common::{reference_list, static_targets, TargetsExpr};
use crate::diag::Diagnostics;
use crate::duration::Duration;
use crate::label::label_for_parts;
use crate::state::{Staged, State};
use serde::Serialize;

#[derive(Serialize)]
struct DiscoveryRelabelArgs {
    targets: Targets,
    rule: Vec<BlockOf<RuleArgs>>,
}

#[derive(Serialize)]
struct FileMatchArgs {
    path_targets: TargetsExpr,
    sync_period: Option<Duration>,
}

#[derive(Serialize)]
struct FileSourceArgs {
    targets: Reference,
    forward_to: Vec<Reference>,
    legacy_positions_file: Option<String>,
}

#[derive(Serialize)]
struct LokiRelabelArgs {
    forward_to: Vec<Reference>,
    rule: Vec<BlockOf<RuleArgs>>,
}

#[derive(Serialize)]
struct ProcessArgs {
    forward_to: Vec<Reference>,
    stage: Vec<Stage>,
}

/// Stage every block of `job`. A job whose gcplog discriminator is invalid
/// produces nothing but the error.
pub(super) fn stage_job(
    state: &mut State,
    ctx: &GlobalContext<'_>,
    job: &ScrapeConfig,
) -> Result<Staged, Diagnostics> {
    let gcplog_mode = match job.gcplog.as_ref().map(|g| g.mode()).transpose() {
        Ok(mode) => mode,
        Err(message) => {
            let mut diags = Diagnostics::new();
            diags.error(format!("{} in job {:?}", message, job.job_name));
            return Err(diags);
        }
    };

    let label = state.label(&label_for_parts(&[ctx.prefix, job.job_name.as_str()]));
    let context = format!("job {:?}", job.job_name);
    let mut staged = Staged::new();

    let rules = relabel::to_rules(&job.relabel_configs, &context, &mut staged.diags);
    let stages = stages::convert(&job.pipeline_stages, &context, &mut staged.diags);

    let process = ComponentKind::new("loki.process");
    let receivers = if stages.is_empty() {
        ctx.write_receivers.clone()
    } else {
        vec![process.export(&label, "receiver")]
    };

    // Sources that take relabel rules read them from one discovery.relabel.
    let push_sources = job.gcplog.is_some()
        || job.gelf.is_some()
        || job.heroku_drain.is_some()
        || job.loki_push_api.is_some()
        || job.syslog.is_some();
    let has_files = !job.static_configs.is_empty();
    let discovery_relabel = ComponentKind::new("discovery.relabel");
    let relabels = !rules.is_empty() && (has_files || push_sources);
    if relabels {
        let args = DiscoveryRelabelArgs {
            targets: static_targets(&job.static_configs),
            rule: rules.clone(),
        };
        if !staged.push(&discovery_relabel, &label, &args) {
            return Err(staged.diags);
        }
    }

    if has_files {
        let path_targets = if relabels {
            TargetsExpr::Export(discovery_relabel.export(&label, "output"))
        } else {
            TargetsExpr::Static(static_targets(&job.static_configs))
        };
        let file_match = ComponentKind::new("local.file_match");
        let args = FileMatchArgs {
            path_targets,
            sync_period: ctx.target_sync_period,
        };
        staged.push(&file_match, &label, &args);
        let args = FileSourceArgs {
            targets: file_match.export(&label, "targets"),
            forward_to: receivers.clone(),
            legacy_positions_file: ctx.legacy_positions_file.map(str::to_owned),
        };
        staged.push(&ComponentKind::new("loki.source.file"), &label, &args);
    }

    let loki_relabel = ComponentKind::new("loki.relabel");
    let pull_relabels =
        !rules.is_empty() && (job.cloudflare.is_some() || job.windows_events.is_some());
    let rules_expr = discovery_relabel.export(&label, "rules").to_expr();
    let forward_expr = if pull_relabels {
        reference_list(&[loki_relabel.export(&label, "receiver")])
    } else {
        reference_list(&receivers)
    };
    let mut hook = |value: SpecialValue| match value {
        SpecialValue::Placeholder(Placeholder::RelabelRules) => Ok(rules_expr.clone()),
        SpecialValue::Placeholder(Placeholder::LogsReceivers) => Ok(forward_expr.clone()),
        other => Err(other),
    };
    let relabel_rules = relabels.then_some(Placeholder::RelabelRules);

    if let (Some(gcplog), Some(mode)) = (&job.gcplog, gcplog_mode) {
        if matches!(mode, GcplogMode::Push) {
            gcplog.server.validate_push(&context, &mut staged.diags);
        }
        let mut args = gcplog.to_args(mode, receivers.clone());
        args.relabel_rules = relabel_rules;
        staged.push_with(&ComponentKind::new("loki.source.gcplog"), &label, &args, &mut hook);
    }
    if let Some(gelf) = &job.gelf {
        let mut args = gelf.to_args(receivers.clone());
        args.relabel_rules = relabel_rules;
        staged.push_with(&ComponentKind::new("loki.source.gelf"), &label, &args, &mut hook);
    }
    if let Some(heroku) = &job.heroku_drain {
        heroku.server.validate_push(&context, &mut staged.diags);
        let mut args = heroku.to_args(receivers.clone());
        args.relabel_rules = relabel_rules;
        staged.push_with(&ComponentKind::new("loki.source.heroku"), &label, &args, &mut hook);
    }
    if let Some(api) = &job.loki_push_api {
        api.server.validate_push(&context, &mut staged.diags);
        let mut args = api.to_args(receivers.clone());
        args.relabel_rules = relabel_rules;
        staged.push_with(&ComponentKind::new("loki.source.api"), &label, &args, &mut hook);
    }
    if let Some(syslog) = &job.syslog {
        let mut args = syslog.to_args(receivers.clone());
        args.relabel_rules = relabel_rules;
        staged.push_with(&ComponentKind::new("loki.source.syslog"), &label, &args, &mut hook);
    }
    if let Some(cloudflare) = &job.cloudflare {
        let args = cloudflare.to_args();
        let kind = ComponentKind::new("loki.source.cloudflare");
        staged.push_with(&kind, &label, &args, &mut hook);
    }
    if let Some(windows) = &job.windows_events {
        let args = windows.to_args();
        let kind = ComponentKind::new("loki.source.windowsevent");
        staged.push_with(&kind, &label, &args, &mut hook);
    }

    if pull_relabels {
        let args = LokiRelabelArgs {
            forward_to: receivers,
            rule: rules,
        };
        staged.push(&loki_relabel, &label, &args);
    }

    if !stages.is_empty() {
        let args = ProcessArgs {
            forward_to: ctx.write_receivers.clone(),
            stage: stages,
        };
        staged.push(&process, &label, &args);
    }

    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::super::Config;
    use super::*;
    use telescope_syntax::write_file;

    fn convert(yaml: &str) -> (String, Diagnostics) {
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let mut state = State::new();
        let diags = super::super::append(&mut state, "", &config);
        (write_file(state.file()), diags)
    }

    const CLIENT: &str = "clients:\n  - url: http://loki/push\n";

    #[test]
    fn invalid_gcplog_mode_drops_only_that_job() {
        let (out, diags) = convert(&format!(
            "{}scrape_configs:\n{}{}",
            CLIENT,
            "  - job_name: pubsub\n    gcplog:\n      subscription_type: invalid-mode\n      project_id: p\n",
            "  - job_name: gelf\n    gelf:\n      listen_address: 0.0.0.0:12201\n",
        ));
        assert_eq!(
            diags.to_string(),
            "(Error) gcplog.subscription_type must be one of 'pull' or 'push', got 'invalid-mode' in job \"pubsub\"\n"
        );
        assert!(!out.contains("pubsub"));
        assert!(out.contains(
            "loki.source.gelf \"gelf\" {\n\tlisten_address = \"0.0.0.0:12201\"\n\tforward_to = [loki.write.default.receiver]\n}\n"
        ));
    }

    #[test]
    fn push_sources_share_discovery_relabel_rules() {
        let (out, diags) = convert(&format!(
            "{}scrape_configs:\n{}",
            CLIENT,
            concat!(
                "  - job_name: syslog\n    syslog:\n      listen_address: 0.0.0.0:1514\n",
                "    relabel_configs:\n      - source_labels: [__syslog_message_hostname]\n        target_label: host\n",
            ),
        ));
        assert!(diags.is_empty(), "{}", diags);
        assert!(out.starts_with("discovery.relabel \"syslog\" {\n\ttargets = []\n\trule {\n"));
        assert!(out.contains("\trelabel_rules = discovery.relabel.syslog.rules\n"));
        assert!(out.contains("\tlistener {\n\t\taddress = \"0.0.0.0:1514\"\n\t}\n"));
    }

    #[test]
    fn cloudflare_forwards_through_loki_relabel() {
        let (out, diags) = convert(&format!(
            "{}scrape_configs:\n{}",
            CLIENT,
            concat!(
                "  - job_name: cf\n    cloudflare:\n      api_token: p@ss\n      zone_id: z1\n",
                "    relabel_configs:\n      - action: labeldrop\n        regex: tmp_.*\n",
            ),
        ));
        assert!(diags.is_empty(), "{}", diags);
        assert!(out.contains("\tapi_token = \"p@ss\"\n"));
        assert!(out.contains("\tforward_to = [loki.relabel.cf.receiver]\n"));
        assert!(out.contains("loki.relabel \"cf\" {\n\tforward_to = [loki.write.default.receiver]\n"));
        assert!(!out.contains("discovery.relabel"));
    }

    #[test]
    fn cloudflare_without_relabeling_forwards_directly() {
        let (out, _) = convert(&format!(
            "{}scrape_configs:\n  - job_name: cf\n    cloudflare:\n      api_token: t\n",
            CLIENT
        ));
        assert!(out.contains("\tforward_to = [loki.write.default.receiver]\n"));
        assert!(!out.contains("loki.relabel"));
    }

    #[test]
    fn stages_route_through_process() {
        let (out, diags) = convert(&format!(
            "{}scrape_configs:\n{}",
            CLIENT,
            concat!(
                "  - job_name: app\n    static_configs:\n      - targets: [localhost]\n",
                "        labels: {__path__: /var/log/app.log}\n",
                "    pipeline_stages:\n      - cri: {}\n",
            ),
        ));
        assert!(diags.is_empty(), "{}", diags);
        assert!(out.contains("\tforward_to = [loki.process.app.receiver]\n"));
        assert!(out.contains(
            "loki.process \"app\" {\n\tforward_to = [loki.write.default.receiver]\n\tstage.cri {\n\t}\n}\n"
        ));
    }

    #[test]
    fn repeated_job_names_are_suffixed() {
        let (out, _) = convert(&format!(
            "{}scrape_configs:\n{}{}",
            CLIENT,
            "  - job_name: x\n    gelf: {}\n",
            "  - job_name: x\n    gelf: {}\n",
        ));
        assert!(out.contains("loki.source.gelf \"x\" {"));
        assert!(out.contains("loki.source.gelf \"x2\" {"));
    }
}
