//! Metrics instances: discovery, relabeling, scraping and remote write.

use super::{
    ConsulSdConfig, DnsSdConfig, FileSdConfig, GlobalConfig, HttpSdConfig, InstanceConfig,
    OvhcloudSdConfig, QueueConfig, RemoteWriteConfig, ScrapeConfig,
};
use crate::builder::{BlockOf, ComponentKind, Reference, Secret};
use crate::common::http::HttpClientArgs;
use crate::common::relabel::{self, RuleArgs};
use crate::common::{combine_targets, static_targets, TargetsExpr};
use crate::diag::Diagnostics;
use crate::duration::Duration;
use crate::label::label_for_parts;
use crate::state::{Staged, State};
use serde::Serialize;
use std::collections::BTreeMap;

pub(super) const REMOTE_WRITE: &str = "prometheus.remote_write";

#[derive(Serialize)]
struct StaticArgs {
    targets: crate::builder::Targets,
}

#[derive(Serialize)]
struct DnsArgs {
    names: Vec<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    port: Option<u16>,
    refresh_interval: Option<Duration>,
}

#[derive(Serialize)]
struct HttpSdArgs {
    url: String,
    refresh_interval: Option<Duration>,
    #[serde(flatten)]
    http: HttpClientArgs,
}

#[derive(Serialize)]
struct FileArgs {
    files: Vec<String>,
    refresh_interval: Option<Duration>,
}

#[derive(Serialize)]
struct ConsulArgs {
    server: Option<String>,
    token: Option<Secret>,
    datacenter: Option<String>,
    namespace: Option<String>,
    partition: Option<String>,
    tag_separator: Option<String>,
    scheme: Option<String>,
    username: Option<String>,
    password: Option<Secret>,
    allow_stale: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    services: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    node_meta: BTreeMap<String, String>,
    refresh_interval: Option<Duration>,
    #[serde(flatten)]
    http: HttpClientArgs,
}

#[derive(Serialize)]
struct OvhcloudArgs {
    endpoint: Option<String>,
    application_key: Option<String>,
    application_secret: Option<Secret>,
    consumer_key: Option<Secret>,
    refresh_interval: Option<Duration>,
    service: Option<String>,
}

#[derive(Serialize)]
pub(super) struct DiscoveryRelabelArgs {
    pub targets: TargetsExpr,
    pub rule: Vec<BlockOf<RuleArgs>>,
}

#[derive(Serialize)]
pub(super) struct MetricsRelabelArgs {
    pub forward_to: Vec<Reference>,
    pub rule: Vec<BlockOf<RuleArgs>>,
}

#[derive(Serialize)]
pub(super) struct ScrapeArgs {
    pub targets: TargetsExpr,
    pub forward_to: Vec<Reference>,
    pub job_name: String,
    pub honor_labels: Option<bool>,
    pub honor_timestamps: Option<bool>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Vec<String>>,
    pub scrape_interval: Option<Duration>,
    pub scrape_timeout: Option<Duration>,
    pub metrics_path: Option<String>,
    pub scheme: Option<String>,
    #[serde(flatten)]
    pub http: HttpClientArgs,
}

#[derive(Serialize)]
struct QueueArgs {
    capacity: Option<u64>,
    max_shards: Option<u64>,
    min_shards: Option<u64>,
    max_samples_per_send: Option<u64>,
    batch_send_deadline: Option<Duration>,
    min_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
}

#[derive(Serialize)]
struct EndpointArgs {
    name: Option<String>,
    url: String,
    remote_timeout: Option<Duration>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    send_exemplars: Option<bool>,
    send_native_histograms: Option<bool>,
    #[serde(flatten)]
    http: HttpClientArgs,
    queue_config: Option<BlockOf<QueueArgs>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    write_relabel_config: Vec<BlockOf<RuleArgs>>,
}

#[derive(Serialize)]
pub(super) struct RemoteWriteArgs {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    external_labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    endpoint: Vec<BlockOf<EndpointArgs>>,
}

/// Build the remote write arguments for `endpoints`. Invalid write relabel
/// rules are dropped with an error.
pub(super) fn remote_write_args(
    endpoints: &[RemoteWriteConfig],
    external_labels: &BTreeMap<String, String>,
    diags: &mut Diagnostics,
) -> RemoteWriteArgs {
    let endpoint = endpoints
        .iter()
        .map(|rw| {
            let context = format!("remote_write {:?}", rw.url);
            BlockOf(EndpointArgs {
                name: rw.name.clone(),
                url: rw.url.clone(),
                remote_timeout: rw.remote_timeout,
                headers: rw.headers.clone(),
                send_exemplars: rw.send_exemplars,
                send_native_histograms: rw.send_native_histograms,
                http: rw.http.to_args(),
                queue_config: rw.queue_config.as_ref().map(queue_args),
                write_relabel_config: relabel::to_rules(&rw.write_relabel_configs, &context, diags),
            })
        })
        .collect();
    RemoteWriteArgs {
        external_labels: external_labels.clone(),
        endpoint,
    }
}

fn queue_args(q: &QueueConfig) -> BlockOf<QueueArgs> {
    BlockOf(QueueArgs {
        capacity: q.capacity,
        max_shards: q.max_shards,
        min_shards: q.min_shards,
        max_samples_per_send: q.max_samples_per_send,
        batch_send_deadline: q.batch_send_deadline,
        min_backoff: q.min_backoff,
        max_backoff: q.max_backoff,
    })
}

/// Convert one metrics instance: every scrape job, then its remote write.
pub(super) fn append_instance(
    state: &mut State,
    global: &GlobalConfig,
    instance: &InstanceConfig,
    diags: &mut Diagnostics,
) {
    let endpoints = if instance.remote_write.is_empty() {
        &global.remote_write
    } else {
        &instance.remote_write
    };
    let remote_write = ComponentKind::new(REMOTE_WRITE);
    let write_label = (!endpoints.is_empty()).then(|| {
        let base = if instance.name.is_empty() {
            "default"
        } else {
            instance.name.as_str()
        };
        state.label_in(REMOTE_WRITE, base)
    });
    let forward_to: Vec<Reference> = write_label
        .iter()
        .map(|label| remote_write.export(label, "receiver"))
        .collect();

    for job in &instance.scrape_configs {
        let staged = stage_job(state, &instance.name, job, global, &forward_to);
        diags.add_all(state.merge(staged));
    }

    if let Some(label) = write_label {
        let args = remote_write_args(endpoints, &global.external_labels, diags);
        state.append_args(&remote_write, &label, &args, diags);
    }
}

fn stage_job(
    state: &mut State,
    prefix: &str,
    job: &ScrapeConfig,
    global: &GlobalConfig,
    forward_to: &[Reference],
) -> Result<Staged, Diagnostics> {
    let label = state.label(&label_for_parts(&[prefix, job.job_name.as_str()]));
    let context = format!("scrape job {:?}", job.job_name);
    let mut staged = Staged::new();
    job.http.validate(&context, &mut staged.diags);

    let mut exports = Vec::new();
    let targets = static_targets(&job.static_configs);
    if !targets.0.is_empty() {
        let kind = ComponentKind::new("discovery.static");
        let l = state.label_in("discovery.static", &label);
        if staged.push(&kind, &l, &StaticArgs { targets }) {
            exports.push(kind.export(&l, "targets"));
        }
    }
    for sd in &job.dns_sd_configs {
        discovery(state, &mut staged, &mut exports, "discovery.dns", &label, &dns_args(sd));
    }
    for sd in &job.http_sd_configs {
        sd.http.validate(&context, &mut staged.diags);
        discovery(state, &mut staged, &mut exports, "discovery.http", &label, &http_sd_args(sd));
    }
    for sd in &job.file_sd_configs {
        discovery(state, &mut staged, &mut exports, "discovery.file", &label, &file_args(sd));
    }
    for sd in &job.consul_sd_configs {
        sd.http.validate(&context, &mut staged.diags);
        discovery(state, &mut staged, &mut exports, "discovery.consul", &label, &consul_args(sd));
    }
    for sd in &job.ovhcloud_sd_configs {
        discovery(state, &mut staged, &mut exports, "discovery.ovhcloud", &label, &ovhcloud_args(sd));
    }

    let mut targets = combine_targets(exports);
    let rules = relabel::to_rules(&job.relabel_configs, &context, &mut staged.diags);
    if !rules.is_empty() {
        let kind = ComponentKind::new("discovery.relabel");
        if staged.push(&kind, &label, &DiscoveryRelabelArgs { targets, rule: rules }) {
            targets = TargetsExpr::Export(kind.export(&label, "output"));
        } else {
            return Err(staged.diags);
        }
    }

    let metric_rules =
        relabel::to_rules(&job.metric_relabel_configs, &context, &mut staged.diags);
    let relabel_kind = ComponentKind::new("prometheus.relabel");
    let scrape_forward = if metric_rules.is_empty() {
        forward_to.to_vec()
    } else {
        vec![relabel_kind.export(&label, "receiver")]
    };

    let args = ScrapeArgs {
        targets,
        forward_to: scrape_forward,
        job_name: job.job_name.clone(),
        honor_labels: job.honor_labels,
        honor_timestamps: job.honor_timestamps,
        params: job.params.clone(),
        scrape_interval: job.scrape_interval.or(global.scrape_interval),
        scrape_timeout: job.scrape_timeout.or(global.scrape_timeout),
        metrics_path: job.metrics_path.clone(),
        scheme: job.scheme.clone(),
        http: job.http.to_args(),
    };
    staged.push(&ComponentKind::new("prometheus.scrape"), &label, &args);

    if !metric_rules.is_empty() {
        let args = MetricsRelabelArgs {
            forward_to: forward_to.to_vec(),
            rule: metric_rules,
        };
        staged.push(&relabel_kind, &label, &args);
    }
    Ok(staged)
}

fn discovery<A: Serialize>(
    state: &mut State,
    staged: &mut Staged,
    exports: &mut Vec<Reference>,
    kind: &str,
    job_label: &str,
    args: &A,
) {
    let label = state.label_in(kind, job_label);
    let kind = ComponentKind::new(kind);
    if staged.push(&kind, &label, args) {
        exports.push(kind.export(&label, "targets"));
    }
}

fn dns_args(sd: &DnsSdConfig) -> DnsArgs {
    DnsArgs {
        names: sd.names.clone(),
        kind: sd.kind.clone(),
        port: sd.port,
        refresh_interval: sd.refresh_interval,
    }
}

fn http_sd_args(sd: &HttpSdConfig) -> HttpSdArgs {
    HttpSdArgs {
        url: sd.url.clone(),
        refresh_interval: sd.refresh_interval,
        http: sd.http.to_args(),
    }
}

fn file_args(sd: &FileSdConfig) -> FileArgs {
    FileArgs {
        files: sd.files.clone(),
        refresh_interval: sd.refresh_interval,
    }
}

fn consul_args(sd: &ConsulSdConfig) -> ConsulArgs {
    ConsulArgs {
        server: sd.server.clone(),
        token: sd.token.clone(),
        datacenter: sd.datacenter.clone(),
        namespace: sd.namespace.clone(),
        partition: sd.partition.clone(),
        tag_separator: sd.tag_separator.clone(),
        scheme: sd.scheme.clone(),
        username: sd.username.clone(),
        password: sd.password.clone(),
        allow_stale: sd.allow_stale,
        services: sd.services.clone(),
        tags: sd.tags.clone(),
        node_meta: sd.node_meta.clone(),
        refresh_interval: sd.refresh_interval,
        http: sd.http.to_args(),
    }
}

fn ovhcloud_args(sd: &OvhcloudSdConfig) -> OvhcloudArgs {
    OvhcloudArgs {
        endpoint: sd.endpoint.clone(),
        application_key: sd.application_key.clone(),
        application_secret: sd.application_secret.clone(),
        consumer_key: sd.consumer_key.clone(),
        refresh_interval: sd.refresh_interval,
        service: sd.service.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telescope_syntax::write_file;

    fn convert(yaml: &str) -> (String, Diagnostics) {
        let instance: InstanceConfig = serde_yaml::from_str(yaml).unwrap();
        let mut state = State::new();
        let mut diags = Diagnostics::new();
        append_instance(&mut state, &GlobalConfig::default(), &instance, &mut diags);
        (write_file(state.file()), diags)
    }

    #[test]
    fn single_static_job() {
        let (out, diags) = convert(
            "scrape_configs:\n  - job_name: node\n    static_configs:\n      - targets: [localhost:9100]\n",
        );
        assert!(diags.is_empty());
        assert_eq!(
            out,
            "discovery.static \"node\" {\n\ttargets = [{ __address__ = \"localhost:9100\" }]\n}\n\
             prometheus.scrape \"node\" {\n\ttargets = discovery.static.node.targets\n\tforward_to = []\n\tjob_name = \"node\"\n}\n"
        );
    }

    #[test]
    fn several_discoveries_are_concatenated() {
        let (out, _) = convert(
            "name: agent\nscrape_configs:\n  - job_name: mixed\n    static_configs:\n      - targets: [a:1]\n    dns_sd_configs:\n      - names: [srv.example]\n        port: 53\n",
        );
        assert!(out.contains("discovery.dns \"agent_mixed\""));
        assert!(out.contains(
            "targets = concat(discovery.static.agent_mixed.targets, discovery.dns.agent_mixed.targets)"
        ));
    }

    #[test]
    fn relabeling_chains_discovery_scrape_and_metric_relabel() {
        let (out, diags) = convert(concat!(
            "remote_write:\n  - url: http://mimir/push\n",
            "scrape_configs:\n  - job_name: app\n    static_configs:\n      - targets: [a:1]\n",
            "    relabel_configs:\n      - source_labels: [__address__]\n        target_label: instance\n",
            "    metric_relabel_configs:\n      - action: drop\n        regex: go_.*\n        source_labels: [__name__]\n",
        ));
        assert!(diags.is_empty(), "{}", diags);
        let order: Vec<_> = out
            .lines()
            .filter(|l| !l.starts_with('\t') && l.ends_with('{'))
            .collect();
        assert_eq!(
            order,
            [
                "discovery.static \"app\" {",
                "discovery.relabel \"app\" {",
                "prometheus.scrape \"app\" {",
                "prometheus.relabel \"app\" {",
                "prometheus.remote_write \"default\" {",
            ]
        );
        assert!(out.contains("targets = discovery.relabel.app.output"));
        assert!(out.contains("forward_to = [prometheus.relabel.app.receiver]"));
        assert!(out.contains("forward_to = [prometheus.remote_write.default.receiver]"));
    }

    #[test]
    fn ovhcloud_discovery_joins_the_job() {
        let (out, diags) = convert(concat!(
            "scrape_configs:\n  - job_name: ovh\n",
            "    static_configs:\n      - targets: [a:1]\n",
            "    ovhcloud_sd_configs:\n",
            "      - endpoint: ovh-eu\n        application_key: app\n",
            "        application_secret: s3cret\n        consumer_key: ck\n",
            "        service: vps\n        refresh_interval: 1m\n",
        ));
        assert!(diags.is_empty(), "{}", diags);
        assert!(out.contains(concat!(
            "discovery.ovhcloud \"ovh\" {\n",
            "\tendpoint = \"ovh-eu\"\n",
            "\tapplication_key = \"app\"\n",
            "\tapplication_secret = \"s3cret\"\n",
            "\tconsumer_key = \"ck\"\n",
            "\trefresh_interval = \"1m0s\"\n",
            "\tservice = \"vps\"\n",
            "}\n",
        )));
        assert!(out.contains(
            "targets = concat(discovery.static.ovh.targets, discovery.ovhcloud.ovh.targets)"
        ));
    }

    #[test]
    fn repeated_job_names_get_suffixes() {
        let (out, _) = convert(
            "scrape_configs:\n  - job_name: x\n    static_configs: [{targets: [a:1]}]\n  - job_name: x\n    static_configs: [{targets: [b:1]}]\n",
        );
        assert!(out.contains("prometheus.scrape \"x\" {"));
        assert!(out.contains("prometheus.scrape \"x2\" {"));
        assert!(out.contains("targets = discovery.static.x2.targets"));
    }

    #[test]
    fn global_intervals_apply_when_unset() {
        let instance: InstanceConfig = serde_yaml::from_str(
            "scrape_configs:\n  - job_name: a\n    scrape_timeout: 5s\n",
        )
        .unwrap();
        let global = GlobalConfig {
            scrape_interval: Some(Duration::from_secs(60)),
            scrape_timeout: Some(Duration::from_secs(10)),
            ..GlobalConfig::default()
        };
        let mut state = State::new();
        let mut diags = Diagnostics::new();
        append_instance(&mut state, &global, &instance, &mut diags);
        let out = write_file(state.file());
        assert!(out.contains("scrape_interval = \"1m0s\""));
        assert!(out.contains("scrape_timeout = \"5s\""));
        assert!(out.contains("targets = []"));
    }
}
