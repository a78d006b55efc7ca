//! Walk `service.pipelines` into a pipeline graph and a conversion order.

use super::config::{pipeline_signal, Config};
use crate::diag::Diagnostics;
use crate::state::{InstanceClass, InstanceId, PipelineGraph};
use std::collections::HashSet;
use tracing::debug;

/// What the walk produced: the edges, and every referenced instance in
/// first-visit order.
#[derive(Debug, Default)]
pub(super) struct Plan {
    pub graph: PipelineGraph,
    pub order: Vec<InstanceId>,
}

impl Plan {
    fn visit(&mut self, seen: &mut HashSet<InstanceId>, id: &InstanceId) {
        if seen.insert(id.clone()) {
            self.order.push(id.clone());
        }
    }
}

pub(super) fn build(config: &Config, diags: &mut Diagnostics) -> Plan {
    let mut plan = Plan::default();
    let mut seen = HashSet::new();

    for (pipeline, stages) in &config.service.pipelines {
        let signal = match pipeline_signal(pipeline) {
            Ok(signal) => signal,
            Err(e) => {
                diags.error(format!("pipeline \"{}\": {}; pipeline was not converted", pipeline, e));
                continue;
            }
        };
        debug!(pipeline = %pipeline, %signal, "walking pipeline");

        let resolve = |class: InstanceClass, names: &[String], diags: &mut Diagnostics| {
            names
                .iter()
                .filter_map(|name| {
                    if config.components(class).contains_key(name) {
                        return Some(InstanceId::new(class, name.as_str()));
                    }
                    if !config.connectors.contains_key(name) {
                        diags.error(format!(
                            "pipeline \"{}\" references {} \"{}\" which is not declared",
                            pipeline, class, name
                        ));
                    }
                    None
                })
                .collect::<Vec<_>>()
        };
        let receivers = resolve(InstanceClass::Receiver, &stages.receivers, diags);
        let processors = resolve(InstanceClass::Processor, &stages.processors, diags);
        let exporters = resolve(InstanceClass::Exporter, &stages.exporters, diags);

        for id in receivers.iter().chain(&processors).chain(&exporters) {
            plan.visit(&mut seen, id);
        }

        let mut upstream: &[InstanceId] = &receivers;
        for processor in &processors {
            for from in upstream {
                plan.graph.add_edge(from, signal, processor);
            }
            upstream = std::slice::from_ref(processor);
        }
        for from in upstream {
            for to in &exporters {
                plan.graph.add_edge(from, signal, to);
            }
        }
    }

    for class in [
        InstanceClass::Receiver,
        InstanceClass::Processor,
        InstanceClass::Exporter,
    ] {
        for name in config.components(class).keys() {
            if !seen.contains(&InstanceId::new(class, name.as_str())) {
                diags.warning(format!(
                    "{} \"{}\" is not used in any pipeline and was not converted",
                    class, name
                ));
            }
        }
    }
    for name in config.extensions.keys() {
        diags.warning(format!(
            "extension \"{}\" is not supported and was not converted",
            name
        ));
    }
    for name in config.connectors.keys() {
        diags.warning(format!(
            "connector \"{}\" is not supported and was not converted",
            name
        ));
    }
    plan
}
