// FairMine - core/bpmn.rs
//
// Minimal BPMN 2.0 reader and BPMN-to-Petri-net conversion, used for models
// produced by the external Split Miner tool.
//
// Elements are matched by local name so any namespace prefix is accepted.
// Conversion gives every sequence flow a place. Tasks merge multiple incoming
// flows exclusively and split outgoing flows in parallel. Exclusive and
// inclusive joins are treated as exclusive; inclusive splits enumerate every
// non-empty branch subset up to a size limit and fall back to exclusive above
// it.

use crate::core::petri::{AcceptingPetriNet, PetriNet, PlaceId, TransitionId};
use crate::util::constants;
use crate::util::error::ParseError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Start,
    End,
    /// Activity with its label.
    Task(String),
    Exclusive,
    Parallel,
    Inclusive,
    /// Intermediate events and other flow nodes without behaviour.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BpmnNode {
    pub id: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceFlow {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BpmnDiagram {
    pub nodes: Vec<BpmnNode>,
    pub flows: Vec<SequenceFlow>,
}

const TASK_ELEMENTS: &[&str] = &[
    "task",
    "userTask",
    "serviceTask",
    "manualTask",
    "scriptTask",
    "sendTask",
    "receiveTask",
    "businessRuleTask",
    "callActivity",
    "subProcess",
];

const PASSTHROUGH_ELEMENTS: &[&str] = &[
    "intermediateThrowEvent",
    "intermediateCatchEvent",
    "eventBasedGateway",
    "complexGateway",
];

/// Read and parse a BPMN file.
pub fn load_bpmn(path: &Path) -> Result<BpmnDiagram, ParseError> {
    if !path.is_file() {
        return Err(ParseError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let source_name = path.display().to_string();
    let xml = std::fs::read_to_string(path).map_err(|e| ParseError::Bpmn {
        source_name: source_name.clone(),
        reason: e.to_string(),
    })?;
    parse_bpmn(&xml, &source_name)
}

/// Parse BPMN XML text. `source_name` is only used in error messages.
pub fn parse_bpmn(xml: &str, source_name: &str) -> Result<BpmnDiagram, ParseError> {
    let fail = |reason: String| ParseError::Bpmn {
        source_name: source_name.to_string(),
        reason,
    };

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut diagram = BpmnDiagram::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let local = e.local_name();
                let name = std::str::from_utf8(local.as_ref())
                    .map_err(|err| fail(err.to_string()))?
                    .to_string();
                let attrs = attributes(&e).map_err(fail)?;
                let id = || {
                    attrs
                        .get("id")
                        .cloned()
                        .ok_or_else(|| fail(format!("<{name}> has no id")))
                };
                let kind = match name.as_str() {
                    "startEvent" => Some(NodeKind::Start),
                    "endEvent" => Some(NodeKind::End),
                    "exclusiveGateway" => Some(NodeKind::Exclusive),
                    "parallelGateway" => Some(NodeKind::Parallel),
                    "inclusiveGateway" => Some(NodeKind::Inclusive),
                    n if TASK_ELEMENTS.contains(&n) => {
                        let id = id()?;
                        let label = attrs
                            .get("name")
                            .filter(|s| !s.trim().is_empty())
                            .cloned()
                            .unwrap_or_else(|| id.clone());
                        Some(NodeKind::Task(label))
                    }
                    n if PASSTHROUGH_ELEMENTS.contains(&n) => Some(NodeKind::Passthrough),
                    "sequenceFlow" => {
                        let source = attrs.get("sourceRef").cloned();
                        let target = attrs.get("targetRef").cloned();
                        match (source, target) {
                            (Some(source), Some(target)) => {
                                diagram.flows.push(SequenceFlow { source, target })
                            }
                            _ => {
                                return Err(fail(
                                    "sequenceFlow without sourceRef/targetRef".to_string(),
                                ))
                            }
                        }
                        None
                    }
                    _ => None,
                };
                if let Some(kind) = kind {
                    diagram.nodes.push(BpmnNode { id: id()?, kind });
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(fail(format!(
                    "XML error at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }

    if !diagram.nodes.iter().any(|n| n.kind == NodeKind::Start) {
        return Err(fail("no startEvent".to_string()));
    }
    for flow in &diagram.flows {
        for end in [&flow.source, &flow.target] {
            if !diagram.nodes.iter().any(|n| &n.id == end) {
                return Err(fail(format!("sequenceFlow references unknown node '{end}'")));
            }
        }
    }

    tracing::debug!(
        source = source_name,
        nodes = diagram.nodes.len(),
        flows = diagram.flows.len(),
        "BPMN parsed"
    );
    Ok(diagram)
}

fn attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>, String> {
    let mut out = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        let key = std::str::from_utf8(attr.key.local_name().as_ref())
            .map_err(|err| err.to_string())?
            .to_string();
        let value = attr.unescape_value().map_err(|err| err.to_string())?;
        out.insert(key, value.into_owned());
    }
    Ok(out)
}

/// Convert a parsed diagram into an accepting Petri net with a single source
/// and sink place.
pub fn to_petri_net(diagram: &BpmnDiagram) -> AcceptingPetriNet {
    let mut net = PetriNet::new();
    let source = net.add_place("source");
    let sink = net.add_place("sink");
    let flow_place: Vec<PlaceId> = diagram
        .flows
        .iter()
        .map(|f| net.add_place(format!("{}->{}", f.source, f.target)))
        .collect();

    for node in &diagram.nodes {
        let ins: Vec<PlaceId> = diagram
            .flows
            .iter()
            .zip(&flow_place)
            .filter(|(f, _)| f.target == node.id)
            .map(|(_, &p)| p)
            .collect();
        let outs: Vec<PlaceId> = diagram
            .flows
            .iter()
            .zip(&flow_place)
            .filter(|(f, _)| f.source == node.id)
            .map(|(_, &p)| p)
            .collect();

        match &node.kind {
            NodeKind::Start => {
                let t = net.add_silent("start");
                net.add_input_arc(source, t);
                connect(&mut net, t, &[], &outs);
            }
            NodeKind::End => {
                for &p in &ins {
                    let t = net.add_silent("end");
                    connect(&mut net, t, &[p], &[sink]);
                }
            }
            NodeKind::Task(label) => {
                let t = net.add_transition(label.clone(), Some(label.clone()));
                if ins.len() > 1 {
                    let merged = net.add_place(format!("merge_{}", node.id));
                    for &p in &ins {
                        let s = net.add_silent("xor_join");
                        connect(&mut net, s, &[p], &[merged]);
                    }
                    connect(&mut net, t, &[merged], &outs);
                } else {
                    connect(&mut net, t, &ins, &outs);
                }
            }
            NodeKind::Parallel => {
                let t = net.add_silent("and");
                connect(&mut net, t, &ins, &outs);
            }
            NodeKind::Exclusive | NodeKind::Passthrough => {
                exclusive(&mut net, &ins, &outs);
            }
            NodeKind::Inclusive => {
                if outs.len() > 1 && outs.len() <= constants::BPMN_MAX_INCLUSIVE_BRANCHES {
                    for &p in &ins {
                        for mask in 1u32..(1 << outs.len()) {
                            let chosen: Vec<PlaceId> = outs
                                .iter()
                                .enumerate()
                                .filter(|(i, _)| mask & (1 << i) != 0)
                                .map(|(_, &q)| q)
                                .collect();
                            let t = net.add_silent("or_split");
                            connect(&mut net, t, &[p], &chosen);
                        }
                    }
                } else {
                    if outs.len() > 1 {
                        tracing::debug!(
                            gateway = %node.id,
                            branches = outs.len(),
                            "Inclusive gateway treated as exclusive"
                        );
                    }
                    exclusive(&mut net, &ins, &outs);
                }
            }
        }
    }

    AcceptingPetriNet::with_source_sink(net, source, sink)
}

fn connect(net: &mut PetriNet, t: TransitionId, ins: &[PlaceId], outs: &[PlaceId]) {
    for &p in ins {
        net.add_input_arc(p, t);
    }
    for &p in outs {
        net.add_output_arc(t, p);
    }
}

/// One silent transition per (incoming, outgoing) flow pair.
fn exclusive(net: &mut PetriNet, ins: &[PlaceId], outs: &[PlaceId]) {
    for &p in ins {
        for &q in outs {
            let t = net.add_silent("xor");
            connect(net, t, &[p], &[q]);
        }
    }
}
