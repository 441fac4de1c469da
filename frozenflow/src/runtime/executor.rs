//! Request-scoped graph execution.
//!
//! Graphs without control-flow ops run in a cached topological order.
//! Graphs with loops or conditionals are scheduled dynamically: a node is
//! pushed onto a work stack once its inputs are available in its frame
//! context, so untaken branches never run and loop bodies run once per
//! iteration.
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, trace, warn};

use super::arena::TensorArena;
use super::compile::{compile, ExecutionPlan};
use super::context::{ExecutionContext, FrameInfo};
use super::{ExecutorConfig, ResourceManager, TraceEvent};
use crate::error::ExecutorError;
use crate::graph::{parse_node_name, Graph, Node};
use crate::ops::{self, FrameEffect, OpOutcome};
use crate::registry::{self, CustomOpRegistry, CustomOpRegistryHandle, NodeValue, OpMapper};
use crate::tensor::TensorValue;

/// Tensors keyed by `node` or `node:index`.
pub type NamedTensorMap = HashMap<String, TensorValue>;

type Outputs = Vec<Option<TensorValue>>;

pub struct GraphExecutor {
    graph: Graph,
    registry: CustomOpRegistryHandle,
    config: ExecutorConfig,
    weights: HashMap<String, Vec<TensorValue>>,
    plans: Mutex<HashMap<String, Arc<ExecutionPlan>>>,
}

/// State owned by one execution request.
struct Request<'g> {
    graph: &'g Graph,
    plan: &'g ExecutionPlan,
    mappers: HashMap<usize, Arc<OpMapper>>,
    arena: TensorArena,
    resources: ResourceManager,
    events: Option<Vec<TraceEvent>>,
    timer: bool,
}

impl GraphExecutor {
    /// Executor resolving custom ops through the process-wide registry.
    pub fn new(graph: Graph) -> Self {
        Self::with_registry(graph, CustomOpRegistry::global())
    }

    pub fn with_registry(graph: Graph, registry: CustomOpRegistryHandle) -> Self {
        let weights = graph
            .weights()
            .map(|(name, value)| (name.to_string(), vec![value.clone()]))
            .collect();
        Self {
            graph,
            registry,
            config: ExecutorConfig::default(),
            weights,
            plans: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Add or replace the values of weight nodes.
    pub fn set_weights(&mut self, weights: HashMap<String, Vec<TensorValue>>) {
        self.weights.extend(weights);
        self.plans.lock().expect("plan cache lock poisoned").clear();
    }

    pub fn weights(&self) -> &HashMap<String, Vec<TensorValue>> {
        &self.weights
    }

    pub fn input_nodes(&self) -> Vec<&str> {
        self.graph.placeholders().map(|node| node.name.as_str()).collect()
    }

    pub fn output_nodes(&self) -> &[String] {
        self.graph.outputs()
    }

    /// Mapper `op` resolves to right now: custom registrations first, then
    /// the built-in table.
    pub fn resolve_op(&self, op: &str) -> Option<Arc<OpMapper>> {
        registry::resolve_op(&self.registry, op)
    }

    /// Run the graph. An empty `outputs` list requests the graph outputs.
    pub fn execute(&self, inputs: NamedTensorMap, outputs: &[&str]) -> Result<NamedTensorMap> {
        let (result, events) = self.run(inputs, outputs, self.config.trace)?;
        for event in &events {
            debug!("{}", event);
        }
        Ok(result)
    }

    /// Like `execute`, also returning one trace event per executed node.
    pub fn execute_traced(
        &self,
        inputs: NamedTensorMap,
        outputs: &[&str],
    ) -> Result<(NamedTensorMap, Vec<TraceEvent>)> {
        self.run(inputs, outputs, true)
    }

    fn run(
        &self,
        inputs: NamedTensorMap,
        outputs: &[&str],
        collect: bool,
    ) -> Result<(NamedTensorMap, Vec<TraceEvent>)> {
        let requested: Vec<String> = if outputs.is_empty() {
            self.graph.outputs().to_vec()
        } else {
            outputs.iter().map(|name| name.to_string()).collect()
        };
        let mut output_nodes = Vec::with_capacity(requested.len());
        for name in &requested {
            let idx = self
                .graph
                .node_index(parse_node_name(name).0)
                .ok_or_else(|| ExecutorError::MissingOutput { name: name.clone() })?;
            output_nodes.push(idx);
        }

        let feeds = self.group_feeds(inputs)?;
        let plan = self.plan(&feeds, &requested, &output_nodes)?;
        let mappers = self.resolve_plan(&plan)?;

        let mut kept: HashSet<String> = feeds.keys().cloned().collect();
        kept.extend(self.weights.keys().cloned());
        kept.extend(output_nodes.iter().map(|idx| self.graph.node_at(*idx).name.clone()));

        let mut request = Request {
            graph: &self.graph,
            plan: &*plan,
            mappers,
            arena: TensorArena::new(kept),
            resources: ResourceManager::new(),
            events: collect.then(Vec::new),
            timer: self.config.timer,
        };
        for (name, values) in &self.weights {
            if self.graph.node_index(name).is_some() {
                request
                    .arena
                    .insert(name, "", values.iter().cloned().map(Some).collect(), 0);
            }
        }
        for (name, values) in feeds {
            request.arena.insert(&name, "", values, 0);
        }

        if self.graph.has_control_flow() {
            debug!(
                "executing {} of {} nodes with control flow",
                plan.executed_count(),
                self.graph.len()
            );
            request.run_dynamic()?;
        } else {
            debug!("executing {} of {} nodes", plan.executed_count(), self.graph.len());
            request.run_static()?;
        }
        debug!("{} node outputs live after execution", request.arena.live_values());

        let root = [String::new()];
        let mut result = NamedTensorMap::with_capacity(requested.len());
        for name in requested {
            let (node, index) = parse_node_name(&name);
            let value = request
                .arena
                .lookup(node, index, &root)
                .cloned()
                .ok_or_else(|| ExecutorError::MissingOutput { name: name.clone() })?;
            result.insert(name, value);
        }
        Ok((result, request.events.unwrap_or_default()))
    }

    /// Group `node:index` feeds by node, dropping or rejecting names that do
    /// not belong to the graph.
    fn group_feeds(&self, inputs: NamedTensorMap) -> Result<HashMap<String, Outputs>> {
        let mut feeds: HashMap<String, Outputs> = HashMap::new();
        for (name, value) in inputs {
            let (node, index) = parse_node_name(&name);
            if self.graph.node_index(node).is_none() {
                if self.config.strict_inputs {
                    return Err(ExecutorError::UnknownInput { name }.into());
                }
                warn!("ignoring feed '{}': no such node", name);
                continue;
            }
            let slots = feeds.entry(node.to_string()).or_default();
            if slots.len() <= index {
                slots.resize(index + 1, None);
            }
            slots[index] = Some(value);
        }
        Ok(feeds)
    }

    fn plan(
        &self,
        feeds: &HashMap<String, Outputs>,
        requested: &[String],
        output_nodes: &[usize],
    ) -> Result<Arc<ExecutionPlan>> {
        let mut fed: Vec<&str> = feeds.keys().map(String::as_str).collect();
        fed.sort_unstable();
        let key = format!("{}|{}", fed.join(","), requested.join(","));
        let mut plans = self.plans.lock().expect("plan cache lock poisoned");
        if let Some(plan) = plans.get(&key) {
            return Ok(plan.clone());
        }
        let mut available: HashSet<String> = feeds.keys().cloned().collect();
        available.extend(self.weights.keys().cloned());
        let plan = Arc::new(compile(&self.graph, &available, output_nodes)?);
        plans.insert(key, plan.clone());
        Ok(plan)
    }

    /// Resolve every node the plan will run before any of them executes.
    fn resolve_plan(&self, plan: &ExecutionPlan) -> Result<HashMap<usize, Arc<OpMapper>>> {
        let mut mappers = HashMap::new();
        for (idx, run) in plan.executed.iter().enumerate() {
            if !run {
                continue;
            }
            let node = self.graph.node_at(idx);
            let mapper = self.resolve_op(&node.op).ok_or_else(|| ExecutorError::UnknownOp {
                op: node.op.clone(),
                node: node.name.clone(),
            })?;
            mappers.insert(idx, mapper);
        }
        Ok(mappers)
    }
}

impl Request<'_> {
    fn run_static(&mut self) -> Result<()> {
        let (graph, plan) = (self.graph, self.plan);
        let root = vec![String::new()];
        for &idx in &plan.order {
            let node = graph.node_at(idx);
            let inputs = node
                .inputs
                .iter()
                .map(|input| {
                    let (producer, index) = parse_node_name(input);
                    self.arena
                        .lookup(producer, index, &root)
                        .cloned()
                        .map(Some)
                        .ok_or_else(|| {
                            anyhow!("input {} of node {} is not available", input, node.name)
                        })
                })
                .collect::<Result<Outputs>>()?;
            let outcome = self.run_node(idx, inputs, "")?;
            self.arena
                .insert(&node.name, "", outcome.outputs, plan.consumers[idx]);
            let retired = self.retire_inputs(node, &root);
            self.finish_event(retired);
        }
        Ok(())
    }

    fn run_dynamic(&mut self) -> Result<()> {
        let (graph, plan) = (self.graph, self.plan);
        let mut context = ExecutionContext::new();
        let mut added: HashSet<(usize, String)> = HashSet::new();
        let mut stack: Vec<(usize, Vec<FrameInfo>)> = Vec::new();
        let mut loops: HashMap<FrameKey, LoopState> = HashMap::new();
        for &idx in &plan.seeds {
            if added.insert((idx, String::new())) {
                stack.push((idx, context.frames().to_vec()));
            }
        }

        while let Some((idx, frames)) = stack.pop() {
            context.set_frames(frames);
            let node = graph.node_at(idx);
            if plan.executed[idx] {
                let ids = context.context_ids().to_vec();
                let inputs: Outputs = node
                    .inputs
                    .iter()
                    .map(|input| {
                        let (producer, index) = parse_node_name(input);
                        self.arena.lookup(producer, index, &ids).cloned()
                    })
                    .collect();
                let outcome = self.run_node(idx, inputs, context.current_id())?;
                let mut reschedule: Vec<(usize, Vec<FrameInfo>)> = Vec::new();
                let store_id = match &outcome.effect {
                    Some(FrameEffect::Enter { frame, is_constant }) => {
                        let parent = context.current_id().to_string();
                        context.enter_frame(frame);
                        let state = loops.entry((parent.clone(), frame.clone())).or_default();
                        state.open(&context);
                        if *is_constant {
                            state.invariant_enters.push(idx);
                            reschedule.extend(
                                state.iterations.iter().map(|(_, frames)| (idx, frames.clone())),
                            );
                            parent
                        } else {
                            context.current_id().to_string()
                        }
                    }
                    Some(FrameEffect::Exit) => {
                        context
                            .exit_frame()
                            .with_context(|| format!("Exit node {} ran outside a frame", node.name))?;
                        context.current_id().to_string()
                    }
                    Some(FrameEffect::NextIteration) => {
                        let key = frame_key(&context);
                        context.next_iteration().with_context(|| {
                            format!("NextIteration node {} ran outside a frame", node.name)
                        })?;
                        if let Some(state) = key.and_then(|key| loops.get_mut(&key)) {
                            state.open(&context);
                            // Loop-invariant consumers have to run again in every iteration.
                            reschedule.extend(
                                state
                                    .invariant_enters
                                    .iter()
                                    .map(|enter| (*enter, context.frames().to_vec())),
                            );
                        }
                        context.current_id().to_string()
                    }
                    None => context.current_id().to_string(),
                };
                self.arena
                    .insert(&node.name, &store_id, outcome.outputs, plan.consumers[idx]);
                let retired = self.retire_inputs(node, &ids);
                self.finish_event(retired);
                for (enter, frames) in reschedule {
                    let iteration = ExecutionContext::from_frames(frames);
                    self.push_children(enter, &iteration, &mut added, &mut stack);
                }
            }
            self.push_children(idx, &context, &mut added, &mut stack);
        }
        Ok(())
    }

    fn push_children(
        &self,
        idx: usize,
        context: &ExecutionContext,
        added: &mut HashSet<(usize, String)>,
        stack: &mut Vec<(usize, Vec<FrameInfo>)>,
    ) {
        let ids = context.context_ids();
        for &child in self.graph.children(idx) {
            if !self.plan.executed[child] {
                continue;
            }
            let key = (child, context.current_id().to_string());
            if added.contains(&key) {
                continue;
            }
            let node = self.graph.node_at(child);
            let mut data = node.inputs.iter().map(|input| {
                let (producer, index) = parse_node_name(input);
                self.arena.lookup(producer, index, ids).is_some()
            });
            let ready = if node.op == "Merge" {
                data.any(|available| available)
            } else {
                data.all(|available| available)
                    && node
                        .control_inputs
                        .iter()
                        .all(|dep| self.arena.visible_context(dep, ids).is_some())
            };
            if ready {
                added.insert(key);
                stack.push((child, context.frames().to_vec()));
            }
        }
    }

    fn run_node(&mut self, idx: usize, inputs: Outputs, context_id: &str) -> Result<OpOutcome> {
        let graph = self.graph;
        let node = graph.node_at(idx);
        let mapper = self
            .mappers
            .get(&idx)
            .cloned()
            .ok_or_else(|| anyhow!("node {} was not resolved", node.name))?;
        let value = NodeValue::new(node, &mapper, inputs);
        let start = (self.timer || self.events.is_some()).then(Instant::now);
        let outcome = ops::execute(&value, &mut self.resources)
            .with_context(|| format!("failed to execute node '{}' ({})", node.name, node.op))?;
        let elapsed = start.map(|start| start.elapsed());
        if self.timer {
            trace!(node = %node.name, op = %node.op, context = context_id, elapsed = ?elapsed, "executed");
        } else {
            trace!(node = %node.name, op = %node.op, context = context_id, "executed");
        }
        if let Some(events) = self.events.as_mut() {
            let mut event = TraceEvent {
                node: node.name.clone(),
                op: node.op.clone(),
                category: mapper.category.to_string(),
                context: context_id.to_string(),
                outputs: outcome
                    .outputs
                    .iter()
                    .map(|slot| slot.as_ref().map(|value| value.shape().to_vec()))
                    .collect(),
                micros: String::new(),
                micros_parts: [0; 3],
                retired: Vec::new(),
                live_values: 0,
            };
            if let (true, Some(elapsed)) = (self.timer, elapsed) {
                event.set_timing(elapsed);
            }
            events.push(event);
        }
        Ok(outcome)
    }

    /// Count one read of every producer of `node`, dropping values whose
    /// consumers have all run. Values read from an enclosing frame stay alive
    /// for the remaining iterations.
    fn retire_inputs(&mut self, node: &Node, ids: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut retired = Vec::new();
        let Some(current) = ids.first().map(String::as_str) else {
            return retired;
        };
        for input in node.inputs.iter().chain(node.control_inputs.iter()) {
            let producer = parse_node_name(input).0;
            if !seen.insert(producer) {
                continue;
            }
            if self.arena.visible_context(producer, ids) != Some(current) {
                continue;
            }
            if self.arena.release(producer, current) {
                trace!(node = producer, context = current, "retired");
                retired.push(producer.to_string());
            }
        }
        retired
    }

    /// Complete the trace event of the node that just ran.
    fn finish_event(&mut self, retired: Vec<String>) {
        let live_values = self.arena.live_values();
        if let Some(event) = self.events.as_mut().and_then(|events| events.last_mut()) {
            event.retired = retired;
            event.live_values = live_values;
        }
    }
}

/// Parent context id and frame name identifying one loop instance.
type FrameKey = (String, String);

/// Iterations opened so far for one loop instance, plus its constant `Enter`
/// nodes.
#[derive(Debug, Default)]
struct LoopState {
    /// Context id and frame stack of every opened iteration.
    iterations: Vec<(String, Vec<FrameInfo>)>,
    invariant_enters: Vec<usize>,
}

impl LoopState {
    fn open(&mut self, context: &ExecutionContext) {
        let id = context.current_id();
        if !self.iterations.iter().any(|(known, _)| known == id) {
            self.iterations
                .push((id.to_string(), context.frames().to_vec()));
        }
    }
}

fn frame_key(context: &ExecutionContext) -> Option<FrameKey> {
    let frame = context.frames().last()?;
    let parent = context.context_ids().get(1)?;
    Some((parent.clone(), frame.frame_name.clone()))
}
