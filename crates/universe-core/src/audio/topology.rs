//! Named node set plus explicit edge list describing how the graph is wired.

use fnv::FnvHashMap;

use crate::error::InitializationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeRole {
    Source,
    Effect,
    Sink,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub name: String,
    pub role: NodeRole,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Topology {
    nodes: Vec<NodeDescriptor>,
    edges: Vec<(usize, usize)>,
    index: FnvHashMap<String, usize>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed synthesis chain: every voice feeds
    /// `filter → reverb → delay → gain → destination`.
    pub fn synth_chain(voices: usize) -> Self {
        let mut t = Self::new();
        let chain = ["filter", "reverb", "delay", "gain"];
        for name in chain {
            t.add_node(name, NodeRole::Effect);
        }
        t.add_node("destination", NodeRole::Sink);
        for i in 0..voices {
            let name = format!("voice-{i}");
            t.add_node(&name, NodeRole::Source);
            t.connect(&name, "filter");
        }
        t.connect("filter", "reverb");
        t.connect("reverb", "delay");
        t.connect("delay", "gain");
        t.connect("gain", "destination");
        t
    }

    /// Add a node; re-adding an existing name returns the existing index.
    pub fn add_node(&mut self, name: &str, role: NodeRole) -> usize {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(NodeDescriptor {
            name: name.to_string(),
            role,
        });
        self.index.insert(name.to_string(), idx);
        idx
    }

    /// Add an edge between two named nodes. Returns false if either is unknown.
    pub fn connect(&mut self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&a), Some(&b)) => {
                if !self.edges.contains(&(a, b)) {
                    self.edges.push((a, b));
                }
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeDescriptor] {
        &self.nodes
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.edges
            .iter()
            .map(|&(a, b)| (self.nodes[a].name.as_str(), self.nodes[b].name.as_str()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Check the wiring invariants: exactly one sink, no cycles, and a path
    /// from every source to the sink.
    pub fn validate(&self) -> Result<(), InitializationError> {
        let invalid = |msg: String| Err(InitializationError::InvalidTopology(msg));

        let sinks: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| self.nodes[i].role == NodeRole::Sink)
            .collect();
        if sinks.len() != 1 {
            return invalid(format!("expected exactly one sink, found {}", sinks.len()));
        }
        let sink = sinks[0];
        if self.edges.iter().any(|&(from, _)| from == sink) {
            return invalid("sink has outgoing edges".into());
        }

        // Kahn's algorithm: every node must be removable for the graph to be acyclic
        let mut in_degree = vec![0usize; self.nodes.len()];
        for &(_, to) in &self.edges {
            in_degree[to] += 1;
        }
        let mut ready: Vec<usize> = (0..self.nodes.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut visited = 0;
        while let Some(n) = ready.pop() {
            visited += 1;
            for &(from, to) in &self.edges {
                if from == n {
                    in_degree[to] -= 1;
                    if in_degree[to] == 0 {
                        ready.push(to);
                    }
                }
            }
        }
        if visited != self.nodes.len() {
            return invalid("cycle detected".into());
        }

        // Walk backwards from the sink; every source must be reached
        let mut reaches_sink = vec![false; self.nodes.len()];
        let mut stack = vec![sink];
        reaches_sink[sink] = true;
        while let Some(n) = stack.pop() {
            for &(from, to) in &self.edges {
                if to == n && !reaches_sink[from] {
                    reaches_sink[from] = true;
                    stack.push(from);
                }
            }
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if node.role == NodeRole::Source && !reaches_sink[i] {
                return invalid(format!("source `{}` has no path to the sink", node.name));
            }
        }
        Ok(())
    }
}
