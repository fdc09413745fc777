//! Execution planner - orders resources into dependency stages

use crate::error::GraphError;
use crate::resource::{BoxedResource, Resource};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// An execution plan with resources grouped into dependency stages
///
/// Every dependency of a resource in stage `n` lives in a stage `< n`, so the
/// resources of one stage are independent of each other.
pub struct ExecutionPlan {
    /// Resources grouped by dependency depth, declaration order within a stage
    pub stages: Vec<Vec<BoxedResource>>,
    /// Whether the plan was narrowed by a target filter
    pub targeted: bool,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            targeted: false,
        }
    }

    /// Build a plan from resources, inferring edges from their references
    ///
    /// Fails on duplicate addresses, references to undeclared resources and
    /// reference cycles.
    pub fn build(resources: Vec<BoxedResource>) -> Result<Self, GraphError> {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(resources.len());
        for (i, resource) in resources.iter().enumerate() {
            if index.insert(resource.id(), i).is_some() {
                return Err(GraphError::DuplicateAddress(resource.id()));
            }
        }

        let mut deps: Vec<Vec<usize>> = Vec::with_capacity(resources.len());
        for resource in &resources {
            let mut edges = Vec::new();
            for address in resource.depends_on() {
                let &target = index
                    .get(&address)
                    .ok_or_else(|| GraphError::DanglingReference {
                        from: resource.id(),
                        to: address.clone(),
                    })?;
                edges.push(target);
            }
            deps.push(edges);
        }

        let depth = stage_depths(&resources, &deps)?;
        let stage_count = depth.iter().max().map_or(0, |d| d + 1);

        let mut stages: Vec<Vec<BoxedResource>> = (0..stage_count).map(|_| Vec::new()).collect();
        for (resource, d) in resources.into_iter().zip(depth) {
            stages[d].push(resource);
        }

        log::debug!(
            "Planned {} resources in {} stages",
            stages.iter().map(Vec::len).sum::<usize>(),
            stages.len()
        );

        Ok(Self {
            stages,
            targeted: false,
        })
    }

    /// Filter plan to resources matching a target pattern plus everything they depend on
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        let Some(t) = target else {
            return self;
        };

        let (resource_type, name) = parse_target(t);
        let by_address: HashMap<String, Vec<String>> = self
            .resources()
            .map(|r| (r.id(), r.depends_on()))
            .collect();

        let mut keep: BTreeSet<String> = self
            .resources()
            .filter(|r| matches_filter(*r, resource_type.as_deref(), name.as_deref()))
            .map(|r| r.id())
            .collect();

        let mut pending: Vec<String> = keep.iter().cloned().collect();
        while let Some(address) = pending.pop() {
            for dep in by_address.get(&address).into_iter().flatten() {
                if keep.insert(dep.clone()) {
                    pending.push(dep.clone());
                }
            }
        }

        let stages = self
            .stages
            .into_iter()
            .map(|stage| {
                stage
                    .into_iter()
                    .filter(|r| keep.contains(&r.id()))
                    .collect::<Vec<_>>()
            })
            .collect();

        Self {
            stages,
            targeted: true,
        }
    }

    /// All resources in stage order
    pub fn resources(&self) -> impl Iterator<Item = &dyn Resource> {
        self.stages.iter().flatten().map(|r| &**r)
    }

    /// Find a resource by address
    pub fn get(&self, address: &str) -> Option<&dyn Resource> {
        self.resources().find(|r| r.id() == address)
    }

    /// Stage index of a resource
    pub fn stage_of(&self, address: &str) -> Option<usize> {
        self.stages
            .iter()
            .position(|stage| stage.iter().any(|r| r.id() == address))
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.total_resources() == 0
    }
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stages: Vec<Vec<String>> = self
            .stages
            .iter()
            .map(|stage| stage.iter().map(|r| r.id()).collect())
            .collect();
        f.debug_struct("ExecutionPlan")
            .field("stages", &stages)
            .field("targeted", &self.targeted)
            .finish()
    }
}

/// Longest-path depth of every node (Kahn's algorithm)
fn stage_depths(resources: &[BoxedResource], deps: &[Vec<usize>]) -> Result<Vec<usize>, GraphError> {
    let n = deps.len();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut remaining: Vec<usize> = vec![0; n];
    for (node, edges) in deps.iter().enumerate() {
        remaining[node] = edges.len();
        for &dep in edges {
            dependents[dep].push(node);
        }
    }

    let mut depth = vec![0usize; n];
    let mut ready: Vec<usize> = (0..n).filter(|&i| remaining[i] == 0).collect();
    let mut visited = 0;

    while let Some(node) = ready.pop() {
        visited += 1;
        for &next in &dependents[node] {
            depth[next] = depth[next].max(depth[node] + 1);
            remaining[next] -= 1;
            if remaining[next] == 0 {
                ready.push(next);
            }
        }
    }

    if visited < n {
        let members = (0..n)
            .filter(|&i| remaining[i] > 0)
            .map(|i| resources[i].id())
            .collect();
        return Err(GraphError::Cycle(members));
    }

    Ok(depth)
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((t, name)) if !t.is_empty() => (Some(t.to_string()), Some(name.to_string())),
        Some(_) => (None, Some(target.to_string())),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(resource: &dyn Resource, resource_type: Option<&str>, name: Option<&str>) -> bool {
    if let Some(rt) = resource_type {
        // Allow common aliases
        let actual = resource.resource_type();
        let matches_type = match rt {
            "network" => actual.contains("network") && !actual.contains("interface"),
            "vms" => actual.ends_with("virtual_machine"),
            "nics" => actual.ends_with("network_interface"),
            "security" => actual.contains("security_group"),
            _ => actual == rt,
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && !resource.id().contains(n)
    {
        return false;
    }

    true
}
