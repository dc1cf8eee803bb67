// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Graph
//!
//! Stack-level DAG derived from cross-stack imports. Construction checks,
//! before any engine call, that every import names an export that exists,
//! that no stack imports from one registered after it, and that there is no
//! cycle. The deploy order is a topological sort (Kahn's algorithm) with
//! ties broken by registration order; teardown runs the reverse.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

use crate::errors::{DefinitionError, DeployError, DeployResult};
use crate::stacks::DeploymentStacks;
use crate::template::{StackName, StackTemplate};

/// Validated, ordered set of stacks
#[derive(Debug, Clone)]
pub struct DeploymentGraph {
    /// Registration order
    stacks: Vec<StackTemplate>,
    /// Topological deploy order
    order: Vec<StackName>,
}

impl DeploymentGraph {
    /// Build a graph from templates in registration order
    pub fn new(templates: impl IntoIterator<Item = StackTemplate>) -> Result<Self, DefinitionError> {
        let stacks: Vec<StackTemplate> = templates.into_iter().collect();

        let mut position = BTreeMap::new();
        for (index, template) in stacks.iter().enumerate() {
            if position.insert(template.name.clone(), index).is_some() {
                return Err(DefinitionError::DuplicateStack(template.name.to_string()));
            }
            template.validate()?;
        }

        for template in &stacks {
            for import in template.imports() {
                let known = stacks
                    .iter()
                    .find(|s| s.name == import.stack)
                    .map(|s| s.exports.contains_key(&import.name))
                    .unwrap_or(false);
                if !known {
                    return Err(DefinitionError::UnknownExport {
                        stack: template.name.to_string(),
                        export: import.to_string(),
                    });
                }
            }
        }

        let order = topological_order(&stacks)?;

        for (index, template) in stacks.iter().enumerate() {
            for import in template.imports() {
                if position.get(&import.stack).map_or(true, |p| *p >= index) {
                    return Err(DefinitionError::ForwardReference {
                        stack: template.name.to_string(),
                        export: import.to_string(),
                    });
                }
            }
        }

        debug!(
            order = ?order.iter().map(StackName::as_str).collect::<Vec<_>>(),
            "Deployment graph validated"
        );
        Ok(Self { stacks, order })
    }

    /// Graph of every stack in a defined deployment
    pub fn from_stacks(stacks: &DeploymentStacks) -> Result<Self, DefinitionError> {
        Self::new(stacks.templates().into_iter().cloned())
    }

    /// Deploy order
    pub fn order(&self) -> &[StackName] {
        &self.order
    }

    /// Teardown order: the reverse of the deploy order
    pub fn teardown_order(&self) -> Vec<StackName> {
        self.order.iter().rev().cloned().collect()
    }

    pub fn template(&self, name: &StackName) -> Option<&StackTemplate> {
        self.stacks.iter().find(|s| &s.name == name)
    }

    /// Templates in deploy order
    pub fn templates(&self) -> impl Iterator<Item = &StackTemplate> {
        self.order.iter().filter_map(|name| self.template(name))
    }

    /// Stacks `name` imports from
    pub fn dependencies(&self, name: &StackName) -> BTreeSet<StackName> {
        self.template(name)
            .map(StackTemplate::dependencies)
            .unwrap_or_default()
    }

    /// Stacks importing from `name`, in deploy order
    pub fn dependents(&self, name: &StackName) -> Vec<StackName> {
        self.templates()
            .filter(|t| t.dependencies().contains(name))
            .map(|t| t.name.clone())
            .collect()
    }

    /// Swap in a new definition of a registered stack and re-check the graph
    pub fn replace(&mut self, template: StackTemplate) -> DeployResult<()> {
        let mut stacks = self.stacks.clone();
        match stacks.iter_mut().find(|s| s.name == template.name) {
            Some(slot) => *slot = template,
            None => return Err(DeployError::UnknownStack(template.name.to_string())),
        }
        *self = Self::new(stacks)?;
        Ok(())
    }
}

/// Kahn's algorithm over stack imports
fn topological_order(stacks: &[StackTemplate]) -> Result<Vec<StackName>, DefinitionError> {
    let mut in_degree: BTreeMap<&StackName, usize> = BTreeMap::new();
    let mut adjacency: BTreeMap<&StackName, Vec<&StackName>> = BTreeMap::new();

    for stack in stacks {
        in_degree.insert(&stack.name, 0);
        adjacency.insert(&stack.name, Vec::new());
    }

    let dependencies: Vec<BTreeSet<StackName>> = stacks.iter().map(|s| s.dependencies()).collect();
    for (stack, deps) in stacks.iter().zip(&dependencies) {
        for dep in deps {
            if let Some(neighbors) = adjacency.get_mut(dep) {
                neighbors.push(&stack.name);
                *in_degree.entry(&stack.name).or_insert(0) += 1;
            }
        }
    }

    // Seed in registration order so independent stacks keep their declared order
    let mut queue: VecDeque<&StackName> = stacks
        .iter()
        .map(|s| &s.name)
        .filter(|name| in_degree.get(name) == Some(&0))
        .collect();

    let mut result = Vec::with_capacity(stacks.len());
    while let Some(node) = queue.pop_front() {
        result.push(node.clone());
        for neighbor in adjacency.get(node).into_iter().flatten() {
            if let Some(count) = in_degree.get_mut(neighbor) {
                *count -= 1;
                if *count == 0 {
                    queue.push_back(*neighbor);
                }
            }
        }
    }

    if result.len() != stacks.len() {
        let cycle = in_degree
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(name, _)| name.to_string())
            .collect();
        return Err(DefinitionError::StackCycle(cycle));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeploymentConfig, StackProps, TrafficProps};
    use crate::stacks::define_all;
    use crate::template::{ExportRef, PropertyValue, ResourceDecl, ResourceKind};
    use pretty_assertions::assert_eq;

    fn stack(name: &str, imports: &[(&str, &str)]) -> StackTemplate {
        let mut template = StackTemplate::new(StackName::from(name), name);
        let mut decl = ResourceDecl::new("Group", ResourceKind::AccessGroup);
        for (index, (stack, export)) in imports.iter().enumerate() {
            decl = decl.with(
                format!("import_{}", index),
                PropertyValue::Import(ExportRef::new(StackName::from(*stack), *export)),
            );
        }
        let id = template.add(decl);
        template.export("Out", PropertyValue::reference(&id), "out");
        template
    }

    #[test]
    fn test_full_deployment_order() {
        let stacks = define_all(
            &DeploymentConfig::default(),
            &StackProps::default().with_traffic_router(Some(TrafficProps::default())),
        )
        .unwrap();
        let graph = DeploymentGraph::from_stacks(&stacks).unwrap();

        let order: Vec<&str> = graph.order().iter().map(StackName::as_str).collect();
        assert_eq!(
            order,
            vec![
                "demo-staging-network",
                "demo-staging-data",
                "demo-staging-compute",
                "demo-staging-traffic",
            ]
        );
        assert_eq!(
            graph.teardown_order().first().map(StackName::as_str),
            Some("demo-staging-traffic")
        );
        assert_eq!(
            graph.dependents(&StackName::from("demo-staging-data")),
            vec![StackName::from("demo-staging-compute")]
        );
        assert_eq!(
            graph.dependents(&StackName::from("demo-staging-network")).len(),
            2
        );
    }

    #[test]
    fn test_every_stack_imports_only_earlier_stacks() {
        let stacks = define_all(
            &DeploymentConfig::default(),
            &StackProps::default().with_traffic_router(Some(TrafficProps::default())),
        )
        .unwrap();
        let graph = DeploymentGraph::from_stacks(&stacks).unwrap();
        for (index, name) in graph.order().iter().enumerate() {
            for dep in graph.dependencies(name) {
                let dep_index = graph.order().iter().position(|n| *n == dep).unwrap();
                assert!(dep_index < index, "{} imports from later stack {}", name, dep);
            }
        }
    }

    #[test]
    fn test_unknown_export_rejected() {
        let err = DeploymentGraph::new(vec![stack("a", &[]), stack("b", &[("a", "Missing")])])
            .unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownExport { .. }));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let err = DeploymentGraph::new(vec![stack("b", &[("a", "Out")]), stack("a", &[])])
            .unwrap_err();
        assert!(matches!(err, DefinitionError::ForwardReference { stack, .. } if stack == "b"));
    }

    #[test]
    fn test_cycle_rejected() {
        let err = DeploymentGraph::new(vec![
            stack("a", &[("c", "Out")]),
            stack("b", &[("a", "Out")]),
            stack("c", &[("b", "Out")]),
        ])
        .unwrap_err();
        assert!(matches!(err, DefinitionError::StackCycle(names) if names.len() == 3));
    }

    #[test]
    fn test_duplicate_stack_rejected() {
        let err = DeploymentGraph::new(vec![stack("a", &[]), stack("a", &[])]).unwrap_err();
        assert_eq!(err, DefinitionError::DuplicateStack("a".to_string()));
    }
}
