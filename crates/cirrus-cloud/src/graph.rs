//! Fixed dependency graph over resource kinds.
//!
//! Edges are "must exist before" relations, fixed per the resource
//! taxonomy, not per project. Deletion runs the graph in reverse: children
//! before parents, one resource at a time, with the declaration order of
//! [`ResourceKind::ALL`] as the deterministic tie-break.

use cirrus_core::ResourceKind;
use std::collections::HashSet;

pub struct DependencyGraph {
    /// (parent, child): `parent` must exist before `child`.
    edges: Vec<(ResourceKind, ResourceKind)>,
}

impl DependencyGraph {
    /// The fixed taxonomy used by blueprints.
    pub fn standard() -> Self {
        use ResourceKind::*;
        Self {
            edges: vec![
                (Vpc, Subnet),
                (Vpc, SecurityGroup),
                (Subnet, Instance),
                (SecurityGroup, Instance),
                (KeyPair, Instance),
                (InstanceProfile, Instance),
                (Role, InstanceProfile),
                (Subnet, Database),
                (SecurityGroup, Database),
                // Bucket has no ordering constraints.
            ],
        }
    }

    /// Kinds that must exist before `kind`.
    pub fn parents_of(&self, kind: ResourceKind) -> Vec<ResourceKind> {
        self.edges
            .iter()
            .filter(|(_, child)| *child == kind)
            .map(|(parent, _)| *parent)
            .collect()
    }

    /// Kinds that require `kind` to exist.
    pub fn children_of(&self, kind: ResourceKind) -> Vec<ResourceKind> {
        self.edges
            .iter()
            .filter(|(parent, _)| *parent == kind)
            .map(|(_, child)| *child)
            .collect()
    }

    /// Transitive parents of `kind`, restricted to `present`. These are the
    /// kinds whose deletion is blocked while `kind` still exists.
    pub fn ancestors_of(&self, kind: ResourceKind, present: &[ResourceKind]) -> Vec<ResourceKind> {
        let present_set: HashSet<ResourceKind> = present.iter().copied().collect();
        let mut found: HashSet<ResourceKind> = HashSet::new();
        let mut frontier = vec![kind];
        while let Some(current) = frontier.pop() {
            for parent in self.parents_of(current) {
                if found.insert(parent) {
                    frontier.push(parent);
                }
            }
        }
        // Deterministic output order.
        ResourceKind::ALL
            .iter()
            .copied()
            .filter(|k| found.contains(k) && present_set.contains(k))
            .collect()
    }

    /// Safe deletion order over the induced subgraph of `present`: children
    /// before parents, declaration-order tie-break.
    pub fn deletion_order(&self, present: &[ResourceKind]) -> Vec<ResourceKind> {
        let present_set: HashSet<ResourceKind> = present.iter().copied().collect();
        let mut order = Vec::with_capacity(present_set.len());
        let mut done: HashSet<ResourceKind> = HashSet::new();

        while done.len() < present_set.len() {
            let mut advanced = false;
            for kind in ResourceKind::ALL {
                if !present_set.contains(&kind) || done.contains(&kind) {
                    continue;
                }
                let blocked = self
                    .children_of(kind)
                    .into_iter()
                    .any(|child| present_set.contains(&child) && !done.contains(&child));
                if !blocked {
                    order.push(kind);
                    done.insert(kind);
                    advanced = true;
                }
            }
            if !advanced {
                // The fixed taxonomy is acyclic; this only fires if a future
                // edit introduces a cycle. Emit the remainder deterministically.
                for kind in ResourceKind::ALL {
                    if present_set.contains(&kind) && !done.contains(&kind) {
                        order.push(kind);
                        done.insert(kind);
                    }
                }
            }
        }
        order
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ResourceKind::*;

    #[test]
    fn test_children_deleted_before_parents() {
        let graph = DependencyGraph::standard();
        let order = graph.deletion_order(&ResourceKind::ALL);

        let position = |kind: ResourceKind| order.iter().position(|&k| k == kind).unwrap();
        for (parent, child) in [
            (Vpc, Subnet),
            (Vpc, SecurityGroup),
            (Subnet, Instance),
            (SecurityGroup, Instance),
            (Role, InstanceProfile),
            (InstanceProfile, Instance),
            (Subnet, Database),
        ] {
            assert!(
                position(child) < position(parent),
                "{} must be deleted before {}",
                child,
                parent
            );
        }
    }

    #[test]
    fn test_induced_subgraph() {
        let graph = DependencyGraph::standard();
        let order = graph.deletion_order(&[Vpc, SecurityGroup, Instance]);
        assert_eq!(order, vec![Instance, SecurityGroup, Vpc]);
    }

    #[test]
    fn test_order_is_deterministic() {
        let graph = DependencyGraph::standard();
        let a = graph.deletion_order(&ResourceKind::ALL);
        let b = graph.deletion_order(&ResourceKind::ALL);
        assert_eq!(a, b);
    }

    #[test]
    fn test_unconstrained_kinds_use_declaration_order() {
        let graph = DependencyGraph::standard();
        // Instance, Database and Bucket have no constraints between them.
        let order = graph.deletion_order(&[Bucket, Database, Instance]);
        assert_eq!(order, vec![Instance, Database, Bucket]);
    }

    #[test]
    fn test_ancestors_of_subnet() {
        let graph = DependencyGraph::standard();
        let ancestors = graph.ancestors_of(Subnet, &[Vpc, Subnet, Instance]);
        assert_eq!(ancestors, vec![Vpc]);
    }

    #[test]
    fn test_ancestors_transitive() {
        let graph = DependencyGraph::standard();
        let ancestors = graph.ancestors_of(Instance, &ResourceKind::ALL);
        // Everything the instance sits on, plus the role behind the profile.
        assert!(ancestors.contains(&Subnet));
        assert!(ancestors.contains(&SecurityGroup));
        assert!(ancestors.contains(&Vpc));
        assert!(ancestors.contains(&KeyPair));
        assert!(ancestors.contains(&InstanceProfile));
        assert!(ancestors.contains(&Role));
        assert!(!ancestors.contains(&Bucket));
    }
}
