//! Topological Sorter: order rules by `executeAfter`/`executeBefore` then
//! priority, via Kahn's algorithm with a priority-ordered ready queue.

use std::collections::{HashMap, HashSet};

use crate::model::Rule;

/// Order `rules` so that `executeAfter`/`executeBefore` constraints are
/// respected and, among rules with no remaining constraint, higher
/// `priority` comes first. Rules left over due to a cycle are appended at
/// the end in their original order — the sorter never deadlocks.
#[must_use]
pub fn sort(rules: Vec<Rule>) -> Vec<Rule> {
    let ids: Vec<String> = rules.iter().map(|r| r.id.clone()).collect();
    let index_of: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    // edges[i] = successors of node i (i must execute before them)
    let mut edges: Vec<HashSet<usize>> = vec![HashSet::new(); rules.len()];
    let mut in_degree: Vec<usize> = vec![0; rules.len()];

    let mut add_edge = |edges: &mut Vec<HashSet<usize>>, in_degree: &mut Vec<usize>, from: usize, to: usize| {
        if from == to {
            return;
        }
        if edges[from].insert(to) {
            in_degree[to] += 1;
        }
    };

    for (i, rule) in rules.iter().enumerate() {
        for after in &rule.execute_after {
            // `after` must execute before `rule`: edge after -> rule
            if let Some(&j) = index_of.get(after.as_str()) {
                add_edge(&mut edges, &mut in_degree, j, i);
            }
        }
        for before in &rule.execute_before {
            // `rule` must execute before `before`: edge rule -> before
            if let Some(&j) = index_of.get(before.as_str()) {
                add_edge(&mut edges, &mut in_degree, i, j);
            }
        }
    }

    let mut ready: Vec<usize> = (0..rules.len()).filter(|&i| in_degree[i] == 0).collect();
    sort_ready(&mut ready, &rules);

    let mut placed = vec![false; rules.len()];
    let mut order = Vec::with_capacity(rules.len());

    while let Some(next) = ready.pop() {
        placed[next] = true;
        order.push(next);
        for &succ in &edges[next] {
            in_degree[succ] -= 1;
            if in_degree[succ] == 0 {
                ready.push(succ);
            }
        }
        sort_ready(&mut ready, &rules);
    }

    // Remaining nodes are part of a cycle; append in original order.
    for i in 0..rules.len() {
        if !placed[i] {
            order.push(i);
        }
    }

    let mut rules = rules;
    let mut out = Vec::with_capacity(rules.len());
    // Take rules out in `order`, preserving each rule's data.
    let mut slots: Vec<Option<Rule>> = rules.drain(..).map(Some).collect();
    for i in order {
        if let Some(rule) = slots[i].take() {
            out.push(rule);
        }
    }
    out
}

/// Keep the ready queue sorted so the *last* element (popped via `.pop()`)
/// is the highest-priority ready node, with ties broken by original index
/// to keep the sort stable.
fn sort_ready(ready: &mut [usize], rules: &[Rule]) {
    ready.sort_by(|&a, &b| {
        rules[a]
            .priority
            .cmp(&rules[b].priority)
            .then(b.cmp(&a))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn rule(id: &str, priority: i32, after: Vec<&str>, before: Vec<&str>) -> Rule {
        Rule {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            priority,
            conditions: vec![],
            config: json!({}),
            resolution_strategy: Default::default(),
            enabled: true,
            dependencies: vec![],
            exclusions: vec![],
            chain: None,
            execute_after: after.into_iter().map(String::from).collect(),
            execute_before: before.into_iter().map(String::from).collect(),
            stop_propagation: false,
            composition: None,
            tags: vec![],
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn respects_execute_after() {
        let rules = vec![
            rule("x", 0, vec!["y"], vec![]),
            rule("y", 0, vec![], vec![]),
        ];
        let sorted = sort(rules);
        let pos_x = sorted.iter().position(|r| r.id == "x").unwrap();
        let pos_y = sorted.iter().position(|r| r.id == "y").unwrap();
        assert!(pos_x > pos_y);
    }

    #[test]
    fn priority_orders_unconstrained_rules() {
        let rules = vec![rule("low", 1, vec![], vec![]), rule("high", 10, vec![], vec![])];
        let sorted = sort(rules);
        assert_eq!(sorted[0].id, "high");
        assert_eq!(sorted[1].id, "low");
    }

    #[test]
    fn cycle_does_not_deadlock() {
        let rules = vec![
            rule("a", 0, vec!["b"], vec![]),
            rule("b", 0, vec!["a"], vec![]),
        ];
        let sorted = sort(rules);
        assert_eq!(sorted.len(), 2);
    }
}
