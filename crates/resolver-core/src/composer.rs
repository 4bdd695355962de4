//! Rule Composer: template instantiation and composition
//! (extend/compose/mixin).
//!
//! Holds no state of its own — templates and the full rule set are always
//! passed in by the caller (the resolver), so composition is stateless and
//! trivially concurrent.

use std::collections::{HashMap, HashSet};

use serde_json::{json, Value as Json};

use crate::error::CompositionError;
use crate::merge;
use crate::model::{Composition, PartialRule, ResolutionStrategy, Rule};

/// Instantiate a complete rule from a registered template and overrides.
pub fn create_from_template(
    templates: &HashMap<String, PartialRule>,
    template_id: &str,
    overrides: &PartialRule,
) -> Result<Rule, CompositionError> {
    let id = overrides
        .id
        .clone()
        .ok_or(CompositionError::TemplateMissingId)?;
    let template = templates
        .get(template_id)
        .ok_or_else(|| CompositionError::TemplateNotFound(template_id.to_string()))?;

    let config = match (&template.config, &overrides.config) {
        (Some(t), Some(o)) => merge::merge(t, o),
        (Some(t), None) => t.clone(),
        (None, Some(o)) => o.clone(),
        (None, None) => merge::empty_object(),
    };

    let mut metadata = template.metadata.clone().unwrap_or_default();
    if let Some(ov_meta) = &overrides.metadata {
        metadata.extend(ov_meta.clone());
    }
    metadata.insert(
        "createdFromTemplate".to_string(),
        Json::String(template_id.to_string()),
    );

    Ok(Rule {
        id,
        name: overrides
            .name
            .clone()
            .or_else(|| template.name.clone())
            .unwrap_or_else(|| "Unnamed Rule".to_string()),
        description: overrides.description.clone().or_else(|| template.description.clone()),
        priority: overrides.priority.or(template.priority).unwrap_or(0),
        conditions: overrides
            .conditions
            .clone()
            .or_else(|| template.conditions.clone())
            .unwrap_or_default(),
        config,
        resolution_strategy: overrides
            .resolution_strategy
            .or(template.resolution_strategy)
            .unwrap_or(ResolutionStrategy::Merge),
        enabled: overrides.enabled.or(template.enabled).unwrap_or(true),
        dependencies: overrides
            .dependencies
            .clone()
            .or_else(|| template.dependencies.clone())
            .unwrap_or_default(),
        exclusions: overrides
            .exclusions
            .clone()
            .or_else(|| template.exclusions.clone())
            .unwrap_or_default(),
        chain: overrides.chain.clone().or_else(|| template.chain.clone()),
        execute_after: overrides
            .execute_after
            .clone()
            .or_else(|| template.execute_after.clone())
            .unwrap_or_default(),
        execute_before: overrides
            .execute_before
            .clone()
            .or_else(|| template.execute_before.clone())
            .unwrap_or_default(),
        stop_propagation: overrides
            .stop_propagation
            .or(template.stop_propagation)
            .unwrap_or(false),
        composition: overrides
            .composition
            .clone()
            .or_else(|| template.composition.clone()),
        tags: overrides
            .tags
            .clone()
            .or_else(|| template.tags.clone())
            .unwrap_or_default(),
        metadata,
    })
}

/// Produce a new rule extending `base`, overlaid by `overrides`. `base` is
/// never mutated.
#[must_use]
pub fn extend_rule(base: &Rule, overrides: &PartialRule) -> Rule {
    let id = overrides
        .id
        .clone()
        .unwrap_or_else(|| format!("{}-extended", base.id));

    let config = match &overrides.config {
        Some(o) => merge::merge(&base.config, o),
        None => base.config.clone(),
    };

    let mut metadata = base.metadata.clone();
    if let Some(ov_meta) = &overrides.metadata {
        metadata.extend(ov_meta.clone());
    }
    metadata.insert("extendedFrom".to_string(), Json::String(base.id.clone()));

    Rule {
        id,
        name: overrides.name.clone().unwrap_or_else(|| base.name.clone()),
        description: overrides
            .description
            .clone()
            .or_else(|| base.description.clone()),
        priority: overrides.priority.unwrap_or(base.priority),
        conditions: overrides
            .conditions
            .clone()
            .unwrap_or_else(|| base.conditions.clone()),
        config,
        resolution_strategy: overrides
            .resolution_strategy
            .unwrap_or(base.resolution_strategy),
        enabled: overrides.enabled.unwrap_or(base.enabled),
        dependencies: overrides
            .dependencies
            .clone()
            .unwrap_or_else(|| base.dependencies.clone()),
        exclusions: overrides
            .exclusions
            .clone()
            .unwrap_or_else(|| base.exclusions.clone()),
        chain: overrides.chain.clone().or_else(|| base.chain.clone()),
        execute_after: overrides
            .execute_after
            .clone()
            .unwrap_or_else(|| base.execute_after.clone()),
        execute_before: overrides
            .execute_before
            .clone()
            .unwrap_or_else(|| base.execute_before.clone()),
        stop_propagation: overrides.stop_propagation.unwrap_or(base.stop_propagation),
        composition: overrides
            .composition
            .clone()
            .or_else(|| base.composition.clone()),
        tags: overrides.tags.clone().unwrap_or_else(|| base.tags.clone()),
        metadata,
    }
}

fn dedup_union<'a>(lists: impl IntoIterator<Item = &'a Vec<String>>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for list in lists {
        for item in list {
            if seen.insert(item.clone()) {
                out.push(item.clone());
            }
        }
    }
    out
}

/// Fold several source rules into one composed rule.
pub fn compose_rules(
    sources: &[Rule],
    new_id: &str,
    strategy: ResolutionStrategy,
) -> Result<Rule, CompositionError> {
    if sources.is_empty() {
        return Err(CompositionError::EmptyComposition);
    }

    let name = format!(
        "Composed: {}",
        sources
            .iter()
            .map(|r| r.name.clone())
            .collect::<Vec<_>>()
            .join(" + ")
    );
    let description = format!(
        "Composed from: {}",
        sources
            .iter()
            .map(|r| r.id.clone())
            .collect::<Vec<_>>()
            .join(", ")
    );
    let priority = sources.iter().map(|r| r.priority).max().unwrap_or(0);
    let conditions = sources
        .iter()
        .flat_map(|r| r.conditions.clone())
        .collect::<Vec<_>>();

    let mut config = merge::empty_object();
    for source in sources {
        config = merge::apply_strategy(strategy, &config, &source.config);
    }

    let dependencies = dedup_union(sources.iter().map(|r| &r.dependencies));
    let exclusions = dedup_union(sources.iter().map(|r| &r.exclusions));
    let tags = dedup_union(sources.iter().map(|r| &r.tags));
    let enabled = sources.iter().all(|r| r.enabled);

    let mut metadata = HashMap::new();
    metadata.insert(
        "composedFrom".to_string(),
        Json::Array(sources.iter().map(|r| Json::String(r.id.clone())).collect()),
    );
    metadata.insert(
        "compositionStrategy".to_string(),
        Json::String(strategy_name(strategy).to_string()),
    );

    Ok(Rule {
        id: new_id.to_string(),
        name,
        description: Some(description),
        priority,
        conditions,
        config,
        resolution_strategy: strategy,
        enabled,
        dependencies,
        exclusions,
        chain: None,
        execute_after: vec![],
        execute_before: vec![],
        stop_propagation: false,
        composition: None,
        tags,
        metadata,
    })
}

fn strategy_name(strategy: ResolutionStrategy) -> &'static str {
    match strategy {
        ResolutionStrategy::Merge => "merge",
        ResolutionStrategy::Override => "override",
        ResolutionStrategy::Inherit => "inherit",
    }
}

/// Apply a mixin onto `target` in place: deep-merge config, append
/// conditions, union tags plus the `"mixed"` sentinel, and append to the
/// ordered `metadata.mixins` list.
pub fn apply_mixin(target: &mut Rule, mixin: &Rule) {
    target.config = merge::merge(&target.config, &mixin.config);
    target.conditions.extend(mixin.conditions.clone());

    for tag in &mixin.tags {
        if !target.tags.contains(tag) {
            target.tags.push(tag.clone());
        }
    }
    if !target.tags.iter().any(|t| t == "mixed") {
        target.tags.push("mixed".to_string());
    }

    let entry = target
        .metadata
        .entry("mixins".to_string())
        .or_insert_with(|| Json::Array(Vec::new()));
    if let Json::Array(arr) = entry {
        arr.push(Json::String(mixin.id.clone()));
    } else {
        *entry = Json::Array(vec![Json::String(mixin.id.clone())]);
    }
}

fn partial_from_rule(rule: &Rule) -> PartialRule {
    PartialRule {
        id: Some(rule.id.clone()),
        name: Some(rule.name.clone()),
        description: rule.description.clone(),
        priority: Some(rule.priority),
        conditions: Some(rule.conditions.clone()),
        config: Some(rule.config.clone()),
        resolution_strategy: Some(rule.resolution_strategy),
        enabled: Some(rule.enabled),
        dependencies: Some(rule.dependencies.clone()),
        exclusions: Some(rule.exclusions.clone()),
        chain: rule.chain.clone(),
        execute_after: Some(rule.execute_after.clone()),
        execute_before: Some(rule.execute_before.clone()),
        stop_propagation: Some(rule.stop_propagation),
        composition: rule.composition.clone(),
        tags: Some(rule.tags.clone()),
        metadata: Some(
            rule.metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
    }
}

fn overlay_partial(lower: &PartialRule, upper: &PartialRule) -> PartialRule {
    PartialRule {
        id: upper.id.clone().or_else(|| lower.id.clone()),
        name: upper.name.clone().or_else(|| lower.name.clone()),
        description: upper.description.clone().or_else(|| lower.description.clone()),
        priority: upper.priority.or(lower.priority),
        conditions: upper.conditions.clone().or_else(|| lower.conditions.clone()),
        config: match (&lower.config, &upper.config) {
            (Some(l), Some(u)) => Some(merge::merge(l, u)),
            (Some(l), None) => Some(l.clone()),
            (None, Some(u)) => Some(u.clone()),
            (None, None) => None,
        },
        resolution_strategy: upper.resolution_strategy.or(lower.resolution_strategy),
        enabled: upper.enabled.or(lower.enabled),
        dependencies: upper.dependencies.clone().or_else(|| lower.dependencies.clone()),
        exclusions: upper.exclusions.clone().or_else(|| lower.exclusions.clone()),
        chain: upper.chain.clone().or_else(|| lower.chain.clone()),
        execute_after: upper.execute_after.clone().or_else(|| lower.execute_after.clone()),
        execute_before: upper
            .execute_before
            .clone()
            .or_else(|| lower.execute_before.clone()),
        stop_propagation: upper.stop_propagation.or(lower.stop_propagation),
        composition: upper.composition.clone().or_else(|| lower.composition.clone()),
        tags: upper.tags.clone().or_else(|| lower.tags.clone()),
        metadata: match (&lower.metadata, &upper.metadata) {
            (Some(l), Some(u)) => {
                let mut m = l.clone();
                m.extend(u.clone());
                Some(m)
            }
            (Some(l), None) => Some(l.clone()),
            (None, Some(u)) => Some(u.clone()),
            (None, None) => None,
        },
    }
}

/// Resolve `rule`'s composition (extend/compose/mixin) against the full set
/// of rules in its specification. Rules with no composition are returned
/// unchanged. Detects cycles in `extend` chains via a visited-id set.
pub fn process_composition(
    rule: &Rule,
    all_rules: &HashMap<String, Rule>,
) -> Result<Rule, CompositionError> {
    process_composition_inner(rule, all_rules, &mut HashSet::new())
}

fn process_composition_inner(
    rule: &Rule,
    all_rules: &HashMap<String, Rule>,
    visited: &mut HashSet<String>,
) -> Result<Rule, CompositionError> {
    let Some(composition) = &rule.composition else {
        return Ok(rule.clone());
    };

    match composition {
        Composition::Extend {
            base_rule_id,
            overrides,
        } => {
            if !visited.insert(rule.id.clone()) {
                return Err(CompositionError::CompositionCycle(rule.id.clone()));
            }
            let raw_base = all_rules
                .get(base_rule_id)
                .ok_or_else(|| CompositionError::BaseRuleNotFound(base_rule_id.clone()))?;
            let base = process_composition_inner(raw_base, all_rules, visited)?;

            let mut merged_overrides = partial_from_rule(rule);
            if let Some(ov) = overrides {
                merged_overrides = overlay_partial(&merged_overrides, ov);
            }
            merged_overrides.id = Some(rule.id.clone());

            Ok(extend_rule(&base, &merged_overrides))
        }
        Composition::Compose {
            source_rule_ids,
            overrides,
        } => {
            if source_rule_ids.is_empty() {
                return Err(CompositionError::MissingSourceRuleIds);
            }
            let mut sources = Vec::with_capacity(source_rule_ids.len());
            for id in source_rule_ids {
                let source = all_rules
                    .get(id)
                    .ok_or_else(|| CompositionError::SourceRuleNotFound(id.clone()))?;
                sources.push(source.clone());
            }
            let mut composed = compose_rules(&sources, &rule.id, rule.resolution_strategy)?;
            if let Some(ov) = overrides {
                apply_scalar_overrides(&mut composed, ov);
            }
            Ok(composed)
        }
        Composition::Mixin { source_rule_ids, .. } => {
            if source_rule_ids.is_empty() {
                return Err(CompositionError::MissingSourceRuleIds);
            }
            let mut target = rule.clone();
            for id in source_rule_ids {
                // Unknown mixin ids are silently skipped — distinct from
                // `compose`, which errors on an unresolved id.
                if let Some(mixin) = all_rules.get(id) {
                    apply_mixin(&mut target, mixin);
                }
            }
            Ok(target)
        }
    }
}

/// Overlay scalar (non-collection) fields of `overrides` onto `rule` in
/// place, used after `compose` to apply `composition.overrides`.
fn apply_scalar_overrides(rule: &mut Rule, overrides: &PartialRule) {
    if let Some(v) = &overrides.name {
        rule.name = v.clone();
    }
    if let Some(v) = &overrides.description {
        rule.description = Some(v.clone());
    }
    if let Some(v) = overrides.priority {
        rule.priority = v;
    }
    if let Some(v) = overrides.enabled {
        rule.enabled = v;
    }
    if let Some(v) = overrides.resolution_strategy {
        rule.resolution_strategy = v;
    }
    if let Some(v) = overrides.stop_propagation {
        rule.stop_propagation = v;
    }
    if let Some(v) = &overrides.config {
        rule.config = merge::merge(&rule.config, v);
    }
}
