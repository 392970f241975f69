//! Small configuration operators shared across the deployment pipeline:
//! a recursive mapping overlay, a scalar-to-sequence normalizer and the
//! cartesian combinator behind rule expansion.

use serde_yaml::mapping::Entry;
use serde_yaml::{Mapping, Value};

/// Overlay `overlay` onto `base` and return the merged mapping.
///
/// Keys missing from `base` are added. When both sides hold mappings
/// the merge recurses; any other pair is replaced wholesale by the
/// overlay value. Sequences are never concatenated and no type
/// coercion happens. Neither input is modified.
pub fn deep_merge(base: &Mapping, overlay: &Mapping) -> Mapping {
    let mut merged = base.clone();
    deep_merge_into(&mut merged, overlay);
    merged
}

/// In-place variant of [`deep_merge`].
pub fn deep_merge_into(base: &mut Mapping, overlay: &Mapping) {
    for (key, value) in overlay {
        match base.entry(key.clone()) {
            Entry::Occupied(mut entry) => match (entry.get_mut(), value) {
                (Value::Mapping(existing), Value::Mapping(incoming)) => {
                    deep_merge_into(existing, incoming);
                }
                (slot, _) => *slot = value.clone(),
            },
            Entry::Vacant(entry) => {
                entry.insert(value.clone());
            }
        }
    }
}

/// Normalize a value to a sequence: sequences pass through unchanged,
/// anything else is wrapped as a single-element sequence.
///
/// Idempotent, so callers can apply it without checking what they hold.
///
/// ```
/// use hostsmith::helpers::normalize;
/// use serde_yaml::Value;
///
/// let port: Value = serde_yaml::from_str("80").unwrap();
/// let ports: Value = serde_yaml::from_str("[80]").unwrap();
/// assert_eq!(normalize(port), ports);
/// assert_eq!(normalize(ports.clone()), ports);
/// ```
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Sequence(_) => value,
        other => Value::Sequence(vec![other]),
    }
}

/// Combine two sequences of token groups into their cartesian product.
///
/// Every group on the left is extended with every group on the right,
/// left side in the outer (slower) loop. An empty operand acts as the
/// identity instead of annihilating the product: a side with no groups
/// imposes no constraint and must not erase the other side's variants.
///
/// ```
/// use hostsmith::helpers::combine;
///
/// let groups = vec![vec!["--dport 80".to_string()]];
/// assert_eq!(combine(&groups, &[]), groups);
/// assert_eq!(combine(&[], &groups), groups);
/// ```
pub fn combine<T: Clone>(left: &[Vec<T>], right: &[Vec<T>]) -> Vec<Vec<T>> {
    if left.is_empty() {
        return right.to_vec();
    }
    if right.is_empty() {
        return left.to_vec();
    }
    let mut result = Vec::with_capacity(left.len() * right.len());
    for l in left {
        for r in right {
            let mut group = l.clone();
            group.extend(r.iter().cloned());
            result.push(group);
        }
    }
    result
}

/// Reduce factor sequences through [`combine`], left to right.
///
/// With no factors the product is empty. Callers that want one empty
/// combination instead seed the fold themselves, as the rule compiler
/// does so a rule without options still yields a rule.
pub fn product<T: Clone>(factors: &[Vec<Vec<T>>]) -> Vec<Vec<T>> {
    factors
        .iter()
        .fold(Vec::new(), |acc, factor| combine(&acc, factor))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy to generate scalar YAML values
    fn scalar_strategy() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| Value::Number(n.into())),
            "[a-z]{1,8}".prop_map(Value::String),
        ]
    }

    /// Strategy to generate scalars and sequences of scalars
    fn yaml_value_strategy() -> impl Strategy<Value = Value> {
        prop_oneof![
            scalar_strategy(),
            prop::collection::vec(scalar_strategy(), 0..4).prop_map(Value::Sequence),
        ]
    }

    /// Strategy to generate flat mappings of scalar values
    fn flat_mapping_strategy() -> impl Strategy<Value = Mapping> {
        prop::collection::vec(("[a-z]{1,4}", scalar_strategy()), 0..5).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(key, value)| (Value::String(key), value))
                .collect()
        })
    }

    /// Strategy to generate mappings with scalar and nested-mapping values
    fn nested_mapping_strategy() -> impl Strategy<Value = Mapping> {
        let entry = prop_oneof![
            scalar_strategy(),
            flat_mapping_strategy().prop_map(Value::Mapping),
        ];
        prop::collection::vec(("[a-z]{1,4}", entry), 0..5).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(key, value)| (Value::String(key), value))
                .collect()
        })
    }

    /// Strategy to generate token groups as the combinator consumes them
    fn groups_strategy(max_groups: usize) -> impl Strategy<Value = Vec<Vec<String>>> {
        prop::collection::vec(prop::collection::vec("[a-z0-9]{1,6}", 1..3), 0..max_groups)
    }

    proptest! {
        /// An empty operand should act as the identity on either side
        #[test]
        fn prop_combine_empty_is_identity(groups in groups_strategy(8)) {
            prop_assert_eq!(combine(&groups, &[]), groups.clone());
            prop_assert_eq!(combine(&[], &groups), groups);
        }

        /// Non-empty operands should multiply out completely
        #[test]
        fn prop_combine_length_multiplies(
            left in groups_strategy(6),
            right in groups_strategy(6)
        ) {
            let combined = combine(&left, &right);
            if left.is_empty() || right.is_empty() {
                prop_assert_eq!(combined.len(), left.len().max(right.len()));
            } else {
                prop_assert_eq!(combined.len(), left.len() * right.len());
            }
        }

        /// The product length should be the product of the non-empty factor lengths
        #[test]
        fn prop_product_counts_combinations(
            factors in prop::collection::vec(groups_strategy(4), 0..4)
        ) {
            let combos = product(&factors);
            if factors.iter().all(|factor| factor.is_empty()) {
                prop_assert!(combos.is_empty());
            } else {
                let expected: usize = factors
                    .iter()
                    .filter(|factor| !factor.is_empty())
                    .map(|factor| factor.len())
                    .product();
                prop_assert_eq!(combos.len(), expected);
            }
        }

        /// Normalizing twice should change nothing after the first pass
        #[test]
        fn prop_normalize_idempotent(value in yaml_value_strategy()) {
            let once = normalize(value);
            prop_assert_eq!(normalize(once.clone()), once);
        }

        /// Normalized output should always be a sequence
        #[test]
        fn prop_normalize_yields_sequences(value in yaml_value_strategy()) {
            prop_assert!(matches!(normalize(value), Value::Sequence(_)));
        }

        /// An empty side should leave the other side unchanged
        #[test]
        fn prop_merge_empty_sides_are_identities(mapping in nested_mapping_strategy()) {
            prop_assert_eq!(deep_merge(&mapping, &Mapping::new()), mapping.clone());
            prop_assert_eq!(deep_merge(&Mapping::new(), &mapping), mapping);
        }

        /// Overlay values should win conflicts and base-only keys should survive
        #[test]
        fn prop_merge_overlay_wins_and_base_survives(
            base in nested_mapping_strategy(),
            overlay in nested_mapping_strategy()
        ) {
            let merged = deep_merge(&base, &overlay);
            for (key, value) in &overlay {
                let recursed = matches!(
                    (base.get(key), value),
                    (Some(Value::Mapping(_)), Value::Mapping(_))
                );
                if !recursed {
                    prop_assert_eq!(merged.get(key), Some(value));
                }
            }
            for key in base.keys() {
                prop_assert!(merged.contains_key(key));
            }
        }

        /// Nested mappings under a shared key should merge key by key
        #[test]
        fn prop_merge_recurses_under_shared_keys(
            base_inner in flat_mapping_strategy(),
            overlay_inner in flat_mapping_strategy()
        ) {
            let mut base = Mapping::new();
            base.insert(Value::String("shared".to_string()), Value::Mapping(base_inner.clone()));
            let mut overlay = Mapping::new();
            overlay.insert(
                Value::String("shared".to_string()),
                Value::Mapping(overlay_inner.clone()),
            );

            let merged = deep_merge(&base, &overlay);
            let inner = match merged.get("shared") {
                Some(Value::Mapping(inner)) => inner.clone(),
                other => panic!("expected mapping under shared, got {:?}", other),
            };
            for key in base_inner.keys() {
                prop_assert!(inner.contains_key(key));
            }
            for (key, value) in &overlay_inner {
                prop_assert_eq!(inner.get(key), Some(value));
            }
        }
    }
}
