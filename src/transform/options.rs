use crate::grammar::Rule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn is_false(b: &bool) -> bool {
    !*b
}

/// How a layered transformation runs. Stored in the grammar document and copied
/// into the engine when it is configured.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct TransformationOptions {
    /// Explicit order to run layers in. Ascending layer numbers if left out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_order: Option<Vec<u32>>,
    /// Start over from the first layer after the last one, until a whole pass applies nothing.
    #[serde(default, skip_serializing_if = "is_false")]
    pub loop_over_layers: bool,
    /// Abort the run instead of applying more than this many rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,
    /// Refuse matches whose deleted nodes still have edges the rule didn't match.
    #[serde(default, skip_serializing_if = "is_false")]
    pub check_dangling: bool,
}

impl TransformationOptions {
    /// The layers to run, in order.
    pub fn layer_sequence(&self, rules: &[Rule]) -> Vec<u32> {
        match &self.layer_order {
            Some(order) => {
                let listed: BTreeSet<u32> = order.iter().copied().collect();
                for rule in rules.iter().filter(|r| r.enabled) {
                    if !listed.contains(&rule.layer) {
                        log::warn!(
                            "Rule {} is in layer {}, which is not in the layer order; it will not run",
                            rule.name,
                            rule.layer
                        );
                    }
                }
                order.clone()
            }
            None => rules
                .iter()
                .filter(|r| r.enabled)
                .map(|r| r.layer)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Pattern, PatternNode};

    fn rule_in(name: &str, layer: u32) -> Rule {
        let from = Pattern {
            nodes: vec![PatternNode::new(0, None)],
            edges: vec![],
        };
        Rule::new(name, from, vec![]).in_layer(layer)
    }

    #[test]
    fn test_default_sequence_is_ascending() {
        let mut disabled = rule_in("off", 7);
        disabled.enabled = false;
        let rules = vec![rule_in("a", 3), rule_in("b", 1), rule_in("c", 3), disabled];
        let options = TransformationOptions::default();
        assert_eq!(options.layer_sequence(&rules), vec![1, 3]);
    }

    #[test]
    fn test_explicit_order_wins() {
        let rules = vec![rule_in("a", 0), rule_in("b", 1)];
        let options = TransformationOptions {
            layer_order: Some(vec![1, 0, 5]),
            ..Default::default()
        };
        assert_eq!(options.layer_sequence(&rules), vec![1, 0, 5]);
    }

    #[test]
    fn test_de_defaults() {
        let options: TransformationOptions = serde_yaml::from_str("max_steps: 10").unwrap();
        assert_eq!(options.max_steps, Some(10));
        assert!(!options.loop_over_layers);
        assert!(!options.check_dangling);
        assert_eq!(options.layer_order, None);
    }
}
