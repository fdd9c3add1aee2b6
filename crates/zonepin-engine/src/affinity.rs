use zonepin_core::{
    Affinity, NodeAffinity, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm,
    PatchOperation, PatchValue, ZoneSet, NODE_SELECTOR_OP_IN,
};

/// Builds the JSON Patch that pins a pod to the zones of its storage
///
/// The patch never removes or rewrites anything already in the pod's
/// affinity. When the pod already has required node selector terms, the zone
/// term is appended to the list. Terms in that list are ORed by the
/// scheduler, so the appended term is an alternative to the existing ones,
/// not an extra restriction on them.
#[derive(Debug, Clone)]
pub struct AffinityPatchBuilder {
    zone_label: String,
}

impl AffinityPatchBuilder {
    pub fn new(zone_label: impl Into<String>) -> Self {
        Self {
            zone_label: zone_label.into(),
        }
    }

    /// A node selector term requiring the zone label to be one of `zones`
    pub fn zone_term(&self, zones: &ZoneSet) -> NodeSelectorTerm {
        NodeSelectorTerm {
            match_expressions: Some(vec![NodeSelectorRequirement {
                key: self.zone_label.clone(),
                operator: NODE_SELECTOR_OP_IN.to_string(),
                values: Some(zones.to_values()),
            }]),
            match_fields: None,
        }
    }

    /// Build the patch for a pod whose current affinity is `existing`
    ///
    /// `zones` must not be empty; callers short-circuit that case.
    pub fn build_patch(&self, existing: Option<&Affinity>, zones: &ZoneSet) -> Vec<PatchOperation> {
        debug_assert!(!zones.is_empty(), "zone patch requested without zones");

        let term = self.zone_term(zones);

        let value = match existing {
            None => PatchValue::Affinity(Affinity {
                node_affinity: Some(required_node_affinity(term)),
                ..Default::default()
            }),
            Some(affinity) => match &affinity.node_affinity {
                // Rewrite the whole block, carrying pod (anti-)affinity over untouched
                None => PatchValue::Affinity(Affinity {
                    node_affinity: Some(required_node_affinity(term)),
                    ..affinity.clone()
                }),
                Some(node_affinity) => {
                    match &node_affinity.required_during_scheduling_ignored_during_execution {
                        None => PatchValue::RequiredNodeSelector(NodeSelector {
                            node_selector_terms: vec![term],
                        }),
                        Some(_) => PatchValue::AppendedTerm(term),
                    }
                }
            },
        };

        vec![PatchOperation::Add(value)]
    }
}

fn required_node_affinity(term: NodeSelectorTerm) -> NodeAffinity {
    NodeAffinity {
        required_during_scheduling_ignored_during_execution: Some(NodeSelector {
            node_selector_terms: vec![term],
        }),
        preferred_during_scheduling_ignored_during_execution: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        Pod, PodAffinity, PodAffinityTerm, PodSpec, PreferredSchedulingTerm,
    };
    use zonepin_core::{to_json_patch, ZONE_LABEL};

    fn builder() -> AffinityPatchBuilder {
        AffinityPatchBuilder::new(ZONE_LABEL)
    }

    fn zones(values: &[&str]) -> ZoneSet {
        values.iter().copied().collect()
    }

    fn term(key: &str, values: &[&str]) -> NodeSelectorTerm {
        NodeSelectorTerm {
            match_expressions: Some(vec![NodeSelectorRequirement {
                key: key.to_string(),
                operator: "In".to_string(),
                values: Some(values.iter().map(|v| v.to_string()).collect()),
            }]),
            match_fields: None,
        }
    }

    fn pod_with(affinity: Option<Affinity>) -> Pod {
        Pod {
            spec: Some(PodSpec {
                affinity,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Apply the builder's patch to a pod and read the result back
    fn apply(pod: &Pod, zones: &ZoneSet) -> Pod {
        let ops = builder().build_patch(pod.spec.as_ref().and_then(|s| s.affinity.as_ref()), zones);
        let mut doc = serde_json::to_value(pod).unwrap();
        json_patch::patch(&mut doc, &to_json_patch(&ops).unwrap()).unwrap();
        serde_json::from_value(doc).unwrap()
    }

    fn required_terms(pod: &Pod) -> Vec<NodeSelectorTerm> {
        pod.spec
            .as_ref()
            .and_then(|s| s.affinity.as_ref())
            .and_then(|a| a.node_affinity.as_ref())
            .and_then(|n| n.required_during_scheduling_ignored_during_execution.as_ref())
            .map(|r| r.node_selector_terms.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_zone_term_shape() {
        let term = builder().zone_term(&zones(&["us-east-1b", "us-east-1a"]));
        let expr = &term.match_expressions.unwrap()[0];
        assert_eq!(expr.key, ZONE_LABEL);
        assert_eq!(expr.operator, "In");
        assert_eq!(
            expr.values,
            Some(vec!["us-east-1a".to_string(), "us-east-1b".to_string()])
        );
        assert!(term.match_fields.is_none());
    }

    #[test]
    fn test_no_affinity_adds_complete_block() {
        let ops = builder().build_patch(None, &zones(&["us-east-1a"]));

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].path().as_str(), "/spec/affinity");
        assert!(matches!(ops[0], PatchOperation::Add(PatchValue::Affinity(_))));

        let patched = apply(&pod_with(None), &zones(&["us-east-1a"]));
        assert_eq!(required_terms(&patched), vec![term(ZONE_LABEL, &["us-east-1a"])]);
    }

    #[test]
    fn test_pod_without_spec_affinity_gets_one_term_with_all_zones() {
        let patched = apply(&pod_with(None), &zones(&["z1", "z2", "z3"]));

        let terms = required_terms(&patched);
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0], term(ZONE_LABEL, &["z1", "z2", "z3"]));
    }

    #[test]
    fn test_affinity_without_node_affinity_keeps_pod_affinity() {
        let pod_affinity = PodAffinity {
            required_during_scheduling_ignored_during_execution: Some(vec![PodAffinityTerm {
                topology_key: "kubernetes.io/hostname".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let pod = pod_with(Some(Affinity {
            pod_affinity: Some(pod_affinity.clone()),
            ..Default::default()
        }));

        let patched = apply(&pod, &zones(&["us-east-1a"]));

        let affinity = patched.spec.as_ref().unwrap().affinity.as_ref().unwrap();
        assert_eq!(affinity.pod_affinity, Some(pod_affinity));
        assert_eq!(required_terms(&patched), vec![term(ZONE_LABEL, &["us-east-1a"])]);
    }

    #[test]
    fn test_preferred_only_node_affinity_gains_required_selector() {
        let preferred = vec![PreferredSchedulingTerm {
            weight: 10,
            preference: term("disktype", &["ssd"]),
        }];
        let pod = pod_with(Some(Affinity {
            node_affinity: Some(NodeAffinity {
                preferred_during_scheduling_ignored_during_execution: Some(preferred.clone()),
                required_during_scheduling_ignored_during_execution: None,
            }),
            ..Default::default()
        }));

        let ops = builder().build_patch(
            pod.spec.as_ref().unwrap().affinity.as_ref(),
            &zones(&["us-east-1a"]),
        );
        assert_eq!(
            ops[0].path().as_str(),
            "/spec/affinity/nodeAffinity/requiredDuringSchedulingIgnoredDuringExecution"
        );

        let patched = apply(&pod, &zones(&["us-east-1a"]));
        let node_affinity = patched
            .spec
            .as_ref()
            .unwrap()
            .affinity
            .as_ref()
            .unwrap()
            .node_affinity
            .as_ref()
            .unwrap();
        assert_eq!(
            node_affinity.preferred_during_scheduling_ignored_during_execution,
            Some(preferred)
        );
        assert_eq!(required_terms(&patched), vec![term(ZONE_LABEL, &["us-east-1a"])]);
    }

    #[test]
    fn test_existing_terms_are_kept_and_zone_term_appended() {
        let existing = vec![
            term("disktype", &["ssd"]),
            term("kubernetes.io/arch", &["arm64"]),
        ];
        let pod = pod_with(Some(Affinity {
            node_affinity: Some(NodeAffinity {
                required_during_scheduling_ignored_during_execution: Some(NodeSelector {
                    node_selector_terms: existing.clone(),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }));

        let ops = builder().build_patch(
            pod.spec.as_ref().unwrap().affinity.as_ref(),
            &zones(&["eu-west-1a"]),
        );
        assert_eq!(ops.len(), 1);
        assert!(ops[0].path().as_str().ends_with("/nodeSelectorTerms/-"));

        let patched = apply(&pod, &zones(&["eu-west-1a"]));
        let terms = required_terms(&patched);
        assert_eq!(terms.len(), existing.len() + 1);
        assert_eq!(&terms[..existing.len()], &existing[..]);
        assert_eq!(terms[existing.len()], term(ZONE_LABEL, &["eu-west-1a"]));
    }

    #[test]
    fn test_empty_required_term_list_is_appended_to() {
        let pod = pod_with(Some(Affinity {
            node_affinity: Some(NodeAffinity {
                required_during_scheduling_ignored_during_execution: Some(NodeSelector {
                    node_selector_terms: vec![],
                }),
                ..Default::default()
            }),
            ..Default::default()
        }));

        let patched = apply(&pod, &zones(&["us-east-1a"]));
        assert_eq!(required_terms(&patched), vec![term(ZONE_LABEL, &["us-east-1a"])]);
    }

    #[test]
    fn test_appended_term_is_an_alternative() {
        // A pod already restricted to one zone gains a second, ORed term for
        // its storage zone rather than a narrower combined term.
        let pod = pod_with(Some(Affinity {
            node_affinity: Some(NodeAffinity {
                required_during_scheduling_ignored_during_execution: Some(NodeSelector {
                    node_selector_terms: vec![term(ZONE_LABEL, &["us-east-1c"])],
                }),
                ..Default::default()
            }),
            ..Default::default()
        }));

        let terms = required_terms(&apply(&pod, &zones(&["us-east-1a"])));

        assert_eq!(
            terms,
            vec![
                term(ZONE_LABEL, &["us-east-1c"]),
                term(ZONE_LABEL, &["us-east-1a"]),
            ]
        );
    }
}
