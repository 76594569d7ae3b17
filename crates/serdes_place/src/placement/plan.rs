//! The typed placement plan: which block types are placed in which order,
//! and where each one's search starts.

use crate::codec::BlockType;
use serdes_config::{PlacementConfig, SubgroupSelector, TargetRule};

/// How the search anchor of a block is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The group's I/O pad site.
    IoSite,
    /// Where one sibling block of the same group was placed.
    Sibling {
        /// Sibling type.
        kind: BlockType,
        /// Sibling subgroup, relative to the block being placed.
        subgroup: SubgroupSelector,
    },
    /// The rounded mean of where several sibling blocks were placed.
    Centroid {
        /// Sibling type.
        kind: BlockType,
        /// Subgroups that must have been placed.
        required: Vec<u8>,
        /// Subgroups taken into account only if the group has them.
        optional: Vec<u8>,
    },
}

impl From<&TargetRule> for Target {
    fn from(rule: &TargetRule) -> Self {
        match rule {
            TargetRule::IoSite => Target::IoSite,
            TargetRule::Sibling { kind, subgroup } => Target::Sibling {
                kind: BlockType::from_raw(*kind),
                subgroup: *subgroup,
            },
            TargetRule::Centroid {
                kind,
                required,
                optional,
            } => Target::Centroid {
                kind: BlockType::from_raw(*kind),
                required: required.clone(),
                optional: optional.clone(),
            },
        }
    }
}

/// One priority tier: all blocks of `kind`, anchored by `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier {
    /// Block type placed in this tier.
    pub kind: BlockType,
    /// Anchor rule.
    pub target: Target,
}

/// Immutable placement tables, built once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementPlan {
    tiers: Vec<Tier>,
    offsets: Vec<(i32, i32)>,
}

impl PlacementPlan {
    /// Creates a plan from explicit tiers and `(u, v)` offsets.
    pub fn new(tiers: Vec<Tier>, offsets: Vec<(i32, i32)>) -> Self {
        Self { tiers, offsets }
    }

    /// Builds the plan from a validated placement configuration.
    pub fn from_config(config: &PlacementConfig) -> Self {
        let tiers = config
            .priority
            .iter()
            .map(|entry| Tier {
                kind: BlockType::from_raw(entry.kind),
                target: Target::from(&entry.target),
            })
            .collect();
        Self::new(tiers, config.offsets.clone())
    }

    /// Tiers in placement order.
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Search offsets in probe order.
    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }

    /// Whether some tier places blocks of `kind`.
    pub fn places(&self, kind: BlockType) -> bool {
        self.tiers.iter().any(|t| t.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serdes_config::PlacerConfig;

    #[test]
    fn default_plan_order() {
        let plan = PlacementPlan::from_config(&PlacerConfig::default().placement);
        let kinds: Vec<u8> = plan.tiers().iter().map(|t| t.kind.as_raw()).collect();
        assert_eq!(kinds, vec![0x2, 0xb, 0xa, 0x9, 0x1, 0x0, 0x8]);
        assert_eq!(plan.offsets().first(), Some(&(0, 1)));
        assert_eq!(plan.offsets().len(), 23);
    }

    #[test]
    fn rules_are_typed() {
        let plan = PlacementPlan::from_config(&PlacerConfig::default().placement);
        let capture = plan
            .tiers()
            .iter()
            .find(|t| t.kind == BlockType::INPUT_FAST_CAPTURE)
            .unwrap();
        assert_eq!(
            capture.target,
            Target::Sibling {
                kind: BlockType::INPUT_SHIFT,
                subgroup: SubgroupSelector::Parity(4),
            }
        );
        let slow = plan.tiers().last().unwrap();
        assert_eq!(
            slow.target,
            Target::Centroid {
                kind: BlockType::INPUT_SHIFT,
                required: vec![4],
                optional: vec![5],
            }
        );
    }

    #[test]
    fn places_only_listed_kinds() {
        let plan = PlacementPlan::from_config(&PlacerConfig::default().placement);
        assert!(plan.places(BlockType::OUTPUT_CAPTURE));
        assert!(!plan.places(BlockType::from_raw(0x5)));
    }
}
