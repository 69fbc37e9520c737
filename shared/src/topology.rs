//! Stage topology of a product's production pipeline
//!
//! Stages are ordered by their 1-based position. The holding area sits in
//! front of the first stage; finished stock sits behind the last one.

use std::collections::HashSet;

use crate::error::{DomainError, DomainResult};
use crate::models::{Stage, StageInput};
use crate::types::{StageId, StageSlot};

/// Checks that positions are exactly `1..=n` and names are present.
pub fn validate_stage_positions(positions: &[i32]) -> DomainResult<()> {
    let mut seen = HashSet::with_capacity(positions.len());
    for &position in positions {
        if position < 1 {
            return Err(DomainError::InvalidTopology(format!(
                "stage position {} must be at least 1",
                position
            )));
        }
        if !seen.insert(position) {
            return Err(DomainError::InvalidTopology(format!(
                "stage position {} is used more than once",
                position
            )));
        }
    }

    let count = positions.len() as i32;
    if let Some(&gap) = positions.iter().find(|&&p| p > count) {
        return Err(DomainError::InvalidTopology(format!(
            "stage positions must be dense: {} exceeds stage count {}",
            gap, count
        )));
    }
    Ok(())
}

/// Validates a submitted stage list before it is stored
pub fn validate_stage_inputs(stages: &[StageInput]) -> DomainResult<()> {
    if let Some(stage) = stages.iter().find(|s| s.name.trim().is_empty()) {
        return Err(DomainError::InvalidTopology(format!(
            "stage at position {} has no name",
            stage.position
        )));
    }
    if let Some(stage) = stages.iter().find(|s| s.piece_rate.is_sign_negative()) {
        return Err(DomainError::InvalidTopology(format!(
            "stage '{}' has a negative piece rate",
            stage.name
        )));
    }
    let positions: Vec<i32> = stages.iter().map(|s| s.position).collect();
    validate_stage_positions(&positions)
}

/// Ordered stages of one product
#[derive(Debug, Clone, PartialEq)]
pub struct StageTopology {
    stages: Vec<Stage>,
}

impl StageTopology {
    /// Builds the topology, rejecting malformed position sets.
    pub fn new(mut stages: Vec<Stage>) -> DomainResult<Self> {
        let positions: Vec<i32> = stages.iter().map(|s| s.position).collect();
        validate_stage_positions(&positions)?;
        stages.sort_by_key(|s| s.position);
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage(&self, stage_id: StageId) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == stage_id)
    }

    fn index_of(&self, stage_id: StageId) -> DomainResult<usize> {
        self.stages
            .iter()
            .position(|s| s.id == stage_id)
            .ok_or_else(|| DomainError::not_found(format!("Stage {}", stage_id)))
    }

    /// Slot that feeds `stage_id`: the holding area for the first stage.
    pub fn previous(&self, stage_id: StageId) -> DomainResult<StageSlot> {
        let index = self.index_of(stage_id)?;
        Ok(match index {
            0 => StageSlot::Holding,
            i => StageSlot::Stage(self.stages[i - 1].id),
        })
    }

    /// Stage after `slot`; `None` means the next destination is finished stock.
    pub fn next(&self, slot: StageSlot) -> DomainResult<Option<&Stage>> {
        match slot {
            StageSlot::Holding => Ok(self.stages.first()),
            StageSlot::Stage(id) => {
                let index = self.index_of(id)?;
                Ok(self.stages.get(index + 1))
            }
        }
    }

    pub fn last(&self) -> Option<&Stage> {
        self.stages.last()
    }

    pub fn is_last(&self, stage_id: StageId) -> bool {
        self.last().map_or(false, |s| s.id == stage_id)
    }

    /// Every slot a unit of this product can occupy, in flow order
    pub fn slots(&self) -> impl Iterator<Item = StageSlot> + '_ {
        std::iter::once(StageSlot::Holding).chain(self.stages.iter().map(|s| StageSlot::Stage(s.id)))
    }
}

/// Changes needed to turn a stored stage list into a submitted one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagePlan {
    /// Existing stages whose position is kept, with their new definition
    pub update: Vec<(StageId, StageInput)>,
    pub insert: Vec<StageInput>,
    pub remove: Vec<StageId>,
}

/// Matches stages by position so that kept positions keep their ids.
pub fn plan_stage_update(existing: &[Stage], desired: &[StageInput]) -> DomainResult<StagePlan> {
    validate_stage_inputs(desired)?;

    let mut plan = StagePlan::default();
    for input in desired {
        match existing.iter().find(|s| s.position == input.position) {
            Some(stage) => plan.update.push((stage.id, input.clone())),
            None => plan.insert.push(input.clone()),
        }
    }
    plan.remove = existing
        .iter()
        .filter(|s| !desired.iter().any(|d| d.position == s.position))
        .map(|s| s.id)
        .collect();

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn stage(id: StageId, position: i32, rate: i64) -> Stage {
        Stage {
            id,
            product_id: 1,
            name: format!("Stage {}", position),
            position,
            piece_rate: Decimal::from(rate),
        }
    }

    fn input(name: &str, position: i32) -> StageInput {
        StageInput {
            name: name.into(),
            position,
            piece_rate: Decimal::from(5),
        }
    }

    fn chair() -> StageTopology {
        // stored out of order on purpose
        StageTopology::new(vec![stage(20, 2, 15), stage(10, 1, 10)]).unwrap()
    }

    #[test]
    fn test_previous_of_first_stage_is_holding() {
        let topology = chair();
        assert_eq!(topology.previous(10).unwrap(), StageSlot::Holding);
        assert_eq!(topology.previous(20).unwrap(), StageSlot::Stage(10));
    }

    #[test]
    fn test_next_resolves_through_pipeline() {
        let topology = chair();
        assert_eq!(topology.next(StageSlot::Holding).unwrap().map(|s| s.id), Some(10));
        assert_eq!(topology.next(StageSlot::Stage(10)).unwrap().map(|s| s.id), Some(20));
        assert!(topology.next(StageSlot::Stage(20)).unwrap().is_none());
        assert!(topology.is_last(20));
        assert!(!topology.is_last(10));
    }

    #[test]
    fn test_unknown_stage_is_not_found() {
        let topology = chair();
        assert!(matches!(topology.previous(99), Err(DomainError::NotFound(_))));
        assert!(matches!(
            topology.next(StageSlot::Stage(99)),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn test_empty_topology_has_no_next() {
        let topology = StageTopology::new(vec![]).unwrap();
        assert!(topology.next(StageSlot::Holding).unwrap().is_none());
        assert!(topology.last().is_none());
    }

    #[test]
    fn test_rejects_gaps_duplicates_and_zero() {
        assert!(matches!(
            validate_stage_positions(&[1, 3]),
            Err(DomainError::InvalidTopology(_))
        ));
        assert!(validate_stage_positions(&[1, 1]).is_err());
        assert!(validate_stage_positions(&[0, 1]).is_err());
        assert!(validate_stage_positions(&[2, 1, 3]).is_ok());
    }

    #[test]
    fn test_stage_inputs_need_names_and_non_negative_rates() {
        assert!(validate_stage_inputs(&[input(" ", 1)]).is_err());

        let mut negative = input("Cut", 1);
        negative.piece_rate = Decimal::from(-1);
        assert!(validate_stage_inputs(&[negative]).is_err());
    }

    #[test]
    fn test_plan_keeps_ids_by_position() {
        let existing = vec![stage(10, 1, 10), stage(20, 2, 15), stage(30, 3, 20)];
        let desired = vec![input("Cut", 1), input("Sand", 2)];

        let plan = plan_stage_update(&existing, &desired).unwrap();
        assert_eq!(plan.update.len(), 2);
        assert_eq!(plan.update[0].0, 10);
        assert_eq!(plan.update[1].1.name, "Sand");
        assert!(plan.insert.is_empty());
        assert_eq!(plan.remove, vec![30]);

        let grown = plan_stage_update(&existing[..1], &desired).unwrap();
        assert_eq!(grown.insert.len(), 1);
        assert!(grown.remove.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Walking `next` from the holding area visits every stage once, in position order
        #[test]
        fn prop_next_walk_visits_all_stages(n in 0usize..12, seed in any::<u64>()) {
            let mut stages: Vec<Stage> = (0..n)
                .map(|i| stage(100 + i as i64, i as i32 + 1, 1))
                .collect();
            // deterministic shuffle
            let len = stages.len();
            if len > 1 {
                for i in 0..len {
                    let j = ((seed >> (i % 32)) as usize + i) % len;
                    stages.swap(i, j);
                }
            }
            let topology = StageTopology::new(stages).unwrap();

            let mut slot = StageSlot::Holding;
            let mut visited = Vec::new();
            while let Some(next) = topology.next(slot).unwrap() {
                prop_assert_eq!(topology.previous(next.id).unwrap(), slot);
                visited.push(next.position);
                slot = StageSlot::Stage(next.id);
            }
            prop_assert_eq!(visited, (1..=n as i32).collect::<Vec<_>>());
        }

        /// Any permutation of 1..=n is a valid position set
        #[test]
        fn prop_dense_positions_accepted(n in 1i32..20) {
            let mut positions: Vec<i32> = (1..=n).collect();
            positions.reverse();
            prop_assert!(validate_stage_positions(&positions).is_ok());
            positions.push(n + 2);
            prop_assert!(validate_stage_positions(&positions).is_err());
        }
    }
}
