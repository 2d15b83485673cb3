use crate::club::contract::Contract;
use crate::club::player::PlayerRole;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaffType {
    HeadCoach,
    PasserTrainer,
    RunnerTrainer,
    BlockerTrainer,
    RecoverySpecialist,
    Scout,
}

impl StaffType {
    /// Trainer type responsible for a given player role.
    pub fn trainer_for(role: PlayerRole) -> StaffType {
        match role {
            PlayerRole::Passer => StaffType::PasserTrainer,
            PlayerRole::Runner => StaffType::RunnerTrainer,
            PlayerRole::Blocker => StaffType::BlockerTrainer,
        }
    }
}

/// The seven staff attributes, each in [1, 40].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffAttributes {
    pub motivation: u8,
    pub development: u8,
    pub teaching: u8,
    pub physiology: u8,
    pub talent_assessment: u8,
    pub potential_assessment: u8,
    pub tactics: u8,
}

impl StaffAttributes {
    pub fn sum(&self) -> u32 {
        self.motivation as u32
            + self.development as u32
            + self.teaching as u32
            + self.physiology as u32
            + self.talent_assessment as u32
            + self.potential_assessment as u32
            + self.tactics as u32
    }

    /// Overall effectiveness rating in [1, 40], used as the staff modifier
    /// for progression and recovery.
    pub fn rating(&self) -> u8 {
        (self.sum() / 7) as u8
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: u32,
    pub team_id: u32,
    pub name: String,
    pub staff_type: StaffType,
    pub age: u8,
    pub attributes: StaffAttributes,
    pub contract: Option<Contract>,
}

impl PartialEq for Staff {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trainer_mapping_covers_all_roles() {
        assert_eq!(StaffType::PasserTrainer, StaffType::trainer_for(PlayerRole::Passer));
        assert_eq!(StaffType::RunnerTrainer, StaffType::trainer_for(PlayerRole::Runner));
        assert_eq!(StaffType::BlockerTrainer, StaffType::trainer_for(PlayerRole::Blocker));
    }

    #[test]
    fn rating_is_attribute_mean() {
        let attributes = StaffAttributes {
            motivation: 21,
            development: 21,
            teaching: 21,
            physiology: 21,
            talent_assessment: 21,
            potential_assessment: 21,
            tactics: 21,
        };

        assert_eq!(21, attributes.rating());
    }
}
