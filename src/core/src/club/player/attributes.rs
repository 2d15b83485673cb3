use serde::{Deserialize, Serialize};

pub const ATTRIBUTE_MIN: u8 = 1;
pub const ATTRIBUTE_MAX: u8 = 40;

/// The eight player attributes, each in [1, 40].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAttributes {
    pub speed: u8,
    pub power: u8,
    pub agility: u8,
    pub throwing: u8,
    pub catching: u8,
    pub kicking: u8,
    pub stamina: u8,
    pub leadership: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    Speed,
    Power,
    Agility,
    Throwing,
    Catching,
    Kicking,
    Stamina,
    Leadership,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 8] = [
        AttributeKind::Speed,
        AttributeKind::Power,
        AttributeKind::Agility,
        AttributeKind::Throwing,
        AttributeKind::Catching,
        AttributeKind::Kicking,
        AttributeKind::Stamina,
        AttributeKind::Leadership,
    ];

    /// Physical attributes never progress at age 34+ and are the decline
    /// targets at age 31+.
    pub fn is_physical(&self) -> bool {
        matches!(
            self,
            AttributeKind::Speed | AttributeKind::Power | AttributeKind::Agility
        )
    }
}

impl PlayerAttributes {
    pub fn get(&self, kind: AttributeKind) -> u8 {
        match kind {
            AttributeKind::Speed => self.speed,
            AttributeKind::Power => self.power,
            AttributeKind::Agility => self.agility,
            AttributeKind::Throwing => self.throwing,
            AttributeKind::Catching => self.catching,
            AttributeKind::Kicking => self.kicking,
            AttributeKind::Stamina => self.stamina,
            AttributeKind::Leadership => self.leadership,
        }
    }

    fn get_mut(&mut self, kind: AttributeKind) -> &mut u8 {
        match kind {
            AttributeKind::Speed => &mut self.speed,
            AttributeKind::Power => &mut self.power,
            AttributeKind::Agility => &mut self.agility,
            AttributeKind::Throwing => &mut self.throwing,
            AttributeKind::Catching => &mut self.catching,
            AttributeKind::Kicking => &mut self.kicking,
            AttributeKind::Stamina => &mut self.stamina,
            AttributeKind::Leadership => &mut self.leadership,
        }
    }

    /// Raise an attribute by one, capped by the player's potential cap.
    /// Returns true when the attribute actually moved.
    pub fn increase(&mut self, kind: AttributeKind, cap: u8) -> bool {
        let value = self.get_mut(kind);
        if *value < cap.min(ATTRIBUTE_MAX) {
            *value += 1;
            true
        } else {
            false
        }
    }

    /// Lower an attribute by one with a floor of 1.
    pub fn decrease(&mut self, kind: AttributeKind) -> bool {
        let value = self.get_mut(kind);
        if *value > ATTRIBUTE_MIN {
            *value -= 1;
            true
        } else {
            false
        }
    }

    pub fn sum(&self) -> u32 {
        AttributeKind::ALL.iter().map(|k| self.get(*k) as u32).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes() -> PlayerAttributes {
        PlayerAttributes {
            speed: 20,
            power: 20,
            agility: 20,
            throwing: 20,
            catching: 20,
            kicking: 20,
            stamina: 20,
            leadership: 20,
        }
    }

    #[test]
    fn increase_respects_cap() {
        let mut attrs = attributes();

        assert!(attrs.increase(AttributeKind::Speed, 21));
        assert!(!attrs.increase(AttributeKind::Speed, 21));
        assert_eq!(21, attrs.speed);
    }

    #[test]
    fn decrease_floors_at_one() {
        let mut attrs = attributes();
        attrs.power = 1;

        assert!(!attrs.decrease(AttributeKind::Power));
        assert_eq!(1, attrs.power);
    }

    #[test]
    fn sum_covers_all_eight() {
        assert_eq!(160, attributes().sum());
    }
}
