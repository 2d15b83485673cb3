use crate::club::player::Race;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptCategory {
    PreGame,
    MidGameFlow,
    Urgency,
    LooseBall,
    Runs,
    Passes,
    Defense,
    Skill,
    Injury,
    Fatigue,
    Atmosphere,
    Camaraderie,
    Scoring,
    Contextual,
}

/// One commentary prompt. `race` marks race-flavored variants; they are
/// preferred 30% of the time when the acting player's race matches.
#[derive(Debug, Clone, Copy)]
pub struct Prompt {
    pub category: PromptCategory,
    pub race: Option<Race>,
    pub text: &'static str,
}

/// The complete prompt database. Selection returns indexes into this table,
/// so ordering here is part of the deterministic-replay contract: append
/// only, never reorder.
pub const PROMPTS: &[Prompt] = &[
    // Pre-game
    Prompt { category: PromptCategory::PreGame, race: None, text: "Both squads are on the floor and the dome lights are up. We're moments from kickoff." },
    Prompt { category: PromptCategory::PreGame, race: None, text: "The captains meet at the center circle. Everything starts now." },
    Prompt { category: PromptCategory::PreGame, race: None, text: "Warmups are done and the benches are set. Time to find out who wants it." },
    // Mid-game flow
    Prompt { category: PromptCategory::MidGameFlow, race: None, text: "A breather at the half. Plenty left to settle in the second." },
    Prompt { category: PromptCategory::MidGameFlow, race: None, text: "The pace has been relentless so far, end to end with barely a stoppage." },
    Prompt { category: PromptCategory::MidGameFlow, race: None, text: "Halftime in the dome. The coaches will have plenty to say." },
    // Urgency
    Prompt { category: PromptCategory::Urgency, race: None, text: "Clock's running thin and everyone in the building knows it." },
    Prompt { category: PromptCategory::Urgency, race: None, text: "Every possession is gold now. No margin left for a giveaway." },
    Prompt { category: PromptCategory::Urgency, race: None, text: "Extra time in the dome! Next breakthrough could decide it all." },
    Prompt { category: PromptCategory::Urgency, race: None, text: "Sudden death. One score ends it." },
    // Loose ball
    Prompt { category: PromptCategory::LooseBall, race: None, text: "The ball is loose on the turf and bodies are flying after it!" },
    Prompt { category: PromptCategory::LooseBall, race: None, text: "Stripped! The ball squirts free and the scramble is on." },
    Prompt { category: PromptCategory::LooseBall, race: None, text: "It's anybody's ball... and the defense comes up with it!" },
    // Runs
    Prompt { category: PromptCategory::Runs, race: None, text: "{player} finds a seam and turns upfield for a solid gain." },
    Prompt { category: PromptCategory::Runs, race: None, text: "{player} lowers a shoulder and drags the pile forward." },
    Prompt { category: PromptCategory::Runs, race: None, text: "Quick cut by {player}, and there's open floor ahead." },
    Prompt { category: PromptCategory::Runs, race: Some(Race::Umbra), text: "{player} simply isn't there when the tackle arrives. Umbra shadow-work at full speed." },
    Prompt { category: PromptCategory::Runs, race: Some(Race::Gryll), text: "{player} rumbles ahead, and Gryll momentum is a hard thing to argue with." },
    // Passes
    Prompt { category: PromptCategory::Passes, race: None, text: "{player} stands tall and delivers a strike." },
    Prompt { category: PromptCategory::Passes, race: None, text: "A tight window, but {player} threads it anyway." },
    Prompt { category: PromptCategory::Passes, race: None, text: "{player} buys a half-second and fires across the floor." },
    Prompt { category: PromptCategory::Passes, race: Some(Race::Sylvan), text: "{player} glides out of pressure and flicks it away, effortless as ever for a Sylvan." },
    Prompt { category: PromptCategory::Passes, race: Some(Race::Lumina), text: "{player} releases with that trademark Lumina composure. Radiant touch." },
    // Defense
    Prompt { category: PromptCategory::Defense, race: None, text: "{player} reads it all the way and shuts the lane down." },
    Prompt { category: PromptCategory::Defense, race: None, text: "Huge stop by {player}. Nothing doing on that side." },
    Prompt { category: PromptCategory::Defense, race: None, text: "{player} wraps up and plants the carrier right where he stood." },
    Prompt { category: PromptCategory::Defense, race: Some(Race::Gryll), text: "{player} meets the runner like a wall. Gryll defense, textbook and terrifying." },
    // Skill
    Prompt { category: PromptCategory::Skill, race: None, text: "That's pure craft from {player}. You don't coach that." },
    Prompt { category: PromptCategory::Skill, race: None, text: "{player} makes the hard thing look routine." },
    // Injury
    Prompt { category: PromptCategory::Injury, race: None, text: "{player} is slow getting up after that collision. The bench is watching closely." },
    Prompt { category: PromptCategory::Injury, race: None, text: "That's a heavy one. {player} needs attention from the training staff." },
    Prompt { category: PromptCategory::Injury, race: None, text: "{player} limps toward the sideline. You hate to see it in a game like this." },
    // Fatigue
    Prompt { category: PromptCategory::Fatigue, race: None, text: "{player} has hands on knees. The pace is taking its toll." },
    Prompt { category: PromptCategory::Fatigue, race: None, text: "Fresh legs coming in. {player} has given everything in this stretch." },
    Prompt { category: PromptCategory::Fatigue, race: None, text: "You can see the heavy legs out there. Conditioning decides games like this." },
    // Atmosphere
    Prompt { category: PromptCategory::Atmosphere, race: None, text: "The dome is absolutely roaring. The home crowd smells something." },
    Prompt { category: PromptCategory::Atmosphere, race: None, text: "Listen to this building. Visiting teams dread nights like these." },
    // Camaraderie
    Prompt { category: PromptCategory::Camaraderie, race: None, text: "This group clearly plays for each other. The spacing, the trust, it's all connected." },
    Prompt { category: PromptCategory::Camaraderie, race: None, text: "Another unselfish play from a team that's bought in completely." },
    // Scoring
    Prompt { category: PromptCategory::Scoring, race: None, text: "SCORE! {player} finishes it off and the dome erupts!" },
    Prompt { category: PromptCategory::Scoring, race: None, text: "{player} crosses the line! That's how you cap a drive." },
    Prompt { category: PromptCategory::Scoring, race: None, text: "They punch it in! {player} with the finish." },
    // Contextual
    Prompt { category: PromptCategory::Contextual, race: None, text: "And that will do it. Hard-earned result in the dome tonight." },
    Prompt { category: PromptCategory::Contextual, race: None, text: "The final horn sounds. Plenty for both staffs to chew on." },
];

/// Indexes of all prompts in a category, optionally restricted to a race
/// variant.
pub fn prompt_indexes(category: PromptCategory, race: Option<Race>) -> Vec<u16> {
    PROMPTS
        .iter()
        .enumerate()
        .filter(|(_, p)| p.category == category && p.race == race)
        .map(|(i, _)| i as u16)
        .collect()
}

pub fn prompt_text(id: u16) -> &'static str {
    PROMPTS
        .get(id as usize)
        .map(|p| p.text)
        .unwrap_or("")
}
