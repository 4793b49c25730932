//! Build prompts from battle context
//!
//! The provider gets the acting character's persona, the numbers that
//! matter, the skill list with risk tags, and a bounded slice of recent
//! dialogue. The reply contract (speak in character, end with a
//! `[SKILL:<id>]` directive) lives in the system prompt.

use crate::decision::provider::DecisionRequest;

/// System prompt for an in-character battle decision
pub fn system_prompt(request: &DecisionRequest) -> String {
    let actor = &request.actor;
    let mut s = String::new();

    s.push_str(&format!(
        "You are roleplaying the character \"{}\" in a turn-based battle.\n",
        actor.name
    ));
    if !actor.personality.is_empty() {
        s.push_str(&format!("Personality: {}\n", actor.personality));
    }
    if !actor.speaking_style.is_empty() {
        s.push_str(&format!("Speaking style: {}\n", actor.speaking_style));
    }

    if let Some(persona) = &request.persona {
        s.push_str(&format!(
            "\nThe commander fighting alongside you:\n- Name: {}\n- Personality: {}\n\
             Address them naturally when it fits.\n",
            persona.name, persona.personality
        ));
    }

    s.push_str(&format!(
        "\nBattle status:\n- Turn: {}\n- Your HP: {}/{}\n- Enemy ({}) HP: {}/{}\n",
        request.turn,
        actor.current_hp,
        actor.max_hp,
        request.opponent.name,
        request.opponent.current_hp,
        request.opponent.max_hp
    ));

    s.push_str("\nAvailable skills:\n");
    for skill in &actor.skills {
        let risk = skill
            .risk
            .map(|r| format!(" | risk: {:?}", r).to_lowercase())
            .unwrap_or_default();
        s.push_str(&format!(
            "- ID: {} | Name: {} | {}{}\n",
            skill.id, skill.name, skill.description, risk
        ));
    }

    s.push_str(
        "\nYour task:\n\
         1. Reply in character, briefly - two or three sentences at most.\n\
         2. Decide which skill to use, weighing the commander's order against the situation.\n\
         3. Keep continuity with the recent conversation.\n\
         \n\
         Output format: plain text reply, then a final line with the skill directive, exactly:\n\
         [SKILL:skill_id]\n\
         \n\
         Example:\n\
         Leave it to me, partner. This one won't get back up.\n\
         [SKILL:prism_slash]\n",
    );

    s
}

/// The user-role message carrying the command itself
pub fn user_message(request: &DecisionRequest) -> String {
    match &request.free_text {
        Some(text) => format!("Commander's order: \"{}\"", text),
        None => "No explicit order this turn. Choose the best action yourself.".into(),
    }
}

/// Recent history as (role, content) chat pairs, oldest first
pub fn history_messages(request: &DecisionRequest) -> Vec<(&'static str, String)> {
    request
        .history
        .iter()
        .map(|line| {
            let role = if line.from_player { "user" } else { "assistant" };
            (role, line.text.clone())
        })
        .collect()
}
