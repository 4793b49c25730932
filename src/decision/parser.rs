//! Parse skill directives out of model replies
//!
//! The provider asks the model to speak in character and finish with a
//! `[SKILL:<id>]` directive on its own line. Replies are messy: the tag
//! can appear mid-text, repeat, or be missing entirely, so extraction
//! is tolerant and the caller always has a fallback.

/// Split a raw reply into the chosen skill id (if any) and the
/// narrative with every directive removed. When several directives
/// appear, the last one wins.
pub fn extract_skill_tag(response: &str) -> (Option<String>, String) {
    let mut narrative = String::with_capacity(response.len());
    let mut skill = None;
    let mut rest = response;

    while let Some(start) = rest.find("[SKILL:") {
        narrative.push_str(&rest[..start]);
        let after = &rest[start + "[SKILL:".len()..];
        match after.find(']') {
            Some(end) => {
                let id = after[..end].trim();
                if !id.is_empty() {
                    skill = Some(id.to_string());
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated directive: drop it rather than reading
                // garbage into the narrative
                rest = "";
                break;
            }
        }
    }
    narrative.push_str(rest);

    (skill, narrative.trim().to_string())
}

/// Strip directives from a partial reply for display while streaming
pub fn strip_skill_tags(partial: &str) -> String {
    let (_, cleaned) = extract_skill_tag(partial);
    cleaned
}
