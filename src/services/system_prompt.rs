//! System prompt rendering from the configured persona.

use crate::domain::models::PersonaConfig;

/// Skills beyond this many are left out to keep the prompt short enough for
/// small local models.
const MAX_SKILLS: usize = 10;

/// Render the system prompt for a persona.
///
/// A persona with nothing but a name gets a one-line prompt.
pub fn render_system_prompt(persona: &PersonaConfig) -> String {
    let has_details = persona.tagline.is_some()
        || persona.owner.is_some()
        || persona.tone.is_some()
        || persona.prefix.is_some()
        || !persona.rules.is_empty()
        || !persona.skills.is_empty();
    if !has_details {
        return format!("You are {}, a local AI assistant.", persona.name);
    }

    let mut lines = vec![format!("You are {}.", persona.name)];
    if let Some(tagline) = &persona.tagline {
        lines.push(format!("Tagline: {tagline}"));
    }
    if let Some(owner) = &persona.owner {
        lines.push(format!("Owner: {owner}"));
    }

    let mut rules = Vec::new();
    if let Some(prefix) = &persona.prefix {
        rules.push(format!("Address the user as \"{prefix}\""));
    }
    if let Some(tone) = &persona.tone {
        rules.push(format!("Keep a {tone} tone"));
    }
    rules.extend(persona.rules.iter().cloned());
    if !rules.is_empty() {
        lines.push(String::new());
        lines.push("Core Rules:".to_string());
        lines.extend(rules.into_iter().map(|rule| format!("- {rule}")));
    }

    if !persona.skills.is_empty() {
        let skills: Vec<&str> = persona
            .skills
            .iter()
            .take(MAX_SKILLS)
            .map(String::as_str)
            .collect();
        lines.push(String::new());
        lines.push(format!("Skills: {}", skills.join(", ")));
    }

    lines.join("\n").trim().to_string()
}

/// Wrap a user-level prompt in the system prompt and chat framing.
pub fn render_full_prompt(system_prompt: &str, prompt: &str) -> String {
    format!("{system_prompt}\n\nUser: {prompt}\n\nAssistant:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_persona_gets_one_liner() {
        let persona = PersonaConfig::default();
        assert_eq!(
            render_system_prompt(&persona),
            "You are Hello Zombie, a local AI assistant."
        );
    }

    #[test]
    fn test_full_persona_renders_sections() {
        let persona = PersonaConfig {
            name: "ZombieCoder".to_string(),
            tagline: Some("Where code speaks".to_string()),
            owner: Some("Developer Zone".to_string()),
            tone: Some("friendly, truthful".to_string()),
            prefix: Some("Bhaiya".to_string()),
            rules: vec!["Explain the logic before coding".to_string()],
            skills: (0..12).map(|i| format!("skill{i}")).collect(),
            ..PersonaConfig::default()
        };

        let prompt = render_system_prompt(&persona);
        assert!(prompt.starts_with(
            "You are ZombieCoder.\nTagline: Where code speaks\nOwner: Developer Zone"
        ));
        assert!(prompt.contains("- Address the user as \"Bhaiya\""));
        assert!(prompt.contains("- Keep a friendly, truthful tone"));
        assert!(prompt.contains("- Explain the logic before coding"));
        assert!(prompt.contains("skill9"));
        assert!(!prompt.contains("skill10"));
    }

    #[test]
    fn test_full_prompt_framing() {
        assert_eq!(
            render_full_prompt("SYS", "What is 2+2?"),
            "SYS\n\nUser: What is 2+2?\n\nAssistant:"
        );
    }
}
