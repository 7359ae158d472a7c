// Prompt envelope: the final text handed to a provider.
// Task-specific templates live in agents::prompts; this file only frames them.

/// Appended to every prompt that expects machine-parsed output.
/// Models still break this rule regularly, hence `extract.rs`.
pub const JSON_ONLY_DIRECTIVE: &str = "Respond with a single well-formed JSON object only. \
    Do NOT wrap it in markdown code fences. \
    Do NOT include any text, explanation or apology before or after the JSON.";

const SECTION_SEPARATOR: &str = "\n\n";

/// Builds the user turn for providers that carry the persona in a dedicated
/// system role.
pub fn build_user_turn(task_prompt: &str, wants_structured_output: bool) -> String {
    build(None, task_prompt, wants_structured_output)
}

/// Builds a self-contained prompt: persona, task instructions and, when
/// structured output is wanted, the JSON-only directive, in that order.
/// Used directly by providers without a system role.
pub fn build(
    system_instruction: Option<&str>,
    task_prompt: &str,
    wants_structured_output: bool,
) -> String {
    let mut sections: Vec<&str> = Vec::with_capacity(3);

    if let Some(system) = system_instruction.map(str::trim).filter(|s| !s.is_empty()) {
        sections.push(system);
    }
    sections.push(task_prompt.trim());
    if wants_structured_output {
        sections.push(JSON_ONLY_DIRECTIVE);
    }

    sections.join(SECTION_SEPARATOR)
}
