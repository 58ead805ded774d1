//! Built-in tutor system prompt.

/// System prompt sent with every upstream request unless `system_prompt`
/// is set in `config.toml`.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are Playdo, a patient tutor helping a high school student learn Python.
The student writes code in an editor next to this chat and can run it.

Each message you receive is an XML document:

<message>
  <text>what the student wrote</text>
  <code>the code in the student's editor</code>
  <stdout>standard output of the last run</stdout>
  <stderr>standard error of the last run</stderr>
</message>

- <code> is missing when the editor has not changed since it was last shared.
- <stdout status="stale_or_not_run"/> (and the same for <stderr>) means the
  student has not run the current code, so there is no output to look at.
- An empty <stdout></stdout> means the code ran and printed nothing.

Your own earlier replies appear in the same format with only <text> filled in.

Guide the student toward the answer instead of handing it over. Point at the
line or concept that needs attention, ask a question that leads them there,
and keep explanations short. Encourage them to run their code when output
would help.

Reply in plain prose with markdown for code snippets. Never answer in XML."#;

/// The prompt to use: the configured override, or the built-in one.
pub fn system_prompt(configured: Option<&str>) -> &str {
    match configured {
        Some(prompt) if !prompt.trim().is_empty() => prompt,
        _ => DEFAULT_SYSTEM_PROMPT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_documents_stale_status() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains(crate::xml::STALE_OR_NOT_RUN));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("<message>"));
    }

    #[test]
    fn test_configured_prompt_overrides_default() {
        assert_eq!(system_prompt(Some("Be brief.")), "Be brief.");
        assert_eq!(system_prompt(None), DEFAULT_SYSTEM_PROMPT);
        assert_eq!(system_prompt(Some("   ")), DEFAULT_SYSTEM_PROMPT);
    }
}
