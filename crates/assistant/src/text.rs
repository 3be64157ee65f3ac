//! Markdown to plain text.
//!
//! LLMs and the answer templates both produce light markdown. The chat
//! widget shows plain text, so every reply goes through [`clean`].

use regex_lite::Regex;
use std::sync::LazyLock;

struct Patterns {
    link: Regex,
    heading: Regex,
    bullet: Regex,
    bold_stars: Regex,
    bold_underscores: Regex,
    italic_stars: Regex,
    italic_underscores: Regex,
    blank_runs: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex_lite::Error> {
        Ok(Self {
            link: Regex::new(r"\[([^\[\]]*)\]\([^()]*\)")?,
            heading: Regex::new(r"(?m)^[ \t]*#{1,6}(?:[ \t]+|$)")?,
            bullet: Regex::new(r"(?m)^([ \t]*)[*+][ \t]+")?,
            bold_stars: Regex::new(r"\*\*([^*\n]+)\*\*")?,
            bold_underscores: Regex::new(r"\b__([^_\n]+)__\b")?,
            italic_stars: Regex::new(r"\*([^*\s](?:[^*\n]*[^*\s])?)\*")?,
            italic_underscores: Regex::new(r"\b_([^_\s](?:[^_\n]*[^_\s])?)_\b")?,
            blank_runs: Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+")?,
        })
    }

    /// One rewrite pass. Every rule either shortens the text or turns a
    /// `*`/`+` bullet into `-`, which nothing turns back.
    fn pass(&self, text: &str) -> String {
        let text = self.link.replace_all(text, "$1");
        let text = self.heading.replace_all(&text, "");
        let text = self.bullet.replace_all(&text, "${1}- ");
        let text = self.bold_stars.replace_all(&text, "$1");
        let text = self.bold_underscores.replace_all(&text, "$1");
        let text = self.italic_stars.replace_all(&text, "$1");
        let text = self.italic_underscores.replace_all(&text, "$1");
        let text = self.blank_runs.replace_all(&text, "\n\n");
        text.trim().to_string()
    }
}

static PATTERNS: LazyLock<Result<Patterns, regex_lite::Error>> = LazyLock::new(Patterns::compile);

/// Strip emphasis, heading markers and links, keeping the readable text.
///
/// Idempotent: the rewrite pass is repeated until the text stops changing.
pub fn clean(text: &str) -> String {
    let Ok(patterns) = PATTERNS.as_ref() else {
        return text.trim().to_string();
    };

    let mut current = text.trim().to_string();
    loop {
        let next = patterns.pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}
