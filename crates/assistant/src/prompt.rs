//! System prompt construction.
//!
//! The prompt carries the organization's knowledge as plain sections so the
//! model can answer from it. Database records are scrubbed of placeholder
//! content first; the static fact sheet goes in as is.

use std::fmt::Write;
use stemchat_knowledge::{
    FeedItem, KnowledgeSnapshot, ProgramCategory, ProgramKind, StaticFacts, scrub, scrub_all,
};

/// Build the system prompt for one reply.
pub fn build_system_prompt(
    organization_name: &str,
    snapshot: &KnowledgeSnapshot,
    language: Option<&str>,
) -> String {
    let name = organization_name.trim();
    let mut prompt = format!(
        "You are the assistant on the {name} website. Answer visitors' questions about \
         {name} using only the knowledge below. Be friendly and concise. Write plain text \
         without markdown formatting. If the knowledge does not cover a question, say so \
         and suggest contacting {name} directly."
    );

    if let Some(language) = language.map(str::trim).filter(|l| !l.is_empty()) {
        let _ = write!(prompt, "\n\nReply in this language: {language}.");
    }

    prompt.push_str("\n\n# Knowledge\n");
    prompt.push_str(&format_snapshot(snapshot));
    prompt
}

/// Render a snapshot as titled plain-text sections, skipping empty ones.
pub fn format_snapshot(snapshot: &KnowledgeSnapshot) -> String {
    let mut sections: Vec<String> = Vec::new();

    format_facts(&snapshot.static_facts, &mut sections);

    if let Some(profile) = snapshot.organization_profile.as_ref().and_then(scrub) {
        let mut lines = Vec::new();
        if let Some(title) = profile.title {
            lines.push(title);
        }
        if let Some(description) = profile.description {
            lines.push(description);
        }
        if let Some(mission) = profile.mission {
            lines.push(format!("Mission: {mission}"));
        }
        if let Some(vision) = profile.vision {
            lines.push(format!("Vision: {vision}"));
        }
        if !profile.values.is_empty() {
            lines.push(format!("Core values: {}", profile.values.join(", ")));
        }
        push_section(&mut sections, "About us (website)", lines);
    }

    for category in ProgramCategory::ALL {
        let lines = scrub_all(snapshot.programs.get(category))
            .into_iter()
            .filter_map(|entry| {
                let title = entry.title?;
                let mut line = format!("- {title}");
                if let Some(kind) = entry.kind {
                    let _ = write!(line, " [{kind}]");
                }
                if let Some(description) = entry.description {
                    let _ = write!(line, ": {description}");
                }
                Some(line)
            })
            .collect();
        push_section(&mut sections, &capitalize(category.label()), lines);
    }

    let events = scrub_all(&snapshot.events)
        .into_iter()
        .filter_map(|event| {
            let title = event.title?;
            let mut line = format!("- {title}");
            if let Some(date) = event.start_date {
                let _ = write!(line, " ({})", date.format("%Y-%m-%d"));
            }
            if let Some(description) = event.description {
                let _ = write!(line, ": {description}");
            }
            Some(line)
        })
        .collect();
    push_section(&mut sections, "Upcoming events", events);

    push_section(&mut sections, "Announcements", feed_lines(&snapshot.announcements));
    push_section(&mut sections, "Latest news", feed_lines(&snapshot.news));

    if let Some(contact) = snapshot.contact.as_ref().and_then(scrub) {
        let lines = [
            contact.address.map(|a| format!("Address: {a}")),
            contact.email.map(|e| format!("Email: {e}")),
            contact.phone.map(|p| format!("Phone: {p}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        push_section(&mut sections, "Contact (website)", lines);
    }

    sections.join("\n\n")
}

fn format_facts(facts: &StaticFacts, sections: &mut Vec<String>) {
    let mut about = Vec::new();
    if !facts.organization.trim().is_empty() {
        about.push(format!("Organization: {}", facts.organization.trim()));
    }
    if !facts.mission.trim().is_empty() {
        about.push(format!("Mission: {}", facts.mission.trim()));
    }
    if !facts.vision.trim().is_empty() {
        about.push(format!("Vision: {}", facts.vision.trim()));
    }
    if !facts.website.trim().is_empty() {
        about.push(format!("Website: {}", facts.website.trim()));
    }
    push_section(sections, "Organization", about);

    for kind in ProgramKind::ALL {
        let fact = facts.programs.get(kind);
        if fact.is_empty() {
            continue;
        }
        let mut lines = Vec::new();
        if !fact.description.trim().is_empty() {
            lines.push(fact.description.trim().to_string());
        }
        lines.extend(fact.features.iter().map(|f| format!("- {f}")));
        let title = if fact.name.trim().is_empty() {
            "Program"
        } else {
            fact.name.trim()
        };
        push_section(sections, title, lines);
    }

    push_section(
        sections,
        "Student benefits",
        facts.student_benefits.iter().map(|b| format!("- {b}")).collect(),
    );
    push_section(
        sections,
        "Impact",
        facts
            .impact
            .iter()
            .map(|stat| format!("- {} {}", stat.display_value(), stat.label))
            .collect(),
    );
    push_section(
        sections,
        "Offices",
        facts
            .offices
            .iter()
            .map(|office| {
                let mut line = format!("- {}: {}", office.name, office.address);
                if let Some(phone) = &office.phone {
                    let _ = write!(line, ", phone {phone}");
                }
                if let Some(email) = &office.email {
                    let _ = write!(line, ", email {email}");
                }
                line
            })
            .collect(),
    );
}

fn feed_lines(items: &[FeedItem]) -> Vec<String> {
    scrub_all(items)
        .into_iter()
        .filter_map(|item| {
            let title = item.title?;
            Some(match item.description {
                Some(description) => format!("- {title}: {description}"),
                None => format!("- {title}"),
            })
        })
        .collect()
}

fn push_section(sections: &mut Vec<String>, title: &str, lines: Vec<String>) {
    if lines.is_empty() {
        return;
    }
    sections.push(format!("## {title}\n{}", lines.join("\n")));
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stemchat_knowledge::{EventEntry, OrganizationProfile, ProgramEntry};

    fn snapshot() -> KnowledgeSnapshot {
        KnowledgeSnapshot::static_only(Arc::new(StaticFacts::default()))
    }

    #[test]
    fn prompt_names_the_organization_and_embeds_facts() {
        let prompt = build_system_prompt("STEMpower", &snapshot(), None);
        assert!(prompt.starts_with("You are the assistant on the STEMpower website."));
        assert!(prompt.contains("## FabLab"));
        assert!(prompt.contains("- 1,500,000+ students reached"));
        assert!(prompt.contains("Ethiopia Office: Addis Ababa, Ethiopia"));
        assert!(!prompt.contains("Reply in this language"));
    }

    #[test]
    fn language_line_only_when_given() {
        let prompt = build_system_prompt("STEMpower", &snapshot(), Some("Amharic"));
        assert!(prompt.contains("Reply in this language: Amharic."));

        let prompt = build_system_prompt("STEMpower", &snapshot(), Some("  "));
        assert!(!prompt.contains("Reply in this language"));
    }

    #[test]
    fn database_records_are_scrubbed() {
        let mut snapshot = snapshot();
        snapshot.organization_profile = Some(OrganizationProfile {
            title: Some("lorem ipsum".into()),
            description: Some("Hands-on science for every school".into()),
            ..Default::default()
        });
        snapshot.programs.center_programs = vec![
            ProgramEntry {
                title: Some("Weekend physics club".into()),
                description: Some("Experiments with light and motion".into()),
                kind: Some("after school".into()),
            },
            ProgramEntry {
                title: Some("dummy".into()),
                description: None,
                kind: None,
            },
        ];
        snapshot.events = vec![EventEntry {
            title: Some("placeholder".into()),
            ..Default::default()
        }];

        let text = format_snapshot(&snapshot);
        assert!(text.contains("Hands-on science for every school"));
        assert!(!text.contains("lorem"));
        assert!(text.contains("## STEM center programs\n- Weekend physics club [after school]: Experiments"));
        assert!(!text.contains("dummy"));
        assert!(!text.contains("## Upcoming events"));
    }

    #[test]
    fn empty_facts_leave_no_empty_sections() {
        let snapshot = KnowledgeSnapshot::static_only(Arc::new(StaticFacts::blank()));
        assert_eq!(format_snapshot(&snapshot), "");
    }
}
