//! Answer templates for the intent rules.
//!
//! Static facts come first; scrubbed database records fill in when the fact
//! sheet is silent, and a hardcoded sentence is the last resort.

use std::fmt::Write;
use stemchat_knowledge::{ProgramFact, ProgramKind, StaticFacts};

use super::Knowledge;
use super::rules::Topic;

const MAX_PROGRAM_ENTRIES: usize = 3;
const MAX_EVENTS: usize = 5;

pub(super) fn program_slug(kind: ProgramKind) -> &'static str {
    match kind {
        ProgramKind::StemCenters => "stem_centers",
        ProgramKind::FabLab => "fablab",
        ProgramKind::Entrepreneurship => "entrepreneurship",
        ProgramKind::Broadcast => "broadcast",
    }
}

fn org(k: &Knowledge) -> &str {
    let name = k.organization_name.trim();
    if !name.is_empty() {
        return name;
    }
    let name = k.facts.organization.trim();
    if !name.is_empty() { name } else { "our organization" }
}

fn website_line(facts: &StaticFacts) -> Option<String> {
    let site = facts.website.trim();
    (!site.is_empty()).then(|| format!("Learn more at {site}."))
}

fn push_website(out: &mut String, facts: &StaticFacts) {
    if let Some(line) = website_line(facts) {
        let _ = write!(out, "\n\n{line}");
    }
}

fn program_name(fact: &ProgramFact, kind: ProgramKind) -> String {
    if !fact.name.trim().is_empty() {
        return fact.name.clone();
    }
    match kind {
        ProgramKind::StemCenters => "STEM Centers".into(),
        ProgramKind::FabLab => "FabLab".into(),
        ProgramKind::Entrepreneurship => "Entrepreneurship".into(),
        ProgramKind::Broadcast => "STEM Media".into(),
    }
}

pub(super) fn student(k: &Knowledge) -> String {
    let name = org(k);
    if k.facts.student_benefits.is_empty() {
        return format!(
            "As a student, {name} gives you hands-on access to science, technology, \
             engineering and mathematics. You can take part in lab sessions, build \
             projects with mentors, join science fairs and competitions, and learn skills \
             that prepare you for university and work. Ask a teacher or contact {name} to \
             find the program nearest to you."
        );
    }

    let mut out = format!("As a student, here is what {name} offers you:\n");
    for benefit in &k.facts.student_benefits {
        let _ = write!(out, "\n- {benefit}");
    }
    let centers = &k.facts.programs.stem_centers;
    if !centers.description.trim().is_empty() {
        let _ = write!(out, "\n\n{}", centers.description.trim());
    }
    push_website(&mut out, &k.facts);
    out
}

pub(super) fn overview(k: &Knowledge) -> String {
    let facts = &k.facts;
    let name = org(k);

    if facts.has_content() {
        let mut out = String::new();
        if !facts.mission.trim().is_empty() {
            out.push_str(facts.mission.trim());
        } else {
            let _ = write!(out, "Here is an overview of {name}.");
        }

        let programs: Vec<String> = ProgramKind::ALL
            .iter()
            .map(|kind| (*kind, facts.programs.get(*kind)))
            .filter(|(_, fact)| !fact.description.trim().is_empty())
            .map(|(kind, fact)| format!("- {}: {}", program_name(fact, kind), fact.description.trim()))
            .collect();
        if !programs.is_empty() {
            let _ = write!(out, "\n\nWhat we do:\n{}", programs.join("\n"));
        }

        if !facts.impact.is_empty() {
            let _ = write!(out, "\n\nOur impact so far:\n{}", impact_lines(facts));
        }

        if !facts.offices.is_empty() {
            let _ = write!(out, "\n\nWhere to find us:\n{}", office_lines(facts));
        }

        push_website(&mut out, facts);
        return out;
    }

    if let Some(profile) = &k.profile {
        let mut parts = Vec::new();
        if let Some(description) = &profile.description {
            parts.push(description.clone());
        }
        if let Some(mission) = &profile.mission {
            parts.push(format!("Our mission: {mission}"));
        }
        if let Some(vision) = &profile.vision {
            parts.push(format!("Our vision: {vision}"));
        }
        if !profile.values.is_empty() {
            parts.push(format!("Our values: {}", profile.values.join(", ")));
        }
        if !parts.is_empty() {
            let title = profile.title.as_deref().unwrap_or(name);
            return format!("{title}\n\n{}", parts.join("\n\n"));
        }
    }

    format!(
        "{name} is a non-profit organization that promotes science, technology, \
         engineering and mathematics (STEM) education. We run hands-on learning centers, \
         digital fabrication labs and entrepreneurship programs that help young people \
         turn ideas into solutions for their communities."
    )
}

pub(super) fn program(k: &Knowledge, kind: ProgramKind) -> Option<String> {
    let fact = k.facts.programs.get(kind);
    let name = program_name(fact, kind);
    let mut out = String::new();

    if !fact.description.trim().is_empty() {
        let _ = write!(out, "{name}\n\n{}", fact.description.trim());
    }
    if !fact.features.is_empty() {
        if out.is_empty() {
            out.push_str(&name);
        }
        out.push_str("\n\nWhat it offers:");
        for feature in &fact.features {
            let _ = write!(out, "\n- {feature}");
        }
    }

    if let Some(category) = kind.category() {
        let entries: Vec<String> = k
            .programs
            .get(category)
            .iter()
            .filter_map(|entry| {
                let title = entry.title.as_deref()?;
                Some(match entry.description.as_deref() {
                    Some(description) => format!("- {title}: {description}"),
                    None => format!("- {title}"),
                })
            })
            .take(MAX_PROGRAM_ENTRIES)
            .collect();
        if !entries.is_empty() {
            if out.is_empty() {
                let _ = write!(out, "{name}");
            }
            let _ = write!(out, "\n\nCurrent {}:\n{}", category.label(), entries.join("\n"));
        }
    }

    if out.is_empty() {
        return None;
    }
    push_website(&mut out, &k.facts);
    Some(out)
}

pub(super) fn events(k: &Knowledge) -> Option<String> {
    let lines: Vec<String> = k
        .events
        .iter()
        .filter_map(|event| {
            let title = event.title.as_deref()?;
            let mut line = format!("- {title}");
            if let Some(date) = event.start_date {
                let _ = write!(line, " ({})", date.format("%B %-d, %Y"));
            }
            if let Some(description) = event.description.as_deref() {
                let _ = write!(line, ": {description}");
            }
            Some(line)
        })
        .take(MAX_EVENTS)
        .collect();

    if lines.is_empty() {
        return None;
    }
    Some(format!(
        "Here are the upcoming {} events:\n{}",
        org(k),
        lines.join("\n")
    ))
}

pub(super) fn impact(k: &Knowledge) -> Option<String> {
    if k.facts.impact.is_empty() {
        return None;
    }
    Some(format!(
        "{}'s impact so far:\n{}",
        org(k),
        impact_lines(&k.facts)
    ))
}

pub(super) fn topic(k: &Knowledge, topic: Topic) -> String {
    let name = org(k);
    let mut out = match topic {
        Topic::Volunteering => format!(
            "We welcome volunteers! You can support {name} as a mentor, lab facilitator \
             or event helper at one of our STEM Centers. Share your skills and availability \
             with our team and we will match you with a center near you."
        ),
        Topic::Donations => format!(
            "Thank you for considering a gift to {name}. Donations equip STEM labs, train \
             facilitators and bring hands-on science to more students. You can donate \
             through our website or contact our team to discuss sponsorship."
        ),
        Topic::Partnerships => format!(
            "{name} partners with universities, companies, governments and foundations \
             to host STEM Centers, run FabLabs and support young innovators. Reach out to \
             our team to explore a partnership."
        ),
        Topic::Joining => format!(
            "To join a {name} program, contact the STEM Center or FabLab nearest to you, \
             or watch our announcements for open applications to workshops, competitions \
             and incubation programs."
        ),
        Topic::Language => format!(
            "I can answer in English, and the website can be translated into other \
             languages such as Amharic. Ask your question in the language you prefer and \
             {name} will do its best to help."
        ),
    };
    push_website(&mut out, &k.facts);
    out
}

pub(super) fn greeting(k: &Knowledge) -> String {
    format!(
        "Hello! I'm the {} assistant. Ask me about our STEM Centers, the FabLab, \
         entrepreneurship programs, upcoming events, or how to get involved.",
        org(k)
    )
}

pub(super) fn gratitude(k: &Knowledge) -> String {
    format!(
        "You're welcome! Let me know if there is anything else you would like to know \
         about {}.",
        org(k)
    )
}

pub(super) fn contact(k: &Knowledge) -> String {
    let name = org(k);
    if !k.facts.offices.is_empty() {
        let mut out = format!("You can reach {name} here:\n{}", office_lines(&k.facts));
        push_website(&mut out, &k.facts);
        return out;
    }

    if let Some(contact) = &k.contact {
        let mut lines = Vec::new();
        if let Some(address) = &contact.address {
            lines.push(format!("- Address: {address}"));
        }
        if let Some(email) = &contact.email {
            lines.push(format!("- Email: {email}"));
        }
        if let Some(phone) = &contact.phone {
            lines.push(format!("- Phone: {phone}"));
        }
        if !lines.is_empty() {
            return format!("You can reach {name} here:\n{}", lines.join("\n"));
        }
    }

    format!("You can reach {name} through the contact form on our website.")
}

pub(super) fn menu(k: &Knowledge) -> String {
    if !k.has_facts() {
        return capabilities(k);
    }

    let name = org(k);
    let mut out = format!(
        "I'm not sure I understood that, but I can tell you about {name}. You can ask about:\n"
    );
    out.push_str("\n- What we do and our mission");
    for kind in ProgramKind::ALL {
        let fact = k.facts.programs.get(kind);
        if !fact.is_empty() {
            let _ = write!(out, "\n- {}", program_name(fact, kind));
        }
    }
    if !k.events.is_empty() {
        out.push_str("\n- Upcoming events");
    }
    if !k.facts.impact.is_empty() {
        out.push_str("\n- Our impact");
    }
    out.push_str("\n- Volunteering, donating and partnerships");
    out.push_str("\n- How to contact us");
    out
}

pub(super) fn capabilities(k: &Knowledge) -> String {
    format!(
        "I'm the {} assistant. I can answer questions about our mission, programs, \
         events, and how to volunteer, donate, partner with us or get in touch.",
        org(k)
    )
}

fn impact_lines(facts: &StaticFacts) -> String {
    facts
        .impact
        .iter()
        .map(|stat| format!("- {} {}", stat.display_value(), stat.label))
        .collect::<Vec<_>>()
        .join("\n")
}

fn office_lines(facts: &StaticFacts) -> String {
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
        .collect::<Vec<_>>()
        .join("\n")
}
