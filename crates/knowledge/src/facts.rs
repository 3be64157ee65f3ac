//! The static fact sheet: organizational knowledge that never depends on I/O.
//!
//! It ships with the built-in STEMpower sheet. Deployments can point
//! `knowledge.facts_path` at a TOML file; any field the file leaves out keeps
//! its built-in value.

use serde::{Deserialize, Serialize};
use std::path::Path;
use stemchat_core::error::{Error, Result};

use crate::snapshot::ProgramCategory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFacts {
    pub organization: String,
    pub mission: String,
    pub vision: String,
    pub programs: ProgramFacts,
    /// What a student taking part in the programs gets
    pub student_benefits: Vec<String>,
    pub impact: Vec<ImpactStat>,
    pub offices: Vec<Office>,
    pub website: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramFacts {
    pub stem_centers: ProgramFact,
    pub fablab: ProgramFact,
    pub entrepreneurship: ProgramFact,
    pub broadcast: ProgramFact,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramFact {
    pub name: String,
    pub description: String,
    pub features: Vec<String>,
}

impl ProgramFact {
    pub fn is_empty(&self) -> bool {
        self.description.trim().is_empty() && self.features.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactStat {
    pub label: String,
    pub value: u64,
    #[serde(default)]
    pub suffix: String,
}

impl ImpactStat {
    fn new(label: &str, value: u64, suffix: &str) -> Self {
        Self {
            label: label.into(),
            value,
            suffix: suffix.into(),
        }
    }

    /// The value with thousands separators and its suffix, e.g. `1,500,000+`.
    pub fn display_value(&self) -> String {
        let digits = self.value.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        format!("{grouped}{}", self.suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Office {
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// The four programs the static sheet describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    StemCenters,
    FabLab,
    Entrepreneurship,
    Broadcast,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 4] = [
        ProgramKind::StemCenters,
        ProgramKind::FabLab,
        ProgramKind::Entrepreneurship,
        ProgramKind::Broadcast,
    ];

    /// The database program collection matching this program, if any.
    pub fn category(&self) -> Option<ProgramCategory> {
        match self {
            ProgramKind::StemCenters => Some(ProgramCategory::Center),
            ProgramKind::FabLab => Some(ProgramCategory::Fabrication),
            ProgramKind::Entrepreneurship => Some(ProgramCategory::Entrepreneurship),
            ProgramKind::Broadcast => None,
        }
    }
}

impl ProgramFacts {
    pub fn get(&self, kind: ProgramKind) -> &ProgramFact {
        match kind {
            ProgramKind::StemCenters => &self.stem_centers,
            ProgramKind::FabLab => &self.fablab,
            ProgramKind::Entrepreneurship => &self.entrepreneurship,
            ProgramKind::Broadcast => &self.broadcast,
        }
    }
}

impl StaticFacts {
    /// Load a fact sheet from a TOML file, filling gaps from the built-in sheet.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read fact sheet {}: {e}", path.display()),
        })?;
        toml::from_str(&content).map_err(|e| Error::Config {
            message: format!("cannot parse fact sheet {}: {e}", path.display()),
        })
    }

    /// Whether the sheet says anything at all about the organization.
    pub fn has_content(&self) -> bool {
        !self.mission.trim().is_empty()
            || ProgramKind::ALL
                .iter()
                .any(|k| !self.programs.get(*k).is_empty())
            || !self.impact.is_empty()
            || !self.offices.is_empty()
    }

    /// A sheet with every field blank. Useful to exercise the generic
    /// fallbacks of the answer engine.
    pub fn blank() -> Self {
        Self {
            organization: String::new(),
            mission: String::new(),
            vision: String::new(),
            programs: ProgramFacts {
                stem_centers: ProgramFact::default(),
                fablab: ProgramFact::default(),
                entrepreneurship: ProgramFact::default(),
                broadcast: ProgramFact::default(),
            },
            student_benefits: Vec::new(),
            impact: Vec::new(),
            offices: Vec::new(),
            website: String::new(),
        }
    }
}

impl Default for ProgramFacts {
    fn default() -> Self {
        Self {
            stem_centers: ProgramFact {
                name: "STEM Centers".into(),
                description: "STEM Centers are hands-on science, technology, engineering and \
                    mathematics labs hosted by universities, where primary and secondary school \
                    students learn by doing experiments, building projects and competing in \
                    science fairs."
                    .into(),
                features: vec![
                    "Fully equipped physics, chemistry, biology and electronics labs".into(),
                    "Trained university student facilitators and mentors".into(),
                    "After-school and weekend sessions for nearby schools".into(),
                    "Regional and national science fairs".into(),
                ],
            },
            fablab: ProgramFact {
                name: "FabLab".into(),
                description: "The FabLab is a digital fabrication laboratory with 3D printers, \
                    laser cutters, CNC machines and electronics workbenches where students, \
                    makers and innovators turn ideas into working prototypes."
                    .into(),
                features: vec![
                    "3D printing and laser cutting".into(),
                    "CNC milling and electronics prototyping".into(),
                    "Training on design and fabrication tools".into(),
                    "Open access for student and community projects".into(),
                ],
            },
            entrepreneurship: ProgramFact {
                name: "Entrepreneurship & Incubation".into(),
                description: "The entrepreneurship program helps young innovators turn STEM \
                    projects into sustainable businesses through incubation, business training, \
                    mentorship and access to prototyping facilities."
                    .into(),
                features: vec![
                    "Startup incubation and business development support".into(),
                    "Mentorship from industry professionals".into(),
                    "Innovation challenges and pitch competitions".into(),
                ],
            },
            broadcast: ProgramFact {
                name: "STEM TV & Media".into(),
                description: "STEM TV brings science education to homes and classrooms through \
                    broadcast television programs and online video, reaching students far \
                    beyond the centers."
                    .into(),
                features: vec![
                    "Televised science lessons and experiments".into(),
                    "Online video library for teachers and students".into(),
                ],
            },
        }
    }
}

impl Default for StaticFacts {
    fn default() -> Self {
        Self {
            organization: "STEMpower".into(),
            mission: "STEMpower empowers young people through hands-on science, technology, \
                engineering and mathematics (STEM) education, digital fabrication and \
                entrepreneurship, so they can solve real problems in their communities."
                .into(),
            vision: "A generation of young problem solvers driving innovation and economic \
                growth in Africa."
                .into(),
            programs: ProgramFacts::default(),
            student_benefits: vec![
                "Free access to hands-on STEM labs and equipment".into(),
                "Guidance from trained facilitators and mentors".into(),
                "Project-based learning and science fair participation".into(),
                "Access to FabLab tools to build prototypes".into(),
                "A path into entrepreneurship and incubation support".into(),
            ],
            impact: vec![
                ImpactStat::new("STEM Centers established", 60, "+"),
                ImpactStat::new("students reached", 1_500_000, "+"),
                ImpactStat::new("teachers and facilitators trained", 10_000, "+"),
                ImpactStat::new("FabLabs and makerspaces", 5, ""),
                ImpactStat::new("startups supported", 100, "+"),
            ],
            offices: vec![
                Office {
                    name: "Ethiopia Office".into(),
                    address: "Addis Ababa, Ethiopia".into(),
                    phone: Some("+251 11 667 0050".into()),
                    email: Some("info@stempower.org".into()),
                },
                Office {
                    name: "US Office".into(),
                    address: "Boston, Massachusetts, USA".into(),
                    phone: None,
                    email: Some("contact@stempower.org".into()),
                },
            ],
            website: "https://www.stempower.org".into(),
        }
    }
}
