//! Selection sets: domains and researcher types.

use serde::{Deserialize, Serialize};

/// Which of the two one-time selections a choice belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceKind {
    Domain,
    Researcher,
}

impl ChoiceKind {
    /// Prefix used in button custom ids.
    pub fn key(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Researcher => "researcher",
        }
    }

    /// Human-readable name, e.g. in "Invalid domain".
    pub fn noun(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Researcher => "researcher type",
        }
    }
}

/// Shared behaviour of the two label enums.
pub trait Choice: Copy + Eq + std::fmt::Debug + std::fmt::Display + Send + Sync + 'static {
    const KIND: ChoiceKind;
    const ALL: &'static [Self];

    /// Display label, also the accepted command argument.
    fn label(self) -> &'static str;

    /// Stable machine id used in button custom ids.
    fn slug(self) -> &'static str;

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.label() == label)
    }

    fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.slug() == slug)
    }

    /// Comma-separated labels, for "Choose from: ..." replies.
    fn label_list() -> String {
        Self::ALL
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Research domain. Exactly one may be held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    SocialScience,
    Management,
    CsMath,
    NaturalSciences,
}

impl Choice for Domain {
    const KIND: ChoiceKind = ChoiceKind::Domain;
    const ALL: &'static [Self] = &[
        Self::SocialScience,
        Self::Management,
        Self::CsMath,
        Self::NaturalSciences,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::SocialScience => "Social Science, Humanities, Arts",
            Self::Management => "Management",
            Self::CsMath => "CS/Math",
            Self::NaturalSciences => "Natural + Physical Sciences",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            Self::SocialScience => "social_science",
            Self::Management => "management",
            Self::CsMath => "cs_math",
            Self::NaturalSciences => "natural_sciences",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How involved the participant wants to be. Exactly one may be held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearcherType {
    Dedicated,
    Intermediate,
    Casual,
}

impl Choice for ResearcherType {
    const KIND: ChoiceKind = ChoiceKind::Researcher;
    const ALL: &'static [Self] = &[Self::Dedicated, Self::Intermediate, Self::Casual];

    fn label(self) -> &'static str {
        match self {
            Self::Dedicated => "Dedicated",
            Self::Intermediate => "Intermediate",
            Self::Casual => "Casual",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            Self::Dedicated => "dedicated",
            Self::Intermediate => "intermediate",
            Self::Casual => "casual",
        }
    }
}

impl std::fmt::Display for ResearcherType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single selection made from either prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Selection {
    Domain(Domain),
    Researcher(ResearcherType),
}

impl Selection {
    pub fn kind(&self) -> ChoiceKind {
        match self {
            Self::Domain(_) => ChoiceKind::Domain,
            Self::Researcher(_) => ChoiceKind::Researcher,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Domain(d) => d.label(),
            Self::Researcher(r) => r.label(),
        }
    }

    /// Encode as a button custom id: `domain:cs_math`, `researcher:casual`.
    pub fn custom_id(&self) -> String {
        let slug = match self {
            Self::Domain(d) => d.slug(),
            Self::Researcher(r) => r.slug(),
        };
        format!("{}:{slug}", self.kind().key())
    }

    /// Decode a button custom id. Unknown ids yield `None`.
    pub fn from_custom_id(custom_id: &str) -> Option<Self> {
        let (kind, slug) = custom_id.split_once(':')?;
        match kind {
            "domain" => Domain::from_slug(slug).map(Self::Domain),
            "researcher" => ResearcherType::from_slug(slug).map(Self::Researcher),
            _ => None,
        }
    }
}

impl From<Domain> for Selection {
    fn from(d: Domain) -> Self {
        Self::Domain(d)
    }
}

impl From<ResearcherType> for Selection {
    fn from(r: ResearcherType) -> Self {
        Self::Researcher(r)
    }
}
