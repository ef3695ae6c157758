//! Case-study content, loaded once at startup and never mutated.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::config::SiteConfig;
use crate::error::SiteError;

const BUILTIN: &str = include_str!("../static/data/case-studies.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKind {
    Solution,
    Calendar,
    Profile,
    Settings,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Solution,
        SectionKind::Calendar,
        SectionKind::Profile,
        SectionKind::Settings,
    ];

    /// DOM id stem, e.g. `case-study-calendar`.
    pub fn id_stem(self) -> &'static str {
        match self {
            Self::Solution => "case-study-solution",
            Self::Calendar => "case-study-calendar",
            Self::Profile => "case-study-profile",
            Self::Settings => "case-study-settings",
        }
    }
}

/// One illustrated sub-section: text, images, then optional follow-up text and images.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub kind: SectionKind,
    pub text: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub text_after: Option<String>,
    #[serde(default)]
    pub images_after: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudyRecord {
    pub company: String,
    pub role: String,
    pub title: String,
    pub subheading: Option<String>,
    pub logo: Option<String>,
    pub featured_image: Option<String>,
    /// Rich text (trusted HTML fragments).
    pub background: Option<String>,
    pub role_text: Option<String>,
    pub outcome: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Hides the headings of sections below the divider.
    #[serde(default)]
    pub hide_section_headings: bool,
}

impl CaseStudyRecord {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Every image URL in display order.
    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.featured_image
            .iter()
            .map(String::as_str)
            .chain(self.sections.iter().flat_map(|s| {
                s.images
                    .iter()
                    .chain(s.images_after.iter())
                    .map(String::as_str)
            }))
    }
}

/// Lookup from case-study id to record with a designated fallback.
#[derive(Debug, Clone)]
pub struct CaseStudyCatalog {
    records: BTreeMap<String, CaseStudyRecord>,
    fallback: String,
}

impl CaseStudyCatalog {
    pub fn from_json(raw: &str, fallback: &str) -> Result<Self, SiteError> {
        let records: BTreeMap<String, CaseStudyRecord> = serde_json::from_str(raw)?;
        if !records.contains_key(fallback) {
            return Err(SiteError::UnknownFallback(fallback.to_owned()));
        }
        Ok(Self {
            records,
            fallback: fallback.to_owned(),
        })
    }

    /// The catalog shipped in `static/data/case-studies.json`.
    pub fn builtin(fallback: &str) -> Result<Self, SiteError> {
        Self::from_json(BUILTIN, fallback)
    }

    /// The bundled catalog with the configured fallback. A fallback missing
    /// from the catalog is replaced by the stock default rather than failing boot.
    pub fn for_config(config: &SiteConfig) -> Result<Self, SiteError> {
        match Self::builtin(&config.default_case_study) {
            Err(SiteError::UnknownFallback(id)) => {
                let stock = SiteConfig::default().default_case_study;
                log::warn!("defaultCaseStudy `{id}` is not in the catalog; using `{stock}`");
                Self::builtin(&stock)
            }
            other => other,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Resolves `id`, substituting the fallback record for unknown ids.
    pub fn resolve<'a>(&'a self, id: &'a str) -> (&'a str, &'a CaseStudyRecord) {
        match self.records.get_key_value(id) {
            Some((key, record)) => (key.as_str(), record),
            None => {
                log::debug!("unknown case study `{id}`, using `{}`", self.fallback);
                (self.fallback.as_str(), &self.records[&self.fallback])
            }
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
