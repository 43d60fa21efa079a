//! Discovered remote files and asset selection.

use std::fmt;

use isokeep_version::Version;

use crate::error::SourceError;

/// One discovered remote file. Ephemeral, produced per resolution run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub name: String,
    pub version: Option<Version>,
    pub edition: Option<String>,
    pub arch: Option<String>,
    pub lang: Option<String>,
}

impl Candidate {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let name = url
            .rsplit('/')
            .next()
            .unwrap_or(url.as_str())
            .to_string();
        Self {
            url,
            name,
            version: None,
            edition: None,
            arch: None,
            lang: None,
        }
    }

    /// Tag this candidate with whichever known edition/arch/lang values
    /// appear in its file name. Unknown axes stay untagged.
    pub fn infer_tags(
        mut self,
        editions: &[String],
        archs: &[String],
        langs: &[String],
    ) -> Self {
        let lower = self.name.to_lowercase();
        self.edition = find_tag(&lower, editions);
        self.arch = find_tag(&lower, archs);
        self.lang = find_tag(&lower, langs);
        self
    }
}

fn find_tag(name_lower: &str, known: &[String]) -> Option<String> {
    // Longest value first so "ubuntu-mate" never tags as "mate"'s
    // shorter sibling by accident.
    let mut sorted: Vec<&String> = known.iter().collect();
    sorted.sort_by_key(|v| std::cmp::Reverse(v.len()));
    sorted
        .into_iter()
        .find(|v| name_lower.contains(&v.to_lowercase()))
        .cloned()
}

/// Selection axes narrowing which asset variant of a title to fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCriteria {
    pub edition: Option<String>,
    pub arch: Option<String>,
    pub lang: Option<String>,
}

impl SelectionCriteria {
    pub fn is_empty(&self) -> bool {
        self.edition.is_none() && self.arch.is_none() && self.lang.is_none()
    }
}

impl fmt::Display for SelectionCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(e) = &self.edition {
            parts.push(format!("edition={e}"));
        }
        if let Some(a) = &self.arch {
            parts.push(format!("arch={a}"));
        }
        if let Some(l) = &self.lang {
            parts.push(format!("lang={l}"));
        }
        if parts.is_empty() {
            f.write_str("(none)")
        } else {
            f.write_str(&parts.join(","))
        }
    }
}

fn tag_matches(tag: &Option<String>, wanted: &Option<String>) -> bool {
    match wanted {
        None => true,
        Some(w) => tag
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(w)),
    }
}

/// Pick exactly one candidate satisfying every non-empty criterion.
///
/// Zero survivors is a configuration or upstream-catalog problem; more
/// than one means the criteria are too loose, and guessing would risk
/// downloading the wrong artifact.
pub fn select(
    candidates: Vec<Candidate>,
    criteria: &SelectionCriteria,
) -> Result<Candidate, SourceError> {
    let mut matching: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| {
            tag_matches(&c.edition, &criteria.edition)
                && tag_matches(&c.arch, &criteria.arch)
                && tag_matches(&c.lang, &criteria.lang)
        })
        .collect();

    match matching.len() {
        0 => Err(SourceError::NoMatch {
            criteria: criteria.to_string(),
        }),
        1 => Ok(matching.remove(0)),
        n => Err(SourceError::Ambiguous {
            criteria: criteria.to_string(),
            count: n,
        }),
    }
}
