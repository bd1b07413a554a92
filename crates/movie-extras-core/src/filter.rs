use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::{debug, info};

use crate::candidate::{Attribute, Candidate};
use crate::error::Error;
use crate::extra_config::FilteringConfig;
use crate::storage::models::FolderRecord;
use crate::text;

/// Candidates this long or longer are never extras.
pub const MAX_DURATION_SECS: f64 = 200.0;

/// Drop candidates that fail any hard constraint, logging every reason.
pub fn apply_hard_filters(
    candidates: Vec<Candidate>,
    record: &FolderRecord,
    filtering: &FilteringConfig,
) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|candidate| {
            let reasons = hard_filter_reasons(candidate, record, filtering);
            log_removal(candidate, &reasons)
        })
        .collect()
}

/// Reduced rule set for the official trailer pool.
pub fn apply_play_trailer_filters(
    candidates: Vec<Candidate>,
    record: &FolderRecord,
) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|candidate| {
            let reasons = play_trailer_reasons(candidate, record);
            log_removal(candidate, &reasons)
        })
        .collect()
}

/// Returns true when the candidate survives.
fn log_removal(candidate: &Candidate, reasons: &[String]) -> bool {
    if reasons.is_empty() {
        return true;
    }
    info!(
        "Video \"{}\" was removed. reasons: {}",
        candidate.url,
        reasons.join(", ")
    );
    false
}

pub fn hard_filter_reasons(
    candidate: &Candidate,
    record: &FolderRecord,
    filtering: &FilteringConfig,
) -> Vec<String> {
    let mut reasons = Vec::new();
    let title = candidate.title.to_lowercase();

    if candidate.duration.unwrap_or(0.0) >= MAX_DURATION_SECS {
        reasons.push("long video".to_string());
    }

    if record.is_banned_source(&candidate.id) {
        reasons.push("banned video id".to_string());
    }

    if let Some(reason) = banned_year_reason(candidate, &record.banned_years) {
        reasons.push(reason);
    }

    let tolerance = keyword_tolerance(record.banned_title_keywords.len(), 3, 10);
    if banned_keyword_hits(&title, &record.banned_title_keywords) > tolerance {
        reasons.push("containing banned similar title keywords".to_string());
    }

    if !filtering.required_phrases.is_empty()
        && !filtering
            .required_phrases
            .iter()
            .any(|phrase| title.contains(&phrase.to_lowercase()))
    {
        reasons.push("not containing any required phrase".to_string());
    }

    if filtering
        .banned_phrases
        .iter()
        .any(|phrase| title.contains(&phrase.to_lowercase()))
    {
        reasons.push("containing a banned phrase".to_string());
    }

    let uploader = candidate.uploader.to_lowercase();
    if filtering
        .banned_channels
        .iter()
        .any(|channel| channel.to_lowercase() == uploader)
    {
        reasons.push("made by a banned channel".to_string());
    }

    if filtering.require_title_match && !title_matches(&title, record, true) {
        reasons.push("not containing title".to_string());
    }

    reasons
}

pub fn play_trailer_reasons(candidate: &Candidate, record: &FolderRecord) -> Vec<String> {
    let mut reasons = Vec::new();
    let title = candidate.title.to_lowercase();

    if let Some(reason) = banned_year_reason(candidate, &record.banned_years) {
        reasons.push(reason);
    }

    let tolerance = keyword_tolerance(record.banned_title_keywords.len(), 3, 6);
    if banned_keyword_hits(&title, &record.banned_title_keywords) > tolerance {
        reasons.push("containing banned similar title keywords".to_string());
    }

    if !title_matches(&title, record, false) {
        reasons.push("not containing title".to_string());
    }

    reasons
}

/// 0 for short keyword lists, 1 above `first`, 2 above `second`.
fn keyword_tolerance(count: usize, first: usize, second: usize) -> usize {
    if count > second {
        2
    } else if count > first {
        1
    } else {
        0
    }
}

fn banned_keyword_hits(title: &str, banned: &[String]) -> usize {
    banned
        .iter()
        .filter(|keyword| text::contains_word(title, keyword))
        .count()
}

/// A tag list the platform did not report cannot prove the year is absent.
fn banned_year_reason(candidate: &Candidate, banned_years: &[i32]) -> Option<String> {
    let title = candidate.title.to_lowercase();
    for year in banned_years {
        let year = year.to_string();
        if title.contains(&year) {
            return Some("containing banned year in title".to_string());
        }
        match &candidate.tags {
            Some(tags) if tags.iter().any(|tag| tag.to_lowercase().contains(&year)) => {
                return Some("containing banned year in tags".to_string());
            }
            Some(_) => {}
            None => return Some("unable to confirm year not in tags".to_string()),
        }
    }
    None
}

/// Whether the candidate title carries the folder's title or original title,
/// allowing a few keywords to be missing on long titles.
fn title_matches(title: &str, record: &FolderRecord, whole_words: bool) -> bool {
    let title_tolerance = keyword_tolerance(record.title_keywords.len(), 3, 7);
    if keywords_present(title, &record.title_keywords, title_tolerance, whole_words) {
        return true;
    }
    if record.original_title.is_some() {
        let tolerance = record.original_title_keywords.len() / 4;
        return keywords_present(title, &record.original_title_keywords, tolerance, whole_words);
    }
    false
}

fn keywords_present(
    title: &str,
    keywords: &BTreeSet<String>,
    tolerance: usize,
    whole_words: bool,
) -> bool {
    let missing = keywords
        .iter()
        .filter(|keyword| {
            if whole_words {
                !text::contains_word(title, keyword)
            } else {
                !title.contains(keyword.as_str())
            }
        })
        .count();
    missing <= tolerance
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Keep,
    Remove,
}

/// One user-configured soft filter, written as
/// `<min|max>_<relative|absolute>_<attribute>=<value>` or
/// `<keep|remove>_<highest|lowest>_<attribute>=<count>`.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum FilterRule {
    Relative {
        bound: Bound,
        attribute: Attribute,
        fraction: f64,
    },
    Absolute {
        bound: Bound,
        attribute: Attribute,
        threshold: f64,
    },
    Highest {
        selection: Selection,
        attribute: Attribute,
        count: usize,
    },
    Lowest {
        selection: Selection,
        attribute: Attribute,
        count: usize,
    },
}

impl FromStr for FilterRule {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidRule(raw.to_string());

        let (directive, value) = raw.split_once('=').ok_or_else(invalid)?;
        let value: f64 = value.trim().parse().map_err(|_| invalid())?;

        let mut parts: Vec<&str> = directive.trim().split('_').collect();
        if parts.len() > 3 && parts.last().is_some_and(|p| p.parse::<u32>().is_ok()) {
            parts.pop();
        }
        if parts.len() < 3 {
            return Err(invalid());
        }
        let attribute: Attribute = parts[2..].join("_").parse()?;

        let bound = || match parts[0] {
            "min" => Ok(Bound::Min),
            "max" => Ok(Bound::Max),
            _ => Err(invalid()),
        };
        let selection = || match parts[0] {
            "keep" => Ok(Selection::Keep),
            "remove" => Ok(Selection::Remove),
            _ => Err(invalid()),
        };
        let count = || {
            if value >= 0.0 && value.fract() == 0.0 {
                Ok(value as usize)
            } else {
                Err(invalid())
            }
        };

        match parts[1] {
            "relative" => Ok(FilterRule::Relative {
                bound: bound()?,
                attribute,
                fraction: value,
            }),
            "absolute" => Ok(FilterRule::Absolute {
                bound: bound()?,
                attribute,
                threshold: value,
            }),
            "highest" => Ok(FilterRule::Highest {
                selection: selection()?,
                attribute,
                count: count()?,
            }),
            "lowest" => Ok(FilterRule::Lowest {
                selection: selection()?,
                attribute,
                count: count()?,
            }),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for FilterRule {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl FilterRule {
    pub fn apply(&self, pool: Vec<Candidate>) -> Vec<Candidate> {
        match *self {
            FilterRule::Relative {
                bound,
                attribute,
                fraction,
            } => keep_relative(pool, bound, attribute, fraction),
            FilterRule::Absolute {
                bound,
                attribute,
                threshold,
            } => keep_within(pool, bound, attribute, threshold),
            FilterRule::Highest {
                selection,
                attribute,
                count,
            } => select_ranked(pool, selection, attribute, count, true),
            FilterRule::Lowest {
                selection,
                attribute,
                count,
            } => select_ranked(pool, selection, attribute, count, false),
        }
    }
}

fn keep_within(pool: Vec<Candidate>, bound: Bound, attribute: Attribute, limit: f64) -> Vec<Candidate> {
    pool.into_iter()
        .filter(|candidate| {
            let value = candidate.attribute(attribute);
            match bound {
                Bound::Min => value >= limit,
                Bound::Max => value <= limit,
            }
        })
        .collect()
}

fn keep_relative(
    pool: Vec<Candidate>,
    bound: Bound,
    attribute: Attribute,
    fraction: f64,
) -> Vec<Candidate> {
    let max_value = pool
        .iter()
        .map(|candidate| candidate.attribute(attribute))
        .fold(f64::NEG_INFINITY, f64::max);
    keep_within(pool, bound, attribute, max_value * fraction)
}

fn select_ranked(
    mut pool: Vec<Candidate>,
    selection: Selection,
    attribute: Attribute,
    count: usize,
    highest_first: bool,
) -> Vec<Candidate> {
    pool.sort_by(|a, b| {
        let ordering = a
            .attribute(attribute)
            .partial_cmp(&b.attribute(attribute))
            .unwrap_or(Ordering::Equal);
        if highest_first {
            ordering.reverse()
        } else {
            ordering
        }
    });

    match selection {
        Selection::Keep => {
            pool.truncate(count);
            pool
        }
        Selection::Remove if pool.len() > count => pool.split_off(count),
        Selection::Remove => Vec::new(),
    }
}

/// Evaluate each rule group against the whole pool, stopping at the first group
/// whose survivors (plus `reserved_slots`) reach `break_limit`. If no group gets
/// there, the last group's survivors are used.
pub fn apply_custom_filters(
    pool: &[Candidate],
    groups: &[Vec<FilterRule>],
    break_limit: usize,
    reserved_slots: usize,
) -> Vec<Candidate> {
    let mut survivors = pool.to_vec();

    for (index, group) in groups.iter().enumerate() {
        survivors = group
            .iter()
            .fold(pool.to_vec(), |working, rule| rule.apply(working));
        debug!(
            "Custom filter group {} kept {} of {} candidates",
            index + 1,
            survivors.len(),
            pool.len()
        );
        if survivors.len() + reserved_slots >= break_limit {
            break;
        }
    }

    survivors
}
