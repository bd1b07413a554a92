use std::cmp::Ordering;
use std::str::FromStr;
use tracing::info;

use crate::candidate::{Attribute, Candidate};
use crate::error::Error;
use crate::storage::models::FolderRecord;

/// Seconds a general candidate may run longer than the official trailer.
const MERGE_LOWER_SLACK: f64 = 23.0;
/// Seconds a general candidate may run shorter than the official trailer.
const MERGE_UPPER_SLACK: f64 = 5.0;

/// Sort key written as `highest_<attribute>` or `lowest_<attribute>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct PriorityOrder {
    pub attribute: Attribute,
    pub descending: bool,
}

impl FromStr for PriorityOrder {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (direction, attribute) = raw
            .trim()
            .split_once('_')
            .ok_or_else(|| Error::InvalidRule(raw.to_string()))?;
        let descending = match direction {
            "highest" => true,
            "lowest" => false,
            _ => return Err(Error::InvalidRule(raw.to_string())),
        };
        Ok(Self {
            attribute: attribute.parse()?,
            descending,
        })
    }
}

impl TryFrom<String> for PriorityOrder {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

/// How the official trailer pool takes part in the final selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub disable_play_trailers: bool,
    pub only_play_trailers: bool,
}

/// Stable sort by `order`, then move preferred channels to the front.
pub fn order_candidates(
    mut pool: Vec<Candidate>,
    order: PriorityOrder,
    preferred_channels: &[String],
) -> Vec<Candidate> {
    pool.sort_by(|a, b| {
        let ordering = a
            .attribute(order.attribute)
            .partial_cmp(&b.attribute(order.attribute))
            .unwrap_or(Ordering::Equal);
        if order.descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    let (mut preferred, others): (Vec<_>, Vec<_>) = pool
        .into_iter()
        .partition(|candidate| preferred_channels.contains(&candidate.uploader));
    preferred.extend(others);
    preferred
}

/// Most viewed official trailer first.
pub fn order_play_trailers(mut pool: Vec<Candidate>) -> Vec<Candidate> {
    pool.sort_by(|a, b| b.view_count.cmp(&a.view_count));
    pool
}

/// Combine the ranked general pool with the ranked official trailer pool.
/// Returns `None` when only official trailers are wanted and there are none.
pub fn select(
    general: Vec<Candidate>,
    play_trailers: &[Candidate],
    policy: SelectionPolicy,
    record: &FolderRecord,
) -> Option<Vec<Candidate>> {
    let mut selection = general;

    if !policy.disable_play_trailers {
        if let (Some(top), Some(trailer)) = (selection.first(), play_trailers.first()) {
            if same_trailer(top, trailer) {
                info!("Picked official trailer {}", trailer.url);
                selection.insert(0, trailer.clone());
            }
        }
    }

    if policy.only_play_trailers {
        selection = vec![play_trailers.first()?.clone()];
    }

    if selection.is_empty() && !play_trailers.is_empty() && !policy.disable_play_trailers {
        selection = play_trailers.to_vec();
    }

    selection.retain(|candidate| !record.is_banned_source(&candidate.id));
    Some(selection)
}

/// Durations close enough that both are taken to be the same cut.
fn same_trailer(general: &Candidate, trailer: &Candidate) -> bool {
    match (general.duration, trailer.duration) {
        (Some(general), Some(trailer)) => {
            general - MERGE_LOWER_SLACK <= trailer && trailer <= general + MERGE_UPPER_SLACK
        }
        _ => false,
    }
}
