use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use super::{MediaInfo, MetadataService};
use crate::error::Error;
use crate::storage::models::FolderRecord;
use crate::text;

/// First cinema screening; anything earlier in a folder name is not a year.
const EARLIEST_RELEASE_YEAR: i32 = 1896;
/// How many search hits are considered when matching on release year.
const YEAR_MATCH_WINDOW: usize = 5;
/// How many near-neighbor titles feed the banned keyword/year sets.
const NEIGHBOR_LIMIT: usize = 10;

/// Maps a folder to a canonical title, year and id, plus the keywords and
/// years of confusable titles.
pub struct MetadataResolver<'a> {
    service: &'a dyn MetadataService,
    current_year: i32,
}

impl<'a> MetadataResolver<'a> {
    pub fn new(service: &'a dyn MetadataService, current_year: i32) -> Self {
        Self {
            service,
            current_year,
        }
    }

    /// Fill the title, year, id and banned sets of `record`. An id that fails to
    /// resolve falls back to searching by the folder name.
    pub fn resolve(&self, record: &mut FolderRecord, known_id: Option<u64>) -> Result<(), Error> {
        let mut resolved = false;
        let mut neighbors = None;

        if let Some(id) = known_id {
            match self.service.details(id, record.media_type) {
                Ok(info) if info.title.is_some() => {
                    apply_media_info(record, &info);
                    resolved = true;
                }
                Ok(_) => warn!("Details for id {} have no title, searching by name", id),
                Err(e) => warn!("Lookup of id {} failed ({}), searching by name", id, e),
            }
        }

        if !resolved {
            let (title, year) = title_and_year_from_folder(&record.name, self.current_year);
            record.title = title;
            record.release_year = year;

            let results = self.service.search(&record.title, record.media_type)?;
            let info = choose_match(&results, year).ok_or_else(|| {
                Error::MetadataNotFound(format!("nothing found for '{}'", record.title))
            })?;
            apply_media_info(record, info);
            neighbors = Some(results);
        }

        info!(
            "Resolved '{}' to '{}' ({}) id {:?}",
            record.name,
            record.title,
            record
                .release_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "unknown year".to_string()),
            record.tmdb_id
        );

        let neighbors = match neighbors {
            Some(neighbors) => neighbors,
            None => match self.service.search(&record.title, record.media_type) {
                Ok(neighbors) => neighbors,
                Err(e) => {
                    warn!("Could not fetch similar titles for '{}': {}", record.title, e);
                    Vec::new()
                }
            },
        };
        derive_banned_sets(record, &neighbors);
        Ok(())
    }
}

/// Keywords and years of titles that share a keyword with the record but are
/// not the record itself.
fn derive_banned_sets(record: &mut FolderRecord, neighbors: &[MediaInfo]) {
    record.banned_title_keywords.clear();
    record.banned_years.clear();

    let own_keywords: BTreeSet<String> = record
        .title_keywords
        .union(&record.original_title_keywords)
        .cloned()
        .collect();

    for neighbor in neighbors
        .iter()
        .filter(|n| Some(n.id) != record.tmdb_id)
        .take(NEIGHBOR_LIMIT)
    {
        let Some(title) = neighbor.title.as_deref() else {
            continue;
        };
        let neighbor_keywords = text::keywords(title);
        if neighbor_keywords.is_disjoint(&own_keywords) {
            continue;
        }

        for keyword in neighbor_keywords.difference(&own_keywords) {
            if !record.banned_title_keywords.contains(keyword) {
                record.banned_title_keywords.push(keyword.clone());
            }
        }

        if let Some(year) = neighbor.release_year() {
            if Some(year) != record.release_year
                && !record.title.contains(&year.to_string())
                && !record.banned_years.contains(&year)
            {
                record.banned_years.push(year);
            }
        }
    }

    debug!(
        "Banned keywords for '{}': {:?}, banned years: {:?}",
        record.title, record.banned_title_keywords, record.banned_years
    );
}

/// Split a trailing release year off a folder name, e.g. "Inception 2010".
pub fn title_and_year_from_folder(name: &str, current_year: i32) -> (String, Option<i32>) {
    let cleaned = text::clean(name);
    let mut tokens: Vec<&str> = cleaned.split(' ').collect();

    let year = tokens
        .last()
        .filter(|token| token.len() == 4)
        .and_then(|token| token.parse::<i32>().ok())
        .filter(|year| (EARLIEST_RELEASE_YEAR..=current_year + 1).contains(year));

    if year.is_some() && tokens.len() > 1 {
        tokens.pop();
        (tokens.join(" "), year)
    } else {
        (cleaned.clone(), None)
    }
}

/// Pick the search hit that best matches `year`: an exact year, then a release
/// that slipped across new year (Sep-Dec of the year before, Jan-Apr of the
/// year after), then any neighboring year, and finally the top hit.
pub fn choose_match(results: &[MediaInfo], year: Option<i32>) -> Option<&MediaInfo> {
    let first = results.first()?;
    let Some(year) = year else {
        return Some(first);
    };

    let window = &results[..results.len().min(YEAR_MATCH_WINDOW)];

    if let Some(exact) = window.iter().find(|r| r.release_year() == Some(year)) {
        return Some(exact);
    }

    let slipped = window.iter().find(|r| {
        match (r.release_year(), r.release_month()) {
            (Some(y), Some(m)) if y == year - 1 => (9..=12).contains(&m),
            (Some(y), Some(m)) if y == year + 1 => (1..=4).contains(&m),
            _ => false,
        }
    });
    if slipped.is_some() {
        return slipped;
    }

    if let Some(neighbor) = window
        .iter()
        .find(|r| matches!(r.release_year(), Some(y) if (y - year).abs() == 1))
    {
        info!("None of the search results had a correct release year, picking the next best result");
        return Some(neighbor);
    }

    Some(first)
}

fn apply_media_info(record: &mut FolderRecord, info: &MediaInfo) {
    let title = info.title.clone().unwrap_or_else(|| record.title.clone());
    let original_title = info.original_title.clone().unwrap_or_else(|| title.clone());

    record.tmdb_id = Some(info.id);
    record.title = text::clean(&title);
    record.original_title = Some(text::clean(&original_title));
    record.title_keywords = text::keywords(&title);
    record.original_title_keywords = text::keywords(&original_title);
    record.release_year = info.release_year();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::LinkedVideo;
    use crate::storage::models::MediaType;
    use std::cell::Cell;
    use std::path::Path;

    fn info(id: u64, title: &str, date: &str) -> MediaInfo {
        MediaInfo {
            id,
            title: Some(title.to_string()),
            original_title: Some(title.to_string()),
            release_date: Some(date.to_string()),
        }
    }

    struct FakeService {
        search_results: Vec<MediaInfo>,
        details: Option<MediaInfo>,
        searches: Cell<usize>,
    }

    impl MetadataService for FakeService {
        fn search(&self, _query: &str, _media_type: MediaType) -> Result<Vec<MediaInfo>, Error> {
            self.searches.set(self.searches.get() + 1);
            Ok(self.search_results.clone())
        }

        fn details(&self, id: u64, _media_type: MediaType) -> Result<MediaInfo, Error> {
            self.details
                .clone()
                .ok_or_else(|| Error::MetadataNotFound(format!("id {}", id)))
        }

        fn linked_videos(&self, _id: u64, _media_type: MediaType) -> Result<Vec<LinkedVideo>, Error> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_year_split_from_folder_name() {
        assert_eq!(
            title_and_year_from_folder("Inception (2010)", 2026),
            ("inception".to_string(), Some(2010))
        );
        assert_eq!(
            title_and_year_from_folder("Blade Runner 2049", 2026),
            ("blade runner 2049".to_string(), None)
        );
        assert_eq!(
            title_and_year_from_folder("1917", 2026),
            ("1917".to_string(), None)
        );
        assert_eq!(
            title_and_year_from_folder("Metropolis 1895", 2026),
            ("metropolis 1895".to_string(), None)
        );
    }

    #[test]
    fn test_exact_year_beats_earlier_neighbor() {
        let results = vec![
            info(1, "Dune", "1984-12-14"),
            info(2, "Dune", "2021-09-15"),
        ];
        assert_eq!(choose_match(&results, Some(2021)).unwrap().id, 2);
    }

    #[test]
    fn test_release_slip_across_new_year() {
        let results = vec![
            info(1, "Heat", "2013-06-01"),
            info(2, "Heat", "1995-12-15"),
        ];
        assert_eq!(choose_match(&results, Some(1996)).unwrap().id, 2);

        let results = vec![info(3, "Heat", "1997-02-01")];
        assert_eq!(choose_match(&results, Some(1996)).unwrap().id, 3);
    }

    #[test]
    fn test_neighbor_year_fallback_then_first() {
        let results = vec![
            info(1, "Solaris", "1972-03-20"),
            info(2, "Solaris", "2002-07-01"),
        ];
        assert_eq!(choose_match(&results, Some(2001)).unwrap().id, 2);
        assert_eq!(choose_match(&results, Some(1990)).unwrap().id, 1);
        assert_eq!(choose_match(&results, None).unwrap().id, 1);
        assert!(choose_match(&[], Some(1990)).is_none());
    }

    #[test]
    fn test_match_only_considers_first_five() {
        let mut results: Vec<MediaInfo> = (1..=5).map(|i| info(i, "Alien", "1950-01-01")).collect();
        results.push(info(6, "Alien", "1979-05-25"));
        assert_eq!(choose_match(&results, Some(1979)).unwrap().id, 1);
    }

    #[test]
    fn test_resolve_by_folder_name_and_banned_sets() {
        let service = FakeService {
            search_results: vec![
                info(11, "Alien", "1979-05-25"),
                info(12, "Aliens", "1986-07-18"),
                info(13, "Alien: Covenant", "2017-05-19"),
                info(14, "Paddington", "2014-11-28"),
            ],
            details: None,
            searches: Cell::new(0),
        };
        let resolver = MetadataResolver::new(&service, 2026);
        let mut record = FolderRecord::new(Path::new("/m/Alien 1979"), MediaType::Movie);

        resolver.resolve(&mut record, None).unwrap();

        assert_eq!(record.tmdb_id, Some(11));
        assert_eq!(record.title, "alien");
        assert_eq!(record.release_year, Some(1979));
        assert_eq!(record.banned_title_keywords, vec!["covenant".to_string()]);
        assert_eq!(record.banned_years, vec![2017]);
        assert_eq!(service.searches.get(), 1);
    }

    #[test]
    fn test_known_id_uses_details() {
        let service = FakeService {
            search_results: vec![info(27205, "Inception", "2010-07-15")],
            details: Some(info(27205, "Inception", "2010-07-15")),
            searches: Cell::new(0),
        };
        let resolver = MetadataResolver::new(&service, 2026);
        let mut record = FolderRecord::new(Path::new("/m/whatever"), MediaType::Movie);

        resolver.resolve(&mut record, Some(27205)).unwrap();

        assert_eq!(record.tmdb_id, Some(27205));
        assert_eq!(record.title, "inception");
        assert!(record.title_keywords.contains("inception"));
        assert!(record.banned_title_keywords.is_empty());
        assert_eq!(service.searches.get(), 1);
    }

    #[test]
    fn test_failed_id_lookup_falls_back_to_search() {
        let service = FakeService {
            search_results: vec![info(5, "Heat", "1995-12-15")],
            details: None,
            searches: Cell::new(0),
        };
        let resolver = MetadataResolver::new(&service, 2026);
        let mut record = FolderRecord::new(Path::new("/m/Heat 1995"), MediaType::Movie);

        resolver.resolve(&mut record, Some(999)).unwrap();
        assert_eq!(record.tmdb_id, Some(5));
    }

    #[test]
    fn test_no_results_is_not_found() {
        let service = FakeService {
            search_results: Vec::new(),
            details: None,
            searches: Cell::new(0),
        };
        let resolver = MetadataResolver::new(&service, 2026);
        let mut record = FolderRecord::new(Path::new("/m/Nothing"), MediaType::Movie);

        let err = resolver.resolve(&mut record, None).unwrap_err();
        assert!(matches!(err, Error::MetadataNotFound(_)));
        assert!(record.tmdb_id.is_none());
    }
}
