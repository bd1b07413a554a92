use chrono::NaiveDate;
use std::str::FromStr;

use crate::error::Error;
use crate::retriever::VideoMetadata;
use crate::storage::models::ExtraType;
use crate::text;

pub const RESOLUTION_BUCKETS: [u32; 8] = [144, 240, 360, 480, 720, 1080, 1440, 2160];

/// Views below this are not trusted and are raised to it.
const MIN_VIEW_COUNT: u64 = 100;

/// Numeric candidate attributes that rules and priority orders refer to by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Duration,
    ViewCount,
    AverageRating,
    AdjustedRating,
    Resolution,
    ResolutionRatio,
    ViewsPerDay,
    Width,
    Height,
}

impl FromStr for Attribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "duration" => Ok(Attribute::Duration),
            "view_count" => Ok(Attribute::ViewCount),
            "average_rating" => Ok(Attribute::AverageRating),
            "adjusted_rating" => Ok(Attribute::AdjustedRating),
            "resolution" => Ok(Attribute::Resolution),
            "resolution_ratio" => Ok(Attribute::ResolutionRatio),
            "views_per_day" => Ok(Attribute::ViewsPerDay),
            "width" => Ok(Attribute::Width),
            "height" => Ok(Attribute::Height),
            other => Err(Error::InvalidRule(format!("unknown attribute '{}'", other))),
        }
    }
}

/// A discovered video with its derived ranking metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub url: String,
    /// Normalized with [`text::clean`].
    pub title: String,
    pub extra_type: ExtraType,
    pub duration: Option<f64>,
    pub uploader: String,
    /// Floored to 100.
    pub view_count: u64,
    pub average_rating: f64,
    pub adjusted_rating: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub resolution: u32,
    pub resolution_ratio: f64,
    pub upload_date: Option<NaiveDate>,
    pub views_per_day: f64,
    /// `None` when the platform did not report tags at all.
    pub tags: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    pub format: Option<String>,
}

impl Candidate {
    pub fn from_metadata(metadata: VideoMetadata, extra_type: ExtraType, today: NaiveDate) -> Self {
        let view_count = metadata.view_count.unwrap_or(0).max(MIN_VIEW_COUNT);
        let average_rating = metadata.average_rating.unwrap_or(0.0);
        let upload_date = metadata.upload_date.as_deref().and_then(parse_upload_date);
        let resolution_ratio = match (metadata.width, metadata.height) {
            (Some(w), Some(h)) if h > 0 => w as f64 / h as f64,
            _ => 1.0,
        };
        let url = metadata
            .webpage_url
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", metadata.id));

        Self {
            title: text::clean(metadata.title.as_deref().unwrap_or_default()),
            extra_type,
            duration: metadata.duration,
            uploader: metadata.uploader.unwrap_or_default(),
            view_count,
            average_rating,
            adjusted_rating: adjusted_rating(average_rating, view_count),
            width: metadata.width,
            height: metadata.height,
            resolution: resolution_bucket(metadata.width, metadata.height),
            resolution_ratio,
            upload_date,
            views_per_day: views_per_day(view_count, upload_date, today),
            tags: metadata.tags,
            categories: metadata.categories,
            format: metadata.format,
            id: metadata.id,
            url,
        }
    }

    /// First-party uploads come without any category.
    pub fn is_official_trailer(&self) -> bool {
        self.categories.as_ref().map_or(true, |c| c.is_empty())
    }

    /// Attribute value for rules and ordering; absent values count as 0.
    pub fn attribute(&self, attribute: Attribute) -> f64 {
        match attribute {
            Attribute::Duration => self.duration.unwrap_or(0.0),
            Attribute::ViewCount => self.view_count as f64,
            Attribute::AverageRating => self.average_rating,
            Attribute::AdjustedRating => self.adjusted_rating,
            Attribute::Resolution => self.resolution as f64,
            Attribute::ResolutionRatio => self.resolution_ratio,
            Attribute::ViewsPerDay => self.views_per_day,
            Attribute::Width => self.width.unwrap_or(0) as f64,
            Attribute::Height => self.height.unwrap_or(0) as f64,
        }
    }
}

/// Rating discounted by how few people produced it.
pub fn adjusted_rating(average_rating: f64, view_count: u64) -> f64 {
    if view_count == 0 {
        return 0.0;
    }
    average_rating * (1.0 - 1.0 / (view_count as f64 / 60.0).sqrt())
}

/// Discrete vertical resolution. The larger of the height and the 16:9 height of
/// the width is inflated by 20% and rounded down to the nearest bucket.
pub fn resolution_bucket(width: Option<u32>, height: Option<u32>) -> u32 {
    let (Some(width), Some(height)) = (width, height) else {
        return RESOLUTION_BUCKETS[0];
    };
    let scaled_width = (width as f64 / 16.0 * 9.0) as u32;
    let inflated = height.max(scaled_width) as f64 * 1.2;

    RESOLUTION_BUCKETS
        .iter()
        .rev()
        .find(|bucket| (**bucket as f64) <= inflated)
        .copied()
        .unwrap_or(RESOLUTION_BUCKETS[0])
}

pub fn views_per_day(view_count: u64, upload_date: Option<NaiveDate>, today: NaiveDate) -> f64 {
    match upload_date {
        Some(date) => {
            let days = (today - date).num_days() as f64;
            view_count as f64 / (365.0 + days)
        }
        None => 0.0,
    }
}

pub fn parse_upload_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y%m%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_adjusted_rating_formula() {
        assert_eq!(adjusted_rating(5.0, 60), 0.0);
        let rating = adjusted_rating(4.0, 6000);
        assert!((rating - 3.6).abs() < 1e-9, "got {}", rating);
        assert_eq!(adjusted_rating(0.0, 1_000_000), 0.0);
    }

    #[test]
    fn test_low_view_counts_are_floored() {
        let metadata = VideoMetadata {
            id: "abc".to_string(),
            title: Some("Some Trailer".to_string()),
            view_count: Some(60),
            average_rating: Some(5.0),
            ..Default::default()
        };
        let candidate = Candidate::from_metadata(metadata, ExtraType::Trailers, today());
        assert_eq!(candidate.view_count, 100);
        assert_eq!(candidate.adjusted_rating, adjusted_rating(5.0, 100));

        let candidate = Candidate::from_metadata(VideoMetadata::default(), ExtraType::Trailers, today());
        assert_eq!(candidate.view_count, 100);
        assert_eq!(candidate.average_rating, 0.0);
        assert_eq!(candidate.adjusted_rating, 0.0);
    }

    #[test]
    fn test_resolution_buckets() {
        assert_eq!(resolution_bucket(Some(1800), Some(1000)), 1080);
        assert_eq!(resolution_bucket(Some(1920), Some(1080)), 1080);
        assert_eq!(resolution_bucket(Some(1280), Some(720)), 720);
        assert_eq!(resolution_bucket(Some(1920), Some(800)), 1080);
        assert_eq!(resolution_bucket(Some(3840), Some(2160)), 2160);
        assert_eq!(resolution_bucket(Some(100), Some(50)), 144);
        assert_eq!(resolution_bucket(None, Some(1080)), 144);
    }

    #[test]
    fn test_views_per_day() {
        let uploaded = NaiveDate::from_ymd_opt(2026, 10, 9).unwrap();
        assert_eq!(views_per_day(3750, Some(uploaded), today()), 10.0);
        assert_eq!(views_per_day(3750, None, today()), 0.0);
    }

    #[test]
    fn test_derived_fields_from_metadata() {
        let metadata = VideoMetadata {
            id: "YoHD9XEInc0".to_string(),
            webpage_url: Some("https://www.youtube.com/watch?v=YoHD9XEInc0".to_string()),
            title: Some("Inception - Official Trailer [HD]".to_string()),
            duration: Some(148.0),
            uploader: Some("Warner Bros. Pictures".to_string()),
            view_count: Some(6000),
            average_rating: Some(4.0),
            width: Some(1920),
            height: Some(1080),
            upload_date: Some("20100510".to_string()),
            tags: Some(vec!["inception".to_string()]),
            categories: Some(Vec::new()),
            format: Some("137 - 1920x1080".to_string()),
        };
        let candidate = Candidate::from_metadata(metadata, ExtraType::Trailers, today());

        assert_eq!(candidate.title, "inception official trailer hd");
        assert_eq!(candidate.resolution, 1080);
        assert!((candidate.resolution_ratio - 16.0 / 9.0).abs() < 1e-9);
        assert!(candidate.views_per_day > 0.0);
        assert!(candidate.is_official_trailer());
        assert_eq!(candidate.attribute(Attribute::Duration), 148.0);
    }

    #[test]
    fn test_attribute_names() {
        assert_eq!("views_per_day".parse::<Attribute>().unwrap(), Attribute::ViewsPerDay);
        assert!("popularity".parse::<Attribute>().is_err());
    }
}
