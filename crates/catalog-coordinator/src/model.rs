//! Catalog Record Model (spec §4, §3, C3): the HTTP-boundary input type,
//! its canonicalization into a pure data record, and conversion to the
//! `catalog_sql` wire shape. Kept free of any database or network types so
//! canonicalization can be unit tested in isolation.

use catalog_sql::games::GameRow;
use catalog_sql::AppId;
use chrono::{DateTime, Utc};
use validator::Validate;

/// Validated at the HTTP boundary (spec §6: "Validation rejects records
/// missing name, release_date, required_age, price, about_game, or all
/// three platform flags false").
#[derive(Debug, Clone, serde::Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct GameInput {
    #[validate(length(min = 1))]
    pub name: String,
    pub release_date: String,
    pub required_age: i32,
    pub price: f64,
    #[validate(length(min = 1))]
    pub about_game: String,
    #[serde(default)]
    pub detailed_description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub reviews: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub support_url: String,
    #[serde(default)]
    pub support_email: String,
    #[serde(default)]
    pub header_image: String,
    pub windows: bool,
    pub mac: bool,
    pub linux: bool,
    #[serde(default)]
    pub metacritic_score: i32,
    #[serde(default)]
    pub metacritic_url: String,
    #[serde(default)]
    pub achievements: i32,
    #[serde(default)]
    pub recommendations: i32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub supported_languages: Vec<String>,
    #[serde(default)]
    pub full_audio_languages: Vec<String>,
    #[serde(default)]
    pub developers: Vec<String>,
    #[serde(default)]
    pub publishers: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub screenshots: Vec<String>,
    #[serde(default)]
    pub movies: Vec<String>,
    #[serde(default)]
    pub user_score: f64,
    #[serde(default)]
    pub score_rank: String,
    #[serde(default)]
    pub positive_reviews: i32,
    #[serde(default)]
    pub negative_reviews: i32,
    #[serde(default)]
    pub estimated_owners_min: i64,
    #[serde(default)]
    pub estimated_owners_max: i64,
    #[serde(default)]
    pub avg_playtime_forever: i32,
    #[serde(default)]
    pub avg_playtime_two_weeks: i32,
    #[serde(default)]
    pub median_playtime_forever: i32,
    #[serde(default)]
    pub median_playtime_two_weeks: i32,
    #[serde(default)]
    pub peak_ccu: i32,
    /// Tag -> weight. Serialized to text only at the persistence boundary
    /// (spec §9: "keep the wire/storage contract, represent in-memory as
    /// structured data").
    #[serde(default)]
    pub tags: std::collections::BTreeMap<String, i64>,
}

impl GameInput {
    /// spec §3: "at least one platform flag must be true at admission".
    /// `validator`'s derive can't express a cross-field OR, so this is
    /// checked separately by the caller before canonicalization.
    pub fn has_platform(&self) -> bool {
        self.windows || self.mac || self.linux
    }
}

/// The partition a platform combination routes to (spec §3 invariants,
/// §4.3 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    WindowsOnly,
    MultiPlatform,
    MasterOnly,
}

pub fn classify(windows: bool, mac: bool, linux: bool) -> Partition {
    if windows && !mac && !linux {
        Partition::WindowsOnly
    } else if windows && (mac || linux) {
        Partition::MultiPlatform
    } else {
        Partition::MasterOnly
    }
}

/// Canonical in-memory record (spec §3, §4.3 step 2): every nullable field
/// defaulted, multi-valued fields still a sequence (joined to text only by
/// `to_game_row`), tags still a map.
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub app_id: AppId,
    pub name: String,
    pub release_date: Option<DateTime<Utc>>,
    pub required_age: i32,
    pub price: f64,
    pub detailed_description: String,
    pub about_game: String,
    pub short_description: String,
    pub reviews: String,
    pub website: String,
    pub support_url: String,
    pub support_email: String,
    pub header_image: String,
    pub windows: bool,
    pub mac: bool,
    pub linux: bool,
    pub metacritic_score: i32,
    pub metacritic_url: String,
    pub achievements: i32,
    pub recommendations: i32,
    pub notes: String,
    pub supported_languages: Vec<String>,
    pub full_audio_languages: Vec<String>,
    pub developers: Vec<String>,
    pub publishers: Vec<String>,
    pub categories: Vec<String>,
    pub genres: Vec<String>,
    pub screenshots: Vec<String>,
    pub movies: Vec<String>,
    pub user_score: f64,
    pub score_rank: String,
    pub positive_reviews: i32,
    pub negative_reviews: i32,
    pub estimated_owners_min: i64,
    pub estimated_owners_max: i64,
    pub avg_playtime_forever: i32,
    pub avg_playtime_two_weeks: i32,
    pub median_playtime_forever: i32,
    pub median_playtime_two_weeks: i32,
    pub peak_ccu: i32,
    pub tags: std::collections::BTreeMap<String, i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Self-describing tag serialization (spec §3: "serialized as a
/// self-describing text blob"): `tag=weight` pairs joined by `;`, stable
/// (BTreeMap) ordering so the wire form is deterministic.
pub fn serialize_tags(tags: &std::collections::BTreeMap<String, i64>) -> String {
    tags.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(";")
}

pub fn parse_tags(raw: &str) -> std::collections::BTreeMap<String, i64> {
    raw.split(';')
        .filter(|s| !s.is_empty())
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            Some((k.to_string(), v.parse().ok()?))
        })
        .collect()
}

impl GameRecord {
    /// Builds a canonical record from a validated input and a
    /// coordinator-assigned id (spec §4.3 steps 1-2).
    pub fn canonicalize(input: GameInput, app_id: AppId, now: DateTime<Utc>) -> anyhow::Result<Self> {
        let release_date = if input.release_date.trim().is_empty() {
            None
        } else {
            Some(
                DateTime::parse_from_rfc3339(&input.release_date)
                    .map(|dt| dt.with_timezone(&Utc))
                    .or_else(|_| {
                        chrono::NaiveDateTime::parse_from_str(
                            &input.release_date,
                            "%Y-%m-%dT%H:%M:%S",
                        )
                        .map(|naive| naive.and_utc())
                    })
                    .map_err(|err| anyhow::anyhow!("invalid release_date: {err}"))?,
            )
        };

        Ok(GameRecord {
            app_id,
            name: input.name,
            release_date,
            required_age: input.required_age,
            price: input.price,
            detailed_description: input.detailed_description,
            about_game: input.about_game,
            short_description: input.short_description,
            reviews: input.reviews,
            website: input.website,
            support_url: input.support_url,
            support_email: input.support_email,
            header_image: input.header_image,
            windows: input.windows,
            mac: input.mac,
            linux: input.linux,
            metacritic_score: input.metacritic_score,
            metacritic_url: input.metacritic_url,
            achievements: input.achievements,
            recommendations: input.recommendations,
            notes: input.notes,
            supported_languages: input.supported_languages,
            full_audio_languages: input.full_audio_languages,
            developers: input.developers,
            publishers: input.publishers,
            categories: input.categories,
            genres: input.genres,
            screenshots: input.screenshots,
            movies: input.movies,
            user_score: input.user_score,
            score_rank: input.score_rank,
            positive_reviews: input.positive_reviews,
            negative_reviews: input.negative_reviews,
            estimated_owners_min: input.estimated_owners_min,
            estimated_owners_max: input.estimated_owners_max,
            avg_playtime_forever: input.avg_playtime_forever,
            avg_playtime_two_weeks: input.avg_playtime_two_weeks,
            median_playtime_forever: input.median_playtime_forever,
            median_playtime_two_weeks: input.median_playtime_two_weeks,
            peak_ccu: input.peak_ccu,
            tags: input.tags,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn partition(&self) -> Partition {
        classify(self.windows, self.mac, self.linux)
    }

    /// Wire shape for `catalog_sql` (spec §9: "comma-join serialization...
    /// only at the persistence boundary").
    pub fn to_game_row(&self) -> GameRow {
        GameRow {
            app_id: self.app_id,
            name: self.name.clone(),
            release_date: self.release_date,
            required_age: self.required_age,
            price: self.price,
            detailed_description: self.detailed_description.clone(),
            about_game: self.about_game.clone(),
            short_description: self.short_description.clone(),
            reviews: self.reviews.clone(),
            website: self.website.clone(),
            support_url: self.support_url.clone(),
            support_email: self.support_email.clone(),
            header_image: self.header_image.clone(),
            windows: self.windows,
            mac: self.mac,
            linux: self.linux,
            metacritic_score: self.metacritic_score,
            metacritic_url: self.metacritic_url.clone(),
            achievements: self.achievements,
            recommendations: self.recommendations,
            notes: self.notes.clone(),
            supported_languages: self.supported_languages.join(","),
            full_audio_languages: self.full_audio_languages.join(","),
            developers: self.developers.join(","),
            publishers: self.publishers.join(","),
            categories: self.categories.join(","),
            genres: self.genres.join(","),
            screenshots: self.screenshots.join(","),
            movies: self.movies.join(","),
            user_score: self.user_score,
            score_rank: self.score_rank.clone(),
            positive_reviews: self.positive_reviews,
            negative_reviews: self.negative_reviews,
            estimated_owners_min: self.estimated_owners_min,
            estimated_owners_max: self.estimated_owners_max,
            avg_playtime_forever: self.avg_playtime_forever,
            avg_playtime_two_weeks: self.avg_playtime_two_weeks,
            median_playtime_forever: self.median_playtime_forever,
            median_playtime_two_weeks: self.median_playtime_two_weeks,
            peak_ccu: self.peak_ccu,
            tags: serialize_tags(&self.tags),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Caller-facing shape (spec §4.3 step 7: "scalars plus split list
    /// fields") built from the row actually persisted on master.
    pub fn from_game_row(row: &GameRow) -> Self {
        let split = |s: &str| -> Vec<String> {
            if s.is_empty() {
                Vec::new()
            } else {
                s.split(',').map(str::to_string).collect()
            }
        };
        GameRecord {
            app_id: row.app_id,
            name: row.name.clone(),
            release_date: row.release_date,
            required_age: row.required_age,
            price: row.price,
            detailed_description: row.detailed_description.clone(),
            about_game: row.about_game.clone(),
            short_description: row.short_description.clone(),
            reviews: row.reviews.clone(),
            website: row.website.clone(),
            support_url: row.support_url.clone(),
            support_email: row.support_email.clone(),
            header_image: row.header_image.clone(),
            windows: row.windows,
            mac: row.mac,
            linux: row.linux,
            metacritic_score: row.metacritic_score,
            metacritic_url: row.metacritic_url.clone(),
            achievements: row.achievements,
            recommendations: row.recommendations,
            notes: row.notes.clone(),
            supported_languages: split(&row.supported_languages),
            full_audio_languages: split(&row.full_audio_languages),
            developers: split(&row.developers),
            publishers: split(&row.publishers),
            categories: split(&row.categories),
            genres: split(&row.genres),
            screenshots: split(&row.screenshots),
            movies: split(&row.movies),
            user_score: row.user_score,
            score_rank: row.score_rank.clone(),
            positive_reviews: row.positive_reviews,
            negative_reviews: row.negative_reviews,
            estimated_owners_min: row.estimated_owners_min,
            estimated_owners_max: row.estimated_owners_max,
            avg_playtime_forever: row.avg_playtime_forever,
            avg_playtime_two_weeks: row.avg_playtime_two_weeks,
            median_playtime_forever: row.median_playtime_forever,
            median_playtime_two_weeks: row.median_playtime_two_weeks,
            peak_ccu: row.peak_ccu,
            tags: parse_tags(&row.tags),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl serde::Serialize for GameRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("GameRecord", 40)?;
        s.serialize_field("app_id", &self.app_id)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("release_date", &self.release_date)?;
        s.serialize_field("required_age", &self.required_age)?;
        s.serialize_field("price", &self.price)?;
        s.serialize_field("detailed_description", &self.detailed_description)?;
        s.serialize_field("about_game", &self.about_game)?;
        s.serialize_field("short_description", &self.short_description)?;
        s.serialize_field("reviews", &self.reviews)?;
        s.serialize_field("website", &self.website)?;
        s.serialize_field("support_url", &self.support_url)?;
        s.serialize_field("support_email", &self.support_email)?;
        s.serialize_field("header_image", &self.header_image)?;
        s.serialize_field("windows", &self.windows)?;
        s.serialize_field("mac", &self.mac)?;
        s.serialize_field("linux", &self.linux)?;
        s.serialize_field("metacritic_score", &self.metacritic_score)?;
        s.serialize_field("metacritic_url", &self.metacritic_url)?;
        s.serialize_field("achievements", &self.achievements)?;
        s.serialize_field("recommendations", &self.recommendations)?;
        s.serialize_field("notes", &self.notes)?;
        s.serialize_field("supported_languages", &self.supported_languages)?;
        s.serialize_field("full_audio_languages", &self.full_audio_languages)?;
        s.serialize_field("developers", &self.developers)?;
        s.serialize_field("publishers", &self.publishers)?;
        s.serialize_field("categories", &self.categories)?;
        s.serialize_field("genres", &self.genres)?;
        s.serialize_field("screenshots", &self.screenshots)?;
        s.serialize_field("movies", &self.movies)?;
        s.serialize_field("user_score", &self.user_score)?;
        s.serialize_field("score_rank", &self.score_rank)?;
        s.serialize_field("positive_reviews", &self.positive_reviews)?;
        s.serialize_field("negative_reviews", &self.negative_reviews)?;
        s.serialize_field("estimated_owners_min", &self.estimated_owners_min)?;
        s.serialize_field("estimated_owners_max", &self.estimated_owners_max)?;
        s.serialize_field("avg_playtime_forever", &self.avg_playtime_forever)?;
        s.serialize_field("avg_playtime_two_weeks", &self.avg_playtime_two_weeks)?;
        s.serialize_field("median_playtime_forever", &self.median_playtime_forever)?;
        s.serialize_field("median_playtime_two_weeks", &self.median_playtime_two_weeks)?;
        s.serialize_field("peak_ccu", &self.peak_ccu)?;
        s.serialize_field("tags", &self.tags)?;
        s.serialize_field("created_at", &self.created_at)?;
        s.serialize_field("updated_at", &self.updated_at)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_input(windows: bool, mac: bool, linux: bool) -> GameInput {
        GameInput {
            name: "Alpha".to_string(),
            release_date: "2024-01-15T00:00:00".to_string(),
            required_age: 0,
            price: 9.99,
            about_game: "x".to_string(),
            detailed_description: String::new(),
            short_description: String::new(),
            reviews: String::new(),
            website: String::new(),
            support_url: String::new(),
            support_email: String::new(),
            header_image: String::new(),
            windows,
            mac,
            linux,
            metacritic_score: 0,
            metacritic_url: String::new(),
            achievements: 0,
            recommendations: 0,
            notes: String::new(),
            supported_languages: vec!["English".to_string(), "French".to_string()],
            full_audio_languages: Vec::new(),
            developers: Vec::new(),
            publishers: Vec::new(),
            categories: Vec::new(),
            genres: Vec::new(),
            screenshots: Vec::new(),
            movies: Vec::new(),
            user_score: 0.0,
            score_rank: String::new(),
            positive_reviews: 0,
            negative_reviews: 0,
            estimated_owners_min: 0,
            estimated_owners_max: 0,
            avg_playtime_forever: 0,
            avg_playtime_two_weeks: 0,
            median_playtime_forever: 0,
            median_playtime_two_weeks: 0,
            peak_ccu: 0,
            tags: std::collections::BTreeMap::new(),
        }
    }

    #[test]
    fn windows_only_routes_to_slave_a() {
        assert_eq!(classify(true, false, false), Partition::WindowsOnly);
    }

    #[test]
    fn multi_platform_routes_to_slave_b() {
        assert_eq!(classify(true, true, false), Partition::MultiPlatform);
        assert_eq!(classify(true, false, true), Partition::MultiPlatform);
    }

    #[test]
    fn mac_only_and_no_platform_are_master_only() {
        assert_eq!(classify(false, true, false), Partition::MasterOnly);
        assert_eq!(classify(false, false, true), Partition::MasterOnly);
        assert_eq!(classify(false, false, false), Partition::MasterOnly);
    }

    #[test]
    fn canonicalize_parses_release_date_and_joins_lists_at_the_row_boundary() {
        let input = minimal_input(true, false, false);
        let now = Utc::now();
        let record = GameRecord::canonicalize(input, 1, now).unwrap();
        assert_eq!(record.release_date.unwrap().to_rfc3339()[..10], *"2024-01-15");

        let row = record.to_game_row();
        assert_eq!(row.supported_languages, "English,French");
    }

    #[test]
    fn tag_serialization_round_trips() {
        let mut tags = std::collections::BTreeMap::new();
        tags.insert("indie".to_string(), 120);
        tags.insert("rpg".to_string(), 45);
        let serialized = serialize_tags(&tags);
        assert_eq!(parse_tags(&serialized), tags);
    }

    #[test]
    fn from_game_row_splits_comma_joined_columns_back_into_lists() {
        let input = minimal_input(true, true, false);
        let record = GameRecord::canonicalize(input, 7, Utc::now()).unwrap();
        let row = record.to_game_row();
        let rebuilt = GameRecord::from_game_row(&row);
        assert_eq!(rebuilt.supported_languages, vec!["English", "French"]);
    }
}
