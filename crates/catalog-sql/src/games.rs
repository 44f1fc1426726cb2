use chrono::{DateTime, Utc};

use crate::AppId;

/// GameRow is the canonical game record (spec §3), as stored in the `games`
/// table on the master and on whichever slave holds its partition.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct GameRow {
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
    pub supported_languages: String,
    pub full_audio_languages: String,
    pub developers: String,
    pub publishers: String,
    pub categories: String,
    pub genres: String,
    pub screenshots: String,
    pub movies: String,
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
    pub tags: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Returns `max(app_id)` across the `games` table, or zero if it's empty.
/// Callers add one to produce the next id (spec §4.3 step 1).
#[tracing::instrument(level = "debug", skip(executor))]
pub async fn max_app_id<'e, E>(executor: E) -> sqlx::Result<AppId>
where
    E: sqlx::PgExecutor<'e>,
{
    let max: Option<AppId> = sqlx::query_scalar!(r#"select max(app_id) as "max" from games"#)
        .fetch_one(executor)
        .await?
        .max;
    Ok(max.unwrap_or(0))
}

#[tracing::instrument(level = "debug", skip(executor, row), fields(app_id = row.app_id))]
pub async fn insert<'e, E>(executor: E, row: &GameRow) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query!(
        r#"
        insert into games (
            app_id, name, release_date, required_age, price, detailed_description,
            about_game, short_description, reviews, website, support_url, support_email,
            header_image, windows, mac, linux, metacritic_score, metacritic_url,
            achievements, recommendations, notes, supported_languages, full_audio_languages,
            developers, publishers, categories, genres, screenshots, movies, user_score,
            score_rank, positive_reviews, negative_reviews, estimated_owners_min,
            estimated_owners_max, avg_playtime_forever, avg_playtime_two_weeks,
            median_playtime_forever, median_playtime_two_weeks, peak_ccu, tags,
            created_at, updated_at
        ) values (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
            $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33, $34,
            $35, $36, $37, $38, $39, $40, $41, $42, $43
        )
        "#,
        row.app_id,
        row.name,
        row.release_date,
        row.required_age,
        row.price,
        row.detailed_description,
        row.about_game,
        row.short_description,
        row.reviews,
        row.website,
        row.support_url,
        row.support_email,
        row.header_image,
        row.windows,
        row.mac,
        row.linux,
        row.metacritic_score,
        row.metacritic_url,
        row.achievements,
        row.recommendations,
        row.notes,
        row.supported_languages,
        row.full_audio_languages,
        row.developers,
        row.publishers,
        row.categories,
        row.genres,
        row.screenshots,
        row.movies,
        row.user_score,
        row.score_rank,
        row.positive_reviews,
        row.negative_reviews,
        row.estimated_owners_min,
        row.estimated_owners_max,
        row.avg_playtime_forever,
        row.avg_playtime_two_weeks,
        row.median_playtime_forever,
        row.median_playtime_two_weeks,
        row.peak_ccu,
        row.tags,
        row.created_at,
        row.updated_at,
    )
    .execute(executor)
    .await?;
    Ok(())
}

/// Point lookup used both to verify a just-completed write (spec §4.3 step
/// 4-5) and to check idempotent existence before a slave insert.
#[tracing::instrument(level = "debug", skip(executor))]
pub async fn fetch<'e, E>(executor: E, app_id: AppId) -> sqlx::Result<Option<GameRow>>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as!(GameRow, r#"select * from games where app_id = $1"#, app_id)
        .fetch_optional(executor)
        .await
}

#[tracing::instrument(level = "debug", skip(executor))]
pub async fn exists<'e, E>(executor: E, app_id: AppId) -> sqlx::Result<bool>
where
    E: sqlx::PgExecutor<'e>,
{
    let row: Option<bool> = sqlx::query_scalar!(
        r#"select exists(select 1 from games where app_id = $1) as "exists!""#,
        app_id
    )
    .fetch_one(executor)
    .await
    .map(Some)?;
    Ok(row.unwrap_or(false))
}

/// Insert-or-update by `app_id` (C6's UPDATE, and the idempotent replay path
/// for both sync and retry). Unlike `insert`, never fails on an existing id.
#[tracing::instrument(level = "debug", skip(executor, row), fields(app_id = row.app_id))]
pub async fn upsert<'e, E>(executor: E, row: &GameRow) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query!(
        r#"
        insert into games (
            app_id, name, release_date, required_age, price, detailed_description,
            about_game, short_description, reviews, website, support_url, support_email,
            header_image, windows, mac, linux, metacritic_score, metacritic_url,
            achievements, recommendations, notes, supported_languages, full_audio_languages,
            developers, publishers, categories, genres, screenshots, movies, user_score,
            score_rank, positive_reviews, negative_reviews, estimated_owners_min,
            estimated_owners_max, avg_playtime_forever, avg_playtime_two_weeks,
            median_playtime_forever, median_playtime_two_weeks, peak_ccu, tags,
            created_at, updated_at
        ) values (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
            $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33, $34,
            $35, $36, $37, $38, $39, $40, $41, $42, $43
        )
        on conflict (app_id) do update set
            name = excluded.name,
            release_date = excluded.release_date,
            required_age = excluded.required_age,
            price = excluded.price,
            detailed_description = excluded.detailed_description,
            about_game = excluded.about_game,
            short_description = excluded.short_description,
            reviews = excluded.reviews,
            website = excluded.website,
            support_url = excluded.support_url,
            support_email = excluded.support_email,
            header_image = excluded.header_image,
            windows = excluded.windows,
            mac = excluded.mac,
            linux = excluded.linux,
            metacritic_score = excluded.metacritic_score,
            metacritic_url = excluded.metacritic_url,
            achievements = excluded.achievements,
            recommendations = excluded.recommendations,
            notes = excluded.notes,
            supported_languages = excluded.supported_languages,
            full_audio_languages = excluded.full_audio_languages,
            developers = excluded.developers,
            publishers = excluded.publishers,
            categories = excluded.categories,
            genres = excluded.genres,
            screenshots = excluded.screenshots,
            movies = excluded.movies,
            user_score = excluded.user_score,
            score_rank = excluded.score_rank,
            positive_reviews = excluded.positive_reviews,
            negative_reviews = excluded.negative_reviews,
            estimated_owners_min = excluded.estimated_owners_min,
            estimated_owners_max = excluded.estimated_owners_max,
            avg_playtime_forever = excluded.avg_playtime_forever,
            avg_playtime_two_weeks = excluded.avg_playtime_two_weeks,
            median_playtime_forever = excluded.median_playtime_forever,
            median_playtime_two_weeks = excluded.median_playtime_two_weeks,
            peak_ccu = excluded.peak_ccu,
            tags = excluded.tags,
            updated_at = excluded.updated_at
        "#,
        row.app_id,
        row.name,
        row.release_date,
        row.required_age,
        row.price,
        row.detailed_description,
        row.about_game,
        row.short_description,
        row.reviews,
        row.website,
        row.support_url,
        row.support_email,
        row.header_image,
        row.windows,
        row.mac,
        row.linux,
        row.metacritic_score,
        row.metacritic_url,
        row.achievements,
        row.recommendations,
        row.notes,
        row.supported_languages,
        row.full_audio_languages,
        row.developers,
        row.publishers,
        row.categories,
        row.genres,
        row.screenshots,
        row.movies,
        row.user_score,
        row.score_rank,
        row.positive_reviews,
        row.negative_reviews,
        row.estimated_owners_min,
        row.estimated_owners_max,
        row.avg_playtime_forever,
        row.avg_playtime_two_weeks,
        row.median_playtime_forever,
        row.median_playtime_two_weeks,
        row.peak_ccu,
        row.tags,
        row.created_at,
        row.updated_at,
    )
    .execute(executor)
    .await?;
    Ok(())
}

#[tracing::instrument(level = "debug", skip(executor))]
pub async fn delete<'e, E>(executor: E, app_id: AppId) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query!(r#"delete from games where app_id = $1"#, app_id)
        .execute(executor)
        .await?;
    Ok(())
}
