use chrono::{DateTime, Utc};

use crate::{games::GameRow, AppId, PendingTable};

#[derive(Debug, Copy, Clone, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "PENDING",
            SyncStatus::Synced => "SYNCED",
            SyncStatus::Failed => "FAILED",
        }
    }
}

/// PendingRow is a full copy of the game record plus sync bookkeeping
/// (spec §3). `enqueued_at` is the pending row's own creation time (used
/// for enqueue-order draining by C5); it is distinct from the embedded
/// game's own `created_at`/`updated_at`, which are copied verbatim.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingRow {
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
    pub sync_status: String,
    pub enqueued_at: DateTime<Utc>,
    pub last_sync_attempt: Option<DateTime<Utc>>,
    pub sync_retries: i32,
    pub error_message: Option<String>,
}

impl PendingRow {
    /// The columns a slave insert needs, shaped as a canonical `GameRow`
    /// (spec §4.4: "insert a canonical game record built from the pending
    /// row").
    pub fn as_game_row(&self) -> GameRow {
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
            supported_languages: self.supported_languages.clone(),
            full_audio_languages: self.full_audio_languages.clone(),
            developers: self.developers.clone(),
            publishers: self.publishers.clone(),
            categories: self.categories.clone(),
            genres: self.genres.clone(),
            screenshots: self.screenshots.clone(),
            movies: self.movies.clone(),
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
            tags: self.tags.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Insert-or-reset a pending row for `game` in `table` (spec §4.3 step 6,
/// §4.3 tie-break "re-enqueuing an already-pending record resets retry
/// bookkeeping").
#[tracing::instrument(level = "debug", skip(executor, game), fields(app_id = game.app_id, table = table.table_name()))]
pub async fn upsert<'e, E>(executor: E, table: PendingTable, game: &GameRow) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!(
        r#"
        insert into {table} (
            app_id, name, release_date, required_age, price, detailed_description,
            about_game, short_description, reviews, website, support_url, support_email,
            header_image, windows, mac, linux, metacritic_score, metacritic_url,
            achievements, recommendations, notes, supported_languages, full_audio_languages,
            developers, publishers, categories, genres, screenshots, movies, user_score,
            score_rank, positive_reviews, negative_reviews, estimated_owners_min,
            estimated_owners_max, avg_playtime_forever, avg_playtime_two_weeks,
            median_playtime_forever, median_playtime_two_weeks, peak_ccu, tags,
            created_at, updated_at, sync_status, enqueued_at, last_sync_attempt,
            sync_retries, error_message
        ) values (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
            $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33, $34,
            $35, $36, $37, $38, $39, $40, $41, $42, 'PENDING', now(), null, 0, null
        )
        on conflict (app_id) do update set
            sync_status = 'PENDING',
            last_sync_attempt = null,
            sync_retries = 0,
            error_message = null
        "#,
        table = table.table_name(),
    );

    sqlx::query(&sql)
        .bind(game.app_id)
        .bind(&game.name)
        .bind(game.release_date)
        .bind(game.required_age)
        .bind(game.price)
        .bind(&game.detailed_description)
        .bind(&game.about_game)
        .bind(&game.short_description)
        .bind(&game.reviews)
        .bind(&game.website)
        .bind(&game.support_url)
        .bind(&game.support_email)
        .bind(&game.header_image)
        .bind(game.windows)
        .bind(game.mac)
        .bind(game.linux)
        .bind(game.metacritic_score)
        .bind(&game.metacritic_url)
        .bind(game.achievements)
        .bind(game.recommendations)
        .bind(&game.notes)
        .bind(&game.supported_languages)
        .bind(&game.full_audio_languages)
        .bind(&game.developers)
        .bind(&game.publishers)
        .bind(&game.categories)
        .bind(&game.genres)
        .bind(&game.screenshots)
        .bind(&game.movies)
        .bind(game.user_score)
        .bind(&game.score_rank)
        .bind(game.positive_reviews)
        .bind(game.negative_reviews)
        .bind(game.estimated_owners_min)
        .bind(game.estimated_owners_max)
        .bind(game.avg_playtime_forever)
        .bind(game.avg_playtime_two_weeks)
        .bind(game.median_playtime_forever)
        .bind(game.median_playtime_two_weeks)
        .bind(game.peak_ccu)
        .bind(&game.tags)
        .bind(game.created_at)
        .bind(game.updated_at)
        .execute(executor)
        .await?;
    Ok(())
}

/// Fetches `PENDING ∪ FAILED` rows oldest-first (spec §4.4 ordering).
#[tracing::instrument(level = "debug", skip(executor))]
pub async fn list_ready<'e, E>(executor: E, table: PendingTable) -> sqlx::Result<Vec<PendingRow>>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!(
        r#"select * from {table} where sync_status in ('PENDING', 'FAILED') order by enqueued_at asc"#,
        table = table.table_name(),
    );
    sqlx::query_as(&sql).fetch_all(executor).await
}

#[tracing::instrument(level = "debug", skip(executor))]
pub async fn mark_synced<'e, E>(executor: E, table: PendingTable, app_id: AppId) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!(
        r#"update {table} set sync_status = 'SYNCED', last_sync_attempt = now() where app_id = $1"#,
        table = table.table_name(),
    );
    sqlx::query(&sql).bind(app_id).execute(executor).await?;
    Ok(())
}

#[tracing::instrument(level = "debug", skip(executor, error))]
pub async fn mark_failed<'e, E>(
    executor: E,
    table: PendingTable,
    app_id: AppId,
    error: &str,
) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!(
        r#"update {table} set sync_status = 'FAILED', last_sync_attempt = now(), error_message = $2 where app_id = $1"#,
        table = table.table_name(),
    );
    sqlx::query(&sql)
        .bind(app_id)
        .bind(error)
        .execute(executor)
        .await?;
    Ok(())
}

/// Bumps `sync_retries` and stamps `error_message`/`last_sync_attempt`. Not
/// called by the ordinary sync cycle (spec §4.4, §9 Open Questions); kept
/// as an explicit operator-triggered helper (SPEC_FULL §"Supplemented
/// features").
#[tracing::instrument(level = "debug", skip(executor, error))]
pub async fn increment_retry<'e, E>(
    executor: E,
    table: PendingTable,
    app_id: AppId,
    error: Option<&str>,
) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!(
        r#"
        update {table}
        set sync_retries = sync_retries + 1,
            error_message = $2,
            last_sync_attempt = now()
        where app_id = $1
        "#,
        table = table.table_name(),
    );
    sqlx::query(&sql)
        .bind(app_id)
        .bind(error)
        .execute(executor)
        .await?;
    Ok(())
}

/// Counts `PENDING ∪ FAILED` rows, backing `GET /api/pending` (spec §6).
#[tracing::instrument(level = "debug", skip(executor))]
pub async fn count_unsynced<'e, E>(executor: E, table: PendingTable) -> sqlx::Result<i64>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!(
        r#"select count(*) from {table} where sync_status in ('PENDING', 'FAILED')"#,
        table = table.table_name(),
    );
    sqlx::query_scalar(&sql).fetch_one(executor).await
}
