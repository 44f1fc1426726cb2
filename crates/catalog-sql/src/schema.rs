//! DDL used by the migrator (spec §4.7). Kept here, alongside the queries
//! that assume these tables exist, rather than in `catalog-migrate`, so the
//! two never drift apart.

/// Columns shared by `games` and both pending tables.
const GAME_COLUMNS: &str = r#"
    app_id bigint primary key,
    name text not null,
    release_date timestamptz,
    required_age integer not null default 0,
    price double precision not null default 0,
    detailed_description text not null default '',
    about_game text not null default '',
    short_description text not null default '',
    reviews text not null default '',
    website text not null default '',
    support_url text not null default '',
    support_email text not null default '',
    header_image text not null default '',
    windows boolean not null default false,
    mac boolean not null default false,
    linux boolean not null default false,
    metacritic_score integer not null default 0,
    metacritic_url text not null default '',
    achievements integer not null default 0,
    recommendations integer not null default 0,
    notes text not null default '',
    supported_languages text not null default '',
    full_audio_languages text not null default '',
    developers text not null default '',
    publishers text not null default '',
    categories text not null default '',
    genres text not null default '',
    screenshots text not null default '',
    movies text not null default '',
    user_score double precision not null default 0,
    score_rank text not null default '',
    positive_reviews integer not null default 0,
    negative_reviews integer not null default 0,
    estimated_owners_min bigint not null default 0,
    estimated_owners_max bigint not null default 0,
    avg_playtime_forever integer not null default 0,
    avg_playtime_two_weeks integer not null default 0,
    median_playtime_forever integer not null default 0,
    median_playtime_two_weeks integer not null default 0,
    peak_ccu integer not null default 0,
    tags text not null default ''
"#;

/// The `games` table, present on the master and on every slave (spec §6
/// "Persisted schema").
pub fn create_games_table() -> String {
    format!(
        r#"
        create table if not exists games (
            {GAME_COLUMNS},
            created_at timestamptz not null default now(),
            updated_at timestamptz not null default now()
        )
        "#
    )
}

fn create_pending_table(name: &str) -> String {
    format!(
        r#"
        create table if not exists {name} (
            {GAME_COLUMNS},
            created_at timestamptz not null default now(),
            updated_at timestamptz not null default now(),
            sync_status text not null default 'PENDING',
            enqueued_at timestamptz not null default now(),
            last_sync_attempt timestamptz,
            sync_retries integer not null default 0,
            error_message text
        )
        "#
    )
}

pub fn create_pending_windows_table() -> String {
    create_pending_table("pending_windows_games")
}

pub fn create_pending_multi_os_table() -> String {
    create_pending_table("pending_multi_os_games")
}

pub fn create_node_status_table() -> &'static str {
    r#"
    create table if not exists node_status (
        node_name text primary key,
        is_available boolean not null,
        last_checked timestamptz not null,
        last_sync timestamptz,
        failure_count integer not null default 0,
        last_error text
    )
    "#
}

pub fn create_transaction_log_table() -> &'static str {
    r#"
    create table if not exists transaction_log (
        log_id bigserial primary key,
        transaction_id uuid not null,
        node_id smallint not null,
        operation text not null,
        record_id bigint,
        old_data json,
        new_data json,
        timestamp timestamptz not null default now(),
        status text not null,
        error_message text,
        processed boolean not null default false
    )
    "#
}

/// Tables that exist only on the master (spec §4.7: "Tables on a slave
/// exclude the pending and log tables by design").
pub fn master_only_tables() -> &'static [&'static str] {
    &["pending_windows_games", "pending_multi_os_games", "node_status", "transaction_log"]
}

pub fn all_table_names() -> &'static [&'static str] {
    &[
        "games",
        "pending_windows_games",
        "pending_multi_os_games",
        "node_status",
        "transaction_log",
    ]
}
