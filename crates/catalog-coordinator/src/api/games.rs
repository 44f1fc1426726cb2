use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use validator::Validate;

use crate::coordinator::WriteCoordinator;
use crate::error::ApiError;
use crate::model::GameInput;

use super::App;

/// `POST /api/games` (spec §6): 201 with the canonical record, 400 on
/// validation failure, 503 if the master is down, 500 on any other
/// coordinator error.
pub async fn create_game(
    State(app): State<Arc<App>>,
    Json(input): Json<GameInput>,
) -> Result<impl IntoResponse, ApiError> {
    input.validate()?;
    let coordinator = WriteCoordinator::new(&app.registry, &app.broker);
    let record = coordinator.create_game(input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `POST /api/games/sample`: a canned Windows-only record for manual smoke
/// testing, matching `create_sample_game` in the original service.
pub async fn create_sample_game(state: State<Arc<App>>) -> Result<impl IntoResponse, ApiError> {
    create_game(state, Json(sample_input())).await
}

fn sample_input() -> GameInput {
    GameInput {
        name: "Sample Game".to_string(),
        release_date: chrono::Utc::now().to_rfc3339(),
        required_age: 0,
        price: 9.99,
        about_game: "This is a sample game for testing.".to_string(),
        detailed_description: String::new(),
        short_description: String::new(),
        reviews: String::new(),
        website: String::new(),
        support_url: String::new(),
        support_email: String::new(),
        header_image: String::new(),
        windows: true,
        mac: false,
        linux: false,
        metacritic_score: 0,
        metacritic_url: String::new(),
        achievements: 0,
        recommendations: 0,
        notes: String::new(),
        supported_languages: Vec::new(),
        full_audio_languages: Vec::new(),
        developers: vec!["Sample Developer".to_string()],
        publishers: vec!["Sample Publisher".to_string()],
        categories: vec!["Single-player".to_string()],
        genres: vec!["Action".to_string()],
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
        tags: [("Action".to_string(), 10), ("Adventure".to_string(), 5)].into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_input_passes_its_own_validation() {
        sample_input().validate().expect("sample payload must satisfy GameInput's own rules");
    }

    #[test]
    fn sample_input_is_windows_only() {
        let input = sample_input();
        assert!(input.windows);
        assert!(!input.mac && !input.linux);
    }
}
