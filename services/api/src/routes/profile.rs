//! Profile facet routes
//!
//! Every facet is upserted per caller: the first write creates the document
//! from the facet defaults, later writes overwrite only the fields sent.

use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use common::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    models::{
        BiologicalType, Facet, FacetKind, FemaleCycle, MaleEnergyPattern, MobilityProfile,
        SleepRoutine, TaskPreference, UserProfile,
    },
    store::ProfileStore,
};
use serde_json::{Value, json};
use tracing::{error, info};
use uuid::Uuid;

use crate::{AppState, models::Envelope};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(get_facet::<UserProfile>).put(put_facet::<UserProfile>),
        )
        .route("/profile/full", get(get_full_profile))
        .route(
            "/sleep-routine",
            get(get_facet::<SleepRoutine>).put(put_facet::<SleepRoutine>),
        )
        .route(
            "/mobility",
            get(get_facet::<MobilityProfile>).put(put_facet::<MobilityProfile>),
        )
        .route(
            "/task-preferences",
            get(get_facet::<TaskPreference>).put(put_facet::<TaskPreference>),
        )
        .route("/biological", get(get_biological).put(put_biological))
}

async fn find_document(
    profiles: &dyn ProfileStore,
    user_id: Uuid,
    kind: FacetKind,
) -> ApiResult<Option<Value>> {
    let record = profiles.find_facet(user_id, kind).await?;
    Ok(record.map(|record| record.to_document()))
}

fn to_patch<F: Facet>(facet: &F) -> ApiResult<Value> {
    serde_json::to_value(facet).map_err(|e| {
        error!("Failed to serialize {} facet: {}", F::KIND.as_str(), e);
        ApiError::InternalServerError
    })
}

/// Read one facet; `data` is null until the caller has written it
pub async fn get_facet<F: Facet + 'static>(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Envelope<Option<Value>>>> {
    let document = find_document(state.repositories.profiles.as_ref(), user.id, F::KIND).await?;
    Ok(Envelope::data(document))
}

/// Create or update one facet
pub async fn put_facet<F: Facet + 'static>(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(mut facet): ApiJson<F>,
) -> ApiResult<Json<Envelope<Value>>> {
    facet.validate().map_err(ApiError::BadRequest)?;
    let patch = to_patch(&facet)?;

    let record = state
        .repositories
        .profiles
        .upsert_facet(user.id, F::KIND, patch, F::defaults())
        .await?;

    info!("Saved {} facet for user {}", F::KIND.as_str(), user.id);
    Ok(Envelope::with_message(
        record.to_document(),
        "Profile saved successfully",
    ))
}

/// Which sex-specific facet the core profile points at
async fn biological_kind(profiles: &dyn ProfileStore, user_id: Uuid) -> ApiResult<FacetKind> {
    let sex = profiles
        .find_facet(user_id, FacetKind::Profile)
        .await?
        .and_then(|record| record.data.get("biologicalSex").cloned());

    Ok(match sex.as_ref().and_then(Value::as_str) {
        Some("Female") => FacetKind::FemaleCycle,
        _ => FacetKind::MaleEnergy,
    })
}

pub async fn get_biological(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Envelope<Option<Value>>>> {
    let profiles = state.repositories.profiles.as_ref();
    let kind = biological_kind(profiles, user.id).await?;
    let document = find_document(profiles, user.id, kind).await?;
    Ok(Envelope::data(document))
}

/// `{type: "female" | "male", ...facet fields}`
///
/// Writing one sex-specific facet removes the other.
pub async fn put_biological(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Json<Envelope<Value>>> {
    let kind: BiologicalType = body
        .get("type")
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .ok_or_else(|| ApiError::BadRequest("type must be 'female' or 'male'".to_string()))?;

    let (patch, defaults) = match kind {
        BiologicalType::Female => {
            let mut facet: FemaleCycle = serde_json::from_value(body)
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            facet.validate().map_err(ApiError::BadRequest)?;
            (to_patch(&facet)?, FemaleCycle::defaults())
        }
        BiologicalType::Male => {
            let mut facet: MaleEnergyPattern = serde_json::from_value(body)
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            facet.validate().map_err(ApiError::BadRequest)?;
            (to_patch(&facet)?, MaleEnergyPattern::defaults())
        }
    };

    let profiles = state.repositories.profiles.as_ref();
    let record = profiles
        .upsert_facet(user.id, kind.kind(), patch, defaults)
        .await?;
    if profiles.delete_facet(user.id, kind.other_kind()).await? {
        info!(
            "Removed {} facet for user {}",
            kind.other_kind().as_str(),
            user.id
        );
    }

    Ok(Envelope::with_message(
        record.to_document(),
        "Profile saved successfully",
    ))
}

/// Every facet in one response, null where not yet written
pub async fn get_full_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Envelope<Value>>> {
    let profiles = state.repositories.profiles.as_ref();

    let profile = find_document(profiles, user.id, FacetKind::Profile).await?;
    let sleep = find_document(profiles, user.id, FacetKind::SleepRoutine).await?;
    let mobility = find_document(profiles, user.id, FacetKind::Mobility).await?;
    let tasks = find_document(profiles, user.id, FacetKind::TaskPreference).await?;
    let biological_kind = biological_kind(profiles, user.id).await?;
    let biological = find_document(profiles, user.id, biological_kind).await?;

    Ok(Envelope::data(json!({
        "profile": profile,
        "sleep": sleep,
        "mobility": mobility,
        "tasks": tasks,
        "biological": biological,
    })))
}
