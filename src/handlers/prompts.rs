use crate::{
    auth::AuthWallet,
    models::{
        CreatePromptRequest, LabeledId, Pagination, PromptDetail, PromptName, PromptSummary,
        PurchasePromptRequest, PurchasePromptResponse, RatePromptRequest, RatePromptResponse,
        SearchPromptsQuery, SearchPromptsResponse, SortOption,
    },
    store::{PromptRecord, PurchaseRecord, RatingRecord},
    utils::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PAGE_SIZE: usize = 10;
const PREVIEW_LENGTH: usize = 50;
const DEFAULT_CURRENCY: &str = "USDC";

/// Search prompts with filtering, sorting, and pagination. Public.
pub async fn search(
    State(state): State<crate::AppState>,
    Query(query): Query<SearchPromptsQuery>,
) -> ApiResult<Json<SearchPromptsResponse>> {
    query.validate()?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 50);

    let mut summaries: Vec<PromptSummary> = state
        .store
        .all_prompts()
        .into_iter()
        .filter(|prompt| matches_query(prompt, query.q.as_deref()))
        .map(|prompt| summarize(&state, &prompt))
        .filter(|summary| match query.min_rating {
            Some(min) => summary.rating.is_some_and(|r| r >= f64::from(min)),
            None => true,
        })
        .collect();

    match query.sort {
        SortOption::Newest => summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOption::Popular => summaries.sort_by(|a, b| b.purchase_count.cmp(&a.purchase_count)),
        SortOption::TopRated => summaries.sort_by(|a, b| {
            b.rating
                .unwrap_or(0.0)
                .total_cmp(&a.rating.unwrap_or(0.0))
        }),
        SortOption::PriceLow => summaries.sort_by(|a, b| a.price.total_cmp(&b.price)),
        SortOption::PriceHigh => summaries.sort_by(|a, b| b.price.total_cmp(&a.price)),
    }

    let total = summaries.len();
    let pages = total.div_ceil(limit);
    let results: Vec<PromptSummary> = summaries
        .into_iter()
        .skip((page - 1) * limit)
        .take(limit)
        .collect();

    Ok(Json(SearchPromptsResponse {
        results,
        pagination: Pagination {
            total,
            page,
            limit,
            pages,
        },
    }))
}

/// Prompt details. The full content is included only for the author or a
/// purchaser; other callers get a truncated preview.
pub async fn get_by_id(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
    wallet: Option<Extension<AuthWallet>>,
) -> ApiResult<Json<PromptDetail>> {
    let prompt = state
        .store
        .get_prompt(id)
        .ok_or_else(|| ApiError::not_found_error(format!("Prompt with ID {} not found", id)))?;

    let caller = wallet.map(|Extension(w)| w.address.to_lowercase());

    let is_author = caller
        .as_deref()
        .is_some_and(|address| prompt.wallet_address == address);
    let is_purchased = caller
        .as_deref()
        .is_some_and(|address| state.store.has_purchased(prompt.id, address));

    let ratings = state.store.ratings_for(prompt.id);
    let has_rated = caller
        .as_deref()
        .is_some_and(|address| ratings.iter().any(|r| r.wallet_address == address));

    let content = if is_author || is_purchased {
        prompt.content.clone()
    } else {
        preview(&prompt.content)
    };

    Ok(Json(PromptDetail {
        id: prompt.id,
        name: prompt.name.clone(),
        goal: prompt.goal.clone(),
        description: prompt.description.clone(),
        prompt: content,
        tested_ai_agents: label_agents(&state, &prompt.tested_ai_agents),
        tags: label_tags(&state, &prompt.tags),
        rating: average(&ratings),
        rating_count: ratings.len(),
        price: prompt.price,
        currency: prompt.currency.clone(),
        prompt_version: prompt.prompt_version.clone(),
        created_at: prompt.created_at,
        updated_at: prompt.updated_at,
        is_purchased,
        is_author,
        has_rated,
        author: prompt.wallet_address,
    }))
}

/// Create a new prompt owned by the authenticated wallet.
pub async fn create(
    State(state): State<crate::AppState>,
    Extension(wallet): Extension<AuthWallet>,
    Json(request): Json<CreatePromptRequest>,
) -> ApiResult<(StatusCode, Json<PromptDetail>)> {
    request.validate()?;

    let now = Utc::now();
    let record = PromptRecord {
        id: Uuid::new_v4(),
        name: request.name,
        goal: request.goal,
        description: request.description,
        content: request.prompt,
        prompt_version: request.prompt_version.unwrap_or_else(|| "1".to_string()),
        price: request.price,
        currency: request
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        tested_ai_agents: request.tested_ai_agents,
        tags: request.tags,
        wallet_address: wallet.address.to_lowercase(),
        created_at: now,
        updated_at: now,
    };
    state.store.insert_prompt(record.clone());

    Ok((
        StatusCode::CREATED,
        Json(PromptDetail {
            id: record.id,
            name: record.name.clone(),
            goal: record.goal.clone(),
            description: record.description.clone(),
            prompt: record.content.clone(),
            tested_ai_agents: label_agents(&state, &record.tested_ai_agents),
            tags: label_tags(&state, &record.tags),
            rating: None,
            rating_count: 0,
            price: record.price,
            currency: record.currency.clone(),
            prompt_version: record.prompt_version.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            is_purchased: false,
            is_author: true,
            has_rated: false,
            author: record.wallet_address,
        }),
    ))
}

/// Record a purchase. The transaction hash is stored as supplied; on-chain
/// settlement is not verified here.
pub async fn purchase(
    State(state): State<crate::AppState>,
    Extension(wallet): Extension<AuthWallet>,
    Path(id): Path<Uuid>,
    Json(request): Json<PurchasePromptRequest>,
) -> ApiResult<Json<PurchasePromptResponse>> {
    request.validate()?;
    let buyer = wallet.address.to_lowercase();

    let prompt = state
        .store
        .get_prompt(id)
        .ok_or_else(|| ApiError::not_found_error(format!("Prompt with ID {} not found", id)))?;

    if prompt.wallet_address == buyer {
        return Err(ApiError::validation_error(
            "You cannot purchase your own prompt",
        ));
    }

    if state.store.has_purchased(id, &buyer) {
        return Err(ApiError::validation_error(
            "You have already purchased this prompt",
        ));
    }

    let record = PurchaseRecord {
        id: Uuid::new_v4(),
        prompt_id: id,
        wallet_address: buyer,
        transaction_hash: request.transaction_hash,
        price: prompt.price,
        currency: prompt.currency.clone(),
        purchase_date: Utc::now(),
    };
    state.store.insert_purchase(record.clone());

    Ok(Json(PurchasePromptResponse {
        id: record.id,
        prompt_id: record.prompt_id,
        purchase_date: record.purchase_date,
        price: record.price,
        currency: record.currency,
        prompt: PromptName { name: prompt.name },
    }))
}

/// Rate a purchased prompt. One rating per (prompt, wallet); a repeat
/// rating replaces the prior score.
pub async fn rate(
    State(state): State<crate::AppState>,
    Extension(wallet): Extension<AuthWallet>,
    Path(id): Path<Uuid>,
    Json(request): Json<RatePromptRequest>,
) -> ApiResult<Json<RatePromptResponse>> {
    request.validate()?;
    let rater = wallet.address.to_lowercase();

    let prompt = state
        .store
        .get_prompt(id)
        .ok_or_else(|| ApiError::not_found_error(format!("Prompt with ID {} not found", id)))?;

    if prompt.wallet_address == rater {
        return Err(ApiError::validation_error("You cannot rate your own prompt"));
    }

    if !state.store.has_purchased(id, &rater) {
        return Err(ApiError::authorization_error(
            "You must purchase this prompt before rating it",
        ));
    }

    let rating =
        state
            .store
            .upsert_rating(id, &rater, request.rating_score, request.rating_description);

    Ok(Json(RatePromptResponse {
        id: rating.id,
        prompt_id: rating.prompt_id,
        rating_score: rating.rating_score,
        rating_description: rating.rating_description,
        created_at: rating.created_at,
        prompt: PromptName { name: prompt.name },
    }))
}

fn matches_query(prompt: &PromptRecord, q: Option<&str>) -> bool {
    let Some(q) = q.filter(|q| !q.is_empty()) else {
        return true;
    };
    let needle = q.to_lowercase();
    prompt.name.to_lowercase().contains(&needle)
        || prompt.description.to_lowercase().contains(&needle)
        || prompt.goal.to_lowercase().contains(&needle)
}

fn summarize(state: &crate::AppState, prompt: &PromptRecord) -> PromptSummary {
    let ratings = state.store.ratings_for(prompt.id);
    PromptSummary {
        id: prompt.id,
        name: prompt.name.clone(),
        goal: prompt.goal.clone(),
        description: prompt.description.clone(),
        rating: average(&ratings),
        rating_count: ratings.len(),
        purchase_count: state.store.purchase_count(prompt.id),
        price: prompt.price,
        currency: prompt.currency.clone(),
        created_at: prompt.created_at,
        author: prompt.wallet_address.clone(),
    }
}

fn average(ratings: &[RatingRecord]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: f64 = ratings.iter().map(|r| f64::from(r.rating_score)).sum();
    Some(sum / ratings.len() as f64)
}

fn preview(content: &str) -> String {
    let truncated: String = content.chars().take(PREVIEW_LENGTH).collect();
    format!("{}...", truncated)
}

fn label_tags(state: &crate::AppState, ids: &[i64]) -> Vec<LabeledId> {
    ids.iter()
        .filter_map(|id| {
            state.store.tags().iter().find(|t| t.id == *id).map(|t| LabeledId {
                value: t.id,
                label: t.name.clone(),
            })
        })
        .collect()
}

fn label_agents(state: &crate::AppState, ids: &[i64]) -> Vec<LabeledId> {
    ids.iter()
        .filter_map(|id| {
            state
                .store
                .ai_agents()
                .iter()
                .find(|a| a.id == *id)
                .map(|a| LabeledId {
                    value: a.id,
                    label: a.name.clone(),
                })
        })
        .collect()
}
