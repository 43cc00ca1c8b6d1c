use serde::{Deserialize, Serialize};

use crate::domain::posts::{PostInput, PostUpdateInput};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub logged_in: bool,
}

#[derive(Debug, Deserialize)]
pub struct PostCreateRequest {
    pub post: PostInput,
}

#[derive(Debug, Deserialize)]
pub struct PostUpdateRequest {
    pub post: PostUpdateInput,
}

#[derive(Debug, Deserialize)]
pub struct DraftSaveRequest {
    pub post: PostInput,
}

#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub draft: PostInput,
}

#[derive(Debug, Serialize)]
pub struct DraftListResponse {
    pub drafts: Vec<PostInput>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Date parts arrive as strings so malformed values become a 400 with our error body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FindPostQuery {
    pub slug: Option<String>,
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RemovePostQuery {
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DraftQuery {
    pub slug: Option<String>,
}
