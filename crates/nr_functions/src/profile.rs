use nr_core::{CallResult, CallableError, ProfilePatch, ProfileStorage, UserProfile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileResponse {
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub profile_data: Option<ProfilePatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRequest {
    #[serde(default)]
    pub article_id: Option<String>,
}

/// Plain acknowledgement for write operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    fn ok(message: &str) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

fn article_id(request: BookmarkRequest) -> CallResult<String> {
    request
        .article_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| CallableError::invalid_argument("Missing 'articleId'."))
}

pub struct ProfileService {
    profiles: Arc<dyn ProfileStorage>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileStorage>) -> Self {
        Self { profiles }
    }

    pub async fn get_user_profile(&self, uid: &str) -> CallResult<ProfileResponse> {
        let profile = self.profiles.get_profile(uid).await.map_err(|e| {
            error!("❌ Error getting user profile: {}", e);
            CallableError::internal("Could not retrieve user profile.")
        })?;

        let profile = match profile {
            Some(profile) => {
                info!("👤 Profile retrieved for user {}", uid);
                profile
            }
            None => {
                info!("👤 No profile found for user {}, returning empty profile", uid);
                UserProfile::default()
            }
        };
        Ok(ProfileResponse { profile })
    }

    pub async fn update_user_profile(&self, uid: &str, request: UpdateProfileRequest) -> CallResult<Ack> {
        let patch = request
            .profile_data
            .ok_or_else(|| CallableError::invalid_argument("Missing or invalid 'profileData'."))?;

        self.profiles.merge_profile(uid, &patch).await.map_err(|e| {
            error!("❌ Error updating user profile: {}", e);
            CallableError::internal("Could not update user profile.")
        })?;

        info!("👤 Profile updated for user {}", uid);
        Ok(Ack::ok("Profile updated successfully."))
    }

    pub async fn bookmark_article(&self, uid: &str, request: BookmarkRequest) -> CallResult<Ack> {
        let article_id = article_id(request)?;
        self.profiles.add_bookmark(uid, &article_id).await.map_err(|e| {
            error!("❌ Error bookmarking article: {}", e);
            CallableError::internal("Could not bookmark article.")
        })?;
        Ok(Ack::ok("Article bookmarked."))
    }

    pub async fn remove_bookmark(&self, uid: &str, request: BookmarkRequest) -> CallResult<Ack> {
        let article_id = article_id(request)?;
        self.profiles.remove_bookmark(uid, &article_id).await.map_err(|e| {
            error!("❌ Error removing bookmark: {}", e);
            CallableError::internal("Could not remove bookmark.")
        })?;
        Ok(Ack::ok("Bookmark removed."))
    }
}
