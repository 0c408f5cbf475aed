use serde::{Deserialize, Serialize};
use viral_predict::{AnalysisInput, ContentType, InputMode, PredictionResult};

#[derive(Debug, Deserialize)]
pub struct ApiPredictionRequest {
    pub request_id: Option<String>,
    pub input_mode: Option<String>,
    pub content_text: Option<String>,
    pub content_type: Option<String>,
    pub niche: Option<String>,
    pub creator_handle: Option<String>,
    pub society_id: Option<String>,
    pub platform: Option<String>,
    pub video_url: Option<String>,
    pub file_reference: Option<String>,
}

impl ApiPredictionRequest {
    pub fn into_input(self) -> Result<AnalysisInput, String> {
        let input_mode = match self.input_mode.as_deref() {
            Some(mode) => {
                InputMode::from_str(mode).ok_or_else(|| format!("invalid input mode: {}", mode))?
            }
            None if self.video_url.is_some() => InputMode::UrlReference,
            None if self.file_reference.is_some() => InputMode::FileReference,
            None => return Err("input_mode is required".to_string()),
        };
        let kind = self
            .content_type
            .as_deref()
            .ok_or_else(|| "content_type is required".to_string())?;
        let content_type = ContentType::from_str(kind)
            .ok_or_else(|| format!("invalid content type: {}", kind))?;

        Ok(AnalysisInput {
            input_mode,
            content_text: self.content_text,
            content_type,
            niche: self.niche,
            creator_handle: self.creator_handle,
            society_id: self.society_id,
            platform: self.platform,
            video_url: self.video_url,
            file_reference: self.file_reference,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiPredictionResponse {
    pub request_id: String,
    #[serde(flatten)]
    pub result: PredictionResult,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub request_id: String,
    pub error: String,
}
