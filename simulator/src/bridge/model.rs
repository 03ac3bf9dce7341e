use captioncore::captions::CaptionLine;
use serde::{Deserialize, Serialize};

/// Body of `GET /captions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionsReply {
    pub lines: Vec<CaptionLine>,
}

/// Body of `POST /relay` and `POST /speech`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPayload {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReply {
    pub accepted: bool,
}
