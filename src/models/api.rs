use serde::{ Serialize, Deserialize };

use super::chat::Message;

pub const GENERATE_ROUTE: &str = "/api/generate";

#[derive(Serialize, Debug)]
pub struct GenerateRequest<'a> {
    pub conversation: &'a [Message],
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GenerateResponse {
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}
