use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use qiitadl_core::{ErrorKind, QiitadlError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("JSONの解析に失敗しました")]
    InvalidJson,

    #[error("URLが指定されていません")]
    MissingUrl,

    #[error("有効なURLを入力してください")]
    InvalidUrl,

    #[error("QiitaのURLを入力してください")]
    UnsupportedDomain,

    #[error("一時ディレクトリの作成に失敗しました")]
    Workspace,

    #[error("記事のダウンロードに失敗しました: {0}")]
    DownloadFailed(String),

    #[error("ZIPファイルの作成に失敗しました: {0}")]
    ArchiveFailed(String),

    #[error("ファイルの送信に失敗しました: {0}")]
    SendFailed(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson | ApiError::MissingUrl | ApiError::InvalidUrl | ApiError::UnsupportedDomain => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Workspace
            | ApiError::DownloadFailed(_)
            | ApiError::ArchiveFailed(_)
            | ApiError::SendFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<QiitadlError> for ApiError {
    fn from(err: QiitadlError) -> Self {
        match (err.kind(), &err) {
            (ErrorKind::Validation, QiitadlError::UnsupportedDomain { .. }) => ApiError::UnsupportedDomain,
            (ErrorKind::Validation, _) => ApiError::InvalidUrl,
            (ErrorKind::Fetch | ErrorKind::Extraction, _) => ApiError::DownloadFailed(err.to_string()),
            (ErrorKind::Packaging, _) => ApiError::ArchiveFailed(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
