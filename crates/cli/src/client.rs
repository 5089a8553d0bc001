//! 透かしサービスのHTTPクライアント。

use anyhow::Context;
use photomint_types::{
    EmbedRequest, EmbedResponse, ErrorResponse, ExtractRequest, ExtractResponse, HealthResponse,
    VerificationResult, VerifyRequest,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub struct ServiceClient {
    base_url: String,
    http: reqwest::Client,
}

impl ServiceClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> anyhow::Result<HealthResponse> {
        let resp = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .with_context(|| format!("{} に接続できません", self.base_url))?;
        parse_response(resp).await
    }

    pub async fn embed(&self, request: &EmbedRequest) -> anyhow::Result<EmbedResponse> {
        self.post("/embed", request).await
    }

    pub async fn extract(&self, request: &ExtractRequest) -> anyhow::Result<ExtractResponse> {
        self.post("/extract", request).await
    }

    pub async fn verify(&self, request: &VerifyRequest) -> anyhow::Result<VerificationResult> {
        self.post("/verify", request).await
    }

    async fn post<Req: Serialize, Res: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> anyhow::Result<Res> {
        let resp = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("{} に接続できません", self.base_url))?;
        parse_response(resp).await
    }
}

/// 成功時はJSONをパースし、失敗時は `{"error"}` ボディをエラーメッセージにする。
async fn parse_response<Res: DeserializeOwned>(resp: reqwest::Response) -> anyhow::Result<Res> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json::<Res>()
            .await
            .context("レスポンスのパースに失敗しました");
    }

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.error)
        .unwrap_or(text);
    anyhow::bail!("サービスがエラーを返しました (HTTP {status}): {message}")
}
