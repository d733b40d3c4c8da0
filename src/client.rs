// src/client.rs

use crate::{config::AppConfig, error::*, models::Credential};
use log::{debug, warn};
use reqwest::{Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::sync::Arc;

#[derive(Clone)]
pub struct RobustClient {
    pub client: ClientWithMiddleware,
    config: Arc<AppConfig>,
}

impl RobustClient {
    pub fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(
            reqwest::Client::builder()
                .user_agent(config.user_agent.clone())
                .connect_timeout(config.connect_timeout)
                .timeout(config.timeout)
                .cookie_store(true)
                .build()?,
        )
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

        Ok(Self { client, config })
    }

    /// 以 HTTP Basic 方式携带凭据。门户本身使用 NTLM 认证，这里没有实现 NTLM 握手。
    fn authorize(&self, builder: RequestBuilder, credential: &Credential) -> RequestBuilder {
        let user = credential.qualified_username(self.config.portal.auth_domain.as_deref());
        builder.basic_auth(user, Some(&credential.password))
    }

    fn check_status(url: &str, res: Response) -> AppResult<Response> {
        match res.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::AuthFailure),
            status if !status.is_success() => {
                warn!("请求 '{}' 返回状态码 {}", url, status);
                Err(AppError::PageFetch { url: url.to_string(), status })
            }
            _ => Ok(res),
        }
    }

    /// 带认证的 GET 请求，非 2xx 响应转换为错误。
    pub async fn get(&self, url: &str, credential: &Credential) -> AppResult<Response> {
        debug!("GET {}", url);
        let res = self.authorize(self.client.get(url), credential).send().await?;
        Self::check_status(url, res)
    }

    /// 下载单个文件。凭据此前已验证过，403 只代表该文件不可访问，不视为认证失败。
    pub async fn get_file(&self, url: &str, credential: &Credential) -> AppResult<Response> {
        debug!("GET (file) {}", url);
        let res = self.authorize(self.client.get(url), credential).send().await?;
        if res.status() == StatusCode::FORBIDDEN {
            warn!("文件 '{}' 返回 403", url);
            return Err(AppError::Forbidden(url.to_string()));
        }
        Self::check_status(url, res)
    }

    pub async fn get_html(&self, url: &str, credential: &Credential) -> AppResult<String> {
        Ok(self.get(url, credential).await?.text().await?)
    }

    /// 提交表单 (ASP.NET 回发)，返回响应页面的 HTML。
    pub async fn post_form(
        &self,
        url: &str,
        credential: &Credential,
        form: &[(String, String)],
    ) -> AppResult<String> {
        debug!("POST {} ({} 个字段)", url, form.len());
        let res = self
            .authorize(self.client.post(url), credential)
            .form(form)
            .send()
            .await?;
        Ok(Self::check_status(url, res)?.text().await?)
    }

    /// 不携带门户凭据的 GET 请求，用于第三方接口。
    pub async fn get_public(&self, url: &str) -> AppResult<Response> {
        debug!("GET (public) {}", url);
        Ok(self.client.get(url).send().await?)
    }

    /// 验证凭据：登录页返回 200 即视为成功。
    pub async fn login(&self, credential: &Credential) -> AppResult<()> {
        let url = self.config.portal.login_url.clone();
        self.get(&url, credential).await.map(drop)
    }
}
