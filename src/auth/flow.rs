use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::http::Uri;
use axum::response::Html;
use axum::routing::get;
use thiserror::Error;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("authorization was cancelled")]
    Cancelled,
    #[error("{0}")]
    Failed(String),
}

/// Interactive step of the authorization: show the consent page to the user and
/// hand back the URL the provider redirected to
#[async_trait]
pub trait AuthFlow: Send + Sync {
    async fn launch(&self, auth_url: &Url) -> Result<Url, FlowError>;
}

pub type DynAuthFlow = Arc<dyn AuthFlow>;

const CALLBACK_PATH: &str = "/callback";

const CALLBACK_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>YouTube to Spotify</title></head>
<body style="font-family: system-ui; text-align: center; padding-top: 80px;">
<h2>Authorization complete</h2>
<p>You can close this tab and return to the terminal.</p>
</body>
</html>"#;

/// Opens the consent page in the system browser and catches the redirect on a
/// local HTTP listener
///
/// The listener lives inside the `launch` future: dropping it on timeout or
/// cancellation releases the callback port.
pub struct LoopbackFlow {
    host: String,
    port: u16,
    open_browser: bool,
}

impl LoopbackFlow {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            open_browser: true,
        }
    }

    /// Only print the consent URL instead of opening it
    pub fn with_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    fn router(tx: Arc<Mutex<Option<oneshot::Sender<Uri>>>>) -> Router {
        Router::new().route(
            CALLBACK_PATH,
            get(move |uri: Uri| {
                let tx = tx.clone();
                async move {
                    if let Some(sender) = tx.lock().await.take() {
                        let _ = sender.send(uri);
                    }
                    Html(CALLBACK_PAGE)
                }
            }),
        )
    }
}

#[async_trait]
impl AuthFlow for LoopbackFlow {
    async fn launch(&self, auth_url: &Url) -> Result<Url, FlowError> {
        let bind_addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| {
                FlowError::Failed(format!(
                    "failed to bind callback server on {}: {}",
                    bind_addr, e
                ))
            })?;

        let (tx, rx) = oneshot::channel();
        let app = Self::router(Arc::new(Mutex::new(Some(tx))));
        let server = axum::serve(listener, app).into_future();
        debug!("callback server listening on {}", bind_addr);

        if !self.open_browser || webbrowser::open(auth_url.as_str()).is_err() {
            info!(
                "Please authorize the app by visiting the following URL: {}",
                auth_url
            );
        } else {
            info!("Please authorize the app in your browser");
        }

        let uri = tokio::select! {
            received = rx => received.map_err(|_| FlowError::Cancelled)?,
            res = server => {
                return Err(FlowError::Failed(match res {
                    Ok(()) => "callback server stopped".to_string(),
                    Err(e) => format!("callback server failed: {}", e),
                }));
            }
        };

        let redirect = format!("http://{}{}", bind_addr, uri);
        Url::parse(&redirect)
            .map_err(|e| FlowError::Failed(format!("invalid redirect URL {}: {}", redirect, e)))
    }
}
