//! Network policy and page stability.
//!
//! Renders are audits, not faithful replays: third-party trackers and heavy
//! media only add latency and nondeterminism, so they are aborted at the
//! request stage. A pre-page script freezes animations so the screenshot
//! and the geometry the audit reads agree.

use serde_json::json;
use tracing::{debug, trace};

use crate::cdp::{CdpError, PageSession};

/// Host substrings whose requests are aborted.
const BLOCKED_HOST_TOKENS: &[&str] = &[
    "googletagmanager",
    "google-analytics",
    "doubleclick",
    "facebook",
    "hotjar",
    "segment",
    "mixpanel",
];

/// Path extensions whose requests are aborted.
const BLOCKED_MEDIA_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".avi", ".mov"];

/// Runs in every new document before page scripts. Freezes animations,
/// transitions and smooth scrolling so layout holds still for the audit.
const STABILITY_SCRIPT: &str = r#"
(() => {
  const css = `*, *::before, *::after {
    animation-duration: 0s !important;
    animation-delay: 0s !important;
    transition-duration: 0s !important;
    transition-delay: 0s !important;
    scroll-behavior: auto !important;
  }`;
  const inject = () => {
    const style = document.createElement('style');
    style.textContent = css;
    document.documentElement.appendChild(style);
  };
  if (document.documentElement) {
    inject();
  } else {
    document.addEventListener('DOMContentLoaded', inject, { once: true });
  }
})();
"#;

/// Whether a request URL should be aborted under the render policy.
///
/// Unparseable URLs are allowed through; the browser will fail them on its
/// own terms if they are truly malformed.
pub fn should_abort(raw_url: &str) -> bool {
    let Ok(url) = url::Url::parse(raw_url) else {
        return false;
    };

    if let Some(host) = url.host_str() {
        let host = host.to_ascii_lowercase();
        if BLOCKED_HOST_TOKENS.iter().any(|t| host.contains(t)) {
            return true;
        }
    }

    let path = url.path().to_ascii_lowercase();
    BLOCKED_MEDIA_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Installs the render-time network policy on a page.
pub struct NetworkPolicy;

impl NetworkPolicy {
    /// Install the stability script and request interception, and spawn the
    /// pump that answers paused requests.
    ///
    /// The pump exits when the page closes and its event channel is dropped.
    /// Takes the session's event stream, so it must run before anything
    /// else claims it.
    pub async fn install(session: &PageSession) -> Result<(), CdpError> {
        session.add_script_on_new_document(STABILITY_SCRIPT).await?;

        session
            .call(
                "Fetch.enable",
                Some(json!({
                    "patterns": [{"urlPattern": "*", "requestStage": "Request"}]
                })),
            )
            .await?;

        let caller = session.caller();
        let Some(mut events) = session.take_events() else {
            return Err(CdpError::InvalidResponse(
                "Session event stream already taken".to_string(),
            ));
        };

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if event.method.as_deref() != Some("Fetch.requestPaused") {
                    continue;
                }
                let Some(params) = event.params else { continue };
                let Some(request_id) = params["requestId"].as_str() else {
                    continue;
                };
                let url = params["request"]["url"].as_str().unwrap_or("");

                let outcome = if should_abort(url) {
                    trace!("Aborting request: {}", url);
                    caller
                        .call(
                            "Fetch.failRequest",
                            Some(json!({
                                "requestId": request_id,
                                "errorReason": "Aborted"
                            })),
                        )
                        .await
                } else {
                    caller
                        .call(
                            "Fetch.continueRequest",
                            Some(json!({"requestId": request_id})),
                        )
                        .await
                };

                // Command failures here mean the page is closing under us.
                if outcome.is_err() {
                    break;
                }
            }
            trace!("Interception pump finished");
        });

        debug!("Network policy installed on session {}", session.session_id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_hosts_blocked() {
        assert!(should_abort("https://www.googletagmanager.com/gtm.js?id=GTM-X"));
        assert!(should_abort("https://www.google-analytics.com/analytics.js"));
        assert!(should_abort("https://stats.g.doubleclick.net/r/collect"));
        assert!(should_abort("https://connect.facebook.net/en_US/fbevents.js"));
        assert!(should_abort("https://static.hotjar.com/c/hotjar.js"));
        assert!(should_abort("https://cdn.segment.com/analytics.js/v1/x/analytics.min.js"));
        assert!(should_abort("https://cdn.mixpanel.com/mixpanel-2-latest.min.js"));
    }

    #[test]
    fn test_first_party_allowed() {
        assert!(!should_abort("https://example.com/"));
        assert!(!should_abort("https://example.com/styles/main.css"));
        assert!(!should_abort("https://cdn.example.com/app.js"));
        assert!(!should_abort("https://fonts.gstatic.com/s/roboto/v30/x.woff2"));
    }

    #[test]
    fn test_media_extensions_blocked_on_any_host() {
        assert!(should_abort("https://example.com/hero.mp4"));
        assert!(should_abort("https://example.com/clip.webm"));
        assert!(should_abort("https://example.com/old.avi"));
        assert!(should_abort("https://example.com/teaser.MOV"));
    }

    #[test]
    fn test_query_string_does_not_hide_media() {
        assert!(should_abort("https://example.com/hero.mp4?quality=hd&t=3"));
    }

    #[test]
    fn test_media_name_without_extension_allowed() {
        assert!(!should_abort("https://example.com/mp4-downloads"));
        assert!(!should_abort("https://example.com/video?file=hero.mp4"));
    }

    #[test]
    fn test_unparseable_and_schemeless_allowed() {
        assert!(!should_abort("not a url"));
        assert!(!should_abort("data:text/html,<p>hi</p>"));
    }

    #[test]
    fn test_host_match_is_case_insensitive() {
        assert!(should_abort("https://WWW.GOOGLETAGMANAGER.COM/gtm.js"));
    }
}
