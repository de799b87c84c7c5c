// ABOUTME: Public legal document routes (privacy policy, terms of service)
// ABOUTME: Renders static HTML naming the tenant resolved from app_id query or X-App-ID header
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::middleware::tenant::app_id_from_query;
use crate::resources::ServerResources;
use crate::tenant::TenantRegistry;
use axum::{
    extract::State,
    http::{HeaderMap, Uri},
    response::Html,
    routing::get,
    Router,
};
use std::sync::Arc;
use unified_core::constants::headers::X_APP_ID;

const FALLBACK_APP_NAME: &str = "Our App";

const STYLE: &str = "body{font-family:-apple-system,BlinkMacSystemFont,sans-serif;max-width:800px;\
                     margin:0 auto;padding:20px;color:#333}h1{color:#1a1a1a}h2{color:#444;margin-top:30px}";

/// Legal document routes
pub struct LegalRoutes;

impl LegalRoutes {
    /// Create the privacy and terms routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/legal/privacy", get(Self::handle_privacy))
            .route("/api/legal/terms", get(Self::handle_terms))
            .with_state(resources)
    }

    async fn handle_privacy(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        uri: Uri,
    ) -> Html<String> {
        let app = AppIdentity::resolve(&resources.registry, &headers, &uri);
        Html(privacy_policy(&app))
    }

    async fn handle_terms(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        uri: Uri,
    ) -> Html<String> {
        let app = AppIdentity::resolve(&resources.registry, &headers, &uri);
        Html(terms_of_service(&app))
    }
}

/// HTML-escaped name and contact of the app a legal page is rendered for
struct AppIdentity {
    name: String,
    contact: Option<String>,
}

impl AppIdentity {
    fn resolve(registry: &TenantRegistry, headers: &HeaderMap, uri: &Uri) -> Self {
        let app_id = app_id_from_query(uri).or_else(|| {
            headers
                .get(X_APP_ID)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        });

        let Some(config) = app_id.as_deref().and_then(|id| registry.get(id)) else {
            return Self {
                name: FALLBACK_APP_NAME.to_owned(),
                contact: None,
            };
        };

        let name = if config.app_name.is_empty() {
            FALLBACK_APP_NAME
        } else {
            config.app_name.as_str()
        };
        Self {
            name: html_escape::encode_text(name).into_owned(),
            contact: Some(
                html_escape::encode_text(&format!("support@{}.app", config.app_id)).into_owned(),
            ),
        }
    }

    fn contact_line(&self) -> String {
        self.contact.as_ref().map_or_else(
            || "please reach out through the app's support page".to_owned(),
            |contact| format!("contact us at {contact}"),
        )
    }
}

fn privacy_policy(app: &AppIdentity) -> String {
    let name = &app.name;
    let contact = app.contact_line();
    format!(
        r#"<!DOCTYPE html>
<html><head><title>Privacy Policy - {name}</title>
<meta name="viewport" content="width=device-width, initial-scale=1">
<style>{STYLE}</style>
</head><body>
<h1>Privacy Policy</h1>
<h2>Information We Collect</h2>
<p>We collect your email address and app usage data to provide our services. If you sign in with Apple, we receive your Apple ID identifier.</p>
<h2>How We Use Your Information</h2>
<p>Your data is used solely to operate {name}, authenticate your account, and improve our services.</p>
<h2>Data Storage</h2>
<p>Your data is stored securely. We do not sell your personal information to third parties.</p>
<h2>Account Deletion</h2>
<p>You can delete your account and all associated data at any time from the app settings.</p>
<h2>Contact</h2>
<p>For questions about this policy, {contact}.</p>
</body></html>"#
    )
}

fn terms_of_service(app: &AppIdentity) -> String {
    let name = &app.name;
    let contact = app.contact_line();
    format!(
        r#"<!DOCTYPE html>
<html><head><title>Terms of Service - {name}</title>
<meta name="viewport" content="width=device-width, initial-scale=1">
<style>{STYLE}</style>
</head><body>
<h1>Terms of Service</h1>
<h2>Acceptance</h2>
<p>By using {name}, you agree to these terms.</p>
<h2>User Conduct</h2>
<p>You agree not to post offensive, illegal, or harmful content. We reserve the right to remove content that violates our guidelines.</p>
<h2>Termination</h2>
<p>We may suspend or terminate accounts that violate these terms.</p>
<h2>Contact</h2>
<p>For questions, {contact}.</p>
</body></html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_app_uses_fallback_name() {
        let registry = TenantRegistry::default();
        let uri: Uri = "/api/legal/privacy?app_id=nope".parse().unwrap();
        let app = AppIdentity::resolve(&registry, &HeaderMap::new(), &uri);
        assert_eq!(app.name, FALLBACK_APP_NAME);
        assert!(privacy_policy(&app).contains("Privacy Policy - Our App"));
    }

    #[test]
    fn test_app_name_is_escaped() {
        let registry = TenantRegistry::from_json(
            r#"{"apps":[{"app_id":"evil","app_name":"<script>alert(1)</script>"}]}"#,
        )
        .unwrap();
        let uri: Uri = "/api/legal/terms?app_id=evil".parse().unwrap();
        let app = AppIdentity::resolve(&registry, &HeaderMap::new(), &uri);
        let html = terms_of_service(&app);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
