//! HTML login page for OAuth authorization.

use super::authority::AuthorizationRequest;

/// Render the authorization login page.
///
/// Every authorization parameter round-trips as a hidden field. All values
/// are HTML-escaped to prevent XSS.
#[must_use]
pub fn render_login_page(request: &AuthorizationRequest, error_message: Option<&str>) -> String {
    let error_html = error_message
        .map(|msg| format!(r#"<div class="error">{}</div>"#, html_escape(msg)))
        .unwrap_or_default();

    let scopes: Vec<&str> = request.scope.split_whitespace().collect();
    let scopes_html = if scopes.is_empty() {
        String::new()
    } else {
        let items: String =
            scopes.iter().map(|s| format!("<li>{}</li>", html_escape(s))).collect();
        format!(
            r#"<div class="scopes"><p><strong>{client_name}</strong> is requesting the following permissions:</p><ul>{items}</ul></div>"#,
            client_name = html_escape(&request.client_name),
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>Authorize - Blog MCP</title>
<style>
body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background: #f5f5f5; margin: 0; display: flex; justify-content: center; align-items: center; min-height: 100vh; }}
.card {{ background: #fff; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); padding: 32px; max-width: 400px; width: 100%; }}
h1 {{ font-size: 20px; margin: 0 0 8px; color: #333; }}
.subtitle {{ color: #666; font-size: 14px; margin: 0 0 24px; }}
.error {{ background: #fee; border: 1px solid #c00; color: #c00; padding: 10px; border-radius: 4px; margin-bottom: 16px; }}
.scopes {{ margin-top: 16px; padding: 10px; background: #f5f5f5; border-radius: 4px; font-size: 14px; }}
label {{ display: block; font-size: 14px; font-weight: 500; margin: 12px 0 6px; color: #333; }}
input[type="text"], input[type="password"] {{ width: 100%; padding: 10px; border: 1px solid #ddd; border-radius: 4px; font-size: 14px; box-sizing: border-box; }}
button {{ width: 100%; padding: 10px; background: #4a90d9; color: #fff; border: none; border-radius: 4px; font-size: 14px; font-weight: 500; cursor: pointer; margin-top: 16px; }}
button:hover {{ background: #357abd; }}
</style>
</head>
<body>
<div class="card">
<h1>Blog MCP</h1>
<p class="subtitle"><strong>{client_name}</strong> is requesting access to your account</p>
{error_html}
<form method="POST" action="/oauth/login">
<input type="hidden" name="response_type" value="code">
<input type="hidden" name="client_id" value="{client_id}">
<input type="hidden" name="redirect_uri" value="{redirect_uri}">
<input type="hidden" name="state" value="{state}">
<input type="hidden" name="scope" value="{scope}">
<input type="hidden" name="code_challenge" value="{code_challenge}">
<input type="hidden" name="code_challenge_method" value="{code_challenge_method}">
<label for="username">Username</label>
<input type="text" id="username" name="username" autocomplete="username" required autofocus>
<label for="password">Password</label>
<input type="password" id="password" name="password" autocomplete="current-password" required>
{scopes_html}
<button type="submit">Login &amp; Authorize</button>
</form>
</div>
</body>
</html>"#,
        client_name = html_escape(&request.client_name),
        client_id = html_escape(&request.client_id),
        redirect_uri = html_escape(&request.redirect_uri),
        state = html_escape(request.state.as_deref().unwrap_or_default()),
        scope = html_escape(&request.scope),
        code_challenge = html_escape(request.code_challenge.as_deref().unwrap_or_default()),
        code_challenge_method = request.code_challenge_method.as_str(),
    )
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::oauth::types::CodeChallengeMethod;

    fn request() -> AuthorizationRequest {
        AuthorizationRequest {
            client_id: "c1".into(),
            client_name: "Test App".into(),
            redirect_uri: "https://cb".into(),
            state: Some("xyz".into()),
            scope: "read write".into(),
            code_challenge: Some("challenge1".into()),
            code_challenge_method: CodeChallengeMethod::S256,
        }
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<script>alert("xss")</script>"#),
            "&lt;script&gt;alert(&quot;xss&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_render_round_trips_parameters() {
        let html = render_login_page(&request(), None);
        assert!(html.contains("Test App"));
        assert!(html.contains(r#"name="client_id" value="c1""#));
        assert!(html.contains(r#"name="state" value="xyz""#));
        assert!(html.contains(r#"name="code_challenge_method" value="S256""#));
        assert!(html.contains("<li>write</li>"));
        assert!(!html.contains(r#"<div class="error">"#));
    }

    #[test]
    fn test_render_with_error() {
        let html = render_login_page(&request(), Some("Invalid username or password"));
        assert!(html.contains(r#"<div class="error">Invalid username or password</div>"#));
    }

    #[test]
    fn test_render_escapes_state() {
        let mut req = request();
        req.state = Some(r#""><script>"#.into());
        let html = render_login_page(&req, None);
        assert!(!html.contains("<script>"));
    }
}
