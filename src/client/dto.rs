use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub jwt_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommentRequest<'a> {
    pub line: u32,
    pub line_text: &'a str,
    pub comments: Vec<CommentBody<'a>>,
}

#[derive(Debug, Serialize)]
pub struct CommentBody<'a> {
    pub author: &'a str,
    pub body: &'a str,
}

/// Extracts the anti-forgery token from a `Set-Cookie` header value.
pub fn xsrf_from_cookie(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("XSRF-TOKEN="))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_xsrf_token_from_cookie() {
        assert_eq!(
            xsrf_from_cookie("XSRF-TOKEN=abc123; Path=/; HttpOnly").as_deref(),
            Some("abc123")
        );
        assert_eq!(xsrf_from_cookie("JSESSIONID=1; Path=/"), None);
        assert_eq!(xsrf_from_cookie("XSRF-TOKEN=; Path=/"), None);
    }

    #[test]
    fn login_response_uses_camel_case() {
        let response: LoginResponse = serde_json::from_str(r#"{ "jwtToken": "t" }"#).unwrap();
        assert_eq!(response.jwt_token, "t");
    }
}
