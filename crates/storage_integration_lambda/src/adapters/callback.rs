use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};

pub trait CallbackTransport {
    /// PUTs `body` to `url` and returns the HTTP status code.
    fn put(&self, url: &str, body: &str) -> Result<u16, String>;
}

/// Builds the PUT for a pre-signed `ResponseURL`.
///
/// The URL is signed without a content type, so the header is sent empty and
/// the length is set explicitly.
pub fn presigned_put(
    client: &reqwest::Client,
    url: &str,
    body: String,
) -> reqwest::RequestBuilder {
    client
        .put(url)
        .header(CONTENT_TYPE, "")
        .header(CONTENT_LENGTH, body.len())
        .body(body)
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use super::*;

    #[test]
    fn presigned_put_sends_empty_content_type_and_explicit_length() {
        let client = reqwest::Client::new();
        let body = r#"{"Status":"SUCCESS"}"#.to_string();

        let request = presigned_put(&client, "https://callback.example/put?sig=abc", body.clone())
            .build()
            .expect("request should build");

        assert_eq!(request.method(), &Method::PUT);
        assert_eq!(request.url().as_str(), "https://callback.example/put?sig=abc");
        assert_eq!(
            request.headers().get(CONTENT_TYPE).map(|value| value.as_bytes()),
            Some(&b""[..])
        );
        assert_eq!(
            request
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok()),
            Some("20")
        );
        assert_eq!(
            request.body().and_then(|body| body.as_bytes()),
            Some(body.as_bytes())
        );
    }
}
