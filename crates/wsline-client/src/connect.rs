//! Connect path: URL validation, handshake request, and the handshake itself.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::handshake::client::{Request, Response};
use tokio_tungstenite::tungstenite::http::header::{
    AUTHORIZATION, HOST, ORIGIN, SEC_WEBSOCKET_PROTOCOL,
};
use tokio_tungstenite::tungstenite::http::{HeaderMap, HeaderName, HeaderValue};
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, tungstenite};
use tracing::{debug, instrument};
use url::Url;
use wsline_settings::ClientSettings;

use crate::errors::ConnectError;
use crate::tls;

/// Client WebSocket stream over plain TCP or TLS.
pub type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Validate a connect target and normalize `http(s)` to `ws(s)`.
pub fn parse_connect_url(raw: &str) -> Result<Url, ConnectError> {
    let mut url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            return Err(ConnectError::MissingScheme(raw.to_string()));
        }
        Err(url::ParseError::EmptyHost) => {
            return Err(ConnectError::MissingHost(raw.to_string()));
        }
        Err(_) => return Err(ConnectError::InvalidUrl(raw.to_string())),
    };

    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConnectError::MissingHost(raw.to_string()));
    }

    let scheme = match url.scheme() {
        "ws" | "wss" => None,
        "http" => Some("ws"),
        "https" => Some("wss"),
        _ => return Err(ConnectError::MalformedScheme(raw.to_string())),
    };
    if let Some(scheme) = scheme {
        url.set_scheme(scheme)
            .map_err(|()| ConnectError::MalformedScheme(raw.to_string()))?;
    }

    Ok(url)
}

/// Build the handshake request with the configured headers.
///
/// Custom headers are applied after `Origin` and `Host`, so they can override
/// them; `Authorization` and the subprotocol header are applied last.
pub fn build_request(url: &Url, settings: &ClientSettings) -> Result<Request, ConnectError> {
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|_| ConnectError::InvalidUrl(url.to_string()))?;
    let headers = request.headers_mut();

    if let Some(origin) = &settings.origin {
        insert(headers, ORIGIN, origin)?;
    }
    if let Some(host) = &settings.host {
        insert(headers, HOST, host)?;
    }
    for (name, value) in &settings.headers {
        let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ConnectError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            }
        })?;
        insert(headers, header, value)?;
    }
    if let Some(auth) = &settings.auth {
        insert(
            headers,
            AUTHORIZATION,
            &format!("Basic {}", STANDARD.encode(auth)),
        )?;
    }
    if let Some(subprotocol) = &settings.subprotocol {
        insert(headers, SEC_WEBSOCKET_PROTOCOL, subprotocol)?;
    }

    Ok(request)
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<(), ConnectError> {
    let value = HeaderValue::from_str(value).map_err(|e| ConnectError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    let _ = headers.insert(name, value);
    Ok(())
}

/// Perform the opening handshake, bounded by the configured timeout.
#[instrument(skip_all, fields(url = %url))]
pub async fn connect(
    url: &Url,
    settings: &ClientSettings,
) -> Result<(ClientStream, Response), ConnectError> {
    let request = build_request(url, settings)?;
    let connector = Connector::Rustls(tls::client_config(settings.no_tls_check)?);
    let timeout = settings.handshake_timeout();

    let handshake =
        tokio_tungstenite::connect_async_tls_with_config(request, None, false, Some(connector));

    let (stream, response) = match tokio::time::timeout(timeout, handshake).await {
        Err(_) => {
            return Err(ConnectError::HandshakeTimeout {
                url: url.to_string(),
                timeout,
            });
        }
        Ok(Err(tungstenite::Error::Protocol(ProtocolError::SecWebSocketSubProtocolError(e)))) => {
            debug!(error = %e, "subprotocol negotiation failed");
            return Err(ConnectError::MissingSubprotocol(
                settings.subprotocol.clone().unwrap_or_default(),
            ));
        }
        Ok(Err(e)) => {
            return Err(ConnectError::Handshake {
                url: url.to_string(),
                reason: e.to_string(),
            });
        }
        Ok(Ok(pair)) => pair,
    };

    debug!(status = %response.status(), "handshake complete");
    check_subprotocol(settings.subprotocol.as_deref(), &response)?;
    Ok((stream, response))
}

/// Enforce that a requested subprotocol was echoed by the server.
pub fn check_subprotocol(required: Option<&str>, response: &Response) -> Result<(), ConnectError> {
    let Some(required) = required else {
        return Ok(());
    };
    let selected = response
        .headers()
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok());
    if selected == Some(required) {
        Ok(())
    } else {
        Err(ConnectError::MissingSubprotocol(required.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    // ── parse_connect_url ───────────────────────────────────────────

    #[test]
    fn ws_and_wss_pass_through() {
        assert_eq!(
            parse_connect_url("ws://localhost:8080/chat").unwrap().as_str(),
            "ws://localhost:8080/chat"
        );
        assert_eq!(parse_connect_url("wss://example.com").unwrap().scheme(), "wss");
    }

    #[test]
    fn http_schemes_are_rewritten() {
        let url = parse_connect_url("http://example.com/x?y=1").unwrap();
        assert_eq!(url.as_str(), "ws://example.com/x?y=1");
        let url = parse_connect_url("https://example.com:8443/").unwrap();
        assert_eq!(url.as_str(), "wss://example.com:8443/");
    }

    #[test]
    fn missing_scheme() {
        assert_matches!(
            parse_connect_url("example.com/path"),
            Err(ConnectError::MissingScheme(u)) if u == "example.com/path"
        );
    }

    #[test]
    fn missing_host() {
        assert_matches!(parse_connect_url("ws://"), Err(ConnectError::MissingHost(_)));
        assert_matches!(parse_connect_url("localhost:8080"), Err(ConnectError::MissingHost(_)));
    }

    #[test]
    fn malformed_scheme() {
        assert_matches!(
            parse_connect_url("ftp://example.com"),
            Err(ConnectError::MalformedScheme(_))
        );
        assert_matches!(
            parse_connect_url("httpx://example.com"),
            Err(ConnectError::MalformedScheme(_))
        );
    }

    #[test]
    fn invalid_url() {
        assert_matches!(parse_connect_url("ws://[::1"), Err(ConnectError::InvalidUrl(_)));
    }

    // ── build_request ───────────────────────────────────────────────

    fn url() -> Url {
        parse_connect_url("ws://localhost:9000/").unwrap()
    }

    #[test]
    fn default_request_has_no_custom_headers() {
        let request = build_request(&url(), &ClientSettings::default()).unwrap();
        assert!(request.headers().get(ORIGIN).is_none());
        assert!(request.headers().get(AUTHORIZATION).is_none());
        assert!(request.headers().get(SEC_WEBSOCKET_PROTOCOL).is_none());
    }

    #[test]
    fn configured_headers_are_applied() {
        let mut settings = ClientSettings {
            origin: Some("http://origin.test".into()),
            host: Some("virtual.test".into()),
            auth: Some("user:pass".into()),
            subprotocol: Some("chat".into()),
            ..ClientSettings::default()
        };
        let _ = settings.headers.insert("X-Trace".into(), "abc".into());

        let request = build_request(&url(), &settings).unwrap();
        let headers = request.headers();
        assert_eq!(headers[ORIGIN], "http://origin.test");
        assert_eq!(headers[HOST], "virtual.test");
        assert_eq!(headers["x-trace"], "abc");
        assert_eq!(headers[AUTHORIZATION], "Basic dXNlcjpwYXNz");
        assert_eq!(headers[SEC_WEBSOCKET_PROTOCOL], "chat");
    }

    #[test]
    fn custom_header_overrides_origin() {
        let mut settings = ClientSettings {
            origin: Some("http://a.test".into()),
            ..ClientSettings::default()
        };
        let _ = settings.headers.insert("Origin".into(), "http://b.test".into());

        let request = build_request(&url(), &settings).unwrap();
        assert_eq!(request.headers()[ORIGIN], "http://b.test");
    }

    #[test]
    fn invalid_header_name() {
        let mut settings = ClientSettings::default();
        let _ = settings.headers.insert("bad header".into(), "v".into());
        assert_matches!(
            build_request(&url(), &settings),
            Err(ConnectError::InvalidHeader { name, .. }) if name == "bad header"
        );
    }

    #[test]
    fn invalid_header_value() {
        let settings = ClientSettings {
            origin: Some("line\nbreak".into()),
            ..ClientSettings::default()
        };
        assert_matches!(
            build_request(&url(), &settings),
            Err(ConnectError::InvalidHeader { .. })
        );
    }

    // ── check_subprotocol ───────────────────────────────────────────

    fn response_with(protocol: Option<&str>) -> Response {
        let mut builder = tungstenite::http::Response::builder().status(101);
        if let Some(p) = protocol {
            builder = builder.header(SEC_WEBSOCKET_PROTOCOL, p);
        }
        builder.body(None).unwrap()
    }

    #[test]
    fn subprotocol_not_required() {
        assert!(check_subprotocol(None, &response_with(None)).is_ok());
    }

    #[test]
    fn subprotocol_echoed() {
        assert!(check_subprotocol(Some("chat"), &response_with(Some("chat"))).is_ok());
    }

    #[test]
    fn subprotocol_missing_or_different() {
        assert_matches!(
            check_subprotocol(Some("chat"), &response_with(None)),
            Err(ConnectError::MissingSubprotocol(p)) if p == "chat"
        );
        assert_matches!(
            check_subprotocol(Some("chat"), &response_with(Some("superchat"))),
            Err(ConnectError::MissingSubprotocol(_))
        );
    }
}
