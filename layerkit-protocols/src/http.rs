//! HTTP message layer
//!
//! A single free-text field holding the raw message. No ports are assumed:
//! the binding sniffs the TCP body's leading bytes for a request method or
//! a status line, so HTTP on any port dissects. The payload has no default,
//! so building an HTTP layer without supplying text is a format error.

use crate::tcp;
use layerkit_engine::{FieldDesc, HeaderType, Registry};

pub const NAME: &str = "http";

const METHODS: &[&[u8]] = &[
    b"GET ", b"POST ", b"PUT ", b"DELETE ", b"HEAD ", b"OPTIONS ", b"PATCH ", b"TRACE ",
    b"CONNECT ",
];

/// Does this buffer start like an HTTP request or response?
pub fn looks_like_http(data: &[u8]) -> bool {
    data.starts_with(b"HTTP/") || METHODS.iter().any(|m| data.starts_with(m))
}

pub fn header_type() -> HeaderType {
    HeaderType::new(NAME).field(FieldDesc::text("payload"))
}

pub fn register(reg: &mut Registry) {
    reg.register(header_type());
    reg.bind_content(tcp::NAME, looks_like_http, NAME);
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerkit_core::Error;
    use layerkit_engine::{Header, Options};
    use std::sync::Arc;

    #[test]
    fn test_sniffer() {
        assert!(looks_like_http(b"GET /index.html HTTP/1.1\r\n"));
        assert!(looks_like_http(b"HTTP/1.1 200 OK\r\n"));
        assert!(!looks_like_http(b"SSH-2.0-OpenSSH_9.6\r\n"));
        assert!(!looks_like_http(b""));
    }

    #[test]
    fn test_payload_roundtrip() {
        let ty = Arc::new(header_type());
        let text = "GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let hdr = Header::from_type(&ty, &Options::new().set("payload", text));
        let bytes = hdr.to_bytes().unwrap();
        assert_eq!(bytes, text.as_bytes());

        let parsed = Header::parse(&ty, &bytes).unwrap();
        assert_eq!(parsed.text_of("payload"), Some(text));
    }

    #[test]
    fn test_missing_payload_is_format_error() {
        let ty = Arc::new(header_type());
        let hdr = Header::from_type(&ty, &Options::new());
        let err = hdr.to_bytes().unwrap_err();
        assert!(err.is_format());
        assert!(matches!(err, Error::MissingValue { field: "payload", .. }));
    }
}
