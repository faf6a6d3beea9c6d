//! RFC 5322 message assembly for `users.messages.send`

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::types::OutgoingMessage;

/// Header values may not carry raw CR/LF.
fn sanitize_header(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Non-ASCII subjects are sent as an RFC 2047 encoded-word.
fn encode_subject(subject: &str) -> String {
    let subject = sanitize_header(subject);
    if subject.is_ascii() {
        subject
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(subject.as_bytes()))
    }
}

fn address_header(name: &str, addresses: &[String]) -> Option<String> {
    let list: Vec<String> = addresses
        .iter()
        .map(|a| sanitize_header(a.trim()))
        .filter(|a| !a.is_empty())
        .collect();
    (!list.is_empty()).then(|| format!("{name}: {}", list.join(", ")))
}

/// Build the raw message text. The body is base64-encoded so any UTF-8 content survives transport.
pub fn build_raw_message(message: &OutgoingMessage) -> String {
    let content_type = if message.html { "text/html" } else { "text/plain" };

    let mut lines: Vec<String> = [
        address_header("To", &message.to),
        address_header("Cc", &message.cc),
        address_header("Bcc", &message.bcc),
    ]
    .into_iter()
    .flatten()
    .collect();
    lines.push(format!("Subject: {}", encode_subject(&message.subject)));
    lines.push("MIME-Version: 1.0".to_string());
    lines.push(format!("Content-Type: {content_type}; charset=\"UTF-8\""));
    lines.push("Content-Transfer-Encoding: base64".to_string());
    lines.push(String::new());

    let encoded = STANDARD.encode(message.body.as_bytes());
    // 76 字符换行；base64 输出只含 ASCII，按字节切分安全
    for chunk in encoded.as_bytes().chunks(76) {
        lines.push(String::from_utf8_lossy(chunk).into_owned());
    }

    lines.join("\r\n")
}
