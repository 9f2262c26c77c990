const DEFAULT_DOWNLOAD_FILENAME: &str = "extracted_content.md";
const DOWNLOAD_LINK_LABEL: &str = "Download Markdown File";

/// A self-contained download link: the content is embedded in the href as a
/// base64 data URI, so a browser can offer it as a file without any server
/// round-trip. Construction is pure and in-memory; the encoded payload always
/// decodes back to `content` byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DownloadLink {
    content: String,
    filename: String,
    encoded_payload: String,
}

impl DownloadLink {
    fn new(content: &str, filename: Option<&str>) -> Self {
        let encoded_payload = BASE64.encode(content.as_bytes());
        Self {
            content: content.to_string(),
            filename: filename.unwrap_or(DEFAULT_DOWNLOAD_FILENAME).to_string(),
            encoded_payload,
        }
    }

    fn data_uri(&self) -> String {
        format!("data:file/markdown;base64,{}", self.encoded_payload)
    }

    fn anchor_markup(&self) -> String {
        format!(
            "<a href=\"{}\" download=\"{}\">{}</a>",
            self.data_uri(),
            self.filename,
            DOWNLOAD_LINK_LABEL
        )
    }

    fn payload_len(&self) -> usize {
        self.encoded_payload.len()
    }
}

#[cfg(test)]
mod encode_tests {
    use super::*;
    use base64::Engine as _;

    fn decoded_payload(link: &DownloadLink) -> String {
        let bytes = BASE64.decode(link.encoded_payload.as_bytes()).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn payload_round_trips_byte_for_byte() {
        let content = "# Heading\n\nSome *markdown* with unicode: 안녕하세요 — ✓\n";
        let link = DownloadLink::new(content, None);
        assert_eq!(decoded_payload(&link), content);
    }

    #[test]
    fn empty_content_encodes_to_empty_payload() {
        let link = DownloadLink::new("", Some("x.md"));
        assert_eq!(link.encoded_payload, "");
        assert_eq!(decoded_payload(&link), "");
        assert_eq!(link.data_uri(), "data:file/markdown;base64,");
    }

    #[test]
    fn anchor_carries_filename_and_payload() {
        let link = DownloadLink::new("hello", Some("notes.md"));
        let markup = link.anchor_markup();
        assert!(markup.contains("download=\"notes.md\""));
        assert!(markup.contains(">Download Markdown File</a>"));
        assert!(markup.starts_with("<a href=\"data:file/markdown;base64,"));
        assert_eq!(decoded_payload(&link), "hello");
    }

    #[test]
    fn filename_defaults_to_extracted_content() {
        let link = DownloadLink::new("anything", None);
        assert_eq!(link.filename, "extracted_content.md");
        assert!(
            link.anchor_markup()
                .contains("download=\"extracted_content.md\"")
        );
    }

    #[test]
    fn construction_is_deterministic() {
        let a = DownloadLink::new("same input", Some("a.md"));
        let b = DownloadLink::new("same input", Some("a.md"));
        assert_eq!(a, b);
    }
}
