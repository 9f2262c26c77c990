#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ArtifactKind {
    Markdown,
    LinkPage,
    Report,
}

impl ArtifactKind {
    fn label(self) -> &'static str {
        match self {
            ArtifactKind::Markdown => "markdown",
            ArtifactKind::LinkPage => "link page",
            ArtifactKind::Report => "report",
        }
    }
}

fn detect_artifact_kind(path: &str, fallback: ArtifactKind) -> ArtifactKind {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        ArtifactKind::LinkPage
    } else if lower.ends_with(".json") {
        ArtifactKind::Report
    } else if lower.ends_with(".md") || lower.ends_with(".markdown") {
        ArtifactKind::Markdown
    } else {
        fallback
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExtractionReport {
    url: String,
    final_url: String,
    status: u16,
    content_type: String,
    title: String,
    description: String,
    word_count: usize,
    size: usize,
    response_time_ms: u64,
    redirect_chain: Vec<String>,
    fetched_at: String,
    markdown: String,
}

fn doc_to_report(doc: &ExtractedDoc) -> ExtractionReport {
    ExtractionReport {
        url: doc.url.clone(),
        final_url: doc.final_url.clone(),
        status: doc.status,
        content_type: doc.content_type.clone(),
        title: doc.title.clone(),
        description: doc.description.clone(),
        word_count: doc.word_count,
        size: doc.size,
        response_time_ms: doc.response_time_ms,
        redirect_chain: doc
            .redirects
            .iter()
            .map(|hop| format!("{} {}", hop.status, hop.url))
            .collect(),
        fetched_at: doc.fetched_at.clone(),
        markdown: doc.markdown.clone(),
    }
}

fn save_markdown(path: &str, doc: &ExtractedDoc) -> Result<(), ExtractError> {
    fs::write(path, doc.markdown.as_bytes())?;
    Ok(())
}

/// Writes a minimal HTML document carrying the raw anchor markup, so the
/// download works from a double-clicked local file.
fn save_link_page(path: &str, doc: &ExtractedDoc, link: &DownloadLink) -> Result<(), ExtractError> {
    let title = if doc.title.is_empty() {
        doc.final_url.as_str()
    } else {
        doc.title.as_str()
    };

    let mut file = File::create(path)?;
    writeln!(file, "<!doctype html>")?;
    writeln!(file, "<html lang=\"en\">")?;
    writeln!(
        file,
        "<head><meta charset=\"utf-8\"><title>{}</title></head>",
        escape_html(title)
    )?;
    writeln!(file, "<body>")?;
    writeln!(
        file,
        "<p>Extracted from <code>{}</code> &mdash; {} words, {} bytes of markdown.</p>",
        escape_html(&doc.final_url),
        doc.word_count,
        link.content.len()
    )?;
    writeln!(file, "{}", link.anchor_markup())?;
    writeln!(file, "</body>")?;
    writeln!(file, "</html>")?;
    file.flush()?;
    Ok(())
}

fn save_report(path: &str, doc: &ExtractedDoc) -> Result<(), ExtractError> {
    let report = doc_to_report(doc);
    let json = serde_json::to_string_pretty(&report)
        .map_err(|err| ExtractError::Encoding(err.to_string()))?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;
    file.flush()?;
    Ok(())
}

fn save_artifact(
    path: &str,
    kind: ArtifactKind,
    doc: &ExtractedDoc,
    link: &DownloadLink,
) -> Result<(), ExtractError> {
    match kind {
        ArtifactKind::Markdown => save_markdown(path, doc),
        ArtifactKind::LinkPage => save_link_page(path, doc, link),
        ArtifactKind::Report => save_report(path, doc),
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn default_output_path(url: &str, kind: ArtifactKind) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| "extract".to_string());
    let host = host
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>();
    let ts = Utc::now().format("%Y%m%d_%H%M%S");
    match kind {
        ArtifactKind::Markdown => format!("{host}_{ts}.md"),
        ArtifactKind::LinkPage => format!("{host}_{ts}.html"),
        ArtifactKind::Report => format!("{host}_{ts}.json"),
    }
}

#[cfg(test)]
mod data_io_tests {
    use super::*;

    fn sample_doc() -> ExtractedDoc {
        ExtractedDoc {
            url: "https://docs.example.com/guide".to_string(),
            final_url: "https://docs.example.com/guide/".to_string(),
            status: 200,
            content_type: "text/html".to_string(),
            title: "Guide <1>".to_string(),
            description: "A guide".to_string(),
            markdown: "# Guide\n\nbody text\n".to_string(),
            word_count: 3,
            size: 512,
            response_time_ms: 42,
            redirects: vec![RedirectHop {
                status: 301,
                url: "https://docs.example.com/guide/".to_string(),
            }],
            fetched_at: "2026-08-02T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn markdown_file_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        let doc = sample_doc();
        save_markdown(path.to_str().unwrap(), &doc).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), doc.markdown);
    }

    #[test]
    fn link_page_embeds_the_exact_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        let doc = sample_doc();
        let link = DownloadLink::new(&doc.markdown, None);
        save_link_page(path.to_str().unwrap(), &doc, &link).unwrap();
        let body = fs::read_to_string(&path).unwrap();
        assert!(body.contains(&link.anchor_markup()));
        assert!(body.contains("Guide &lt;1&gt;"));
    }

    #[test]
    fn report_round_trips_through_serde() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let doc = sample_doc();
        save_report(path.to_str().unwrap(), &doc).unwrap();
        let parsed: ExtractionReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.url, doc.url);
        assert_eq!(parsed.status, 200);
        assert_eq!(parsed.markdown, doc.markdown);
        assert_eq!(
            parsed.redirect_chain,
            vec!["301 https://docs.example.com/guide/".to_string()]
        );
    }

    #[test]
    fn artifact_kind_follows_extension() {
        assert_eq!(
            detect_artifact_kind("a.html", ArtifactKind::Markdown),
            ArtifactKind::LinkPage
        );
        assert_eq!(
            detect_artifact_kind("a.JSON", ArtifactKind::Markdown),
            ArtifactKind::Report
        );
        assert_eq!(
            detect_artifact_kind("a.md", ArtifactKind::Report),
            ArtifactKind::Markdown
        );
        assert_eq!(
            detect_artifact_kind("no-extension", ArtifactKind::Report),
            ArtifactKind::Report
        );
    }

    #[test]
    fn default_output_path_sanitizes_the_host() {
        let path = default_output_path("https://docs.example.com/x?y=1", ArtifactKind::Markdown);
        assert!(path.starts_with("docs_example_com_"));
        assert!(path.ends_with(".md"));

        let page = default_output_path("not a url", ArtifactKind::LinkPage);
        assert!(page.starts_with("extract_"));
        assert!(page.ends_with(".html"));
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html("<a href=\"x\">&</a>"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;"
        );
    }
}
