fn send_status(tx: &UnboundedSender<ExtractEvent>, message: impl Into<String>) {
    let _ = tx.send(ExtractEvent::Status(message.into()));
}

#[derive(Debug, Clone)]
struct EngineOptions {
    timeout_secs: u64,
    retries: usize,
    user_agent: Option<String>,
    readability: bool,
}

impl EngineOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            timeout_secs: cli.timeout_secs,
            retries: cli.retries,
            user_agent: cli.user_agent.clone(),
            readability: cli.readability,
        }
    }
}

/// The fetch/extract collaborator boundary. All page retrieval and
/// HTML-to-markdown work lives behind this seam; the shell only sees
/// `ExtractedDoc` values and the error taxonomy.
#[async_trait]
trait ExtractionEngine: Send {
    async fn warmup(&mut self) -> Result<(), ExtractError>;
    async fn fetch(&mut self, url: &str) -> Result<ExtractedDoc, ExtractError>;
}

/// Production engine: spider performs the page fetch, spider_transformations
/// turns the response into markdown, and a redirect-disabled reqwest client
/// records the hop chain for the requested URL.
struct SpiderEngine {
    options: EngineOptions,
    client: Option<spider::Client>,
    probe: Option<reqwest::Client>,
}

impl SpiderEngine {
    fn new(options: EngineOptions) -> Self {
        Self {
            options,
            client: None,
            probe: None,
        }
    }

    fn deadline(&self) -> Duration {
        Duration::from_secs(self.options.timeout_secs.max(1))
    }
}

#[async_trait]
impl ExtractionEngine for SpiderEngine {
    async fn warmup(&mut self) -> Result<(), ExtractError> {
        let mut builder = ClientBuilder::new().timeout(self.deadline());
        if let Some(ua) = &self.options.user_agent {
            builder = builder.user_agent(ua.as_str());
        }
        let client = builder
            .build()
            .map_err(|err| ExtractError::Init(err.to_string()))?;

        let probe = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(10))
            .timeout(self.deadline())
            .build()
            .map_err(|err| ExtractError::Init(err.to_string()))?;

        self.client = Some(client);
        self.probe = Some(probe);
        tracing::debug!("extraction engine warmed");
        Ok(())
    }

    async fn fetch(&mut self, url: &str) -> Result<ExtractedDoc, ExtractError> {
        let Some(client) = self.client.as_ref() else {
            return Err(ExtractError::Init("engine not warmed up".to_string()));
        };

        let parsed = Url::parse(url)
            .map_err(|err| ExtractError::InvalidInput(format!("{url}: {err}")))?;
        let scheme = parsed.scheme().to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(ExtractError::InvalidInput(format!(
                "unsupported scheme: {scheme}"
            )));
        }

        let redirects = match self.probe.as_ref() {
            Some(probe) => redirect_chain(probe, url, 8).await,
            None => Vec::new(),
        };

        let deadline = self.deadline();
        let mut page: Option<Page> = None;
        let mut last_err: Option<ExtractError> = None;
        for attempt in 0..=self.options.retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
            }
            match tokio::time::timeout(deadline, Page::new(url, client)).await {
                Ok(fetched) => {
                    let status = fetched.status_code.as_u16();
                    if status == 0 {
                        last_err = Some(ExtractError::Fetch {
                            url: url.to_string(),
                            reason: "no response received (transport failure or unreachable host)"
                                .to_string(),
                        });
                        continue;
                    }
                    page = Some(fetched);
                    if (500..=599).contains(&status) && attempt < self.options.retries {
                        continue;
                    }
                    break;
                }
                Err(_) => {
                    last_err = Some(ExtractError::Timeout {
                        url: url.to_string(),
                        secs: self.options.timeout_secs.max(1),
                    });
                }
            }
        }

        let Some(page) = page else {
            return Err(last_err.unwrap_or_else(|| ExtractError::Fetch {
                url: url.to_string(),
                reason: "fetch could not start".to_string(),
            }));
        };

        let status = page.status_code.as_u16();
        let size = page.get_html_bytes_u8().len();
        if size == 0 {
            return Err(ExtractError::Parse {
                url: url.to_string(),
                reason: "empty response body".to_string(),
            });
        }

        let html = page.get_html();
        let doc_tree = Html::parse_document(&html);
        let title = extract_title(&doc_tree);
        let description = extract_meta_description(&doc_tree);
        let word_count = count_words(&doc_tree);

        let transform = TransformConfig {
            readability: self.options.readability,
            return_format: ReturnFormat::Markdown,
            filter_images: false,
            clean_html: true,
            filter_svg: true,
            main_content: false,
        };
        let markdown = transform_content(&page, &transform, &None, &None, &None);

        let response_time_ms = page.get_duration_elapsed().as_millis() as u64;
        let final_url = page.get_url_final().to_string();
        tracing::info!(url, final_url = %final_url, status, word_count, size, "extracted page");

        Ok(ExtractedDoc {
            url: url.to_string(),
            final_url,
            status,
            content_type: page_content_type(&page),
            title,
            description,
            markdown,
            word_count,
            size,
            response_time_ms,
            redirects,
            fetched_at: Utc::now().to_rfc3339(),
        })
    }
}

/// Follows the requested URL hop by hop with redirects disabled, recording
/// each 3xx target. Bounded by `max_hops` and a seen-set so redirect loops
/// terminate.
async fn redirect_chain(
    client: &reqwest::Client,
    start_url: &str,
    max_hops: usize,
) -> Vec<RedirectHop> {
    let mut hops = Vec::new();
    let mut current = start_url.to_string();
    let mut seen = HashSet::new();

    for _ in 0..max_hops.max(1) {
        if !seen.insert(current.clone()) {
            break;
        }
        let response = match client.get(current.as_str()).send().await {
            Ok(response) => response,
            Err(_) => break,
        };
        let status = response.status().as_u16();
        if !(300..=399).contains(&status) {
            break;
        }
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let Some(location) = location else {
            break;
        };
        let Some(next) = resolve_location(&current, &location) else {
            break;
        };
        hops.push(RedirectHop {
            status,
            url: next.clone(),
        });
        current = next;
    }

    hops
}

fn resolve_location(base: &str, location: &str) -> Option<String> {
    let location = location.trim();
    if location.is_empty() {
        return None;
    }
    Url::parse(base)
        .ok()?
        .join(location)
        .ok()
        .map(|u| u.to_string())
}

fn page_content_type(page: &Page) -> String {
    header_value(page, "content-type")
        .map(|v| v.split(';').next().unwrap_or("").trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_value(page: &Page, name: &'static str) -> Option<String> {
    page.headers.as_ref().and_then(|headers| {
        headers.iter().find_map(|(header_name, header_value)| {
            if header_name.as_str().eq_ignore_ascii_case(name) {
                header_value.to_str().ok().map(|v| v.to_string())
            } else {
                None
            }
        })
    })
}

fn extract_first_text(doc: &Html, selector: &str) -> String {
    let selector = match Selector::parse(selector) {
        Ok(s) => s,
        Err(_) => return String::new(),
    };

    for el in doc.select(&selector) {
        let text = normalize_text(&el.text().collect::<Vec<_>>().join(" "));
        if !text.is_empty() {
            return text;
        }
    }

    String::new()
}

fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_meta_content(doc: &Html, selector: &str) -> String {
    let selector = match Selector::parse(selector) {
        Ok(s) => s,
        Err(_) => return String::new(),
    };

    doc.select(&selector)
        .find_map(|el| el.value().attr("content"))
        .map(normalize_text)
        .unwrap_or_default()
}

fn extract_title(doc: &Html) -> String {
    let title = extract_first_text(doc, "title");
    if !title.is_empty() {
        return title;
    }
    let og_title = extract_meta_content(doc, "meta[property=\"og:title\"]");
    if !og_title.is_empty() {
        return og_title;
    }
    extract_meta_content(doc, "meta[name=\"twitter:title\"]")
}

fn extract_meta_description(doc: &Html) -> String {
    let description = extract_meta_content(doc, "meta[name=\"description\"]");
    if !description.is_empty() {
        return description;
    }
    let og_description = extract_meta_content(doc, "meta[property=\"og:description\"]");
    if !og_description.is_empty() {
        return og_description;
    }
    extract_meta_content(doc, "meta[name=\"twitter:description\"]")
}

fn count_words(doc: &Html) -> usize {
    doc.root_element()
        .text()
        .flat_map(|t| t.split_whitespace())
        .count()
}

/// Owns the warmed engine and serves run commands until shutdown. Warmup
/// happens once, on the first run; each run performs exactly one fetch with
/// the URL exactly as received.
async fn run_worker<E: ExtractionEngine>(
    mut engine: E,
    mut control_rx: UnboundedReceiver<ExtractControl>,
    tx: UnboundedSender<ExtractEvent>,
) {
    let mut warmed = false;

    while let Some(control) = control_rx.recv().await {
        match control {
            ExtractControl::Run { url } => {
                if !warmed {
                    send_status(&tx, "warming up extraction engine");
                    if let Err(err) = engine.warmup().await {
                        let _ = tx.send(ExtractEvent::Failed {
                            url,
                            error: err.to_string(),
                        });
                        let _ = tx.send(ExtractEvent::Finished);
                        continue;
                    }
                    warmed = true;
                }

                let _ = tx.send(ExtractEvent::Started { url: url.clone() });
                match engine.fetch(&url).await {
                    Ok(doc) => {
                        let _ = tx.send(ExtractEvent::Document(doc));
                    }
                    Err(err) => {
                        let _ = tx.send(ExtractEvent::Failed {
                            url,
                            error: err.to_string(),
                        });
                    }
                }
                let _ = tx.send(ExtractEvent::Finished);
            }
            ExtractControl::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod extract_tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn sample_doc(url: &str) -> ExtractedDoc {
        ExtractedDoc {
            url: url.to_string(),
            final_url: url.to_string(),
            status: 200,
            content_type: "text/html".to_string(),
            title: "sample".to_string(),
            description: String::new(),
            markdown: "# sample\n".to_string(),
            word_count: 1,
            size: 64,
            response_time_ms: 7,
            redirects: Vec::new(),
            fetched_at: "2026-08-02T00:00:00+00:00".to_string(),
        }
    }

    struct RecordingEngine {
        warmups: Arc<AtomicUsize>,
        fetches: Arc<AtomicUsize>,
        urls: Arc<Mutex<Vec<String>>>,
        fail_fetch: bool,
    }

    #[async_trait]
    impl ExtractionEngine for RecordingEngine {
        async fn warmup(&mut self) -> Result<(), ExtractError> {
            self.warmups.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn fetch(&mut self, url: &str) -> Result<ExtractedDoc, ExtractError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            if self.fail_fetch {
                return Err(ExtractError::Fetch {
                    url: url.to_string(),
                    reason: "refused".to_string(),
                });
            }
            Ok(sample_doc(url))
        }
    }

    #[tokio::test]
    async fn worker_warms_once_and_fetches_once_per_run() {
        let warmups = Arc::new(AtomicUsize::new(0));
        let fetches = Arc::new(AtomicUsize::new(0));
        let urls = Arc::new(Mutex::new(Vec::new()));
        let engine = RecordingEngine {
            warmups: warmups.clone(),
            fetches: fetches.clone(),
            urls: urls.clone(),
            fail_fetch: false,
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(engine, control_rx, tx));

        control_tx
            .send(ExtractControl::Run {
                url: " https://example.com/a ".to_string(),
            })
            .unwrap();
        control_tx
            .send(ExtractControl::Run {
                url: "https://example.com/b".to_string(),
            })
            .unwrap();
        control_tx.send(ExtractControl::Shutdown).unwrap();
        worker.await.unwrap();

        assert_eq!(warmups.load(Ordering::SeqCst), 1);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(
            urls.lock().unwrap().as_slice(),
            [" https://example.com/a ", "https://example.com/b"]
        );

        let mut documents = 0;
        let mut finished = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                ExtractEvent::Document(_) => documents += 1,
                ExtractEvent::Finished => finished += 1,
                _ => {}
            }
        }
        assert_eq!(documents, 2);
        assert_eq!(finished, 2);
    }

    #[tokio::test]
    async fn failed_fetch_still_finishes_the_run() {
        let engine = RecordingEngine {
            warmups: Arc::new(AtomicUsize::new(0)),
            fetches: Arc::new(AtomicUsize::new(0)),
            urls: Arc::new(Mutex::new(Vec::new())),
            fail_fetch: true,
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(engine, control_rx, tx));

        control_tx
            .send(ExtractControl::Run {
                url: "https://example.com".to_string(),
            })
            .unwrap();
        control_tx.send(ExtractControl::Shutdown).unwrap();
        worker.await.unwrap();

        let mut saw_failed = false;
        let mut saw_finished = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                ExtractEvent::Failed { error, .. } => {
                    saw_failed = true;
                    assert!(error.contains("refused"));
                }
                ExtractEvent::Finished => saw_finished = true,
                ExtractEvent::Document(_) => panic!("no document expected"),
                _ => {}
            }
        }
        assert!(saw_failed);
        assert!(saw_finished);
    }

    fn offline_engine() -> SpiderEngine {
        SpiderEngine::new(EngineOptions {
            timeout_secs: 5,
            retries: 0,
            user_agent: None,
            readability: true,
        })
    }

    #[tokio::test]
    async fn fetch_requires_warmup() {
        let mut engine = offline_engine();
        let err = engine.fetch("https://example.com").await.unwrap_err();
        assert!(matches!(err, ExtractError::Init(_)));
    }

    #[tokio::test]
    async fn engine_rejects_unparseable_and_non_http_urls() {
        let mut engine = offline_engine();
        engine.warmup().await.unwrap();

        let err = engine.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, ExtractError::InvalidInput(_)));

        let err = engine.fetch("ftp://example.com/file").await.unwrap_err();
        assert!(matches!(err, ExtractError::InvalidInput(_)));
    }

    #[test]
    fn location_resolution_handles_relative_and_absolute_targets() {
        assert_eq!(
            resolve_location("https://a.com/x/y", "/z").as_deref(),
            Some("https://a.com/z")
        );
        assert_eq!(
            resolve_location("https://a.com/x/", "next").as_deref(),
            Some("https://a.com/x/next")
        );
        assert_eq!(
            resolve_location("https://a.com/", "https://b.com/q").as_deref(),
            Some("https://b.com/q")
        );
        assert_eq!(resolve_location("https://a.com/", "  "), None);
        assert_eq!(resolve_location("not a base", "/z"), None);
    }

    #[test]
    fn title_and_description_fall_back_through_meta_tags() {
        let doc = Html::parse_document(
            "<html><head><title>  Main   Title </title>\
             <meta name=\"description\" content=\"a description\"></head>\
             <body><p>one two three</p></body></html>",
        );
        assert_eq!(extract_title(&doc), "Main Title");
        assert_eq!(extract_meta_description(&doc), "a description");

        let og_only = Html::parse_document(
            "<html><head><meta property=\"og:title\" content=\"OG Title\">\
             <meta property=\"og:description\" content=\"og desc\"></head></html>",
        );
        assert_eq!(extract_title(&og_only), "OG Title");
        assert_eq!(extract_meta_description(&og_only), "og desc");
    }

    #[test]
    fn word_count_spans_the_whole_document() {
        let doc = Html::parse_document(
            "<html><body><h1>alpha beta</h1><p>gamma\ndelta  epsilon</p></body></html>",
        );
        assert_eq!(count_words(&doc), 5);
    }
}
