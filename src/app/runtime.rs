fn init_headless_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Forwards a run request to the worker. Empty input surfaces the warning and
/// sends nothing; non-empty input is forwarded verbatim, without trimming or
/// normalization.
fn request_run(
    state: &mut AppState,
    control_tx: &UnboundedSender<ExtractControl>,
    url: &str,
) -> bool {
    if state.running {
        state.push_status("extraction already running".to_string());
        return false;
    }
    if url.is_empty() {
        state.warning = Some(EMPTY_URL_WARNING.to_string());
        return false;
    }

    state.warning = None;
    state.running = true;
    state.done = false;
    let _ = control_tx.send(ExtractControl::Run {
        url: url.to_string(),
    });
    true
}

fn handle_extract_event(state: &mut AppState, download_filename: &str, event: ExtractEvent) {
    match event {
        ExtractEvent::Started { url } => {
            state.running = true;
            state.warning = None;
            state.push_status(format!("fetching {url}"));
        }
        ExtractEvent::Document(doc) => {
            state.link = Some(DownloadLink::new(&doc.markdown, Some(download_filename)));
            state.push_status(format!(
                "extracted {} words from {}",
                doc.word_count, doc.final_url
            ));
            state.document = Some(doc);
        }
        ExtractEvent::Failed { url: _, error } => state.push_error(error),
        ExtractEvent::Status(message) => state.push_status(message),
        ExtractEvent::Finished => {
            state.running = false;
            state.done = true;
            state.finished_runs += 1;
        }
    }
}

pub async fn run() -> io::Result<()> {
    let cli = Cli::parse();
    if cli.no_tui {
        init_headless_tracing();
    }
    let auto_close = cli.auto_close;
    let no_tui = cli.no_tui;

    let engine = SpiderEngine::new(EngineOptions::from_cli(&cli));
    let (tx, mut rx) = mpsc::unbounded_channel::<ExtractEvent>();
    let (control_tx, control_rx) = mpsc::unbounded_channel::<ExtractControl>();
    let worker = tokio::spawn(run_worker(engine, control_rx, tx));

    let result = if no_tui {
        run_headless(&cli, &control_tx, &mut rx)
    } else {
        run_tui(&cli, control_tx.clone(), auto_close, &mut rx)
    };

    let _ = control_tx.send(ExtractControl::Shutdown);
    drop(control_tx);
    if let Err(e) = worker.await {
        eprintln!("extraction worker join error: {e}");
    }

    result
}

fn run_headless(
    cli: &Cli,
    control_tx: &UnboundedSender<ExtractControl>,
    rx: &mut UnboundedReceiver<ExtractEvent>,
) -> io::Result<()> {
    let url = cli
        .url
        .clone()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "missing URL"))?;

    let mut state = AppState::default();
    if !request_run(&mut state, control_tx, &url) {
        let warning = state
            .warning
            .clone()
            .unwrap_or_else(|| EMPTY_URL_WARNING.to_string());
        return Err(io::Error::new(io::ErrorKind::InvalidInput, warning));
    }

    loop {
        while let Ok(event) = rx.try_recv() {
            match &event {
                ExtractEvent::Status(message) => eprintln!("{message}"),
                ExtractEvent::Failed { error, .. } => eprintln!("{error}"),
                _ => {}
            }
            handle_extract_event(&mut state, &cli.filename, event);
        }

        if state.done {
            break;
        }
        std::thread::sleep(Duration::from_millis(120));
    }

    let Some(doc) = state.document.as_ref() else {
        let reason = state
            .errors
            .front()
            .cloned()
            .unwrap_or_else(|| "extraction failed".to_string());
        return Err(io::Error::other(reason));
    };
    let link = state
        .link
        .clone()
        .unwrap_or_else(|| DownloadLink::new(&doc.markdown, Some(&cli.filename)));

    match cli.output.as_deref() {
        Some(path) => {
            let kind = detect_artifact_kind(path, ArtifactKind::Markdown);
            save_artifact(path, kind, doc, &link).map_err(io::Error::other)?;
            tracing::info!(path, kind = kind.label(), "wrote extraction output");
        }
        None => println!("{}", doc.markdown),
    }
    if let Some(path) = cli.emit_link.as_deref() {
        save_link_page(path, doc, &link).map_err(io::Error::other)?;
        tracing::info!(path, "wrote download link page");
    }
    if let Some(path) = cli.report.as_deref() {
        save_report(path, doc).map_err(io::Error::other)?;
        tracing::info!(path, "wrote extraction report");
    }

    eprintln!(
        "finished extraction: status={} words={} size={}B elapsed={}ms",
        doc.status, doc.word_count, doc.size, doc.response_time_ms
    );
    Ok(())
}

fn run_tui(
    cli: &Cli,
    control_tx: UnboundedSender<ExtractControl>,
    auto_close: bool,
    rx: &mut UnboundedReceiver<ExtractEvent>,
) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let tui_result = draw_loop(&mut terminal, cli, control_tx, auto_close, rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tui_result
}
