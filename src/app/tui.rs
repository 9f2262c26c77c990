const SCROLL_JUMP_STEP: usize = 10;

fn draw_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    cli: &Cli,
    control_tx: UnboundedSender<ExtractControl>,
    auto_close: bool,
    rx: &mut UnboundedReceiver<ExtractEvent>,
) -> io::Result<()> {
    let mut state = AppState::default();
    let mut url_input = cli.url.clone().unwrap_or_default();
    let mut input_mode = url_input.is_empty();
    let mut help_mode = false;
    let mut scroll = 0usize;
    let mut last_link_page: Option<String> = None;
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(120);

    // A URL on the command line starts the first run immediately.
    if !url_input.is_empty() {
        request_run(&mut state, &control_tx, &url_input);
    }

    loop {
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ExtractEvent::Document(_)) {
                scroll = 0;
            }
            handle_extract_event(&mut state, &cli.filename, event);
        }

        let content_lines = state
            .document
            .as_ref()
            .map(|doc| doc.markdown.lines().count())
            .unwrap_or(0);
        let max_scroll = content_lines.saturating_sub(1);
        scroll = scroll.min(max_scroll);

        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(5),
                    Constraint::Length(3),
                    Constraint::Min(8),
                    Constraint::Length(4),
                    Constraint::Length(6),
                    Constraint::Length(1),
                ])
                .split(f.area());

            let shell_title = if state.running {
                "w1sp - Extracting (press q to quit)"
            } else if state.finished_runs > 0 {
                "w1sp - Finished (press q to quit)"
            } else {
                "w1sp - Idle (press q to quit)"
            };

            let metric_label = Style::default().fg(Color::Gray);
            let sep_style = Style::default().fg(Color::DarkGray);
            let mut header_lines = Vec::new();
            match state.document.as_ref() {
                Some(doc) => {
                    header_lines.push(Line::from(vec![
                        Span::styled("Status ", metric_label),
                        Span::styled(doc.status.to_string(), status_code_style(doc.status)),
                        Span::styled("  |  ", sep_style),
                        Span::styled("Type ", metric_label),
                        Span::styled(doc.content_type.clone(), Style::default().fg(Color::White)),
                        Span::styled("  |  ", sep_style),
                        Span::styled("Words ", metric_label),
                        Span::styled(
                            doc.word_count.to_string(),
                            Style::default()
                                .fg(Color::Cyan)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::styled("  |  ", sep_style),
                        Span::styled("Size ", metric_label),
                        Span::styled(
                            format!("{}B", doc.size),
                            Style::default().fg(Color::White),
                        ),
                        Span::styled("  |  ", sep_style),
                        Span::styled("Elapsed ", metric_label),
                        Span::styled(
                            format!("{}ms", doc.response_time_ms),
                            Style::default().fg(Color::White),
                        ),
                        Span::styled("  |  ", sep_style),
                        Span::styled("Hops ", metric_label),
                        Span::styled(
                            doc.redirects.len().to_string(),
                            Style::default().fg(Color::Yellow),
                        ),
                    ]));
                    header_lines.push(Line::from(vec![
                        Span::styled("Title ", metric_label),
                        Span::styled(
                            truncate_for_width(&doc.title, chunks[0].width.saturating_sub(10)),
                            Style::default().fg(Color::White),
                        ),
                    ]));
                    let final_line = if doc.final_url == doc.url {
                        doc.final_url.clone()
                    } else {
                        format!("{} -> {}", doc.url, doc.final_url)
                    };
                    header_lines.push(Line::from(vec![
                        Span::styled("URL ", metric_label),
                        Span::styled(
                            truncate_for_width(&final_line, chunks[0].width.saturating_sub(8)),
                            Style::default().fg(Color::Blue),
                        ),
                    ]));
                }
                None => {
                    header_lines.push(Line::from(Span::styled(
                        "No document extracted yet.",
                        Style::default().fg(Color::DarkGray),
                    )));
                    header_lines.push(Line::from(Span::styled(
                        "Type a URL below and press Enter.",
                        Style::default().fg(Color::DarkGray),
                    )));
                }
            }

            let header = Paragraph::new(header_lines).block(
                Block::default()
                    .title(shell_title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(if state.running {
                        Color::Cyan
                    } else if state.finished_runs > 0 {
                        Color::Green
                    } else {
                        Color::Gray
                    })),
            );
            f.render_widget(header, chunks[0]);

            let (input_title, input_border) = if let Some(warning) = state.warning.as_deref() {
                (
                    format!("URL - {warning}"),
                    Style::default().fg(Color::Yellow),
                )
            } else if input_mode {
                (
                    "URL - editing (Enter runs, Esc cancels)".to_string(),
                    Style::default().fg(Color::Cyan),
                )
            } else {
                (
                    "URL - press / to edit, Enter to run".to_string(),
                    Style::default().fg(Color::DarkGray),
                )
            };
            let input = Paragraph::new(url_input.as_str()).block(
                Block::default()
                    .title(input_title)
                    .borders(Borders::ALL)
                    .border_style(input_border),
            );
            f.render_widget(input, chunks[1]);
            if input_mode {
                let cursor_x = chunks[1]
                    .x
                    .saturating_add(1)
                    .saturating_add(url_input.chars().count() as u16)
                    .min(chunks[1].right().saturating_sub(2));
                f.set_cursor_position(Position::new(cursor_x, chunks[1].y + 1));
            }

            let content = match state.document.as_ref() {
                Some(doc) => Paragraph::new(doc.markdown.as_str())
                    .wrap(Wrap { trim: false })
                    .scroll((scroll.min(u16::MAX as usize) as u16, 0)),
                None => Paragraph::new(if state.running {
                    "Fetching and extracting..."
                } else {
                    "Extracted markdown will appear here."
                })
                .style(Style::default().fg(Color::DarkGray)),
            };
            let content = content.block(
                Block::default()
                    .title(format!("Markdown (line {}/{})", scroll + 1, content_lines.max(1)))
                    .borders(Borders::ALL),
            );
            f.render_widget(content, chunks[2]);

            let download_lines = match state.link.as_ref() {
                Some(link) => vec![
                    Line::from(vec![
                        Span::styled("File ", metric_label),
                        Span::styled(link.filename.clone(), Style::default().fg(Color::White)),
                        Span::styled("  |  ", sep_style),
                        Span::styled("Payload ", metric_label),
                        Span::styled(
                            format!("{} base64 bytes", link.payload_len()),
                            Style::default().fg(Color::White),
                        ),
                    ]),
                    Line::from(Span::styled(
                        truncate_for_width(
                            &link.anchor_markup(),
                            chunks[3].width.saturating_sub(4),
                        ),
                        Style::default().fg(Color::Green),
                    )),
                ],
                None => vec![Line::from(Span::styled(
                    "No download link yet.",
                    Style::default().fg(Color::DarkGray),
                ))],
            };
            let download = Paragraph::new(download_lines).block(
                Block::default()
                    .title("Download (s save md, d save link, j save report, o open)")
                    .borders(Borders::ALL),
            );
            f.render_widget(download, chunks[3]);

            let mut activity_lines = Vec::new();
            for error in state.errors.iter().take(2) {
                activity_lines.push(Line::from(Span::styled(
                    truncate_for_width(error, chunks[4].width.saturating_sub(4)),
                    Style::default().fg(Color::Red),
                )));
            }
            for message in state.status_messages.iter().take(4 - activity_lines.len()) {
                activity_lines.push(Line::from(Span::styled(
                    truncate_for_width(message, chunks[4].width.saturating_sub(4)),
                    Style::default().fg(Color::Gray),
                )));
            }
            let activity = Paragraph::new(activity_lines)
                .block(Block::default().title("Activity").borders(Borders::ALL));
            f.render_widget(activity, chunks[4]);

            let help_line = Paragraph::new(Line::from(Span::styled(
                "q quit  / edit url  Enter run  s/d/j save  o open link  up/down/PgUp/PgDn/g/G scroll  ? help",
                Style::default().fg(Color::DarkGray),
            )));
            f.render_widget(help_line, chunks[5]);

            if help_mode {
                let area = centered_rect(60, 60, f.area());
                f.render_widget(Clear, area);
                let help = Paragraph::new(vec![
                    Line::from("w1sp keys"),
                    Line::from(""),
                    Line::from("/ or i     edit the URL field"),
                    Line::from("Enter      run extraction for the current URL"),
                    Line::from("s          save markdown"),
                    Line::from("d          save the download link page"),
                    Line::from("j          save the JSON report"),
                    Line::from("o          open the link page in a browser"),
                    Line::from("up/down    scroll by line"),
                    Line::from("PgUp/PgDn  scroll by 10 lines"),
                    Line::from("g / G      jump to top / bottom"),
                    Line::from("q          quit"),
                    Line::from(""),
                    Line::from("? or Esc closes this help"),
                ])
                .block(Block::default().title("Help").borders(Borders::ALL));
                f.render_widget(help, area);
            }
        })?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if help_mode {
                    if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
                        help_mode = false;
                    }
                } else if input_mode {
                    match key.code {
                        KeyCode::Enter => {
                            if request_run(&mut state, &control_tx, &url_input) {
                                input_mode = false;
                            }
                        }
                        KeyCode::Esc => input_mode = false,
                        KeyCode::Backspace => {
                            url_input.pop();
                        }
                        KeyCode::Char(c) => url_input.push(c),
                        _ => {}
                    }
                } else {
                    match key.code {
                        KeyCode::Char('q') => break,
                        KeyCode::Char('/') | KeyCode::Char('i') => {
                            state.warning = None;
                            input_mode = true;
                        }
                        KeyCode::Char('?') => help_mode = true,
                        KeyCode::Enter => {
                            request_run(&mut state, &control_tx, &url_input);
                        }
                        KeyCode::Up => scroll = scroll.saturating_sub(1),
                        KeyCode::Down => scroll = (scroll + 1).min(max_scroll),
                        KeyCode::PageUp => scroll = scroll.saturating_sub(SCROLL_JUMP_STEP),
                        KeyCode::PageDown => scroll = (scroll + SCROLL_JUMP_STEP).min(max_scroll),
                        KeyCode::Char('g') => scroll = 0,
                        KeyCode::Char('G') => scroll = max_scroll,
                        KeyCode::Char('s') => {
                            let _ = save_document_artifact(&mut state, cli, ArtifactKind::Markdown);
                        }
                        KeyCode::Char('d') => {
                            if let Some(path) =
                                save_document_artifact(&mut state, cli, ArtifactKind::LinkPage)
                            {
                                last_link_page = Some(path);
                            }
                        }
                        KeyCode::Char('j') => {
                            let _ = save_document_artifact(&mut state, cli, ArtifactKind::Report);
                        }
                        KeyCode::Char('o') => {
                            let page_path = match last_link_page.clone() {
                                Some(path) => Some(path),
                                None => {
                                    let saved = save_document_artifact(
                                        &mut state,
                                        cli,
                                        ArtifactKind::LinkPage,
                                    );
                                    last_link_page.clone_from(&saved);
                                    saved
                                }
                            };
                            if let Some(path) = page_path {
                                let opened = path_to_file_url(&path)
                                    .and_then(|file_url| open_url_in_browser(&file_url));
                                match opened {
                                    Ok(()) => state.push_status(format!("opened {path}")),
                                    Err(err) => state.push_error(format!("open failed: {err}")),
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if auto_close && state.finished_runs > 0 && !state.running {
            break;
        }
    }

    Ok(())
}

/// Saves one artifact for the current document, resolving the destination
/// from the CLI or a host+timestamp default. Returns the path on success.
fn save_document_artifact(state: &mut AppState, cli: &Cli, kind: ArtifactKind) -> Option<String> {
    let Some(doc) = state.document.clone() else {
        state.warning = Some("nothing extracted yet".to_string());
        return None;
    };

    let path = match kind {
        ArtifactKind::Markdown => cli
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&doc.url, kind)),
        ArtifactKind::LinkPage => cli
            .emit_link
            .clone()
            .unwrap_or_else(|| default_output_path(&doc.url, kind)),
        ArtifactKind::Report => cli
            .report
            .clone()
            .unwrap_or_else(|| default_output_path(&doc.url, kind)),
    };
    let link = state
        .link
        .clone()
        .unwrap_or_else(|| DownloadLink::new(&doc.markdown, Some(&cli.filename)));

    match save_artifact(&path, kind, &doc, &link) {
        Ok(()) => {
            state.push_status(format!("saved {} to {path}", kind.label()));
            Some(path)
        }
        Err(err) => {
            state.push_error(format!("save failed: {err}"));
            None
        }
    }
}
