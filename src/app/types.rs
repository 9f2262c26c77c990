const EMPTY_URL_WARNING: &str = "Please enter a valid URL.";

#[derive(Debug, Parser, Clone)]
#[command(
    name = "w1sp",
    version,
    about = "Single-page web to markdown extraction powered by spider"
)]
struct Cli {
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Markdown destination; `.html`/`.json` extensions switch the artifact.
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,

    /// Write the data-URI download link wrapped in a minimal HTML page.
    #[arg(long, value_name = "FILE")]
    emit_link: Option<String>,

    /// Write the JSON extraction report.
    #[arg(long, value_name = "FILE")]
    report: Option<String>,

    /// Value of the link's `download` attribute.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_DOWNLOAD_FILENAME)]
    filename: String,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    readability: bool,

    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout_secs: u64,

    #[arg(long, value_name = "N", default_value_t = 0)]
    retries: usize,

    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    #[arg(long, default_value_t = false)]
    auto_close: bool,

    #[arg(long, default_value_t = false)]
    no_tui: bool,
}

#[derive(Debug, Error)]
enum ExtractError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("engine initialization failed: {0}")]
    Init(String),

    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("extraction failed for {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("timed out after {secs}s fetching {url}")]
    Timeout { url: String, secs: u64 },

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// One redirect observed while probing the requested URL without following
/// redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RedirectHop {
    status: u16,
    url: String,
}

/// The result of one fetch-and-extract run.
#[derive(Debug, Clone)]
struct ExtractedDoc {
    url: String,
    final_url: String,
    status: u16,
    content_type: String,
    title: String,
    description: String,
    markdown: String,
    word_count: usize,
    size: usize,
    response_time_ms: u64,
    redirects: Vec<RedirectHop>,
    fetched_at: String,
}

#[derive(Debug)]
enum ExtractEvent {
    Started { url: String },
    Document(ExtractedDoc),
    Failed { url: String, error: String },
    Status(String),
    Finished,
}

#[derive(Debug)]
enum ExtractControl {
    Run { url: String },
    Shutdown,
}

#[derive(Default)]
struct AppState {
    document: Option<ExtractedDoc>,
    link: Option<DownloadLink>,
    running: bool,
    done: bool,
    finished_runs: usize,
    warning: Option<String>,
    status_messages: VecDeque<String>,
    errors: VecDeque<String>,
}

impl AppState {
    fn push_status(&mut self, message: String) {
        self.status_messages.push_front(message);
        while self.status_messages.len() > 20 {
            self.status_messages.pop_back();
        }
    }

    fn push_error(&mut self, error: String) {
        self.errors.push_front(error);
        while self.errors.len() > 10 {
            self.errors.pop_back();
        }
    }
}
