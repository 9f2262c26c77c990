use std::collections::{HashSet, VecDeque};
use std::fs::{self, File};
use std::io::{self, Stdout, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use clap::{ArgAction, Parser};
use crossterm::event::{self, Event, KeyCode};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use spider::ClientBuilder;
use spider::page::Page;
use spider_transformations::transformation::content::{
    ReturnFormat, TransformConfig, transform_content,
};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use url::Url;

include!("types.rs");
include!("encode.rs");
include!("data_io.rs");
include!("runtime.rs");
include!("tui.rs");
include!("extract.rs");
include!("ui_utils.rs");
