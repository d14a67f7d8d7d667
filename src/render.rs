//! Output rendering for the chat front end.
//!
//! This module provides the [`Renderer`] trait and a plain-text
//! implementation that writes to stdout with optional ANSI styling.  The
//! formatting itself lives in free functions so it can be tested without a
//! terminal.

use std::io::{self, Stdout, Write};

use crate::markdown::render_markdown;
use crate::results::{ResultsPanel, ResultsTab};
use crate::utils::time::display_timestamp;
use crate::{CodeBlock, ImageAnalysis, Message, MessageRole, SearchResult, Session};

/// ANSI escape code for bold text (used for headers).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for timestamps and hints).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for assistant labels).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for code).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for user labels and the active session).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for blue text (used for links).
const ANSI_BLUE: &str = "\x1b[34m";

/// Language assumed for code blocks that do not name one.
const DEFAULT_CODE_LANGUAGE: &str = "python";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Recording output in tests
pub trait Renderer: Send {
    /// Print a complete message.
    fn print_message(&mut self, message: &Message);

    /// Called before the first update of a streamed reply.
    fn start_reply(&mut self);

    /// Show the streamed reply so far.
    ///
    /// `content` is the full text so far, not a delta; it usually extends the
    /// previous update but may rewrite it.
    fn update_reply(&mut self, content: &str);

    /// Called when a streamed reply is complete.
    fn finish_reply(&mut self, message: &Message);

    /// Print the results panel with the tab at `selected` open.
    fn print_results(&mut self, panel: &ResultsPanel, selected: usize);

    /// Print the session list, marking the active session.
    fn print_sessions(&mut self, sessions: &[Session], active: Option<&str>);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// How a streamed update relates to what is already on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyDelta<'a> {
    /// The update extends the printed text by this suffix.
    Append(&'a str),
    /// The update replaces the printed text.
    Rewrite,
}

/// Compare the printed text with the full content of an update.
pub fn reply_delta<'a>(printed: &str, content: &'a str) -> ReplyDelta<'a> {
    match content.strip_prefix(printed) {
        Some(suffix) => ReplyDelta::Append(suffix),
        None => ReplyDelta::Rewrite,
    }
}

fn paint(text: &str, style: &str, use_color: bool) -> String {
    if use_color {
        format!("{style}{text}{ANSI_RESET}")
    } else {
        text.to_string()
    }
}

fn role_label(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "you",
        MessageRole::Assistant | MessageRole::Model => "assistant",
        MessageRole::System => "system",
    }
}

/// Header line of a message: who wrote it and when.
pub fn format_message_header(message: &Message, use_color: bool) -> String {
    let color = if message.role == MessageRole::User {
        ANSI_GREEN
    } else {
        ANSI_CYAN
    };
    let mut header = paint(&format!("[{}]", role_label(message.role)), color, use_color);
    if let Some(timestamp) = &message.timestamp {
        header.push(' ');
        header.push_str(&paint(&display_timestamp(timestamp), ANSI_DIM, use_color));
    }
    header
}

/// Format a complete message.
///
/// User messages are printed verbatim; everything else is markdown.
pub fn format_message(message: &Message, use_color: bool, use_markdown: bool) -> String {
    let body = if message.role == MessageRole::User || !use_markdown {
        message.content.clone()
    } else {
        render_markdown(&message.content, use_color)
    };
    let mut out = format!("{}\n{}", format_message_header(message, use_color), body);
    if message.has_results() {
        out.push('\n');
        out.push_str(&paint("(results available: /results)", ANSI_DIM, use_color));
    }
    out
}

/// Format the results panel with the tab at `selected` (clamped) open.
pub fn format_results(
    panel: &ResultsPanel,
    selected: usize,
    use_color: bool,
    use_markdown: bool,
) -> String {
    let Some(open) = panel.tab_at(selected) else {
        return "No results yet.".to_string();
    };
    let tab_bar = panel
        .tabs()
        .into_iter()
        .map(|tab| {
            if tab == open {
                paint(&format!("[{}]", tab.label()), ANSI_BOLD, use_color)
            } else {
                format!(" {} ", tab.label())
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let body = match open {
        ResultsTab::Code => panel
            .code
            .iter()
            .map(|block| format_code_block(block, use_color, use_markdown))
            .collect::<Vec<_>>()
            .join("\n\n"),
        ResultsTab::Search => panel
            .search_results
            .iter()
            .map(|result| format_search_result(result, use_color, use_markdown))
            .collect::<Vec<_>>()
            .join("\n\n"),
        ResultsTab::Image => panel
            .image_analysis
            .as_ref()
            .map(|analysis| format_image_analysis(analysis, use_color, use_markdown))
            .unwrap_or_default(),
    };
    format!("{tab_bar}\n\n{body}")
}

fn markdown_or_plain(text: &str, use_color: bool, use_markdown: bool) -> String {
    if use_markdown {
        render_markdown(text, use_color)
    } else {
        text.to_string()
    }
}

/// Format one code block with its output and explanation.
pub fn format_code_block(block: &CodeBlock, use_color: bool, use_markdown: bool) -> String {
    let language = block
        .language
        .as_deref()
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_CODE_LANGUAGE);
    let mut out = paint(&format!("[{language}]"), ANSI_CYAN, use_color);
    for line in block.content.lines() {
        out.push('\n');
        out.push_str(&paint(&format!("    {line}"), ANSI_YELLOW, use_color));
    }
    if let Some(result) = block.execution_result.as_deref().filter(|r| !r.is_empty()) {
        out.push('\n');
        out.push_str(&paint("Output:", ANSI_BOLD, use_color));
        for line in result.lines() {
            out.push_str(&format!("\n    {line}"));
        }
    }
    if let Some(explanation) = block.explanation.as_deref().filter(|e| !e.is_empty()) {
        out.push('\n');
        out.push_str(&paint("Explanation:", ANSI_BOLD, use_color));
        out.push('\n');
        out.push_str(&markdown_or_plain(explanation, use_color, use_markdown));
    }
    out
}

/// Format one search result with its sources.
pub fn format_search_result(
    result: &SearchResult,
    use_color: bool,
    use_markdown: bool,
) -> String {
    let mut out = paint(&result.title, ANSI_BOLD, use_color);
    if let Some(url) = result.url.as_deref().filter(|u| !u.is_empty()) {
        out.push('\n');
        out.push_str(&paint(url, ANSI_BLUE, use_color));
    }
    out.push('\n');
    out.push_str(&markdown_or_plain(&result.snippet, use_color, use_markdown));
    if let Some(sources) = result.sources.as_ref().filter(|s| !s.is_empty()) {
        out.push('\n');
        out.push_str(&paint("Sources:", ANSI_BOLD, use_color));
        for source in sources {
            out.push_str(&format!("\n  - {source}"));
        }
    }
    out
}

/// Format an image analysis with its scene type and detections.
pub fn format_image_analysis(
    analysis: &ImageAnalysis,
    use_color: bool,
    use_markdown: bool,
) -> String {
    let mut out = markdown_or_plain(&analysis.analysis, use_color, use_markdown);
    if let Some(scene_type) = analysis.scene_type.as_deref().filter(|s| !s.is_empty()) {
        out.push('\n');
        out.push_str(&paint("Scene Type:", ANSI_BOLD, use_color));
        out.push(' ');
        out.push_str(scene_type);
    }
    let detections = analysis.detections();
    if !detections.is_empty() {
        out.push('\n');
        out.push_str(&paint("Detections:", ANSI_BOLD, use_color));
        for detection in detections {
            out.push_str(&format!("\n  - {}", detection.label));
            if let Some(confidence) = detection.confidence {
                out.push_str(&format!(" ({:.0}%)", confidence * 100.0));
            }
        }
    }
    out
}

/// Format the session list, numbered from 1, marking the active session.
pub fn format_sessions(sessions: &[Session], active: Option<&str>, use_color: bool) -> String {
    if sessions.is_empty() {
        return "No sessions. Create one with /new <username>.".to_string();
    }
    sessions
        .iter()
        .enumerate()
        .map(|(idx, session)| {
            let is_active = active == Some(session.id.as_str());
            let marker = if is_active { "*" } else { " " };
            let line = format!(
                "{marker} {:>2}. {}  {}  {}",
                idx + 1,
                session.username,
                session.id,
                display_timestamp(&session.created_at)
            );
            if is_active {
                paint(&line, ANSI_GREEN, use_color)
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Plain text renderer with optional ANSI styling.
///
/// Streamed replies are printed as they grow.  When an update rewrites text
/// already on screen, the reply is printed again in full on a new line.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    use_markdown: bool,
    printed: String,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors and markdown enabled.
    pub fn new() -> Self {
        Self::with_options(true, true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_options(use_color, true)
    }

    /// Creates a new PlainTextRenderer with the given color and markdown settings.
    pub fn with_options(use_color: bool, use_markdown: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            use_markdown,
            printed: String::new(),
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_message(&mut self, message: &Message) {
        println!(
            "{}\n",
            format_message(message, self.use_color, self.use_markdown)
        );
        self.flush();
    }

    fn start_reply(&mut self) {
        self.printed.clear();
        let header = paint("[assistant]", ANSI_CYAN, self.use_color);
        println!("{header}");
        self.flush();
    }

    fn update_reply(&mut self, content: &str) {
        match reply_delta(&self.printed, content) {
            ReplyDelta::Append(suffix) => print!("{suffix}"),
            ReplyDelta::Rewrite => {
                let marker = paint("[revised]", ANSI_DIM, self.use_color);
                print!("\n{marker}\n{content}");
            }
        }
        self.printed = content.to_string();
        self.flush();
    }

    fn finish_reply(&mut self, message: &Message) {
        self.update_reply(&message.content);
        println!();
        if message.has_results() {
            println!(
                "{}",
                paint("(results available: /results)", ANSI_DIM, self.use_color)
            );
        }
        println!();
        self.printed.clear();
        self.flush();
    }

    fn print_results(&mut self, panel: &ResultsPanel, selected: usize) {
        println!(
            "{}\n",
            format_results(panel, selected, self.use_color, self.use_markdown)
        );
        self.flush();
    }

    fn print_sessions(&mut self, sessions: &[Session], active: Option<&str>) {
        println!("{}", format_sessions(sessions, active, self.use_color));
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }
}
