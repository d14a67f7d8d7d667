//! Markdown to terminal text.
//!
//! Assistant replies and image analyses are markdown.  This module renders
//! them for a terminal, with ANSI styling when color is enabled and as plain
//! text otherwise.

use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag};

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_ITALIC: &str = "\x1b[3m";
const ANSI_UNDERLINE: &str = "\x1b[4m";
const ANSI_STRIKE: &str = "\x1b[9m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_BLUE: &str = "\x1b[34m";
const ANSI_CYAN: &str = "\x1b[36m";

/// Indentation of code block lines.
const CODE_INDENT: &str = "    ";

/// Render `input` as terminal text.
pub fn render_markdown(input: &str, use_color: bool) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(input, options);
    let mut writer = AnsiWriter::new(parser, use_color);
    writer.run();
    writer.out.trim_end_matches('\n').to_string()
}

struct AnsiWriter<'a, I> {
    /// Iterator supplying events.
    iter: I,

    /// Rendered output.
    out: String,

    use_color: bool,

    /// Stack of active inline styles.
    styles: Vec<&'static str>,

    /// Prefixes written at the start of every line, innermost last.
    line_prefixes: Vec<&'static str>,

    /// Current list index as a stack of indices.
    list_indices: Vec<Option<u64>>,

    /// A link which will be appended when the link tag is closed.
    link: Option<CowStr<'a>>,

    needs_newline: bool,
    line_start: bool,
    in_code_block: bool,
}

impl<'a, I> AnsiWriter<'a, I>
where
    I: Iterator<Item = Event<'a>>,
{
    fn new(iter: I, use_color: bool) -> Self {
        Self {
            iter,
            out: String::new(),
            use_color,
            styles: Vec::new(),
            line_prefixes: Vec::new(),
            list_indices: Vec::new(),
            link: None,
            needs_newline: false,
            line_start: true,
            in_code_block: false,
        }
    }

    fn run(&mut self) {
        while let Some(event) = self.iter.next() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: Event<'a>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.code(&code),
            Event::Html(html) => self.text(&html),
            Event::FootnoteReference(reference) => self.write(&format!("[^{reference}]")),
            Event::SoftBreak => self.write(" "),
            Event::HardBreak => self.end_line(),
            Event::Rule => {
                self.separate();
                self.write_styled("─".repeat(40).as_str(), ANSI_DIM);
                self.end_line();
                self.needs_newline = true;
            }
            Event::TaskListMarker(checked) => {
                self.write(if checked { "[x] " } else { "[ ] " });
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'a>) {
        match tag {
            Tag::Paragraph => self.separate(),
            Tag::Heading(level, _, _) => {
                self.separate();
                let style = match level {
                    HeadingLevel::H1 | HeadingLevel::H2 => ANSI_UNDERLINE,
                    _ => ANSI_BOLD,
                };
                self.styles.push(ANSI_BOLD);
                self.styles.push(style);
                self.write(&format!("{} ", "#".repeat(level as usize)));
            }
            Tag::BlockQuote => {
                self.separate();
                self.line_prefixes.push("> ");
                self.styles.push(ANSI_ITALIC);
            }
            Tag::CodeBlock(kind) => {
                self.separate();
                if let CodeBlockKind::Fenced(lang) = kind
                    && !lang.trim().is_empty()
                {
                    self.write_styled(&format!("[{}]", lang.trim()), ANSI_CYAN);
                    self.end_line();
                }
                self.in_code_block = true;
                self.styles.push(ANSI_YELLOW);
            }
            Tag::List(start) => {
                if self.list_indices.is_empty() {
                    self.separate();
                } else if !self.line_start {
                    self.end_line();
                }
                self.list_indices.push(start);
            }
            Tag::Item => {
                if !self.line_start {
                    self.end_line();
                }
                self.needs_newline = false;
                let depth = self.list_indices.len().saturating_sub(1);
                self.write(&"  ".repeat(depth));
                let marker = match self.list_indices.last_mut() {
                    Some(Some(index)) => {
                        let marker = format!("{index}. ");
                        *index += 1;
                        marker
                    }
                    _ => "- ".to_string(),
                };
                self.write_styled(&marker, ANSI_CYAN);
            }
            Tag::FootnoteDefinition(name) => {
                self.separate();
                self.write(&format!("[^{name}]: "));
            }
            Tag::Table(_) => self.separate(),
            Tag::TableHead => {
                self.styles.push(ANSI_BOLD);
                self.write("| ");
            }
            Tag::TableRow => self.write("| "),
            Tag::TableCell => {}
            Tag::Emphasis => self.styles.push(ANSI_ITALIC),
            Tag::Strong => self.styles.push(ANSI_BOLD),
            Tag::Strikethrough => self.styles.push(ANSI_STRIKE),
            Tag::Link(_, dest, _) => {
                self.styles.push(ANSI_UNDERLINE);
                self.styles.push(ANSI_BLUE);
                self.link = Some(dest);
            }
            Tag::Image(_, dest, _) => {
                self.write("[image: ");
                self.link = Some(dest);
            }
        }
    }

    fn end_tag(&mut self, tag: Tag<'a>) {
        match tag {
            Tag::Paragraph => self.end_block(),
            Tag::Heading(..) => {
                self.styles.pop();
                self.styles.pop();
                self.end_block();
            }
            Tag::BlockQuote => {
                self.styles.pop();
                if !self.line_start {
                    self.end_line();
                }
                self.line_prefixes.pop();
                self.needs_newline = true;
            }
            Tag::CodeBlock(_) => {
                self.styles.pop();
                self.in_code_block = false;
                self.end_block();
            }
            Tag::List(_) => {
                self.list_indices.pop();
                if self.list_indices.is_empty() {
                    self.end_block();
                }
            }
            Tag::Item => {
                if !self.line_start {
                    self.end_line();
                }
            }
            Tag::FootnoteDefinition(_) => self.end_block(),
            Tag::Table(_) => self.end_block(),
            Tag::TableHead => {
                self.styles.pop();
                self.end_line();
            }
            Tag::TableRow => self.end_line(),
            Tag::TableCell => self.write(" | "),
            Tag::Emphasis | Tag::Strong | Tag::Strikethrough => {
                self.styles.pop();
            }
            Tag::Link(..) => {
                self.styles.pop();
                self.styles.pop();
                if let Some(dest) = self.link.take() {
                    self.write_styled(&format!(" ({dest})"), ANSI_DIM);
                }
            }
            Tag::Image(..) => {
                self.write("]");
                if let Some(dest) = self.link.take() {
                    self.write_styled(&format!(" ({dest})"), ANSI_DIM);
                }
            }
        }
    }

    fn text(&mut self, text: &str) {
        if !self.in_code_block {
            for (idx, line) in text.split('\n').enumerate() {
                if idx > 0 {
                    self.end_line();
                }
                if !line.is_empty() {
                    self.write(line);
                }
            }
            return;
        }
        for line in text.split_inclusive('\n') {
            if self.line_start {
                self.write(CODE_INDENT);
            }
            let content = line.trim_end_matches('\n');
            if !content.is_empty() {
                self.write(content);
            }
            if line.ends_with('\n') {
                self.end_line();
            }
        }
    }

    fn code(&mut self, code: &str) {
        if self.use_color {
            self.write_styled(code, ANSI_YELLOW);
        } else {
            self.write(&format!("`{code}`"));
        }
    }

    /// Start a block, leaving a blank line after the previous one.
    fn separate(&mut self) {
        if !self.line_start {
            self.end_line();
        }
        if self.needs_newline {
            self.write_prefixes();
            while self.out.ends_with(' ') {
                self.out.pop();
            }
            self.end_line();
        }
        self.needs_newline = false;
    }

    fn end_block(&mut self) {
        if !self.line_start {
            self.end_line();
        }
        self.needs_newline = true;
    }

    fn end_line(&mut self) {
        self.out.push('\n');
        self.line_start = true;
    }

    fn write_prefixes(&mut self) {
        for prefix in &self.line_prefixes {
            self.out.push_str(prefix);
        }
        self.line_start = false;
    }

    fn write(&mut self, text: &str) {
        if self.line_start {
            self.write_prefixes();
        }
        if self.use_color && !self.styles.is_empty() {
            for style in &self.styles {
                self.out.push_str(style);
            }
            self.out.push_str(text);
            self.out.push_str(ANSI_RESET);
        } else {
            self.out.push_str(text);
        }
    }

    fn write_styled(&mut self, text: &str, style: &'static str) {
        self.styles.push(style);
        self.write(text);
        self.styles.pop();
    }
}
