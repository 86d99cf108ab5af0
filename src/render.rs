//! Output rendering for the chat session.
//!
//! The [`Renderer`] trait is the display surface: static history messages,
//! one live-updating region for the reply being streamed, and status lines.
//! [`PlainTextRenderer`] draws to a terminal; tests record calls instead.

use std::io::{self, Stdout, Write};

use crate::transcript::{DisplayRole, Message};

/// Marker appended to the live reply while it is still streaming.
///
/// Display-only; it never reaches the transcript.
pub const CURSOR: &str = "▌";

/// ANSI escape code for dim text (used for status lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for italic text (used for status lines).
const ANSI_ITALIC: &str = "\x1b[3m";

/// ANSI escape code for bold text (used for the banner).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the user label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the assistant label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling and an animated cursor
/// - Plain text without styling (for piping/redirecting)
/// - Recording renderers in tests
pub trait Renderer: Send {
    /// Draw one stored message of the conversation.
    fn print_message(&mut self, role: DisplayRole, text: &str);

    /// Called once before the first update of a streamed reply.
    fn start_response(&mut self) {}

    /// Replace the live reply with `frame`.
    ///
    /// `frame` is the whole reply so far, usually followed by [`CURSOR`].
    fn update_response(&mut self, frame: &str);

    /// Replace the live reply with its final `text` and close the region.
    fn finish_response(&mut self, text: &str);

    /// Print a transient status line, such as "thinking".
    fn print_status(&mut self, status: &str) {
        self.print_info(status);
    }

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Replay a transcript onto a renderer.
///
/// Reads only; the transcript is untouched.
pub fn render_transcript<'a, I>(messages: I, renderer: &mut dyn Renderer)
where
    I: IntoIterator<Item = &'a Message>,
{
    for message in messages {
        renderer.print_message(message.role.display_role(), &message.content);
    }
}

/// Plain text renderer with optional ANSI styling.
///
/// With color enabled the live reply shows a trailing cursor that is erased
/// and redrawn as text arrives.  Without color the cursor is dropped and the
/// reply is written append-only, which keeps piped output clean.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    shown: String,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            shown: String::new(),
        }
    }

    /// Print a bold title line.
    pub fn print_banner(&mut self, title: &str) {
        if self.use_color {
            println!("{ANSI_BOLD}{title}{ANSI_RESET}");
        } else {
            println!("{title}");
        }
        self.flush();
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn label(&self, role: DisplayRole) -> String {
        let label = role.label();
        if !self.use_color {
            return format!("{label}:");
        }
        let color = match role {
            DisplayRole::User => ANSI_CYAN,
            DisplayRole::Assistant => ANSI_GREEN,
        };
        format!("{color}{label}:{ANSI_RESET}")
    }

    /// Bring the live region from what is shown to `frame`.
    fn redraw(&mut self, frame: &str) {
        let out = self.advance(frame);
        print!("{out}");
        self.flush();
    }

    /// Terminal output that turns the shown region into `frame`.
    fn advance(&mut self, frame: &str) -> String {
        let frame = if self.use_color {
            frame
        } else {
            frame.strip_suffix(CURSOR).unwrap_or(frame)
        };
        let (erase, append) = frame_update(&self.shown, frame);
        let mut out = "\x08 \x08".repeat(erase);
        out.push_str(append);
        self.shown = frame.to_string();
        out
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_message(&mut self, role: DisplayRole, text: &str) {
        println!("{}", self.label(role));
        println!("{text}");
        println!();
        self.flush();
    }

    fn start_response(&mut self) {
        self.shown.clear();
        println!("{}", self.label(DisplayRole::Assistant));
        self.flush();
    }

    fn update_response(&mut self, frame: &str) {
        self.redraw(frame);
    }

    fn finish_response(&mut self, text: &str) {
        self.redraw(text);
        println!();
        println!();
        self.shown.clear();
        self.flush();
    }

    fn print_status(&mut self, status: &str) {
        if self.use_color {
            println!("{ANSI_DIM}{ANSI_ITALIC}{status}{ANSI_RESET}");
        } else {
            println!("{status}");
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if !self.shown.is_empty() {
            // A reply was cut off; leave what was drawn and start a fresh line.
            println!();
            self.shown.clear();
        }
        if self.use_color {
            eprintln!("\n{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("\nError: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }
}

/// How to turn `shown` into `frame` on a terminal: characters to erase from
/// the end, then text to append.
///
/// Erasing never crosses a line break; if it would, the tail is left in place
/// and only the new text is appended.
fn frame_update<'a>(shown: &str, frame: &'a str) -> (usize, &'a str) {
    let common = shown
        .char_indices()
        .zip(frame.chars())
        .find(|((_, a), b)| a != b)
        .map(|((idx, _), _)| idx)
        .unwrap_or_else(|| shown.len().min(frame.len()));
    // `common` may sit inside a character of `frame` if the strings diverge
    // mid-character; back off to a boundary shared by both.
    let mut common = common;
    while !frame.is_char_boundary(common) || !shown.is_char_boundary(common) {
        common -= 1;
    }
    let tail = &shown[common..];
    if tail.contains('\n') {
        let keep = shown.len().min(frame.len());
        let mut keep = keep.max(common);
        while !frame.is_char_boundary(keep) {
            keep -= 1;
        }
        return (0, &frame[keep..]);
    }
    (tail.chars().count(), &frame[common..])
}
