//! Terminal rendering of the transcript.
//!
//! Assistant replies are streamed in place: while a slot is the last thing on
//! screen, only the newly arrived suffix is written. Any other update reprints
//! the entry on a fresh line.

use std::io::{self, Write};

use colored::*;

use crate::surface::{Author, Entry, SlotId, Surface, Transcript};

pub struct TerminalSurface<W: Write> {
    transcript: Transcript,
    out: W,
    /// Slot whose line is still open, and how many bytes of it are on screen.
    live: Option<(SlotId, usize)>,
}

impl TerminalSurface<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        TerminalSurface {
            transcript: Transcript::new(),
            out,
            live: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn prefix(author: Author) -> ColoredString {
        match author {
            Author::User => "you> ".bright_green().bold(),
            Author::Assistant => " ai> ".bright_cyan().bold(),
            Author::Notice => "  !> ".bright_red().bold(),
        }
    }

    fn close_line(&mut self) {
        if self.live.take().is_some() {
            let _ = writeln!(self.out);
        }
    }

    fn print_entry(&mut self, slot: SlotId, author: Author, text: &str) {
        self.close_line();
        let _ = write!(self.out, "{}", Self::prefix(author));
        match author {
            Author::Assistant => {
                let _ = write!(self.out, "{}", text);
                self.live = Some((slot, text.len()));
            }
            Author::Notice => {
                let _ = writeln!(self.out, "{}", text.yellow());
            }
            Author::User => {
                let _ = writeln!(self.out, "{}", text);
            }
        }
        let _ = self.out.flush();
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn push(&mut self, author: Author, text: &str, persisted: bool) -> SlotId {
        let slot = self.transcript.push(author, text, persisted);
        self.print_entry(slot, author, text);
        if persisted && author == Author::Assistant {
            // Replayed replies are complete.
            self.close_line();
        }
        slot
    }

    fn set_text(&mut self, slot: SlotId, text: &str) {
        let Some(old) = self.transcript.text_of(slot).map(str::to_string) else {
            return;
        };
        self.transcript.set_text(slot, text);

        let live = self.live;
        match live {
            Some((live, shown))
                if live == slot
                    && text.len() >= shown
                    && text.is_char_boundary(shown)
                    && old.get(..shown) == text.get(..shown) =>
            {
                let _ = write!(self.out, "{}", &text[shown..]);
                let _ = self.out.flush();
                self.live = Some((slot, text.len()));
            }
            _ => {
                let author = self.transcript.entries()[slot.0].author;
                self.print_entry(slot, author, text);
            }
        }
    }

    fn set_persisted(&mut self, slot: SlotId, persisted: bool) {
        self.transcript.set_persisted(slot, persisted);
    }

    fn last_assistant(&self) -> Option<SlotId> {
        self.transcript.last_assistant()
    }

    fn entries(&self) -> &[Entry] {
        self.transcript.entries()
    }

    fn finish(&mut self, slot: SlotId) {
        if matches!(self.live, Some((live, _)) if live == slot) {
            self.close_line();
            let _ = self.out.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(surface: TerminalSurface<Vec<u8>>) -> String {
        String::from_utf8(surface.into_inner()).unwrap()
    }

    #[test]
    fn test_streamed_reply_prints_contiguously() {
        let mut s = TerminalSurface::new(Vec::new());
        let slot = s.push(Author::Assistant, "", false);
        s.set_text(slot, "Hel");
        s.set_text(slot, "Hello!");
        s.finish(slot);
        let out = rendered(s);
        assert!(out.contains("Hello!"));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn test_user_line_printed_once() {
        let mut s = TerminalSurface::new(Vec::new());
        s.push(Author::User, "hi", true);
        let out = rendered(s);
        assert_eq!(out.matches("hi").count(), 1);
    }

    #[test]
    fn test_rewrite_of_old_slot_reprints() {
        let mut s = TerminalSurface::new(Vec::new());
        let a = s.push(Author::Assistant, "first", true);
        s.push(Author::User, "q", true);
        s.set_text(a, "late");
        assert_eq!(s.text_of(a), Some("late"));
        let out = rendered(s);
        assert!(out.contains("late"));
    }

    #[test]
    fn test_entries_tracked_like_transcript() {
        let mut s = TerminalSurface::new(Vec::new());
        s.push(Author::User, "q", true);
        let a = s.push(Author::Assistant, "", false);
        s.notice("Error: x");
        assert_eq!(s.entries().len(), 3);
        assert_eq!(s.last_assistant(), Some(a));
    }
}
