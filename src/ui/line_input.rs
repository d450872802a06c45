use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputResult {
    Continue,
    /// A printable character was inserted.
    Typed(char),
    Submit,
    Cancel,
}

/// Single-line editor shared by the command line, the lesson prompt and the
/// phrase game. Tab completes the first word against a fixed command list.
pub struct LineInput {
    text: String,
    /// Cursor position as a char index (0 = before first char).
    cursor: usize,
    commands: &'static [&'static str],
    completions: Vec<String>,
    completion_index: Option<usize>,
}

impl LineInput {
    pub fn new(text: &str) -> Self {
        let cursor = text.chars().count();
        Self {
            text: text.to_string(),
            cursor,
            commands: &[],
            completions: Vec::new(),
            completion_index: None,
        }
    }

    pub fn with_commands(mut self, commands: &'static [&'static str]) -> Self {
        self.commands = commands;
        self
    }

    pub fn value(&self) -> &str {
        &self.text
    }

    /// Returns the text and leaves the editor empty.
    pub fn take(&mut self) -> String {
        self.reset_completion();
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    pub fn clear(&mut self) {
        self.take();
    }

    /// Returns (before_cursor, cursor_char, after_cursor) for styled rendering.
    /// When cursor is at end of text, cursor_char is None.
    pub fn render_parts(&self) -> (&str, Option<char>, &str) {
        let byte_offset = self.char_to_byte(self.cursor);
        match self.text[byte_offset..].chars().next() {
            Some(ch) => {
                let next_byte = byte_offset + ch.len_utf8();
                (&self.text[..byte_offset], Some(ch), &self.text[next_byte..])
            }
            None => (&self.text, None, ""),
        }
    }

    pub fn handle(&mut self, key: KeyEvent) -> InputResult {
        if !matches!(key.code, KeyCode::Tab | KeyCode::BackTab) {
            self.reset_completion();
        }
        match key.code {
            KeyCode::Esc => return InputResult::Cancel,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return InputResult::Cancel;
            }
            KeyCode::Enter => return InputResult::Submit,

            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                let len = self.text.chars().count();
                if self.cursor < len {
                    self.cursor += 1;
                }
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.text.chars().count(),
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.remove_char_at(self.cursor - 1);
                    self.cursor -= 1;
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.text.chars().count() {
                    self.remove_char_at(self.cursor);
                }
            }
            KeyCode::Tab => self.tab_complete(true),
            KeyCode::BackTab => self.tab_complete(false),
            KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.cursor = 0;
            }
            KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.cursor = self.text.chars().count();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.text.clear();
                self.cursor = 0;
            }
            KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.delete_word_back();
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                let byte_offset = self.char_to_byte(self.cursor);
                self.text.insert(byte_offset, ch);
                self.cursor += 1;
                return InputResult::Typed(ch);
            }
            _ => {}
        }
        InputResult::Continue
    }

    /// Convert char index to byte offset.
    fn char_to_byte(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(b, _)| b)
            .unwrap_or(self.text.len())
    }

    fn remove_char_at(&mut self, char_idx: usize) {
        let start = self.char_to_byte(char_idx);
        let end = self.char_to_byte(char_idx + 1);
        self.text.replace_range(start..end, "");
    }

    /// unix-word-rubout: skip whitespace, then non-whitespace.
    fn delete_word_back(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let chars: Vec<char> = self.text.chars().collect();
        let mut pos = self.cursor;

        while pos > 0 && chars[pos - 1].is_whitespace() {
            pos -= 1;
        }
        while pos > 0 && !chars[pos - 1].is_whitespace() {
            pos -= 1;
        }

        let start_byte = self.char_to_byte(pos);
        let end_byte = self.char_to_byte(self.cursor);
        self.text.replace_range(start_byte..end_byte, "");
        self.cursor = pos;
    }

    fn reset_completion(&mut self) {
        self.completions.clear();
        self.completion_index = None;
    }

    fn tab_complete(&mut self, forward: bool) {
        // Only the command name, and only with the cursor at the end.
        if self.cursor < self.text.chars().count() || self.text.contains(char::is_whitespace) {
            return;
        }

        match self.completion_index {
            None => {
                let seed = self.text.as_str();
                self.completions = self
                    .commands
                    .iter()
                    .filter(|c| c.starts_with(seed))
                    .map(|c| c.to_string())
                    .collect();
                if self.completions.is_empty() {
                    return;
                }
                let first = if forward { 0 } else { self.completions.len() - 1 };
                self.apply_completion(first);
            }
            Some(idx) => {
                let count = self.completions.len();
                let next = if forward {
                    (idx + 1) % count
                } else {
                    (idx + count - 1) % count
                };
                self.apply_completion(next);
            }
        }
    }

    fn apply_completion(&mut self, idx: usize) {
        self.completion_index = Some(idx);
        self.text = self.completions[idx].clone();
        self.cursor = self.text.chars().count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMANDS: &[&str] = &["edit", "play", "quit", "tree", "tut"];

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn type_str(input: &mut LineInput, text: &str) {
        for ch in text.chars() {
            input.handle(key(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn insert_at_start_middle_end() {
        let mut input = LineInput::new("");
        type_str(&mut input, "ac");
        input.handle(key(KeyCode::Left));
        input.handle(key(KeyCode::Char('b')));
        input.handle(key(KeyCode::Home));
        input.handle(key(KeyCode::Char('>')));
        assert_eq!(input.value(), ">abc");
    }

    #[test]
    fn typed_char_is_reported() {
        let mut input = LineInput::new("");
        assert_eq!(input.handle(key(KeyCode::Char(';'))), InputResult::Typed(';'));
        assert_eq!(input.handle(ctrl('a')), InputResult::Continue);
    }

    #[test]
    fn backspace_and_delete_at_boundaries() {
        let mut input = LineInput::new("ab");
        input.handle(key(KeyCode::Delete));
        assert_eq!(input.value(), "ab");
        input.handle(key(KeyCode::Backspace));
        assert_eq!(input.value(), "a");
        input.handle(key(KeyCode::Home));
        input.handle(key(KeyCode::Backspace));
        assert_eq!(input.value(), "a");
        input.handle(key(KeyCode::Delete));
        assert_eq!(input.value(), "");
    }

    #[test]
    fn multibyte_editing() {
        let mut input = LineInput::new("héllo");
        input.handle(key(KeyCode::Home));
        input.handle(key(KeyCode::Right));
        input.handle(key(KeyCode::Delete));
        assert_eq!(input.value(), "hllo");
    }

    #[test]
    fn ctrl_w_word_delete() {
        let mut input = LineInput::new("tut --reset  ");
        input.handle(ctrl('w'));
        assert_eq!(input.value(), "tut ");
    }

    #[test]
    fn ctrl_u_clears() {
        let mut input = LineInput::new("hello world");
        input.handle(ctrl('u'));
        assert_eq!(input.value(), "");
        assert_eq!(input.cursor, 0);
    }

    #[test]
    fn take_empties_the_line() {
        let mut input = LineInput::new("fdsa");
        assert_eq!(input.take(), "fdsa");
        assert_eq!(input.value(), "");
        assert_eq!(input.render_parts(), ("", None, ""));
    }

    #[test]
    fn render_parts_positions() {
        let mut input = LineInput::new("abc");
        assert_eq!(input.render_parts(), ("abc", None, ""));
        input.cursor = 1;
        assert_eq!(input.render_parts(), ("a", Some('b'), "c"));
        input.cursor = 0;
        assert_eq!(input.render_parts(), ("", Some('a'), "bc"));
    }

    #[test]
    fn submit_and_cancel() {
        let mut input = LineInput::new("test");
        assert_eq!(input.handle(key(KeyCode::Enter)), InputResult::Submit);
        assert_eq!(input.handle(key(KeyCode::Esc)), InputResult::Cancel);
        assert_eq!(input.handle(ctrl('c')), InputResult::Cancel);
    }

    #[test]
    fn tab_completion_cycles_and_backtab_reverses() {
        let mut input = LineInput::new("t").with_commands(COMMANDS);
        input.handle(key(KeyCode::Tab));
        assert_eq!(input.value(), "tree");
        input.handle(key(KeyCode::Tab));
        assert_eq!(input.value(), "tut");
        input.handle(key(KeyCode::Tab));
        assert_eq!(input.value(), "tree");
        input.handle(key(KeyCode::BackTab));
        assert_eq!(input.value(), "tut");
    }

    #[test]
    fn tab_without_match_or_after_args_is_noop() {
        let mut input = LineInput::new("zz").with_commands(COMMANDS);
        input.handle(key(KeyCode::Tab));
        assert_eq!(input.value(), "zz");

        let mut input = LineInput::new("tut -").with_commands(COMMANDS);
        input.handle(key(KeyCode::Tab));
        assert_eq!(input.value(), "tut -");
    }

    #[test]
    fn tab_at_midline_is_noop() {
        let mut input = LineInput::new("pl").with_commands(COMMANDS);
        input.handle(key(KeyCode::Left));
        input.handle(key(KeyCode::Tab));
        assert_eq!(input.value(), "pl");
    }

    #[test]
    fn non_tab_key_resets_completion() {
        let mut input = LineInput::new("t").with_commands(COMMANDS);
        input.handle(key(KeyCode::Tab));
        assert!(input.completion_index.is_some());
        input.handle(key(KeyCode::Char(' ')));
        assert!(input.completion_index.is_none());
        assert_eq!(input.value(), "tree ");
    }
}
