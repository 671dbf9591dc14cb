//! Six-cell one-time-code entry state machine.

/// Number of code cells.
pub const CELLS: usize = 6;
/// Client-side cap on failed submissions. The server stays authoritative
/// either way.
pub const MAX_ATTEMPTS: u8 = 3;
/// Seconds before "resend" becomes available again.
pub const RESEND_COOLDOWN_SECS: u16 = 60;

/// State behind the six-cell code input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpInput {
    cells: [Option<char>; CELLS],
    focus: usize,
    attempts: u8,
    cooldown: u16,
}

impl Default for OtpInput {
    fn default() -> Self {
        Self::new()
    }
}

impl OtpInput {
    /// Empty input, focus on the first cell, resend cooling down.
    pub fn new() -> Self {
        Self {
            cells: [None; CELLS],
            focus: 0,
            attempts: 0,
            cooldown: RESEND_COOLDOWN_SECS,
        }
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn cells(&self) -> &[Option<char>; CELLS] {
        &self.cells
    }

    /// Raw change event on the focused cell. More than one character in a
    /// single change is treated as a paste.
    pub fn input(&mut self, text: &str) {
        if text.chars().count() > 1 {
            self.paste(text);
        } else if let Some(c) = text.chars().next() {
            self.type_digit(c);
        }
    }

    /// Type one digit into the focused cell and advance; on the last cell
    /// the focus stays put. Non-digits are ignored.
    pub fn type_digit(&mut self, c: char) {
        if !c.is_ascii_digit() {
            return;
        }

        self.cells[self.focus] = Some(c);
        if self.focus + 1 < CELLS {
            self.focus += 1;
        }
    }

    /// Backspace: a filled cell clears in place, an empty one moves the
    /// focus left and clears there.
    pub fn backspace(&mut self) {
        if self.cells[self.focus].is_some() {
            self.cells[self.focus] = None;
        } else if self.focus > 0 {
            self.focus -= 1;
            self.cells[self.focus] = None;
        }
    }

    /// Paste: when the text strips down to exactly six digits, populate
    /// every cell at once and focus the last one. Anything else leaves the
    /// input untouched.
    pub fn paste(&mut self, text: &str) -> bool {
        let digits: Vec<char> =
            text.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() != CELLS {
            return false;
        }

        for (cell, digit) in self.cells.iter_mut().zip(&digits) {
            *cell = Some(*digit);
        }
        self.focus = CELLS - 1;
        true
    }

    /// The assembled code, once every cell is filled.
    pub fn code(&self) -> Option<String> {
        self.cells.iter().copied().collect()
    }

    /// One second of countdown. Inert at zero.
    pub fn tick(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }

    pub fn cooldown(&self) -> u16 {
        self.cooldown
    }

    pub fn can_resend(&self) -> bool {
        self.cooldown == 0
    }

    /// Restart the countdown and clear the cells after a resend.
    pub fn resend(&mut self) {
        self.cooldown = RESEND_COOLDOWN_SECS;
        self.cells = [None; CELLS];
        self.focus = 0;
    }

    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    pub fn remaining_attempts(&self) -> u8 {
        MAX_ATTEMPTS.saturating_sub(self.attempts)
    }

    /// Submission needs a complete code and attempts left.
    pub fn can_submit(&self) -> bool {
        self.code().is_some() && self.attempts < MAX_ATTEMPTS
    }

    /// A failed verification clears every cell and refocuses the first,
    /// so the same wrong digits are never left around to resubmit.
    pub fn record_failure(&mut self) {
        self.attempts += 1;
        self.cells = [None; CELLS];
        self.focus = 0;
    }
}
