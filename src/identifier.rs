use std::fmt;

/// Canonicalize raw handle input after each keystroke.
///
/// A lone `@` collapses to the empty string so the prefix can be deleted
/// without reappearing mid-edit. Anything else gains a leading `@` if missing.
pub fn normalize(input: &str) -> String {
    if input == "@" {
        return String::new();
    }
    if input.is_empty() || input.starts_with('@') {
        return input.to_owned();
    }
    format!("@{input}")
}

/// Prefix a stored username with `@` when the backend returned it bare.
///
/// Unlike [`normalize`], a lone `@` is kept as-is: this is applied to
/// server data, not to in-progress user input.
pub fn ensure_prefix(username: &str) -> String {
    if username.starts_with('@') {
        username.to_owned()
    } else {
        format!("@{username}")
    }
}

/// An `@`-prefixed account handle, or empty when nothing has been typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AccountIdentifier(String);

impl AccountIdentifier {
    pub fn from_input(input: &str) -> Self {
        Self(normalize(input))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a typed character and re-normalize.
    pub fn push(&mut self, c: char) {
        let mut raw = std::mem::take(&mut self.0);
        raw.push(c);
        self.0 = normalize(&raw);
    }

    /// Remove the last character and re-normalize.
    pub fn pop(&mut self) {
        let mut raw = std::mem::take(&mut self.0);
        raw.pop();
        self.0 = normalize(&raw);
    }
}

impl fmt::Display for AccountIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
