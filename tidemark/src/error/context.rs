//! Wrapping errors with what was being attempted
//!
//! Discovery, configuration loading and the migration table reads attach a
//! message when they fail; [`ErrorChain`] unwinds those layers for display.

use super::Error;
use std::fmt;

/// Attach a context message to the error of a result
pub trait ErrorContext<T> {
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Into<String>;

    /// Like [`context`](ErrorContext::context), building the message only on failure
    fn with_context<C, F>(self, f: F) -> Result<T, Error>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: Into<Error>,
{
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Into<String>,
    {
        self.map_err(|e| Into::<Error>::into(e).with_context(context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, Error>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Into::<Error>::into(e).with_context(f()))
    }
}

/// The layers of an error, outermost first
pub struct ErrorChain<'a> {
    root: &'a Error,
    messages: Vec<String>,
}

impl<'a> ErrorChain<'a> {
    pub fn new(error: &'a Error) -> Self {
        let mut messages = Vec::new();
        let mut current = error;
        loop {
            messages.push(current.to_string());
            match current {
                Error::WithContext { source, .. } => current = &**source,
                _ => break,
            }
        }
        Self {
            root: current,
            messages,
        }
    }

    /// One message per layer
    pub fn chain(&self) -> &[String] {
        &self.messages
    }

    pub fn root_cause(&self) -> &'a Error {
        self.root
    }

    /// Single line, for log records
    pub fn format_for_log(&self) -> String {
        self.messages.join(" -> ")
    }

    /// Outermost message, then the numbered causes below it
    pub fn format_for_display(&self) -> String {
        let (head, causes) = match self.messages.split_first() {
            Some(split) => split,
            None => return String::new(),
        };
        if causes.is_empty() {
            return head.clone();
        }

        let mut out = format!("{}\n\nCaused by:", head);
        for (i, cause) in causes.iter().enumerate() {
            out.push_str(&format!("\n  {}. {}", i + 1, cause));
        }
        out
    }
}

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_for_display())
    }
}
