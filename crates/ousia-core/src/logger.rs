// Ousia - Semantic Document Framework
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Message logging.
//!
//! Everything in Ousia that can go wrong in a recoverable way reports the
//! problem to a [`Logger`] and carries on. Loggers keep a stack of default
//! locations which is used for messages logged without a location of
//! their own.
//!
//! [`LoggerFork`] buffers messages so that speculative work (e.g. trying to
//! parse a number before falling back to a string) can either commit its
//! messages to the parent logger or silently drop them.

use std::fmt;

use crate::error::{ErrorKind, LoggableException};
use crate::location::{SourceContext, SourceContextCallback, SourceLocation};

/// Severity of a log message, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// Information useful only while debugging.
    Debug,
    /// Additional information, usually attached to a preceding message.
    Note,
    /// Something that might be an issue.
    Warning,
    /// Definitely an issue; the result is still usable.
    Error,
    /// The operation cannot continue.
    FatalError,
}

impl Severity {
    /// All severities in ascending order.
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Note,
        Severity::Warning,
        Severity::Error,
        Severity::FatalError,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Note => write!(f, "note"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::FatalError => write!(f, "fatal error"),
        }
    }
}

/// Controls how much context is shown along with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageMode {
    #[default]
    Default,
    /// Do not print the source excerpt.
    NoContext,
    /// Do not print the location stack.
    NoTrace,
}

/// A single log message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub severity: Severity,
    pub msg: String,
    pub location: SourceLocation,
    pub mode: MessageMode,
}

impl Message {
    pub fn new(severity: Severity, msg: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            severity,
            msg: msg.into(),
            location,
            mode: MessageMode::Default,
        }
    }

    pub fn with_mode(mut self, mode: MessageMode) -> Self {
        self.mode = mode;
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_valid() {
            write!(f, "{}: ", self.location)?;
        }
        write!(f, "{}: {}", self.severity, self.msg)
    }
}

/// Sink for log messages.
///
/// Implementors only have to provide [`Logger::process_message`]; the
/// default location handling is optional. The convenience methods live in
/// [`LoggerExt`], which is implemented for every logger.
pub trait Logger {
    /// Handles a single message.
    fn process_message(&mut self, message: Message);

    fn process_push_default_location(&mut self, _location: SourceLocation) {}

    fn process_pop_default_location(&mut self) {}

    fn process_set_default_location(&mut self, _location: SourceLocation) {}

    fn process_set_source_context_callback(&mut self, _callback: SourceContextCallback) {}
}

/// Convenience methods available on every [`Logger`].
pub trait LoggerExt: Logger {
    /// Logs a message of the given severity.
    fn log(&mut self, severity: Severity, msg: impl Into<String>, location: SourceLocation) {
        self.process_message(Message::new(severity, msg, location));
    }

    /// Logs a message with an explicit message mode.
    fn log_with_mode(
        &mut self,
        severity: Severity,
        msg: impl Into<String>,
        location: SourceLocation,
        mode: MessageMode,
    ) {
        self.process_message(Message::new(severity, msg, location).with_mode(mode));
    }

    fn debug(&mut self, msg: impl Into<String>, location: SourceLocation) {
        self.log(Severity::Debug, msg, location);
    }

    fn note(&mut self, msg: impl Into<String>, location: SourceLocation) {
        self.log(Severity::Note, msg, location);
    }

    fn warning(&mut self, msg: impl Into<String>, location: SourceLocation) {
        self.log(Severity::Warning, msg, location);
    }

    fn error(&mut self, msg: impl Into<String>, location: SourceLocation) {
        self.log(Severity::Error, msg, location);
    }

    fn fatal_error(&mut self, msg: impl Into<String>, location: SourceLocation) {
        self.log(Severity::FatalError, msg, location);
    }

    /// Logs an exception as an error message at its own location.
    fn log_exception(&mut self, ex: &LoggableException) {
        let msg = match &ex.context {
            Some(context) => format!("{} ({context})", ex.message),
            None => ex.message.clone(),
        };
        self.log(Severity::Error, msg, ex.location());
    }

    fn push_default_location(&mut self, location: SourceLocation) {
        self.process_push_default_location(location);
    }

    fn pop_default_location(&mut self) {
        self.process_pop_default_location();
    }

    fn set_default_location(&mut self, location: SourceLocation) {
        self.process_set_default_location(location);
    }

    fn set_source_context_callback(&mut self, callback: SourceContextCallback) {
        self.process_set_source_context_callback(callback);
    }
}

impl<T: Logger + ?Sized> LoggerExt for T {}

/// Stack of default locations shared by the concrete logger types.
#[derive(Debug, Clone, Default)]
struct LocationStack {
    locations: Vec<SourceLocation>,
}

impl LocationStack {
    fn push(&mut self, location: SourceLocation) {
        self.locations.push(location);
    }

    fn pop(&mut self) {
        self.locations.pop();
    }

    fn set(&mut self, location: SourceLocation) {
        match self.locations.last_mut() {
            Some(top) => *top = location,
            None => self.locations.push(location),
        }
    }

    /// Replaces an invalid message location with the innermost valid default.
    fn apply(&self, message: &mut Message) {
        if !message.location.is_valid() {
            if let Some(loc) = self.locations.iter().rev().find(|l| l.is_valid()) {
                message.location = *loc;
            }
        }
    }
}

/// Logger which keeps every message in memory and counts them per
/// severity.
pub struct ConcreteLogger {
    min_severity: Severity,
    messages: Vec<Message>,
    counts: [usize; 5],
    locations: LocationStack,
    source_context_callback: Option<SourceContextCallback>,
}

impl ConcreteLogger {
    /// Creates a logger storing messages of at least `min_severity`.
    /// Messages below it are still counted.
    pub fn new(min_severity: Severity) -> Self {
        Self {
            min_severity,
            messages: Vec::new(),
            counts: [0; 5],
            locations: LocationStack::default(),
            source_context_callback: None,
        }
    }

    /// Stored messages in the order they were logged.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn severity_count(&self, severity: Severity) -> usize {
        self.counts[severity.index()]
    }

    /// Most severe severity seen so far.
    pub fn max_encountered_severity(&self) -> Option<Severity> {
        Severity::ALL
            .iter()
            .rev()
            .copied()
            .find(|s| self.counts[s.index()] > 0)
    }

    pub fn has_error(&self) -> bool {
        self.severity_count(Severity::Error) + self.severity_count(Severity::FatalError) > 0
    }

    pub fn has_fatal_error(&self) -> bool {
        self.severity_count(Severity::FatalError) > 0
    }

    /// Returns true if a stored message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.iter().any(|m| m.msg.contains(needle))
    }

    /// Clears messages and counters; default locations are kept.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.counts = [0; 5];
    }

    /// Resolves the context of a message using the installed callback.
    pub fn source_context(&self, message: &Message) -> SourceContext {
        match &self.source_context_callback {
            Some(cb) if message.location.is_valid() => cb(&message.location),
            _ => SourceContext::default(),
        }
    }

    /// Formats a message the way it is shown to users, e.g.
    /// `book.osml:3:7: error: Unknown field "title"`.
    pub fn format_message(&self, message: &Message) -> String {
        let ctx = self.source_context(message);
        let mut out = String::new();
        if ctx.is_valid() || ctx.has_file() {
            out.push_str(&ctx.to_string());
            out.push_str(": ");
        } else if message.location.is_valid() {
            out.push_str(&message.location.to_string());
            out.push_str(": ");
        }
        out.push_str(&format!("{}: {}", message.severity, message.msg));
        if message.mode == MessageMode::Default && ctx.has_text() {
            out.push('\n');
            out.push_str(&ctx.text);
            out.push('\n');
            let indent = ctx
                .text
                .get(..ctx.rel_pos)
                .map(|s| s.chars().count())
                .unwrap_or(ctx.rel_pos);
            out.push_str(&" ".repeat(indent));
            out.push('^');
            if ctx.rel_len > 1 {
                out.push_str(&"~".repeat(ctx.rel_len - 1));
            }
        }
        out
    }
}

impl Default for ConcreteLogger {
    fn default() -> Self {
        Self::new(Severity::Debug)
    }
}

impl fmt::Debug for ConcreteLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcreteLogger")
            .field("min_severity", &self.min_severity)
            .field("messages", &self.messages)
            .field("counts", &self.counts)
            .finish()
    }
}

impl Logger for ConcreteLogger {
    fn process_message(&mut self, mut message: Message) {
        self.locations.apply(&mut message);
        self.counts[message.severity.index()] += 1;
        if message.severity >= self.min_severity {
            self.messages.push(message);
        }
    }

    fn process_push_default_location(&mut self, location: SourceLocation) {
        self.locations.push(location);
    }

    fn process_pop_default_location(&mut self) {
        self.locations.pop();
    }

    fn process_set_default_location(&mut self, location: SourceLocation) {
        self.locations.set(location);
    }

    fn process_set_source_context_callback(&mut self, callback: SourceContextCallback) {
        self.source_context_callback = Some(callback);
    }
}

/// Logger forwarding messages to `tracing`.
#[derive(Debug, Default)]
pub struct TracingLogger {
    locations: LocationStack,
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Logger for TracingLogger {
    fn process_message(&mut self, mut message: Message) {
        self.locations.apply(&mut message);
        let location = message.location;
        match message.severity {
            Severity::Debug => tracing::debug!(%location, "{}", message.msg),
            Severity::Note => tracing::info!(%location, "{}", message.msg),
            Severity::Warning => tracing::warn!(%location, "{}", message.msg),
            Severity::Error => tracing::error!(%location, "{}", message.msg),
            Severity::FatalError => tracing::error!(%location, fatal = true, "{}", message.msg),
        }
    }

    fn process_push_default_location(&mut self, location: SourceLocation) {
        self.locations.push(location);
    }

    fn process_pop_default_location(&mut self) {
        self.locations.pop();
    }

    fn process_set_default_location(&mut self, location: SourceLocation) {
        self.locations.set(location);
    }
}

/// Logger discarding all messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn process_message(&mut self, _message: Message) {}
}

/// Logger converting the first error into a [`LoggableException`].
///
/// Used by APIs that report failures as `Result`s but are implemented on
/// top of logging code.
#[derive(Debug)]
pub struct ExceptionLogger {
    kind: ErrorKind,
    exception: Option<LoggableException>,
}

impl ExceptionLogger {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            exception: None,
        }
    }

    pub fn has_exception(&self) -> bool {
        self.exception.is_some()
    }

    /// Takes the recorded exception, leaving the logger clean.
    pub fn take_exception(&mut self) -> Option<LoggableException> {
        self.exception.take()
    }

    /// Returns `value` unless an error was logged.
    pub fn into_result<T>(self, value: T) -> Result<T, LoggableException> {
        match self.exception {
            Some(ex) => Err(ex),
            None => Ok(value),
        }
    }
}

impl Logger for ExceptionLogger {
    fn process_message(&mut self, message: Message) {
        if message.severity >= Severity::Error && self.exception.is_none() {
            self.exception =
                Some(LoggableException::new(self.kind, message.msg).with_location(message.location));
        }
    }
}

#[derive(Debug, Clone)]
enum ForkOp {
    Message(Message),
    PushLocation(SourceLocation),
    PopLocation,
    SetLocation(SourceLocation),
}

/// Logger buffering everything until it is committed to a parent logger.
///
/// A fork that still holds buffered operations when dropped is a bug: the
/// caller forgot to decide between [`LoggerFork::commit`] and
/// [`LoggerFork::purge`].
#[derive(Debug, Default)]
pub struct LoggerFork {
    ops: Vec<ForkOp>,
    max_severity: Option<Severity>,
}

impl LoggerFork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most severe message buffered so far.
    pub fn max_severity(&self) -> Option<Severity> {
        self.max_severity
    }

    pub fn has_error(&self) -> bool {
        self.max_severity >= Some(Severity::Error)
    }

    /// Number of buffered messages.
    pub fn message_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, ForkOp::Message(_)))
            .count()
    }

    /// Replays all buffered operations on `parent` in order.
    pub fn commit(mut self, parent: &mut dyn Logger) {
        for op in std::mem::take(&mut self.ops) {
            match op {
                ForkOp::Message(message) => parent.process_message(message),
                ForkOp::PushLocation(loc) => parent.process_push_default_location(loc),
                ForkOp::PopLocation => parent.process_pop_default_location(),
                ForkOp::SetLocation(loc) => parent.process_set_default_location(loc),
            }
        }
    }

    /// Drops all buffered operations.
    pub fn purge(&mut self) {
        self.ops.clear();
        self.max_severity = None;
    }
}

impl Logger for LoggerFork {
    fn process_message(&mut self, message: Message) {
        self.max_severity = self.max_severity.max(Some(message.severity));
        self.ops.push(ForkOp::Message(message));
    }

    fn process_push_default_location(&mut self, location: SourceLocation) {
        self.ops.push(ForkOp::PushLocation(location));
    }

    fn process_pop_default_location(&mut self) {
        self.ops.push(ForkOp::PopLocation);
    }

    fn process_set_default_location(&mut self, location: SourceLocation) {
        self.ops.push(ForkOp::SetLocation(location));
    }
}

impl Drop for LoggerFork {
    fn drop(&mut self) {
        if !self.ops.is_empty() {
            tracing::error!(
                pending = self.ops.len(),
                "logger fork dropped without commit or purge"
            );
            debug_assert!(
                std::thread::panicking(),
                "logger fork dropped with {} pending operations",
                self.ops.len()
            );
        }
    }
}
