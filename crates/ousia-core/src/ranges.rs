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

//! Sets of natural number ranges, used as cardinalities.
//!
//! The textual form is `{1-3,5,7-*}`; `*` stands for an unbounded upper
//! end and on its own for "any number".

use std::fmt;

use crate::error::{LoggableException, OusiaResult};
use crate::variant::Variant;

/// Inclusive range `start..=end`. `end == usize::MAX` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn single(n: usize) -> Self {
        Self::new(n, n)
    }

    pub const fn at_least(start: usize) -> Self {
        Self::new(start, usize::MAX)
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    pub fn is_unbounded(&self) -> bool {
        self.end == usize::MAX
    }

    pub fn contains(&self, n: usize) -> bool {
        self.start <= n && n <= self.end
    }

    /// Whether the two ranges overlap or touch.
    fn joins(&self, other: &Range) -> bool {
        self.start <= other.end.saturating_add(1) && other.start <= self.end.saturating_add(1)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start == self.end, self.is_unbounded()) {
            (true, _) => write!(f, "{}", self.start),
            (false, true) => write!(f, "{}-*", self.start),
            (false, false) => write!(f, "{}-{}", self.start, self.end),
        }
    }
}

/// Ordered set of disjoint, non-adjacent ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeSet {
    ranges: Vec<Range>,
    invalid: bool,
}

impl RangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{0-*}`.
    pub fn any() -> Self {
        Self::from_range(Range::at_least(0))
    }

    pub fn single(n: usize) -> Self {
        Self::from_range(Range::single(n))
    }

    pub fn from_range(range: Range) -> Self {
        let mut set = Self::new();
        set.merge(range);
        set
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// A set is valid if it is non-empty and no invalid range was merged
    /// into it.
    pub fn is_valid(&self) -> bool {
        !self.invalid && !self.ranges.is_empty()
    }

    /// Adds a range, joining it with overlapping or adjacent ones.
    pub fn merge(&mut self, range: Range) {
        if !range.is_valid() {
            self.invalid = true;
            return;
        }
        let mut merged = range;
        let mut rest = Vec::with_capacity(self.ranges.len() + 1);
        for r in self.ranges.drain(..) {
            if r.joins(&merged) {
                merged = Range::new(r.start.min(merged.start), r.end.max(merged.end));
            } else {
                rest.push(r);
            }
        }
        let pos = rest.partition_point(|r| r.start < merged.start);
        rest.insert(pos, merged);
        self.ranges = rest;
    }

    pub fn merge_set(&mut self, other: &RangeSet) {
        self.invalid |= other.invalid;
        for r in &other.ranges {
            self.merge(*r);
        }
    }

    pub fn contains(&self, n: usize) -> bool {
        let pos = self.ranges.partition_point(|r| r.end < n);
        self.ranges.get(pos).map_or(false, |r| r.contains(n))
    }

    pub fn min(&self) -> Option<usize> {
        self.ranges.first().map(|r| r.start)
    }

    /// Largest element; `usize::MAX` for unbounded sets.
    pub fn max(&self) -> Option<usize> {
        self.ranges.last().map(|r| r.end)
    }

    /// Parses the textual form. Braces are optional.
    ///
    /// # Examples
    ///
    /// ```
    /// use ousia_core::ranges::RangeSet;
    ///
    /// let set = RangeSet::parse("{1-3, 5, 7-*}").unwrap();
    /// assert!(set.contains(2));
    /// assert!(!set.contains(4));
    /// assert!(set.contains(1000));
    /// assert_eq!(set.to_string(), "{1-3,5,7-*}");
    /// ```
    pub fn parse(text: &str) -> OusiaResult<Self> {
        let trimmed = text.trim();
        let inner = match (trimmed.strip_prefix('{'), trimmed.ends_with('}')) {
            (Some(rest), true) => &rest[..rest.len() - 1],
            (None, false) => trimmed,
            _ => {
                return Err(LoggableException::syntax(format!(
                    "Unbalanced braces in range set \"{text}\""
                )))
            }
        };
        let mut set = Self::new();
        for part in inner.split(',') {
            let part = part.trim();
            if part.is_empty() {
                if inner.trim().is_empty() {
                    continue;
                }
                return Err(LoggableException::syntax(format!(
                    "Empty range in range set \"{text}\""
                )));
            }
            set.merge(Self::parse_range(part, text)?);
        }
        Ok(set)
    }

    fn parse_range(part: &str, text: &str) -> OusiaResult<Range> {
        let number = |s: &str| {
            let s = s.trim();
            s.parse::<usize>().map_err(|_| {
                LoggableException::syntax(format!(
                    "Invalid number \"{s}\" in range set \"{text}\""
                ))
            })
        };
        if part == "*" {
            return Ok(Range::at_least(0));
        }
        match part.split_once('-') {
            Some((start, end)) if end.trim() == "*" => Ok(Range::at_least(number(start)?)),
            Some((start, end)) => Ok(Range::new(number(start)?, number(end)?)),
            None => Ok(Range::single(number(part)?)),
        }
    }

    /// Builds a set from a cardinality given as integer, range set literal
    /// or array of integers.
    pub fn from_variant(var: &Variant) -> OusiaResult<Self> {
        match var {
            Variant::Int(n) if *n >= 0 => Ok(Self::single(*n as usize)),
            Variant::String(s) | Variant::Magic(s) => Self::parse(s),
            Variant::Array(items) => {
                let mut set = Self::new();
                for item in items {
                    set.merge_set(&Self::from_variant(item)?);
                }
                Ok(set)
            }
            other => Err(LoggableException::type_mismatch(other.type_name(), "cardinality")),
        }
    }
}

impl fmt::Display for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, r) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{r}")?;
        }
        write!(f, "}}")
    }
}
