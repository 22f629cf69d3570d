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

//! Variant to JSON conversion

use serde_json::{Map, Number, Value as JsonValue};

use super::Variant;

/// Serialises variants as JSON.
pub struct VariantWriter;

impl VariantWriter {
    /// Converts a variant to a `serde_json::Value`.
    ///
    /// Non-finite doubles become `null`; objects and functions are written
    /// as their textual representation.
    pub fn to_json_value(var: &Variant) -> JsonValue {
        match var {
            Variant::Null => JsonValue::Null,
            Variant::Bool(b) => JsonValue::Bool(*b),
            Variant::Int(i) => JsonValue::Number(Number::from(*i)),
            Variant::Double(d) => Number::from_f64(*d)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Variant::String(s) | Variant::Magic(s) => JsonValue::String(s.clone()),
            Variant::Array(items) => {
                let mut arr = Vec::with_capacity(items.len());
                for item in items {
                    arr.push(Self::to_json_value(item));
                }
                JsonValue::Array(arr)
            }
            Variant::Map(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(key.clone(), Self::to_json_value(value));
                }
                JsonValue::Object(map)
            }
            Variant::Object(_) | Variant::Function(_) => JsonValue::String(var.to_string_with(false)),
        }
    }

    /// Writes a variant as JSON text, optionally pretty printed.
    pub fn write_json(var: &Variant, pretty: bool) -> String {
        let value = Self::to_json_value(var);
        if pretty {
            format!("{value:#}")
        } else {
            value.to_string()
        }
    }

    /// Quotes and escapes a string the way JSON does.
    pub fn escape_string(s: &str) -> String {
        JsonValue::String(s.to_string()).to_string()
    }
}
