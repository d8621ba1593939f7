// src/rules.rs - Log type identification and content matching rules

pub mod catalog;
pub mod description;

pub use description::DescriptionHandler;

use chrono::{DateTime, NaiveDateTime};
use indexmap::IndexMap;
use regex::{Captures, Regex, RegexBuilder};
use std::collections::HashMap;

use crate::error::RuleError;

pub const TIMESTAMP_GROUP: &str = "Timestamp";
pub const DESCRIPTION_GROUP: &str = "Description";

/// Security or operational classification of a matched line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessType {
    pub label: &'static str,
    pub handler: DescriptionHandler,
}

impl AccessType {
    pub const fn new(label: &'static str, handler: DescriptionHandler) -> Self {
        AccessType { label, handler }
    }

    pub fn include_in_timeline(&self) -> bool {
        self.handler.include_in_timeline()
    }
}

/// A chrono layout a log type writes its timestamps in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampLayout {
    /// No offset in the text; taken as-is
    Naive(&'static str),
    /// Carries an offset; converted to UTC
    Offset(&'static str),
}

impl TimestampLayout {
    pub fn parse(&self, text: &str) -> Option<NaiveDateTime> {
        match self {
            TimestampLayout::Naive(fmt) => NaiveDateTime::parse_from_str(text, fmt).ok(),
            TimestampLayout::Offset(fmt) => DateTime::parse_from_str(text, fmt)
                .ok()
                .map(|dt| dt.naive_utc()),
        }
    }
}

/// Uncompiled content pattern, as written in the catalog
#[derive(Debug, Clone, Copy)]
pub struct PatternDef {
    pub regex: &'static str,
    /// Must also match the captured description for the pattern to apply
    pub description_filter: Option<&'static str>,
    pub access_type: AccessType,
}

/// Uncompiled log type, as written in the catalog
#[derive(Debug, Clone, Copy)]
pub struct LogTypeDef {
    pub name: &'static str,
    /// Matched case-insensitively against the whole base name
    pub filename_pattern: &'static str,
    pub timestamp_layouts: &'static [TimestampLayout],
    pub patterns: &'static [PatternDef],
}

#[derive(Debug, Clone)]
pub struct ContentPattern {
    regex: Regex,
    /// Patterns sharing a line regex share this id, so a line is captured once per regex
    line_id: usize,
    description_filter: Option<Regex>,
    access_type: AccessType,
    field_names: Vec<String>,
}

impl ContentPattern {
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn access_type(&self) -> AccessType {
        self.access_type
    }

    /// Named groups of the line regex, in declaration order
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    fn accepts(&self, captures: &Captures) -> bool {
        match &self.description_filter {
            Some(filter) => captures
                .name(DESCRIPTION_GROUP)
                .is_some_and(|m| filter.is_match(m.as_str())),
            None => true,
        }
    }
}

/// A line accepted by one of a log type's content patterns
#[derive(Debug)]
pub struct LineMatch<'r, 't> {
    pub pattern: &'r ContentPattern,
    pub captures: Captures<'t>,
}

impl LineMatch<'_, '_> {
    /// Every declared group of the pattern; groups that did not participate are empty
    pub fn fields(&self) -> IndexMap<String, String> {
        self.pattern
            .field_names
            .iter()
            .map(|name| {
                let value = self
                    .captures
                    .name(name)
                    .map_or_else(String::new, |m| m.as_str().to_string());
                (name.clone(), value)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct LogTypeRule {
    name: &'static str,
    filename: Regex,
    timestamp_layouts: &'static [TimestampLayout],
    content_patterns: Vec<ContentPattern>,
    field_names: Vec<String>,
    line_regex_count: usize,
}

impl LogTypeRule {
    pub fn compile(def: &LogTypeDef) -> Result<Self, RuleError> {
        let regex_error = |source| RuleError::Regex {
            log_type: def.name.to_string(),
            source,
        };

        let filename = RegexBuilder::new(&format!("^(?:{})$", def.filename_pattern))
            .case_insensitive(true)
            .build()
            .map_err(regex_error)?;

        let mut line_regexes: HashMap<&'static str, (usize, Regex)> = HashMap::new();
        let mut content_patterns = Vec::with_capacity(def.patterns.len());
        let mut field_names: Vec<String> = Vec::new();

        for pattern in def.patterns {
            let next_id = line_regexes.len();
            let (line_id, regex) = match line_regexes.get(pattern.regex) {
                Some(entry) => entry.clone(),
                None => {
                    let regex = Regex::new(pattern.regex).map_err(regex_error)?;
                    line_regexes.insert(pattern.regex, (next_id, regex.clone()));
                    (next_id, regex)
                }
            };

            let description_filter = pattern
                .description_filter
                .map(Regex::new)
                .transpose()
                .map_err(regex_error)?;

            let names: Vec<String> = regex.capture_names().flatten().map(String::from).collect();

            let mut required = vec![DESCRIPTION_GROUP];
            if pattern.access_type.include_in_timeline() {
                required.push(TIMESTAMP_GROUP);
            }
            required.extend(pattern.access_type.handler.extra_group());
            if let Some(missing) = required.iter().find(|g| !names.iter().any(|n| n == **g)) {
                return Err(RuleError::MissingGroup {
                    log_type: def.name.to_string(),
                    access_type: pattern.access_type.label.to_string(),
                    group: missing.to_string(),
                });
            }

            for name in &names {
                if !field_names.contains(name) {
                    field_names.push(name.clone());
                }
            }

            content_patterns.push(ContentPattern {
                regex,
                line_id,
                description_filter,
                access_type: pattern.access_type,
                field_names: names,
            });
        }

        Ok(LogTypeRule {
            name: def.name,
            filename,
            timestamp_layouts: def.timestamp_layouts,
            content_patterns,
            field_names,
            line_regex_count: line_regexes.len(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches_file_name(&self, file_name: &str) -> bool {
        self.filename.is_match(file_name)
    }

    pub fn content_patterns(&self) -> &[ContentPattern] {
        &self.content_patterns
    }

    /// Union of all content patterns' groups, in first-declared order
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn timestamp_layouts(&self) -> &[TimestampLayout] {
        self.timestamp_layouts
    }

    /// Normalize a raw timestamp using the first layout that accepts it
    pub fn parse_timestamp(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        self.timestamp_layouts
            .iter()
            .find_map(|layout| layout.parse(text))
    }

    /// Try the content patterns in declared order; the first acceptance wins.
    pub fn match_line<'r, 't>(&'r self, line: &'t str) -> Option<LineMatch<'r, 't>> {
        let mut captured: Vec<Option<Option<Captures<'t>>>> =
            (0..self.line_regex_count).map(|_| None).collect();

        for pattern in &self.content_patterns {
            let slot = captured[pattern.line_id].get_or_insert_with(|| pattern.regex.captures(line));
            if matches!(slot, Some(caps) if pattern.accepts(caps)) {
                return slot.take().map(|captures| LineMatch { pattern, captures });
            }
        }
        None
    }
}

/// The fixed set of log types, compiled once and shared read-only
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    rules: Vec<LogTypeRule>,
}

impl RuleCatalog {
    /// The compiled-in ESXi catalog
    pub fn builtin() -> Result<Self, RuleError> {
        Self::compile(catalog::ESXI_LOG_TYPES)
    }

    pub fn compile(defs: &[LogTypeDef]) -> Result<Self, RuleError> {
        let rules = defs
            .iter()
            .map(LogTypeRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RuleCatalog { rules })
    }

    pub fn rules(&self) -> &[LogTypeRule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&LogTypeRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    /// First rule, in catalog order, whose filename pattern accepts `file_name`
    pub fn rule_for_file(&self, file_name: &str) -> Option<&LogTypeRule> {
        self.rules
            .iter()
            .find(|rule| rule.matches_file_name(file_name))
    }
}
