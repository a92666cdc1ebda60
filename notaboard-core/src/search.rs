use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::types::Workspace;

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub use_regex: bool,
}

/// The card fields a query is matched against.
pub struct SearchDocument<'a> {
    pub project_title: &'a str,
    pub project_tags: &'a [String],
    pub column_title: &'a str,
    pub card_title: &'a str,
    pub card_body: &'a str,
    pub assignee_id: Option<&'a str>,
    pub assignee_name: Option<&'a str>,
    pub priority: i64,
}

/// A card matching a query, in board display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub project_id: String,
    pub project_title: String,
    pub column_id: String,
    pub column_title: String,
    pub card_id: String,
    pub card_title: String,
    /// Position within the column.
    pub index: usize,
}

#[derive(Debug)]
enum SearchTerm {
    Text(String),
    Tag(String),
    Project(String),
    Column(String),
    Assignee(String),
    Unassigned,
    Priority(i64),
    Regex(Regex),
}

#[derive(Debug)]
struct ParsedTerm {
    negate: bool,
    term: SearchTerm,
}

pub struct SearchEngine {
    terms: Vec<ParsedTerm>,
    regex_mode: Option<Regex>,
    regex_invalid: bool,
    case_sensitive: bool,
}

impl SearchEngine {
    pub fn compile(raw_query: &str, options: SearchOptions) -> Self {
        let query = raw_query.trim();

        if query.is_empty() {
            return Self {
                terms: Vec::new(),
                regex_mode: None,
                regex_invalid: false,
                case_sensitive: options.case_sensitive,
            };
        }

        if options.use_regex {
            let regex_mode = build_regex(query, options.case_sensitive);
            let regex_invalid = regex_mode.is_none();
            return Self {
                terms: Vec::new(),
                regex_mode,
                regex_invalid,
                case_sensitive: options.case_sensitive,
            };
        }

        let terms = split_query_tokens(query)
            .into_iter()
            .filter_map(|token| parse_token(token, options.case_sensitive))
            .collect();

        Self {
            terms,
            regex_mode: None,
            regex_invalid: false,
            case_sensitive: options.case_sensitive,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.regex_mode.is_none() && !self.regex_invalid
    }

    pub fn matches(&self, doc: &SearchDocument<'_>) -> bool {
        if self.regex_invalid {
            return false;
        }

        if let Some(regex) = &self.regex_mode {
            return regex.is_match(doc.card_title) || regex.is_match(doc.card_body);
        }

        for parsed in &self.terms {
            let matched = self.matches_term(&parsed.term, doc);
            if parsed.negate {
                if matched {
                    return false;
                }
            } else if !matched {
                return false;
            }
        }
        true
    }

    fn matches_term(&self, term: &SearchTerm, doc: &SearchDocument<'_>) -> bool {
        match term {
            SearchTerm::Text(value) => {
                contains_text(doc.card_title, value, self.case_sensitive)
                    || contains_text(doc.card_body, value, self.case_sensitive)
            }
            SearchTerm::Tag(value) => doc
                .project_tags
                .iter()
                .any(|tag| equals_text(tag.trim_start_matches('#'), value, self.case_sensitive)),
            SearchTerm::Project(value) => contains_text(doc.project_title, value, self.case_sensitive),
            SearchTerm::Column(value) => contains_text(doc.column_title, value, self.case_sensitive),
            SearchTerm::Assignee(value) => {
                doc.assignee_id
                    .map(|id| equals_text(id, value, self.case_sensitive))
                    .unwrap_or(false)
                    || doc
                        .assignee_name
                        .map(|name| contains_text(name, value, self.case_sensitive))
                        .unwrap_or(false)
            }
            SearchTerm::Unassigned => doc.assignee_id.is_none(),
            SearchTerm::Priority(p) => doc.priority == *p,
            SearchTerm::Regex(regex) => regex.is_match(doc.card_title) || regex.is_match(doc.card_body),
        }
    }
}

/// Run `query` over every card of every project, in display order.
pub fn search_workspace(workspace: &Workspace, query: &str, options: SearchOptions) -> Vec<SearchHit> {
    let engine = SearchEngine::compile(query, options);
    if engine.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();
    for project in &workspace.projects {
        for column in &project.board.columns {
            for (index, card) in project.board.cards_in(column).enumerate() {
                let assignee_name = card
                    .assignee
                    .as_deref()
                    .and_then(|id| workspace.user(id))
                    .map(|u| u.name.as_str());
                let doc = SearchDocument {
                    project_title: &project.title,
                    project_tags: &project.tags,
                    column_title: &column.title,
                    card_title: &card.title,
                    card_body: &card.body,
                    assignee_id: card.assignee.as_deref(),
                    assignee_name,
                    priority: card.priority,
                };
                if engine.matches(&doc) {
                    hits.push(SearchHit {
                        project_id: project.id.clone(),
                        project_title: project.title.clone(),
                        column_id: column.id.clone(),
                        column_title: column.title.clone(),
                        card_id: card.id.clone(),
                        card_title: card.title.clone(),
                        index,
                    });
                }
            }
        }
    }
    log::debug!("[notaboard.search] {:?} -> {} hits", query, hits.len());
    hits
}

fn split_query_tokens(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in input.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if ch == '"' {
            in_quotes = !in_quotes;
            if !in_quotes && !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(ch);
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_token(raw_token: String, case_sensitive: bool) -> Option<ParsedTerm> {
    let token = raw_token.trim();
    if token.is_empty() {
        return None;
    }

    let (negate, token) = match token.strip_prefix('-') {
        Some(rest) if !rest.is_empty() => (true, rest),
        _ => (false, token),
    };

    if let Some(tag) = token.strip_prefix('#') {
        if tag.is_empty() {
            return None;
        }
        return Some(ParsedTerm {
            negate,
            term: SearchTerm::Tag(normalize_case(tag, case_sensitive)),
        });
    }

    if token.starts_with('/') && token.ends_with('/') && token.len() > 2 {
        if let Some(regex) = build_regex(&token[1..token.len() - 1], case_sensitive) {
            return Some(ParsedTerm {
                negate,
                term: SearchTerm::Regex(regex),
            });
        }
    }

    if let Some((key_raw, value_raw)) = token.split_once(':') {
        let key = key_raw.to_ascii_lowercase();
        let value = value_raw.trim();
        if value.is_empty() {
            return None;
        }
        let term = match key.as_str() {
            "project" => Some(SearchTerm::Project(normalize_case(value, case_sensitive))),
            "col" | "column" => Some(SearchTerm::Column(normalize_case(value, case_sensitive))),
            "assignee" | "user" => match value.to_ascii_lowercase().as_str() {
                "none" => Some(SearchTerm::Unassigned),
                _ => Some(SearchTerm::Assignee(normalize_case(value, case_sensitive))),
            },
            "priority" | "p" => value.parse().ok().map(SearchTerm::Priority),
            "tag" => Some(SearchTerm::Tag(normalize_case(
                value.trim_start_matches('#'),
                case_sensitive,
            ))),
            "re" | "regex" => build_regex(value, case_sensitive).map(SearchTerm::Regex),
            _ => None,
        };
        if let Some(term) = term {
            return Some(ParsedTerm { negate, term });
        }
    }

    Some(ParsedTerm {
        negate,
        term: SearchTerm::Text(normalize_case(token, case_sensitive)),
    })
}

/// Unicode-aware normalization for search: lowercases, NFD-decomposes, and
/// strips combining marks (accents). This lets "resume" match "résumé".
fn normalize_for_search(value: &str) -> String {
    value
        .to_lowercase()
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect()
}

fn normalize_case(value: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        value.to_string()
    } else {
        normalize_for_search(value)
    }
}

fn equals_text(left: &str, right: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        left == right
    } else {
        normalize_for_search(left) == normalize_for_search(right)
    }
}

fn contains_text(haystack: &str, needle: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        haystack.contains(needle)
    } else {
        normalize_for_search(haystack).contains(&normalize_for_search(needle))
    }
}

fn build_regex(pattern: &str, case_sensitive: bool) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .ok()
}
