//! URI templates with named placeholders, e.g. `math://formula/{name}`

use indexmap::IndexMap;
use std::fmt;

use crate::error::RegistryError;

/// Values extracted from a matched URI, in placeholder order
pub type TemplateVariables = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Variable(String),
}

/// Parsed URI template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    raw: String,
    parts: Vec<Part>,
}

impl UriTemplate {
    /// Parse a template
    ///
    /// Placeholder names must be non-empty identifiers and two placeholders
    /// may not be adjacent.
    pub fn parse(template: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) if ch.is_ascii_alphanumeric() || ch == '_' => name.push(ch),
                            Some(_) => return Err(invalid("invalid character in placeholder")),
                            None => return Err(invalid("unclosed placeholder")),
                        }
                    }
                    if name.is_empty() {
                        return Err(invalid("empty placeholder"));
                    }
                    if literal.is_empty() {
                        if let Some(Part::Variable(_)) = parts.last() {
                            return Err(invalid("adjacent placeholders"));
                        }
                    } else {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(Part::Variable(name));
                }
                '}' => return Err(invalid("unmatched '}'")),
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Ok(Self {
            raw: template.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in order of appearance
    pub fn variable_names(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Variable(name) => Some(name.as_str()),
                Part::Literal(_) => None,
            })
            .collect()
    }

    /// Match a concrete URI, extracting placeholder values
    ///
    /// A placeholder matches a non-empty run of characters without `/`,
    /// ending where the following literal begins.
    pub fn match_uri(&self, uri: &str) -> Option<TemplateVariables> {
        let mut variables = TemplateVariables::new();
        let mut rest = uri;

        for (index, part) in self.parts.iter().enumerate() {
            match part {
                Part::Literal(literal) => {
                    rest = rest.strip_prefix(literal.as_str())?;
                }
                Part::Variable(name) => {
                    let segment_end = rest.find('/').unwrap_or(rest.len());
                    let end = match self.parts.get(index + 1) {
                        Some(Part::Literal(next)) => (1..=segment_end.min(rest.len()))
                            .find(|&i| rest.is_char_boundary(i) && rest[i..].starts_with(next.as_str()))?,
                        _ => segment_end,
                    };
                    if end == 0 {
                        return None;
                    }
                    variables.insert(name.clone(), rest[..end].to_string());
                    rest = &rest[end..];
                }
            }
        }

        rest.is_empty().then_some(variables)
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
