//! Endpoint classifier
//!
//! Maps `(method, path)` to an [`EndpointCategory`] by walking an ordered
//! rule table; the first matching rule wins and unmatched requests are
//! [`EndpointCategory::Public`].

use crate::access_control::patterns::{RequestPattern, request_key};
use crate::access_control::types::EndpointCategory;
use crate::config::EndpointRuleConfig;
use crate::error::{ConfigError, PolicyError};
use std::collections::{BTreeSet, HashMap};
use tracing::trace;

/// Compiled endpoint rule
#[derive(Debug, Clone)]
pub struct EndpointRule {
    pattern: RequestPattern,
    category: EndpointCategory,
    examples: Vec<String>,
    fallback: bool,
}

impl EndpointRule {
    pub fn new(pattern: &str, category: EndpointCategory) -> Result<Self, ConfigError> {
        Ok(Self {
            pattern: RequestPattern::new(pattern)?,
            category,
            examples: Vec::new(),
            fallback: false,
        })
    }

    /// Attach example requests, written `METHOD:PATH`
    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    /// Mark this rule as a catch-all for requests earlier rules leave over
    ///
    /// Earlier rules' examples may match a fallback rule without being
    /// reported as overlapping.
    pub fn as_fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    pub fn pattern(&self) -> &RequestPattern {
        &self.pattern
    }

    pub fn category(&self) -> EndpointCategory {
        self.category
    }

    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

/// Outcome of classifying one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'a> {
    pub category: EndpointCategory,
    /// Index and source of the matching rule, `None` for the public default
    pub rule: Option<(usize, &'a str)>,
}

/// Ordered endpoint rule table
#[derive(Debug, Clone, Default)]
pub struct EndpointClassifier {
    rules: Vec<EndpointRule>,
}

impl EndpointClassifier {
    pub fn new(rules: Vec<EndpointRule>) -> Self {
        Self { rules }
    }

    /// Compile the rule table from configuration
    pub fn from_config(rules: &[EndpointRuleConfig]) -> Result<Self, ConfigError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let category = EndpointCategory::try_parse(&rule.category).ok_or_else(|| {
                PolicyError::UnknownCategory {
                    table: "endpoints",
                    label: rule.category.clone(),
                }
            })?;
            let mut compiled_rule =
                EndpointRule::new(&rule.pattern, category)?.with_examples(rule.examples.clone());
            if rule.fallback {
                compiled_rule = compiled_rule.as_fallback();
            }
            compiled.push(compiled_rule);
        }
        Ok(Self::new(compiled))
    }

    /// Category of a request
    pub fn classify(&self, method: &str, path: &str) -> EndpointCategory {
        self.classify_detailed(method, path).category
    }

    /// Category of a request along with the rule that produced it
    pub fn classify_detailed(&self, method: &str, path: &str) -> Classification<'_> {
        self.classify_key(&request_key(method, path))
    }

    /// Classify an already-built `METHOD:PATH` key
    pub fn classify_key(&self, key: &str) -> Classification<'_> {
        match self
            .rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.pattern.matches(key))
        {
            Some((index, rule)) => {
                trace!(key, index, pattern = %rule.pattern, "Matched endpoint rule");
                Classification {
                    category: rule.category,
                    rule: Some((index, rule.pattern.source())),
                }
            }
            None => Classification {
                category: EndpointCategory::Public,
                rule: None,
            },
        }
    }

    pub fn rules(&self) -> &[EndpointRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Categories any rule can produce
    pub fn categories(&self) -> BTreeSet<EndpointCategory> {
        self.rules.iter().map(|r| r.category).collect()
    }

    /// Reject tables where a rule is duplicated, unreachable, or overlaps
    /// another rule on one of its declared examples
    pub fn validate(&self) -> Result<(), PolicyError> {
        self.check_duplicates()?;
        self.check_shadowed()?;
        self.check_examples()
    }

    fn check_duplicates(&self) -> Result<(), PolicyError> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (index, rule) in self.rules.iter().enumerate() {
            if let Some(first) = seen.insert(rule.pattern.source(), index) {
                return Err(PolicyError::DuplicatePattern {
                    pattern: rule.pattern.source().to_string(),
                    first,
                    second: index,
                });
            }
        }
        Ok(())
    }

    // Only reports cases that are certain: an exact key an earlier rule
    // matches, or a prefix covered by an earlier, shorter prefix.
    fn check_shadowed(&self) -> Result<(), PolicyError> {
        for (index, rule) in self.rules.iter().enumerate() {
            let Some(literal) = rule.pattern.literal() else {
                continue;
            };
            let is_prefix = rule.pattern.source().ends_with('*');

            for earlier in &self.rules[..index] {
                let shadows = if is_prefix {
                    !earlier.pattern.is_regex()
                        && earlier.pattern.source().ends_with('*')
                        && earlier
                            .pattern
                            .literal()
                            .is_some_and(|p| literal.starts_with(p))
                } else {
                    earlier.pattern.matches(literal)
                };

                if shadows {
                    return Err(PolicyError::ShadowedPattern {
                        index,
                        pattern: rule.pattern.source().to_string(),
                        shadowed_by: earlier.pattern.source().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_examples(&self) -> Result<(), PolicyError> {
        for (index, rule) in self.rules.iter().enumerate() {
            for example in &rule.examples {
                let key = normalize_example(example);
                let matched = self.classify_key(&key);

                match matched.rule {
                    Some((matched_index, _)) if matched_index == index => {}
                    other => {
                        return Err(PolicyError::ExampleMismatch {
                            example: example.clone(),
                            pattern: rule.pattern.source().to_string(),
                            matched: other
                                .map(|(_, source)| source.to_string())
                                .unwrap_or_else(|| "<public default>".to_string()),
                        });
                    }
                }

                if let Some(other) = self.rules[index + 1..]
                    .iter()
                    .find(|later| !later.fallback && later.pattern.matches(&key))
                {
                    return Err(PolicyError::OverlappingRules {
                        example: example.clone(),
                        pattern: rule.pattern.source().to_string(),
                        other: other.pattern.source().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn normalize_example(example: &str) -> String {
    match example.split_once(':') {
        Some((method, path)) => request_key(method, path),
        None => example.to_string(),
    }
}
