//! Opaque ordered version tokens.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+|[A-Za-z]+").unwrap());

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("empty version string")]
    Empty,
    #[error("version component carries no tokens: {0:?}")]
    EmptyComponent(String),
}

/// How a title writes its versions: the component separator and an
/// optional minimum zero padding applied to numeric components on
/// display.
///
/// `separator: ""` splits the string into single characters, which is how
/// a handful of vendors encode versions (`"210"` meaning `2.1.0`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStyle {
    pub separator: String,
    pub zero_pad: usize,
}

impl Default for VersionStyle {
    fn default() -> Self {
        Self {
            separator: ".".to_string(),
            zero_pad: 0,
        }
    }
}

impl VersionStyle {
    pub fn with_separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    pub fn with_zero_pad(mut self, zero_pad: usize) -> Self {
        self.zero_pad = zero_pad;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Token {
    Num(u64),
    Alpha(String),
}

impl Token {
    fn cmp_token(&self, other: &Token) -> Ordering {
        match (self, other) {
            (Token::Num(a), Token::Num(b)) => a.cmp(b),
            // Numeric tokens order before alphabetic ones, so `7.1` is
            // older than `7.1rc` only through length, never token kind.
            (Token::Num(_), Token::Alpha(_)) => Ordering::Less,
            (Token::Alpha(_), Token::Num(_)) => Ordering::Greater,
            (Token::Alpha(a), Token::Alpha(b)) => a.cmp(b),
        }
    }
}

/// One separator-delimited piece, as written upstream plus its parsed
/// tokens. `raw` is kept verbatim so display never invents a spelling
/// the upstream filename does not use (`5.03` must not become `5.3`).
#[derive(Debug, Clone)]
struct Component {
    raw: String,
    tokens: Vec<Token>,
}

/// An opaque, ordered version identifier.
///
/// Components are split on the style's separator; each component is
/// further split into digit runs and letter runs. Comparison walks
/// components, then tokens: numeric against numeric compares as integers,
/// alphabetic against alphabetic lexicographically, and when both sides
/// are otherwise equal the side with more tokens (or components) wins.
///
/// Equality and hashing follow comparison, over the tokens only: `5.03`
/// and `5.3` are the same version spelled two ways, and the style plays
/// no part.
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<Component>,
    style: VersionStyle,
}

impl Version {
    pub fn parse(s: &str, style: &VersionStyle) -> Result<Self, VersionError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionError::Empty);
        }

        let raw_components: Vec<String> = if style.separator.is_empty() {
            s.chars().map(|c| c.to_string()).collect()
        } else {
            s.split(style.separator.as_str()).map(str::to_string).collect()
        };

        let mut components = Vec::with_capacity(raw_components.len());
        for raw in raw_components {
            let tokens: Vec<Token> = TOKEN_REGEX
                .find_iter(&raw)
                .map(|m| match m.as_str().parse::<u64>() {
                    Ok(n) => Token::Num(n),
                    Err(_) => Token::Alpha(m.as_str().to_string()),
                })
                .collect();
            if tokens.is_empty() {
                return Err(VersionError::EmptyComponent(raw));
            }
            components.push(Component { raw, tokens });
        }

        Ok(Self {
            components,
            style: style.clone(),
        })
    }

    /// Parse with the default dotted style.
    pub fn parse_default(s: &str) -> Result<Self, VersionError> {
        Self::parse(s, &VersionStyle::default())
    }

    fn cmp_components(a: &[Token], b: &[Token]) -> Ordering {
        for (x, y) in a.iter().zip(b.iter()) {
            let c = x.cmp_token(y);
            if c != Ordering::Equal {
                return c;
            }
        }
        a.len().cmp(&b.len())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.components.len() == other.components.len()
            && self
                .components
                .iter()
                .zip(&other.components)
                .all(|(a, b)| a.tokens == b.tokens)
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.len().hash(state);
        for component in &self.components {
            component.tokens.hash(state);
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.components.iter().zip(other.components.iter()) {
            let c = Self::cmp_components(&a.tokens, &b.tokens);
            if c != Ordering::Equal {
                return c;
            }
        }
        self.components.len().cmp(&other.components.len())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(&self.style.separator)?;
            }
            // Purely numeric components may be padded up to the style's
            // width; everything else reproduces the upstream spelling.
            match component.tokens.as_slice() {
                [Token::Num(n)] if component.raw.len() < self.style.zero_pad => {
                    write!(f, "{:0width$}", n, width = self.style.zero_pad)?
                }
                _ => f.write_str(&component.raw)?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_default(s)
    }
}
