//! Page tokens and paged results.
//!
//! Tokens are decimal renderings of 1-based page numbers. The empty token
//! means "first page" on input and "no more pages" on output.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::annotations::Annotations;
use crate::error::ConnectorError;

pub const FIRST_PAGE: u32 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PageToken(String);

impl PageToken {
    #[must_use]
    pub fn first() -> Self {
        Self::default()
    }

    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Token following `current_page`, or the empty token on the last page.
    #[must_use]
    pub fn next(current_page: u32, total_pages: u32) -> Self {
        if current_page < total_pages {
            Self((current_page + 1).to_string())
        } else {
            Self::default()
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Page number this token requests.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::BadPageToken`] if the token is neither empty
    /// nor a decimal integer.
    pub fn page(&self) -> Result<u32, ConnectorError> {
        if self.0.is_empty() {
            return Ok(FIRST_PAGE);
        }
        if !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConnectorError::BadPageToken {
                token: self.0.clone(),
            });
        }
        self.0.parse().map_err(|_| ConnectorError::BadPageToken {
            token: self.0.clone(),
        })
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageToken {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for PageToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One page of builder output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: PageToken,
    #[serde(default, skip_serializing_if = "Annotations::is_empty")]
    pub annotations: Annotations,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, next_page_token: PageToken) -> Self {
        Self {
            items,
            next_page_token,
            annotations: Annotations::new(),
        }
    }

    /// A complete result that fits in one page.
    #[must_use]
    pub fn single(items: Vec<T>) -> Self {
        Self::new(items, PageToken::first())
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::single(Vec::new())
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        !self.next_page_token.is_empty()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}
