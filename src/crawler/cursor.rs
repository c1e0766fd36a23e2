//! Page cursors

use std::fmt;

/// Position of one page in a catalog's pagination
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageCursor {
    /// 1-based page number
    Page(u32),
    /// Opaque continuation token handed out by the previous page
    Token(String),
}

impl PageCursor {
    /// The cursor of the following page
    ///
    /// Page numbers simply increment. A token cursor moves to the token the
    /// current page pointed at; without one the chain has ended.
    pub fn advance(&self, next_token: Option<String>) -> Option<PageCursor> {
        match self {
            Self::Page(n) => n.checked_add(1).map(Self::Page),
            Self::Token(_) => next_token.map(Self::Token),
        }
    }

    pub fn is_token(&self) -> bool {
        matches!(self, Self::Token(_))
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(n) => write!(f, "page {}", n),
            Self::Token(token) => write!(f, "token '{}'", token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_advances() {
        assert_eq!(PageCursor::Page(1).advance(None), Some(PageCursor::Page(2)));
        assert_eq!(
            PageCursor::Page(4).advance(Some("ignored".to_string())),
            Some(PageCursor::Page(5))
        );
        assert_eq!(PageCursor::Page(u32::MAX).advance(None), None);
    }

    #[test]
    fn test_token_follows_chain() {
        let cursor = PageCursor::Token("a".to_string());
        assert_eq!(
            cursor.advance(Some("b".to_string())),
            Some(PageCursor::Token("b".to_string()))
        );
        assert_eq!(cursor.advance(None), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(PageCursor::Page(3).to_string(), "page 3");
        assert_eq!(PageCursor::Token("x".to_string()).to_string(), "token 'x'");
    }
}
