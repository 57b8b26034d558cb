//! Command response framing
//!
//! After a command the reader sends, in order:
//!
//! ```text
//! <echo of the command>
//! <zero or more response lines>
//! <blank separator>
//! Alien>
//! ```
//!
//! The response is everything between the echo and the separator, i.e.
//! `lines[1 .. n - 2]`.

use crate::error::{Error, Result};

/// Echo + separator + prompt
pub const MIN_RESPONSE_LINES: usize = 3;

/// Lines before the response body (the echo)
const LEADING_LINES: usize = 1;

/// Lines after the response body (separator and prompt)
const TRAILING_LINES: usize = 2;

/// Strip the echo, separator and prompt from a drained response
///
/// # Errors
///
/// [`Error::MalformedResponse`] when there are fewer than
/// [`MIN_RESPONSE_LINES`] lines.
pub fn extract_response(lines: &[String]) -> Result<Vec<String>> {
    if lines.len() < MIN_RESPONSE_LINES {
        return Err(Error::MalformedResponse {
            expected: MIN_RESPONSE_LINES,
            actual: lines.len(),
        });
    }
    
    Ok(lines[LEADING_LINES..lines.len() - TRAILING_LINES].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    
    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }
    
    #[test]
    fn test_extract_response() {
        let drained = lines(&["ECHO", "line1", "line2", "", "Alien>"]);
        assert_eq!(extract_response(&drained).unwrap(), vec!["line1", "line2"]);
    }
    
    #[test]
    fn test_extract_empty_response() {
        let drained = lines(&["AutoModeReset", "", "Alien>"]);
        assert!(extract_response(&drained).unwrap().is_empty());
    }
    
    #[test]
    fn test_extract_short_response() {
        for n in 0..MIN_RESPONSE_LINES {
            let drained = lines(&["", "Alien>", "x"][..n]);
            let result = extract_response(&drained);
            assert!(matches!(
                result,
                Err(Error::MalformedResponse { expected: 3, actual }) if actual == n
            ));
        }
    }
}
