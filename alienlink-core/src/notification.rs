//! Notification line filter
//!
//! The reader wraps tag lines in `#Alien ...` headers and comment lines and
//! sends `No Tags` when a cycle read nothing. Only tag lines survive.

use crate::constants::notify::{COMMENT_PREFIX, HEADER_MARKER, MIN_LINE_LEN, NO_TAGS};

/// Check whether a single line is a tag notification
pub fn is_notification_line(line: &str) -> bool {
    !line.starts_with(COMMENT_PREFIX)
        && !line.contains(HEADER_MARKER)
        && !line.contains(NO_TAGS)
        && line.chars().count() > MIN_LINE_LEN
}

/// Keep notification lines, preserving order
pub fn filter_lines<I>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    lines.into_iter().filter(|line| is_notification_line(line)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    
    fn owned(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }
    
    #[test]
    fn test_filter_mixed_lines() {
        let lines = owned(&["#comment", "tag1", "No Tags", "ok", "x"]);
        assert_eq!(filter_lines(lines), vec!["tag1"]);
    }
    
    #[test]
    fn test_filter_notification_frame() {
        let lines = owned(&[
            "#Alien RFID Reader Auto Notification Message",
            "#ReaderName: dock-3",
            "dock-3,0,E200 3411 B802 0115,-61.2",
            "dock-3,1,E200 3411 B802 0116,-58.0",
            "#End of Notification Message",
        ]);
        
        assert_eq!(
            filter_lines(lines),
            vec!["dock-3,0,E200 3411 B802 0115,-61.2", "dock-3,1,E200 3411 B802 0116,-58.0"]
        );
    }
    
    #[test]
    fn test_header_marker_anywhere() {
        assert!(!is_notification_line("x #Alien y"));
        assert!(!is_notification_line("(No Tags)"));
    }
    
    #[test]
    fn test_length_threshold() {
        assert!(!is_notification_line("abc"));
        assert!(is_notification_line("abcd"));
        assert!(!is_notification_line(""));
    }
    
    #[test]
    fn test_filter_empty() {
        assert!(filter_lines(Vec::<String>::new()).is_empty());
    }
}
