//! Transcoder between plist text and JSON text.
//!
//! Two pure, single-pass functions convert the editor's structured-literal
//! format to the backend's JSON wire format and back:
//!
//! - [`plist_to_json`] — `(:@type "ping" :@extra ["5" 7.0])` becomes
//!   `{"@type":"ping","@extra":["5",7.0]}`
//! - [`json_to_plist`] — the inverse mapping, preserving key and element
//!   order and copying numbers verbatim
//!
//! Both directions are recursive descent over raw bytes with an explicit
//! depth bound ([`MAX_NESTING_DEPTH`]) so adversarial nesting fails with
//! `NestingTooDeep` instead of exhausting the stack.
//!
//! JSON `true`, `false` and `null` have no plist literal form; the protocol
//! defines no mapping for them, so [`json_to_plist`] rejects them with
//! `UnsupportedJsonType` rather than coercing.
//!
//! # Example
//!
//! ```
//! use plistwire::transcode::plist_to_json;
//!
//! let json = plist_to_json(br#"(:text "hi")"#).unwrap();
//! assert_eq!(&json[..], br#"{"text":"hi"}"#);
//! ```

mod json;
mod plist;

pub use json::json_to_plist;
pub use plist::plist_to_json;

/// Maximum nesting depth accepted in either direction.
pub const MAX_NESTING_DEPTH: usize = 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_structure() {
        let json = br#"{"@type":"updateNewMessage","message":{"id":42,"content":{"@type":"messageText","text":{"text":"hello \"world\"\n"}},"ids":[1,2.5,-3e2]}}"#;
        let plist = json_to_plist(json).unwrap();
        let back = plist_to_json(&plist).unwrap();
        assert_eq!(&back[..], &json[..]);
    }

    #[test]
    fn test_round_trip_starts_from_plist() {
        let plist = br#"(:@type "getTextEntities" :text "hi" :@extra ["5" 7.0])"#;
        let json = plist_to_json(plist).unwrap();
        let back = json_to_plist(&json).unwrap();
        let again = plist_to_json(&back).unwrap();
        assert_eq!(&json[..], &again[..]);
    }

    #[test]
    fn test_depth_limit_symmetric() {
        let deep_json: Vec<u8> = std::iter::repeat(b'[')
            .take(MAX_NESTING_DEPTH + 1)
            .chain([b'1'])
            .chain(std::iter::repeat(b']').take(MAX_NESTING_DEPTH + 1))
            .collect();
        assert!(json_to_plist(&deep_json).is_err());

        let deep_plist: Vec<u8> = std::iter::repeat(b'[')
            .take(MAX_NESTING_DEPTH + 1)
            .chain([b'1'])
            .chain(std::iter::repeat(b']').take(MAX_NESTING_DEPTH + 1))
            .collect();
        assert!(plist_to_json(&deep_plist).is_err());
    }
}
