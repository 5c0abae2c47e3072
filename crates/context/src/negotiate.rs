//! Response format negotiation.
//!
//! Precedence is positional: the client's media ranges are tried in the order they
//! appear in `Accept` (quality values are dropped, not ranked), and for each range the
//! first matching offer wins.
//!
//! The catch-all range `*/*` only stands for "anything" when it is all the client sent
//! (or no `Accept` header was sent at all), in which case the first offer is chosen.
//! Next to concrete ranges it is ignored, so a browser-style header such as
//! `text/html,application/xml;q=0.9,*/*;q=0.8` does not match `application/json`.
//! Subtype wildcards (`text/*`) match every offer of that type.

use tracing::debug;

const WILDCARD: &str = "*/*";

/// Input of [`Context::negotiate`](crate::Context::negotiate).
#[derive(Debug)]
pub struct Negotiate<'a, T: ?Sized> {
    /// media types the server can respond with, in preference order
    pub offered: &'a [&'a str],
    /// template executed when `text/html` is chosen
    pub html_name: Option<&'a str>,
    pub data: &'a T,
}

/// Splits an `Accept` header into its media ranges, in header order, without parameters.
pub fn parse_accept(accept: &str) -> Vec<String> {
    accept
        .split(',')
        .map(|part| part.split(';').next().unwrap_or_default().trim())
        .filter(|part| !part.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Picks the offer to respond with given the client's `accepted` media ranges.
///
/// Returns `None` when nothing was offered, or when the client listed concrete ranges
/// and none of them matches an offer.
pub fn negotiate<'o, S: AsRef<str>>(accepted: &[S], offered: &[&'o str]) -> Option<&'o str> {
    let first = *offered.first()?;

    if accepted.iter().all(|range| is_wildcard(range.as_ref())) {
        debug!(offer = first, "no concrete media range accepted, using first offer");
        return Some(first);
    }

    let chosen = accepted
        .iter()
        .map(AsRef::as_ref)
        .filter(|range| !is_wildcard(range))
        .find_map(|range| offered.iter().copied().find(|offer| range_matches(range, offer)));

    debug!(offer = ?chosen, "negotiated response format");
    chosen
}

#[inline]
fn is_wildcard(range: &str) -> bool {
    range == WILDCARD
}

fn range_matches(range: &str, offer: &str) -> bool {
    if range.eq_ignore_ascii_case(offer) {
        return true;
    }

    match range.strip_suffix("/*") {
        Some(range_type) => offer
            .split_once('/')
            .is_some_and(|(offer_type, _)| offer_type.eq_ignore_ascii_case(range_type)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_type::{MIME_HTML, MIME_JSON, MIME_PLAIN, MIME_XML};

    const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

    #[test]
    fn parse_drops_parameters_and_blanks() {
        assert_eq!(
            parse_accept(BROWSER_ACCEPT),
            ["text/html", "application/xhtml+xml", "application/xml", "*/*"]
        );
        assert_eq!(parse_accept(" text/plain ; q=0.5 ,, "), ["text/plain"]);
        assert!(parse_accept("").is_empty());
    }

    #[test]
    fn header_order_wins() {
        let accepted = parse_accept(BROWSER_ACCEPT);

        assert_eq!(negotiate(&accepted, &[MIME_JSON, MIME_XML]), Some(MIME_XML));
        assert_eq!(negotiate(&accepted, &[MIME_XML, MIME_HTML]), Some(MIME_HTML));
        assert_eq!(negotiate(&accepted, &[MIME_JSON]), None);
    }

    #[test]
    fn quality_values_are_not_ranked() {
        let accepted = parse_accept("application/xml;q=0.1, application/json;q=1.0");
        assert_eq!(negotiate(&accepted, &[MIME_JSON, MIME_XML]), Some(MIME_XML));
    }

    #[test]
    fn lone_wildcard_takes_first_offer() {
        assert_eq!(negotiate(&parse_accept("*/*"), &[MIME_JSON, MIME_XML]), Some(MIME_JSON));
        assert_eq!(negotiate::<String>(&[], &[MIME_HTML, MIME_JSON]), Some(MIME_HTML));
    }

    #[test]
    fn subtype_wildcard() {
        let accepted = parse_accept("text/*");
        assert_eq!(negotiate(&accepted, &[MIME_JSON, MIME_PLAIN]), Some(MIME_PLAIN));
        assert_eq!(negotiate(&accepted, &[MIME_JSON]), None);
    }

    #[test]
    fn nothing_offered() {
        assert_eq!(negotiate(&parse_accept(BROWSER_ACCEPT), &[]), None);
    }
}
