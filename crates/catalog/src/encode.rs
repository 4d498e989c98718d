//! URI component encoding shared by URL construction and telemetry.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left untouched by browser `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'_')
	.remove(b'.')
	.remove(b'!')
	.remove(b'~')
	.remove(b'*')
	.remove(b'\'')
	.remove(b'(')
	.remove(b')');

/// Percent-encodes one query component.
pub fn component(value: &str) -> String {
	utf8_percent_encode(value, COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_unreserved_marks() {
		assert_eq!(component("a-b_c.d!e~f*g'h(i)"), "a-b_c.d!e~f*g'h(i)");
	}

	#[test]
	fn escapes_separators_and_spaces() {
		assert_eq!(component("nocss=true"), "nocss%3Dtrue");
		assert_eq!(component("a,b c&d"), "a%2Cb%20c%26d");
		assert_eq!(component("en/GB"), "en%2FGB");
	}

	#[test]
	fn escapes_multibyte() {
		assert_eq!(component("é"), "%C3%A9");
	}
}
