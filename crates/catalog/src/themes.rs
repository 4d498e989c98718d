//! Stock stylesheets for hosted search result pages.

/// Base of every theme stylesheet.
pub const THEME_BASE: &str = "http://www.google.com/cse/style/look/";

/// A stock look for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Theme {
	Bubblegum,
	Greensky,
	Espresso,
	Shiny,
	Minimalist,
}

impl Theme {
	pub const ALL: [Theme; 5] = [Self::Bubblegum, Self::Greensky, Self::Espresso, Self::Shiny, Self::Minimalist];

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Bubblegum => "bubblegum",
			Self::Greensky => "greensky",
			Self::Espresso => "espresso",
			Self::Shiny => "shiny",
			Self::Minimalist => "minimalist",
		}
	}

	/// Case-insensitive lookup, accepting `BUBBLEGUM` as well as `bubblegum`.
	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|theme| theme.as_str().eq_ignore_ascii_case(name))
	}

	pub fn stylesheet_url(self) -> String {
		format!("{THEME_BASE}{}.css", self.as_str())
	}
}
