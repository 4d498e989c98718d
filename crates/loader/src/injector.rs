use std::rc::Rc;

use crate::host::{AssetKind, Document, ReadyState, ResourceNode};

/// How an asset reached the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectMode {
	/// Written into the parse stream.
	Write,
	/// Appended to the head as a node.
	Append,
}

/// Inserts script and stylesheet references into the document.
///
/// Completion is never observed here. Assets report readiness themselves
/// through [`Loader::loaded`](crate::Loader::loaded) or a provider callback
/// entry.
#[derive(Clone)]
pub struct Injector {
	document: Rc<dyn Document>,
}

impl Injector {
	pub fn new(document: Rc<dyn Document>) -> Self {
		Self { document }
	}

	/// Injects one asset.
	///
	/// Stream writes are only used while the document is still parsing and
	/// the caller does not wait for deferred completion.
	pub fn inject(&self, kind: AssetKind, url: &str, deferred: bool) -> InjectMode {
		let node = ResourceNode::new(kind, url);
		if !deferred && self.document.ready_state() == ReadyState::Loading {
			tracing::debug!(%url, ?kind, "inject.write");
			self.document.write(&node.markup());
			return InjectMode::Write;
		}
		if !self.document.has_head() {
			self.document.create_head();
		}
		tracing::debug!(%url, ?kind, "inject.append");
		self.document.append_to_head(node);
		InjectMode::Append
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::sim::SimulatedPage;

	#[test]
	fn writes_during_parse_without_deferral() {
		let page = Rc::new(SimulatedPage::new());
		let injector = Injector::new(page.clone());
		assert_eq!(injector.inject(AssetKind::Script, "http://x/a.js?a=1&b=2", false), InjectMode::Write);
		assert_eq!(
			page.written(),
			vec!["<script src=\"http://x/a.js?a=1&amp;b=2\" type=\"text/javascript\"></script>".to_string()]
		);
		assert!(page.head().is_empty());
	}

	#[test]
	fn appends_when_deferred() {
		let page = Rc::new(SimulatedPage::new());
		let injector = Injector::new(page.clone());
		assert_eq!(injector.inject(AssetKind::Stylesheet, "http://x/a.css", true), InjectMode::Append);
		assert_eq!(page.head(), vec![ResourceNode::new(AssetKind::Stylesheet, "http://x/a.css")]);
	}

	#[test]
	fn appends_after_parse_and_creates_head() {
		let page = Rc::new(SimulatedPage::new().without_head());
		page.set_ready_state(ReadyState::Interactive);
		let injector = Injector::new(page.clone());
		assert_eq!(injector.inject(AssetKind::Script, "http://x/a.js", false), InjectMode::Append);
		assert!(page.has_head());
		assert_eq!(page.requested_urls(), vec!["http://x/a.js".to_string()]);
	}
}
